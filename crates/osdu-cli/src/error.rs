//! Error types for the OSDU CLI
//!
//! Every failure a command can surface is a [`CliError`]. Messages are written
//! for the person at the terminal and say what to do next where there is
//! something to do. [`CliError::exit_code`] decides how the process exits.

use crate::config::CORE_SECTION;
use thiserror::Error;

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

/// Process exit code for a reported, recoverable failure.
pub const EXIT_FAILURE: i32 = 1;

/// Process exit code for an inconsistent configuration that no retry will fix.
pub const EXIT_MISCONFIGURED: i32 = 2;

/// Process exit code after the user interrupted the command.
pub const EXIT_INTERRUPTED: i32 = 130;

/// Error type for CLI operations
#[derive(Error, Debug)]
pub enum CliError {
    /// A required configuration value is absent and no fallback was given
    #[error(
        "Configuration missing from config ('{key}' in section '{section}'). Run 'osdu config set {key} <value>{}' or set the matching OSDU_ environment variable.",
        section_flag(.section)
    )]
    ConfigurationMissing { section: String, key: String },

    /// A configuration value exists but cannot be read as the requested type
    #[error("Configuration value '{value}' for '{section}.{key}' is not a valid {expected}.")]
    InvalidConfigValue {
        section: String,
        key: String,
        value: String,
        expected: &'static str,
    },

    /// `authentication_mode` names a protocol this client does not implement
    #[error("Unknown type of authentication mode '{0}'. Expected 'refresh_token' or 'interactive'. Run 'osdu config set authentication_mode <mode>'.")]
    UnknownAuthenticationMode(String),

    /// The remote service answered with a status outside the accepted set
    #[error("Unable to access the api. Error ({status}) - {reason}. Try running again with --verbose for more information.")]
    HttpStatus { status: u16, reason: String },

    /// The response body was not the JSON document we expected
    #[error("Unable to decode the response: {0}. Try running again with --verbose for more information.")]
    JsonDecode(#[source] serde_json::Error),

    /// Uploading a work-product file to its signed URL failed
    #[error("File upload failed ({status}): {body}")]
    Upload { status: u16, body: String },

    /// The identity provider rejected the token request
    #[error("Authentication failed: {error} - {description} (correlation id: {correlation_id}). Check your credentials with 'osdu config list'.")]
    Authentication {
        error: String,
        description: String,
        correlation_id: String,
    },

    /// The token endpoint could not be reached or gave no usable answer
    #[error("Unable to obtain an access token: {0}")]
    TokenRequest(#[source] Box<CliError>),

    /// Transport-level HTTP failure (connect, timeout, TLS)
    #[error("Network request failed: {0}. Check your internet connection and server URL.")]
    Http(#[from] reqwest::Error),

    /// A URL could not be assembled from the configured server and service path
    #[error("Invalid URL: {0}. Check the 'server' and service path settings.")]
    InvalidUrl(#[from] url::ParseError),

    /// A manifest file could not be interpreted
    #[error("Invalid manifest '{path}': {reason}")]
    InvalidManifest { path: String, reason: String },

    /// A command argument is out of range
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// File system operation failed
    #[error("File operation failed: {0}. Check file permissions and disk space.")]
    Io(#[from] std::io::Error),

    /// Configuration file could not be parsed
    #[error("Failed to parse configuration file: {0}")]
    ConfigFile(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CliError {
    /// Create a configuration-missing error
    pub fn missing(section: impl Into<String>, key: impl Into<String>) -> Self {
        Self::ConfigurationMissing {
            section: section.into(),
            key: key.into(),
        }
    }

    /// Create an invalid manifest error
    pub fn invalid_manifest(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidManifest {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid argument error
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Classify a failure of the authentication protocol.
    ///
    /// Rejections from the identity provider stay [`CliError::Authentication`];
    /// everything else becomes [`CliError::TokenRequest`].
    pub fn token_request(err: CliError) -> Self {
        match err {
            CliError::Authentication { .. } | CliError::TokenRequest(_) => err,
            other => CliError::TokenRequest(Box::new(other)),
        }
    }

    /// Whether a per-run status lookup that failed this way may be degraded to
    /// an `unknown` status instead of aborting the whole lookup.
    pub fn is_remote_failure(&self) -> bool {
        matches!(
            self,
            CliError::HttpStatus { .. } | CliError::JsonDecode(_) | CliError::Http(_)
        )
    }

    /// Exit code for the process when this error ends a command.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::UnknownAuthenticationMode(_) => EXIT_MISCONFIGURED,
            _ => EXIT_FAILURE,
        }
    }
}

/// `--section` flag for a hint, omitted for the default section
fn section_flag(section: &str) -> String {
    if section == CORE_SECTION {
        String::new()
    } else {
        format!(" --section {}", section)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(err: serde_json::Error) -> Self {
        Self::JsonDecode(err)
    }
}
