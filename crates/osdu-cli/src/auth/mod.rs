//! Authentication and token lifecycle
//!
//! [`CredentialManager`] owns the current [`Credential`] and hands out bearer
//! tokens. When the token is missing or expired it asks its [`AuthProtocol`]
//! for a fresh grant:
//!
//! - [`RefreshTokenProtocol`]: exchanges a long-lived refresh token at the
//!   configured token endpoint.
//! - [`InteractiveProtocol`]: silent reacquisition from a persisted session
//!   cache, falling back to the OAuth2 device authorization flow.
//!
//! Which protocol is used is decided by `core.authentication_mode`, parsed into
//! [`AuthenticationMode`].

pub mod interactive;
pub mod refresh_token;

pub use interactive::{InteractiveProtocol, SessionCache};
pub use refresh_token::RefreshTokenProtocol;

use crate::config::{CliConfig, CONFIG_AUTHENTICATION_MODE, CORE_SECTION};
use crate::error::{CliError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Deserializer};
use std::str::FromStr;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Tokens issued by an identity provider
#[derive(Debug, Clone, Deserialize)]
pub struct TokenGrant {
    pub access_token: String,

    #[serde(default)]
    pub id_token: Option<String>,

    /// Present when the provider rotates refresh tokens
    #[serde(default)]
    pub refresh_token: Option<String>,

    /// Lifetime of the access token in seconds
    #[serde(deserialize_with = "seconds_from_number_or_string")]
    pub expires_in: i64,
}

/// Error document returned by OAuth2 endpoints
#[derive(Debug, Clone, Deserialize)]
pub struct TokenErrorPayload {
    pub error: String,

    #[serde(default)]
    pub error_description: Option<String>,

    #[serde(default)]
    pub correlation_id: Option<String>,
}

impl From<TokenErrorPayload> for CliError {
    fn from(payload: TokenErrorPayload) -> Self {
        CliError::Authentication {
            error: payload.error,
            description: payload.error_description.unwrap_or_default(),
            correlation_id: payload.correlation_id.unwrap_or_default(),
        }
    }
}

/// Interpret the body of a successful token endpoint response.
///
/// Some providers answer 200 with an error document; that is surfaced as
/// [`CliError::Authentication`].
pub(crate) fn parse_token_reply(body: &str) -> Result<TokenGrant> {
    let value: serde_json::Value = serde_json::from_str(body)?;

    if value.get("access_token").is_some() {
        return Ok(serde_json::from_value(value)?);
    }

    match serde_json::from_value::<TokenErrorPayload>(value) {
        Ok(payload) => Err(payload.into()),
        Err(_) => Err(CliError::Authentication {
            error: "invalid_response".to_string(),
            description: "token endpoint returned neither a token nor an error".to_string(),
            correlation_id: String::new(),
        }),
    }
}

fn seconds_from_number_or_string<'de, D>(deserializer: D) -> std::result::Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Seconds {
        Number(i64),
        Text(String),
    }

    match Seconds::deserialize(deserializer)? {
        Seconds::Number(n) => Ok(n),
        Seconds::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

/// The access token currently in use and the instant it stops being valid
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub access_token: String,
    pub id_token: Option<String>,
    pub expiry: DateTime<Utc>,
}

impl Credential {
    /// Build a credential issued at `issued_at` with the grant's declared lifetime
    pub fn from_grant(grant: &TokenGrant, issued_at: DateTime<Utc>) -> Self {
        Self {
            access_token: grant.access_token.clone(),
            id_token: grant.id_token.clone(),
            expiry: issued_at + Duration::seconds(grant.expires_in),
        }
    }

    /// A token is valid strictly before its expiry
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expiry
    }
}

/// A way of obtaining tokens from an identity provider
#[async_trait]
pub trait AuthProtocol: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Obtain a fresh grant
    async fn acquire(&self) -> Result<TokenGrant>;

    /// Persist any session state that changed since the last flush
    fn flush(&self) -> Result<()> {
        Ok(())
    }
}

/// Value of `core.authentication_mode`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthenticationMode {
    RefreshToken,
    Interactive,
}

impl FromStr for AuthenticationMode {
    type Err = CliError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "refresh_token" => Ok(AuthenticationMode::RefreshToken),
            "interactive" | "msal_interactive" => Ok(AuthenticationMode::Interactive),
            other => Err(CliError::UnknownAuthenticationMode(other.to_string())),
        }
    }
}

impl AuthenticationMode {
    pub fn from_config(config: &CliConfig) -> Result<Self> {
        config.get(CORE_SECTION, CONFIG_AUTHENTICATION_MODE)?.parse()
    }

    /// Build the protocol for this mode from its mode-specific settings
    pub fn protocol(self, config: &CliConfig, http: reqwest::Client) -> Result<Box<dyn AuthProtocol>> {
        Ok(match self {
            AuthenticationMode::RefreshToken => {
                Box::new(RefreshTokenProtocol::from_config(config, http)?)
            }
            AuthenticationMode::Interactive => {
                Box::new(InteractiveProtocol::from_config(config, http)?)
            }
        })
    }
}

/// Holds the current credential and refreshes it on demand
pub struct CredentialManager {
    protocol: Box<dyn AuthProtocol>,
    current: Mutex<Option<Credential>>,
}

impl CredentialManager {
    pub fn new(protocol: Box<dyn AuthProtocol>) -> Self {
        Self {
            protocol,
            current: Mutex::new(None),
        }
    }

    /// Select the protocol from configuration
    pub fn from_config(config: &CliConfig, http: reqwest::Client) -> Result<Self> {
        let mode = AuthenticationMode::from_config(config)?;
        debug!(?mode, "Using authentication mode");
        Ok(Self::new(mode.protocol(config, http)?))
    }

    /// Bearer token for the next request, refreshing first if expired
    pub async fn get_token(&self) -> Result<String> {
        let mut current = self.current.lock().await;

        if let Some(credential) = current.as_ref() {
            if credential.is_valid_at(Utc::now()) {
                return Ok(credential.access_token.clone());
            }
            debug!(expiry = %credential.expiry, "Access token expired");
        }

        let credential = self.refresh_locked().await?;
        let token = credential.access_token.clone();
        *current = Some(credential);
        Ok(token)
    }

    /// Force a refresh regardless of the current expiry
    pub async fn refresh(&self) -> Result<Credential> {
        let mut current = self.current.lock().await;
        let credential = self.refresh_locked().await?;
        *current = Some(credential.clone());
        Ok(credential)
    }

    /// Snapshot of the current credential, if one has been issued
    pub async fn credential(&self) -> Option<Credential> {
        self.current.lock().await.clone()
    }

    /// Persist protocol session state now rather than on drop
    pub fn flush(&self) -> Result<()> {
        self.protocol.flush()
    }

    async fn refresh_locked(&self) -> Result<Credential> {
        info!(protocol = self.protocol.name(), "Refreshing token");
        let grant = self
            .protocol
            .acquire()
            .await
            .map_err(CliError::token_request)?;
        let credential = Credential::from_grant(&grant, Utc::now());
        info!(expiry = %credential.expiry, "Token is refreshed");
        Ok(credential)
    }
}

impl Drop for CredentialManager {
    fn drop(&mut self) {
        if let Err(e) = self.protocol.flush() {
            warn!(error = %e, "Failed to persist authentication session");
        }
    }
}
