//! Configuration management for the OSDU CLI
//!
//! Values live in sections of an INI-style file (`~/.osdu/config` by default)
//! and can be overridden per value with environment variables named
//! `OSDU_{SECTION}_{KEY}`:
//!
//! ```text
//! [core]
//! server = https://osdu.example.com
//! data_partition_id = opendes
//! ```
//!
//! `OSDU_CORE_SERVER=https://staging.example.com` wins over the file entry.
//!
//! The file and the relevant environment variables are read once when a
//! [`CliConfig`] is built; later changes on disk or in the environment are not
//! observed by that instance.

use crate::error::{CliError, Result};
use ini::Ini;
use std::collections::BTreeMap;
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

// ============================================================================
// Locations
// ============================================================================

/// Name used for the config directory (`~/.osdu`).
pub const CLI_NAME: &str = "osdu";

/// Prefix of every configuration environment variable.
pub const ENV_PREFIX: &str = "OSDU";

/// Environment variable overriding the configuration directory.
pub const CONFIG_DIR_ENV: &str = "OSDU_CONFIG_DIR";

pub const DEFAULT_CONFIG_FILE_NAME: &str = "config";

/// Section holding connection and authentication settings.
pub const CORE_SECTION: &str = "core";

// ============================================================================
// Core keys
// ============================================================================

pub const CONFIG_SERVER: &str = "server";
pub const CONFIG_ENTITLEMENTS_URL: &str = "entitlements_url";
pub const CONFIG_FILE_URL: &str = "file_url";
pub const CONFIG_LEGAL_URL: &str = "legal_url";
pub const CONFIG_SCHEMA_URL: &str = "schema_url";
pub const CONFIG_SEARCH_URL: &str = "search_url";
pub const CONFIG_STORAGE_URL: &str = "storage_url";
pub const CONFIG_UNIT_URL: &str = "unit_url";
pub const CONFIG_WORKFLOW_URL: &str = "workflow_url";

pub const CONFIG_DATA_PARTITION_ID: &str = "data_partition_id";
pub const CONFIG_LEGAL_TAG: &str = "legal_tag";
pub const CONFIG_ACL_VIEWER: &str = "acl_viewer";
pub const CONFIG_ACL_OWNER: &str = "acl_owner";

pub const CONFIG_AUTHENTICATION_MODE: &str = "authentication_mode";
pub const CONFIG_RETRIES: &str = "retries";
/// Per-request timeout in seconds
pub const CONFIG_TIMEOUT: &str = "timeout";

pub const CONFIG_CLIENT_ID: &str = "client_id";
pub const CONFIG_CLIENT_SECRET: &str = "client_secret";
pub const CONFIG_REFRESH_TOKEN: &str = "refresh_token";
pub const CONFIG_TOKEN_ENDPOINT: &str = "token_endpoint";

pub const CONFIG_AUTHENTICATION_AUTHORITY: &str = "authority";
pub const CONFIG_AUTHENTICATION_SCOPES: &str = "scopes";
pub const CONFIG_TOKEN_CACHE: &str = "token_cache";

const TRUE_STATES: [&str; 4] = ["1", "yes", "true", "on"];
const FALSE_STATES: [&str; 4] = ["0", "no", "false", "off"];

/// Where an effective configuration value came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Environment variable (holds the variable name)
    Env(String),
    /// Configuration file (holds its path)
    File(PathBuf),
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigSource::Env(name) => write!(f, "{}", name),
            ConfigSource::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// One effective value in a section
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigItem {
    pub name: String,
    pub value: String,
    pub source: ConfigSource,
}

/// Layered configuration: environment overlay over an on-disk section file
#[derive(Debug, Clone)]
pub struct CliConfig {
    config_dir: PathBuf,
    config_path: PathBuf,
    env_prefix: String,
    env: BTreeMap<String, String>,
    file: Ini,
}

impl CliConfig {
    /// Load from the default directory (`$OSDU_CONFIG_DIR` or `~/.osdu`)
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_dir()?)
    }

    /// Load from `config_dir` using the current process environment
    pub fn load_from(config_dir: impl Into<PathBuf>) -> Result<Self> {
        Self::with_env(config_dir, std::env::vars())
    }

    /// Load from `config_dir` with an explicit environment.
    ///
    /// Only variables carrying the `OSDU_` prefix are retained.
    pub fn with_env<I, K, V>(config_dir: impl Into<PathBuf>, env: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let config_dir = config_dir.into();
        let config_path = config_dir.join(DEFAULT_CONFIG_FILE_NAME);
        let env_prefix = format!("{}_", ENV_PREFIX);

        let env = env
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .filter(|(k, _)| k.starts_with(&env_prefix))
            .collect();

        let file = read_ini(&config_path)?;
        debug!(path = %config_path.display(), "Loaded configuration");

        Ok(Self {
            config_dir,
            config_path,
            env_prefix,
            env,
            file,
        })
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Environment variable consulted for `section`/`key`
    pub fn env_var_name(&self, section: &str, key: &str) -> String {
        format!(
            "{}{}_{}",
            self.env_prefix,
            section.to_uppercase(),
            key.to_uppercase()
        )
    }

    /// Effective value, or `None` when neither layer has it
    pub fn get_opt(&self, section: &str, key: &str) -> Option<String> {
        if let Some(value) = self.env.get(&self.env_var_name(section, key)) {
            return Some(value.clone());
        }

        self.file.section(Some(section)).and_then(|props| {
            props
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(key))
                .map(|(_, v)| v.to_string())
        })
    }

    /// Effective value, failing with [`CliError::ConfigurationMissing`]
    pub fn get(&self, section: &str, key: &str) -> Result<String> {
        self.get_opt(section, key)
            .ok_or_else(|| CliError::missing(section, key))
    }

    /// Effective value, or `fallback` exactly as given
    pub fn get_or(&self, section: &str, key: &str, fallback: impl Into<String>) -> String {
        self.get_opt(section, key)
            .unwrap_or_else(|| fallback.into())
    }

    pub fn has_option(&self, section: &str, key: &str) -> bool {
        self.get_opt(section, key).is_some()
    }

    pub fn get_int(&self, section: &str, key: &str) -> Result<i64> {
        let value = self.get(section, key)?;
        parse_int(section, key, &value)
    }

    /// Integer value; `fallback` is used only when the key is absent.
    pub fn get_int_or(&self, section: &str, key: &str, fallback: i64) -> Result<i64> {
        match self.get_opt(section, key) {
            Some(value) => parse_int(section, key, &value),
            None => Ok(fallback),
        }
    }

    pub fn get_bool(&self, section: &str, key: &str) -> Result<bool> {
        let value = self.get(section, key)?;
        parse_bool(section, key, &value)
    }

    /// Boolean value; `fallback` is used only when the key is absent.
    pub fn get_bool_or(&self, section: &str, key: &str, fallback: bool) -> Result<bool> {
        match self.get_opt(section, key) {
            Some(value) => parse_bool(section, key, &value),
            None => Ok(fallback),
        }
    }

    /// Sections present in the configuration file
    pub fn sections(&self) -> Vec<String> {
        self.file
            .sections()
            .flatten()
            .map(str::to_string)
            .collect()
    }

    /// All effective values of a section.
    ///
    /// Environment entries come first (sorted by variable name), followed by
    /// file entries whose key is not already provided by the environment.
    pub fn items(&self, section: &str) -> Vec<ConfigItem> {
        let prefix = format!("{}{}_", self.env_prefix, section.to_uppercase());
        let mut items: Vec<ConfigItem> = self
            .env
            .iter()
            .filter_map(|(name, value)| {
                let key = name.strip_prefix(&prefix)?;
                let valid = !key.is_empty()
                    && key
                        .chars()
                        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_');
                valid.then(|| ConfigItem {
                    name: key.to_lowercase(),
                    value: value.clone(),
                    source: ConfigSource::Env(name.clone()),
                })
            })
            .collect();

        if let Some(props) = self.file.section(Some(section)) {
            for (key, value) in props.iter() {
                let name = key.to_lowercase();
                if items.iter().any(|item| item.name == name) {
                    continue;
                }
                items.push(ConfigItem {
                    name,
                    value: value.to_string(),
                    source: ConfigSource::File(self.config_path.clone()),
                });
            }
        }

        items
    }

    /// Persist `section.key = value` to the configuration file.
    ///
    /// The file is re-read, modified, and replaced atomically; the section is
    /// created when missing and the file is left readable by its owner only.
    /// There is no cross-process locking, so concurrent writers may lose
    /// updates.
    pub fn set(&mut self, section: &str, key: &str, value: &str) -> Result<()> {
        std::fs::create_dir_all(&self.config_dir)?;

        let mut ini = read_ini(&self.config_path)?;
        ini.with_section(Some(section))
            .set(key.to_lowercase(), value);

        let mut tmp = tempfile::NamedTempFile::new_in(&self.config_dir)?;
        ini.write_to(&mut tmp)?;
        tmp.flush()?;
        restrict_permissions(tmp.path())?;
        tmp.persist(&self.config_path)
            .map_err(|e| CliError::Io(e.error))?;

        debug!(section, key, path = %self.config_path.display(), "Configuration updated");
        self.file = ini;
        Ok(())
    }
}

/// `$OSDU_CONFIG_DIR`, or `~/.osdu`
pub fn default_config_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(CONFIG_DIR_ENV) {
        return Ok(PathBuf::from(dir));
    }

    dirs::home_dir()
        .map(|home| home.join(format!(".{}", CLI_NAME)))
        .ok_or_else(|| CliError::ConfigFile("Could not determine home directory".to_string()))
}

fn read_ini(path: &Path) -> Result<Ini> {
    if !path.exists() {
        return Ok(Ini::new());
    }

    Ini::load_from_file(path).map_err(|e| CliError::ConfigFile(format!("{}: {}", path.display(), e)))
}

fn parse_int(section: &str, key: &str, value: &str) -> Result<i64> {
    value
        .trim()
        .parse()
        .map_err(|_| invalid_value(section, key, value, "integer"))
}

fn parse_bool(section: &str, key: &str, value: &str) -> Result<bool> {
    let lowered = value.trim().to_lowercase();
    if TRUE_STATES.contains(&lowered.as_str()) {
        Ok(true)
    } else if FALSE_STATES.contains(&lowered.as_str()) {
        Ok(false)
    } else {
        Err(invalid_value(section, key, value, "boolean"))
    }
}

fn invalid_value(section: &str, key: &str, value: &str, expected: &'static str) -> CliError {
    CliError::InvalidConfigValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        expected,
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    Ok(())
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> Result<()> {
    Ok(())
}
