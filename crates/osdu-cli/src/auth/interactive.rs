//! Interactive sign-in backed by a persisted session cache
//!
//! A token request first tries the refresh token remembered for this client
//! and authority. If there is none, or the provider rejects it, the user signs
//! in through the OAuth2 device authorization flow. The rotated refresh token
//! is written back to the session cache, which is only rewritten when its
//! contents changed.

use super::{parse_token_reply, AuthProtocol, TokenErrorPayload, TokenGrant};
use crate::config::{
    CliConfig, CONFIG_AUTHENTICATION_AUTHORITY, CONFIG_AUTHENTICATION_SCOPES, CONFIG_CLIENT_ID,
    CONFIG_TOKEN_CACHE, CORE_SECTION,
};
use crate::error::{CliError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Session cache file name inside the configuration directory
pub const DEFAULT_TOKEN_CACHE_FILE: &str = "token_cache.json";

const DEVICE_CODE_GRANT: &str = "urn:ietf:params:oauth:grant-type:device_code";
const OFFLINE_ACCESS: &str = "offline_access";
const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;
const SLOW_DOWN_INCREMENT_SECS: u64 = 5;

/// One remembered sign-in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedAccount {
    pub client_id: String,
    pub authority: String,
    pub refresh_token: String,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct SessionCacheData {
    #[serde(default)]
    accounts: Vec<CachedAccount>,
}

/// Refresh tokens remembered between runs
#[derive(Debug)]
pub struct SessionCache {
    path: PathBuf,
    data: SessionCacheData,
    changed: bool,
}

impl SessionCache {
    /// Load the cache, starting empty when the file is missing or unreadable
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let data = match std::fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                warn!(path = %path.display(), error = %e, "Ignoring unreadable session cache");
                SessionCacheData::default()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => SessionCacheData::default(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Ignoring unreadable session cache");
                SessionCacheData::default()
            }
        };

        Self {
            path,
            data,
            changed: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn account(&self, client_id: &str, authority: &str) -> Option<&CachedAccount> {
        self.data
            .accounts
            .iter()
            .find(|a| a.client_id == client_id && a.authority == authority)
    }

    /// Insert or replace the account for its client and authority
    pub fn remember(&mut self, account: CachedAccount) {
        match self
            .data
            .accounts
            .iter_mut()
            .find(|a| a.client_id == account.client_id && a.authority == account.authority)
        {
            Some(existing) if existing.refresh_token == account.refresh_token => return,
            Some(existing) => *existing = account,
            None => self.data.accounts.push(account),
        }
        self.changed = true;
    }

    pub fn forget(&mut self, client_id: &str, authority: &str) {
        let before = self.data.accounts.len();
        self.data
            .accounts
            .retain(|a| !(a.client_id == client_id && a.authority == authority));
        if self.data.accounts.len() != before {
            self.changed = true;
        }
    }

    pub fn has_state_changed(&self) -> bool {
        self.changed
    }

    /// Write the cache if it changed since it was loaded or last flushed
    pub fn flush(&mut self) -> Result<()> {
        if !self.changed {
            return Ok(());
        }

        let dir = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir)?;

        let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
        serde_json::to_writer_pretty(&mut tmp, &self.data)?;
        tmp.flush()?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(tmp.path(), std::fs::Permissions::from_mode(0o600))?;
        }

        tmp.persist(&self.path).map_err(|e| CliError::Io(e.error))?;
        self.changed = false;
        debug!(path = %self.path.display(), "Session cache written");
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct DeviceCodeResponse {
    device_code: String,
    user_code: String,
    verification_uri: String,
    expires_in: u64,
    #[serde(default)]
    interval: Option<u64>,
    #[serde(default)]
    message: Option<String>,
}

/// Device login with silent reuse of remembered refresh tokens
pub struct InteractiveProtocol {
    http: reqwest::Client,
    client_id: String,
    authority: String,
    scopes: Vec<String>,
    open_browser: bool,
    cache: Mutex<SessionCache>,
}

impl InteractiveProtocol {
    pub fn new(
        http: reqwest::Client,
        client_id: impl Into<String>,
        authority: impl Into<String>,
        scopes: &str,
        cache: SessionCache,
    ) -> Self {
        let mut scopes: Vec<String> = scopes
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        if !scopes.iter().any(|s| s == OFFLINE_ACCESS) {
            scopes.push(OFFLINE_ACCESS.to_string());
        }

        Self {
            http,
            client_id: client_id.into(),
            authority: authority.into().trim_end_matches('/').to_string(),
            scopes,
            open_browser: false,
            cache: Mutex::new(cache),
        }
    }

    /// Also open the verification page in the default browser
    pub fn open_browser(mut self, open: bool) -> Self {
        self.open_browser = open;
        self
    }

    pub fn from_config(config: &CliConfig, http: reqwest::Client) -> Result<Self> {
        let cache_path = config
            .get_opt(CORE_SECTION, CONFIG_TOKEN_CACHE)
            .map(PathBuf::from)
            .unwrap_or_else(|| config.config_dir().join(DEFAULT_TOKEN_CACHE_FILE));

        Ok(Self::new(
            http,
            config.get(CORE_SECTION, CONFIG_CLIENT_ID)?,
            config.get(CORE_SECTION, CONFIG_AUTHENTICATION_AUTHORITY)?,
            &config.get(CORE_SECTION, CONFIG_AUTHENTICATION_SCOPES)?,
            SessionCache::load(cache_path),
        )
        .open_browser(true))
    }

    fn token_endpoint(&self) -> String {
        format!("{}/oauth2/v2.0/token", self.authority)
    }

    fn device_code_endpoint(&self) -> String {
        format!("{}/oauth2/v2.0/devicecode", self.authority)
    }

    fn scope(&self) -> String {
        self.scopes.join(" ")
    }

    fn cache(&self) -> std::sync::MutexGuard<'_, SessionCache> {
        // A poisoned lock still holds a usable cache.
        self.cache.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn remember(&self, grant: &TokenGrant) {
        if let Some(refresh_token) = grant.refresh_token.clone() {
            self.cache().remember(CachedAccount {
                client_id: self.client_id.clone(),
                authority: self.authority.clone(),
                refresh_token,
                updated_at: Utc::now(),
            });
        }
    }

    async fn acquire_silent(&self, refresh_token: &str) -> Result<TokenGrant> {
        let scope = self.scope();
        let form = [
            ("grant_type", "refresh_token"),
            ("client_id", self.client_id.as_str()),
            ("refresh_token", refresh_token),
            ("scope", scope.as_str()),
        ];
        let response = self.http.post(self.token_endpoint()).form(&form).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if status.is_success() {
            parse_token_reply(&body)
        } else {
            Err(rejection(status, &body))
        }
    }

    async fn acquire_with_device_code(&self) -> Result<TokenGrant> {
        let scope = self.scope();
        let response = self
            .http
            .post(self.device_code_endpoint())
            .form(&[("client_id", self.client_id.as_str()), ("scope", scope.as_str())])
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(rejection(status, &body));
        }
        let device: DeviceCodeResponse = serde_json::from_str(&body)?;

        match device.message.as_deref() {
            Some(message) => eprintln!("{}", message),
            None => eprintln!(
                "To sign in, open {} and enter the code {}",
                device.verification_uri, device.user_code
            ),
        }
        if self.open_browser {
            if let Err(e) = open::that(&device.verification_uri) {
                debug!(error = %e, "Could not open browser");
            }
        }

        let deadline = std::time::Instant::now() + Duration::from_secs(device.expires_in);
        let mut interval = device.interval.unwrap_or(DEFAULT_POLL_INTERVAL_SECS);

        loop {
            tokio::time::sleep(Duration::from_secs(interval)).await;

            let response = self
                .http
                .post(self.token_endpoint())
                .form(&[
                    ("grant_type", DEVICE_CODE_GRANT),
                    ("client_id", self.client_id.as_str()),
                    ("device_code", device.device_code.as_str()),
                ])
                .send()
                .await?;
            let status = response.status();
            let body = response.text().await?;

            if status.is_success() {
                return parse_token_reply(&body);
            }

            let payload: TokenErrorPayload = match serde_json::from_str(&body) {
                Ok(payload) => payload,
                Err(_) => return Err(rejection(status, &body)),
            };
            match payload.error.as_str() {
                "authorization_pending" => {}
                "slow_down" => interval += SLOW_DOWN_INCREMENT_SECS,
                _ => return Err(payload.into()),
            }

            if std::time::Instant::now() >= deadline {
                return Err(CliError::Authentication {
                    error: "expired_token".to_string(),
                    description: "the device code expired before sign-in completed".to_string(),
                    correlation_id: String::new(),
                });
            }
        }
    }
}

fn rejection(status: reqwest::StatusCode, body: &str) -> CliError {
    match serde_json::from_str::<TokenErrorPayload>(body) {
        Ok(payload) => payload.into(),
        Err(_) => CliError::HttpStatus {
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
        },
    }
}

#[async_trait]
impl AuthProtocol for InteractiveProtocol {
    fn name(&self) -> &'static str {
        "interactive"
    }

    async fn acquire(&self) -> Result<TokenGrant> {
        let remembered = self
            .cache()
            .account(&self.client_id, &self.authority)
            .map(|a| a.refresh_token.clone());

        if let Some(refresh_token) = remembered {
            match self.acquire_silent(&refresh_token).await {
                Ok(grant) => {
                    debug!("Token acquired silently");
                    self.remember(&grant);
                    return Ok(grant);
                }
                Err(e) => {
                    info!(error = %e, "Silent sign-in failed, starting device login");
                    self.cache().forget(&self.client_id, &self.authority);
                }
            }
        }

        let grant = self.acquire_with_device_code().await?;
        self.remember(&grant);
        Ok(grant)
    }

    fn flush(&self) -> Result<()> {
        self.cache().flush()
    }
}
