//! HTTP API client for the platform services
//!
//! All calls go through one request path that injects credentials, tags the
//! request with a fresh correlation id and classifies the response status.

use crate::auth::CredentialManager;
use crate::config::{
    CliConfig, CONFIG_DATA_PARTITION_ID, CONFIG_ENTITLEMENTS_URL, CONFIG_FILE_URL,
    CONFIG_LEGAL_URL, CONFIG_SCHEMA_URL, CONFIG_SEARCH_URL, CONFIG_SERVER, CONFIG_STORAGE_URL,
    CONFIG_TIMEOUT, CONFIG_UNIT_URL, CONFIG_WORKFLOW_URL, CORE_SECTION,
};
use crate::error::{CliError, Result};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Method, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;
use std::time::Duration;
use tracing::debug;
use url::Url;
use uuid::Uuid;

// ============================================================================
// API Client Constants
// ============================================================================

/// Default timeout for API requests in seconds.
/// Overridden by `core.timeout`.
pub const DEFAULT_API_TIMEOUT_SECS: i64 = 300;

/// Statuses accepted when the caller does not name its own
pub const DEFAULT_OK_STATUSES: &[u16] = &[200];

/// Header carrying the per-request correlation id
pub const CORRELATION_ID_HEADER: &str = "correlation-id";

/// Header carrying the data partition
pub const DATA_PARTITION_HEADER: &str = "data-partition-id";

/// Longest upload error body kept in [`CliError::Upload`]
const UPLOAD_ERROR_BODY_LIMIT: usize = 250;

/// Platform service addressed by a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Service {
    Entitlements,
    File,
    Legal,
    Schema,
    Search,
    Storage,
    Unit,
    Workflow,
}

impl Service {
    /// Configuration key holding this service's path relative to the server
    pub fn config_key(self) -> &'static str {
        match self {
            Service::Entitlements => CONFIG_ENTITLEMENTS_URL,
            Service::File => CONFIG_FILE_URL,
            Service::Legal => CONFIG_LEGAL_URL,
            Service::Schema => CONFIG_SCHEMA_URL,
            Service::Search => CONFIG_SEARCH_URL,
            Service::Storage => CONFIG_STORAGE_URL,
            Service::Unit => CONFIG_UNIT_URL,
            Service::Workflow => CONFIG_WORKFLOW_URL,
        }
    }
}

/// Status line of a service answer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceStatus {
    pub code: u16,
    pub reason: String,
}

/// Client for the platform services
pub struct OsduClient {
    http: Client,
    config: CliConfig,
    server: Url,
    data_partition_id: String,
    credentials: CredentialManager,
}

impl OsduClient {
    /// Build a client and its credential manager from configuration
    pub fn new(config: &CliConfig) -> Result<Self> {
        let http = build_http_client(config)?;
        let credentials = CredentialManager::from_config(config, http.clone())?;
        Self::with_credentials(config, http, credentials)
    }

    /// Build a client around an existing credential manager
    pub fn with_credentials(
        config: &CliConfig,
        http: Client,
        credentials: CredentialManager,
    ) -> Result<Self> {
        let server = Url::parse(&config.get(CORE_SECTION, CONFIG_SERVER)?)?;
        let data_partition_id = config.get(CORE_SECTION, CONFIG_DATA_PARTITION_ID)?;

        Ok(Self {
            http,
            config: config.clone(),
            server,
            data_partition_id,
            credentials,
        })
    }

    pub fn data_partition_id(&self) -> &str {
        &self.data_partition_id
    }

    pub fn credentials(&self) -> &CredentialManager {
        &self.credentials
    }

    /// Resolve `server` joined with the service path, then `extra` appended verbatim
    pub fn url(&self, service: Service, extra: &str) -> Result<Url> {
        let service_path = self.config.get(CORE_SECTION, service.config_key())?;
        let base = self.server.join(&service_path)?;
        Ok(Url::parse(&format!("{}{}", base, extra))?)
    }

    /// GET and decode a JSON response
    pub async fn get_json<T: DeserializeOwned>(&self, service: Service, extra: &str) -> Result<T> {
        let url = self.url(service, extra)?;
        let body = self
            .send(Method::GET, url, None::<&()>, DEFAULT_OK_STATUSES)
            .await?;
        decode(&body)
    }

    /// POST a JSON body and decode the JSON response
    pub async fn post_json<B, T>(&self, service: Service, extra: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.post_json_accepting(service, extra, body, DEFAULT_OK_STATUSES)
            .await
    }

    /// POST a JSON body, accepting any of `ok_statuses`
    pub async fn post_json_accepting<B, T>(
        &self,
        service: Service,
        extra: &str,
        body: &B,
        ok_statuses: &[u16],
    ) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.url(service, extra)?;
        let body = self.send(Method::POST, url, Some(body), ok_statuses).await?;
        decode(&body)
    }

    /// DELETE, accepting any of `ok_statuses`; the body is ignored
    pub async fn delete(&self, service: Service, extra: &str, ok_statuses: &[u16]) -> Result<()> {
        let url = self.url(service, extra)?;
        self.send(Method::DELETE, url, None::<&()>, ok_statuses)
            .await?;
        Ok(())
    }

    /// GET and report the response status whatever it is
    pub async fn service_status(&self, service: Service, extra: &str) -> Result<ServiceStatus> {
        let url = self.url(service, extra)?;
        let (response, _) = self.dispatch(Method::GET, url, None::<&()>).await?;
        let status = response.status();
        Ok(ServiceStatus {
            code: status.as_u16(),
            reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
        })
    }

    /// PUT a local file to a pre-signed blob URL
    ///
    /// The signed URL carries its own authorization, so no bearer token is sent.
    pub async fn upload_file(&self, signed_url: &str, path: &Path) -> Result<()> {
        let bytes = tokio::fs::read(path).await?;
        debug!(path = %path.display(), size = bytes.len(), "Uploading file");

        let response = self
            .http
            .put(signed_url)
            .header("x-ms-blob-type", "BlockBlob")
            .body(bytes)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CliError::Upload {
                status: status.as_u16(),
                body: body.chars().take(UPLOAD_ERROR_BODY_LIMIT).collect(),
            });
        }

        Ok(())
    }

    async fn dispatch<B>(
        &self,
        method: Method,
        url: Url,
        body: Option<&B>,
    ) -> Result<(Response, String)>
    where
        B: Serialize + ?Sized,
    {
        let token = self.credentials.get_token().await?;
        let correlation_id = Uuid::new_v4().to_string();
        debug!(%method, %url, %correlation_id, "Sending request");

        let mut request = self
            .http
            .request(method, url)
            .header(CONTENT_TYPE, "application/json")
            .header(DATA_PARTITION_HEADER, &self.data_partition_id)
            .header(CORRELATION_ID_HEADER, &correlation_id)
            .bearer_auth(token);
        if let Some(body) = body {
            request = request.json(body);
        }

        Ok((request.send().await?, correlation_id))
    }

    async fn send<B>(
        &self,
        method: Method,
        url: Url,
        body: Option<&B>,
        ok_statuses: &[u16],
    ) -> Result<String>
    where
        B: Serialize + ?Sized,
    {
        let (response, correlation_id) = self.dispatch(method, url, body).await?;
        let status = response.status();
        let text = response.text().await?;

        if !ok_statuses.contains(&status.as_u16()) {
            debug!(status = status.as_u16(), %correlation_id, body = %text, "Unexpected response status");
            return Err(CliError::HttpStatus {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
            });
        }

        Ok(text)
    }
}

fn decode<T: DeserializeOwned>(body: &str) -> Result<T> {
    serde_json::from_str(body).map_err(|e| {
        debug!(body, "Response is not the expected JSON");
        CliError::JsonDecode(e)
    })
}

/// Shared HTTP transport honouring `core.timeout`
pub fn build_http_client(config: &CliConfig) -> Result<Client> {
    let timeout_secs = config.get_int_or(CORE_SECTION, CONFIG_TIMEOUT, DEFAULT_API_TIMEOUT_SECS)?;
    let timeout_secs = u64::try_from(timeout_secs).map_err(|_| CliError::InvalidConfigValue {
        section: CORE_SECTION.to_string(),
        key: CONFIG_TIMEOUT.to_string(),
        value: timeout_secs.to_string(),
        expected: "non-negative integer",
    })?;

    Ok(Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()?)
}
