//! Refresh token grant against a configured token endpoint

use super::{parse_token_reply, AuthProtocol, TokenErrorPayload, TokenGrant};
use crate::config::{
    CliConfig, CONFIG_CLIENT_ID, CONFIG_CLIENT_SECRET, CONFIG_REFRESH_TOKEN, CONFIG_RETRIES,
    CONFIG_TOKEN_ENDPOINT, CORE_SECTION,
};
use crate::error::{CliError, Result};
use async_trait::async_trait;
use tracing::{debug, warn};

/// Attempts per refresh when `core.retries` is not set
pub const DEFAULT_RETRIES: i64 = 3;

/// Exchanges a long-lived refresh token for an access token
#[derive(Debug, Clone)]
pub struct RefreshTokenProtocol {
    http: reqwest::Client,
    token_endpoint: String,
    client_id: String,
    client_secret: Option<String>,
    refresh_token: String,
    attempts: u32,
}

enum Attempt {
    Issued(TokenGrant),
    Retryable(CliError),
    Fatal(CliError),
}

impl RefreshTokenProtocol {
    pub fn new(
        http: reqwest::Client,
        token_endpoint: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: Option<String>,
        refresh_token: impl Into<String>,
    ) -> Self {
        Self {
            http,
            token_endpoint: token_endpoint.into(),
            client_id: client_id.into(),
            client_secret,
            refresh_token: refresh_token.into(),
            attempts: DEFAULT_RETRIES as u32,
        }
    }

    /// Number of times a failing exchange is attempted; at least once
    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts.max(1);
        self
    }

    pub fn from_config(config: &CliConfig, http: reqwest::Client) -> Result<Self> {
        let retries = config.get_int_or(CORE_SECTION, CONFIG_RETRIES, DEFAULT_RETRIES)?;
        let attempts = u32::try_from(retries.max(1)).unwrap_or(u32::MAX);

        Ok(Self::new(
            http,
            config.get(CORE_SECTION, CONFIG_TOKEN_ENDPOINT)?,
            config.get(CORE_SECTION, CONFIG_CLIENT_ID)?,
            config.get_opt(CORE_SECTION, CONFIG_CLIENT_SECRET),
            config.get(CORE_SECTION, CONFIG_REFRESH_TOKEN)?,
        )
        .with_attempts(attempts))
    }

    async fn exchange(&self) -> Attempt {
        let mut form = vec![
            ("grant_type", "refresh_token"),
            ("client_id", self.client_id.as_str()),
            ("refresh_token", self.refresh_token.as_str()),
        ];
        if let Some(secret) = self.client_secret.as_deref() {
            form.push(("client_secret", secret));
        }

        let response = match self.http.post(&self.token_endpoint).form(&form).send().await {
            Ok(response) => response,
            Err(e) => return Attempt::Retryable(e.into()),
        };

        let status = response.status();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => return Attempt::Retryable(e.into()),
        };

        if status.is_success() {
            return match parse_token_reply(&body) {
                Ok(grant) => Attempt::Issued(grant),
                Err(e) => Attempt::Fatal(e),
            };
        }

        let error = match serde_json::from_str::<TokenErrorPayload>(&body) {
            Ok(payload) => payload.into(),
            Err(_) => CliError::HttpStatus {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
            },
        };
        Attempt::Retryable(error)
    }
}

#[async_trait]
impl AuthProtocol for RefreshTokenProtocol {
    fn name(&self) -> &'static str {
        "refresh_token"
    }

    async fn acquire(&self) -> Result<TokenGrant> {
        let mut attempt = 1;
        loop {
            debug!(attempt, endpoint = %self.token_endpoint, "Requesting access token");
            match self.exchange().await {
                Attempt::Issued(grant) => return Ok(grant),
                Attempt::Fatal(e) => return Err(e),
                Attempt::Retryable(e) if attempt >= self.attempts => return Err(e),
                Attempt::Retryable(e) => {
                    warn!(attempt, attempts = self.attempts, error = %e, "Token request failed, retrying");
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn protocol(server: &MockServer, attempts: u32) -> RefreshTokenProtocol {
        RefreshTokenProtocol::new(
            reqwest::Client::new(),
            format!("{}/oauth2/token", server.uri()),
            "client-1",
            Some("s3cret".to_string()),
            "long-lived",
        )
        .with_attempts(attempts)
    }

    #[tokio::test]
    async fn test_exchange_sends_refresh_grant() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth2/token"))
            .and(body_string_contains("grant_type=refresh_token"))
            .and(body_string_contains("refresh_token=long-lived"))
            .and(body_string_contains("client_secret=s3cret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "fresh",
                "id_token": "id",
                "expires_in": 3600
            })))
            .expect(1)
            .mount(&server)
            .await;

        let grant = protocol(&server, 3).acquire().await.unwrap();
        assert_eq!(grant.access_token, "fresh");
        assert_eq!(grant.expires_in, 3600);
    }

    #[tokio::test]
    async fn test_transient_failures_are_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(2)
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "third-time",
                "expires_in": 60
            })))
            .expect(1)
            .mount(&server)
            .await;

        let grant = protocol(&server, 3).acquire().await.unwrap();
        assert_eq!(grant.access_token, "third-time");
    }

    #[tokio::test]
    async fn test_error_payload_surfaces_after_last_attempt() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": "invalid_grant",
                "error_description": "refresh token revoked",
                "correlation_id": "abc-123"
            })))
            .expect(2)
            .mount(&server)
            .await;

        let err = protocol(&server, 2).acquire().await.unwrap_err();
        match err {
            CliError::Authentication {
                error,
                correlation_id,
                ..
            } => {
                assert_eq!(error, "invalid_grant");
                assert_eq!(correlation_id, "abc-123");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_error_in_success_body_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "error": "interaction_required"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let err = protocol(&server, 3).acquire().await.unwrap_err();
        assert!(matches!(err, CliError::Authentication { .. }));
    }
}
