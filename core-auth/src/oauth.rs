//! OAuth 2.0 Refresh-Token Grant
//!
//! Exchanges a long-lived refresh token for a fresh access token at the
//! provider's token endpoint (RFC 6749 section 6). The consent flow that
//! produced the refresh token happens outside this service.
//!
//! # Security
//!
//! Never logs sensitive values (tokens, client secrets).
//!
//! # Example
//!
//! ```no_run
//! use core_auth::oauth::{OAuthConfig, TokenRefresher};
//! use std::sync::Arc;
//!
//! # async fn example() -> core_auth::Result<()> {
//! # use bridge_traits::http::HttpClient;
//! # let http_client: Arc<dyn HttpClient> = todo!();
//! let config = OAuthConfig {
//!     client_id: "your-client-id".to_string(),
//!     client_secret: Some("your-client-secret".to_string()),
//!     token_url: "https://oauth2.googleapis.com/token".to_string(),
//! };
//!
//! let refresher = TokenRefresher::new(config, http_client);
//! let tokens = refresher.refresh_access_token("1//0g...").await?;
//! # Ok(())
//! # }
//! ```

use crate::error::{AuthError, Result};
use crate::types::OAuthTokens;
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest, RetryPolicy};
use bridge_traits::time::{Clock, SystemClock};
use bytes::Bytes;
use serde::Deserialize;
use std::sync::Arc;
use tokio::time::sleep;
use tracing::{debug, info, instrument, warn};

const MAX_ATTEMPTS: u32 = 3;

/// OAuth client registration used for refreshes.
#[derive(Clone)]
pub struct OAuthConfig {
    pub client_id: String,
    pub client_secret: Option<String>,
    pub token_url: String,
}

impl std::fmt::Debug for OAuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "[REDACTED]"))
            .field("token_url", &self.token_url)
            .finish()
    }
}

/// Performs refresh-token grants against a token endpoint.
pub struct TokenRefresher {
    config: OAuthConfig,
    http_client: Arc<dyn HttpClient>,
    clock: Arc<dyn Clock>,
    retry_policy: RetryPolicy,
}

impl TokenRefresher {
    pub fn new(config: OAuthConfig, http_client: Arc<dyn HttpClient>) -> Self {
        Self {
            config,
            http_client,
            clock: Arc::new(SystemClock),
            retry_policy: RetryPolicy {
                max_attempts: MAX_ATTEMPTS,
                ..RetryPolicy::default()
            },
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Refresh an access token.
    ///
    /// 5xx responses and transport failures are retried with exponential
    /// backoff; 4xx responses (revoked or invalid grant) fail immediately.
    /// When the endpoint omits a new refresh token the old one is kept.
    #[instrument(skip(self, refresh_token), fields(token_url = %self.config.token_url))]
    pub async fn refresh_access_token(&self, refresh_token: &str) -> Result<OAuthTokens> {
        let mut params = vec![
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", self.config.client_id.as_str()),
        ];

        if let Some(ref client_secret) = self.config.client_secret {
            params.push(("client_secret", client_secret.as_str()));
        }

        debug!("Refreshing access token");

        let encoded_body = serde_urlencoded::to_string(&params)
            .map_err(|e| AuthError::Other(format!("Failed to encode token request: {}", e)))?;
        let body = Bytes::from(encoded_body);

        let max_attempts = self.retry_policy.max_attempts.max(1);
        let mut attempts = 0;

        loop {
            attempts += 1;

            let request = HttpRequest::new(HttpMethod::Post, self.config.token_url.clone())
                .header("Content-Type", "application/x-www-form-urlencoded")
                .header("Accept", "application/json")
                .body(body.clone());

            let last_error = match self
                .http_client
                .execute_with_retry(request, RetryPolicy::no_retry())
                .await
            {
                Ok(response) if response.is_success() => {
                    let token_response: TokenResponse = response.json().map_err(|e| {
                        AuthError::TokenRefreshFailed(format!(
                            "Failed to parse token response: {}",
                            e
                        ))
                    })?;

                    info!(
                        expires_in = token_response.expires_in,
                        "Successfully refreshed access token"
                    );

                    return Ok(OAuthTokens::new(
                        token_response.access_token,
                        token_response
                            .refresh_token
                            .or_else(|| Some(refresh_token.to_string())),
                        self.clock.now(),
                        token_response.expires_in,
                    ));
                }
                Ok(response) if response.is_client_error() => {
                    let error_body = response.error_text();
                    warn!(
                        status = response.status,
                        error = %error_body,
                        "Token refresh rejected"
                    );

                    return Err(AuthError::TokenRefreshFailed(format!(
                        "Token endpoint returned {}: {}",
                        response.status, error_body
                    )));
                }
                Ok(response) => format!("{} - {}", response.status, response.error_text()),
                Err(e) => e.to_string(),
            };

            if attempts >= max_attempts {
                return Err(AuthError::TokenRefreshFailed(format!(
                    "Token refresh failed after {} attempts. Last error: {}",
                    attempts, last_error
                )));
            }

            let delay = self.retry_policy.delay_for(attempts);
            warn!(
                attempts,
                delay_ms = delay.as_millis() as u64,
                error = %last_error,
                "Token refresh failed, retrying"
            );
            sleep(delay).await;
        }
    }
}

/// Token response from the OAuth provider.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_expires_in() -> i64 {
    3600
}
