//! Access token providers for API adapters.

use async_trait::async_trait;
use bridge_traits::http::HttpClient;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};

use crate::error::{AuthError, Result};
use crate::oauth::{OAuthConfig, TokenRefresher};
use crate::types::{AuthorizedUserFile, OAuthTokens};

/// Refresh this many seconds before the provider-reported expiry
pub const TOKEN_REFRESH_BUFFER_SECS: i64 = 300;

/// Supplies bearer tokens to API adapters.
#[async_trait]
pub trait AccessTokenSource: Send + Sync {
    /// A token valid for at least the refresh buffer
    async fn access_token(&self) -> Result<String>;
}

/// Fixed token, for tests and short-lived tooling.
#[derive(Clone)]
pub struct StaticTokenSource(String);

impl StaticTokenSource {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

#[async_trait]
impl AccessTokenSource for StaticTokenSource {
    async fn access_token(&self) -> Result<String> {
        Ok(self.0.clone())
    }
}

/// Token source backed by a refresh token.
///
/// The cached token is reused until it is within
/// [`TOKEN_REFRESH_BUFFER_SECS`] of expiry. The lock is held across the
/// refresh so concurrent callers wait for one refresh instead of racing.
/// Refreshed tokens are kept in memory only.
pub struct RefreshingTokenSource {
    refresher: TokenRefresher,
    tokens: Mutex<OAuthTokens>,
}

impl RefreshingTokenSource {
    pub fn new(refresher: TokenRefresher, tokens: OAuthTokens) -> Self {
        Self {
            refresher,
            tokens: Mutex::new(tokens),
        }
    }

    /// Build from a Google authorized-user token file
    pub async fn from_authorized_user_file(
        path: &Path,
        http_client: Arc<dyn HttpClient>,
    ) -> Result<Self> {
        let file = AuthorizedUserFile::load(path).await?;
        info!(
            client_id = %file.client_id,
            has_refresh_token = file.refresh_token.is_some(),
            "Loaded authorized user credentials"
        );
        Ok(Self::from_file_contents(&file, http_client))
    }

    pub fn from_file_contents(file: &AuthorizedUserFile, http_client: Arc<dyn HttpClient>) -> Self {
        let refresher = TokenRefresher::new(
            OAuthConfig {
                client_id: file.client_id.clone(),
                client_secret: file.client_secret.clone(),
                token_url: file.token_uri().to_string(),
            },
            http_client,
        );
        Self::new(refresher, file.initial_tokens())
    }
}

#[async_trait]
impl AccessTokenSource for RefreshingTokenSource {
    #[instrument(skip(self))]
    async fn access_token(&self) -> Result<String> {
        let mut tokens = self.tokens.lock().await;

        let now = self.refresher.clock().now();
        if !tokens.is_expired_at(now, TOKEN_REFRESH_BUFFER_SECS) {
            debug!("Token is valid, no refresh needed");
            return Ok(tokens.access_token.clone());
        }

        info!("Token expired or expiring soon, refreshing");

        let refresh_token = tokens
            .refresh_token
            .clone()
            .ok_or(AuthError::NoRefreshToken)?;

        let refreshed = self.refresher.refresh_access_token(&refresh_token).await?;
        let access_token = refreshed.access_token.clone();
        *tokens = refreshed;

        Ok(access_token)
    }
}
