use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

use crate::error::{AuthError, Result};

/// Google's OAuth token endpoint, used when the token file omits `token_uri`
pub const GOOGLE_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// OAuth 2.0 token set held in memory.
///
/// # Examples
///
/// ```
/// use core_auth::OAuthTokens;
/// use chrono::{Duration, Utc};
///
/// let tokens = OAuthTokens {
///     access_token: "ya29.a0...".to_string(),
///     refresh_token: Some("1//0g...".to_string()),
///     expires_at: Utc::now() + Duration::hours(1),
/// };
///
/// assert!(!tokens.is_expired_at(Utc::now(), 300));
/// ```
#[derive(Clone, Serialize, Deserialize)]
pub struct OAuthTokens {
    /// The access token used for API requests
    pub access_token: String,
    /// The refresh token used to obtain new access tokens
    pub refresh_token: Option<String>,
    /// When the access token expires (UTC)
    pub expires_at: DateTime<Utc>,
}

impl OAuthTokens {
    /// Create a token set expiring `expires_in` seconds after `issued_at`
    pub fn new(
        access_token: String,
        refresh_token: Option<String>,
        issued_at: DateTime<Utc>,
        expires_in: i64,
    ) -> Self {
        Self {
            access_token,
            refresh_token,
            expires_at: issued_at + Duration::seconds(expires_in),
        }
    }

    /// Whether the token is expired or will expire within `buffer_seconds`
    /// of `now`
    pub fn is_expired_at(&self, now: DateTime<Utc>, buffer_seconds: i64) -> bool {
        match self
            .expires_at
            .checked_sub_signed(Duration::seconds(buffer_seconds))
        {
            Some(refresh_at) => now >= refresh_at,
            None => true,
        }
    }
}

// Custom Debug implementation to avoid logging tokens
impl fmt::Debug for OAuthTokens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthTokens")
            .field("access_token", &"[REDACTED]")
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Google "authorized user" credentials file.
///
/// This is the JSON written by Google's client libraries after the consent
/// flow: the last access token, the long-lived refresh token and the client
/// registration needed to refresh it.
#[derive(Clone, Deserialize)]
pub struct AuthorizedUserFile {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub token_uri: Option<String>,
    pub client_id: String,
    #[serde(default)]
    pub client_secret: Option<String>,
    #[serde(default)]
    pub scopes: Vec<String>,
    /// Expiry of `token`, RFC 3339 with or without a zone suffix
    #[serde(default)]
    pub expiry: Option<String>,
}

impl AuthorizedUserFile {
    /// Read and parse a token file
    pub async fn load(path: &Path) -> Result<Self> {
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| AuthError::TokenFile {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;

        Self::parse(&raw).map_err(|e| AuthError::TokenFile {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
    }

    pub fn parse(raw: &str) -> Result<Self> {
        serde_json::from_str(raw)
            .map_err(|e| AuthError::Other(format!("Invalid authorized user JSON: {}", e)))
    }

    pub fn token_uri(&self) -> &str {
        self.token_uri.as_deref().unwrap_or(GOOGLE_TOKEN_URI)
    }

    /// Parsed expiry; a naive timestamp is read as UTC
    pub fn expiry_time(&self) -> Option<DateTime<Utc>> {
        let raw = self.expiry.as_deref()?;
        DateTime::parse_from_rfc3339(raw)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
            .or_else(|| {
                chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
                    .ok()
                    .map(|naive| naive.and_utc())
            })
    }

    /// Initial in-memory token set
    ///
    /// A missing token or unreadable expiry yields an already-expired set so
    /// the first request triggers a refresh.
    pub fn initial_tokens(&self) -> OAuthTokens {
        let expires_at = match (&self.token, self.expiry_time()) {
            (Some(_), Some(expiry)) => expiry,
            _ => DateTime::<Utc>::MIN_UTC,
        };

        OAuthTokens {
            access_token: self.token.clone().unwrap_or_default(),
            refresh_token: self.refresh_token.clone(),
            expires_at,
        }
    }
}

impl fmt::Debug for AuthorizedUserFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthorizedUserFile")
            .field("token_uri", &self.token_uri())
            .field("client_id", &self.client_id)
            .field("scopes", &self.scopes)
            .field("expiry", &self.expiry)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const TOKEN_JSON: &str = r#"{
        "token": "ya29.cached",
        "refresh_token": "1//refresh",
        "token_uri": "https://oauth2.googleapis.com/token",
        "client_id": "client.apps.googleusercontent.com",
        "client_secret": "shh",
        "scopes": ["https://www.googleapis.com/auth/drive.readonly"],
        "universe_domain": "googleapis.com",
        "account": "",
        "expiry": "2024-05-21T10:20:30.123456Z"
    }"#;

    #[test]
    fn test_tokens_expiry_buffer() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let tokens = OAuthTokens::new("a".to_string(), None, now, 600);

        assert!(!tokens.is_expired_at(now, 300));
        assert!(tokens.is_expired_at(now + Duration::seconds(301), 300));
        assert!(tokens.is_expired_at(now + Duration::seconds(600), 0));
    }

    #[test]
    fn test_debug_redacts_tokens() {
        let tokens = OAuthTokens::new(
            "ya29.secret".to_string(),
            Some("1//secret".to_string()),
            Utc::now(),
            3600,
        );
        let debug = format!("{:?}", tokens);
        assert!(!debug.contains("secret"));

        let file = AuthorizedUserFile::parse(TOKEN_JSON).unwrap();
        let debug = format!("{:?}", file);
        assert!(!debug.contains("1//refresh"));
        assert!(!debug.contains("shh"));
    }

    #[test]
    fn test_parse_authorized_user_file() {
        let file = AuthorizedUserFile::parse(TOKEN_JSON).unwrap();

        assert_eq!(file.client_id, "client.apps.googleusercontent.com");
        assert_eq!(file.token_uri(), GOOGLE_TOKEN_URI);
        assert_eq!(
            file.expiry_time(),
            Some(
                Utc.with_ymd_and_hms(2024, 5, 21, 10, 20, 30).unwrap()
                    + Duration::microseconds(123_456)
            )
        );

        let tokens = file.initial_tokens();
        assert_eq!(tokens.access_token, "ya29.cached");
        assert_eq!(tokens.refresh_token.as_deref(), Some("1//refresh"));
    }

    #[test]
    fn test_naive_expiry_is_utc() {
        let file = AuthorizedUserFile::parse(
            r#"{"client_id": "c", "token": "t", "expiry": "2024-05-21T10:20:30"}"#,
        )
        .unwrap();
        assert_eq!(
            file.expiry_time(),
            Some(Utc.with_ymd_and_hms(2024, 5, 21, 10, 20, 30).unwrap())
        );
    }

    #[test]
    fn test_missing_token_starts_expired() {
        let file =
            AuthorizedUserFile::parse(r#"{"client_id": "c", "refresh_token": "r"}"#).unwrap();
        let tokens = file.initial_tokens();

        assert!(tokens.is_expired_at(Utc::now(), 0));
        assert_eq!(file.token_uri(), GOOGLE_TOKEN_URI);
    }
}
