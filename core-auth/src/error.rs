use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Token file unreadable at {path}: {reason}")]
    TokenFile { path: String, reason: String },

    #[error("Token refresh failed: {0}")]
    TokenRefreshFailed(String),

    #[error("Access token expired and no refresh token is available")]
    NoRefreshToken,

    #[error("Authentication error: {0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, AuthError>;
