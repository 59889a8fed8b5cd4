use bridge_traits::error::BridgeError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ElasticsearchError {
    #[error("Elasticsearch error (status {status_code}): {message}")]
    ApiError { status_code: u16, message: String },

    #[error("Failed to parse Elasticsearch response: {0}")]
    ParseError(String),

    #[error(transparent)]
    BridgeError(#[from] BridgeError),
}

pub type Result<T> = std::result::Result<T, ElasticsearchError>;

impl From<ElasticsearchError> for BridgeError {
    fn from(error: ElasticsearchError) -> Self {
        match error {
            ElasticsearchError::BridgeError(e) => e,
            other => BridgeError::OperationFailed(other.to_string()),
        }
    }
}
