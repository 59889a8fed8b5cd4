use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Listing remote files failed: {0}")]
    Listing(String),

    #[error("Reading index snapshot failed: {0}")]
    Snapshot(String),

    #[error("Sync already in progress")]
    InProgress,

    #[error("Sync timeout after {0} seconds")]
    Timeout(u64),

    #[error("Sync cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, SyncError>;
