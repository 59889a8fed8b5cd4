//! Search Index Abstractions
//!
//! The index stores one [`Document`] per remote file, keyed by the remote id.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::Result;

/// Indexed record for one remote file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Remote file id, used as the index document id
    #[serde(skip)]
    pub id: String,
    /// Folder path joined with the file name by `/`
    pub file_name: String,
    pub url: String,
    /// Extracted text, possibly empty
    pub content: String,
    /// Remote modification time at the moment of extraction
    #[serde(rename = "modified")]
    pub modified_at: DateTime<Utc>,
}

/// A single full-text search match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: String,
    pub file_name: String,
    pub url: String,
    pub score: Option<f64>,
}

/// Snapshot of indexed ids and their stored modification times
pub type MetadataSnapshot = HashMap<String, DateTime<Utc>>;

/// Search index port
///
/// Writes are idempotent: upserting the same document twice leaves one
/// record, and deleting a missing id succeeds.
#[async_trait]
pub trait IndexPort: Send + Sync {
    /// Every indexed id with its stored modification time
    ///
    /// Records whose stored time cannot be parsed map to
    /// [`DateTime::<Utc>::MIN_UTC`] so the next pass refreshes them.
    async fn metadata_snapshot(&self) -> Result<MetadataSnapshot>;

    /// Insert or replace a document
    async fn upsert(&self, document: &Document) -> Result<()>;

    /// Remove a document by id
    async fn delete(&self, id: &str) -> Result<()>;

    /// Full-text query over document content
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>>;
}
