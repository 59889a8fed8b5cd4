//! # Elasticsearch Provider
//!
//! Implements `IndexPort` over the Elasticsearch REST API.
//!
//! Documents are stored under the remote file id with the fields
//! `file_name`, `url`, `content` and `modified`.

pub mod error;
pub mod indexer;
pub mod types;

pub use error::{ElasticsearchError, Result};
pub use indexer::{ElasticsearchIndexer, DEFAULT_SEARCH_LIMIT};
