//! # Bridge Traits
//!
//! Ports between the sync pipeline and the outside world.
//!
//! ## Overview
//!
//! The core crates never talk to Google Drive, Elasticsearch or the network
//! directly. They depend on the traits in this crate, and the adapters
//! (`bridge-desktop`, `provider-google-drive`, `provider-elasticsearch`)
//! implement them.
//!
//! ## Traits
//!
//! - [`HttpClient`](http::HttpClient) - Async HTTP transport with retry
//! - [`RemoteLister`](storage::RemoteLister) - Paginated listing and download of remote files
//! - [`FolderLookup`](storage::FolderLookup) - Folder metadata for path resolution
//! - [`IndexPort`](index::IndexPort) - Snapshot, upsert, delete and search over the index
//! - [`Clock`](time::Clock) - Time source for deterministic testing
//!
//! ## Error Handling
//!
//! All ports use [`BridgeError`](error::BridgeError). Adapters convert their
//! own failures into it with enough context (file id, status code) for the
//! caller to log.
//!
//! ## Thread Safety
//!
//! All ports require `Send + Sync` so they can be shared across the sync
//! worker pool behind `Arc`.

pub mod error;
pub mod http;
pub mod index;
pub mod storage;
pub mod time;

pub use error::BridgeError;

pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse, RetryPolicy};
pub use index::{Document, IndexPort, MetadataSnapshot, SearchHit};
pub use storage::{FolderLookup, FolderNode, ListPage, Listing, ListingPolicy, RemoteFile, RemoteLister};
pub use time::{Clock, LogLevel, SystemClock};
