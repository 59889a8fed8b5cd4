//! # Sync & Indexing Module
//!
//! Keeps a search index consistent with a remote drive.
//!
//! ## Components
//!
//! - **Reconciliation** (`reconcile`): Three-way diff of `{id → modified}` maps
//! - **Folder Paths** (`folder_path`): Memoized parent-chain resolution per pass
//! - **Sync Report** (`report`): Per-pass counters and per-file failures
//! - **Sync Coordinator** (`coordinator`): Single-flight passes with a bounded worker pool

pub mod coordinator;
pub mod error;
pub mod folder_path;
pub mod reconcile;
pub mod report;

pub use coordinator::{SyncConfig, SyncCoordinator};
pub use error::{Result, SyncError};
pub use folder_path::{document_file_name, FolderPathResolver, MAX_FOLDER_DEPTH};
pub use reconcile::{classify, Classification};
pub use report::{FailureStage, FileFailure, SyncReport};
