//! # Google Drive Provider
//!
//! Implements `RemoteLister` for Google Drive API v3.
//!
//! ## Overview
//!
//! This module provides:
//! - Paginated file listing filtered by content type, size and trash state
//! - File downloads via `alt=media`
//! - Folder lookups for building human-readable paths
//! - Push-notification channel registration (`changes.watch`)

pub mod connector;
pub mod error;
pub mod types;

pub use connector::{GoogleDriveConnector, DRIVE_API_BASE, DRIVE_FILE_URL_BASE};
pub use error::{GoogleDriveError, Result};
pub use types::WatchChannel;
