//! Remote File Store Abstractions
//!
//! The sync pipeline only sees the remote store through [`RemoteLister`]:
//! a paginated listing of supported files, content download, and folder
//! lookups for building human-readable paths.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::Result;

/// Default upper bound on file size admitted to the index (2 MiB)
pub const DEFAULT_MAX_FILE_SIZE_BYTES: u64 = 2 * 1024 * 1024;

/// Content types the default extractor registry understands
pub const DEFAULT_CONTENT_TYPES: &[&str] = &["text/plain", "text/csv", "application/pdf", "image/png"];

/// Metadata of a file in the remote store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteFile {
    /// Opaque remote identifier, also used as the index document id
    pub id: String,
    /// File name without folder components
    pub name: String,
    /// Content type tag (MIME type)
    pub content_type: String,
    /// Size in bytes (0 when the store does not report one)
    pub size_bytes: u64,
    /// Last modification time reported by the store
    pub modified_at: DateTime<Utc>,
    /// Immediate parent folder, if any
    pub parent_id: Option<String>,
    /// Link for opening the file in the store's UI
    pub url: String,
    /// Whether the file sits in the trash
    pub trashed: bool,
}

/// A folder as seen while walking parent links
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderNode {
    pub id: String,
    pub name: String,
    pub parent_id: Option<String>,
}

/// One page of a listing
#[derive(Debug, Clone, Default)]
pub struct ListPage {
    pub files: Vec<RemoteFile>,
    pub next_page_token: Option<String>,
}

/// Result of walking all pages
///
/// `complete` is false when a page failed and listing stopped early; callers
/// must not treat an incomplete listing as the authoritative population.
#[derive(Debug, Clone, Default)]
pub struct Listing {
    pub files: Vec<RemoteFile>,
    pub complete: bool,
}

/// Which files a lister yields
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingPolicy {
    /// Content types admitted to the index
    pub supported_content_types: Vec<String>,
    /// Files strictly larger than this are excluded
    pub max_file_size_bytes: u64,
}

impl Default for ListingPolicy {
    fn default() -> Self {
        Self {
            supported_content_types: DEFAULT_CONTENT_TYPES.iter().map(|s| s.to_string()).collect(),
            max_file_size_bytes: DEFAULT_MAX_FILE_SIZE_BYTES,
        }
    }
}

impl ListingPolicy {
    pub fn supports(&self, content_type: &str) -> bool {
        self.supported_content_types.iter().any(|t| t == content_type)
    }

    /// Whether a file passes the type, size and trash filters
    pub fn admits(&self, file: &RemoteFile) -> bool {
        if file.trashed {
            return false;
        }

        if file.size_bytes > self.max_file_size_bytes {
            debug!(
                file_id = %file.id,
                size = file.size_bytes,
                limit = self.max_file_size_bytes,
                "Skipping file over size limit"
            );
            return false;
        }

        self.supports(&file.content_type)
    }
}

/// Folder lookups used to resolve parent chains
#[async_trait]
pub trait FolderLookup: Send + Sync {
    /// Fetch a single folder by id
    async fn folder(&self, folder_id: &str) -> Result<FolderNode>;
}

/// Remote file store port
///
/// # Example
///
/// ```ignore
/// use bridge_traits::storage::RemoteLister;
///
/// let listing = lister.list_supported_files(None).await;
/// if !listing.complete {
///     tracing::warn!("Listing truncated after {} files", listing.files.len());
/// }
/// ```
#[async_trait]
pub trait RemoteLister: FolderLookup {
    /// Fetch one page of supported files
    ///
    /// Implementations apply their [`ListingPolicy`] before returning, so no
    /// unsupported, oversized or trashed file is ever yielded.
    async fn list_page(
        &self,
        folder_filter: Option<&str>,
        page_token: Option<String>,
    ) -> Result<ListPage>;

    /// Download the full content of a file
    async fn download(&self, file_id: &str) -> Result<Bytes>;

    /// Walk every page of the listing
    ///
    /// A failing page ends the walk early: the files gathered so far are
    /// returned with `complete = false` instead of an error.
    async fn list_supported_files(&self, folder_filter: Option<&str>) -> Listing {
        let mut files = Vec::new();
        let mut page_token = None;
        let mut page_count = 0u32;

        loop {
            page_count += 1;
            match self.list_page(folder_filter, page_token.take()).await {
                Ok(page) => {
                    debug!(page = page_count, files = page.files.len(), "Fetched listing page");
                    files.extend(page.files);

                    match page.next_page_token {
                        Some(token) => page_token = Some(token),
                        None => return Listing { files, complete: true },
                    }
                }
                Err(e) => {
                    warn!(page = page_count, error = %e, "Listing page failed, returning partial listing");
                    return Listing { files, complete: false };
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BridgeError;
    use std::sync::Mutex;

    fn file(id: &str, content_type: &str, size_bytes: u64) -> RemoteFile {
        RemoteFile {
            id: id.to_string(),
            name: format!("{}.bin", id),
            content_type: content_type.to_string(),
            size_bytes,
            modified_at: Utc::now(),
            parent_id: None,
            url: String::new(),
            trashed: false,
        }
    }

    #[test]
    fn test_policy_filters_size_type_and_trash() {
        let policy = ListingPolicy::default();

        assert!(policy.admits(&file("a", "text/plain", 10)));
        assert!(policy.admits(&file("b", "text/csv", DEFAULT_MAX_FILE_SIZE_BYTES)));
        assert!(!policy.admits(&file("c", "text/csv", DEFAULT_MAX_FILE_SIZE_BYTES + 1)));
        assert!(!policy.admits(&file("d", "video/mp4", 10)));

        let mut trashed = file("e", "application/pdf", 10);
        trashed.trashed = true;
        assert!(!policy.admits(&trashed));
    }

    /// Serves scripted pages; `None` entries fail
    struct PagedLister {
        pages: Vec<Option<ListPage>>,
        calls: Mutex<usize>,
    }

    #[async_trait]
    impl FolderLookup for PagedLister {
        async fn folder(&self, folder_id: &str) -> Result<FolderNode> {
            Err(BridgeError::NotFound(folder_id.to_string()))
        }
    }

    #[async_trait]
    impl RemoteLister for PagedLister {
        async fn list_page(
            &self,
            _folder_filter: Option<&str>,
            _page_token: Option<String>,
        ) -> Result<ListPage> {
            let index = {
                let mut calls = self.calls.lock().unwrap();
                *calls += 1;
                *calls - 1
            };
            self.pages[index]
                .clone()
                .ok_or_else(|| BridgeError::OperationFailed("page failed".to_string()))
        }

        async fn download(&self, _file_id: &str) -> Result<Bytes> {
            Ok(Bytes::new())
        }
    }

    #[tokio::test]
    async fn test_listing_walks_all_pages() {
        let lister = PagedLister {
            pages: vec![
                Some(ListPage {
                    files: vec![file("a", "text/plain", 1)],
                    next_page_token: Some("p2".to_string()),
                }),
                Some(ListPage {
                    files: vec![file("b", "text/plain", 1)],
                    next_page_token: None,
                }),
            ],
            calls: Mutex::new(0),
        };

        let listing = lister.list_supported_files(None).await;
        assert!(listing.complete);
        assert_eq!(listing.files.len(), 2);
    }

    #[tokio::test]
    async fn test_failed_page_truncates_listing() {
        let lister = PagedLister {
            pages: vec![
                Some(ListPage {
                    files: vec![file("a", "text/plain", 1)],
                    next_page_token: Some("p2".to_string()),
                }),
                None,
            ],
            calls: Mutex::new(0),
        };

        let listing = lister.list_supported_files(None).await;
        assert!(!listing.complete);
        assert_eq!(listing.files.len(), 1);
        assert_eq!(listing.files[0].id, "a");
    }
}
