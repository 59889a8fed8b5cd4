//! Google Drive API connector implementation
//!
//! Implements `RemoteLister` and `FolderLookup` for Google Drive API v3.

use async_trait::async_trait;
use bridge_traits::error::Result as BridgeResult;
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
use bridge_traits::storage::{FolderLookup, FolderNode, ListPage, ListingPolicy, RemoteFile, RemoteLister};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use core_auth::AccessTokenSource;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use crate::error::{GoogleDriveError, Result};
use crate::types::{
    ChannelResponse, DriveFile, DriveFolder, FilesListResponse, StartPageTokenResponse,
    WatchChannel, WatchRequest,
};

/// Google Drive API base URL
pub const DRIVE_API_BASE: &str = "https://www.googleapis.com/drive/v3";

/// Viewer link prefix for indexed documents
pub const DRIVE_FILE_URL_BASE: &str = "https://drive.google.com/file/d";

/// Maximum results per page (Google Drive API limit)
const MAX_PAGE_SIZE: u32 = 1000;

/// Fields to request for file resources
const FILE_FIELDS: &str = "id,name,mimeType,size,modifiedTime,parents,trashed";

const API_TIMEOUT: Duration = Duration::from_secs(30);
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(60);

/// Google Drive API connector
///
/// Lists files admitted by a [`ListingPolicy`], downloads their bytes and
/// resolves folder names. The policy's type and trash filters are pushed into
/// the `q` query; the size threshold is applied to each returned page.
///
/// # Example
///
/// ```ignore
/// use provider_google_drive::GoogleDriveConnector;
/// use bridge_traits::storage::RemoteLister;
///
/// let connector = GoogleDriveConnector::new(http_client, token_source, policy);
/// let listing = connector.list_supported_files(None).await;
/// ```
pub struct GoogleDriveConnector {
    http_client: Arc<dyn HttpClient>,
    tokens: Arc<dyn AccessTokenSource>,
    policy: ListingPolicy,
    api_base: String,
    page_size: u32,
}

impl GoogleDriveConnector {
    pub fn new(
        http_client: Arc<dyn HttpClient>,
        tokens: Arc<dyn AccessTokenSource>,
        policy: ListingPolicy,
    ) -> Self {
        Self {
            http_client,
            tokens,
            policy,
            api_base: DRIVE_API_BASE.to_string(),
            page_size: MAX_PAGE_SIZE,
        }
    }

    /// Point the connector at another API root
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.clamp(1, MAX_PAGE_SIZE);
        self
    }

    pub fn policy(&self) -> &ListingPolicy {
        &self.policy
    }

    /// Drive search query for the policy's content types, excluding trash
    pub fn build_query(&self, folder_filter: Option<&str>) -> String {
        let types = self
            .policy
            .supported_content_types
            .iter()
            .map(|ct| format!("mimeType='{}'", escape_query_value(ct)))
            .collect::<Vec<_>>()
            .join(" or ");

        match folder_filter {
            Some(folder) => format!(
                "'{}' in parents and ({}) and trashed = false",
                escape_query_value(folder),
                types
            ),
            None => format!("({}) and trashed = false", types),
        }
    }

    /// Register a `web_hook` channel for change notifications on this drive
    #[instrument(skip(self))]
    pub async fn register_changes_watch(&self, address: &str) -> Result<WatchChannel> {
        let url = format!("{}/changes/startPageToken", self.api_base);
        let start: StartPageTokenResponse = self.get_json(url).await?;
        info!("Fetched changes start page token");

        let channel_id = uuid::Uuid::new_v4().to_string();
        let body = WatchRequest {
            id: &channel_id,
            channel_type: "web_hook",
            address,
        };
        let url = format!(
            "{}/changes/watch?pageToken={}",
            self.api_base,
            urlencoding::encode(&start.start_page_token)
        );
        let request = self
            .authorized(HttpMethod::Post, url)
            .await?
            .json(&body)?;
        let response = self.send(request).await?;
        let channel: ChannelResponse = parse_json(&response)?;

        info!(channel_id = %channel.id, "Registered Drive changes watch channel");
        Ok(WatchChannel {
            expiration: channel.expiration_time(),
            channel_id: channel.id,
            resource_id: channel.resource_id,
            start_page_token: start.start_page_token,
        })
    }

    /// Convert DriveFile to RemoteFile, `None` when the timestamp is unusable
    fn convert_file(drive_file: DriveFile) -> Option<RemoteFile> {
        let modified_at = match DateTime::parse_from_rfc3339(&drive_file.modified_time) {
            Ok(dt) => dt.with_timezone(&Utc),
            Err(e) => {
                warn!(
                    file_id = %drive_file.id,
                    modified_time = %drive_file.modified_time,
                    error = %e,
                    "Skipping file with unparsable modifiedTime"
                );
                return None;
            }
        };

        Some(RemoteFile {
            url: format!("{}/{}", DRIVE_FILE_URL_BASE, drive_file.id),
            size_bytes: drive_file.size.and_then(|s| s.parse().ok()).unwrap_or(0),
            parent_id: drive_file.parents.into_iter().next(),
            id: drive_file.id,
            name: drive_file.name,
            content_type: drive_file.mime_type,
            modified_at,
            trashed: drive_file.trashed,
        })
    }

    async fn authorized(&self, method: HttpMethod, url: String) -> Result<HttpRequest> {
        let token = self
            .tokens
            .access_token()
            .await
            .map_err(|e| GoogleDriveError::AuthenticationFailed(e.to_string()))?;

        Ok(HttpRequest::new(method, url)
            .bearer_token(token)
            .header("Accept", "application/json")
            .timeout(API_TIMEOUT))
    }

    /// Execute and map non-2xx statuses to `ApiError`
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let response = self.http_client.execute(request).await?;
        if response.is_success() {
            debug!(status = response.status, "Drive API request succeeded");
            Ok(response)
        } else {
            warn!(status = response.status, "Drive API request failed");
            Err(GoogleDriveError::ApiError {
                status_code: response.status,
                message: response.error_text(),
            })
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, url: String) -> Result<T> {
        let request = self.authorized(HttpMethod::Get, url).await?;
        let response = self.send(request).await?;
        parse_json(&response)
    }
}

#[async_trait]
impl FolderLookup for GoogleDriveConnector {
    #[instrument(skip(self))]
    async fn folder(&self, folder_id: &str) -> BridgeResult<FolderNode> {
        let url = format!(
            "{}/files/{}?fields=id,name,parents",
            self.api_base,
            urlencoding::encode(folder_id)
        );

        let folder: DriveFolder = self.get_json(url).await.map_err(|e| match e {
            GoogleDriveError::ApiError {
                status_code: 404, ..
            } => GoogleDriveError::FileNotFound {
                file_id: folder_id.to_string(),
            },
            other => other,
        })?;

        Ok(FolderNode {
            id: folder.id,
            name: folder.name,
            parent_id: folder.parents.into_iter().next(),
        })
    }
}

#[async_trait]
impl RemoteLister for GoogleDriveConnector {
    #[instrument(skip(self))]
    async fn list_page(
        &self,
        folder_filter: Option<&str>,
        page_token: Option<String>,
    ) -> BridgeResult<ListPage> {
        let query = self.build_query(folder_filter);
        let mut url = format!(
            "{}/files?q={}&pageSize={}&fields={}",
            self.api_base,
            urlencoding::encode(&query),
            self.page_size,
            urlencoding::encode(&format!("nextPageToken,files({})", FILE_FIELDS))
        );
        if let Some(token) = page_token {
            url.push_str(&format!("&pageToken={}", urlencoding::encode(&token)));
        }

        let response: FilesListResponse = self.get_json(url).await?;
        let returned = response.files.len();
        let files: Vec<RemoteFile> = response
            .files
            .into_iter()
            .filter_map(Self::convert_file)
            .filter(|file| {
                let admitted = self.policy.admits(file);
                if !admitted {
                    debug!(
                        file_id = %file.id,
                        size_bytes = ?file.size_bytes,
                        content_type = %file.content_type,
                        "Excluded by listing policy"
                    );
                }
                admitted
            })
            .collect();

        debug!(
            returned,
            admitted = files.len(),
            has_more = response.next_page_token.is_some(),
            "Listed Drive page"
        );

        Ok(ListPage {
            files,
            next_page_token: response.next_page_token,
        })
    }

    #[instrument(skip(self))]
    async fn download(&self, file_id: &str) -> BridgeResult<Bytes> {
        let url = format!(
            "{}/files/{}?alt=media",
            self.api_base,
            urlencoding::encode(file_id)
        );
        let request = self
            .authorized(HttpMethod::Get, url)
            .await?
            .timeout(DOWNLOAD_TIMEOUT);

        let response = self.send(request).await.map_err(|e| match e {
            GoogleDriveError::ApiError {
                status_code: 404, ..
            } => GoogleDriveError::FileNotFound {
                file_id: file_id.to_string(),
            },
            other => other,
        })?;

        debug!(bytes = response.body.len(), "Downloaded file");
        Ok(response.body)
    }
}

fn parse_json<T: DeserializeOwned>(response: &HttpResponse) -> Result<T> {
    serde_json::from_slice(&response.body)
        .map_err(|e| GoogleDriveError::ParseError(e.to_string()))
}

/// Escape a literal for use inside single quotes in a Drive query
fn escape_query_value(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}
