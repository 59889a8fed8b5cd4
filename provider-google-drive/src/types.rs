//! Google Drive API response types
//!
//! Data structures for deserializing Google Drive API v3 responses.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Google Drive API file resource
///
/// See: https://developers.google.com/drive/api/v3/reference/files#resource
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    pub id: String,

    pub name: String,

    pub mime_type: String,

    /// Size in bytes as a decimal string (omitted for Google-native formats)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,

    /// Modification time (RFC 3339)
    pub modified_time: String,

    /// Parent folder IDs
    #[serde(default)]
    pub parents: Vec<String>,

    #[serde(default)]
    pub trashed: bool,
}

/// Google Drive API files.list response
///
/// See: https://developers.google.com/drive/api/v3/reference/files/list
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilesListResponse {
    #[serde(default)]
    pub files: Vec<DriveFile>,

    /// Token for next page
    #[serde(default)]
    pub next_page_token: Option<String>,
}

/// Folder resource as returned by files.get with `fields=id,name,parents`
#[derive(Debug, Deserialize)]
pub struct DriveFolder {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub parents: Vec<String>,
}

/// Google Drive API changes.getStartPageToken response
///
/// See: https://developers.google.com/drive/api/v3/reference/changes/getStartPageToken
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartPageTokenResponse {
    pub start_page_token: String,
}

/// Body of a changes.watch request
#[derive(Debug, Serialize)]
pub struct WatchRequest<'a> {
    pub id: &'a str,
    #[serde(rename = "type")]
    pub channel_type: &'a str,
    pub address: &'a str,
}

/// Google Drive API channel resource
///
/// See: https://developers.google.com/drive/api/v3/reference/channels
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelResponse {
    pub id: String,
    #[serde(default)]
    pub resource_id: Option<String>,
    /// Milliseconds since the Unix epoch, as a string
    #[serde(default)]
    pub expiration: Option<String>,
}

/// A registered push-notification channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WatchChannel {
    pub channel_id: String,
    pub resource_id: Option<String>,
    pub start_page_token: String,
    pub expiration: Option<DateTime<Utc>>,
}

impl ChannelResponse {
    pub fn expiration_time(&self) -> Option<DateTime<Utc>> {
        self.expiration
            .as_deref()
            .and_then(|ms| ms.parse::<i64>().ok())
            .and_then(DateTime::from_timestamp_millis)
    }
}
