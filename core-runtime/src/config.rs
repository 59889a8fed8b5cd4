//! # Service Configuration
//!
//! The configuration system uses a builder pattern to construct a
//! [`ServiceConfig`] holding every setting the sync service needs. Values
//! come from code, from `DRIVE_SEARCH_*` environment variables, or both, and
//! are validated before use so a bad deployment fails at startup instead of
//! halfway through a sync pass.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::ServiceConfig;
//!
//! let config = ServiceConfig::builder()
//!     .elasticsearch_url("http://search.internal:9200")
//!     .index_name("documents")
//!     .max_concurrent_files(8)
//!     .build()?;
//! ```
//!
//! ## Environment
//!
//! ```ignore
//! dotenv::dotenv().ok();
//! let config = ServiceConfig::from_env()?;
//! ```

use crate::error::{Error, Result};
use crate::logging::{LogFormat, LoggingConfig};
use bridge_traits::storage::{ListingPolicy, DEFAULT_CONTENT_TYPES, DEFAULT_MAX_FILE_SIZE_BYTES};
use bridge_traits::time::LogLevel;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Prefix shared by every environment key
pub const ENV_PREFIX: &str = "DRIVE_SEARCH_";

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8000";
const DEFAULT_TOKEN_PATH: &str = "config/token.json";
const DEFAULT_ELASTICSEARCH_URL: &str = "http://localhost:9200";
const DEFAULT_INDEX_NAME: &str = "documents";
const DEFAULT_MAX_CONCURRENT_FILES: usize = 4;
const DEFAULT_SYNC_TIMEOUT_SECS: u64 = 600;
const DEFAULT_WEBHOOK_SYNC_TIMEOUT_SECS: u64 = 120;
const DEFAULT_TESSERACT_PATH: &str = "tesseract";
const DEFAULT_OCR_LANGUAGE: &str = "eng";

/// Elasticsearch's default `index.max_result_window`
pub const MAX_SEARCH_LIMIT: usize = 10_000;

/// Upper bound on parallel file workers
pub const MAX_CONCURRENT_FILES_LIMIT: usize = 64;

/// Settings for the sync service.
///
/// Use [`ServiceConfigBuilder`] or [`ServiceConfig::from_env`] to construct
/// instances.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Socket address the HTTP server binds to
    pub bind_addr: SocketAddr,

    /// Path prefix for every route (e.g. `/api`), normalized without a
    /// trailing slash
    pub api_prefix: Option<String>,

    /// Google authorized-user token file
    pub token_path: PathBuf,

    /// Base URL of the Elasticsearch cluster
    pub elasticsearch_url: String,

    /// Index holding one document per remote file
    pub index_name: String,

    /// Content types admitted to the index
    pub content_types: Vec<String>,

    /// Files larger than this are never listed
    pub max_file_size_bytes: u64,

    /// Restrict listing to direct children of this folder
    pub folder_id: Option<String>,

    /// Size of the per-file worker pool
    pub max_concurrent_files: usize,

    /// Upper bound for passes started from `/sync`, the CLI or startup
    pub sync_timeout: Duration,

    /// Upper bound for passes started by a change notification
    pub webhook_sync_timeout: Duration,

    /// Public address Drive should deliver change notifications to
    pub webhook_url: Option<String>,

    /// Tesseract binary used for image OCR
    pub tesseract_path: PathBuf,

    /// Tesseract language pack
    pub ocr_language: String,

    /// Maximum number of hits returned by a search
    pub search_limit: usize,

    /// Logging setup
    pub logging: LoggingConfig,
}

impl ServiceConfig {
    /// Creates a new builder with every setting at its default.
    pub fn builder() -> ServiceConfigBuilder {
        ServiceConfigBuilder::default()
    }

    /// Load from `DRIVE_SEARCH_*` environment variables.
    ///
    /// `WEBHOOK_URL` without prefix is honored as a fallback for the webhook
    /// address.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup, used by [`from_env`](Self::from_env)
    /// and by tests.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(&format!("{}{}", ENV_PREFIX, key))
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let mut builder = Self::builder();

        if let Some(value) = get("BIND_ADDR") {
            builder = builder.bind_addr(parse_value::<SocketAddr>("BIND_ADDR", &value)?);
        }
        if let Some(value) = get("API_PREFIX") {
            builder = builder.api_prefix(value);
        }
        if let Some(value) = get("TOKEN_PATH") {
            builder = builder.token_path(value);
        }
        if let Some(value) = get("ELASTICSEARCH_URL") {
            builder = builder.elasticsearch_url(value);
        }
        if let Some(value) = get("INDEX_NAME") {
            builder = builder.index_name(value);
        }
        if let Some(value) = get("CONTENT_TYPES") {
            builder = builder.content_types(
                value
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect(),
            );
        }
        if let Some(value) = get("MAX_FILE_SIZE_BYTES") {
            builder = builder.max_file_size_bytes(parse_value("MAX_FILE_SIZE_BYTES", &value)?);
        }
        if let Some(value) = get("FOLDER_ID") {
            builder = builder.folder_id(value);
        }
        if let Some(value) = get("MAX_CONCURRENT_FILES") {
            builder = builder.max_concurrent_files(parse_value("MAX_CONCURRENT_FILES", &value)?);
        }
        if let Some(value) = get("SYNC_TIMEOUT_SECS") {
            builder = builder.sync_timeout(Duration::from_secs(parse_value(
                "SYNC_TIMEOUT_SECS",
                &value,
            )?));
        }
        if let Some(value) = get("WEBHOOK_SYNC_TIMEOUT_SECS") {
            builder = builder.webhook_sync_timeout(Duration::from_secs(parse_value(
                "WEBHOOK_SYNC_TIMEOUT_SECS",
                &value,
            )?));
        }
        if let Some(value) = get("WEBHOOK_URL").or_else(|| {
            lookup("WEBHOOK_URL")
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        }) {
            builder = builder.webhook_url(value);
        }
        if let Some(value) = get("TESSERACT_PATH") {
            builder = builder.tesseract_path(value);
        }
        if let Some(value) = get("OCR_LANGUAGE") {
            builder = builder.ocr_language(value);
        }
        if let Some(value) = get("SEARCH_LIMIT") {
            builder = builder.search_limit(parse_value("SEARCH_LIMIT", &value)?);
        }

        let mut logging = LoggingConfig::default();
        if let Some(value) = get("LOG_FORMAT") {
            logging = logging.with_format(value.parse::<LogFormat>()?);
        }
        if let Some(value) = get("LOG_LEVEL") {
            let level = value
                .parse::<LogLevel>()
                .map_err(|e| Error::Config(format!("{}LOG_LEVEL: {}", ENV_PREFIX, e)))?;
            logging = logging.with_level(level);
        }

        builder.logging(logging).build()
    }

    /// Listing filter derived from the content-type and size settings
    pub fn listing_policy(&self) -> ListingPolicy {
        ListingPolicy {
            supported_content_types: self.content_types.clone(),
            max_file_size_bytes: self.max_file_size_bytes,
        }
    }

    /// Validates the configuration and returns an error if invalid.
    ///
    /// This checks:
    /// - URLs use http or https
    /// - The index name is acceptable to Elasticsearch
    /// - Worker pool, timeouts and limits are within range
    /// - At least one content type is configured
    pub fn validate(&self) -> Result<()> {
        if !is_http_url(&self.elasticsearch_url) {
            return Err(Error::Config(format!(
                "Elasticsearch URL must start with http:// or https://, got '{}'",
                self.elasticsearch_url
            )));
        }

        if self.index_name.is_empty() {
            return Err(Error::Config("Index name cannot be empty".to_string()));
        }

        if self.index_name.chars().any(|c| c.is_ascii_uppercase())
            || self.index_name.starts_with(['-', '_', '+'])
            || self
                .index_name
                .contains(['\\', '/', '*', '?', '"', '<', '>', '|', ' ', ',', '#', ':'])
        {
            return Err(Error::Config(format!(
                "Index name '{}' is not a valid Elasticsearch index name",
                self.index_name
            )));
        }

        if self.content_types.is_empty() {
            return Err(Error::Config(
                "At least one content type must be configured".to_string(),
            ));
        }

        if self.max_file_size_bytes == 0 {
            return Err(Error::Config(
                "Maximum file size must be greater than 0 bytes".to_string(),
            ));
        }

        if self.max_concurrent_files == 0 || self.max_concurrent_files > MAX_CONCURRENT_FILES_LIMIT
        {
            return Err(Error::Config(format!(
                "Concurrent file workers must be between 1 and {}",
                MAX_CONCURRENT_FILES_LIMIT
            )));
        }

        if self.sync_timeout.is_zero() || self.webhook_sync_timeout.is_zero() {
            return Err(Error::Config(
                "Sync timeouts must be greater than 0 seconds".to_string(),
            ));
        }

        if self.search_limit == 0 || self.search_limit > MAX_SEARCH_LIMIT {
            return Err(Error::Config(format!(
                "Search limit must be between 1 and {}",
                MAX_SEARCH_LIMIT
            )));
        }

        if let Some(url) = &self.webhook_url {
            if !is_http_url(url) {
                return Err(Error::Config(format!(
                    "Webhook URL must start with http:// or https://, got '{}'",
                    url
                )));
            }
        }

        if self.ocr_language.is_empty() {
            return Err(Error::Config("OCR language cannot be empty".to_string()));
        }

        Ok(())
    }
}

fn is_http_url(value: &str) -> bool {
    value.starts_with("http://") || value.starts_with("https://")
}

fn parse_value<T>(key: &str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.parse::<T>().map_err(|e| {
        Error::Config(format!(
            "Invalid value '{}' for {}{}: {}",
            value, ENV_PREFIX, key, e
        ))
    })
}

/// `/api/` and `api` both become `/api`; `/` and blanks mean no prefix
fn normalize_prefix(prefix: &str) -> Option<String> {
    let trimmed = prefix.trim().trim_matches('/');
    if trimmed.is_empty() {
        None
    } else {
        Some(format!("/{}", trimmed))
    }
}

/// Builder for constructing [`ServiceConfig`] instances.
///
/// Unset fields fall back to their defaults in
/// [`build()`](ServiceConfigBuilder::build), which also validates the result.
#[derive(Debug, Default)]
pub struct ServiceConfigBuilder {
    bind_addr: Option<SocketAddr>,
    api_prefix: Option<String>,
    token_path: Option<PathBuf>,
    elasticsearch_url: Option<String>,
    index_name: Option<String>,
    content_types: Option<Vec<String>>,
    max_file_size_bytes: Option<u64>,
    folder_id: Option<String>,
    max_concurrent_files: Option<usize>,
    sync_timeout: Option<Duration>,
    webhook_sync_timeout: Option<Duration>,
    webhook_url: Option<String>,
    tesseract_path: Option<PathBuf>,
    ocr_language: Option<String>,
    search_limit: Option<usize>,
    logging: Option<LoggingConfig>,
}

impl ServiceConfigBuilder {
    /// Sets the HTTP bind address.
    ///
    /// Default: `0.0.0.0:8000`
    pub fn bind_addr(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = Some(addr);
        self
    }

    /// Mounts every route under `prefix`.
    ///
    /// # Examples
    ///
    /// ```
    /// use core_runtime::config::ServiceConfig;
    ///
    /// let config = ServiceConfig::builder().api_prefix("/api/").build().unwrap();
    /// assert_eq!(config.api_prefix.as_deref(), Some("/api"));
    /// ```
    pub fn api_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.api_prefix = Some(prefix.into());
        self
    }

    pub fn token_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.token_path = Some(path.into());
        self
    }

    pub fn elasticsearch_url(mut self, url: impl Into<String>) -> Self {
        self.elasticsearch_url = Some(url.into());
        self
    }

    pub fn index_name(mut self, name: impl Into<String>) -> Self {
        self.index_name = Some(name.into());
        self
    }

    pub fn content_types(mut self, content_types: Vec<String>) -> Self {
        self.content_types = Some(content_types);
        self
    }

    /// Default: 2 MiB
    pub fn max_file_size_bytes(mut self, bytes: u64) -> Self {
        self.max_file_size_bytes = Some(bytes);
        self
    }

    pub fn folder_id(mut self, folder_id: impl Into<String>) -> Self {
        self.folder_id = Some(folder_id.into());
        self
    }

    /// Default: 4
    pub fn max_concurrent_files(mut self, workers: usize) -> Self {
        self.max_concurrent_files = Some(workers);
        self
    }

    /// Default: 10 minutes
    pub fn sync_timeout(mut self, timeout: Duration) -> Self {
        self.sync_timeout = Some(timeout);
        self
    }

    /// Default: 2 minutes
    pub fn webhook_sync_timeout(mut self, timeout: Duration) -> Self {
        self.webhook_sync_timeout = Some(timeout);
        self
    }

    pub fn webhook_url(mut self, url: impl Into<String>) -> Self {
        self.webhook_url = Some(url.into());
        self
    }

    pub fn tesseract_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.tesseract_path = Some(path.into());
        self
    }

    pub fn ocr_language(mut self, language: impl Into<String>) -> Self {
        self.ocr_language = Some(language.into());
        self
    }

    /// Default: 10000
    pub fn search_limit(mut self, limit: usize) -> Self {
        self.search_limit = Some(limit);
        self
    }

    pub fn logging(mut self, logging: LoggingConfig) -> Self {
        self.logging = Some(logging);
        self
    }

    /// Builds the final [`ServiceConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when a value is out of range.
    pub fn build(self) -> Result<ServiceConfig> {
        let bind_addr = match self.bind_addr {
            Some(addr) => addr,
            None => parse_value("BIND_ADDR", DEFAULT_BIND_ADDR)?,
        };

        let config = ServiceConfig {
            bind_addr,
            api_prefix: self.api_prefix.as_deref().and_then(normalize_prefix),
            token_path: self
                .token_path
                .unwrap_or_else(|| PathBuf::from(DEFAULT_TOKEN_PATH)),
            elasticsearch_url: self
                .elasticsearch_url
                .unwrap_or_else(|| DEFAULT_ELASTICSEARCH_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            index_name: self
                .index_name
                .unwrap_or_else(|| DEFAULT_INDEX_NAME.to_string()),
            content_types: self.content_types.unwrap_or_else(|| {
                DEFAULT_CONTENT_TYPES.iter().map(|s| s.to_string()).collect()
            }),
            max_file_size_bytes: self
                .max_file_size_bytes
                .unwrap_or(DEFAULT_MAX_FILE_SIZE_BYTES),
            folder_id: self.folder_id.filter(|id| !id.trim().is_empty()),
            max_concurrent_files: self
                .max_concurrent_files
                .unwrap_or(DEFAULT_MAX_CONCURRENT_FILES),
            sync_timeout: self
                .sync_timeout
                .unwrap_or(Duration::from_secs(DEFAULT_SYNC_TIMEOUT_SECS)),
            webhook_sync_timeout: self
                .webhook_sync_timeout
                .unwrap_or(Duration::from_secs(DEFAULT_WEBHOOK_SYNC_TIMEOUT_SECS)),
            webhook_url: self.webhook_url,
            tesseract_path: self
                .tesseract_path
                .unwrap_or_else(|| PathBuf::from(DEFAULT_TESSERACT_PATH)),
            ocr_language: self
                .ocr_language
                .unwrap_or_else(|| DEFAULT_OCR_LANGUAGE.to_string()),
            search_limit: self.search_limit.unwrap_or(MAX_SEARCH_LIMIT),
            logging: self.logging.unwrap_or_default(),
        };

        config.validate()?;
        Ok(config)
    }
}
