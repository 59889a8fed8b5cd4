//! # Desktop Bridge Implementations
//!
//! Native implementations of the bridge ports for server deployments.
//!
//! - `HttpClient` using `reqwest` with rustls and retry on 429/5xx
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::ReqwestHttpClient;
//! use std::sync::Arc;
//!
//! let http_client = Arc::new(ReqwestHttpClient::new()?);
//! let connector = GoogleDriveConnector::new(http_client.clone(), token_source, policy);
//! ```

mod http;

pub use http::ReqwestHttpClient;
