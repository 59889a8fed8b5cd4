//! # Authentication Module
//!
//! Bearer tokens for the Drive API.
//!
//! ## Overview
//!
//! The interactive consent flow happens once, outside this service, and
//! leaves behind a Google "authorized user" token file. This crate reads that
//! file and keeps a valid access token in memory, refreshing it through the
//! OAuth token endpoint shortly before it expires.
//!
//! ## Features
//!
//! - Refresh-token grant with retry on transient failures
//! - Single-flight refresh shared by concurrent callers
//! - Tokens never appear in `Debug` output or logs

pub mod error;
pub mod oauth;
pub mod token_source;
pub mod types;

pub use error::{AuthError, Result};
pub use oauth::{OAuthConfig, TokenRefresher};
pub use token_source::{AccessTokenSource, RefreshingTokenSource, StaticTokenSource};
pub use types::{AuthorizedUserFile, OAuthTokens};
