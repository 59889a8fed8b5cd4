//! # Core Runtime Module
//!
//! Foundational runtime infrastructure for the sync service:
//! - Logging and tracing setup
//! - Configuration loading and validation
//!
//! Every other crate logs through `tracing` and reads its settings from
//! [`config::ServiceConfig`], so this crate is initialized first.

pub mod config;
pub mod error;
pub mod logging;

pub use config::{ServiceConfig, ServiceConfigBuilder};
pub use error::{Error, Result};
pub use logging::{init_logging, LogFormat, LoggingConfig};
