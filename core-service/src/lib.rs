//! Service façade and HTTP surface.
//!
//! This crate wires the desktop HTTP bridge, the Google Drive connector, the
//! Elasticsearch indexer and the extractor registry into a
//! [`SyncCoordinator`](core_sync::SyncCoordinator), and exposes it over an
//! axum router.
//!
//! ```no_run
//! use core_runtime::ServiceConfig;
//! use core_service::Application;
//!
//! # async fn run() -> core_service::Result<()> {
//! let app = Application::bootstrap(ServiceConfig::from_env()?).await?;
//! app.serve(async {
//!     let _ = tokio::signal::ctrl_c().await;
//! })
//! .await
//! # }
//! ```

pub mod bootstrap;
pub mod error;
pub mod routes;

pub use bootstrap::Application;
pub use error::{CoreError, Result};
pub use routes::{router, AppState};
