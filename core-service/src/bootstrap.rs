//! Application wiring.
//!
//! [`Application::bootstrap`] builds every adapter from a [`ServiceConfig`] in
//! dependency order. A missing token file fails before Elasticsearch is
//! contacted, and an unreachable index fails before the HTTP server binds.

use std::future::Future;
use std::sync::Arc;

use axum::Router;
use bridge_desktop::ReqwestHttpClient;
use bridge_traits::{http::HttpClient, index::IndexPort, SearchHit};
use core_auth::RefreshingTokenSource;
use core_extract::{ExtractorRegistry, OcrSettings};
use core_runtime::ServiceConfig;
use core_sync::{SyncConfig, SyncCoordinator};
use provider_elasticsearch::ElasticsearchIndexer;
use provider_google_drive::GoogleDriveConnector;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::error::Result;
use crate::routes::{self, AppState};

/// Fully wired service
pub struct Application {
    config: ServiceConfig,
    state: AppState,
    drive: Arc<GoogleDriveConnector>,
    indexer: Arc<ElasticsearchIndexer>,
}

impl Application {
    pub async fn bootstrap(config: ServiceConfig) -> Result<Self> {
        let http = http_client()?;

        let tokens =
            RefreshingTokenSource::from_authorized_user_file(&config.token_path, http.clone())
                .await?;
        let drive = Arc::new(GoogleDriveConnector::new(
            http.clone(),
            Arc::new(tokens),
            config.listing_policy(),
        ));

        let indexer = Arc::new(
            ElasticsearchIndexer::new(http, &config.elasticsearch_url, &config.index_name)
                .with_search_limit(config.search_limit),
        );
        indexer.ensure_index().await?;

        let registry = Arc::new(extractor_registry(&config));
        let coordinator = Arc::new(SyncCoordinator::new(
            sync_config(&config),
            drive.clone(),
            indexer.clone(),
            registry,
        ));

        let state = AppState {
            coordinator,
            index: indexer.clone(),
            webhook_sync_timeout: config.webhook_sync_timeout,
        };

        info!(
            index = %config.index_name,
            folder = config.folder_id.as_deref().unwrap_or("<all>"),
            workers = config.max_concurrent_files,
            "Application bootstrapped"
        );

        Ok(Self {
            config,
            state,
            drive,
            indexer,
        })
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn coordinator(&self) -> &Arc<SyncCoordinator> {
        &self.state.coordinator
    }

    pub fn drive(&self) -> &Arc<GoogleDriveConnector> {
        &self.drive
    }

    pub fn indexer(&self) -> &Arc<ElasticsearchIndexer> {
        &self.indexer
    }

    pub fn router(&self) -> Router {
        routes::router(self.state.clone(), self.config.api_prefix.as_deref())
    }

    pub async fn search(&self, query: &str) -> Result<Vec<SearchHit>> {
        Ok(self.indexer.search(query).await?)
    }

    /// Bind and serve until `shutdown` resolves
    pub async fn serve<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        info!("Listening on {}", listener.local_addr()?);

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("Server stopped");
        Ok(())
    }
}

pub fn http_client() -> Result<Arc<dyn HttpClient>> {
    Ok(Arc::new(ReqwestHttpClient::new()?))
}

/// Registry with the built-in extractors
///
/// Configured content types without an extractor are logged; files of those
/// types are listed but skipped by every pass.
pub fn extractor_registry(config: &ServiceConfig) -> ExtractorRegistry {
    let registry = ExtractorRegistry::with_defaults(OcrSettings {
        tesseract_path: config.tesseract_path.clone(),
        language: config.ocr_language.clone(),
    });

    for content_type in &config.content_types {
        if !registry.supports(content_type) {
            warn!("No extractor for configured content type {}", content_type);
        }
    }

    registry
}

pub fn sync_config(config: &ServiceConfig) -> SyncConfig {
    SyncConfig {
        max_concurrent_files: config.max_concurrent_files,
        sync_timeout: config.sync_timeout,
        folder_filter: config.folder_id.clone(),
    }
}
