//! # Sync Coordinator
//!
//! Runs reconciliation passes between a remote drive and the search index.
//!
//! ## Workflow
//!
//! 1. List supported files from the `RemoteLister`
//! 2. Read the `{id → modified}` snapshot from the `IndexPort`
//! 3. Classify ids into add / update / delete / unchanged
//! 4. Return early when both sides already agree
//! 5. Apply deletions (skipped when the listing is incomplete)
//! 6. Download, extract and upsert added and updated files on a bounded pool
//!
//! Passes are single-flight: a second trigger waits for the running pass
//! ([`run_sync`](SyncCoordinator::run_sync)) or is rejected
//! ([`try_run_sync`](SyncCoordinator::try_run_sync)). Waiting for the
//! running pass counts against the caller's timeout.
//!
//! ## Usage
//!
//! ```rust,ignore
//! let coordinator = SyncCoordinator::new(config, lister, index, extractors);
//! let report = coordinator.run_sync().await?;
//! println!("{}", report);
//! ```

use crate::{
    folder_path::{document_file_name, FolderPathResolver},
    reconcile::classify,
    report::{FailureStage, FileFailure, SyncReport},
    Result, SyncError,
};
use bridge_traits::{
    index::{Document, IndexPort},
    storage::{Listing, RemoteFile, RemoteLister},
};
use chrono::{DateTime, Utc};
use core_extract::ExtractorRegistry;
use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

/// Sync coordinator configuration
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Files downloaded and indexed concurrently
    pub max_concurrent_files: usize,

    /// Limit applied by [`SyncCoordinator::run_sync`]
    pub sync_timeout: Duration,

    /// Restrict listing to direct children of this folder
    pub folder_filter: Option<String>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            max_concurrent_files: 4,
            sync_timeout: Duration::from_secs(600),
            folder_filter: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChangeKind {
    Add,
    Update,
}

struct FileJob {
    kind: ChangeKind,
    file: RemoteFile,
    folder_path: String,
}

enum FileOutcome {
    Indexed(ChangeKind),
    Failed(FileFailure),
    NotStarted,
}

pub struct SyncCoordinator {
    config: SyncConfig,
    lister: Arc<dyn RemoteLister>,
    index: Arc<dyn IndexPort>,
    extractors: Arc<ExtractorRegistry>,
    run_lock: Mutex<()>,
    active: StdMutex<Option<CancellationToken>>,
}

impl SyncCoordinator {
    pub fn new(
        config: SyncConfig,
        lister: Arc<dyn RemoteLister>,
        index: Arc<dyn IndexPort>,
        extractors: Arc<ExtractorRegistry>,
    ) -> Self {
        Self {
            config,
            lister,
            index,
            extractors,
            run_lock: Mutex::new(()),
            active: StdMutex::new(None),
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Run one pass with the configured timeout, waiting for any running pass
    pub async fn run_sync(&self) -> Result<SyncReport> {
        self.run_sync_with_timeout(self.config.sync_timeout).await
    }

    /// Run one pass bounded by `limit`, waiting for any running pass
    ///
    /// Time spent waiting for the running pass counts against `limit`.
    #[instrument(skip(self), fields(limit_secs = limit.as_secs()))]
    pub async fn run_sync_with_timeout(&self, limit: Duration) -> Result<SyncReport> {
        let started = Instant::now();
        let _guard = tokio::time::timeout(limit, self.run_lock.lock())
            .await
            .map_err(|_| {
                warn!("Gave up waiting {:?} for the running sync pass", limit);
                SyncError::Timeout(limit.as_secs())
            })?;
        self.run_locked(limit.saturating_sub(started.elapsed()), limit)
            .await
    }

    /// Run one pass unless another is already running
    #[instrument(skip(self))]
    pub async fn try_run_sync(&self) -> Result<SyncReport> {
        let _guard = self.run_lock.try_lock().map_err(|_| {
            debug!("Rejecting sync trigger, pass already running");
            SyncError::InProgress
        })?;
        let limit = self.config.sync_timeout;
        self.run_locked(limit, limit).await
    }

    /// Signal the running pass to stop. Returns false when nothing is running.
    pub fn cancel(&self) -> bool {
        match lock_active(&self.active).as_ref() {
            Some(token) => {
                token.cancel();
                info!("Cancellation requested for running sync pass");
                true
            }
            None => false,
        }
    }

    pub fn is_running(&self) -> bool {
        self.run_lock.try_lock().is_err()
    }

    async fn run_locked(&self, remaining: Duration, limit: Duration) -> Result<SyncReport> {
        let token = CancellationToken::new();
        let _active = ActivePass::register(&self.active, token.clone());

        let pass = self.execute_pass(&token);
        tokio::pin!(pass);
        let deadline = tokio::time::sleep(remaining);
        tokio::pin!(deadline);

        let mut timed_out = false;
        let result = tokio::select! {
            result = &mut pass => result,
            _ = &mut deadline => {
                timed_out = true;
                warn!("Sync pass exceeded {:?}, stopping", limit);
                token.cancel();
                pass.await
            }
        };

        match result {
            Ok(report) => {
                info!("Sync pass finished: {}", report);
                Ok(report)
            }
            Err(SyncError::Cancelled) if timed_out => {
                error!("Sync pass timed out before writing to the index");
                Err(SyncError::Timeout(limit.as_secs()))
            }
            Err(e) => {
                error!("Sync pass failed: {}", e);
                Err(e)
            }
        }
    }

    async fn execute_pass(&self, token: &CancellationToken) -> Result<SyncReport> {
        let started = Instant::now();

        // Phase 1: Listing
        info!("Phase 1: Listing remote files");
        let folder_filter = self.config.folder_filter.as_deref();
        let listing = tokio::select! {
            biased;
            _ = token.cancelled() => return Err(SyncError::Cancelled),
            listing = self.lister.list_supported_files(folder_filter) => listing,
        };
        if !listing.complete && listing.files.is_empty() {
            return Err(SyncError::Listing(
                "no page of the remote listing could be fetched".to_string(),
            ));
        }
        info!(
            "Listed {} supported files (complete: {})",
            listing.files.len(),
            listing.complete
        );

        // Phase 2: Index snapshot
        info!("Phase 2: Reading index snapshot");
        let indexed = tokio::select! {
            biased;
            _ = token.cancelled() => return Err(SyncError::Cancelled),
            snapshot = self.index.metadata_snapshot() => {
                snapshot.map_err(|e| SyncError::Snapshot(e.to_string()))?
            }
        };
        info!("Index holds {} documents", indexed.len());

        let mut report = SyncReport::new(listing.complete);
        let Listing { files, complete } = listing;
        let current: HashMap<String, DateTime<Utc>> = files
            .iter()
            .map(|file| (file.id.clone(), file.modified_at))
            .collect();

        // Phase 3: Classification
        let classification = classify(&current, &indexed);
        if !classification.has_changes() {
            info!("Index already up to date");
            report.duration_ms = elapsed_ms(started);
            return Ok(report);
        }
        info!(
            "Phase 3: {} to add, {} to update, {} to delete, {} unchanged",
            classification.to_add.len(),
            classification.to_update.len(),
            classification.to_delete.len(),
            classification.unchanged.len()
        );

        if token.is_cancelled() {
            return Err(SyncError::Cancelled);
        }

        // Phase 4: Deletions
        if complete {
            info!("Phase 4: Deleting {} documents", classification.to_delete.len());
            for id in &classification.to_delete {
                if token.is_cancelled() {
                    report.cancelled = true;
                    break;
                }
                match self.index.delete(id).await {
                    Ok(()) => {
                        debug!("Deleted document {}", id);
                        report.deleted += 1;
                    }
                    Err(e) => {
                        error!("Failed to delete document {}: {}", id, e);
                        report.record_failure(id.as_str(), "", FailureStage::Delete, e.to_string());
                    }
                }
            }
        } else if !classification.to_delete.is_empty() {
            warn!(
                "Listing incomplete, suppressing {} deletions",
                classification.to_delete.len()
            );
        }

        // Folder paths for files that will be indexed
        let by_id: HashMap<&str, &RemoteFile> =
            files.iter().map(|file| (file.id.as_str(), file)).collect();
        let changes = classification
            .to_add
            .iter()
            .map(|id| (ChangeKind::Add, id))
            .chain(classification.to_update.iter().map(|id| (ChangeKind::Update, id)));

        let mut resolver = FolderPathResolver::new();
        let mut jobs = Vec::new();
        for (kind, id) in changes {
            let Some(file) = by_id.get(id.as_str()) else {
                continue;
            };
            if !self.extractors.supports(&file.content_type) {
                warn!(
                    "Skipping {} ({}): no extractor for {}",
                    file.name, file.id, file.content_type
                );
                report.skipped += 1;
                continue;
            }
            if token.is_cancelled() {
                report.cancelled = true;
                break;
            }
            let folder_path = resolver
                .resolve(self.lister.as_ref(), file.parent_id.as_deref())
                .await;
            jobs.push(FileJob {
                kind,
                file: (*file).clone(),
                folder_path,
            });
        }
        debug!("Resolved folder paths with {} lookups", resolver.lookups());

        // Phase 5: Download, extract, upsert
        info!(
            "Phase 5: Indexing {} files with {} workers",
            jobs.len(),
            self.config.max_concurrent_files
        );
        let workers = self.config.max_concurrent_files.max(1);
        let outcomes: Vec<FileOutcome> = stream::iter(jobs)
            .map(|job| self.process_file(job, token))
            .buffer_unordered(workers)
            .collect()
            .await;

        for outcome in outcomes {
            match outcome {
                FileOutcome::Indexed(ChangeKind::Add) => report.added += 1,
                FileOutcome::Indexed(ChangeKind::Update) => report.updated += 1,
                FileOutcome::Failed(failure) => report.record_failure(
                    failure.file_id,
                    failure.file_name,
                    failure.stage,
                    failure.message,
                ),
                FileOutcome::NotStarted => report.cancelled = true,
            }
        }

        report.duration_ms = elapsed_ms(started);
        Ok(report)
    }

    async fn process_file(&self, job: FileJob, token: &CancellationToken) -> FileOutcome {
        if token.is_cancelled() {
            return FileOutcome::NotStarted;
        }

        let FileJob {
            kind,
            file,
            folder_path,
        } = job;
        let file_name = document_file_name(&folder_path, &file.name);

        let bytes = match self.lister.download(&file.id).await {
            Ok(bytes) => bytes,
            Err(e) => {
                error!("Failed to download {} ({}): {}", file_name, file.id, e);
                return FileOutcome::Failed(FileFailure {
                    file_id: file.id,
                    file_name,
                    stage: FailureStage::Download,
                    message: e.to_string(),
                });
            }
        };

        let content = {
            let extractors = Arc::clone(&self.extractors);
            let content_type = file.content_type.clone();
            tokio::task::spawn_blocking(move || extractors.extract(&content_type, &bytes))
                .await
                .unwrap_or_else(|e| {
                    warn!("Extraction task for {} aborted: {}", file.id, e);
                    String::new()
                })
        };

        let document = Document {
            id: file.id.clone(),
            file_name: file_name.clone(),
            url: file.url.clone(),
            content,
            modified_at: file.modified_at,
        };

        match self.index.upsert(&document).await {
            Ok(()) => {
                debug!("Indexed {} ({:?})", file_name, kind);
                FileOutcome::Indexed(kind)
            }
            Err(e) => {
                error!("Failed to index {} ({}): {}", file_name, file.id, e);
                FileOutcome::Failed(FileFailure {
                    file_id: file.id,
                    file_name,
                    stage: FailureStage::Upsert,
                    message: e.to_string(),
                })
            }
        }
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

fn lock_active(
    active: &StdMutex<Option<CancellationToken>>,
) -> std::sync::MutexGuard<'_, Option<CancellationToken>> {
    active.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Publishes the running pass's token; cleared on drop, including when the
/// caller abandons the pass future.
struct ActivePass<'a> {
    slot: &'a StdMutex<Option<CancellationToken>>,
}

impl<'a> ActivePass<'a> {
    fn register(slot: &'a StdMutex<Option<CancellationToken>>, token: CancellationToken) -> Self {
        *lock_active(slot) = Some(token);
        Self { slot }
    }
}

impl Drop for ActivePass<'_> {
    fn drop(&mut self) {
        *lock_active(self.slot) = None;
    }
}
