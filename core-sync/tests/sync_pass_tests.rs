//! End-to-end sync passes over in-memory drive and index fakes.

use async_trait::async_trait;
use bridge_traits::error::{BridgeError, Result as BridgeResult};
use bridge_traits::index::{Document, IndexPort, MetadataSnapshot, SearchHit};
use bridge_traits::storage::{FolderLookup, FolderNode, ListPage, RemoteFile, RemoteLister};
use bytes::Bytes;
use chrono::{DateTime, TimeZone, Utc};
use core_extract::{ExtractorRegistry, PlainTextExtractor};
use core_sync::{FailureStage, SyncConfig, SyncCoordinator, SyncError};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

fn modified(day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, day, 9, 30, 0).unwrap()
}

fn file(id: &str, name: &str, day: u32) -> RemoteFile {
    RemoteFile {
        id: id.to_string(),
        name: name.to_string(),
        content_type: "text/plain".to_string(),
        size_bytes: 16,
        modified_at: modified(day),
        parent_id: None,
        url: format!("https://drive.google.com/file/d/{}", id),
        trashed: false,
    }
}

/// Blocks callers until released, and signals when the first caller arrives.
#[derive(Default)]
struct Gate {
    entered: Notify,
    release: Notify,
}

impl Gate {
    async fn pass(&self) {
        self.entered.notify_one();
        self.release.notified().await;
    }
}

#[derive(Default)]
struct FakeDrive {
    files: Vec<RemoteFile>,
    folders: HashMap<String, FolderNode>,
    page_size: usize,
    fail_from_page: Option<usize>,
    failing_downloads: HashSet<String>,
    list_gate: Option<Arc<Gate>>,
    list_delay: Option<Duration>,
    listings_in_flight: AtomicUsize,
    max_listings_in_flight: AtomicUsize,
    list_calls: AtomicUsize,
    downloads: Mutex<Vec<String>>,
    folder_calls: AtomicUsize,
}

impl FakeDrive {
    fn with_files(files: Vec<RemoteFile>) -> Self {
        Self {
            files,
            page_size: 100,
            ..Self::default()
        }
    }

    fn folder(mut self, id: &str, name: &str, parent_id: Option<&str>) -> Self {
        self.folders.insert(
            id.to_string(),
            FolderNode {
                id: id.to_string(),
                name: name.to_string(),
                parent_id: parent_id.map(String::from),
            },
        );
        self
    }

    fn downloads(&self) -> Vec<String> {
        self.downloads.lock().unwrap().clone()
    }
}

#[async_trait]
impl FolderLookup for FakeDrive {
    async fn folder(&self, folder_id: &str) -> BridgeResult<FolderNode> {
        self.folder_calls.fetch_add(1, Ordering::SeqCst);
        self.folders
            .get(folder_id)
            .cloned()
            .ok_or_else(|| BridgeError::NotFound(folder_id.to_string()))
    }
}

#[async_trait]
impl RemoteLister for FakeDrive {
    async fn list_page(
        &self,
        _folder_filter: Option<&str>,
        page_token: Option<String>,
    ) -> BridgeResult<ListPage> {
        let page: usize = page_token.as_deref().unwrap_or("0").parse().unwrap();
        if page == 0 {
            self.list_calls.fetch_add(1, Ordering::SeqCst);
            let now = self.listings_in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_listings_in_flight.fetch_max(now, Ordering::SeqCst);
            if let Some(gate) = &self.list_gate {
                gate.pass().await;
            }
            if let Some(delay) = self.list_delay {
                tokio::time::sleep(delay).await;
            }
            self.listings_in_flight.fetch_sub(1, Ordering::SeqCst);
        }

        if self.fail_from_page.is_some_and(|fail| page >= fail) {
            return Err(BridgeError::OperationFailed("HTTP 500".to_string()));
        }

        let start = page * self.page_size;
        let end = (start + self.page_size).min(self.files.len());
        let files = self.files.get(start..end).unwrap_or_default().to_vec();
        let next_page_token = (end < self.files.len()).then(|| (page + 1).to_string());
        Ok(ListPage {
            files,
            next_page_token,
        })
    }

    async fn download(&self, file_id: &str) -> BridgeResult<Bytes> {
        self.downloads.lock().unwrap().push(file_id.to_string());
        if self.failing_downloads.contains(file_id) {
            return Err(BridgeError::OperationFailed(format!("download {} failed", file_id)));
        }
        Ok(Bytes::from(format!("content of {}", file_id)))
    }
}

#[derive(Default)]
struct FakeIndex {
    documents: Mutex<HashMap<String, Document>>,
    failing_upserts: HashSet<String>,
    upsert_gate: Option<Arc<Gate>>,
    upsert_delay: Option<Duration>,
    upserts_in_flight: AtomicUsize,
    max_upserts_in_flight: AtomicUsize,
    writes: AtomicUsize,
    log: Mutex<Vec<String>>,
}

impl FakeIndex {
    fn seeded(entries: &[(&str, &str, u32)]) -> Self {
        let documents = entries
            .iter()
            .map(|(id, name, day)| {
                (
                    id.to_string(),
                    Document {
                        id: id.to_string(),
                        file_name: name.to_string(),
                        url: format!("https://drive.google.com/file/d/{}", id),
                        content: String::new(),
                        modified_at: modified(*day),
                    },
                )
            })
            .collect();
        Self {
            documents: Mutex::new(documents),
            ..Self::default()
        }
    }

    fn document(&self, id: &str) -> Option<Document> {
        self.documents.lock().unwrap().get(id).cloned()
    }

    fn ids(&self) -> HashSet<String> {
        self.documents.lock().unwrap().keys().cloned().collect()
    }

    fn log(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }
}

#[async_trait]
impl IndexPort for FakeIndex {
    async fn metadata_snapshot(&self) -> BridgeResult<MetadataSnapshot> {
        Ok(self
            .documents
            .lock()
            .unwrap()
            .iter()
            .map(|(id, doc)| (id.clone(), doc.modified_at))
            .collect())
    }

    async fn upsert(&self, document: &Document) -> BridgeResult<()> {
        let now = self.upserts_in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_upserts_in_flight.fetch_max(now, Ordering::SeqCst);
        if let Some(gate) = &self.upsert_gate {
            gate.pass().await;
        }
        if let Some(delay) = self.upsert_delay {
            tokio::time::sleep(delay).await;
        }
        self.upserts_in_flight.fetch_sub(1, Ordering::SeqCst);

        self.log.lock().unwrap().push(format!("upsert:{}", document.id));
        if self.failing_upserts.contains(&document.id) {
            return Err(BridgeError::OperationFailed("mapper_parsing_exception".to_string()));
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.documents
            .lock()
            .unwrap()
            .insert(document.id.clone(), document.clone());
        Ok(())
    }

    async fn delete(&self, id: &str) -> BridgeResult<()> {
        self.log.lock().unwrap().push(format!("delete:{}", id));
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.documents.lock().unwrap().remove(id);
        Ok(())
    }

    async fn search(&self, _query: &str) -> BridgeResult<Vec<SearchHit>> {
        Ok(Vec::new())
    }
}

fn registry() -> Arc<ExtractorRegistry> {
    Arc::new(ExtractorRegistry::new().register("text/plain", Arc::new(PlainTextExtractor)))
}

fn coordinator(drive: Arc<FakeDrive>, index: Arc<FakeIndex>, workers: usize) -> SyncCoordinator {
    let config = SyncConfig {
        max_concurrent_files: workers,
        ..SyncConfig::default()
    };
    SyncCoordinator::new(config, drive, index, registry())
}

#[tokio::test]
async fn test_first_pass_indexes_everything_then_second_pass_is_noop() {
    let drive = Arc::new(FakeDrive::with_files(vec![
        file("a", "a.txt", 1),
        file("b", "b.txt", 2),
    ]));
    let index = Arc::new(FakeIndex::default());
    let coordinator = coordinator(drive.clone(), index.clone(), 4);

    let first = coordinator.run_sync().await.unwrap();
    assert_eq!(first.added, 2);
    assert_eq!(index.document("a").unwrap().content, "content of a");

    let writes_after_first = index.writes.load(Ordering::SeqCst);
    let second = coordinator.run_sync().await.unwrap();
    assert_eq!(second.mutations(), 0);
    assert_eq!(index.writes.load(Ordering::SeqCst), writes_after_first);
    assert_eq!(drive.downloads().len(), 2);
}

#[tokio::test]
async fn test_mixed_pass_adds_updates_and_deletes() {
    let drive = Arc::new(FakeDrive::with_files(vec![
        file("keep", "keep.txt", 1),
        file("edit", "edit.txt", 5),
        file("new", "new.txt", 3),
    ]));
    let index = Arc::new(FakeIndex::seeded(&[
        ("keep", "keep.txt", 1),
        ("edit", "edit.txt", 1),
        ("old", "old.txt", 1),
    ]));
    let coordinator = coordinator(drive.clone(), index.clone(), 2);

    let report = coordinator.run_sync().await.unwrap();

    assert_eq!((report.added, report.updated, report.deleted), (1, 1, 1));
    assert_eq!(report.failed, 0);
    assert!(report.listing_complete);
    assert_eq!(
        index.ids(),
        HashSet::from(["keep".to_string(), "edit".to_string(), "new".to_string()])
    );
    assert_eq!(index.document("edit").unwrap().modified_at, modified(5));

    // The unchanged file is never downloaded
    let mut downloads = drive.downloads();
    downloads.sort();
    assert_eq!(downloads, vec!["edit", "new"]);

    // Deletions precede additions and updates
    let log = index.log();
    assert_eq!(log[0], "delete:old");
}

#[tokio::test]
async fn test_per_file_failures_do_not_stop_the_pass() {
    let mut drive = FakeDrive::with_files(vec![
        file("ok-1", "ok-1.txt", 1),
        file("bad-download", "bad-download.txt", 1),
        file("bad-upsert", "bad-upsert.txt", 1),
        file("ok-2", "ok-2.txt", 1),
    ]);
    drive.failing_downloads.insert("bad-download".to_string());
    let drive = Arc::new(drive);

    let index = FakeIndex {
        failing_upserts: HashSet::from(["bad-upsert".to_string()]),
        ..FakeIndex::default()
    };
    let index = Arc::new(index);
    let coordinator = coordinator(drive, index.clone(), 2);

    let report = coordinator.run_sync().await.unwrap();

    assert_eq!(report.added, 2);
    assert_eq!(report.failed, 2);
    let stages: HashMap<String, FailureStage> = report
        .failures
        .iter()
        .map(|f| (f.file_id.clone(), f.stage))
        .collect();
    assert_eq!(stages["bad-download"], FailureStage::Download);
    assert_eq!(stages["bad-upsert"], FailureStage::Upsert);
    assert!(index.document("ok-1").is_some());
    assert!(index.document("ok-2").is_some());
    assert!(index.document("bad-upsert").is_none());
}

#[tokio::test]
async fn test_incomplete_listing_suppresses_deletions() {
    let mut drive = FakeDrive::with_files(vec![
        file("a", "a.txt", 1),
        file("b", "b.txt", 1),
        file("c", "c.txt", 1),
    ]);
    drive.page_size = 1;
    drive.fail_from_page = Some(1);
    let drive = Arc::new(drive);
    let index = Arc::new(FakeIndex::seeded(&[("b", "b.txt", 1), ("c", "c.txt", 1)]));
    let coordinator = coordinator(drive, index.clone(), 1);

    let report = coordinator.run_sync().await.unwrap();

    assert!(!report.listing_complete);
    assert_eq!(report.added, 1);
    assert_eq!(report.deleted, 0);
    assert_eq!(index.ids().len(), 3);
}

#[tokio::test]
async fn test_unsupported_content_type_is_skipped() {
    let mut gif = file("gif", "anim.gif", 1);
    gif.content_type = "image/gif".to_string();
    let drive = Arc::new(FakeDrive::with_files(vec![gif, file("a", "a.txt", 1)]));
    let index = Arc::new(FakeIndex::default());
    let coordinator = coordinator(drive.clone(), index.clone(), 4);

    let report = coordinator.run_sync().await.unwrap();

    assert_eq!(report.skipped, 1);
    assert_eq!(report.added, 1);
    assert_eq!(drive.downloads(), vec!["a"]);
}

#[tokio::test]
async fn test_file_names_carry_folder_paths() {
    let mut nested = file("n", "q1.csv.txt", 1);
    nested.parent_id = Some("finance".to_string());
    let mut sibling = file("s", "q2.txt", 1);
    sibling.parent_id = Some("finance".to_string());
    let mut orphan = file("o", "orphan.txt", 1);
    orphan.parent_id = Some("hidden".to_string());

    let drive = FakeDrive::with_files(vec![nested, sibling, orphan, file("r", "root.txt", 1)])
        .folder("root", "My Drive", None)
        .folder("finance", "Finance", Some("root"));
    let drive = Arc::new(drive);
    let index = Arc::new(FakeIndex::default());
    let coordinator = coordinator(drive.clone(), index.clone(), 4);

    coordinator.run_sync().await.unwrap();

    assert_eq!(index.document("n").unwrap().file_name, "My Drive/Finance/q1.csv.txt");
    assert_eq!(index.document("s").unwrap().file_name, "My Drive/Finance/q2.txt");
    assert_eq!(index.document("o").unwrap().file_name, "orphan.txt");
    assert_eq!(index.document("r").unwrap().file_name, "root.txt");
    // finance, root, hidden: one lookup each
    assert_eq!(drive.folder_calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_worker_pool_is_bounded() {
    let files = (0..12).map(|i| file(&format!("f{}", i), "f.txt", 1)).collect();
    let drive = Arc::new(FakeDrive::with_files(files));
    let index = FakeIndex {
        upsert_delay: Some(Duration::from_millis(10)),
        ..FakeIndex::default()
    };
    let index = Arc::new(index);
    let coordinator = coordinator(drive, index.clone(), 3);

    let report = coordinator.run_sync().await.unwrap();

    assert_eq!(report.added, 12);
    let peak = index.max_upserts_in_flight.load(Ordering::SeqCst);
    assert!(peak <= 3, "peak concurrency {}", peak);
    assert!(peak >= 2, "workers never overlapped");
}

#[tokio::test]
async fn test_overlapping_triggers_run_sequentially() {
    let drive = FakeDrive {
        list_delay: Some(Duration::from_millis(20)),
        ..FakeDrive::with_files(vec![file("a", "a.txt", 1)])
    };
    let drive = Arc::new(drive);
    let index = Arc::new(FakeIndex::default());
    let coordinator = coordinator(drive.clone(), index.clone(), 2);

    let (first, second) = tokio::join!(coordinator.run_sync(), coordinator.run_sync());

    let first = first.unwrap();
    let second = second.unwrap();
    assert_eq!(first.added + second.added, 1);
    assert_eq!(drive.list_calls.load(Ordering::SeqCst), 2);
    assert_eq!(drive.max_listings_in_flight.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_try_run_sync_rejects_while_running() {
    let gate = Arc::new(Gate::default());
    let drive = FakeDrive {
        list_gate: Some(gate.clone()),
        ..FakeDrive::with_files(vec![file("a", "a.txt", 1)])
    };
    let index = Arc::new(FakeIndex::default());
    let coordinator = Arc::new(coordinator(Arc::new(drive), index, 1));

    let running = {
        let coordinator = coordinator.clone();
        tokio::spawn(async move { coordinator.run_sync().await })
    };
    gate.entered.notified().await;

    assert!(coordinator.is_running());
    assert!(matches!(
        coordinator.try_run_sync().await,
        Err(SyncError::InProgress)
    ));

    gate.release.notify_one();
    let report = running.await.unwrap().unwrap();
    assert_eq!(report.added, 1);
    assert!(!coordinator.is_running());
}

#[tokio::test]
async fn test_cancel_before_writes_aborts_without_mutation() {
    let gate = Arc::new(Gate::default());
    let drive = FakeDrive {
        list_gate: Some(gate.clone()),
        ..FakeDrive::with_files(vec![file("a", "a.txt", 1)])
    };
    let index = Arc::new(FakeIndex::seeded(&[("stale", "stale.txt", 1)]));
    let coordinator = Arc::new(coordinator(Arc::new(drive), index.clone(), 1));

    let running = {
        let coordinator = coordinator.clone();
        tokio::spawn(async move { coordinator.run_sync().await })
    };
    gate.entered.notified().await;

    assert!(coordinator.cancel());
    let result = running.await.unwrap();

    assert!(matches!(result, Err(SyncError::Cancelled)));
    assert_eq!(index.writes.load(Ordering::SeqCst), 0);
    assert!(index.document("stale").is_some());
}

#[tokio::test]
async fn test_cancel_during_indexing_finishes_in_flight_file() {
    let gate = Arc::new(Gate::default());
    let files = vec![file("a", "a.txt", 1), file("b", "b.txt", 1), file("c", "c.txt", 1)];
    let drive = Arc::new(FakeDrive::with_files(files));
    let index = FakeIndex {
        upsert_gate: Some(gate.clone()),
        ..FakeIndex::default()
    };
    let index = Arc::new(index);
    let coordinator = Arc::new(coordinator(drive.clone(), index.clone(), 1));

    let running = {
        let coordinator = coordinator.clone();
        tokio::spawn(async move { coordinator.run_sync().await })
    };
    gate.entered.notified().await;

    assert!(coordinator.cancel());
    gate.release.notify_one();
    let report = running.await.unwrap().unwrap();

    assert!(report.cancelled);
    assert_eq!(report.added, 1);
    assert_eq!(index.ids().len(), 1);
    assert_eq!(drive.downloads().len(), 1);
}

#[tokio::test]
async fn test_timeout_before_writes_is_an_error() {
    let gate = Arc::new(Gate::default());
    let drive = FakeDrive {
        list_gate: Some(gate),
        ..FakeDrive::with_files(vec![file("a", "a.txt", 1)])
    };
    let index = Arc::new(FakeIndex::default());
    let coordinator = coordinator(Arc::new(drive), index.clone(), 1);

    let result = coordinator
        .run_sync_with_timeout(Duration::from_millis(50))
        .await;

    assert!(matches!(result, Err(SyncError::Timeout(_))));
    assert_eq!(index.writes.load(Ordering::SeqCst), 0);
    assert!(!coordinator.is_running());
}

#[tokio::test]
async fn test_timeout_covers_wait_behind_running_pass() {
    let gate = Arc::new(Gate::default());
    let drive = FakeDrive {
        list_gate: Some(gate.clone()),
        ..FakeDrive::with_files(vec![file("a", "a.txt", 1)])
    };
    let index = Arc::new(FakeIndex::default());
    let coordinator = Arc::new(coordinator(Arc::new(drive), index, 1));

    let running = {
        let coordinator = coordinator.clone();
        tokio::spawn(async move { coordinator.run_sync().await })
    };
    gate.entered.notified().await;

    let started = std::time::Instant::now();
    let waiting = coordinator
        .run_sync_with_timeout(Duration::from_millis(50))
        .await;

    assert!(matches!(waiting, Err(SyncError::Timeout(_))));
    assert!(started.elapsed() < Duration::from_secs(2));
    assert!(coordinator.is_running());

    gate.release.notify_one();
    let report = running.await.unwrap().unwrap();
    assert_eq!(report.added, 1);
}

#[tokio::test]
async fn test_abandoned_pass_clears_cancellation_handle() {
    let gate = Arc::new(Gate::default());
    let drive = FakeDrive {
        list_gate: Some(gate.clone()),
        ..FakeDrive::with_files(vec![file("a", "a.txt", 1)])
    };
    let index = Arc::new(FakeIndex::default());
    let coordinator = Arc::new(coordinator(Arc::new(drive), index, 1));

    let running = {
        let coordinator = coordinator.clone();
        tokio::spawn(async move { coordinator.run_sync().await })
    };
    gate.entered.notified().await;

    running.abort();
    assert!(running.await.unwrap_err().is_cancelled());

    assert!(!coordinator.is_running());
    assert!(!coordinator.cancel());
}
