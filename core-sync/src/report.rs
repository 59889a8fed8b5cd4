use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a per-file failure happened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureStage {
    Download,
    Upsert,
    Delete,
}

impl fmt::Display for FailureStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stage = match self {
            FailureStage::Download => "download",
            FailureStage::Upsert => "upsert",
            FailureStage::Delete => "delete",
        };
        f.write_str(stage)
    }
}

/// A file the pass could not bring in sync
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileFailure {
    pub file_id: String,
    /// Empty for deletions, where only the id is known
    pub file_name: String,
    pub stage: FailureStage,
    pub message: String,
}

/// Outcome of one sync pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    pub added: usize,
    pub updated: usize,
    pub deleted: usize,
    /// Files with no registered extractor
    pub skipped: usize,
    pub failed: usize,
    pub failures: Vec<FileFailure>,
    /// False when listing stopped early and deletions were suppressed
    pub listing_complete: bool,
    /// True when cancellation or timeout stopped the pass before all files ran
    pub cancelled: bool,
    pub duration_ms: u64,
}

impl SyncReport {
    pub fn new(listing_complete: bool) -> Self {
        Self {
            listing_complete,
            ..Self::default()
        }
    }

    pub fn record_failure(
        &mut self,
        file_id: impl Into<String>,
        file_name: impl Into<String>,
        stage: FailureStage,
        message: impl Into<String>,
    ) {
        self.failed += 1;
        self.failures.push(FileFailure {
            file_id: file_id.into(),
            file_name: file_name.into(),
            stage,
            message: message.into(),
        });
    }

    /// Number of index writes performed
    pub fn mutations(&self) -> usize {
        self.added + self.updated + self.deleted
    }
}

impl fmt::Display for SyncReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "added={} updated={} deleted={} skipped={} failed={} in {}ms",
            self.added, self.updated, self.deleted, self.skipped, self.failed, self.duration_ms
        )?;
        if !self.listing_complete {
            f.write_str(" (listing incomplete)")?;
        }
        if self.cancelled {
            f.write_str(" (cancelled)")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_failure_counts() {
        let mut report = SyncReport::new(true);
        report.added = 2;
        report.record_failure("f1", "notes.txt", FailureStage::Download, "HTTP 500");

        assert_eq!(report.failed, 1);
        assert_eq!(report.failures[0].stage, FailureStage::Download);
        assert_eq!(report.mutations(), 2);
    }

    #[test]
    fn test_serializes_stage_lowercase() {
        let mut report = SyncReport::new(false);
        report.record_failure("f1", "", FailureStage::Delete, "timeout");

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["failures"][0]["stage"], "delete");
        assert_eq!(json["listing_complete"], false);
    }

    #[test]
    fn test_display_summary() {
        let mut report = SyncReport::new(false);
        report.deleted = 1;
        report.cancelled = true;

        let summary = report.to_string();
        assert!(summary.starts_with("added=0 updated=0 deleted=1"));
        assert!(summary.contains("listing incomplete"));
        assert!(summary.ends_with("(cancelled)"));
    }
}
