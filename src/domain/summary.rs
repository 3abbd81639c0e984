//! Run statistics for one export.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A page that could not be exported
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageFailure {
    pub page_id: String,

    /// Title, when the page got far enough to have one
    pub title: Option<String>,

    pub reason: String,
}

/// Outcome counters for one export run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    /// Unique identifier for this run (used in log spans)
    pub run_id: Uuid,

    pub started_at: DateTime<Utc>,

    pub completed_at: Option<DateTime<Utc>>,

    pub dry_run: bool,

    /// Unique pages dequeued and hydrated
    pub pages_visited: usize,

    pub pages_written: usize,

    /// Pages whose target file already existed
    pub pages_skipped: usize,

    pub pages_failed: usize,

    pub assets_downloaded: usize,

    pub assets_failed: usize,

    #[serde(default)]
    pub failures: Vec<PageFailure>,
}

impl RunSummary {
    /// Start a new, empty summary
    pub fn new(run_id: Uuid, dry_run: bool) -> Self {
        Self {
            run_id,
            started_at: Utc::now(),
            completed_at: None,
            dry_run,
            pages_visited: 0,
            pages_written: 0,
            pages_skipped: 0,
            pages_failed: 0,
            assets_downloaded: 0,
            assets_failed: 0,
            failures: Vec::new(),
        }
    }

    /// Record a page-level failure
    pub fn record_failure(&mut self, failure: PageFailure) {
        self.pages_failed += 1;
        self.failures.push(failure);
    }

    /// Mark the run finished
    pub fn complete(&mut self) {
        self.completed_at = Some(Utc::now());
    }

    /// Wall-clock duration in milliseconds, once completed
    pub fn duration_ms(&self) -> Option<i64> {
        self.completed_at
            .map(|end| (end - self.started_at).num_milliseconds())
    }

    /// Whether every visited page was exported (or deliberately skipped)
    pub fn is_clean(&self) -> bool {
        self.pages_failed == 0
    }
}
