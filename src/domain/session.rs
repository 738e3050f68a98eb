//! Session-level extraction state
//!
//! `SessionState` is an explicit value object threaded through the session
//! aggregator: counters are updated after each page and persisted with every
//! checkpoint, replacing ambient global mutable state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Running counters for one scrape session (kept in memory, checkpointed)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    pub session_id: String,
    pub pages_processed: u32,
    pub records_extracted: u32,
    pub valid_records: u32,
    pub errors_count: u32,
    pub retries_count: u32,
    /// Cumulative page-processing time in milliseconds
    pub total_page_time_ms: u64,
    /// Last page number covered by a durable checkpoint
    pub last_checkpoint_page: Option<u32>,
    pub started_at: DateTime<Utc>,
    pub last_updated_at: DateTime<Utc>,
}

impl SessionState {
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            session_id: uuid::Uuid::new_v4().to_string(),
            pages_processed: 0,
            records_extracted: 0,
            valid_records: 0,
            errors_count: 0,
            retries_count: 0,
            total_page_time_ms: 0,
            last_checkpoint_page: None,
            started_at: now,
            last_updated_at: now,
        }
    }

    /// Running average page-processing time in milliseconds
    pub fn avg_page_time_ms(&self) -> f64 {
        if self.pages_processed == 0 {
            return 0.0;
        }
        self.total_page_time_ms as f64 / f64::from(self.pages_processed)
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

/// Final result of a finalized session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub pages_processed: u32,
    pub records_extracted: u32,
    pub unique_records: u32,
    pub valid_records: u32,
    pub errors_count: u32,
    pub retries_count: u32,
    pub avg_page_time_ms: f64,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub execution_time_seconds: u32,
}
