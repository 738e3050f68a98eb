//! Session aggregation, deduplication and checkpoint persistence
//!
//! Accumulates records across pages under a single-writer discipline,
//! deduplicates by identity key with last-write-wins semantics (so
//! re-scraping is idempotent), tracks session counters, and persists
//! checkpoints with write-to-temp-then-rename so a crash mid-write never
//! corrupts the last good checkpoint.

use crate::domain::property::PropertyRecord;
use crate::domain::session::{SessionState, SessionSummary};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Lifecycle phase of a scrape session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionPhase {
    Empty,
    Accumulating,
    Checkpointed,
    Finalized,
}

#[derive(Error, Debug)]
pub enum AggregationError {
    /// Programming-error-class failure: the session is terminal
    #[error("Session already finalized; '{operation}' is not allowed")]
    SessionFinalized { operation: &'static str },

    #[error("Nothing to checkpoint; the session has not accumulated any data")]
    SessionEmpty,

    #[error("No checkpoint path configured for this session")]
    NoCheckpointPath,

    #[error("Checkpoint I/O failed at {path}: {source}")]
    CheckpointIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Checkpoint serialization failed: {0}")]
    CheckpointSerialization(#[from] serde_json::Error),
}

/// Result of ingesting one record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    Inserted,
    /// An earlier record with the same identity key was replaced
    Replaced,
}

/// Durable snapshot of the deduplicated record set plus session counters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    pub state: SessionState,
    /// Records indexed by identity key; BTreeMap keeps serialization
    /// deterministic
    pub records: BTreeMap<String, PropertyRecord>,
    pub created_at: DateTime<Utc>,
}

impl Checkpoint {
    /// Load a checkpoint file written by `SessionAggregator::checkpoint`
    pub fn load(path: impl AsRef<Path>) -> Result<Self, AggregationError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| {
            AggregationError::CheckpointIo {
                path: path.to_path_buf(),
                source,
            }
        })?;
        let checkpoint: Self = serde_json::from_str(&content)?;
        info!(
            "Loaded checkpoint from {}: {} records, {} pages",
            path.display(),
            checkpoint.records.len(),
            checkpoint.state.pages_processed
        );
        Ok(checkpoint)
    }
}

/// Accumulates, deduplicates and persists extraction output for one session.
///
/// State machine: Empty -> Accumulating -> Checkpointed (repeatable) ->
/// Finalized (terminal). `ingest` and `ingest_page_stats` are rejected once
/// the session is finalized; `checkpoint` is rejected until the session has
/// accumulated something.
pub struct SessionAggregator {
    phase: SessionPhase,
    state: SessionState,
    records: BTreeMap<String, PropertyRecord>,
    checkpoint_path: Option<PathBuf>,
}

impl SessionAggregator {
    pub fn new() -> Self {
        Self {
            phase: SessionPhase::Empty,
            state: SessionState::new(),
            records: BTreeMap::new(),
            checkpoint_path: None,
        }
    }

    /// Set the checkpoint file this session persists to
    pub fn with_checkpoint_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.checkpoint_path = Some(path.into());
        self
    }

    /// Resume a session from a previously written checkpoint. The resumed
    /// aggregator keeps checkpointing to the same file.
    pub fn resume_from(path: impl AsRef<Path>) -> Result<Self, AggregationError> {
        let path = path.as_ref();
        let checkpoint = Checkpoint::load(path)?;
        Ok(Self {
            phase: SessionPhase::Checkpointed,
            state: checkpoint.state,
            records: checkpoint.records,
            checkpoint_path: Some(path.to_path_buf()),
        })
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Current deduplicated record set, keyed by identity key
    pub fn records(&self) -> &BTreeMap<String, PropertyRecord> {
        &self.records
    }

    /// Ingest one scored record. An existing record with the same identity
    /// key is replaced by the newer one (last-write-wins).
    pub fn ingest(&mut self, record: PropertyRecord) -> Result<IngestOutcome, AggregationError> {
        self.guard_accumulating("ingest")?;

        self.state.records_extracted += 1;
        if record.is_valid {
            self.state.valid_records += 1;
        }

        let key = record.identity_key.clone();
        let outcome = match self.records.insert(key.clone(), record) {
            Some(previous) => {
                if previous.is_valid {
                    self.state.valid_records = self.state.valid_records.saturating_sub(1);
                }
                debug!("Replaced existing record for identity key {}", key);
                IngestOutcome::Replaced
            }
            None => IngestOutcome::Inserted,
        };

        self.state.last_updated_at = Utc::now();
        self.phase = SessionPhase::Accumulating;
        Ok(outcome)
    }

    /// Record page-level statistics after one page was processed
    pub fn ingest_page_stats(
        &mut self,
        page_number: u32,
        duration: Duration,
        error_count: u32,
        retry_count: u32,
    ) -> Result<(), AggregationError> {
        self.guard_accumulating("ingest_page_stats")?;

        self.state.pages_processed += 1;
        self.state.total_page_time_ms += duration.as_millis() as u64;
        self.state.errors_count += error_count;
        self.state.retries_count += retry_count;
        self.state.last_updated_at = Utc::now();
        self.phase = SessionPhase::Accumulating;

        debug!(
            "Page {} ingested in {:?} ({} errors, {} retries); avg page time {:.0} ms",
            page_number,
            duration,
            error_count,
            retry_count,
            self.state.avg_page_time_ms()
        );
        Ok(())
    }

    /// Persist the deduplicated record set and session state.
    ///
    /// The file is written to a temporary sibling and renamed into place,
    /// so a crash between write and rename leaves the previous checkpoint
    /// intact.
    pub fn checkpoint(&mut self) -> Result<PathBuf, AggregationError> {
        if self.phase == SessionPhase::Finalized {
            return Err(AggregationError::SessionFinalized {
                operation: "checkpoint",
            });
        }
        if self.phase == SessionPhase::Empty {
            return Err(AggregationError::SessionEmpty);
        }
        let path = self
            .checkpoint_path
            .clone()
            .ok_or(AggregationError::NoCheckpointPath)?;

        self.state.last_checkpoint_page = Some(self.state.pages_processed);
        let checkpoint = Checkpoint {
            state: self.state.clone(),
            records: self.records.clone(),
            created_at: Utc::now(),
        };
        let content = serde_json::to_string_pretty(&checkpoint)?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|source| {
                    AggregationError::CheckpointIo {
                        path: parent.to_path_buf(),
                        source,
                    }
                })?;
            }
        }

        let temp_path = temp_sibling(&path);
        std::fs::write(&temp_path, content).map_err(|source| AggregationError::CheckpointIo {
            path: temp_path.clone(),
            source,
        })?;
        std::fs::rename(&temp_path, &path).map_err(|source| {
            // leave the temp file for inspection; the previous checkpoint
            // is still valid
            warn!("Checkpoint rename failed, previous checkpoint preserved");
            AggregationError::CheckpointIo {
                path: path.clone(),
                source,
            }
        })?;

        self.phase = SessionPhase::Checkpointed;
        info!(
            "Checkpointed {} records after {} pages to {}",
            self.records.len(),
            self.state.pages_processed,
            path.display()
        );
        Ok(path)
    }

    /// Final flush: last checkpoint (when a path is configured), terminal
    /// phase, and the deduplicated dataset plus summary statistics.
    pub fn finalize(&mut self) -> Result<(Vec<PropertyRecord>, SessionSummary), AggregationError> {
        if self.phase == SessionPhase::Finalized {
            return Err(AggregationError::SessionFinalized {
                operation: "finalize",
            });
        }
        if self.checkpoint_path.is_some() && self.phase != SessionPhase::Empty {
            self.checkpoint()?;
        }
        self.phase = SessionPhase::Finalized;

        let completed_at = Utc::now();
        let summary = SessionSummary {
            session_id: self.state.session_id.clone(),
            pages_processed: self.state.pages_processed,
            records_extracted: self.state.records_extracted,
            unique_records: self.records.len() as u32,
            valid_records: self.state.valid_records,
            errors_count: self.state.errors_count,
            retries_count: self.state.retries_count,
            avg_page_time_ms: self.state.avg_page_time_ms(),
            started_at: self.state.started_at,
            completed_at,
            execution_time_seconds: (completed_at - self.state.started_at).num_seconds().max(0)
                as u32,
        };
        info!(
            "Session {} finalized: {} unique records ({} valid) across {} pages",
            summary.session_id, summary.unique_records, summary.valid_records,
            summary.pages_processed
        );
        Ok((self.records.values().cloned().collect(), summary))
    }

    fn guard_accumulating(&self, operation: &'static str) -> Result<(), AggregationError> {
        if self.phase == SessionPhase::Finalized {
            return Err(AggregationError::SessionFinalized { operation });
        }
        Ok(())
    }
}

impl Default for SessionAggregator {
    fn default() -> Self {
        Self::new()
    }
}

/// Temp file next to the target so the rename stays on one filesystem
fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::property::CardVariant;

    fn record(key: &str, valid: bool) -> PropertyRecord {
        PropertyRecord {
            identity_key: key.to_string(),
            page_id: 1,
            index_in_page: 0,
            variant: CardVariant::Standard,
            property_type: None,
            fields: BTreeMap::new(),
            quality_score: if valid { 100.0 } else { 0.0 },
            is_valid: valid,
            issues: Vec::new(),
            extracted_at: Utc::now(),
        }
    }

    #[test]
    fn test_last_write_wins_deduplication() {
        let mut aggregator = SessionAggregator::new();
        let mut first = record("k1", true);
        first.page_id = 1;
        let mut second = record("k1", true);
        second.page_id = 7;

        assert_eq!(aggregator.ingest(first).unwrap(), IngestOutcome::Inserted);
        assert_eq!(aggregator.ingest(second).unwrap(), IngestOutcome::Replaced);

        assert_eq!(aggregator.records().len(), 1);
        assert_eq!(aggregator.records()["k1"].page_id, 7);
        assert_eq!(aggregator.state().records_extracted, 2);
        assert_eq!(aggregator.state().valid_records, 1);
    }

    #[test]
    fn test_replacing_valid_with_invalid_updates_counter() {
        let mut aggregator = SessionAggregator::new();
        aggregator.ingest(record("k1", true)).unwrap();
        aggregator.ingest(record("k1", false)).unwrap();
        assert_eq!(aggregator.state().valid_records, 0);
    }

    #[test]
    fn test_page_stats_accumulate() {
        let mut aggregator = SessionAggregator::new();
        aggregator
            .ingest_page_stats(1, Duration::from_millis(200), 1, 0)
            .unwrap();
        aggregator
            .ingest_page_stats(2, Duration::from_millis(400), 0, 2)
            .unwrap();

        let state = aggregator.state();
        assert_eq!(state.pages_processed, 2);
        assert_eq!(state.errors_count, 1);
        assert_eq!(state.retries_count, 2);
        assert_eq!(state.avg_page_time_ms(), 300.0);
    }

    #[test]
    fn test_phase_machine_rejects_ingest_after_finalize() {
        let mut aggregator = SessionAggregator::new();
        aggregator.ingest(record("k1", true)).unwrap();
        let (records, summary) = aggregator.finalize().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(summary.unique_records, 1);
        assert_eq!(aggregator.phase(), SessionPhase::Finalized);

        assert!(matches!(
            aggregator.ingest(record("k2", true)),
            Err(AggregationError::SessionFinalized { operation: "ingest" })
        ));
        assert!(matches!(
            aggregator.finalize(),
            Err(AggregationError::SessionFinalized { .. })
        ));
    }

    #[test]
    fn test_checkpoint_on_empty_session_is_rejected() {
        let mut aggregator = SessionAggregator::new().with_checkpoint_path("unused.json");
        assert!(matches!(
            aggregator.checkpoint(),
            Err(AggregationError::SessionEmpty)
        ));
        assert_eq!(aggregator.phase(), SessionPhase::Empty);
    }

    #[test]
    fn test_finalizing_empty_session_skips_checkpoint() {
        let mut aggregator = SessionAggregator::new().with_checkpoint_path("unused.json");
        let (records, summary) = aggregator.finalize().unwrap();
        assert!(records.is_empty());
        assert_eq!(summary.unique_records, 0);
        assert_eq!(aggregator.phase(), SessionPhase::Finalized);
    }

    #[test]
    fn test_checkpoint_without_path_is_an_error() {
        let mut aggregator = SessionAggregator::new();
        aggregator.ingest(record("k1", true)).unwrap();
        assert!(matches!(
            aggregator.checkpoint(),
            Err(AggregationError::NoCheckpointPath)
        ));
    }
}
