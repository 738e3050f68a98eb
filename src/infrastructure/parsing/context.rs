//! Parsing context for extraction operations
//!
//! Carries per-page information through the pipeline: page number, base URL
//! for resolving relative links, and the timestamp relative dates resolve
//! against.

use chrono::{DateTime, Utc};

/// Context information for one page-parse
#[derive(Debug, Clone)]
pub struct ParseContext {
    /// Page number being parsed (1-based, as reported by the fetch layer)
    pub page_id: u32,

    /// Base URL for resolving relative listing links
    pub base_url: String,

    /// Timestamp the page was fetched; "N days ago" resolves against this
    pub extracted_at: DateTime<Utc>,

    /// Additional metadata (city, search filter, fetch attempt, ...)
    pub metadata: std::collections::HashMap<String, String>,
}

impl ParseContext {
    /// Create new parse context stamped with the current time
    pub fn new(page_id: u32, base_url: impl Into<String>) -> Self {
        Self {
            page_id,
            base_url: base_url.into(),
            extracted_at: Utc::now(),
            metadata: std::collections::HashMap::new(),
        }
    }

    /// Override the extraction timestamp (deterministic tests, replays)
    pub fn with_extracted_at(mut self, at: DateTime<Utc>) -> Self {
        self.extracted_at = at;
        self
    }

    /// Add metadata to context
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}
