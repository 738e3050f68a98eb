//! Estate Certis - Real-Estate Listing Extraction Engine
//!
//! This library turns noisy, inconsistently-structured property-portal HTML
//! into typed, validated, deduplicated listing records. Page fetching and
//! browser automation are the caller's responsibility; the engine consumes
//! parsed HTML and produces `PropertyRecord` values plus session statistics.

// Module declarations
pub mod domain;
pub mod infrastructure;

// Re-export the extraction pipeline surface for easier access
pub use domain::property::{CardVariant, FieldValue, PropertyRecord, PropertyType};
pub use domain::session::{SessionState, SessionSummary};
pub use infrastructure::aggregation::{AggregationError, Checkpoint, SessionAggregator};
pub use infrastructure::parsing::{
    CardLocator, ExtractionConfig, ExtractionError, ExtractionResult, ParseContext,
    RecordExtractor, RecordValidator,
};
