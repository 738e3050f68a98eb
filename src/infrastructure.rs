//! Infrastructure layer for HTML extraction, aggregation and logging
//!
//! This module hosts the parsing pipeline (card location, field cascades,
//! normalization, validation), the session aggregator with checkpoint
//! persistence, and the logging setup.

pub mod aggregation; // Session aggregation, deduplication and checkpointing
pub mod logging; // Logging infrastructure
pub mod parsing; // Extraction pipeline following the cascade architecture

// Re-export commonly used items
pub use aggregation::{AggregationError, Checkpoint, IngestOutcome, SessionAggregator};
pub use logging::{get_log_directory, init_logging, init_logging_with_config};
pub use parsing::{
    CardLocator, ExtractionConfig, ExtractionError, ExtractionResult, ParseContext, PropertyCard,
    RecordExtractor, RecordValidator,
};
