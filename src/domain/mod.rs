//! Domain module - Core entities and value objects
//!
//! This module contains the typed listing record, its field values, and the
//! session-level state that the aggregation layer threads through the
//! pipeline.

pub mod property;
pub mod session;

// Re-export commonly used items
pub use property::{
    CardVariant, FieldValue, Furnishing, IssueSeverity, IssueType, ListingStatus, PropertyRecord,
    PropertyType, QualityIssue,
};
pub use session::{SessionState, SessionSummary};
