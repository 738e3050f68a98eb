//! Extraction pipeline for listing pages
//!
//! This module provides the cascade-based extraction architecture: a card
//! locator for finding listing regions on a page, a generic selector/regex
//! cascade evaluated per field, pure text normalizers, a record extractor
//! orchestrating one card into one record, and a validator that scores
//! records without discarding them.

pub mod card_locator;
pub mod cascade;
pub mod config;
pub mod context;
pub mod error;
pub mod normalizers;
pub mod record_extractor;
pub mod validator;

// Re-export public types
pub use card_locator::{CardLocator, PropertyCard};
pub use cascade::{Confidence, ExtractionResult, FieldCascade};
pub use config::{ExtractionConfig, FieldSpec, ValueType};
pub use context::ParseContext;
pub use error::{ExtractionError, ParsingResult};
pub use record_extractor::{PageOutcome, RecordExtractor};
pub use validator::RecordValidator;
