//! Extraction error types
//!
//! Field-level absence is never an error in this pipeline; it is a normal,
//! representable outcome of the cascade. The variants here cover page-level
//! structural failures and configuration problems only.

use thiserror::Error;

/// Result alias for parsing operations
pub type ParsingResult<T> = Result<T, ExtractionError>;

#[derive(Error, Debug, Clone)]
pub enum ExtractionError {
    /// Every known container pattern produced zero cards. Recoverable at
    /// page level: the caller may retry the fetch or skip the page.
    #[error("No listing cards found on page {page_id}")]
    NoCardsFound {
        page_id: u32,
        tried_selectors: Vec<String>,
    },

    #[error("Invalid CSS selector: {selector} - {reason}")]
    InvalidSelector { selector: String, reason: String },

    #[error("Invalid regex pattern: {pattern} - {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("Configuration error in '{field}': {message}")]
    ConfigurationError { field: String, message: String },
}

impl ExtractionError {
    /// Create a no cards found error with the selectors that were tried
    pub fn no_cards_found(page_id: u32, tried_selectors: Vec<String>) -> Self {
        Self::NoCardsFound {
            page_id,
            tried_selectors,
        }
    }

    pub fn invalid_selector(selector: &str, reason: &str) -> Self {
        Self::InvalidSelector {
            selector: selector.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn configuration(field: &str, message: &str) -> Self {
        Self::ConfigurationError {
            field: field.to_string(),
            message: message.to_string(),
        }
    }
}
