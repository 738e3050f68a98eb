//! Listing record model and typed field values
//!
//! A `PropertyRecord` is the unit of pipeline output: a map from logical
//! field names to normalized values plus extraction metadata. Records are
//! created once per card, scored by the validator, and owned by the session
//! aggregator afterwards.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Logical field names shared by the extraction config, the validator and
/// downstream exporters.
pub mod fields {
    pub const TITLE: &str = "title";
    pub const URL: &str = "url";
    pub const PRICE: &str = "price";
    pub const SUPER_AREA: &str = "super_area";
    pub const CARPET_AREA: &str = "carpet_area";
    pub const LOCALITY: &str = "locality";
    pub const PROPERTY_TYPE: &str = "property_type";
    pub const STATUS: &str = "status";
    pub const FURNISHING: &str = "furnishing";
    pub const BEDROOMS: &str = "bedrooms";
    pub const BATHROOMS: &str = "bathrooms";
    pub const PHOTO_COUNT: &str = "photo_count";
    pub const POSTED_DATE: &str = "posted_date";
    pub const DESCRIPTION: &str = "description";
}

/// Property category inferred from the listing title or extracted directly
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PropertyType {
    Apartment,
    House,
    Villa,
    Plot,
    BuilderFloor,
}

impl PropertyType {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Apartment => "Apartment",
            Self::House => "House",
            Self::Villa => "Villa",
            Self::Plot => "Plot",
            Self::BuilderFloor => "Builder Floor",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "Apartment" => Some(Self::Apartment),
            "House" => Some(Self::House),
            "Villa" => Some(Self::Villa),
            "Plot" => Some(Self::Plot),
            "Builder Floor" => Some(Self::BuilderFloor),
            _ => None,
        }
    }
}

/// Construction/possession status of a listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ListingStatus {
    ReadyToMove,
    UnderConstruction,
    NewLaunch,
    Resale,
}

/// Furnishing level of a listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Furnishing {
    Furnished,
    SemiFurnished,
    Unfurnished,
}

/// Structural variant of a listing card on a search-results page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CardVariant {
    Standard,
    Premium,
    Sponsored,
    PreferredAgent,
}

/// Price unit recognized on the target portal. Crore scales Lac by 100.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PriceUnit {
    Lac,
    Crore,
}

impl PriceUnit {
    /// Multiplier into the base unit (Lac)
    pub fn lac_multiplier(&self) -> f64 {
        match self {
            Self::Lac => 1.0,
            Self::Crore => 100.0,
        }
    }
}

/// Area unit recognized on the target portal, normalized to square feet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AreaUnit {
    SquareFeet,
    SquareYards,
    Acres,
}

impl AreaUnit {
    /// Conversion factor into square feet
    pub fn sqft_factor(&self) -> f64 {
        match self {
            Self::SquareFeet => 1.0,
            Self::SquareYards => 9.0,
            Self::Acres => 43_560.0,
        }
    }
}

/// Normalized, typed value of one extracted field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldValue {
    Text {
        value: String,
    },
    Count {
        value: u32,
    },
    Price {
        /// Original display string, e.g. "₹1.2 Cr"
        display: String,
        amount: f64,
        unit: PriceUnit,
        /// Amount normalized to Lac for cross-record comparability
        in_lac: f64,
    },
    Area {
        display: String,
        value: f64,
        unit: AreaUnit,
        /// Value normalized to square feet
        in_sqft: f64,
    },
    Date {
        value: NaiveDate,
    },
}

impl FieldValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text { value } => Some(value),
            _ => None,
        }
    }

    pub fn as_count(&self) -> Option<u32> {
        match self {
            Self::Count { value } => Some(*value),
            _ => None,
        }
    }

    pub fn price_in_lac(&self) -> Option<f64> {
        match self {
            Self::Price { in_lac, .. } => Some(*in_lac),
            _ => None,
        }
    }

    pub fn area_in_sqft(&self) -> Option<f64> {
        match self {
            Self::Area { in_sqft, .. } => Some(*in_sqft),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Self::Date { value } => Some(*value),
            _ => None,
        }
    }
}

/// Severity of a data-quality finding on one record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IssueSeverity {
    Critical,
    Warning,
    Info,
}

/// Category of a data-quality finding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IssueType {
    MissingRequired,
    ImplausibleValue,
    CrossFieldInconsistency,
    IdentityUnderivable,
}

/// One data-quality finding attached to a record by the validator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityIssue {
    pub severity: IssueSeverity,
    pub field_name: String,
    pub issue_type: IssueType,
    pub detail: String,
}

/// One extracted listing: field map plus extraction metadata.
///
/// `fields` is a `BTreeMap` so serialized output is deterministic, which
/// keeps re-ingested datasets byte-for-byte identical.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyRecord {
    /// Stable deduplication key: canonical listing URL, or a content hash
    pub identity_key: String,
    pub page_id: u32,
    pub index_in_page: u32,
    pub variant: CardVariant,
    pub property_type: Option<PropertyType>,
    pub fields: BTreeMap<String, FieldValue>,
    /// Percentage of applicable fields successfully extracted, 0..=100
    pub quality_score: f64,
    pub is_valid: bool,
    pub issues: Vec<QualityIssue>,
    pub extracted_at: DateTime<Utc>,
}

impl PropertyRecord {
    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    pub fn text_field(&self, name: &str) -> Option<&str> {
        self.field(name).and_then(FieldValue::as_text)
    }

    /// Normalized price in Lac, if a price was extracted
    pub fn price_in_lac(&self) -> Option<f64> {
        self.field(fields::PRICE).and_then(FieldValue::price_in_lac)
    }

    /// Any area-like field in square feet, preferring super area
    pub fn any_area(&self) -> Option<f64> {
        self.field(fields::SUPER_AREA)
            .or_else(|| self.field(fields::CARPET_AREA))
            .and_then(FieldValue::area_in_sqft)
    }

    /// Derive the stable identity key for a listing.
    ///
    /// The canonical URL wins when present; otherwise a blake3 hash of the
    /// normalized title, locality and price display string. The composite
    /// is lowercased with collapsed whitespace so the key survives cosmetic
    /// markup changes between runs.
    pub fn derive_identity_key(
        url: Option<&str>,
        title: Option<&str>,
        locality: Option<&str>,
        price_display: Option<&str>,
    ) -> String {
        if let Some(url) = url {
            let trimmed = url.trim().trim_end_matches('/');
            if !trimmed.is_empty() {
                return trimmed.to_string();
            }
        }

        let composite = format!(
            "{}|{}|{}",
            normalize_key_part(title.unwrap_or("")),
            normalize_key_part(locality.unwrap_or("")),
            normalize_key_part(price_display.unwrap_or(""))
        );
        blake3::hash(composite.as_bytes()).to_hex().to_string()
    }
}

fn normalize_key_part(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
