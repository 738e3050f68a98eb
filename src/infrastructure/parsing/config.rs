//! Extraction configuration for listing pages
//!
//! Centralized, declarative configuration: per-field selector cascades with
//! regex fallbacks, card container variants, enumeration keyword tables and
//! the checkpoint cadence hint. Loaded once at startup and shared read-only
//! by all extractions.

use crate::domain::property::{PropertyType, fields};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Expected normalized type of one extractable field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValueType {
    Text,
    Count,
    Price,
    Area,
    Date,
    Status,
    Furnishing,
    PropertyType,
}

/// Declarative description of one extractable field.
///
/// Strategy order encodes precedence: structural selectors from most
/// specific to most general, then regex fallbacks over the card text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,

    /// Ordered structural CSS selector strategies
    pub selectors: Vec<String>,

    /// Ordered regex fallback strategies; capture group 1 is the value
    pub patterns: Vec<String>,

    /// Extract this attribute instead of text content (e.g. "href")
    #[serde(default)]
    pub attribute: Option<String>,

    pub value_type: ValueType,

    /// Record is invalid without this field
    pub required: bool,

    /// Property types this field does not apply to (e.g. carpet area on plots)
    #[serde(default)]
    pub inapplicable_for: Vec<PropertyType>,
}

impl FieldSpec {
    /// Whether this field applies to a record of the given property type.
    /// An uninferred type keeps the full field set applicable.
    pub fn applies_to(&self, property_type: Option<PropertyType>) -> bool {
        match property_type {
            Some(pt) => !self.inapplicable_for.contains(&pt),
            None => true,
        }
    }
}

/// Selectors for locating listing cards and classifying their variant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardSelectors {
    /// Card container selectors - multiple fallbacks for site variants
    pub card_container: Vec<String>,

    /// Markers identifying premium cards (checked inside each card)
    pub premium_markers: Vec<String>,

    /// Markers identifying sponsored cards
    pub sponsored_markers: Vec<String>,

    /// Markers identifying preferred-agent cards
    pub preferred_agent_markers: Vec<String>,

    /// Selectors for pagination controls
    pub pagination: Vec<String>,
}

impl Default for CardSelectors {
    fn default() -> Self {
        Self {
            card_container: vec![
                "div.mb-srp__card".to_string(),
                ".srp-tuple__card".to_string(),
                "[data-testid='srp-tuple']".to_string(),
                "div.property-card".to_string(),
                "article.listing-card".to_string(),
                "div.result-card".to_string(),
            ],
            premium_markers: vec![
                "[class*='premium']".to_string(),
                ".mb-srp__card--premium-badge".to_string(),
            ],
            sponsored_markers: vec![
                "[class*='sponsor']".to_string(),
                "[data-ad='sponsored']".to_string(),
            ],
            preferred_agent_markers: vec![
                "[class*='preferred-agent']".to_string(),
                "[class*='prefAgent']".to_string(),
            ],
            pagination: vec![
                ".pagination a".to_string(),
                ".mb-srp__pagination a".to_string(),
                "a[rel='next']".to_string(),
                ".next-page".to_string(),
            ],
        }
    }
}

/// One keyword-to-canonical-label mapping rule
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeywordRule {
    pub keyword: String,
    pub label: String,
}

impl KeywordRule {
    fn new(keyword: &str, label: &str) -> Self {
        Self {
            keyword: keyword.to_string(),
            label: label.to_string(),
        }
    }
}

/// Priority-ordered keyword tables for enumerated fields.
/// First matching keyword wins, so narrower keywords come first
/// ("semi furnished" before "furnished").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeywordTables {
    pub status: Vec<KeywordRule>,
    pub furnishing: Vec<KeywordRule>,
    pub property_type: Vec<KeywordRule>,
}

impl Default for KeywordTables {
    fn default() -> Self {
        Self {
            status: vec![
                KeywordRule::new("ready to move", "Ready to Move"),
                KeywordRule::new("under construction", "Under Construction"),
                KeywordRule::new("new launch", "New Launch"),
                KeywordRule::new("resale", "Resale"),
                KeywordRule::new("poss. by", "Under Construction"),
            ],
            furnishing: vec![
                KeywordRule::new("semi-furnished", "Semi-Furnished"),
                KeywordRule::new("semi furnished", "Semi-Furnished"),
                KeywordRule::new("semifurnished", "Semi-Furnished"),
                KeywordRule::new("unfurnished", "Unfurnished"),
                KeywordRule::new("furnished", "Furnished"),
            ],
            property_type: vec![
                KeywordRule::new("builder floor", "Builder Floor"),
                KeywordRule::new("independent floor", "Builder Floor"),
                KeywordRule::new("independent house", "House"),
                KeywordRule::new("villa", "Villa"),
                KeywordRule::new("plot", "Plot"),
                KeywordRule::new("land", "Plot"),
                KeywordRule::new("apartment", "Apartment"),
                KeywordRule::new("flat", "Apartment"),
                KeywordRule::new("bhk", "Apartment"),
                KeywordRule::new("house", "House"),
            ],
        }
    }
}

/// Complete extraction configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Base URL for resolving relative listing links
    pub base_url: String,

    /// Checkpoint cadence hint for the caller (pages between checkpoints)
    pub checkpoint_interval_pages: u32,

    pub card_selectors: CardSelectors,

    pub field_specs: Vec<FieldSpec>,

    pub keywords: KeywordTables,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.magicbricks.com".to_string(),
            checkpoint_interval_pages: 5,
            card_selectors: CardSelectors::default(),
            field_specs: default_field_specs(),
            keywords: KeywordTables::default(),
        }
    }
}

impl ExtractionConfig {
    /// Load configuration from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read extraction config: {}", path.display()))?;
        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse extraction config: {}", path.display()))?;
        tracing::info!(
            "Loaded extraction config with {} field specs from {}",
            config.field_specs.len(),
            path.display()
        );
        Ok(config)
    }

    /// Save configuration to a JSON file (creates parent directories)
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {}", parent.display()))?;
        }
        let content = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write extraction config: {}", path.display()))?;
        Ok(())
    }

    /// Look up a field spec by logical field name
    pub fn field_spec(&self, name: &str) -> Option<&FieldSpec> {
        self.field_specs.iter().find(|s| s.name == name)
    }
}

fn spec(
    name: &str,
    selectors: &[&str],
    patterns: &[&str],
    value_type: ValueType,
    required: bool,
) -> FieldSpec {
    FieldSpec {
        name: name.to_string(),
        selectors: selectors.iter().map(|s| s.to_string()).collect(),
        patterns: patterns.iter().map(|s| s.to_string()).collect(),
        attribute: None,
        value_type,
        required,
        inapplicable_for: Vec::new(),
    }
}

/// Default field set for the target portal's search-result cards
fn default_field_specs() -> Vec<FieldSpec> {
    let mut specs = vec![
        spec(
            fields::TITLE,
            &[
                "h2.mb-srp__card--title",
                ".mb-srp__card--title",
                ".srp-tuple__title",
                "h2 a",
                ".card-title",
                "h2",
            ],
            &[],
            ValueType::Text,
            true,
        ),
        FieldSpec {
            attribute: Some("href".to_string()),
            ..spec(
                fields::URL,
                &[
                    "h2.mb-srp__card--title a",
                    ".mb-srp__card--title a",
                    ".srp-tuple__title a",
                    "a[href*='propertydetail']",
                    "a[href*='/property']",
                    "h2 a",
                ],
                &[],
                ValueType::Text,
                false,
            )
        },
        spec(
            fields::PRICE,
            &[
                ".mb-srp__card__price--amount",
                ".srp-tuple__price",
                "[class*='price--amount']",
                ".price",
            ],
            &[
                r"(?i)price\s*[:\-]?\s*(₹?\s*[\d,]+(?:\.\d+)?\s*(?:Lacs?|Lakhs?|Crores?|Cr))",
                r"(?i)(₹\s*[\d,]+(?:\.\d+)?\s*(?:Lacs?|Lakhs?|Crores?|Cr))",
            ],
            ValueType::Price,
            true,
        ),
        spec(
            fields::SUPER_AREA,
            &[
                "[data-summary='super-area'] .mb-srp__card__summary--value",
                "[data-summary='plot-area'] .mb-srp__card__summary--value",
                ".srp-tuple__area--super",
            ],
            &[
                r"(?i)(?:super|built[\s-]?up|plot)\s*area\s*[:\-]?\s*([\d,]+(?:\.\d+)?\s*(?:sq\.?\s*ft|sqft|sq\.?\s*yards?|sqyrd|acres?))",
            ],
            ValueType::Area,
            false,
        ),
        spec(
            fields::CARPET_AREA,
            &[
                "[data-summary='carpet-area'] .mb-srp__card__summary--value",
                ".srp-tuple__area--carpet",
            ],
            &[
                r"(?i)carpet\s*area\s*[:\-]?\s*([\d,]+(?:\.\d+)?\s*(?:sq\.?\s*ft|sqft|sq\.?\s*yards?|sqyrd|acres?))",
            ],
            ValueType::Area,
            false,
        ),
        spec(
            fields::LOCALITY,
            &[
                ".mb-srp__card--locality",
                ".srp-tuple__locality",
                "[class*='locality']",
            ],
            &[r"(?i)\bin\s+([A-Z][A-Za-z0-9 .\-]{2,40}?)(?:,|\s*$)"],
            ValueType::Text,
            false,
        ),
        spec(
            fields::PROPERTY_TYPE,
            &["[data-summary='property-type'] .mb-srp__card__summary--value"],
            &[
                r"(?i)\b(builder\s*floor|independent\s*house|villa|plot|land|apartment|flat)\b",
            ],
            ValueType::PropertyType,
            true,
        ),
        spec(
            fields::STATUS,
            &["[data-summary='status'] .mb-srp__card__summary--value"],
            &[
                r"(?i)\b(ready\s*to\s*move|under\s*construction|new\s*launch|resale)\b",
            ],
            ValueType::Status,
            false,
        ),
        spec(
            fields::FURNISHING,
            &["[data-summary='furnishing'] .mb-srp__card__summary--value"],
            &[r"(?i)\b(semi[\s-]?furnished|unfurnished|furnished)\b"],
            ValueType::Furnishing,
            false,
        ),
        spec(
            fields::BEDROOMS,
            &["[data-summary='bedroom'] .mb-srp__card__summary--value"],
            &[r"(?i)(\d+)\s*(?:BHK|Bed)"],
            ValueType::Count,
            false,
        ),
        spec(
            fields::BATHROOMS,
            &["[data-summary='bathroom'] .mb-srp__card__summary--value"],
            &[r"(?i)(\d+)\s*Bath"],
            ValueType::Count,
            false,
        ),
        spec(
            fields::PHOTO_COUNT,
            &[
                ".mb-srp__card__photo__fig--count",
                "[class*='photo-count']",
            ],
            &[r"(?i)(\d+)\+?\s*Photos"],
            ValueType::Count,
            false,
        ),
        spec(
            fields::POSTED_DATE,
            &[".mb-srp__card__ads--date", "[class*='posted-date']"],
            &[r"(?i)(?:posted|updated)\s*[:\-]?\s*([A-Za-z0-9 ,/\-]+?)(?:\s*\||\s*$)"],
            ValueType::Date,
            false,
        ),
        spec(
            fields::DESCRIPTION,
            &[".mb-srp__card--desc", "[class*='description']"],
            &[],
            ValueType::Text,
            false,
        ),
    ];

    // Plots carry no interior-dependent fields
    let plot_inapplicable = [
        fields::CARPET_AREA,
        fields::FURNISHING,
        fields::BEDROOMS,
        fields::BATHROOMS,
    ];
    for s in &mut specs {
        if plot_inapplicable.contains(&s.name.as_str()) {
            s.inapplicable_for.push(PropertyType::Plot);
        }
    }

    specs
}
