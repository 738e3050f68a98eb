//! Selector cascade engine
//!
//! One generic evaluator replaces per-field bespoke control flow: every
//! field declares an ordered list of structural selectors followed by an
//! ordered list of regex fallbacks, and the first plausible match wins.
//! Earlier-declared strategies always take precedence, so strategy order
//! encodes "most structural" to "most textual". Exhausting both cascades
//! is a normal outcome represented as an absent result.

use crate::domain::property::FieldValue;
use crate::infrastructure::parsing::card_locator::PropertyCard;
use crate::infrastructure::parsing::config::FieldSpec;
use anyhow::Result;
use regex::Regex;
use scraper::Selector;
use tracing::{debug, warn};

/// How the extracted value was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confidence {
    /// A structural selector matched
    Structural,
    /// A regex fallback over the card text matched
    Fallback,
    /// Both cascades exhausted
    NotFound,
}

/// Per-field extraction outcome with provenance for diagnostics
#[derive(Debug, Clone)]
pub struct ExtractionResult {
    pub field: String,
    pub raw_text: Option<String>,
    /// Normalized value, filled in by the record extractor
    pub value: Option<FieldValue>,
    /// Identifier of the winning strategy ("selector_2", "pattern_0", "none")
    pub strategy: String,
    pub confidence: Confidence,
}

impl ExtractionResult {
    fn absent(field: &str) -> Self {
        Self {
            field: field.to_string(),
            raw_text: None,
            value: None,
            strategy: "none".to_string(),
            confidence: Confidence::NotFound,
        }
    }
}

/// Compiled cascade for one field spec. Strategy ids keep the indices of
/// the declared configuration entries even when some fail to compile.
pub struct FieldCascade {
    pub spec: FieldSpec,
    selectors: Vec<(usize, Selector)>,
    patterns: Vec<(usize, Regex)>,
}

impl FieldCascade {
    /// Compile the selectors and patterns of a field spec. Individual
    /// entries that fail to compile are skipped with a warning; a spec
    /// whose every strategy is invalid is a configuration error.
    pub fn compile(spec: &FieldSpec) -> Result<Self> {
        let mut selectors = Vec::new();
        for (i, selector_str) in spec.selectors.iter().enumerate() {
            match Selector::parse(selector_str) {
                Ok(selector) => selectors.push((i, selector)),
                Err(e) => warn!(
                    "Field '{}': failed to compile selector '{}': {}",
                    spec.name, selector_str, e
                ),
            }
        }

        let mut patterns = Vec::new();
        for (i, pattern_str) in spec.patterns.iter().enumerate() {
            match Regex::new(pattern_str) {
                Ok(regex) => patterns.push((i, regex)),
                Err(e) => warn!(
                    "Field '{}': failed to compile pattern '{}': {}",
                    spec.name, pattern_str, e
                ),
            }
        }

        if selectors.is_empty() && patterns.is_empty() {
            return Err(anyhow::anyhow!(
                "Field '{}': no valid selectors or patterns compiled from {} declared strategies",
                spec.name,
                spec.selectors.len() + spec.patterns.len()
            ));
        }

        Ok(Self {
            spec: spec.clone(),
            selectors,
            patterns,
        })
    }

    /// Run the cascade against one card. Pure: no side effects, never
    /// errors; absence is returned, not raised.
    pub fn extract(&self, card: &PropertyCard<'_>) -> ExtractionResult {
        // Structural strategies, in declared order
        for (i, selector) in &self.selectors {
            if let Some(element) = card.element.select(selector).next() {
                let raw = match &self.spec.attribute {
                    Some(attr) => element.value().attr(attr).unwrap_or("").to_string(),
                    None => element.text().collect::<String>(),
                };
                let trimmed = raw.trim();
                if is_plausible(trimmed) {
                    debug!(
                        "Field '{}' matched selector_{} on card {}",
                        self.spec.name, i, card.index
                    );
                    return ExtractionResult {
                        field: self.spec.name.clone(),
                        raw_text: Some(trimmed.to_string()),
                        value: None,
                        strategy: format!("selector_{i}"),
                        confidence: Confidence::Structural,
                    };
                }
            }
        }

        // Regex fallbacks over the full card text
        if !self.patterns.is_empty() {
            let card_text = card.text();
            for (i, regex) in &self.patterns {
                if let Some(captures) = regex.captures(&card_text) {
                    if let Some(group) = captures.get(1) {
                        let trimmed = group.as_str().trim();
                        if is_plausible(trimmed) {
                            debug!(
                                "Field '{}' recovered via pattern_{} on card {}",
                                self.spec.name, i, card.index
                            );
                            return ExtractionResult {
                                field: self.spec.name.clone(),
                                raw_text: Some(trimmed.to_string()),
                                value: None,
                                strategy: format!("pattern_{i}"),
                                confidence: Confidence::Fallback,
                            };
                        }
                    }
                }
            }
        }

        ExtractionResult::absent(&self.spec.name)
    }
}

/// Minimal plausibility check: non-empty and not a pure placeholder
fn is_plausible(text: &str) -> bool {
    !text.is_empty() && !matches!(text, "-" | "--" | "N/A" | "NA" | "TBD" | "null")
}
