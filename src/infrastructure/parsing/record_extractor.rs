//! Record extractor - one card to one property record
//!
//! Orchestrates the selector cascade engine and the field normalizers
//! across a single card: infers the property type from the title when
//! possible, filters the field set by applicability, and assembles a
//! `PropertyRecord` with a stable identity key. Pure beyond the returned
//! record; per-field absence never aborts a card and a card never aborts
//! a page.

use crate::domain::property::{
    CardVariant, FieldValue, PropertyRecord, PropertyType, fields,
};
use crate::infrastructure::parsing::card_locator::{CardLocator, PropertyCard};
use crate::infrastructure::parsing::cascade::{Confidence, ExtractionResult, FieldCascade};
use crate::infrastructure::parsing::config::{ExtractionConfig, KeywordTables};
use crate::infrastructure::parsing::context::ParseContext;
use crate::infrastructure::parsing::error::{ExtractionError, ParsingResult};
use crate::infrastructure::parsing::normalizers;
use anyhow::Result;
use scraper::Html;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, warn};
use url::Url;

/// Result of extracting one full page
#[derive(Debug)]
pub struct PageOutcome {
    pub page_id: u32,
    pub cards_found: usize,
    pub records: Vec<PropertyRecord>,
    pub variant_counts: HashMap<CardVariant, usize>,
    /// Applicable fields that exhausted their cascade, across all cards
    pub absent_fields: u32,
}

/// Extracts property records from listing pages
pub struct RecordExtractor {
    card_locator: CardLocator,
    cascades: Vec<FieldCascade>,
    keywords: KeywordTables,
    base_url: String,
}

impl RecordExtractor {
    /// Build an extractor from the process-wide extraction configuration
    pub fn new(config: &ExtractionConfig) -> Result<Self> {
        let cascades = config
            .field_specs
            .iter()
            .map(FieldCascade::compile)
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            card_locator: CardLocator::new(&config.card_selectors)?,
            cascades,
            keywords: config.keywords.clone(),
            base_url: config.base_url.clone(),
        })
    }

    pub fn card_locator(&self) -> &CardLocator {
        &self.card_locator
    }

    /// Extract every card on a page. A page with zero locatable cards is
    /// the one page-level failure this engine signals; the caller decides
    /// whether to retry the fetch or skip the page.
    pub fn extract_page(&self, html: &Html, context: &ParseContext) -> ParsingResult<PageOutcome> {
        let cards = self.card_locator.locate(html);
        if cards.is_empty() {
            return Err(ExtractionError::no_cards_found(
                context.page_id,
                self.card_locator.tried_selectors(),
            ));
        }

        let cards_found = cards.len();
        let mut variant_counts: HashMap<CardVariant, usize> = HashMap::new();
        let mut absent_fields = 0;
        let mut records = Vec::with_capacity(cards_found);

        for card in &cards {
            *variant_counts.entry(card.variant).or_insert(0) += 1;
            let (record, absent) = self.extract_record(card, context);
            absent_fields += absent;
            records.push(record);
        }

        debug!(
            "Extracted {} records from {} cards on page {}",
            records.len(),
            cards_found,
            context.page_id
        );

        Ok(PageOutcome {
            page_id: context.page_id,
            cards_found,
            records,
            variant_counts,
            absent_fields,
        })
    }

    /// Extract one card into one record, returning the record plus the
    /// number of applicable fields whose cascade exhausted.
    pub fn extract_record(
        &self,
        card: &PropertyCard<'_>,
        context: &ParseContext,
    ) -> (PropertyRecord, u32) {
        // Title first: property-type inference keys off it, and the
        // applicability filter for the remaining fields needs the type.
        // The result is consumed below, not re-extracted.
        let title_result = self
            .cascade_for(fields::TITLE)
            .map(|c| self.extract_field(c, card, context));
        let inferred_type = title_result
            .as_ref()
            .and_then(|r| r.raw_text.as_deref())
            .and_then(|t| self.infer_property_type(t));

        let mut field_values: BTreeMap<String, FieldValue> = BTreeMap::new();
        let mut absent: u32 = 0;

        if let Some(result) = title_result {
            match result.value {
                Some(value) => {
                    field_values.insert(fields::TITLE.to_string(), value);
                }
                None => absent += 1,
            }
        }

        for cascade in &self.cascades {
            if cascade.spec.name == fields::TITLE || !cascade.spec.applies_to(inferred_type) {
                continue;
            }
            let result = self.extract_field(cascade, card, context);
            match result.value {
                Some(value) => {
                    field_values.insert(cascade.spec.name.clone(), value);
                }
                // cascade exhausted, or matched text the normalizer could
                // not type; either way the field is absent
                None => absent += 1,
            }
        }

        // Backfill the property type from the title inference when the
        // dedicated field cascade came up empty.
        if !field_values.contains_key(fields::PROPERTY_TYPE) {
            if let Some(pt) = inferred_type {
                field_values.insert(
                    fields::PROPERTY_TYPE.to_string(),
                    FieldValue::Text {
                        value: pt.label().to_string(),
                    },
                );
                absent = absent.saturating_sub(1);
            }
        }

        let property_type = field_values
            .get(fields::PROPERTY_TYPE)
            .and_then(FieldValue::as_text)
            .and_then(PropertyType::from_label)
            .or(inferred_type);

        let identity_key = PropertyRecord::derive_identity_key(
            field_values.get(fields::URL).and_then(FieldValue::as_text),
            field_values.get(fields::TITLE).and_then(FieldValue::as_text),
            field_values
                .get(fields::LOCALITY)
                .and_then(FieldValue::as_text),
            field_values.get(fields::PRICE).and_then(|v| match v {
                FieldValue::Price { display, .. } => Some(display.as_str()),
                _ => None,
            }),
        );

        let record = PropertyRecord {
            identity_key,
            page_id: context.page_id,
            index_in_page: card.index as u32,
            variant: card.variant,
            property_type,
            fields: field_values,
            quality_score: 0.0,
            is_valid: false,
            issues: Vec::new(),
            extracted_at: context.extracted_at,
        };

        (record, absent)
    }

    /// Run one field cascade over a card and normalize whatever text it
    /// matched, completing the extraction result with a typed value.
    /// Listing hrefs are resolved to absolute URLs before normalization;
    /// an unresolvable href leaves the value unset.
    pub fn extract_field(
        &self,
        cascade: &FieldCascade,
        card: &PropertyCard<'_>,
        context: &ParseContext,
    ) -> ExtractionResult {
        let mut result = cascade.extract(card);
        if result.confidence == Confidence::NotFound {
            return result;
        }
        let Some(raw) = result.raw_text.clone() else {
            return result;
        };
        let raw = if cascade.spec.name == fields::URL {
            match self.resolve_url(&raw) {
                Some(resolved) => resolved,
                None => return result,
            }
        } else {
            raw
        };
        result.value = normalizers::normalize(
            cascade.spec.value_type,
            &raw,
            context.extracted_at,
            &self.keywords,
        );
        result
    }

    /// Infer the property type from title text via the keyword table
    fn infer_property_type(&self, title: &str) -> Option<PropertyType> {
        normalizers::normalize_keyword(title, &self.keywords.property_type)
            .and_then(|v| v.as_text().and_then(PropertyType::from_label))
    }

    /// Resolve a possibly-relative listing href against the configured
    /// base URL. Unresolvable hrefs are dropped rather than erroring; the
    /// identity key then falls back to the content hash.
    fn resolve_url(&self, href: &str) -> Option<String> {
        if href.starts_with("http://") || href.starts_with("https://") {
            return Url::parse(href).ok().map(String::from);
        }
        match Url::parse(&self.base_url).and_then(|base| base.join(href)) {
            Ok(resolved) => Some(resolved.to_string()),
            Err(e) => {
                warn!("Failed to resolve listing URL '{}': {}", href, e);
                None
            }
        }
    }

    fn cascade_for(&self, name: &str) -> Option<&FieldCascade> {
        self.cascades.iter().find(|c| c.spec.name == name)
    }
}
