//! Record validation and quality scoring
//!
//! Checks required-field presence, cross-field plausibility and identity
//! derivability, then stamps each record with a completeness score and a
//! validity flag. Records are never discarded here: invalid ones are
//! flagged and kept, and downstream consumers decide what to export.

use crate::domain::property::{
    FieldValue, IssueSeverity, IssueType, PropertyRecord, QualityIssue, fields,
};
use crate::infrastructure::parsing::config::ExtractionConfig;
use tracing::debug;

/// Minimal applicability view of one field spec
#[derive(Debug, Clone)]
struct FieldRule {
    name: String,
    required: bool,
    inapplicable_for: Vec<crate::domain::property::PropertyType>,
}

/// Validates records against the configured field set
pub struct RecordValidator {
    rules: Vec<FieldRule>,
}

impl RecordValidator {
    pub fn new(config: &ExtractionConfig) -> Self {
        Self {
            rules: config
                .field_specs
                .iter()
                .map(|spec| FieldRule {
                    name: spec.name.clone(),
                    required: spec.required,
                    inapplicable_for: spec.inapplicable_for.clone(),
                })
                .collect(),
        }
    }

    /// Score and flag one record in place.
    ///
    /// Quality score = extracted applicable fields / applicable fields x 100.
    /// Validity = all required fields present and no hard plausibility
    /// violation. Inapplicable fields (e.g. carpet area on a plot) count
    /// neither for nor against the score.
    pub fn validate(&self, record: &mut PropertyRecord) {
        let mut issues = Vec::new();

        let applicable: Vec<&FieldRule> = self
            .rules
            .iter()
            .filter(|rule| match record.property_type {
                Some(pt) => !rule.inapplicable_for.contains(&pt),
                None => true,
            })
            .collect();

        let extracted = applicable
            .iter()
            .filter(|rule| record.fields.contains_key(&rule.name))
            .count();

        // (a) required-field presence
        let mut required_missing = false;
        for rule in &applicable {
            if rule.required && !record.fields.contains_key(&rule.name) {
                required_missing = true;
                issues.push(QualityIssue {
                    severity: IssueSeverity::Critical,
                    field_name: rule.name.clone(),
                    issue_type: IssueType::MissingRequired,
                    detail: format!("required field '{}' not extracted", rule.name),
                });
            }
        }
        // at least one area-like field is required even though neither
        // area field is individually required
        if record.any_area().is_none() {
            required_missing = true;
            issues.push(QualityIssue {
                severity: IssueSeverity::Critical,
                field_name: fields::SUPER_AREA.to_string(),
                issue_type: IssueType::MissingRequired,
                detail: "no area-like field extracted".to_string(),
            });
        }

        // (b) cross-field plausibility
        let mut hard_violation = false;
        if let Some(price) = record.price_in_lac() {
            if price <= 0.0 {
                hard_violation = true;
                issues.push(QualityIssue {
                    severity: IssueSeverity::Critical,
                    field_name: fields::PRICE.to_string(),
                    issue_type: IssueType::ImplausibleValue,
                    detail: format!("normalized price {price} Lac is not positive"),
                });
            }
        }
        let carpet = record
            .field(fields::CARPET_AREA)
            .and_then(FieldValue::area_in_sqft);
        let super_area = record
            .field(fields::SUPER_AREA)
            .and_then(FieldValue::area_in_sqft);
        if let (Some(carpet), Some(super_area)) = (carpet, super_area) {
            if carpet > super_area {
                hard_violation = true;
                issues.push(QualityIssue {
                    severity: IssueSeverity::Warning,
                    field_name: fields::CARPET_AREA.to_string(),
                    issue_type: IssueType::CrossFieldInconsistency,
                    detail: format!(
                        "carpet area {carpet} sqft exceeds super area {super_area} sqft"
                    ),
                });
            }
        }

        // (c) identity derivability
        if record.text_field(fields::URL).is_none() && record.text_field(fields::TITLE).is_none() {
            hard_violation = true;
            issues.push(QualityIssue {
                severity: IssueSeverity::Critical,
                field_name: fields::URL.to_string(),
                issue_type: IssueType::IdentityUnderivable,
                detail: "neither URL nor title available for a stable identity key".to_string(),
            });
        }

        record.quality_score = if applicable.is_empty() {
            0.0
        } else {
            (extracted as f64 / applicable.len() as f64) * 100.0
        };
        record.is_valid = !required_missing && !hard_violation;
        record.issues = issues;

        debug!(
            "Validated record {} on page {}: score {:.1}, valid {}",
            record.identity_key, record.page_id, record.quality_score, record.is_valid
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::property::{AreaUnit, CardVariant, PriceUnit, PropertyType};
    use chrono::Utc;
    use std::collections::BTreeMap;

    fn base_record(property_type: Option<PropertyType>) -> PropertyRecord {
        PropertyRecord {
            identity_key: "https://portal.example/p/1".into(),
            page_id: 1,
            index_in_page: 0,
            variant: CardVariant::Standard,
            property_type,
            fields: BTreeMap::new(),
            quality_score: 0.0,
            is_valid: false,
            issues: Vec::new(),
            extracted_at: Utc::now(),
        }
    }

    fn text(value: &str) -> FieldValue {
        FieldValue::Text {
            value: value.to_string(),
        }
    }

    fn price(lac: f64) -> FieldValue {
        FieldValue::Price {
            display: format!("₹{lac} Lac"),
            amount: lac,
            unit: PriceUnit::Lac,
            in_lac: lac,
        }
    }

    fn area(sqft: f64) -> FieldValue {
        FieldValue::Area {
            display: format!("{sqft} sqft"),
            value: sqft,
            unit: AreaUnit::SquareFeet,
            in_sqft: sqft,
        }
    }

    fn validator() -> RecordValidator {
        RecordValidator::new(&ExtractionConfig::default())
    }

    fn complete_record() -> PropertyRecord {
        let mut record = base_record(Some(PropertyType::Apartment));
        record.fields.insert(fields::TITLE.into(), text("3 BHK in Baner"));
        record.fields.insert(fields::URL.into(), text("https://portal.example/p/1"));
        record.fields.insert(fields::PRICE.into(), price(120.0));
        record.fields.insert(fields::SUPER_AREA.into(), area(1450.0));
        record.fields.insert(fields::CARPET_AREA.into(), area(1100.0));
        record.fields.insert(fields::PROPERTY_TYPE.into(), text("Apartment"));
        record
    }

    #[test]
    fn test_complete_record_is_valid() {
        let mut record = complete_record();
        validator().validate(&mut record);
        assert!(record.is_valid);
        assert!(record.quality_score > 0.0 && record.quality_score <= 100.0);
        assert!(record.issues.is_empty());
    }

    #[test]
    fn test_missing_price_invalidates_but_keeps_record() {
        let mut record = complete_record();
        record.fields.remove(fields::PRICE);
        validator().validate(&mut record);
        assert!(!record.is_valid);
        assert!(record
            .issues
            .iter()
            .any(|i| i.field_name == fields::PRICE && i.issue_type == IssueType::MissingRequired));
    }

    #[test]
    fn test_carpet_exceeding_super_is_flagged_inconsistent() {
        let mut record = complete_record();
        record.fields.insert(fields::CARPET_AREA.into(), area(1200.0));
        record.fields.insert(fields::SUPER_AREA.into(), area(1000.0));
        validator().validate(&mut record);
        assert!(!record.is_valid);
        assert!(record
            .issues
            .iter()
            .any(|i| i.issue_type == IssueType::CrossFieldInconsistency));
        // still fully populated; nothing was discarded
        assert!(record.fields.contains_key(fields::CARPET_AREA));
    }

    #[test]
    fn test_plot_score_ignores_inapplicable_fields() {
        let mut record = base_record(Some(PropertyType::Plot));
        record.fields.insert(fields::TITLE.into(), text("Plot in Hinjewadi"));
        record.fields.insert(fields::URL.into(), text("https://portal.example/p/2"));
        record.fields.insert(fields::PRICE.into(), price(80.0));
        record.fields.insert(fields::SUPER_AREA.into(), area(1800.0));
        record.fields.insert(fields::PROPERTY_TYPE.into(), text("Plot"));
        let mut apartment = record.clone();
        apartment.property_type = Some(PropertyType::Apartment);

        let validator = validator();
        validator.validate(&mut record);
        validator.validate(&mut apartment);

        // same extracted fields, smaller applicable set for the plot
        assert!(record.quality_score > apartment.quality_score);
        assert!(record.is_valid);
    }

    #[test]
    fn test_identity_underivable_is_critical() {
        let mut record = base_record(None);
        record.fields.insert(fields::PRICE.into(), price(50.0));
        validator().validate(&mut record);
        assert!(!record.is_valid);
        assert!(record
            .issues
            .iter()
            .any(|i| i.issue_type == IssueType::IdentityUnderivable));
    }
}
