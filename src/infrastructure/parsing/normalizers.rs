//! Field normalizers - raw text fragments to typed values
//!
//! Every normalizer is a pure function returning `Option<FieldValue>`.
//! Absence is the only failure mode: input that does not parse yields
//! `None`, never an error.

use crate::domain::property::{AreaUnit, FieldValue, PriceUnit};
use crate::infrastructure::parsing::config::{KeywordRule, KeywordTables, ValueType};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref PRICE_RE: Regex =
        Regex::new(r"(?i)₹?\s*([\d,]+(?:\.\d+)?)\s*(Lacs?|Lakhs?|Crores?|Cr)\b").unwrap();
    static ref AREA_RE: Regex = Regex::new(
        r"(?i)([\d,]+(?:\.\d+)?)\s*(sq\.?\s*ft|sqft|sq\.?\s*feet|sq\.?\s*yards?|sq\.?\s*yd|sqyrd|acres?)"
    )
    .unwrap();
    static ref RELATIVE_DATE_RE: Regex =
        Regex::new(r"(?i)(\d+)\s*(day|week|month)s?\s*ago").unwrap();
    static ref LEADING_COUNT_RE: Regex = Regex::new(r"^\s*(\d+)").unwrap();
}

/// Dispatch a raw text fragment to the normalizer for its declared type
pub fn normalize(
    value_type: ValueType,
    raw: &str,
    reference: DateTime<Utc>,
    keywords: &KeywordTables,
) -> Option<FieldValue> {
    match value_type {
        ValueType::Text => normalize_text(raw),
        ValueType::Count => normalize_count(raw),
        ValueType::Price => normalize_price(raw),
        ValueType::Area => normalize_area(raw),
        ValueType::Date => normalize_date(raw, reference),
        ValueType::Status => normalize_keyword(raw, &keywords.status),
        ValueType::Furnishing => normalize_keyword(raw, &keywords.furnishing),
        ValueType::PropertyType => normalize_keyword(raw, &keywords.property_type),
    }
}

/// Trimmed, whitespace-collapsed text; empty input is absent
pub fn normalize_text(text: &str) -> Option<FieldValue> {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        None
    } else {
        Some(FieldValue::Text { value: collapsed })
    }
}

/// Parse a price like "₹1.2 Cr" or "45 Lac" and normalize to Lac.
/// Crore is 100x Lac; the original display string is kept alongside.
pub fn normalize_price(text: &str) -> Option<FieldValue> {
    let captures = PRICE_RE.captures(text)?;
    let amount: f64 = captures.get(1)?.as_str().replace(',', "").parse().ok()?;
    if amount <= 0.0 {
        return None;
    }
    let unit_token = captures.get(2)?.as_str().to_lowercase();
    let unit = if unit_token.starts_with("cr") {
        PriceUnit::Crore
    } else {
        PriceUnit::Lac
    };
    Some(FieldValue::Price {
        display: captures.get(0)?.as_str().trim().to_string(),
        amount,
        unit,
        in_lac: amount * unit.lac_multiplier(),
    })
}

/// Parse an area like "1200 sqft" / "150 sq. yards" / "2 acres" and
/// normalize to square feet. Zero or negative magnitudes are rejected.
pub fn normalize_area(text: &str) -> Option<FieldValue> {
    let captures = AREA_RE.captures(text)?;
    let value: f64 = captures.get(1)?.as_str().replace(',', "").parse().ok()?;
    if value <= 0.0 {
        return None;
    }
    let unit_token = captures.get(2)?.as_str().to_lowercase();
    let unit = if unit_token.contains("acre") {
        AreaUnit::Acres
    } else if unit_token.contains("yard") || unit_token.contains("yd") || unit_token.contains("yrd")
    {
        AreaUnit::SquareYards
    } else {
        AreaUnit::SquareFeet
    };
    Some(FieldValue::Area {
        display: captures.get(0)?.as_str().trim().to_string(),
        value,
        unit,
        in_sqft: value * unit.sqft_factor(),
    })
}

const ABSOLUTE_DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y", "%b %d, %Y", "%d %b %Y"];

/// Resolve a posted-date fragment: relative forms ("today", "3 days ago")
/// against the extraction timestamp, then a small set of absolute formats.
pub fn normalize_date(text: &str, reference: DateTime<Utc>) -> Option<FieldValue> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    let lowered = trimmed.to_lowercase();
    let today = reference.date_naive();

    if lowered.contains("today") || lowered.contains("just now") {
        return Some(FieldValue::Date { value: today });
    }
    if lowered.contains("yesterday") {
        return Some(FieldValue::Date {
            value: today - Duration::days(1),
        });
    }
    if let Some(captures) = RELATIVE_DATE_RE.captures(&lowered) {
        let n: i64 = captures.get(1)?.as_str().parse().ok()?;
        let days = match captures.get(2)?.as_str() {
            "day" => n,
            "week" => n * 7,
            // calendar-exact months are not worth the precision here
            "month" => n * 30,
            _ => return None,
        };
        return Some(FieldValue::Date {
            value: today - Duration::days(days),
        });
    }

    for format in ABSOLUTE_DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, format) {
            return Some(FieldValue::Date { value: date });
        }
    }
    None
}

/// Map raw text onto a canonical enumeration label via case-insensitive
/// substring matching. Table order is priority order; first hit wins.
pub fn normalize_keyword(text: &str, table: &[KeywordRule]) -> Option<FieldValue> {
    let lowered = text.to_lowercase();
    table
        .iter()
        .find(|rule| lowered.contains(&rule.keyword.to_lowercase()))
        .map(|rule| FieldValue::Text {
            value: rule.label.clone(),
        })
}

/// Parse the leading integer from text ("3 BHK" -> 3); non-numeric is absent
pub fn normalize_count(text: &str) -> Option<FieldValue> {
    let captures = LEADING_COUNT_RE.captures(text)?;
    let value: u32 = captures.get(1)?.as_str().parse().ok()?;
    Some(FieldValue::Count { value })
}
