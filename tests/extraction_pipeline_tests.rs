//! End-to-end extraction pipeline tests over a synthetic listing page:
//! card location, cascade extraction with regex recovery, normalization,
//! validation and aggregation.

use chrono::TimeZone;
use estate_certis::domain::property::{CardVariant, PropertyType, fields};
use estate_certis::infrastructure::parsing::{
    ExtractionConfig, ExtractionError, ParseContext, RecordExtractor, RecordValidator,
};
use estate_certis::infrastructure::aggregation::SessionAggregator;
use scraper::Html;
use std::time::Duration;

const SYNTHETIC_PAGE: &str = r#"
<html><body>
  <!-- card 1: standard apartment with all fields present -->
  <div class="mb-srp__card">
    <h2 class="mb-srp__card--title"><a href="/propertydetail/3-bhk-baner-101">3 BHK Apartment in Baner</a></h2>
    <div class="mb-srp__card--locality">Baner, Pune</div>
    <div class="mb-srp__card__price--amount">₹1.2 Cr</div>
    <div data-summary="super-area"><span class="mb-srp__card__summary--value">1450 sqft</span></div>
    <div data-summary="carpet-area"><span class="mb-srp__card__summary--value">1100 sqft</span></div>
    <div data-summary="status"><span class="mb-srp__card__summary--value">Ready to Move</span></div>
    <div data-summary="furnishing"><span class="mb-srp__card__summary--value">Semi-Furnished</span></div>
    <div data-summary="bathroom"><span class="mb-srp__card__summary--value">2 Baths</span></div>
    <span class="mb-srp__card__photo__fig--count">12</span>
    <div class="mb-srp__card__ads--date">Posted: 3 days ago</div>
  </div>

  <!-- card 2: premium variant, price only in free text -->
  <div class="mb-srp__card card-premium">
    <h2 class="mb-srp__card--title"><a href="/propertydetail/2-bhk-wakad-102">2 BHK Flat in Wakad</a></h2>
    <div data-summary="super-area"><span class="mb-srp__card__summary--value">980 sqft</span></div>
    <p class="promo-blurb">Premium listing. Price: ₹45 Lac, all inclusive.</p>
  </div>

  <!-- card 3: plot, no carpet-area applicable -->
  <div class="mb-srp__card">
    <h2 class="mb-srp__card--title"><a href="/propertydetail/plot-hinjewadi-103">Residential Plot in Hinjewadi</a></h2>
    <div class="mb-srp__card__price--amount">₹80 Lac</div>
    <div data-summary="plot-area"><span class="mb-srp__card__summary--value">200 sqyrd</span></div>
  </div>
</body></html>
"#;

fn context() -> ParseContext {
    ParseContext::new(1, "https://www.magicbricks.com")
        .with_extracted_at(chrono::Utc.with_ymd_and_hms(2024, 6, 15, 10, 0, 0).unwrap())
}

fn pipeline() -> (RecordExtractor, RecordValidator) {
    let config = ExtractionConfig::default();
    (
        RecordExtractor::new(&config).expect("extractor should build"),
        RecordValidator::new(&config),
    )
}

#[test]
fn extracts_three_records_from_synthetic_page() {
    let (extractor, validator) = pipeline();
    let html = Html::parse_document(SYNTHETIC_PAGE);

    let outcome = extractor.extract_page(&html, &context()).unwrap();
    assert_eq!(outcome.cards_found, 3);
    assert_eq!(outcome.records.len(), 3);
    assert_eq!(outcome.variant_counts[&CardVariant::Standard], 2);
    assert_eq!(outcome.variant_counts[&CardVariant::Premium], 1);

    let mut records = outcome.records;
    for record in &mut records {
        validator.validate(record);
    }

    // card 1: everything structural
    let apartment = &records[0];
    assert_eq!(apartment.property_type, Some(PropertyType::Apartment));
    assert!(apartment.is_valid, "issues: {:?}", apartment.issues);
    assert_eq!(apartment.price_in_lac(), Some(120.0));
    assert_eq!(
        apartment.field(fields::BEDROOMS).and_then(|v| v.as_count()),
        Some(3)
    );
    assert_eq!(
        apartment.field(fields::PHOTO_COUNT).and_then(|v| v.as_count()),
        Some(12)
    );
    // "3 days ago" against the pinned extraction timestamp
    assert_eq!(
        apartment
            .field(fields::POSTED_DATE)
            .and_then(|v| v.as_date())
            .map(|d| d.to_string()),
        Some("2024-06-12".to_string())
    );

    // card 2: price recovered from free text despite missing structural node
    let premium = &records[1];
    assert_eq!(premium.variant, CardVariant::Premium);
    assert_eq!(premium.price_in_lac(), Some(45.0));
    assert!(premium.is_valid, "issues: {:?}", premium.issues);

    // card 3: carpet area inapplicable, absent without penalty
    let plot = &records[2];
    assert_eq!(plot.property_type, Some(PropertyType::Plot));
    assert!(plot.field(fields::CARPET_AREA).is_none());
    assert!(plot.is_valid, "issues: {:?}", plot.issues);
    assert!(
        plot.issues
            .iter()
            .all(|i| i.field_name != fields::CARPET_AREA),
        "carpet area must not count against a plot"
    );
    assert_eq!(plot.any_area(), Some(1800.0));
}

#[test]
fn empty_page_surfaces_no_cards_condition() {
    let (extractor, _) = pipeline();
    let html = Html::parse_document("<html><body><p>Checking your browser...</p></body></html>");
    match extractor.extract_page(&html, &context()) {
        Err(ExtractionError::NoCardsFound { page_id, tried_selectors }) => {
            assert_eq!(page_id, 1);
            assert!(!tried_selectors.is_empty());
        }
        other => panic!("expected NoCardsFound, got {other:?}"),
    }
}

#[test]
fn inconsistent_areas_flow_through_to_aggregator_as_invalid() {
    let (extractor, validator) = pipeline();
    let html = Html::parse_document(
        r#"<div class="mb-srp__card">
             <h2 class="mb-srp__card--title"><a href="/propertydetail/odd-1">2 BHK Flat in Aundh</a></h2>
             <div class="mb-srp__card__price--amount">₹55 Lac</div>
             <div data-summary="super-area"><span class="mb-srp__card__summary--value">1000 sqft</span></div>
             <div data-summary="carpet-area"><span class="mb-srp__card__summary--value">1200 sqft</span></div>
           </div>"#,
    );

    let mut outcome = extractor.extract_page(&html, &context()).unwrap();
    let record = &mut outcome.records[0];
    validator.validate(record);
    assert!(!record.is_valid);

    let mut aggregator = SessionAggregator::new();
    aggregator.ingest(record.clone()).unwrap();
    aggregator
        .ingest_page_stats(1, Duration::from_millis(120), 0, 0)
        .unwrap();
    let (records, summary) = aggregator.finalize().unwrap();

    // invalid records are kept in the dataset and counted
    assert_eq!(records.len(), 1);
    assert!(!records[0].is_valid);
    assert_eq!(summary.unique_records, 1);
    assert_eq!(summary.valid_records, 0);
}

#[test]
fn full_page_pipeline_accumulates_statistics() {
    let (extractor, validator) = pipeline();
    let html = Html::parse_document(SYNTHETIC_PAGE);

    let mut aggregator = SessionAggregator::new();
    let outcome = extractor.extract_page(&html, &context()).unwrap();
    for mut record in outcome.records {
        validator.validate(&mut record);
        aggregator.ingest(record).unwrap();
    }
    aggregator
        .ingest_page_stats(1, Duration::from_millis(480), 0, 1)
        .unwrap();

    let state = aggregator.state();
    assert_eq!(state.pages_processed, 1);
    assert_eq!(state.records_extracted, 3);
    assert_eq!(state.valid_records, 3);
    assert_eq!(state.retries_count, 1);
    assert_eq!(state.avg_page_time_ms(), 480.0);
}
