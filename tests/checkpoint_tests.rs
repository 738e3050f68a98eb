//! Checkpoint durability and resumability tests: atomic replace semantics,
//! session resume, and byte-for-byte idempotent re-ingestion.

use chrono::TimeZone;
use estate_certis::infrastructure::aggregation::{
    AggregationError, Checkpoint, SessionAggregator, SessionPhase,
};
use estate_certis::infrastructure::parsing::{
    ExtractionConfig, ParseContext, RecordExtractor, RecordValidator,
};
use estate_certis::domain::property::PropertyRecord;
use scraper::Html;
use std::time::Duration;
use tempfile::TempDir;

fn sample_records() -> Vec<PropertyRecord> {
    let config = ExtractionConfig::default();
    let extractor = RecordExtractor::new(&config).unwrap();
    let validator = RecordValidator::new(&config);
    let html = Html::parse_document(
        r#"
        <div class="mb-srp__card">
          <h2 class="mb-srp__card--title"><a href="/propertydetail/a-1">3 BHK Apartment in Baner</a></h2>
          <div class="mb-srp__card__price--amount">₹1.2 Cr</div>
          <div data-summary="super-area"><span class="mb-srp__card__summary--value">1450 sqft</span></div>
        </div>
        <div class="mb-srp__card">
          <h2 class="mb-srp__card--title"><a href="/propertydetail/b-2">Residential Plot in Hinjewadi</a></h2>
          <div class="mb-srp__card__price--amount">₹80 Lac</div>
          <div data-summary="plot-area"><span class="mb-srp__card__summary--value">200 sqyrd</span></div>
        </div>"#,
    );
    let context = ParseContext::new(1, "https://www.magicbricks.com")
        .with_extracted_at(chrono::Utc.with_ymd_and_hms(2024, 6, 15, 10, 0, 0).unwrap());
    let mut records = extractor.extract_page(&html, &context).unwrap().records;
    for record in &mut records {
        validator.validate(record);
    }
    records
}

#[test]
fn checkpoint_round_trips_records_and_state() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("session.json");

    let mut aggregator = SessionAggregator::new().with_checkpoint_path(&path);
    for record in sample_records() {
        aggregator.ingest(record).unwrap();
    }
    aggregator
        .ingest_page_stats(1, Duration::from_millis(300), 0, 0)
        .unwrap();

    let written = aggregator.checkpoint().unwrap();
    assert_eq!(written, path);
    assert_eq!(aggregator.phase(), SessionPhase::Checkpointed);

    let checkpoint = Checkpoint::load(&path).unwrap();
    assert_eq!(checkpoint.records.len(), 2);
    assert_eq!(checkpoint.state.pages_processed, 1);
    assert_eq!(checkpoint.state.last_checkpoint_page, Some(1));
}

#[test]
fn crash_between_temp_write_and_rename_preserves_previous_checkpoint() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("session.json");

    let mut aggregator = SessionAggregator::new().with_checkpoint_path(&path);
    let records = sample_records();
    aggregator.ingest(records[0].clone()).unwrap();
    aggregator.checkpoint().unwrap();

    // simulate a crash that wrote the temp file but never renamed it
    let temp_path = dir.path().join("session.json.tmp");
    std::fs::write(&temp_path, "{ \"partial\": tru").unwrap();

    let checkpoint = Checkpoint::load(&path).unwrap();
    assert_eq!(checkpoint.records.len(), 1);

    // the next successful checkpoint replaces both
    aggregator.ingest(records[1].clone()).unwrap();
    aggregator.checkpoint().unwrap();
    let checkpoint = Checkpoint::load(&path).unwrap();
    assert_eq!(checkpoint.records.len(), 2);
}

#[test]
fn resume_from_checkpoint_continues_session() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("session.json");

    let records = sample_records();
    {
        let mut aggregator = SessionAggregator::new().with_checkpoint_path(&path);
        aggregator.ingest(records[0].clone()).unwrap();
        aggregator
            .ingest_page_stats(1, Duration::from_millis(250), 0, 0)
            .unwrap();
        aggregator.checkpoint().unwrap();
        // session dies here without finalize
    }

    let mut resumed = SessionAggregator::resume_from(&path).unwrap();
    assert_eq!(resumed.phase(), SessionPhase::Checkpointed);
    assert_eq!(resumed.records().len(), 1);
    assert_eq!(resumed.state().pages_processed, 1);

    resumed.ingest(records[1].clone()).unwrap();
    resumed
        .ingest_page_stats(2, Duration::from_millis(350), 1, 0)
        .unwrap();
    let (all, summary) = resumed.finalize().unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(summary.pages_processed, 2);
    assert_eq!(summary.errors_count, 1);

    // finalize wrote a final checkpoint to the same path
    let final_checkpoint = Checkpoint::load(&path).unwrap();
    assert_eq!(final_checkpoint.records.len(), 2);
}

#[test]
fn reingesting_finalized_dataset_is_byte_for_byte_idempotent() {
    let mut first = SessionAggregator::new();
    for record in sample_records() {
        first.ingest(record).unwrap();
    }
    let first_json = serde_json::to_string_pretty(first.records()).unwrap();
    let (records, _) = first.finalize().unwrap();

    let mut second = SessionAggregator::new();
    for record in records {
        second.ingest(record).unwrap();
    }
    let second_json = serde_json::to_string_pretty(second.records()).unwrap();

    assert_eq!(first_json, second_json);
}

#[test]
fn duplicate_identity_keys_keep_the_newer_record() {
    let records = sample_records();
    let mut aggregator = SessionAggregator::new();

    let mut older = records[0].clone();
    older.quality_score = 10.0;
    let mut newer = records[0].clone();
    newer.quality_score = 90.0;

    aggregator.ingest(older).unwrap();
    aggregator.ingest(newer).unwrap();
    let (all, summary) = aggregator.finalize().unwrap();

    assert_eq!(all.len(), 1);
    assert_eq!(all[0].quality_score, 90.0);
    assert_eq!(summary.records_extracted, 2);
    assert_eq!(summary.unique_records, 1);
}

#[test]
fn checkpoint_after_finalize_is_rejected() {
    let mut aggregator = SessionAggregator::new();
    aggregator.ingest(sample_records().remove(0)).unwrap();
    aggregator.finalize().unwrap();
    assert!(matches!(
        aggregator.checkpoint(),
        Err(AggregationError::SessionFinalized { .. })
    ));
}
