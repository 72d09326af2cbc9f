//! Integration tests: ActionDispatcher outcomes and the SQLite outbox sink.

mod common;

use common::{RecordingSink, SinkMode};
use lifecycle_core::{
    cohort::Cohort,
    config::{DispatchConfig, SinkKind},
    dispatch::{sink_from_config, ActionDispatcher, DispatchEnvelope},
    error::DispatchError,
    store::{CohortOutbox, OutboxSink},
};
use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

// ── Helpers ──────────────────────────────────────────────────────────────────

fn journey() -> Cohort {
    Cohort::JourneyPath {
        source:      "Google Ads".into(),
        target:      "Product View".into(),
        users:       1200,
        description: "Google Ads → Product View journey".into(),
    }
}

fn dispatcher(sink: Arc<RecordingSink>) -> ActionDispatcher {
    ActionDispatcher::new(sink, Duration::from_secs(5))
}

// ── Outcomes ─────────────────────────────────────────────────────────────────

/// A well-formed cohort reaches the sink unchanged.
#[tokio::test]
async fn accepted_cohort_reaches_sink() {
    let sink = RecordingSink::new(SinkMode::Accept);
    let cohort = journey();
    let before = cohort.clone();

    let outcome = dispatcher(sink.clone()).dispatch(&cohort).outcome().await;

    assert!(outcome.ok(), "Expected success, got {:?}", outcome.error);
    assert_eq!(outcome.cohort_type, "journey_path");
    assert_eq!(cohort, before, "Dispatch must not mutate the cohort");

    let delivered = sink.delivered();
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0].dispatch_id, outcome.dispatch_id);
    assert_eq!(delivered[0].cohort, cohort.to_json());
}

/// Every dispatch gets its own id.
#[tokio::test]
async fn dispatch_ids_are_unique() {
    let sink = RecordingSink::new(SinkMode::Accept);
    let dispatcher = dispatcher(sink);
    let a = dispatcher.dispatch(&journey()).outcome().await;
    let b = dispatcher.dispatch(&journey()).outcome().await;
    assert_ne!(a.dispatch_id, b.dispatch_id);
}

/// A sink refusal is reported as an external rejection.
#[tokio::test]
async fn rejection_is_classified() {
    let sink = RecordingSink::new(SinkMode::Reject(422));
    let outcome = dispatcher(sink).dispatch(&journey()).outcome().await;

    assert!(!outcome.ok());
    let error = outcome.error.unwrap();
    assert!(matches!(error, DispatchError::Rejected { status: 422, .. }));
    assert_eq!(error.kind(), "external_rejection");
}

#[tokio::test]
async fn unreachable_sink_is_a_network_error() {
    let sink = RecordingSink::new(SinkMode::Unreachable);
    let outcome = dispatcher(sink).dispatch(&journey()).outcome().await;
    assert_eq!(outcome.error.map(|e| e.kind()), Some("network"));
}

/// A sink that never answers is cut off by the dispatch timeout.
#[tokio::test]
async fn hung_sink_times_out_as_network_error() {
    let sink = RecordingSink::new(SinkMode::Hang);
    let dispatcher = ActionDispatcher::new(sink, Duration::from_millis(20));
    let outcome = dispatcher.dispatch(&journey()).outcome().await;
    assert!(matches!(outcome.error, Some(DispatchError::Network(_))));
}

/// Invalid cohorts are never handed to the sink.
#[tokio::test]
async fn invalid_cohort_fails_validation_before_delivery() {
    let sink = RecordingSink::new(SinkMode::Accept);
    let cohort = Cohort::JourneyPath {
        source:      "".into(),
        target:      "Purchase".into(),
        users:       3,
        description: " → Purchase journey".into(),
    };

    let outcome = dispatcher(sink.clone()).dispatch(&cohort).outcome().await;
    assert_eq!(outcome.error.as_ref().map(|e| e.kind()), Some("validation"));
    assert!(sink.delivered().is_empty());
}

/// The callback form reports the same outcome.
#[tokio::test]
async fn callback_receives_outcome() {
    let sink = RecordingSink::new(SinkMode::Accept);
    let seen: Arc<Mutex<Option<bool>>> = Arc::new(Mutex::new(None));
    let (tx, rx) = tokio::sync::oneshot::channel();

    let recorder = seen.clone();
    let id = dispatcher(sink).dispatch_with(&journey(), move |outcome| {
        *recorder.lock().unwrap() = Some(outcome.ok());
        let _ = tx.send(outcome.dispatch_id);
    });

    let reported = rx.await.unwrap();
    assert_eq!(reported, id);
    assert_eq!(*seen.lock().unwrap(), Some(true));
}

// ── Outbox ───────────────────────────────────────────────────────────────────

/// The outbox sink persists one row per delivered cohort.
#[tokio::test]
async fn outbox_sink_persists_cohorts() {
    let outbox = CohortOutbox::in_memory().unwrap();
    outbox.migrate().unwrap();
    let sink = Arc::new(OutboxSink::new(outbox));
    let dispatcher = ActionDispatcher::new(sink.clone(), Duration::from_secs(5));

    let first = dispatcher.dispatch(&journey()).outcome().await;
    let second = dispatcher
        .dispatch(&Cohort::ChartExport {
            chart_id:    "sankey".into(),
            description: "Export Customer Journey Flow data for campaign creation".into(),
        })
        .outcome()
        .await;
    assert!(first.ok() && second.ok());

    assert_eq!(sink.count().unwrap(), 2);
    let entries = sink.entries().unwrap();
    assert_eq!(entries[0].dispatch_id, first.dispatch_id);
    assert_eq!(entries[0].cohort_type, "journey_path");
    assert_eq!(entries[0].description, "Google Ads → Product View journey");
    let payload: serde_json::Value = serde_json::from_str(&entries[0].payload).unwrap();
    assert_eq!(payload, journey().to_json());
    assert_eq!(entries[1].cohort_type, "chart_export");
}

/// Re-running migrations on an existing outbox is harmless.
#[test]
fn outbox_migration_is_idempotent() {
    let outbox = CohortOutbox::in_memory().unwrap();
    outbox.migrate().unwrap();
    outbox.migrate().unwrap();
    outbox.append(&DispatchEnvelope::new(&journey())).unwrap();
    assert_eq!(outbox.count().unwrap(), 1);
    assert_eq!(outbox.by_type("journey_path").unwrap().len(), 1);
    assert!(outbox.by_type("chart_export").unwrap().is_empty());
}

/// An http sink without an endpoint is a configuration error.
#[test]
fn http_sink_requires_endpoint() {
    let config = DispatchConfig { sink: SinkKind::Http, endpoint: None, ..DispatchConfig::default() };
    assert!(sink_from_config(&config).is_err());

    let outbox = DispatchConfig::default();
    let sink = sink_from_config(&outbox).unwrap();
    assert_eq!(sink.name(), "outbox");
}
