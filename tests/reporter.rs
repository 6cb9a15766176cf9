//! One firing in, at most one tracking submission out.

mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;

use common::{FakeApi, FlakyStore};
use fieldtrack_lib::models::LocationSample;
use fieldtrack_lib::sampler::{FiringOutcome, SampleSink};
use fieldtrack_lib::store::ActiveTaskPointer;
use fieldtrack_lib::tracking::TrackingReporter;

fn reporter() -> (Arc<FlakyStore>, ActiveTaskPointer, Arc<FakeApi>, TrackingReporter) {
    let store = Arc::new(FlakyStore::default());
    let pointer = ActiveTaskPointer::new(store.clone());
    let api = Arc::new(FakeApi::default());
    let reporter = TrackingReporter::new(pointer.clone(), api.clone());
    (store, pointer, api, reporter)
}

#[tokio::test]
async fn empty_pointer_disarms_without_submitting() {
    let (_, _, api, reporter) = reporter();

    let outcome = reporter.on_sample(LocationSample::new(11.0, 77.0)).await;

    assert_eq!(outcome, FiringOutcome::Disarm);
    assert_eq!(api.tracking_attempts.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn present_pointer_submits_sample_for_that_task() {
    let (_, pointer, api, reporter) = reporter();
    pointer.set("T2").await.unwrap();

    let outcome = reporter.on_sample(LocationSample::new(11.341, 77.717)).await;

    assert_eq!(outcome, FiringOutcome::Submitted);
    let sent = api.tracked();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].task_id, "T2");
    assert_eq!((sent[0].latitude, sent[0].longitude), (11.341, 77.717));
}

#[tokio::test]
async fn three_firings_are_three_independent_attempts() {
    let (_, pointer, api, reporter) = reporter();
    pointer.set("T2").await.unwrap();
    api.script_tracking(&[false, true, false]);

    let mut outcomes = Vec::new();
    for step in 0..3 {
        let sample = LocationSample::new(11.0 + step as f64 * 0.001, 77.0);
        outcomes.push(reporter.on_sample(sample).await);
    }

    assert_eq!(
        outcomes,
        vec![
            FiringOutcome::Submitted,
            FiringOutcome::Dropped,
            FiringOutcome::Submitted
        ]
    );
    assert_eq!(api.tracking_attempts.load(Ordering::SeqCst), 3);
    assert!(api.tracked().iter().all(|u| u.task_id == "T2"));
}

#[tokio::test]
async fn pointer_read_failure_drops_but_keeps_sampling() {
    let (store, pointer, api, reporter) = reporter();
    pointer.set("T2").await.unwrap();
    store.fail_reads.store(true, Ordering::SeqCst);

    let outcome = reporter.on_sample(LocationSample::new(11.0, 77.0)).await;

    assert_eq!(outcome, FiringOutcome::Dropped);
    assert_eq!(api.tracking_attempts.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn firing_after_completion_self_heals() {
    let (_, pointer, api, reporter) = reporter();
    pointer.set("T3").await.unwrap();
    // Completion cleared the pointer, but a late firing still arrives.
    pointer.clear().await.unwrap();

    assert_eq!(
        reporter.on_sample(LocationSample::new(11.0, 77.0)).await,
        FiringOutcome::Disarm
    );
    assert!(api.tracked().is_empty());
}
