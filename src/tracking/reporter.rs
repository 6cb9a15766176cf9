use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    api::TrackingApi,
    models::{LocationSample, TrackingUpdate},
    sampler::{FiringOutcome, SampleSink},
    store::ActiveTaskPointer,
};

const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

/// Turns one sampler firing into at most one tracking submission.
///
/// The pointer is read on every firing. An empty pointer means nothing should
/// be tracking, so the reporter asks the sampler to disarm; this is what stops
/// sampling left running by a crashed or half-finished foreground flow.
/// Submission failures are logged and dropped, never retried.
pub struct TrackingReporter {
    pointer: ActiveTaskPointer,
    api: Arc<dyn TrackingApi>,
}

impl TrackingReporter {
    pub fn new(pointer: ActiveTaskPointer, api: Arc<dyn TrackingApi>) -> Self {
        Self { pointer, api }
    }
}

#[async_trait]
impl SampleSink for TrackingReporter {
    async fn on_sample(&self, sample: LocationSample) -> FiringOutcome {
        let task_id = match self.pointer.get().await {
            Ok(Some(task_id)) => task_id,
            Ok(None) => {
                log_info!("no active task; disarming location sampler");
                return FiringOutcome::Disarm;
            }
            Err(err) => {
                log_warn!("could not read active task, dropping sample: {err}");
                return FiringOutcome::Dropped;
            }
        };

        let update = TrackingUpdate::new(task_id, &sample);
        match self.api.submit_tracking(&update).await {
            Ok(()) => FiringOutcome::Submitted,
            Err(err) => {
                log_warn!("send location failed for task {}: {err}", update.task_id);
                FiringOutcome::Dropped
            }
        }
    }
}
