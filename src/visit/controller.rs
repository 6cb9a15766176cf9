use std::sync::Arc;

use chrono::Utc;
use log::{error, info, warn};
use serde::Serialize;
use tokio::sync::Mutex;

use crate::{
    api::TrackingApi,
    error::{VisitError, VisitResult},
    location::{LocationProvider, PermissionStatus},
    models::{LocationSample, StopUpdate, TrackingUpdate},
    sampler::{LocationSampler, SampleSink, SamplerConfig},
    store::ActiveTaskPointer,
    tracking::TrackingReporter,
};

use super::{CompletedVisit, StopReceipt, VisitPhase, VisitState};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitSnapshot {
    pub state: VisitState,
    /// Fresh read of the durable pointer.
    pub active_task: Option<String>,
    pub sampler_running: bool,
}

/// Drives a visit from start to stop/complete. Only this type writes the
/// active task pointer.
#[derive(Clone)]
pub struct VisitController {
    state: Arc<Mutex<VisitState>>,
    pointer: ActiveTaskPointer,
    api: Arc<dyn TrackingApi>,
    provider: Arc<dyn LocationProvider>,
    sampler: LocationSampler,
    reporter: Arc<dyn SampleSink>,
    sampler_config: SamplerConfig,
}

impl VisitController {
    pub fn new(
        pointer: ActiveTaskPointer,
        api: Arc<dyn TrackingApi>,
        provider: Arc<dyn LocationProvider>,
        sampler: LocationSampler,
        sampler_config: SamplerConfig,
    ) -> Self {
        let reporter: Arc<dyn SampleSink> =
            Arc::new(TrackingReporter::new(pointer.clone(), Arc::clone(&api)));

        Self {
            state: Arc::new(Mutex::new(VisitState::new())),
            pointer,
            api,
            provider,
            sampler,
            reporter,
            sampler_config,
        }
    }

    pub fn sampler(&self) -> &LocationSampler {
        &self.sampler
    }

    pub async fn get_state(&self) -> VisitState {
        self.state.lock().await.clone()
    }

    pub async fn snapshot(&self) -> VisitResult<VisitSnapshot> {
        Ok(VisitSnapshot {
            state: self.get_state().await,
            active_task: self.pointer.get().await?,
            sampler_running: self.sampler.is_running().await,
        })
    }

    /// Idle/Active -> Starting -> Active.
    ///
    /// Nothing is persisted until permission is granted and the first sample
    /// has reached the server. After that the pointer and the sampler are set
    /// together; if either fails both are rolled back.
    pub async fn start_visit(&self, task_id: &str) -> VisitResult<VisitState> {
        let task_id = validate_task_id(task_id)?;
        let previous = self.enter(VisitPhase::Starting).await?;
        info!("Starting visit for task {task_id}");

        let sample = match self.send_first_sample(&task_id).await {
            Ok(sample) => sample,
            Err(err) => {
                self.restore(previous).await;
                return Err(err);
            }
        };

        if let Err(err) = self.arm_tracking(&task_id).await {
            error!("Failed to arm tracking for task {task_id}: {err}");
            self.roll_back_tracking().await;
            self.state.lock().await.reset();
            return Err(err);
        }

        let mut state = self.state.lock().await;
        state.activate(task_id, sample.timestamp);
        Ok(state.clone())
    }

    /// Active -> Stopping -> Idle.
    ///
    /// Records the visit's end location and clears the pointer. The sampler is
    /// left armed; its next firing sees the empty pointer and disarms itself.
    /// Returns `None` when no visit is active.
    pub async fn stop_visit(&self) -> VisitResult<Option<StopReceipt>> {
        let previous = self.enter(VisitPhase::Stopping).await?;

        match self.record_stop().await {
            Ok(Some(receipt)) => {
                self.state.lock().await.record_stop(receipt.clone());
                Ok(Some(receipt))
            }
            Ok(None) => {
                let mut state = self.state.lock().await;
                *state = previous;
                state.reset();
                Ok(None)
            }
            Err(err) => {
                self.restore(previous).await;
                Err(err)
            }
        }
    }

    /// Active/Idle -> Completing -> Idle.
    ///
    /// The server must acknowledge first. On failure the sampler and pointer
    /// are untouched.
    pub async fn complete_visit(&self, task_id: &str) -> VisitResult<CompletedVisit> {
        let task_id = validate_task_id(task_id)?;
        let previous = self.enter(VisitPhase::Completing).await?;

        if let Err(source) = self.api.mark_complete(&task_id).await {
            self.restore(previous).await;
            return Err(VisitError::Transition {
                action: "complete task",
                source,
            });
        }

        // Some platforms reject stopping a sampler that is not armed.
        if self.sampler.is_running().await {
            if let Err(err) = self.sampler.stop().await {
                error!("Failed to stop location sampler after completing {task_id}: {err}");
            }
        }

        if let Ok(Some(active)) = self.pointer.get().await {
            if active != task_id {
                warn!("Completing {task_id} while pointer names {active}; clearing it");
            }
        }
        let cleared = self.pointer.clear().await;
        self.state.lock().await.finish();
        cleared?;

        info!("Visit for task {task_id} completed");
        Ok(CompletedVisit {
            task_id,
            completed_at: Utc::now(),
        })
    }

    /// Picks tracking back up after a process restart if the pointer still
    /// names a task. Returns that task. Without permission the pointer is
    /// kept so a later resume can still pick it up.
    pub async fn resume(&self) -> VisitResult<Option<String>> {
        let previous = self.enter(VisitPhase::Starting).await?;

        let task_id = match self.pointer.get().await {
            Ok(Some(task_id)) => task_id,
            Ok(None) => {
                self.restore(previous).await;
                return Ok(None);
            }
            Err(err) => {
                self.restore(previous).await;
                return Err(err.into());
            }
        };

        if let Err(err) = self.rearm(&task_id).await {
            warn!("Could not resume tracking for task {task_id}: {err}");
            self.restore(previous).await;
            return Err(err);
        }

        info!("Resumed tracking for task {task_id}");
        self.state.lock().await.activate(task_id.clone(), Utc::now());
        Ok(Some(task_id))
    }

    async fn enter(&self, phase: VisitPhase) -> VisitResult<VisitState> {
        let mut state = self.state.lock().await;
        if state.phase.is_transitional() {
            return Err(VisitError::Busy(state.phase));
        }
        let previous = state.clone();
        state.phase = phase;
        Ok(previous)
    }

    async fn restore(&self, previous: VisitState) {
        *self.state.lock().await = previous;
    }

    /// Prompts if the platform has not decided yet. A fresh process starts
    /// undecided even when an earlier run was granted.
    async fn request_permission(&self, task_id: &str) -> VisitResult<()> {
        let status = self.provider.request_permission().await?;
        if status != PermissionStatus::Granted {
            warn!("Location permission {status:?}; no tracking for {task_id}");
            return Err(VisitError::PermissionDenied);
        }
        Ok(())
    }

    async fn rearm(&self, task_id: &str) -> VisitResult<()> {
        self.request_permission(task_id).await?;
        self.arm_sampler().await
    }

    async fn send_first_sample(&self, task_id: &str) -> VisitResult<LocationSample> {
        self.request_permission(task_id).await?;

        let sample = self
            .provider
            .current_position(self.sampler_config.accuracy)
            .await?;
        self.api
            .submit_tracking(&TrackingUpdate::new(task_id, &sample))
            .await
            .map_err(VisitError::FirstSample)?;
        Ok(sample)
    }

    async fn arm_tracking(&self, task_id: &str) -> VisitResult<()> {
        self.pointer.set(task_id).await?;
        self.arm_sampler().await
    }

    async fn arm_sampler(&self) -> VisitResult<()> {
        self.sampler
            .arm(
                self.sampler_config.clone(),
                Arc::clone(&self.provider),
                Arc::clone(&self.reporter),
            )
            .await?;
        Ok(())
    }

    async fn roll_back_tracking(&self) {
        if let Err(err) = self.pointer.clear().await {
            error!("Compensating pointer clear failed: {err}");
        }
        if let Err(err) = self.sampler.stop().await {
            error!("Compensating sampler stop failed: {err}");
        }
    }

    async fn record_stop(&self) -> VisitResult<Option<StopReceipt>> {
        let Some(task_id) = self.pointer.get().await? else {
            info!("No active visit to stop");
            return Ok(None);
        };

        let sample = self
            .provider
            .current_position(self.sampler_config.accuracy)
            .await?;
        self.api
            .mark_stop(&task_id, &StopUpdate::from(&sample))
            .await
            .map_err(|source| VisitError::Transition {
                action: "save stop location",
                source,
            })?;
        self.pointer.clear().await?;

        info!(
            "Stop location saved for task {task_id} at {:.6},{:.6}",
            sample.latitude, sample.longitude
        );
        Ok(Some(StopReceipt::new(task_id, &sample)))
    }
}

fn validate_task_id(task_id: &str) -> VisitResult<String> {
    let trimmed = task_id.trim();
    if trimmed.is_empty() {
        return Err(VisitError::MissingTaskId);
    }
    Ok(trimmed.to_string())
}
