use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::LocationSample;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum VisitPhase {
    #[default]
    Idle,
    Starting,
    Active,
    Stopping,
    Completing,
}

impl VisitPhase {
    /// A remote call or platform request is in flight.
    pub fn is_transitional(&self) -> bool {
        matches!(
            self,
            VisitPhase::Starting | VisitPhase::Stopping | VisitPhase::Completing
        )
    }
}

/// Where and when a visit's stop location was recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StopReceipt {
    pub task_id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub stopped_at: DateTime<Utc>,
}

impl StopReceipt {
    pub fn new(task_id: impl Into<String>, sample: &LocationSample) -> Self {
        Self {
            task_id: task_id.into(),
            latitude: sample.latitude,
            longitude: sample.longitude,
            stopped_at: sample.timestamp,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletedVisit {
    pub task_id: String,
    pub completed_at: DateTime<Utc>,
}

/// In-memory view of the foreground lifecycle. The durable pointer, not this
/// struct, decides whether tracking is active.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitState {
    pub phase: VisitPhase,
    pub task_id: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub last_stop: Option<StopReceipt>,
}

impl VisitState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn activate(&mut self, task_id: String, started_at: DateTime<Utc>) {
        *self = Self {
            phase: VisitPhase::Active,
            task_id: Some(task_id),
            started_at: Some(started_at),
            last_stop: None,
        };
    }

    pub fn record_stop(&mut self, receipt: StopReceipt) {
        self.phase = VisitPhase::Idle;
        self.task_id = None;
        self.started_at = None;
        self.last_stop = Some(receipt);
    }

    pub fn finish(&mut self) {
        *self = Self::default();
    }

    /// Back to Idle without a visit, keeping the last stop for display.
    pub fn reset(&mut self) {
        let last_stop = self.last_stop.take();
        *self = Self {
            last_stop,
            ..Self::default()
        };
    }
}
