use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One position fix. Consumed immediately, never persisted locally.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationSample {
    pub latitude: f64,
    pub longitude: f64,
    pub timestamp: DateTime<Utc>,
}

impl LocationSample {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self::at(latitude, longitude, Utc::now())
    }

    pub fn at(latitude: f64, longitude: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            latitude,
            longitude,
            timestamp,
        }
    }
}

/// Body of `POST /api/tracking`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingUpdate {
    pub task_id: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl TrackingUpdate {
    pub fn new(task_id: impl Into<String>, sample: &LocationSample) -> Self {
        Self {
            task_id: task_id.into(),
            latitude: sample.latitude,
            longitude: sample.longitude,
        }
    }
}

/// Body of `PATCH /api/tasks/{id}/stop`; marks where the visit ended.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StopUpdate {
    pub latitude: f64,
    pub longitude: f64,
}

impl From<&LocationSample> for StopUpdate {
    fn from(sample: &LocationSample) -> Self {
        Self {
            latitude: sample.latitude,
            longitude: sample.longitude,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracking_update_uses_wire_field_names() {
        let sample = LocationSample::new(11.34, 77.71);
        let body = serde_json::to_value(TrackingUpdate::new("T2", &sample)).unwrap();
        assert_eq!(
            body,
            serde_json::json!({"taskId": "T2", "latitude": 11.34, "longitude": 77.71})
        );
    }
}
