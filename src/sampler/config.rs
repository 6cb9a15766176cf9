use std::time::Duration;

use crate::location::Accuracy;

/// User-visible indication that tracking is running.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForegroundNotice {
    pub title: String,
    pub body: String,
}

impl Default for ForegroundNotice {
    fn default() -> Self {
        Self {
            title: "Field Visit Active".into(),
            body: "Tracking your location for task".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SamplerConfig {
    pub accuracy: Accuracy,
    /// Fire at least this often while armed.
    pub min_interval: Duration,
    /// Fire early once the position moved this far from the last firing.
    pub min_distance_m: f64,
    /// How often the provider is asked for a position.
    pub poll_interval: Duration,
    pub notice: ForegroundNotice,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            accuracy: Accuracy::Balanced,
            min_interval: Duration::from_secs(5),
            min_distance_m: 5.0,
            poll_interval: Duration::from_secs(1),
            notice: ForegroundNotice::default(),
        }
    }
}
