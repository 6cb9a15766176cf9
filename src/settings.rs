use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{
    location::{Accuracy, PermissionStatus},
    sampler::{ForegroundNotice, SamplerConfig},
};

pub const API_URL_ENV: &str = "FIELDTRACK_API_URL";
pub const DEBUG_ENV: &str = "FIELDTRACK_DEBUG";

const DEBUG_POLL_MS: u64 = 250;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct TrackingSettings {
    pub accuracy: Accuracy,
    pub interval_ms: u64,
    pub distance_m: f64,
    pub poll_ms: u64,
    pub notification_title: String,
    pub notification_body: String,
}

impl Default for TrackingSettings {
    fn default() -> Self {
        let notice = ForegroundNotice::default();
        Self {
            accuracy: Accuracy::Balanced,
            interval_ms: 5_000,
            distance_m: 5.0,
            poll_ms: 1_000,
            notification_title: notice.title,
            notification_body: notice.body,
        }
    }
}

impl TrackingSettings {
    pub fn sampler_config(&self) -> SamplerConfig {
        SamplerConfig {
            accuracy: self.accuracy,
            min_interval: Duration::from_millis(self.interval_ms.max(1)),
            min_distance_m: self.distance_m.max(0.0),
            poll_interval: Duration::from_millis(self.poll_ms.max(1)),
            notice: ForegroundNotice {
                title: self.notification_title.clone(),
                body: self.notification_body.clone(),
            },
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct LocationSettings {
    pub permission: PermissionStatus,
    pub track_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct AgentSettings {
    pub api_url: String,
    pub tracking: TrackingSettings,
    pub location: LocationSettings,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:5000".into(),
            tracking: TrackingSettings::default(),
            location: LocationSettings::default(),
        }
    }
}

impl AgentSettings {
    /// Applies `FIELDTRACK_API_URL` and `FIELDTRACK_DEBUG`.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(
            std::env::var(API_URL_ENV).ok(),
            std::env::var(DEBUG_ENV).ok(),
        )
    }

    fn with_overrides(mut self, api_url: Option<String>, debug: Option<String>) -> Self {
        if let Some(url) = api_url.filter(|url| !url.trim().is_empty()) {
            self.api_url = url.trim().to_string();
        }

        let debug_mode = debug
            .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
            .unwrap_or(false);
        if debug_mode {
            self.tracking.poll_ms = self.tracking.poll_ms.min(DEBUG_POLL_MS);
        }
        self
    }

    /// Reads `path`. A missing file gives the defaults; an unreadable one is
    /// reported and also gives the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings from {}", path.display()))?;
        Ok(serde_json::from_str(&contents).unwrap_or_else(|err| {
            warn!("Ignoring unreadable settings {}: {err}", path.display());
            Self::default()
        }))
    }
}
