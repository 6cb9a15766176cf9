//! Replays a recorded track as the device position.

use std::{
    path::Path,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    },
};

use anyhow::Context;
use async_trait::async_trait;
use log::{info, warn};
use serde::Deserialize;

use crate::{error::LocationError, models::LocationSample};

use super::{Accuracy, LocationProvider, PermissionStatus};

#[derive(Debug, Clone, Copy, Deserialize)]
struct TrackPoint {
    latitude: f64,
    longitude: f64,
}

pub struct ReplayProvider {
    points: Vec<(f64, f64)>,
    cursor: AtomicUsize,
    permission: Mutex<PermissionStatus>,
}

impl ReplayProvider {
    pub fn new(points: Vec<(f64, f64)>, permission: PermissionStatus) -> Self {
        Self {
            points,
            cursor: AtomicUsize::new(0),
            permission: Mutex::new(permission),
        }
    }

    /// Accepts a JSON array of `{latitude, longitude}` or one object per line.
    pub fn from_file(path: &Path, permission: PermissionStatus) -> Result<Self, LocationError> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read track {}", path.display()))
            .map_err(|err| LocationError::InvalidTrack(format!("{err:#}")))?;
        let points = parse_track(&contents)?;
        info!("Loaded {} track points from {}", points.len(), path.display());
        Ok(Self::new(points, permission))
    }

    fn status(&self) -> PermissionStatus {
        *self
            .permission
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn parse_track(contents: &str) -> Result<Vec<(f64, f64)>, LocationError> {
    let trimmed = contents.trim();
    let points: Vec<TrackPoint> = if trimmed.starts_with('[') {
        serde_json::from_str(trimmed).map_err(|err| LocationError::InvalidTrack(err.to_string()))?
    } else {
        trimmed
            .lines()
            .filter(|line| !line.trim().is_empty())
            .enumerate()
            .map(|(idx, line)| {
                serde_json::from_str(line).map_err(|err| {
                    LocationError::InvalidTrack(format!("line {}: {err}", idx + 1))
                })
            })
            .collect::<Result<_, _>>()?
    };

    Ok(points.into_iter().map(|p| (p.latitude, p.longitude)).collect())
}

#[async_trait]
impl LocationProvider for ReplayProvider {
    async fn request_permission(&self) -> Result<PermissionStatus, LocationError> {
        let mut guard = self
            .permission
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if *guard == PermissionStatus::Undetermined {
            *guard = PermissionStatus::Granted;
        }
        if *guard == PermissionStatus::Denied {
            warn!("Location permission denied");
        }
        Ok(*guard)
    }

    async fn permission_status(&self) -> Result<PermissionStatus, LocationError> {
        Ok(self.status())
    }

    async fn current_position(&self, _accuracy: Accuracy) -> Result<LocationSample, LocationError> {
        if self.status() != PermissionStatus::Granted {
            return Err(LocationError::PermissionDenied);
        }
        let last = self
            .points
            .len()
            .checked_sub(1)
            .ok_or_else(|| LocationError::Unavailable("track is empty".into()))?;

        let idx = self
            .cursor
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |i| Some((i + 1).min(last)))
            .unwrap_or(last)
            .min(last);
        let (latitude, longitude) = self.points[idx];
        Ok(LocationSample::new(latitude, longitude))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_array_and_json_lines() {
        let array = parse_track(r#"[{"latitude": 1.0, "longitude": 2.0}]"#).unwrap();
        assert_eq!(array, vec![(1.0, 2.0)]);

        let lines = parse_track(
            "{\"latitude\": 1.0, \"longitude\": 2.0}\n\n{\"latitude\": 3.0, \"longitude\": 4.0}\n",
        )
        .unwrap();
        assert_eq!(lines, vec![(1.0, 2.0), (3.0, 4.0)]);

        assert!(parse_track("{\"latitude\": 1.0}").is_err());
    }

    #[tokio::test]
    async fn advances_then_holds_last_point() {
        let provider =
            ReplayProvider::new(vec![(1.0, 1.0), (2.0, 2.0)], PermissionStatus::Granted);
        let mut seen = Vec::new();
        for _ in 0..4 {
            seen.push(provider.current_position(Accuracy::Balanced).await.unwrap().latitude);
        }
        assert_eq!(seen, vec![1.0, 2.0, 2.0, 2.0]);
    }

    #[tokio::test]
    async fn undetermined_permission_is_granted_on_request() {
        let provider = ReplayProvider::new(vec![(1.0, 1.0)], PermissionStatus::Undetermined);
        assert!(matches!(
            provider.current_position(Accuracy::High).await,
            Err(LocationError::PermissionDenied)
        ));
        assert_eq!(
            provider.request_permission().await.unwrap(),
            PermissionStatus::Granted
        );
        assert!(provider.current_position(Accuracy::High).await.is_ok());
    }

    #[tokio::test]
    async fn denied_stays_denied() {
        let provider = ReplayProvider::new(vec![(1.0, 1.0)], PermissionStatus::Denied);
        assert_eq!(
            provider.request_permission().await.unwrap(),
            PermissionStatus::Denied
        );
    }
}
