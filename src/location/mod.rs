use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{error::LocationError, models::LocationSample};

pub mod geo;
pub mod replay;

pub use geo::distance_m;
pub use replay::ReplayProvider;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PermissionStatus {
    Granted,
    Denied,
    #[default]
    Undetermined,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Accuracy {
    Low,
    #[default]
    Balanced,
    High,
}

/// The platform's location facility.
#[async_trait]
pub trait LocationProvider: Send + Sync {
    /// Prompts when the status is still undetermined.
    async fn request_permission(&self) -> Result<PermissionStatus, LocationError>;

    async fn permission_status(&self) -> Result<PermissionStatus, LocationError>;

    async fn current_position(&self, accuracy: Accuracy) -> Result<LocationSample, LocationError>;
}
