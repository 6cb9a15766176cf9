use thiserror::Error;

use crate::visit::VisitPhase;

/// Durable store read/write failure.
#[derive(Debug, Clone, Error)]
#[error("storage error: {message}")]
pub struct StorageError {
    pub message: String,
}

impl StorageError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<anyhow::Error> for StorageError {
    fn from(err: anyhow::Error) -> Self {
        Self::new(format!("{err:#}"))
    }
}

#[derive(Debug, Error)]
pub enum LocationError {
    #[error("location permission has not been granted")]
    PermissionDenied,

    #[error("no position available: {0}")]
    Unavailable(String),

    #[error("invalid track file: {0}")]
    InvalidTrack(String),
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Please log in again")]
    NotAuthenticated,

    #[error("invalid API URL '{0}'")]
    InvalidBaseUrl(String),

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Server returned invalid response")]
    InvalidResponse,

    #[error("{message}")]
    Rejected { status: u16, message: String },

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("unexpected response shape: {0}")]
    Decode(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum SamplerError {
    #[error("location permission has not been granted")]
    PermissionDenied,

    #[error("sampler already running")]
    AlreadyRunning,

    #[error(transparent)]
    Location(#[from] LocationError),

    #[error("sampling loop task failed to join: {0}")]
    Join(String),
}

/// Failures surfaced by the visit lifecycle. Everything here is user-visible.
#[derive(Debug, Error)]
pub enum VisitError {
    #[error("Location permission is required")]
    PermissionDenied,

    #[error("Task ID missing")]
    MissingTaskId,

    #[error("visit transition already in progress ({0:?})")]
    Busy(VisitPhase),

    #[error("Failed to start tracking: {0}")]
    FirstSample(#[source] ApiError),

    #[error("Failed to {action}: {source}")]
    Transition {
        action: &'static str,
        #[source]
        source: ApiError,
    },

    #[error(transparent)]
    Location(LocationError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Sampler(SamplerError),
}

impl From<LocationError> for VisitError {
    fn from(err: LocationError) -> Self {
        match err {
            LocationError::PermissionDenied => VisitError::PermissionDenied,
            other => VisitError::Location(other),
        }
    }
}

impl From<SamplerError> for VisitError {
    fn from(err: SamplerError) -> Self {
        match err {
            SamplerError::PermissionDenied | SamplerError::Location(LocationError::PermissionDenied) => {
                VisitError::PermissionDenied
            }
            other => VisitError::Sampler(other),
        }
    }
}

pub type VisitResult<T> = Result<T, VisitError>;
