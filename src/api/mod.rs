use async_trait::async_trait;

use crate::{
    error::ApiError,
    models::{StopUpdate, TrackingUpdate},
};

pub mod client;
pub mod response;

pub use client::ApiClient;

/// Remote collector and task-lifecycle endpoints used while tracking.
#[async_trait]
pub trait TrackingApi: Send + Sync {
    /// `POST /api/tracking`
    async fn submit_tracking(&self, update: &TrackingUpdate) -> Result<(), ApiError>;

    /// `PATCH /api/tasks/{id}/stop`
    async fn mark_stop(&self, task_id: &str, stop: &StopUpdate) -> Result<(), ApiError>;

    /// `PATCH /api/tasks/{id}/complete`
    async fn mark_complete(&self, task_id: &str) -> Result<(), ApiError>;
}
