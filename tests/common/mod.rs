//! Fakes shared by the integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use fieldtrack_lib::api::TrackingApi;
use fieldtrack_lib::error::{ApiError, LocationError, StorageError};
use fieldtrack_lib::location::{Accuracy, LocationProvider, PermissionStatus};
use fieldtrack_lib::models::{LocationSample, StopUpdate, TrackingUpdate};
use fieldtrack_lib::sampler::{LocationSampler, SamplerConfig};
use fieldtrack_lib::store::{ActiveTaskPointer, KeyValueStore, MemoryStore};
use fieldtrack_lib::visit::VisitController;

fn rejected() -> ApiError {
    ApiError::Rejected {
        status: 500,
        message: "Internal Server Error".into(),
    }
}

#[derive(Default)]
pub struct FakeApi {
    pub tracking: Mutex<Vec<TrackingUpdate>>,
    pub tracking_attempts: AtomicUsize,
    /// Consumed per tracking call; `true` fails that call.
    tracking_script: Mutex<VecDeque<bool>>,
    pub fail_tracking: AtomicBool,
    pub stops: Mutex<Vec<(String, StopUpdate)>>,
    pub fail_stop: AtomicBool,
    pub completes: Mutex<Vec<String>>,
    pub fail_complete: AtomicBool,
    pub complete_delay_ms: AtomicU64,
}

impl FakeApi {
    pub fn script_tracking(&self, failures: &[bool]) {
        self.tracking_script
            .lock()
            .unwrap()
            .extend(failures.iter().copied());
    }

    pub fn tracked(&self) -> Vec<TrackingUpdate> {
        self.tracking.lock().unwrap().clone()
    }

    pub fn stop_count(&self) -> usize {
        self.stops.lock().unwrap().len()
    }

    pub fn completed(&self) -> Vec<String> {
        self.completes.lock().unwrap().clone()
    }
}

#[async_trait]
impl TrackingApi for FakeApi {
    async fn submit_tracking(&self, update: &TrackingUpdate) -> Result<(), ApiError> {
        self.tracking_attempts.fetch_add(1, Ordering::SeqCst);
        let scripted = self.tracking_script.lock().unwrap().pop_front();
        if scripted.unwrap_or(false) || self.fail_tracking.load(Ordering::SeqCst) {
            return Err(rejected());
        }
        self.tracking.lock().unwrap().push(update.clone());
        Ok(())
    }

    async fn mark_stop(&self, task_id: &str, stop: &StopUpdate) -> Result<(), ApiError> {
        if self.fail_stop.load(Ordering::SeqCst) {
            return Err(rejected());
        }
        self.stops.lock().unwrap().push((task_id.to_string(), *stop));
        Ok(())
    }

    async fn mark_complete(&self, task_id: &str) -> Result<(), ApiError> {
        let delay = self.complete_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        if self.fail_complete.load(Ordering::SeqCst) {
            return Err(rejected());
        }
        self.completes.lock().unwrap().push(task_id.to_string());
        Ok(())
    }
}

pub struct FakeProvider {
    permission: Mutex<PermissionStatus>,
    background_denied: AtomicBool,
    position: Mutex<(f64, f64)>,
    pub position_calls: AtomicUsize,
}

impl FakeProvider {
    pub fn granted() -> Self {
        Self::with_permission(PermissionStatus::Granted)
    }

    pub fn with_permission(permission: PermissionStatus) -> Self {
        Self {
            permission: Mutex::new(permission),
            background_denied: AtomicBool::new(false),
            position: Mutex::new((11.3410, 77.7172)),
            position_calls: AtomicUsize::new(0),
        }
    }

    pub fn set_permission(&self, permission: PermissionStatus) {
        *self.permission.lock().unwrap() = permission;
    }

    /// Prompts still succeed, but the sampler's status check sees a denial.
    pub fn deny_background(&self) {
        self.background_denied.store(true, Ordering::SeqCst);
    }

    pub fn move_to(&self, latitude: f64, longitude: f64) {
        *self.position.lock().unwrap() = (latitude, longitude);
    }
}

#[async_trait]
impl LocationProvider for FakeProvider {
    /// An undecided prompt is accepted.
    async fn request_permission(&self) -> Result<PermissionStatus, LocationError> {
        let mut permission = self.permission.lock().unwrap();
        if *permission == PermissionStatus::Undetermined {
            *permission = PermissionStatus::Granted;
        }
        Ok(*permission)
    }

    async fn permission_status(&self) -> Result<PermissionStatus, LocationError> {
        if self.background_denied.load(Ordering::SeqCst) {
            return Ok(PermissionStatus::Denied);
        }
        Ok(*self.permission.lock().unwrap())
    }

    async fn current_position(&self, _accuracy: Accuracy) -> Result<LocationSample, LocationError> {
        self.position_calls.fetch_add(1, Ordering::SeqCst);
        let (latitude, longitude) = *self.position.lock().unwrap();
        Ok(LocationSample::new(latitude, longitude))
    }
}

/// Memory store whose reads or writes can be made to fail.
#[derive(Default)]
pub struct FlakyStore {
    inner: MemoryStore,
    pub fail_reads: AtomicBool,
    pub fail_writes: AtomicBool,
}

#[async_trait]
impl KeyValueStore for FlakyStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StorageError::new("disk I/O error"));
        }
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::new("database is locked"));
        }
        self.inner.set(key, value).await
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::new("database is locked"));
        }
        self.inner.remove(key).await
    }
}

/// Sampler settings that never fire on their own.
pub fn quiet_config() -> SamplerConfig {
    SamplerConfig {
        min_interval: Duration::from_secs(3600),
        min_distance_m: 0.0,
        poll_interval: Duration::from_secs(3600),
        ..SamplerConfig::default()
    }
}

/// Sampler settings that fire every few milliseconds.
pub fn fast_config() -> SamplerConfig {
    SamplerConfig {
        min_interval: Duration::from_millis(20),
        min_distance_m: 0.0,
        poll_interval: Duration::from_millis(5),
        ..SamplerConfig::default()
    }
}

pub struct Harness {
    pub store: Arc<FlakyStore>,
    pub pointer: ActiveTaskPointer,
    pub api: Arc<FakeApi>,
    pub provider: Arc<FakeProvider>,
    pub sampler: LocationSampler,
    pub controller: VisitController,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(quiet_config())
    }

    pub fn with_config(config: SamplerConfig) -> Self {
        Self::build(
            Arc::new(FlakyStore::default()),
            Arc::new(FakeProvider::granted()),
            config,
        )
    }

    pub fn build(store: Arc<FlakyStore>, provider: Arc<FakeProvider>, config: SamplerConfig) -> Self {
        let pointer = ActiveTaskPointer::new(store.clone());
        let api = Arc::new(FakeApi::default());
        let sampler = LocationSampler::new();
        let controller = VisitController::new(
            pointer.clone(),
            api.clone(),
            provider.clone(),
            sampler.clone(),
            config,
        );

        Self {
            store,
            pointer,
            api,
            provider,
            sampler,
            controller,
        }
    }
}

/// Polls `check` until it holds or two seconds pass.
pub async fn eventually<F, Fut>(mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while tokio::time::Instant::now() < deadline {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    false
}
