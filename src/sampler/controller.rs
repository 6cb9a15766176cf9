use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::{error::SamplerError, location::{LocationProvider, PermissionStatus}};

use super::{loop_worker::sampling_loop, SampleSink, SamplerConfig};

const ENABLE_LOGS: bool = true;

use crate::log_info;

#[derive(Default)]
struct SamplerInner {
    handle: Option<JoinHandle<()>>,
    cancel_token: Option<CancellationToken>,
    config: Option<SamplerConfig>,
}

impl SamplerInner {
    fn is_running(&self) -> bool {
        match (&self.handle, &self.cancel_token) {
            (Some(handle), Some(token)) => !handle.is_finished() && !token.is_cancelled(),
            _ => false,
        }
    }

    /// Cancels and joins the current run, if any. Also reaps a run that
    /// disarmed itself.
    async fn shutdown(&mut self) -> Result<bool, SamplerError> {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }
        let had_run = self.config.take().is_some();

        match self.handle.take() {
            Some(handle) => handle
                .await
                .map(|_| had_run)
                .map_err(|err| SamplerError::Join(err.to_string())),
            None => Ok(had_run),
        }
    }
}

/// Background location sampling, independent of whoever armed it.
#[derive(Clone, Default)]
pub struct LocationSampler {
    inner: Arc<Mutex<SamplerInner>>,
}

impl LocationSampler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails with `AlreadyRunning` when armed.
    pub async fn start(
        &self,
        config: SamplerConfig,
        provider: Arc<dyn LocationProvider>,
        sink: Arc<dyn SampleSink>,
    ) -> Result<(), SamplerError> {
        ensure_permission(provider.as_ref()).await?;

        let mut inner = self.inner.lock().await;
        if inner.is_running() {
            return Err(SamplerError::AlreadyRunning);
        }
        inner.shutdown().await?;
        launch(&mut inner, config, provider, sink);
        Ok(())
    }

    /// Replaces any current run with a fresh one using `config`.
    pub async fn arm(
        &self,
        config: SamplerConfig,
        provider: Arc<dyn LocationProvider>,
        sink: Arc<dyn SampleSink>,
    ) -> Result<(), SamplerError> {
        ensure_permission(provider.as_ref()).await?;

        let mut inner = self.inner.lock().await;
        if inner.shutdown().await? {
            log_info!("re-arming location sampler");
        }
        launch(&mut inner, config, provider, sink);
        Ok(())
    }

    /// Safe to call when not started. Returns once the loop has exited.
    pub async fn stop(&self) -> Result<(), SamplerError> {
        let mut inner = self.inner.lock().await;
        let notice = inner.config.as_ref().map(|config| config.notice.title.clone());
        inner.shutdown().await?;
        if let Some(title) = notice {
            log_info!("location sampler disarmed; indicator '{title}' removed");
        }
        Ok(())
    }

    pub async fn is_running(&self) -> bool {
        self.inner.lock().await.is_running()
    }

    pub async fn config(&self) -> Option<SamplerConfig> {
        self.inner.lock().await.config.clone()
    }

    /// Resolves once the current run ends, whether stopped or self-disarmed.
    pub async fn disarmed(&self) {
        let token = self.inner.lock().await.cancel_token.clone();
        if let Some(token) = token {
            token.cancelled().await;
        }
    }
}

async fn ensure_permission(provider: &dyn LocationProvider) -> Result<(), SamplerError> {
    match provider.permission_status().await? {
        PermissionStatus::Granted => Ok(()),
        _ => Err(SamplerError::PermissionDenied),
    }
}

fn launch(
    inner: &mut SamplerInner,
    config: SamplerConfig,
    provider: Arc<dyn LocationProvider>,
    sink: Arc<dyn SampleSink>,
) {
    log_info!(
        "location sampler armed every {:?} / {}m; indicator '{}: {}'",
        config.min_interval,
        config.min_distance_m,
        config.notice.title,
        config.notice.body
    );

    let cancel_token = CancellationToken::new();
    let handle = tokio::spawn(sampling_loop(
        config.clone(),
        provider,
        sink,
        cancel_token.clone(),
    ));

    inner.handle = Some(handle);
    inner.cancel_token = Some(cancel_token);
    inner.config = Some(config);
}
