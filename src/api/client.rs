use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use log::debug;
use reqwest::{
    header::{AUTHORIZATION, CONTENT_TYPE},
    Method, Url,
};
use serde_json::Value;

use crate::{
    error::ApiError,
    models::{StopUpdate, TrackingUpdate, VisitTask},
    store::{KeyValueStore, TOKEN_KEY},
};

use super::{response::interpret_response, TrackingApi};

const CONNECT_TIMEOUT_SECS: u64 = 10;

/// JSON client for the field-sales backend. The bearer token is read from the
/// store on every request.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    store: Arc<dyn KeyValueStore>,
}

impl ApiClient {
    pub fn new(base_url: &str, store: Arc<dyn KeyValueStore>) -> Result<Self, ApiError> {
        let base_url =
            Url::parse(base_url).map_err(|_| ApiError::InvalidBaseUrl(base_url.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::InvalidBaseUrl(base_url.to_string()));
        }

        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            http,
            base_url,
            store,
        })
    }

    pub fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidBaseUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    pub async fn request(
        &self,
        method: Method,
        segments: &[&str],
        body: Option<Value>,
    ) -> Result<Value, ApiError> {
        let Some(token) = self.store.get(TOKEN_KEY).await? else {
            return Err(ApiError::NotAuthenticated);
        };

        let url = self.endpoint(segments)?;
        debug!("{method} {url}");

        let mut builder = self
            .http
            .request(method, url)
            .header(CONTENT_TYPE, "application/json")
            .header(AUTHORIZATION, format!("Bearer {token}"));
        if let Some(body) = body {
            builder = builder.json(&body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let text = response.text().await?;
        interpret_response(status, &text)
    }

    /// `GET /api/tasks`
    pub async fn list_tasks(&self) -> Result<Vec<VisitTask>, ApiError> {
        let data = self.request(Method::GET, &["api", "tasks"], None).await?;
        if data.is_null() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_value(data)?)
    }
}

#[async_trait]
impl TrackingApi for ApiClient {
    async fn submit_tracking(&self, update: &TrackingUpdate) -> Result<(), ApiError> {
        let body = serde_json::to_value(update)?;
        self.request(Method::POST, &["api", "tracking"], Some(body))
            .await?;
        Ok(())
    }

    async fn mark_stop(&self, task_id: &str, stop: &StopUpdate) -> Result<(), ApiError> {
        let body = serde_json::to_value(stop)?;
        self.request(Method::PATCH, &["api", "tasks", task_id, "stop"], Some(body))
            .await?;
        Ok(())
    }

    async fn mark_complete(&self, task_id: &str) -> Result<(), ApiError> {
        self.request(Method::PATCH, &["api", "tasks", task_id, "complete"], None)
            .await?;
        Ok(())
    }
}
