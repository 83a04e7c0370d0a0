use async_trait::async_trait;
use reqwest::{Client, Response};
use std::time::Duration;
use tracing::{debug, info};

use super::sse::decode_stream;
use super::{AgentBackend, EventStream};
use crate::config::AgentConfig;
use crate::error::{Error, Result};
use crate::message::RunRequest;

/// Agent service reached over HTTP.
pub struct HttpAgent {
    client: Client,
    config: AgentConfig,
}

impl HttpAgent {
    /// Build a client for `config`.
    ///
    /// Only connecting is bounded here; whole-request bounds are applied per
    /// attempt by the caller so that long streams are not cut short.
    pub fn new(config: AgentConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }
}

/// Status line and body of an unsuccessful response.
async fn failure_detail(resp: Response) -> String {
    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();
    if body.is_empty() {
        format!("HTTP {status}")
    } else {
        format!("HTTP {status}: {body}")
    }
}

#[async_trait]
impl AgentBackend for HttpAgent {
    async fn create_session(&self) -> Result<String> {
        let url = self.config.endpoint(&format!(
            "/apps/{}/users/{}/sessions",
            self.config.app_name, self.config.user_id
        ));

        let resp = self
            .client
            .post(&url)
            .json(&serde_json::json!({}))
            .send()
            .await
            .map_err(|e| Error::SessionCreationFailed(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(Error::SessionCreationFailed(failure_detail(resp).await));
        }

        let session: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| Error::SessionCreationFailed(e.to_string()))?;
        let id = session["id"]
            .as_str()
            .ok_or_else(|| Error::SessionCreationFailed("response has no session id".into()))?;

        info!(session = id, user = %self.config.user_id, "session created");
        Ok(id.to_string())
    }

    async fn run_sse(&self, request: &RunRequest) -> Result<EventStream> {
        let resp = self
            .client
            .post(self.config.endpoint("/run_sse"))
            .json(request)
            .send()
            .await
            .map_err(|e| Error::StreamingTransport(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(Error::StreamingTransport(failure_detail(resp).await));
        }

        debug!(session = %request.session_id, "streaming response opened");
        Ok(decode_stream(resp.bytes_stream()))
    }

    async fn run(&self, request: &RunRequest) -> Result<serde_json::Value> {
        let resp = self
            .client
            .post(self.config.endpoint("/run"))
            .json(request)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(Error::DeliveryFailed(failure_detail(resp).await));
        }

        Ok(resp.json().await?)
    }
}
