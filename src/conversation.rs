//! One conversation with the agent: its session, its in-flight send and the
//! delivery policy.

use std::sync::{Mutex, PoisonError};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::agent::{AgentBackend, DeliveryOutcome, FallbackCoordinator, SessionManager};
use crate::config::AgentConfig;
use crate::error::{Error, Result};
use crate::message::{OutgoingMessage, RunRequest};

pub struct Conversation<B: AgentBackend> {
    backend: B,
    config: AgentConfig,
    sessions: SessionManager,
    cancel: Mutex<CancellationToken>,
    streaming: bool,
}

impl<B: AgentBackend> Conversation<B> {
    pub fn new(backend: B, config: AgentConfig) -> Self {
        Self {
            backend,
            config,
            sessions: SessionManager::new(),
            cancel: Mutex::new(CancellationToken::new()),
            streaming: true,
        }
    }

    /// Deliver over the synchronous endpoint only.
    pub fn without_streaming(mut self) -> Self {
        self.streaming = false;
        self
    }

    fn send_token(&self) -> CancellationToken {
        self.cancel
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .child_token()
    }

    /// Send `message` and return the reply text.
    ///
    /// Streamed fragments are passed to `on_delta` as they arrive. A message
    /// with no parts is refused before any network call.
    pub async fn send(
        &self,
        message: &OutgoingMessage,
        on_delta: &mut (dyn FnMut(&str) + Send),
    ) -> Result<String> {
        self.deliver(message, on_delta).await.into_result()
    }

    /// Like [`send`](Self::send), but reports which path produced the reply.
    ///
    /// A [`DeliveryOutcome::FellBack`] reply may follow fragments already
    /// passed to `on_delta` by a stream that later broke.
    pub async fn deliver(
        &self,
        message: &OutgoingMessage,
        on_delta: &mut (dyn FnMut(&str) + Send),
    ) -> DeliveryOutcome {
        if message.is_empty() {
            return DeliveryOutcome::Failed(Error::DeliveryFailed(
                "no attachable files in request".into(),
            ));
        }

        let cancel = self.send_token();
        let session_id = tokio::select! {
            _ = cancel.cancelled() => return DeliveryOutcome::Failed(Error::Cancelled),
            id = self.sessions.ensure_session(&self.backend) => match id {
                Ok(id) => id,
                Err(e) => return DeliveryOutcome::Failed(e),
            },
        };
        let request = RunRequest::new(&self.config, &session_id, message);
        debug!(
            session = %session_id,
            parts = message.parts.len(),
            binary = message.has_binary(),
            "sending message"
        );

        FallbackCoordinator::new(&self.backend)
            .timeout(self.config.request_timeout)
            .streaming(self.streaming)
            .attempt(&request, &cancel, on_delta)
            .await
    }

    /// Abort any in-flight send and start over with a fresh session on the
    /// next [`send`](Self::send).
    pub async fn reset(&self) {
        let previous = std::mem::replace(
            &mut *self.cancel.lock().unwrap_or_else(PoisonError::into_inner),
            CancellationToken::new(),
        );
        previous.cancel();
        self.sessions.reset().await;
    }

    pub async fn session_id(&self) -> Option<String> {
        self.sessions.current().await.map(|s| s.id)
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }
}
