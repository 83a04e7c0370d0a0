use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::AgentBackend;
use super::response::normalize;
use super::sse::accumulate;
use crate::config::DEFAULT_TIMEOUT;
use crate::error::{Error, Result};
use crate::message::RunRequest;

/// How a delivery attempt ended.
#[derive(Debug)]
pub enum DeliveryOutcome {
    /// The streaming run produced text.
    Streamed(String),
    /// Streaming failed or was empty; the synchronous run answered.
    FellBack(String),
    /// Both paths failed, or the send was cancelled.
    Failed(Error),
}

impl DeliveryOutcome {
    pub fn into_result(self) -> Result<String> {
        match self {
            Self::Streamed(text) | Self::FellBack(text) => Ok(text),
            Self::Failed(e) => Err(e),
        }
    }
}

/// Streams a request, falling back to the synchronous endpoint when the
/// stream errors, times out or ends without any text.
pub struct FallbackCoordinator<'a, B: AgentBackend + ?Sized> {
    backend: &'a B,
    timeout: Duration,
    streaming: bool,
}

impl<'a, B: AgentBackend + ?Sized> FallbackCoordinator<'a, B> {
    pub fn new(backend: &'a B) -> Self {
        Self {
            backend,
            timeout: DEFAULT_TIMEOUT,
            streaming: true,
        }
    }

    /// Bound each transport attempt by `timeout`.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Skip the streaming attempt when `false`.
    pub fn streaming(mut self, streaming: bool) -> Self {
        self.streaming = streaming;
        self
    }

    /// Run `attempt` under the timeout, giving up early if `cancel` fires.
    async fn bounded<T>(
        &self,
        cancel: &CancellationToken,
        attempt: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        tokio::select! {
            _ = cancel.cancelled() => Err(Error::Cancelled),
            res = tokio::time::timeout(self.timeout, attempt) => {
                res.unwrap_or_else(|_| Err(Error::Timeout(self.timeout)))
            }
        }
    }

    /// Deliver `request` and report which path produced the reply.
    ///
    /// `on_delta` sees each streamed fragment as it arrives. A fallback reply
    /// is not passed to it.
    pub async fn attempt(
        &self,
        request: &RunRequest,
        cancel: &CancellationToken,
        on_delta: &mut (dyn FnMut(&str) + Send),
    ) -> DeliveryOutcome {
        if self.streaming {
            let streamed = self
                .bounded(cancel, async {
                    let events = self.backend.run_sse(request).await?;
                    accumulate(events, on_delta).await
                })
                .await;

            match streamed {
                Ok(text) if !text.is_empty() => return DeliveryOutcome::Streamed(text),
                Ok(_) => info!("no streaming result, trying non-streaming run"),
                Err(Error::Cancelled) => return DeliveryOutcome::Failed(Error::Cancelled),
                Err(e) => warn!(error = %e, "streaming failed, trying non-streaming run"),
            }
        }

        let request = request.non_streaming();
        match self.bounded(cancel, self.backend.run(&request)).await {
            Ok(body) => DeliveryOutcome::FellBack(normalize(&body)),
            Err(Error::Cancelled) => DeliveryOutcome::Failed(Error::Cancelled),
            Err(Error::DeliveryFailed(msg)) => DeliveryOutcome::Failed(Error::DeliveryFailed(msg)),
            Err(e) => DeliveryOutcome::Failed(Error::DeliveryFailed(e.to_string())),
        }
    }

    /// Deliver `request` and return the reply text.
    pub async fn deliver(
        &self,
        request: &RunRequest,
        cancel: &CancellationToken,
        on_delta: &mut (dyn FnMut(&str) + Send),
    ) -> Result<String> {
        self.attempt(request, cancel, on_delta).await.into_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::fake::{FakeBackend, RunScript, SseScript};
    use crate::config::AgentConfig;
    use crate::message::OutgoingMessage;
    use serde_json::json;

    fn request() -> RunRequest {
        RunRequest::new(
            &AgentConfig::default(),
            "s-1",
            &OutgoingMessage::compose("analyze", &[]),
        )
    }

    async fn attempt(backend: &FakeBackend) -> DeliveryOutcome {
        FallbackCoordinator::new(backend)
            .timeout(Duration::from_millis(200))
            .attempt(&request(), &CancellationToken::new(), &mut |_| {})
            .await
    }

    fn sync_reply(text: &str) -> RunScript {
        RunScript::Body(json!({"content": {"parts": [{"text": text}]}}))
    }

    #[tokio::test]
    async fn streamed_reply_skips_fallback() {
        let backend = FakeBackend::new()
            .with_deltas(&["Strong ", "team"])
            .with_run(sync_reply("unused"));

        let mut seen = String::new();
        let outcome = FallbackCoordinator::new(&backend)
            .attempt(&request(), &CancellationToken::new(), &mut |d| {
                seen.push_str(d)
            })
            .await;

        assert!(matches!(outcome, DeliveryOutcome::Streamed(ref t) if t == "Strong team"));
        assert_eq!(seen, "Strong team");
        assert!(backend.run_requests().is_empty());
    }

    #[tokio::test]
    async fn empty_stream_falls_back_once() {
        let backend = FakeBackend::new()
            .with_sse(SseScript::Body(vec![": keep-alive\n\n".into()]))
            .with_run(sync_reply("from run"));

        let outcome = attempt(&backend).await;

        assert!(matches!(outcome, DeliveryOutcome::FellBack(ref t) if t == "from run"));
        let runs = backend.run_requests();
        assert_eq!(runs.len(), 1);
        assert!(!runs[0].streaming);
        assert_eq!(runs[0].session_id, "s-1");
    }

    #[tokio::test]
    async fn refused_stream_falls_back() {
        let backend = FakeBackend::new()
            .with_sse(SseScript::Refused)
            .with_run(sync_reply("ok"));
        assert!(matches!(attempt(&backend).await, DeliveryOutcome::FellBack(ref t) if t == "ok"));
    }

    #[tokio::test]
    async fn broken_stream_falls_back() {
        let backend = FakeBackend::new()
            .with_sse(SseScript::BrokenAfter(vec![
                "data: {\"content\":{\"parts\":[{\"text\":\"part\"}]}}\n".into(),
            ]))
            .with_run(sync_reply("whole"));
        assert!(
            matches!(attempt(&backend).await, DeliveryOutcome::FellBack(ref t) if t == "whole")
        );
    }

    #[tokio::test]
    async fn stalled_stream_times_out_into_fallback() {
        let backend = FakeBackend::new()
            .with_sse(SseScript::Stalled)
            .with_run(sync_reply("late"));
        assert!(matches!(attempt(&backend).await, DeliveryOutcome::FellBack(ref t) if t == "late"));
    }

    #[tokio::test]
    async fn both_paths_failing_is_fatal() {
        let backend = FakeBackend::new()
            .with_sse(SseScript::Refused)
            .with_run(RunScript::Fails("HTTP 500: internal".into()));

        let err = attempt(&backend).await.into_result().unwrap_err();
        assert!(matches!(err, Error::DeliveryFailed(msg) if msg.contains("500")));
    }

    #[tokio::test]
    async fn stalled_fallback_is_fatal() {
        let backend = FakeBackend::new()
            .with_sse(SseScript::Refused)
            .with_run(RunScript::Stalled);
        let err = attempt(&backend).await.into_result().unwrap_err();
        assert!(matches!(err, Error::DeliveryFailed(_)));
    }

    #[tokio::test]
    async fn streaming_disabled_goes_straight_to_run() {
        let backend = FakeBackend::new()
            .with_deltas(&["unused"])
            .with_run(RunScript::Body(json!("bare")));

        let text = FallbackCoordinator::new(&backend)
            .streaming(false)
            .deliver(&request(), &CancellationToken::new(), &mut |_| {})
            .await
            .unwrap();

        assert_eq!(text, "bare");
        assert_eq!(backend.sse_calls(), 0);
    }

    #[tokio::test]
    async fn cancellation_stops_without_fallback() {
        let backend = FakeBackend::new()
            .with_sse(SseScript::Stalled)
            .with_run(sync_reply("never"));
        let cancel = CancellationToken::new();

        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            canceller.cancel();
        });

        let outcome = FallbackCoordinator::new(&backend)
            .attempt(&request(), &cancel, &mut |_| {})
            .await;

        assert!(matches!(outcome, DeliveryOutcome::Failed(Error::Cancelled)));
        assert!(backend.run_requests().is_empty());
    }
}
