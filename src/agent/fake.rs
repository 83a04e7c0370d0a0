//! Scripted in-process backend for exercising delivery logic.

use async_trait::async_trait;
use futures::stream;
use serde_json::Value;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use super::sse::decode_stream;
use super::{AgentBackend, EventStream};
use crate::error::{Error, Result};
use crate::message::RunRequest;

#[derive(Clone)]
pub(crate) enum SseScript {
    /// Body chunks delivered in order.
    Body(Vec<String>),
    /// The response cannot be opened.
    Refused,
    /// Some chunks, then a read error.
    BrokenAfter(Vec<String>),
    /// Opens but never produces a byte.
    Stalled,
}

#[derive(Clone)]
pub(crate) enum RunScript {
    Body(Value),
    Fails(String),
    Stalled,
}

pub(crate) struct FakeBackend {
    session_delay: Option<Duration>,
    fail_sessions: bool,
    sse: SseScript,
    run: RunScript,
    session_calls: AtomicUsize,
    sse_calls: AtomicUsize,
    run_requests: Mutex<Vec<RunRequest>>,
}

impl FakeBackend {
    pub(crate) fn new() -> Self {
        Self {
            session_delay: None,
            fail_sessions: false,
            sse: SseScript::Body(Vec::new()),
            run: RunScript::Body(Value::String(String::new())),
            session_calls: AtomicUsize::new(0),
            sse_calls: AtomicUsize::new(0),
            run_requests: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn with_session_delay(mut self, delay: Duration) -> Self {
        self.session_delay = Some(delay);
        self
    }

    pub(crate) fn failing_sessions(mut self) -> Self {
        self.fail_sessions = true;
        self
    }

    pub(crate) fn with_sse(mut self, script: SseScript) -> Self {
        self.sse = script;
        self
    }

    /// Stream each text as one `data:` line.
    pub(crate) fn with_deltas(self, deltas: &[&str]) -> Self {
        let lines = deltas
            .iter()
            .map(|d| {
                format!(
                    "data: {}\n\n",
                    serde_json::json!({"content": {"parts": [{"text": d}]}})
                )
            })
            .collect();
        self.with_sse(SseScript::Body(lines))
    }

    pub(crate) fn with_run(mut self, script: RunScript) -> Self {
        self.run = script;
        self
    }

    pub(crate) fn session_calls(&self) -> usize {
        self.session_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn sse_calls(&self) -> usize {
        self.sse_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn run_requests(&self) -> Vec<RunRequest> {
        self.run_requests.lock().unwrap().clone()
    }
}

fn chunks(lines: Vec<String>) -> Vec<std::result::Result<Vec<u8>, String>> {
    lines.into_iter().map(|l| Ok(l.into_bytes())).collect()
}

#[async_trait]
impl AgentBackend for FakeBackend {
    async fn create_session(&self) -> Result<String> {
        let n = self.session_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(delay) = self.session_delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_sessions {
            return Err(Error::SessionCreationFailed("HTTP 500".into()));
        }
        Ok(format!("session-{n}"))
    }

    async fn run_sse(&self, _request: &RunRequest) -> Result<EventStream> {
        self.sse_calls.fetch_add(1, Ordering::SeqCst);
        match self.sse.clone() {
            SseScript::Body(lines) => Ok(decode_stream(stream::iter(chunks(lines)))),
            SseScript::Refused => Err(Error::StreamingTransport("HTTP 502".into())),
            SseScript::BrokenAfter(lines) => {
                let mut items = chunks(lines);
                items.push(Err("connection reset".into()));
                Ok(decode_stream(stream::iter(items)))
            }
            SseScript::Stalled => Ok(decode_stream(stream::pending::<
                std::result::Result<Vec<u8>, String>,
            >())),
        }
    }

    async fn run(&self, request: &RunRequest) -> Result<Value> {
        self.run_requests.lock().unwrap().push(request.clone());
        match self.run.clone() {
            RunScript::Body(body) => Ok(body),
            RunScript::Fails(msg) => Err(Error::DeliveryFailed(msg)),
            RunScript::Stalled => std::future::pending().await,
        }
    }
}
