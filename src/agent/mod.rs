//! Delivery of composed messages to the agent service.
//!
//! ## Architecture
//!
//! - [`AgentBackend`]: the three remote calls (session creation, streaming
//!   run, synchronous run); [`HttpAgent`] is the HTTP implementation
//! - [`sse`]: turns a streaming response body into [`StreamEvent`]s
//! - [`SessionManager`]: creates the conversation's session once, on demand
//! - [`FallbackCoordinator`]: streams first, falls back to the synchronous
//!   endpoint when streaming fails or produces no text
//! - [`response`]: reduces synchronous response bodies to text

mod fallback;
mod http;
pub mod response;
mod session;
pub mod sse;

#[cfg(test)]
pub(crate) mod fake;

pub use fallback::{DeliveryOutcome, FallbackCoordinator};
pub use http::HttpAgent;
pub use session::{ChatSession, SessionManager};

use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;

use crate::error::Result;
use crate::message::RunRequest;

/// One item of a streaming response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// A text fragment to append to the reply.
    Delta(String),
    /// The body ended.
    Done,
    /// A `data:` line that was not valid JSON. Dropped by consumers.
    Malformed(String),
}

/// Lazy, finite event sequence of one streaming run. Not restartable.
pub type EventStream = Pin<Box<dyn Stream<Item = Result<StreamEvent>> + Send>>;

/// Remote calls the delivery logic depends on.
#[async_trait]
pub trait AgentBackend: Send + Sync {
    /// Create a session and return its id.
    async fn create_session(&self) -> Result<String>;

    /// Start a streaming run. Errors if the response could not be opened.
    async fn run_sse(&self, request: &RunRequest) -> Result<EventStream>;

    /// Run synchronously and return the response body.
    async fn run(&self, request: &RunRequest) -> Result<serde_json::Value>;
}
