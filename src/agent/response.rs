//! Reduction of synchronous run responses to reply text.

use serde_json::Value;

use super::sse::part_texts;

/// Reply used when the body matches none of the known shapes.
pub const UNRECOGNIZED_REPLY: &str =
    "I received your message but the response format was unexpected. Please try again.";

/// The accepted body shapes, in match priority order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseShape {
    /// `{"content": {"parts": [...]}}`
    Parts(Vec<String>),
    /// `{"candidates": [{"content": {"parts": [...]}}, ...]}`
    Candidates(Vec<String>),
    /// A bare JSON string.
    Bare(String),
    Unrecognized,
}

impl ResponseShape {
    pub fn classify(body: &Value) -> Self {
        if body["content"]["parts"].is_array() {
            return Self::Parts(texts(&body["content"]));
        }
        if let Some(first) = body["candidates"].as_array().and_then(|c| c.first()) {
            return Self::Candidates(texts(&first["content"]));
        }
        if let Some(s) = body.as_str() {
            return Self::Bare(s.to_string());
        }
        Self::Unrecognized
    }

    pub fn into_text(self) -> String {
        match self {
            Self::Parts(parts) | Self::Candidates(parts) => parts.concat(),
            Self::Bare(s) => s,
            Self::Unrecognized => UNRECOGNIZED_REPLY.to_string(),
        }
    }
}

fn texts(content: &Value) -> Vec<String> {
    part_texts(content).map(str::to_string).collect()
}

/// Flatten a response body to text. An empty string means the agent produced
/// no text, not that the body was unreadable.
pub fn normalize(body: &Value) -> String {
    ResponseShape::classify(body).into_text()
}
