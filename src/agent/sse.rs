//! Server-sent event decoding for the streaming run endpoint.
//!
//! The body is a sequence of lines; each `data: <json>` line carries one
//! event whose `content.parts[].text` fields are reply fragments. There is no
//! terminal event: the reply is complete when the body ends.

use futures::{Stream, StreamExt};
use serde_json::Value;
use std::fmt::Display;
use tracing::{debug, warn};

use super::{EventStream, StreamEvent};
use crate::error::{Error, Result};

const DATA_PREFIX: &str = "data: ";

/// Splits arriving bytes into lines, holding back the unterminated tail.
#[derive(Debug, Default)]
pub struct SseDecoder {
    pending: Vec<u8>,
}

impl SseDecoder {
    /// Feed one chunk and return the events of every line it completed.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<StreamEvent> {
        self.pending.extend_from_slice(chunk);

        let mut events = Vec::new();
        let mut start = 0;
        while let Some(nl) = self.pending[start..].iter().position(|&b| b == b'\n') {
            let line = String::from_utf8_lossy(&self.pending[start..start + nl]);
            events.extend(parse_line(&line));
            start += nl + 1;
        }
        self.pending.drain(..start);
        events
    }

    /// Flush a final line that the body ended without terminating.
    pub fn finish(self) -> Vec<StreamEvent> {
        if self.pending.is_empty() {
            return Vec::new();
        }
        parse_line(&String::from_utf8_lossy(&self.pending))
    }
}

/// Events carried by one complete line.
fn parse_line(line: &str) -> Vec<StreamEvent> {
    let line = line.strip_suffix('\r').unwrap_or(line);
    let Some(data) = line.strip_prefix(DATA_PREFIX) else {
        return Vec::new();
    };

    match serde_json::from_str::<Value>(data) {
        Ok(event) => part_texts(&event["content"])
            .map(|text| StreamEvent::Delta(text.to_string()))
            .collect(),
        Err(e) => {
            debug!(error = %e, line = data, "could not parse SSE data");
            vec![StreamEvent::Malformed(data.to_string())]
        }
    }
}

/// Non-empty `text` fields of `content.parts`, in order.
pub(crate) fn part_texts(content: &Value) -> impl Iterator<Item = &str> {
    content["parts"]
        .as_array()
        .into_iter()
        .flatten()
        .filter_map(|part| part["text"].as_str())
        .filter(|text| !text.is_empty())
}

/// Decode a response body into an [`EventStream`].
///
/// A read error ends the stream with [`Error::StreamingTransport`]; a clean end
/// of body yields [`StreamEvent::Done`].
pub fn decode_stream<S, B, E>(body: S) -> EventStream
where
    S: Stream<Item = std::result::Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Display + Send + 'static,
{
    Box::pin(async_stream::stream! {
        let mut decoder = SseDecoder::default();
        let mut body = Box::pin(body);

        while let Some(chunk) = body.next().await {
            match chunk {
                Ok(chunk) => {
                    for event in decoder.push(chunk.as_ref()) {
                        yield Ok(event);
                    }
                }
                Err(e) => {
                    yield Err(Error::StreamingTransport(e.to_string()));
                    return;
                }
            }
        }

        for event in decoder.finish() {
            yield Ok(event);
        }
        yield Ok(StreamEvent::Done);
    })
}

/// Fold a stream into the full reply, reporting each fragment as it arrives.
pub async fn accumulate(
    mut events: EventStream,
    on_delta: &mut (dyn FnMut(&str) + Send),
) -> Result<String> {
    let mut reply = String::new();
    while let Some(event) = events.next().await {
        match event? {
            StreamEvent::Delta(text) => {
                reply.push_str(&text);
                on_delta(&text);
            }
            StreamEvent::Malformed(raw) => warn!(len = raw.len(), "dropped malformed SSE event"),
            StreamEvent::Done => break,
        }
    }
    Ok(reply)
}
