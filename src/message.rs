//! Outgoing message parts and their JSON wire form.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Serialize, Serializer};

use crate::config::AgentConfig;
use crate::intake::Attachment;

/// One part of an outgoing message. Order is preserved on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Part {
    Text { text: String },
    Binary { mime_type: String, data: Vec<u8> },
}

impl Serialize for Part {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct InlineData<'a> {
            mime_type: &'a str,
            data: String,
        }

        #[derive(Serialize)]
        #[serde(untagged)]
        enum Wire<'a> {
            Text {
                text: &'a str,
            },
            Inline {
                #[serde(rename = "inlineData")]
                inline_data: InlineData<'a>,
            },
        }

        match self {
            Part::Text { text } => Wire::Text { text }.serialize(serializer),
            Part::Binary { mime_type, data } => Wire::Inline {
                inline_data: InlineData {
                    mime_type,
                    data: STANDARD.encode(data),
                },
            }
            .serialize(serializer),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutgoingMessage {
    pub parts: Vec<Part>,
}

impl OutgoingMessage {
    /// Compose the user's text and the ready attachments into parts.
    ///
    /// The text comes first. Each attachment contributes its binary part,
    /// followed by its extracted text when there is any.
    pub fn compose(text: &str, attachments: &[Attachment]) -> Self {
        let mut parts = Vec::with_capacity(1 + attachments.len() * 2);
        let text = text.trim();
        if !text.is_empty() {
            parts.push(Part::Text {
                text: text.to_string(),
            });
        }

        for attachment in attachments {
            parts.push(Part::Binary {
                mime_type: attachment.mime_type.clone(),
                data: attachment.raw_bytes.clone(),
            });
            if let Some(extracted) = &attachment.extracted_text {
                parts.push(Part::Text {
                    text: format!(
                        "CLIENT-SIDE DOCX TEXT ({}):\n\n{}",
                        attachment.name, extracted
                    ),
                });
            }
        }

        Self { parts }
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    pub(crate) fn has_binary(&self) -> bool {
        self.parts.iter().any(|p| matches!(p, Part::Binary { .. }))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NewMessage {
    pub role: &'static str,
    pub parts: Vec<Part>,
}

/// Body of both the streaming and synchronous run endpoints.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunRequest {
    pub app_name: String,
    pub user_id: String,
    pub session_id: String,
    pub new_message: NewMessage,
    pub streaming: bool,
}

impl RunRequest {
    pub fn new(config: &AgentConfig, session_id: &str, message: &OutgoingMessage) -> Self {
        Self {
            app_name: config.app_name.clone(),
            user_id: config.user_id.clone(),
            session_id: session_id.to_string(),
            new_message: NewMessage {
                role: "user",
                parts: message.parts.clone(),
            },
            streaming: true,
        }
    }

    /// The same logical request for the synchronous endpoint.
    pub fn non_streaming(&self) -> Self {
        Self {
            streaming: false,
            ..self.clone()
        }
    }
}
