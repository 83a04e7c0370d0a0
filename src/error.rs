use std::time::Duration;

/// Errors produced while taking in attachments or delivering a message.
///
/// `XmlParse` and `StreamingTransport` are recovered inside the crate (tag
/// stripping and the synchronous fallback respectively); callers normally only
/// see the intake errors, `SessionCreationFailed`, `DeliveryFailed` and
/// `Cancelled`.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{name} is too large ({size} bytes, max {limit})")]
    FileTooLarge { name: String, size: u64, limit: u64 },

    #[error("unsupported file type for {name} ({mime_type})")]
    UnsupportedFileType { name: String, mime_type: String },

    #[error("invalid archive: {0}")]
    ArchiveFormat(String),

    #[error("archive entry not found: {0}")]
    EntryNotFound(String),

    #[error("unsupported compression method: {0}")]
    UnsupportedCompressionMethod(u16),

    #[error("decompression failed: {0}")]
    Decompression(#[source] std::io::Error),

    #[error("malformed document XML: {0}")]
    XmlParse(String),

    #[error("failed to create session: {0}")]
    SessionCreationFailed(String),

    #[error("streaming transport error: {0}")]
    StreamingTransport(String),

    #[error("delivery failed: {0}")]
    DeliveryFailed(String),

    #[error("request cancelled")]
    Cancelled,

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn archive(msg: impl Into<String>) -> Self {
        Self::ArchiveFormat(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
