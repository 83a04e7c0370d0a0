//! Attachment intake: validation, DOCX text extraction and the upload state
//! handed to message composition.

use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::document;
use crate::error::{Error, Result};

/// Largest accepted upload (10 MiB).
pub const MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Extracted text longer than this many characters is truncated.
pub const MAX_EXTRACTED_CHARS: usize = 100_000;

pub const TRUNCATION_MARKER: &str = "\n...[truncated]...";

const SUPPORTED_MIME_PREFIXES: &[&str] = &[
    "image/",
    "text/",
    "application/pdf",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "application/vnd.ms-powerpoint",
    "application/vnd.openxmlformats-officedocument.presentationml.presentation",
    "application/vnd.ms-excel",
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
];

const SUPPORTED_EXTENSIONS: &[&str] = &[
    "txt", "csv", "pdf", "png", "jpg", "jpeg", "gif", "webp", "bmp", "tif", "tiff", "svg", "doc",
    "docx", "ppt", "pptx", "xls", "xlsx",
];

/// Rejected files never become an [`Attachment`]; they are recorded as
/// [`FailedFile`]s instead, so only the two live states exist here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttachmentStatus {
    Pending,
    Ready,
}

/// One uploaded file. Only the intake pipeline mutates it; once `Ready` it is
/// no longer changed.
#[derive(Debug, Clone)]
pub struct Attachment {
    pub name: String,
    pub mime_type: String,
    pub size_bytes: u64,
    pub raw_bytes: Vec<u8>,
    pub extracted_text: Option<String>,
    pub status: AttachmentStatus,
}

impl Attachment {
    fn pending(name: String, mime_type: String, raw_bytes: Vec<u8>) -> Self {
        Self {
            name,
            mime_type,
            size_bytes: raw_bytes.len() as u64,
            raw_bytes,
            extracted_text: None,
            status: AttachmentStatus::Pending,
        }
    }

    pub fn is_docx(&self) -> bool {
        let name = self.name.to_lowercase();
        name.ends_with(".docx")
            || self
                .mime_type
                .to_lowercase()
                .contains("wordprocessingml.document")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedFile {
    pub name: String,
    pub reason: String,
}

/// Outcome of one intake pass, in selection order.
#[derive(Debug, Clone, Default)]
pub struct UploadState {
    pub ready: Vec<Attachment>,
    pub failed: Vec<FailedFile>,
    /// Non-fatal problems, e.g. a DOCX sent without its extracted text.
    pub notices: Vec<String>,
}

impl UploadState {
    /// Aggregate notice about rejected files, if any were rejected.
    pub fn summary(&self) -> Option<String> {
        if self.failed.is_empty() {
            return None;
        }
        let details = self
            .failed
            .iter()
            .map(|f| format!("{} — {}", f.name, f.reason))
            .collect::<Vec<_>>()
            .join("; ");
        if self.ready.is_empty() {
            Some(format!("No files attached. {details}"))
        } else {
            Some(format!("Some attachments were not sent: {details}"))
        }
    }
}

/// Guess a MIME type from a file name's extension.
pub fn guess_mime_type(filename: &str) -> &'static str {
    let ext = filename.rsplit('.').next().unwrap_or("").to_lowercase();
    match ext.as_str() {
        "txt" => "text/plain",
        "csv" => "text/csv",
        "pdf" => "application/pdf",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        "tif" | "tiff" => "image/tiff",
        "svg" => "image/svg+xml",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "ppt" => "application/vnd.ms-powerpoint",
        "pptx" => "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        "xls" => "application/vnd.ms-excel",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        _ => "",
    }
}

fn is_supported(name: &str, mime_type: &str) -> bool {
    let lower = name.to_lowercase();
    SUPPORTED_MIME_PREFIXES.iter().any(|p| mime_type.starts_with(p))
        || SUPPORTED_EXTENSIONS
            .iter()
            .any(|ext| lower.ends_with(&format!(".{ext}")))
}

/// Cap extracted text at [`MAX_EXTRACTED_CHARS`] characters.
pub fn truncate_extracted(text: String) -> String {
    match text.char_indices().nth(MAX_EXTRACTED_CHARS) {
        Some((cut, _)) => {
            let mut truncated = text[..cut].to_string();
            truncated.push_str(TRUNCATION_MARKER);
            truncated
        }
        None => text,
    }
}

/// Check size and type, then extract DOCX text.
///
/// A DOCX whose text cannot be extracted is still accepted; the returned
/// notice says so.
pub fn accept(
    name: &str,
    mime_type: &str,
    bytes: Vec<u8>,
) -> Result<(Attachment, Option<String>)> {
    let size = bytes.len() as u64;
    if size > MAX_FILE_SIZE {
        return Err(Error::FileTooLarge {
            name: name.to_string(),
            size,
            limit: MAX_FILE_SIZE,
        });
    }

    let mime_type = if mime_type.is_empty() {
        guess_mime_type(name)
    } else {
        mime_type
    };
    if !is_supported(name, mime_type) {
        return Err(Error::UnsupportedFileType {
            name: name.to_string(),
            mime_type: if mime_type.is_empty() { "unknown" } else { mime_type }.to_string(),
        });
    }

    let mut attachment = Attachment::pending(name.to_string(), mime_type.to_string(), bytes);
    let mut notice = None;

    if attachment.is_docx() {
        match document::extract_docx_text(&attachment.raw_bytes) {
            Ok(text) if !text.trim().is_empty() => {
                debug!(file = name, chars = text.chars().count(), "extracted document text");
                attachment.extracted_text = Some(truncate_extracted(text));
            }
            Ok(_) => debug!(file = name, "document has no text"),
            Err(e) => {
                warn!(file = name, error = %e, "DOCX text extraction failed");
                notice = Some(format!(
                    "DOCX text extraction failed for {name}. Sending original file."
                ));
            }
        }
    }

    attachment.status = AttachmentStatus::Ready;
    Ok((attachment, notice))
}

fn failure_reason(err: &Error) -> String {
    match err {
        Error::FileTooLarge { .. } => "too large (max 10MB)".to_string(),
        Error::UnsupportedFileType { mime_type, .. } => format!("unsupported type ({mime_type})"),
        _ => "processing error".to_string(),
    }
}

/// A file selected for upload.
#[derive(Debug, Clone)]
pub struct IncomingFile {
    pub name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// Run intake over `files` one at a time, in order.
pub fn ingest(files: impl IntoIterator<Item = IncomingFile>) -> UploadState {
    let mut state = UploadState::default();
    for file in files {
        let outcome = accept(&file.name, &file.mime_type, file.bytes);
        state.record(file.name, outcome);
    }
    state
}

/// Read files from disk and run intake over them in the given order.
///
/// Files larger than the cap are rejected from their metadata without being
/// read.
pub async fn ingest_paths(paths: &[PathBuf]) -> UploadState {
    let mut state = UploadState::default();
    for path in paths {
        let name = display_name(path);
        let outcome = match read_upload(path, &name).await {
            Ok(bytes) => accept(&name, guess_mime_type(&name), bytes),
            Err(e) => Err(e),
        };
        state.record(name, outcome);
    }
    state
}

impl UploadState {
    fn record(&mut self, name: String, outcome: Result<(Attachment, Option<String>)>) {
        match outcome {
            Ok((attachment, notice)) => {
                self.notices.extend(notice);
                self.ready.push(attachment);
            }
            Err(e) => {
                info!(file = %name, error = %e, "attachment rejected");
                self.failed.push(FailedFile {
                    reason: failure_reason(&e),
                    name,
                });
            }
        }
    }
}

async fn read_upload(path: &Path, name: &str) -> Result<Vec<u8>> {
    let size = tokio::fs::metadata(path).await?.len();
    if size > MAX_FILE_SIZE {
        return Err(Error::FileTooLarge {
            name: name.to_string(),
            size,
            limit: MAX_FILE_SIZE,
        });
    }
    Ok(tokio::fs::read(path).await?)
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}
