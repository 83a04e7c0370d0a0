//! # docrelay
//!
//! A client for conversational agent services that accept documents.
//!
//! Files are checked against a size cap and a type allow-list. DOCX files get
//! their paragraph text pulled out client-side with a small in-memory ZIP
//! reader, so the agent receives both the original bytes and readable text.
//! Messages are delivered over the streaming endpoint first; when the stream
//! fails, stalls or yields no text, the same request goes once to the
//! synchronous endpoint.
//!
//! ## Features
//!
//! - Central-directory ZIP lookup with STORED and DEFLATE (raw or zlib-wrapped)
//! - Namespace-aware DOCX paragraph extraction with a tag-stripping fallback
//! - Incremental SSE decoding of `data:` lines
//! - One lazily created session per conversation, reset on demand
//! - Per-attempt timeouts and cancellation
//!
//! ## Example
//!
//! ```no_run
//! use docrelay::{AgentConfig, Conversation, HttpAgent, OutgoingMessage, ingest};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let uploads = ingest(Vec::new());
//!     let message = OutgoingMessage::compose("Summarize the risks", &uploads.ready);
//!
//!     let config = AgentConfig::default();
//!     let conversation = Conversation::new(HttpAgent::new(config.clone())?, config);
//!     let reply = conversation
//!         .send(&message, &mut |delta| print!("{delta}"))
//!         .await?;
//!     println!("\n{} chars", reply.len());
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod cli;
pub mod config;
pub mod conversation;
pub mod document;
pub mod error;
pub mod intake;
pub mod message;
pub mod zip;

pub use agent::{AgentBackend, DeliveryOutcome, HttpAgent, SessionManager};
pub use cli::Cli;
pub use config::AgentConfig;
pub use conversation::Conversation;
pub use document::extract_docx_text;
pub use error::{Error, Result};
pub use intake::{Attachment, IncomingFile, UploadState, ingest, ingest_paths};
pub use message::{OutgoingMessage, Part, RunRequest};
pub use zip::{ZipExtractor, ZipParser};
