use std::sync::atomic::{AtomicU64, Ordering};
use std::time::SystemTime;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::AgentBackend;
use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatSession {
    pub id: String,
    pub created_at: SystemTime,
}

#[derive(Debug, Default)]
struct Slot {
    session: Option<ChatSession>,
    /// Detail of the most recent failed creation.
    failure: Option<String>,
}

/// Holds the conversation's session, creating it on first use.
///
/// The lock is held across the creation call, so callers that arrive while a
/// creation is in flight wait for it and share its result, failure included.
#[derive(Debug, Default)]
pub struct SessionManager {
    slot: Mutex<Slot>,
    /// Completed creation attempts.
    attempts: AtomicU64,
}

impl SessionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the live session id, creating a session if there is none.
    ///
    /// A failed creation leaves no session behind and is not retried for the
    /// callers that were waiting on it; a later call starts a new attempt.
    pub async fn ensure_session<B: AgentBackend + ?Sized>(&self, backend: &B) -> Result<String> {
        let seen = self.attempts.load(Ordering::SeqCst);
        let mut slot = self.slot.lock().await;
        if let Some(session) = slot.session.as_ref() {
            return Ok(session.id.clone());
        }
        // An attempt finished while we queued: share its failure
        if self.attempts.load(Ordering::SeqCst) != seen
            && let Some(detail) = slot.failure.as_ref()
        {
            return Err(Error::SessionCreationFailed(detail.clone()));
        }

        let created = backend.create_session().await;
        self.attempts.fetch_add(1, Ordering::SeqCst);
        match created {
            Ok(id) => {
                slot.failure = None;
                slot.session = Some(ChatSession {
                    id: id.clone(),
                    created_at: SystemTime::now(),
                });
                Ok(id)
            }
            Err(e) => {
                warn!(error = %e, "session creation failed");
                slot.failure = Some(match &e {
                    Error::SessionCreationFailed(detail) => detail.clone(),
                    other => other.to_string(),
                });
                Err(e)
            }
        }
    }

    /// Forget the current session. No network call is made; the next
    /// [`ensure_session`](Self::ensure_session) creates a new one.
    pub async fn reset(&self) {
        let mut slot = self.slot.lock().await;
        slot.failure = None;
        if let Some(old) = slot.session.take() {
            info!(session = %old.id, "session reset");
        } else {
            debug!("session reset with no live session");
        }
    }

    pub async fn current(&self) -> Option<ChatSession> {
        self.slot.lock().await.session.clone()
    }
}
