//! Process-wide map of in-flight chains, keyed by session id.

use super::{SessionHandle, SessionSummary};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Tracks one active chain per session id and routes cancel requests.
///
/// Constructed explicitly and shared through an `Arc`; every operation is
/// safe under concurrent use from independent chains.
#[derive(Debug, Default)]
pub struct CancellationRegistry {
    sessions: DashMap<String, Arc<SessionHandle>>,
}

impl CancellationRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a session. Returns false if the id is already taken.
    pub fn register(&self, handle: Arc<SessionHandle>) -> bool {
        match self.sessions.entry(handle.id().to_string()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                debug!(session_id = %handle.id(), "Session registered");
                slot.insert(handle);
                true
            }
        }
    }

    /// Looks up an active session.
    #[must_use]
    pub fn get(&self, session_id: &str) -> Option<Arc<SessionHandle>> {
        self.sessions.get(session_id).map(|entry| entry.value().clone())
    }

    /// Requests cancellation of an active session.
    ///
    /// Returns true only if this call moved a registered session to
    /// cancelled. Unknown, finished and already-cancelled sessions return
    /// false and nothing changes.
    pub fn cancel(&self, session_id: &str) -> bool {
        // Clone out of the map so callbacks never run under a shard lock.
        let Some(handle) = self.get(session_id) else {
            debug!(session_id = %session_id, "Cancel for unknown session ignored");
            return false;
        };
        let cancelled = handle.cancel("cancelled by client");
        if cancelled {
            info!(session_id = %session_id, state = %handle.state(), "Session cancelled");
        }
        cancelled
    }

    /// Removes a session. Idempotent.
    pub fn deregister(&self, session_id: &str) -> Option<Arc<SessionHandle>> {
        let removed = self.sessions.remove(session_id).map(|(_, handle)| handle);
        if removed.is_some() {
            debug!(session_id = %session_id, "Session deregistered");
        }
        removed
    }

    /// Cancels every active session, returning how many were cancelled.
    pub fn cancel_all(&self, reason: &str) -> usize {
        let handles: Vec<Arc<SessionHandle>> =
            self.sessions.iter().map(|entry| entry.value().clone()).collect();
        handles.iter().filter(|handle| handle.cancel(reason)).count()
    }

    /// Returns snapshots of active sessions, oldest first.
    #[must_use]
    pub fn active_sessions(&self) -> Vec<SessionSummary> {
        let mut handles: Vec<Arc<SessionHandle>> =
            self.sessions.iter().map(|entry| entry.value().clone()).collect();
        handles.sort_by_key(|handle| handle.created_at());
        handles.iter().map(|handle| handle.summary()).collect()
    }

    /// Returns the number of active sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Returns true if no session is active.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
