//! In-memory session store.
//!
//! Maps a session key (one per connected client) to its [`SessionContext`].
//! Contexts outlive a single request but not the client: they are dropped
//! by [`SessionStore::end_session`] and never written to disk.

use std::collections::HashMap;

use parking_lot::RwLock;

use crowd_domain::trace::TraceEvent;

use crate::context::SessionContext;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Session store
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<String, SessionContext>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a session by its key.  Returns a snapshot.
    pub fn get(&self, session_key: &str) -> Option<SessionContext> {
        self.sessions.read().get(session_key).cloned()
    }

    /// Ensure a session exists for the given key.  Returns `true` if it was
    /// created by this call.
    pub fn resolve_or_create(&self, session_key: &str) -> bool {
        // Fast path: session already exists.
        if self.sessions.read().contains_key(session_key) {
            return false;
        }

        let mut sessions = self.sessions.write();
        // Another caller may have raced us between the two locks.
        if sessions.contains_key(session_key) {
            return false;
        }
        sessions.insert(session_key.to_owned(), SessionContext::new(session_key));

        TraceEvent::SessionResolved {
            session_key: session_key.to_owned(),
            is_new: true,
        }
        .emit();

        true
    }

    /// Run `f` with mutable access to the session, creating it if needed.
    ///
    /// The store's write lock is held for the duration of `f`, so keep it
    /// short.
    pub fn with_session<R>(
        &self,
        session_key: &str,
        f: impl FnOnce(&mut SessionContext) -> R,
    ) -> R {
        let mut sessions = self.sessions.write();
        let ctx = sessions
            .entry(session_key.to_owned())
            .or_insert_with(|| SessionContext::new(session_key));
        f(ctx)
    }

    /// Drop a session and everything it owns.
    pub fn end_session(&self, session_key: &str) -> Option<SessionContext> {
        let removed = self.sessions.write().remove(session_key);
        if let Some(ref ctx) = removed {
            TraceEvent::SessionEnded {
                session_key: session_key.to_owned(),
                api_calls: ctx.api_calls,
            }
            .emit();
        }
        removed
    }

    /// List all live sessions.
    pub fn list(&self) -> Vec<SessionContext> {
        self.sessions.read().values().cloned().collect()
    }
}
