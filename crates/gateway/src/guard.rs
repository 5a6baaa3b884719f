//! The guarded call path: what the app runs before every outbound API call.
//!
//! 1. make sure operator credentials are loaded for the session (blocking
//!    on missing credentials),
//! 2. take one call from the daily quota,
//! 3. pick the credentials the call should use, consuming any one-shot
//!    user credentials.
//!
//! A quota rejection is an ordinary outcome, not an error.

use crowd_domain::error::Result;
use crowd_domain::{Credentials, Service};
use crowd_quota::{QuotaExceeded, UsageStats};

use crate::state::AppState;

#[derive(Debug)]
pub enum CallOutcome {
    /// The call may proceed with these credentials.
    Allowed {
        credentials: Credentials,
        stats: UsageStats,
    },
    /// The call must not be made.  `reason` displays as the user advisory.
    Rejected {
        reason: QuotaExceeded,
        stats: UsageStats,
    },
}

impl CallOutcome {
    pub fn is_allowed(&self) -> bool {
        matches!(self, CallOutcome::Allowed { .. })
    }

    pub fn stats(&self) -> &UsageStats {
        match self {
            CallOutcome::Allowed { stats, .. } | CallOutcome::Rejected { stats, .. } => stats,
        }
    }
}

/// Authorize one call to `service` on behalf of `session_key`.
///
/// Errors only when operator credentials are missing.
pub fn guarded_call(state: &AppState, session_key: &str, service: Service) -> Result<CallOutcome> {
    state.sessions.with_session(session_key, |session| -> Result<CallOutcome> {
        state.loader.load(session)?;

        if let Err(reason) = state.limiter.try_acquire(session) {
            let stats = state.limiter.usage_stats(session);
            return Ok(CallOutcome::Rejected { reason, stats });
        }

        let credentials = state.credentials.get_credentials(session, service);
        let stats = state.limiter.usage_stats(session);
        tracing::info!(
            session_key,
            %service,
            source = ?credentials.source(),
            session_calls = stats.session_calls,
            total_calls = stats.total_calls,
            "API call authorized"
        );
        Ok(CallOutcome::Allowed { credentials, stats })
    })
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
