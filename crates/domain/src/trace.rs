use chrono::NaiveDate;
use serde::Serialize;

/// Structured trace events emitted across all crowdcount crates.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event")]
pub enum TraceEvent {
    UsageLoaded {
        path: String,
        date: NaiveDate,
        total_calls: u64,
        fallback: bool,
    },
    UsageRolledOver {
        previous_date: NaiveDate,
        date: NaiveDate,
        previous_total: u64,
    },
    UsageRecorded {
        session_key: String,
        session_calls: u64,
        total_calls: u64,
    },
    QuotaRejected {
        session_key: String,
        scope: String,
        limit: u64,
    },
    CredentialsConsumed {
        session_key: String,
        service: String,
    },
    CredentialsLoaded {
        session_key: String,
        origin: String,
    },
    SessionResolved {
        session_key: String,
        is_new: bool,
    },
    SessionEnded {
        session_key: String,
        api_calls: u64,
    },
}

impl TraceEvent {
    pub fn emit(&self) {
        let json = serde_json::to_string(self).unwrap_or_default();
        tracing::info!(trace_event = %json, "crowd_event");
    }
}
