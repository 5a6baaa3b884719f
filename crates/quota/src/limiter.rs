//! Per-session and global daily API call limits.
//!
//! [`UsageLimiter`] owns the shared [`UsageRecord`] behind a
//! `parking_lot::Mutex` and takes the caller's [`SessionContext`] on every
//! operation.  Day rollover is lazy: it happens at the start of a check or a
//! stats read, never on a timer.
//!
//! Storage failures never reach the caller.  A missing or unreadable usage
//! file yields a fresh zeroed record, and a failed write keeps the in-memory
//! count so the next successful write catches up.

use std::fmt;
use std::sync::Arc;

use chrono::NaiveDate;
use parking_lot::Mutex;
use serde::Serialize;

use crowd_domain::config::LimitsConfig;
use crowd_domain::trace::TraceEvent;
use crowd_sessions::SessionContext;

use crate::clock::{Clock, LocalClock};
use crate::record::{UsageFile, UsageRecord};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Types
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Returned when a call would exceed a daily limit.  The `Display` output
/// is the advisory shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum QuotaExceeded {
    #[error("You've reached your daily limit of {limit} API calls. Please try again tomorrow.")]
    User { limit: u64 },
    #[error(
        "The total daily limit of {limit} API calls has been reached. Please try again tomorrow."
    )]
    Total { limit: u64 },
}

impl QuotaExceeded {
    /// `"user"` or `"total"`.
    pub fn scope(&self) -> &'static str {
        match self {
            QuotaExceeded::User { .. } => "user",
            QuotaExceeded::Total { .. } => "total",
        }
    }

    pub fn limit(&self) -> u64 {
        match self {
            QuotaExceeded::User { limit } | QuotaExceeded::Total { limit } => *limit,
        }
    }
}

/// Read-only snapshot of today's usage as seen by one session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UsageStats {
    pub date: NaiveDate,
    pub session_calls: u64,
    pub daily_user_limit: u64,
    pub total_calls: u64,
    pub daily_total_limit: u64,
    /// Fraction of the per-session limit used.  Not clamped: a caller that
    /// records without checking can push this above 1.0.
    pub user_ratio: f64,
}

impl fmt::Display for UsageStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "API usage statistics")?;
        writeln!(
            f,
            "Your usage today: {}/{}",
            self.session_calls, self.daily_user_limit
        )?;
        writeln!(f, "Progress: {:.0}%", self.user_ratio * 100.0)?;
        write!(
            f,
            "Total usage today: {}/{}",
            self.total_calls, self.daily_total_limit
        )
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// UsageLimiter
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Daily call limiter shared by every session of a deployment.
pub struct UsageLimiter {
    daily_user_limit: u64,
    daily_total_limit: u64,
    file: UsageFile,
    clock: Arc<dyn Clock>,
    record: Mutex<UsageRecord>,
}

impl UsageLimiter {
    pub fn new(config: &LimitsConfig) -> Self {
        Self::with_clock(config, Arc::new(LocalClock))
    }

    /// Build a limiter that reads "today" from `clock`.
    pub fn with_clock(config: &LimitsConfig, clock: Arc<dyn Clock>) -> Self {
        let file = UsageFile::new(&config.usage_path);
        let record = load_usage(&file, clock.today());
        Self {
            daily_user_limit: config.daily_user_limit,
            daily_total_limit: config.daily_total_limit,
            file,
            clock,
            record: Mutex::new(record),
        }
    }

    /// Current in-memory record, without rollover.
    pub fn record(&self) -> UsageRecord {
        *self.record.lock()
    }

    /// Check whether another call is allowed for this session.
    ///
    /// The per-session limit is checked before the global one.  Has no side
    /// effects beyond day rollover.
    pub fn check_limits(&self, session: &mut SessionContext) -> Result<(), QuotaExceeded> {
        let today = self.clock.today();
        let mut record = self.record.lock();
        self.reset_if_new_day(&mut record, session, today);
        self.evaluate(&record, session)
    }

    /// Count one call against both the session and the global total.
    ///
    /// Does not re-check limits: callers must get `Ok` from
    /// [`check_limits`](Self::check_limits) first.
    pub fn increment_usage(&self, session: &mut SessionContext) {
        let today = self.clock.today();
        let mut record = self.record.lock();
        self.apply_call(&mut record, session, today);
    }

    /// Check and, if allowed, record one call under a single lock.
    ///
    /// Two sessions racing for the last slot cannot both get `Ok`.
    pub fn try_acquire(&self, session: &mut SessionContext) -> Result<(), QuotaExceeded> {
        let today = self.clock.today();
        let mut record = self.record.lock();
        self.reset_if_new_day(&mut record, session, today);
        self.evaluate(&record, session)?;
        self.apply_call(&mut record, session, today);
        Ok(())
    }

    /// Today's usage as seen by `session`.
    pub fn usage_stats(&self, session: &mut SessionContext) -> UsageStats {
        let today = self.clock.today();
        let mut record = self.record.lock();
        self.reset_if_new_day(&mut record, session, today);
        UsageStats {
            date: record.date,
            session_calls: session.api_calls,
            daily_user_limit: self.daily_user_limit,
            total_calls: record.total_calls,
            daily_total_limit: self.daily_total_limit,
            user_ratio: session.api_calls as f64 / self.daily_user_limit as f64,
        }
    }

    // ── Private ──────────────────────────────────────────────────────

    fn evaluate(
        &self,
        record: &UsageRecord,
        session: &SessionContext,
    ) -> Result<(), QuotaExceeded> {
        let outcome = if session.api_calls >= self.daily_user_limit {
            Err(QuotaExceeded::User {
                limit: self.daily_user_limit,
            })
        } else if record.total_calls >= self.daily_total_limit {
            Err(QuotaExceeded::Total {
                limit: self.daily_total_limit,
            })
        } else {
            Ok(())
        };

        if let Err(ref exceeded) = outcome {
            tracing::warn!(
                session_key = %session.key,
                scope = exceeded.scope(),
                limit = exceeded.limit(),
                session_calls = session.api_calls,
                total_calls = record.total_calls,
                "API call rejected by daily limit"
            );
            TraceEvent::QuotaRejected {
                session_key: session.key.clone(),
                scope: exceeded.scope().to_owned(),
                limit: exceeded.limit(),
            }
            .emit();
        }

        outcome
    }

    fn apply_call(&self, record: &mut UsageRecord, session: &mut SessionContext, today: NaiveDate) {
        session.calls_date.get_or_insert(today);
        session.api_calls = session.api_calls.saturating_add(1);
        record.total_calls = record.total_calls.saturating_add(1);
        self.save(record);

        TraceEvent::UsageRecorded {
            session_key: session.key.clone(),
            session_calls: session.api_calls,
            total_calls: record.total_calls,
        }
        .emit();
    }

    fn reset_if_new_day(
        &self,
        record: &mut UsageRecord,
        session: &mut SessionContext,
        today: NaiveDate,
    ) {
        if record.date != today {
            TraceEvent::UsageRolledOver {
                previous_date: record.date,
                date: today,
                previous_total: record.total_calls,
            }
            .emit();

            *record = UsageRecord::fresh(today);
            session.reset_calls(today);
            self.save(record);
            return;
        }

        // The shared record may already have been rolled by another
        // session; this session's counter still needs its own reset.
        if session.roll_calls_to(today) {
            tracing::debug!(session_key = %session.key, "session call counter reset for new day");
        }
    }

    fn save(&self, record: &UsageRecord) {
        if let Err(e) = self.file.write(record) {
            tracing::error!(
                path = %self.file.path().display(),
                error = %e,
                total_calls = record.total_calls,
                "error saving API usage data; keeping in-memory count"
            );
        }
    }
}

impl fmt::Debug for UsageLimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UsageLimiter")
            .field("daily_user_limit", &self.daily_user_limit)
            .field("daily_total_limit", &self.daily_total_limit)
            .field("path", &self.file.path())
            .finish()
    }
}

/// Load the record, falling back to a fresh one on any failure.
fn load_usage(file: &UsageFile, today: NaiveDate) -> UsageRecord {
    let (record, fallback) = match file.read() {
        Ok(Some(record)) => (record, false),
        Ok(None) => (UsageRecord::fresh(today), false),
        Err(e) => {
            tracing::error!(
                path = %file.path().display(),
                error = %e,
                "error loading API usage data; starting from zero"
            );
            (UsageRecord::fresh(today), true)
        }
    };

    TraceEvent::UsageLoaded {
        path: file.path().display().to_string(),
        date: record.date,
        total_calls: record.total_calls,
        fallback,
    }
    .emit();

    record
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
