//! Daily API call quota for crowdcount.
//!
//! [`UsageLimiter`] enforces two limits per calendar day: one per client
//! session and one across all sessions.  The cross-session counter lives in
//! a small JSON file ([`UsageFile`]) so it survives restarts; the per-session
//! counter lives in the caller's [`SessionContext`](crowd_sessions::SessionContext).
//! Both reset lazily the first time they are touched on a new day.

pub mod clock;
pub mod limiter;
pub mod record;

pub use clock::{Clock, FixedClock, LocalClock};
pub use limiter::{QuotaExceeded, UsageLimiter, UsageStats};
pub use record::{UsageFile, UsageRecord};
