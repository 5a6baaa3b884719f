//! Per-client session state for crowdcount.
//!
//! A [`SessionContext`] carries everything one connected client owns: its
//! API call counter for today, whether operator credentials were loaded for
//! it, and any credentials the user typed in.  The [`SessionStore`] keeps
//! the live contexts in memory; nothing here is persisted.

pub mod context;
pub mod store;

pub use context::{SessionContext, SessionCredentials};
pub use store::SessionStore;
