use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};

use crowd_domain::{Credentials, Service};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Session context
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// State owned by a single client session.
///
/// Passed explicitly to every limiter and credential operation.
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub key: String,
    pub created_at: DateTime<Utc>,
    /// Calls attributed to this session today.
    pub api_calls: u64,
    /// Day `api_calls` belongs to.  `None` until the session first touches
    /// the limiter.
    pub calls_date: Option<NaiveDate>,
    /// Set once operator credentials have been loaded for this session.
    pub credentials_loaded: bool,
    pub credentials: SessionCredentials,
}

impl SessionContext {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            created_at: Utc::now(),
            api_calls: 0,
            calls_date: None,
            credentials_loaded: false,
            credentials: SessionCredentials::default(),
        }
    }

    /// Align the call counter with `today`, zeroing it if it belongs to an
    /// earlier day.  Returns `true` when the counter was reset.
    pub fn roll_calls_to(&mut self, today: NaiveDate) -> bool {
        let stale = matches!(self.calls_date, Some(d) if d != today);
        if stale {
            self.api_calls = 0;
        }
        self.calls_date = Some(today);
        stale
    }

    /// Zero the call counter for `today` unconditionally.
    pub fn reset_calls(&mut self, today: NaiveDate) {
        self.api_calls = 0;
        self.calls_date = Some(today);
    }
}

/// Credentials the user supplied for this session, per service.
#[derive(Debug, Clone, Default)]
pub struct SessionCredentials {
    using_own: HashMap<Service, bool>,
    user: HashMap<Service, Credentials>,
}

impl SessionCredentials {
    pub fn is_using_own(&self, service: Service) -> bool {
        self.using_own.get(&service).copied().unwrap_or(false)
    }

    pub fn set_using_own(&mut self, service: Service, using: bool) {
        self.using_own.insert(service, using);
    }

    pub fn user(&self, service: Service) -> Option<&Credentials> {
        self.user.get(&service)
    }

    pub fn store(&mut self, service: Service, credentials: Credentials) {
        self.user.insert(service, credentials);
    }

    /// Remove the user's credentials for `service`, returning them.
    pub fn take(&mut self, service: Service) -> Option<Credentials> {
        self.using_own.insert(service, false);
        self.user.remove(&service)
    }

    pub fn clear(&mut self) {
        self.using_own.clear();
        self.user.clear();
    }
}
