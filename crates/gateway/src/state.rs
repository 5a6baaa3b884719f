use std::sync::Arc;

use crowd_credentials::{CredentialLoader, CredentialProvider};
use crowd_domain::config::Config;
use crowd_quota::UsageLimiter;
use crowd_sessions::SessionStore;

/// Everything a request needs, shared across sessions.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub limiter: Arc<UsageLimiter>,
    pub loader: Arc<CredentialLoader>,
    pub credentials: Arc<CredentialProvider>,
    pub sessions: Arc<SessionStore>,
}
