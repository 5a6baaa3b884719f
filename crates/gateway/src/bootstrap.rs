//! AppState construction shared by every CLI command.

use std::sync::Arc;

use crowd_credentials::{CredentialLoader, CredentialProvider};
use crowd_domain::config::{Config, ConfigSeverity};
use crowd_quota::UsageLimiter;
use crowd_sessions::SessionStore;

use crate::state::AppState;

/// Validate config and return a fully-wired [`AppState`].
///
/// Config warnings are logged; errors abort.
pub fn build_app_state(config: Arc<Config>) -> anyhow::Result<AppState> {
    // ── Config validation ────────────────────────────────────────────
    let issues = config.validate();
    for issue in &issues {
        match issue.severity {
            ConfigSeverity::Warning => tracing::warn!("config: {issue}"),
            ConfigSeverity::Error => tracing::error!("config: {issue}"),
        }
    }
    if issues.iter().any(|i| i.severity == ConfigSeverity::Error) {
        anyhow::bail!(
            "config validation failed with {} error(s)",
            issues
                .iter()
                .filter(|i| i.severity == ConfigSeverity::Error)
                .count()
        );
    }

    Ok(state_for_diagnostics(config))
}

/// Wire an [`AppState`] without validating the config first, so `doctor`
/// can report on a broken setup.
pub fn state_for_diagnostics(config: Arc<Config>) -> AppState {
    // ── Usage limiter ────────────────────────────────────────────────
    let limiter = Arc::new(UsageLimiter::new(&config.limits));
    tracing::info!(
        path = %config.limits.usage_path.display(),
        daily_user_limit = config.limits.daily_user_limit,
        daily_total_limit = config.limits.daily_total_limit,
        "usage limiter ready"
    );

    // ── Credentials ──────────────────────────────────────────────────
    let loader = Arc::new(CredentialLoader::new(config.credentials.clone()));
    let credentials = Arc::new(CredentialProvider::new(
        loader.clone(),
        config.credentials.default_aws_region.clone(),
    ));

    AppState {
        config,
        limiter,
        loader,
        credentials,
        sessions: Arc::new(SessionStore::new()),
    }
}
