mod credentials;
mod limits;

pub use credentials::*;
pub use limits::*;

use serde::{Deserialize, Serialize};
use std::fmt;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Top-level config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub limits: LimitsConfig,
    #[serde(default)]
    pub credentials: CredentialsConfig,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Config validation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Severity level for a configuration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSeverity {
    Error,
    Warning,
}

/// A single configuration validation issue.
#[derive(Debug, Clone)]
pub struct ConfigError {
    pub severity: ConfigSeverity,
    pub field: String,
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.severity {
            ConfigSeverity::Error => "ERROR",
            ConfigSeverity::Warning => "WARN",
        };
        write!(f, "[{tag}] {}: {}", self.field, self.message)
    }
}

impl Config {
    /// Validate the configuration and return a list of issues.
    ///
    /// Returns an empty vec when everything looks good.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        if self.limits.daily_user_limit == 0 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "limits.daily_user_limit".into(),
                message: "limit must be greater than 0".into(),
            });
        }

        if self.limits.daily_total_limit == 0 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "limits.daily_total_limit".into(),
                message: "limit must be greater than 0".into(),
            });
        }

        // Not enforced: a total below the per-user limit just means the
        // per-user limit is never the one that bites.
        if self.limits.daily_total_limit < self.limits.daily_user_limit {
            errors.push(ConfigError {
                severity: ConfigSeverity::Warning,
                field: "limits.daily_total_limit".into(),
                message: format!(
                    "total limit ({}) is below the per-user limit ({})",
                    self.limits.daily_total_limit, self.limits.daily_user_limit
                ),
            });
        }

        if self.limits.usage_path.as_os_str().is_empty() {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "limits.usage_path".into(),
                message: "usage_path must not be empty".into(),
            });
        }

        if self.credentials.env_files.is_empty() {
            errors.push(ConfigError {
                severity: ConfigSeverity::Warning,
                field: "credentials.env_files".into(),
                message: "no .env candidates configured; only the secrets file and \
                          process environment will be used"
                    .into(),
            });
        }

        if self.credentials.default_aws_region.trim().is_empty() {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "credentials.default_aws_region".into(),
                message: "default_aws_region must not be empty".into(),
            });
        }

        errors
    }
}
