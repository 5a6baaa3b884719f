use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// API usage limits
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Daily API call limits and the file the shared counter is kept in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Maximum accepted calls per session per calendar day.
    #[serde(default = "d_user_limit")]
    pub daily_user_limit: u64,
    /// Maximum accepted calls across all sessions per calendar day.
    #[serde(default = "d_total_limit")]
    pub daily_total_limit: u64,
    #[serde(default = "d_usage_path")]
    pub usage_path: PathBuf,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            daily_user_limit: d_user_limit(),
            daily_total_limit: d_total_limit(),
            usage_path: d_usage_path(),
        }
    }
}

fn d_user_limit() -> u64 {
    10
}
fn d_total_limit() -> u64 {
    100
}
fn d_usage_path() -> PathBuf {
    PathBuf::from("api_usage.json")
}
