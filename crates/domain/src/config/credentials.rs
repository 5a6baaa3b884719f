use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Environment variable names that must resolve before the app can serve
/// requests.
pub const REQUIRED_CREDENTIALS: &[&str] = &[
    "OPENAI_API_KEY",
    "AWS_ACCESS_KEY_ID",
    "AWS_SECRET_ACCESS_KEY",
    "AWS_REGION",
    "HUGGINGFACE_TOKEN",
];

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Operator credential sources
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialsConfig {
    /// `.env` candidates, tried in order; the first one that exists wins.
    #[serde(default = "d_env_files")]
    pub env_files: Vec<PathBuf>,
    /// Flat TOML table of secrets, consulted only when no `.env` file exists.
    #[serde(default = "d_secrets_path")]
    pub secrets_path: PathBuf,
    /// Region used when neither the user nor `AWS_REGION` supplies one.
    #[serde(default = "d_region")]
    pub default_aws_region: String,
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            env_files: d_env_files(),
            secrets_path: d_secrets_path(),
            default_aws_region: d_region(),
        }
    }
}

fn d_env_files() -> Vec<PathBuf> {
    vec![PathBuf::from(".env"), PathBuf::from("../.env")]
}
fn d_secrets_path() -> PathBuf {
    PathBuf::from("secrets.toml")
}
fn d_region() -> String {
    "eu-west-1".into()
}
