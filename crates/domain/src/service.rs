//! External API services the app calls, and the credential bundles they
//! authenticate with.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// A cloud API the app holds credentials for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Service {
    /// Object storage / vision API.
    Aws,
    /// Language-model API.
    OpenAi,
}

impl Service {
    pub const ALL: [Service; 2] = [Service::Aws, Service::OpenAi];

    pub fn as_str(&self) -> &'static str {
        match self {
            Service::Aws => "aws",
            Service::OpenAi => "openai",
        }
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Service {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "aws" => Ok(Service::Aws),
            "openai" => Ok(Service::OpenAi),
            other => Err(Error::UnknownService(other.to_owned())),
        }
    }
}

/// Where a set of credentials came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialSource {
    /// Operator defaults from the environment or secrets file.
    #[default]
    Default,
    /// Supplied by the user for this session.
    User,
}

/// Credential field name to value, tagged with its source.
///
/// Values never appear in `Debug` output.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    source: CredentialSource,
    fields: BTreeMap<String, String>,
}

impl Credentials {
    pub fn new(source: CredentialSource) -> Self {
        Self {
            source,
            fields: BTreeMap::new(),
        }
    }

    /// Builder-style insert.
    pub fn with(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(field, value);
        self
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(field.into(), value.into());
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    pub fn source(&self) -> CredentialSource {
        self.source
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Field names with values masked, safe for display.
    pub fn masked(&self) -> BTreeMap<&str, String> {
        self.fields
            .iter()
            .map(|(k, v)| (k.as_str(), mask_secret(v)))
            .collect()
    }
}

// Manual Debug impl to avoid leaking credential values.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("source", &self.source)
            .field("fields", &self.fields.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Keep the first and last four characters of long secrets.
pub fn mask_secret(s: &str) -> String {
    let trimmed = s.trim();
    let n = trimmed.chars().count();
    if n <= 10 {
        return "****".to_string();
    }
    let head: String = trimmed.chars().take(4).collect();
    let tail: String = trimmed.chars().skip(n - 4).collect();
    format!("{head}...{tail}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_parses_case_insensitively() {
        assert_eq!("AWS".parse::<Service>().unwrap(), Service::Aws);
        assert_eq!(" openai ".parse::<Service>().unwrap(), Service::OpenAi);
        assert!(matches!(
            "huggingface".parse::<Service>(),
            Err(Error::UnknownService(s)) if s == "huggingface"
        ));
    }

    #[test]
    fn service_serializes_to_logical_name() {
        assert_eq!(serde_json::to_string(&Service::OpenAi).unwrap(), "\"openai\"");
        assert_eq!(serde_json::to_string(&Service::Aws).unwrap(), "\"aws\"");
    }

    #[test]
    fn debug_does_not_leak_values() {
        let creds =
            Credentials::new(CredentialSource::User).with("api_key", "sk-very-secret-value");
        let dbg = format!("{creds:?}");
        assert!(dbg.contains("api_key"));
        assert!(!dbg.contains("sk-very-secret-value"));
    }

    #[test]
    fn mask_secret_keeps_edges_of_long_values() {
        assert_eq!(mask_secret("short"), "****");
        assert_eq!(mask_secret("sk-abcdefghijklmnop"), "sk-a...mnop");
    }
}
