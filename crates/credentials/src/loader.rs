//! One-time loading of operator credentials.
//!
//! Resolution order on the first [`CredentialLoader::load`] of a session:
//! 1. the first configured `.env` candidate that exists (its values never
//!    shadow variables already set in the process environment),
//! 2. otherwise the secrets file, whose values for the required names do
//!    override the process environment,
//! 3. then every name in [`REQUIRED_CREDENTIALS`] must resolve, or loading
//!    fails with [`Error::MissingCredentials`].

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;

use crowd_domain::config::{CredentialsConfig, REQUIRED_CREDENTIALS};
use crowd_domain::error::{Error, Result};
use crowd_domain::trace::TraceEvent;
use crowd_sessions::SessionContext;

use crate::env::{EnvSource, ProcessEnv};

/// Where a successful [`CredentialLoader::load`] took its values from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOrigin {
    /// The session had already loaded; nothing was done.
    AlreadyLoaded,
    EnvFile(PathBuf),
    SecretsFile(PathBuf),
    /// Neither file was usable; the process environment had everything.
    ProcessEnv,
}

impl LoadOrigin {
    fn label(&self) -> String {
        match self {
            LoadOrigin::AlreadyLoaded => "already_loaded".into(),
            LoadOrigin::EnvFile(p) => format!("env_file:{}", p.display()),
            LoadOrigin::SecretsFile(p) => format!("secrets_file:{}", p.display()),
            LoadOrigin::ProcessEnv => "process_env".into(),
        }
    }
}

/// Loads operator credentials and serves them as an [`EnvSource`].
///
/// Lookups consult values loaded from files first, then the base source
/// (the process environment unless overridden).
pub struct CredentialLoader {
    config: CredentialsConfig,
    base: Arc<dyn EnvSource>,
    loaded: RwLock<HashMap<String, String>>,
}

impl CredentialLoader {
    pub fn new(config: CredentialsConfig) -> Self {
        Self::with_base(config, Arc::new(ProcessEnv))
    }

    /// Use `base` instead of the process environment underneath the
    /// file-loaded values.
    pub fn with_base(config: CredentialsConfig, base: Arc<dyn EnvSource>) -> Self {
        Self {
            config,
            base,
            loaded: RwLock::new(HashMap::new()),
        }
    }

    /// Load operator credentials for this session.
    ///
    /// A no-op once it has succeeded for the session.  Fails only when a
    /// required credential is still missing afterwards (or a `.env` file
    /// exists but cannot be parsed); the session is then left unloaded so
    /// the next attempt retries.
    pub fn load(&self, session: &mut SessionContext) -> Result<LoadOrigin> {
        if session.credentials_loaded {
            return Ok(LoadOrigin::AlreadyLoaded);
        }

        let origin = match self.find_env_file() {
            Some(path) => {
                self.load_env_file(&path)?;
                tracing::info!(path = %path.display(), "loaded .env file");
                LoadOrigin::EnvFile(path)
            }
            None => {
                tracing::info!("no .env file found in any configured location");
                if self.load_secrets_file() {
                    LoadOrigin::SecretsFile(self.config.secrets_path.clone())
                } else {
                    LoadOrigin::ProcessEnv
                }
            }
        };

        let missing = self.missing_required();
        if !missing.is_empty() {
            tracing::error!(missing = %missing.join(", "), "missing credentials");
            return Err(Error::MissingCredentials(
                missing.into_iter().map(String::from).collect(),
            ));
        }

        session.credentials_loaded = true;
        TraceEvent::CredentialsLoaded {
            session_key: session.key.clone(),
            origin: origin.label(),
        }
        .emit();

        Ok(origin)
    }

    /// Required credential names that do not currently resolve.
    pub fn missing_required(&self) -> Vec<&'static str> {
        REQUIRED_CREDENTIALS
            .iter()
            .copied()
            .filter(|name| self.var(name).is_none())
            .collect()
    }

    /// `true` when every required credential resolves.  Logs the missing
    /// names otherwise.
    pub fn check_required_present(&self) -> bool {
        let missing = self.missing_required();
        if missing.is_empty() {
            return true;
        }
        tracing::error!(missing = %missing.join(", "), "missing credentials");
        false
    }

    // ── Private ──────────────────────────────────────────────────────

    fn find_env_file(&self) -> Option<PathBuf> {
        self.config
            .env_files
            .iter()
            .find(|p| p.is_file())
            .cloned()
    }

    fn load_env_file(&self, path: &Path) -> Result<()> {
        let iter = dotenv::from_path_iter(path)
            .map_err(|e| Error::Config(format!("reading {}: {e}", path.display())))?;

        let mut loaded = self.loaded.write();
        for item in iter {
            let (key, value) =
                item.map_err(|e| Error::Config(format!("parsing {}: {e}", path.display())))?;
            // Like dotenv itself: never shadow the real environment.
            if self.base.var(&key).is_none() {
                loaded.insert(key, value);
            }
        }
        Ok(())
    }

    /// Copy required names out of the secrets file.  Returns `false` when
    /// the file is absent or unusable; that is reported, not fatal.
    fn load_secrets_file(&self) -> bool {
        let path = &self.config.secrets_path;
        if !path.is_file() {
            return false;
        }

        let table = match std::fs::read_to_string(path)
            .map_err(|e| e.to_string())
            .and_then(|raw| raw.parse::<toml::Table>().map_err(|e| e.to_string()))
        {
            Ok(table) => table,
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "couldn't load secrets file");
                return false;
            }
        };

        let mut loaded = self.loaded.write();
        for name in REQUIRED_CREDENTIALS {
            if let Some(value) = table.get(*name).and_then(|v| v.as_str()) {
                loaded.insert((*name).to_owned(), value.to_owned());
            }
        }
        true
    }
}

impl EnvSource for CredentialLoader {
    fn var(&self, name: &str) -> Option<String> {
        if let Some(value) = self.loaded.read().get(name).filter(|v| !v.is_empty()) {
            return Some(value.clone());
        }
        self.base.var(name)
    }
}

impl std::fmt::Debug for CredentialLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialLoader")
            .field("config", &self.config)
            .field("loaded_keys", &self.loaded.read().len())
            .finish()
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;

    const FULL_ENV: &str = "OPENAI_API_KEY=sk-test\n\
                            AWS_ACCESS_KEY_ID=AKIATEST\n\
                            AWS_SECRET_ACCESS_KEY=secret\n\
                            AWS_REGION=eu-west-1\n\
                            HUGGINGFACE_TOKEN=hf_test\n";

    fn config_in(dir: &Path) -> CredentialsConfig {
        CredentialsConfig {
            env_files: vec![dir.join("missing.env"), dir.join(".env")],
            secrets_path: dir.join("secrets.toml"),
            default_aws_region: "eu-west-1".into(),
        }
    }

    fn empty_base() -> Arc<dyn EnvSource> {
        Arc::new(HashMap::<String, String>::new())
    }

    #[test]
    fn loads_first_existing_env_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(".env"), FULL_ENV).unwrap();
        let loader = CredentialLoader::with_base(config_in(dir.path()), empty_base());
        let mut session = SessionContext::new("a");

        let origin = loader.load(&mut session).unwrap();
        assert_eq!(origin, LoadOrigin::EnvFile(dir.path().join(".env")));
        assert!(session.credentials_loaded);
        assert_eq!(loader.var("OPENAI_API_KEY").as_deref(), Some("sk-test"));
        assert!(loader.check_required_present());
    }

    #[test]
    fn second_load_is_a_noop() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(".env"), FULL_ENV).unwrap();
        let loader = CredentialLoader::with_base(config_in(dir.path()), empty_base());
        let mut session = SessionContext::new("a");

        loader.load(&mut session).unwrap();
        std::fs::remove_file(dir.path().join(".env")).unwrap();
        assert_eq!(loader.load(&mut session).unwrap(), LoadOrigin::AlreadyLoaded);
    }

    #[test]
    fn env_file_does_not_shadow_base_environment() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(".env"), FULL_ENV).unwrap();
        let base: HashMap<String, String> =
            [("OPENAI_API_KEY".to_string(), "sk-from-process".to_string())].into();
        let loader = CredentialLoader::with_base(config_in(dir.path()), Arc::new(base));

        loader.load(&mut SessionContext::new("a")).unwrap();
        assert_eq!(loader.var("OPENAI_API_KEY").as_deref(), Some("sk-from-process"));
        assert_eq!(loader.var("HUGGINGFACE_TOKEN").as_deref(), Some("hf_test"));
    }

    #[test]
    fn falls_back_to_secrets_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("secrets.toml"),
            r#"
OPENAI_API_KEY = "sk-secret"
AWS_ACCESS_KEY_ID = "AKIASECRET"
AWS_SECRET_ACCESS_KEY = "shh"
AWS_REGION = "us-east-1"
HUGGINGFACE_TOKEN = "hf_secret"
UNRELATED = "ignored"
"#,
        )
        .unwrap();
        let loader = CredentialLoader::with_base(config_in(dir.path()), empty_base());

        let origin = loader.load(&mut SessionContext::new("a")).unwrap();
        assert_eq!(origin, LoadOrigin::SecretsFile(dir.path().join("secrets.toml")));
        assert_eq!(loader.var("AWS_REGION").as_deref(), Some("us-east-1"));
        assert!(loader.var("UNRELATED").is_none());
    }

    #[test]
    fn missing_required_blocks_and_leaves_session_unloaded() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(".env"), "OPENAI_API_KEY=sk-test\n").unwrap();
        let loader = CredentialLoader::with_base(config_in(dir.path()), empty_base());
        let mut session = SessionContext::new("a");

        let err = loader.load(&mut session).unwrap_err();
        match err {
            Error::MissingCredentials(names) => {
                assert!(names.contains(&"AWS_ACCESS_KEY_ID".to_string()));
                assert!(names.contains(&"HUGGINGFACE_TOKEN".to_string()));
                assert!(!names.contains(&"OPENAI_API_KEY".to_string()));
            }
            other => panic!("expected MissingCredentials, got {other:?}"),
        }
        assert!(!session.credentials_loaded);
        assert!(!loader.check_required_present());
    }

    #[test]
    fn unparseable_secrets_file_is_not_fatal_when_env_has_everything() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("secrets.toml"), "this is = = not toml").unwrap();
        let base: HashMap<String, String> = REQUIRED_CREDENTIALS
            .iter()
            .map(|n| (n.to_string(), "x".to_string()))
            .collect();
        let loader = CredentialLoader::with_base(config_in(dir.path()), Arc::new(base));

        let origin = loader.load(&mut SessionContext::new("a")).unwrap();
        assert_eq!(origin, LoadOrigin::ProcessEnv);
    }

    #[test]
    fn empty_values_count_as_missing() {
        let base: HashMap<String, String> = REQUIRED_CREDENTIALS
            .iter()
            .map(|n| (n.to_string(), String::new()))
            .collect();
        let dir = tempfile::tempdir().unwrap();
        let loader = CredentialLoader::with_base(config_in(dir.path()), Arc::new(base));
        assert_eq!(loader.missing_required().len(), REQUIRED_CREDENTIALS.len());
    }
}
