//! Per-service credential selection with one-shot user credentials.
//!
//! Credentials a user types in are stored on their [`SessionContext`] and
//! handed out by the next [`CredentialProvider::get_credentials`] call for
//! that service, which also clears them.  Every other call gets the operator
//! defaults from the environment.

use std::sync::Arc;

use crowd_domain::trace::TraceEvent;
use crowd_domain::{CredentialSource, Credentials, Service};
use crowd_sessions::SessionContext;

use crate::env::EnvSource;

pub const AWS_ACCESS_KEY_ID: &str = "aws_access_key_id";
pub const AWS_SECRET_ACCESS_KEY: &str = "aws_secret_access_key";
pub const AWS_REGION_NAME: &str = "region_name";
pub const OPENAI_API_KEY: &str = "api_key";

pub struct CredentialProvider {
    env: Arc<dyn EnvSource>,
    default_region: String,
}

impl CredentialProvider {
    /// `default_region` is used when neither the user nor `AWS_REGION`
    /// names one.
    pub fn new(env: Arc<dyn EnvSource>, default_region: impl Into<String>) -> Self {
        Self {
            env,
            default_region: default_region.into(),
        }
    }

    /// Store a user-supplied language-model key.  An empty key switches the
    /// session back to operator defaults.
    pub fn submit_openai(&self, session: &mut SessionContext, api_key: &str) {
        let creds = &mut session.credentials;
        if api_key.is_empty() {
            creds.set_using_own(Service::OpenAi, false);
            return;
        }
        creds.store(
            Service::OpenAi,
            Credentials::new(CredentialSource::User).with(OPENAI_API_KEY, api_key),
        );
        creds.set_using_own(Service::OpenAi, true);
    }

    /// Store user-supplied cloud credentials.  Both keys must be non-empty;
    /// otherwise the session goes back to operator defaults.
    pub fn submit_aws(
        &self,
        session: &mut SessionContext,
        access_key_id: &str,
        secret_key: &str,
        region: Option<&str>,
    ) {
        let creds = &mut session.credentials;
        if access_key_id.is_empty() || secret_key.is_empty() {
            creds.set_using_own(Service::Aws, false);
            return;
        }
        let region = region
            .filter(|r| !r.is_empty())
            .unwrap_or(self.default_region.as_str());
        creds.store(
            Service::Aws,
            Credentials::new(CredentialSource::User)
                .with(AWS_ACCESS_KEY_ID, access_key_id)
                .with(AWS_SECRET_ACCESS_KEY, secret_key)
                .with(AWS_REGION_NAME, region),
        );
        creds.set_using_own(Service::Aws, true);
    }

    /// Credentials to use for the next call to `service`.
    ///
    /// User-supplied credentials are returned once and then cleared.
    pub fn get_credentials(&self, session: &mut SessionContext, service: Service) -> Credentials {
        if session.credentials.is_using_own(service) {
            if let Some(creds) = session.credentials.take(service) {
                TraceEvent::CredentialsConsumed {
                    session_key: session.key.clone(),
                    service: service.to_string(),
                }
                .emit();
                return creds;
            }
            tracing::warn!(
                session_key = %session.key,
                %service,
                "session flagged as using own credentials but none stored"
            );
        }
        self.defaults(service)
    }

    pub fn is_using_own_credentials(&self, session: &SessionContext, service: Service) -> bool {
        session.credentials.is_using_own(service)
    }

    /// Forget every user-supplied credential on the session.
    pub fn clear_credentials(&self, session: &mut SessionContext) {
        session.credentials.clear();
    }

    pub fn clear_service_credentials(&self, session: &mut SessionContext, service: Service) {
        session.credentials.take(service);
    }

    // ── Private ──────────────────────────────────────────────────────

    /// Operator defaults.  Unset variables leave their field out.
    fn defaults(&self, service: Service) -> Credentials {
        let mut creds = Credentials::new(CredentialSource::Default);
        match service {
            Service::Aws => {
                self.insert_var(&mut creds, AWS_ACCESS_KEY_ID, "AWS_ACCESS_KEY_ID");
                self.insert_var(&mut creds, AWS_SECRET_ACCESS_KEY, "AWS_SECRET_ACCESS_KEY");
                let region = self
                    .env
                    .var("AWS_REGION")
                    .unwrap_or_else(|| self.default_region.clone());
                creds.insert(AWS_REGION_NAME, region);
            }
            Service::OpenAi => {
                self.insert_var(&mut creds, OPENAI_API_KEY, "OPENAI_API_KEY");
            }
        }
        creds
    }

    fn insert_var(&self, creds: &mut Credentials, field: &str, var: &str) {
        if let Some(value) = self.env.var(var) {
            creds.insert(field, value);
        }
    }
}

impl std::fmt::Debug for CredentialProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialProvider")
            .field("default_region", &self.default_region)
            .finish()
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn provider() -> CredentialProvider {
        let env: HashMap<String, String> = [
            ("OPENAI_API_KEY", "sk-operator"),
            ("AWS_ACCESS_KEY_ID", "AKIAOPERATOR"),
            ("AWS_SECRET_ACCESS_KEY", "operator-secret"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        CredentialProvider::new(Arc::new(env), "eu-west-1")
    }

    #[test]
    fn defaults_come_from_environment() {
        let provider = provider();
        let mut session = SessionContext::new("a");

        let openai = provider.get_credentials(&mut session, Service::OpenAi);
        assert_eq!(openai.source(), CredentialSource::Default);
        assert_eq!(openai.get(OPENAI_API_KEY), Some("sk-operator"));

        let aws = provider.get_credentials(&mut session, Service::Aws);
        assert_eq!(aws.get(AWS_ACCESS_KEY_ID), Some("AKIAOPERATOR"));
        // AWS_REGION unset: configured default.
        assert_eq!(aws.get(AWS_REGION_NAME), Some("eu-west-1"));
    }

    #[test]
    fn user_credentials_are_consumed_once() {
        let provider = provider();
        let mut session = SessionContext::new("a");
        provider.submit_openai(&mut session, "sk-user");
        assert!(provider.is_using_own_credentials(&session, Service::OpenAi));

        let first = provider.get_credentials(&mut session, Service::OpenAi);
        assert_eq!(first.source(), CredentialSource::User);
        assert_eq!(first.get(OPENAI_API_KEY), Some("sk-user"));
        assert!(!provider.is_using_own_credentials(&session, Service::OpenAi));

        let second = provider.get_credentials(&mut session, Service::OpenAi);
        assert_eq!(second.source(), CredentialSource::Default);
        assert_eq!(second.get(OPENAI_API_KEY), Some("sk-operator"));
    }

    #[test]
    fn consuming_one_service_leaves_the_other() {
        let provider = provider();
        let mut session = SessionContext::new("a");
        provider.submit_openai(&mut session, "sk-user");
        provider.submit_aws(&mut session, "AKIAUSER", "user-secret", Some("us-west-2"));

        provider.get_credentials(&mut session, Service::OpenAi);
        assert!(provider.is_using_own_credentials(&session, Service::Aws));

        let aws = provider.get_credentials(&mut session, Service::Aws);
        assert_eq!(aws.source(), CredentialSource::User);
        assert_eq!(aws.get(AWS_SECRET_ACCESS_KEY), Some("user-secret"));
        assert_eq!(aws.get(AWS_REGION_NAME), Some("us-west-2"));
    }

    #[test]
    fn incomplete_aws_submission_uses_defaults() {
        let provider = provider();
        let mut session = SessionContext::new("a");
        provider.submit_aws(&mut session, "AKIAUSER", "", None);
        assert!(!provider.is_using_own_credentials(&session, Service::Aws));

        let aws = provider.get_credentials(&mut session, Service::Aws);
        assert_eq!(aws.source(), CredentialSource::Default);
    }

    #[test]
    fn blank_region_falls_back_to_default() {
        let provider = provider();
        let mut session = SessionContext::new("a");
        provider.submit_aws(&mut session, "AKIAUSER", "user-secret", Some(""));
        let aws = provider.get_credentials(&mut session, Service::Aws);
        assert_eq!(aws.get(AWS_REGION_NAME), Some("eu-west-1"));
    }

    #[test]
    fn empty_openai_key_switches_back_to_defaults() {
        let provider = provider();
        let mut session = SessionContext::new("a");
        provider.submit_openai(&mut session, "sk-user");
        provider.submit_openai(&mut session, "");
        let creds = provider.get_credentials(&mut session, Service::OpenAi);
        assert_eq!(creds.source(), CredentialSource::Default);
    }

    #[test]
    fn clear_credentials_drops_everything() {
        let provider = provider();
        let mut session = SessionContext::new("a");
        provider.submit_openai(&mut session, "sk-user");
        provider.submit_aws(&mut session, "AKIAUSER", "user-secret", None);

        provider.clear_credentials(&mut session);
        for service in Service::ALL {
            assert!(!provider.is_using_own_credentials(&session, service));
            assert_eq!(
                provider.get_credentials(&mut session, service).source(),
                CredentialSource::Default
            );
        }
    }

    #[test]
    fn clear_service_credentials_is_scoped() {
        let provider = provider();
        let mut session = SessionContext::new("a");
        provider.submit_openai(&mut session, "sk-user");
        provider.submit_aws(&mut session, "AKIAUSER", "user-secret", None);

        provider.clear_service_credentials(&mut session, Service::Aws);
        assert!(!provider.is_using_own_credentials(&session, Service::Aws));
        assert!(provider.is_using_own_credentials(&session, Service::OpenAi));
    }

    #[test]
    fn unset_variables_leave_fields_out() {
        let empty: HashMap<String, String> = HashMap::new();
        let provider = CredentialProvider::new(Arc::new(empty), "eu-west-1");
        let mut session = SessionContext::new("a");
        let openai = provider.get_credentials(&mut session, Service::OpenAi);
        assert!(openai.is_empty());
        let aws = provider.get_credentials(&mut session, Service::Aws);
        assert_eq!(aws.len(), 1);
        assert_eq!(aws.get(AWS_REGION_NAME), Some("eu-west-1"));
    }
}
