//! Second-factor gate for admin login.

use crate::auth::mfa::{MfaStore, TotpConfig};
use crate::error::Result;
use chrono::{DateTime, Utc};

use super::types::{GateOutcome, MfaLoginRequest};

/// Decides whether a login that passed the password check also satisfies MFA.
///
/// - no credential, or an inactive one: allowed without a code
/// - active credential, blank code: [`GateOutcome::CodeRequired`]
/// - active credential, wrong code: [`GateOutcome::InvalidCode`]
///
/// A corrupt stored secret is returned as an error rather than an outcome.
pub struct LoginGate<S: MfaStore> {
    store: S,
    config: TotpConfig,
}

impl<S: MfaStore> LoginGate<S> {
    pub fn new(store: S, config: TotpConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &TotpConfig {
        &self.config
    }

    /// Check a deserialized login request.
    pub async fn check_request(&self, req: &MfaLoginRequest) -> Result<GateOutcome> {
        self.check(&req.username, req.token.as_deref()).await
    }

    /// Check against the current time.
    pub async fn check(&self, username: &str, token: Option<&str>) -> Result<GateOutcome> {
        self.check_at(username, token, Utc::now()).await
    }

    /// Check as if the attempt happened at `at`.
    pub async fn check_at(
        &self,
        username: &str,
        token: Option<&str>,
        at: DateTime<Utc>,
    ) -> Result<GateOutcome> {
        let mut credential = match self.store.find(username).await? {
            Some(credential) if credential.is_active() => credential,
            _ => {
                tracing::debug!(username = %username, "No active MFA, skipping code check");
                return Ok(GateOutcome::Allowed { mfa_verified: false });
            }
        };

        let token: String = token
            .unwrap_or_default()
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect();
        if token.is_empty() {
            return Ok(GateOutcome::CodeRequired);
        }

        if credential
            .verify_and_record(&self.store, &token, at, &self.config)
            .await?
        {
            tracing::info!(username = %username, "MFA code accepted");
            Ok(GateOutcome::Allowed { mfa_verified: true })
        } else {
            tracing::warn!(username = %username, "MFA code rejected");
            Ok(GateOutcome::InvalidCode)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::mfa::{InMemoryMfaStore, MfaCredential, Secret, totp};
    use crate::error::AuthError;
    use chrono::TimeZone;

    fn at(ts: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(ts, 0).unwrap()
    }

    async fn gate_with_admin() -> LoginGate<InMemoryMfaStore> {
        let store = InMemoryMfaStore::new();
        store
            .insert(MfaCredential::with_secret(
                "admin",
                Secret::parse("JBSWY3DPEHPK3PXP").unwrap(),
                at(1_700_000_000),
            ))
            .await
            .unwrap();
        LoginGate::new(store, TotpConfig::default())
    }

    #[tokio::test]
    async fn test_user_without_mfa_is_allowed() {
        let gate = gate_with_admin().await;
        let outcome = gate.check_at("other", None, at(1_700_000_100)).await.unwrap();
        assert_eq!(outcome, GateOutcome::Allowed { mfa_verified: false });
    }

    #[tokio::test]
    async fn test_inactive_mfa_is_skipped() {
        let gate = gate_with_admin().await;
        gate.store()
            .set_active("admin", false, at(1_700_000_050))
            .await
            .unwrap();

        let outcome = gate
            .check_at("admin", Some("not a code"), at(1_700_000_100))
            .await
            .unwrap();
        assert_eq!(outcome, GateOutcome::Allowed { mfa_verified: false });
    }

    #[tokio::test]
    async fn test_missing_code_is_distinct_from_wrong_code() {
        let gate = gate_with_admin().await;
        let now = at(1_700_000_100);

        assert_eq!(
            gate.check_at("admin", None, now).await.unwrap(),
            GateOutcome::CodeRequired
        );
        assert_eq!(
            gate.check_at("admin", Some("   "), now).await.unwrap(),
            GateOutcome::CodeRequired
        );
        assert_eq!(
            gate.check_at("admin", Some("abc123"), now).await.unwrap(),
            GateOutcome::InvalidCode
        );

        let stored = gate.store().find("admin").await.unwrap().unwrap();
        assert!(stored.last_verified().is_none());
    }

    #[tokio::test]
    async fn test_valid_code_is_accepted_and_recorded() {
        let gate = gate_with_admin().await;
        let now = at(1_700_000_100);
        let code = totp::code_at("JBSWY3DPEHPK3PXP", now, gate.config()).unwrap();

        let outcome = gate.check_at("admin", Some(&code), now).await.unwrap();
        assert_eq!(outcome, GateOutcome::Allowed { mfa_verified: true });

        let stored = gate.store().find("admin").await.unwrap().unwrap();
        assert_eq!(stored.last_verified(), Some(now));
    }

    struct FailingStore;

    #[async_trait::async_trait]
    impl MfaStore for FailingStore {
        async fn find(&self, _username: &str) -> Result<Option<MfaCredential>> {
            Err(AuthError::storage("connection refused"))
        }
        async fn insert(&self, _credential: MfaCredential) -> Result<()> {
            Err(AuthError::storage("connection refused"))
        }
        async fn replace(&self, _credential: MfaCredential) -> Result<()> {
            Err(AuthError::storage("connection refused"))
        }
        async fn set_active(&self, _username: &str, _active: bool, _at: DateTime<Utc>) -> Result<()> {
            Err(AuthError::storage("connection refused"))
        }
        async fn record_verified(&self, _username: &str, _at: DateTime<Utc>) -> Result<()> {
            Err(AuthError::storage("connection refused"))
        }
        async fn revoke(&self, _username: &str) -> Result<bool> {
            Err(AuthError::storage("connection refused"))
        }
        async fn list(&self) -> Result<Vec<MfaCredential>> {
            Err(AuthError::storage("connection refused"))
        }
    }

    #[tokio::test]
    async fn test_store_failure_is_an_error_not_a_pass() {
        let gate = LoginGate::new(FailingStore, TotpConfig::default());
        let err = gate.check("admin", Some("123456")).await.unwrap_err();
        assert!(matches!(err, AuthError::Storage(_)));
    }
}
