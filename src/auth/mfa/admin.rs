//! Administrator operations on MFA credentials.

use crate::auth::mfa::credential::{CredentialSummary, MfaCredential};
use crate::auth::mfa::secret::Secret;
use crate::auth::mfa::storage::MfaStore;
use crate::auth::mfa::totp::TotpConfig;
use crate::error::Result;
use chrono::Utc;

/// Provisions, toggles and revokes credentials.
pub struct MfaAdmin<S: MfaStore> {
    store: S,
    config: TotpConfig,
}

impl<S: MfaStore> MfaAdmin<S> {
    pub fn new(store: S, config: TotpConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Generate a secret for `username` and store an active credential.
    ///
    /// Fails with `Conflict` if the user already has one; revoke it first to
    /// re-provision.
    pub async fn provision(&self, username: &str) -> Result<MfaCredential> {
        let credential = self.fresh_credential(username)?;
        self.store.insert(credential.clone()).await?;
        tracing::info!(username = %username, "MFA provisioned");
        Ok(credential)
    }

    /// Replace the user's credential with one holding a new secret.
    ///
    /// The swap is a single [`MfaStore::replace`], so a storage failure keeps
    /// the old credential in force. A user without one is provisioned.
    pub async fn rotate(&self, username: &str) -> Result<MfaCredential> {
        let credential = self.fresh_credential(username)?;
        self.store.replace(credential.clone()).await?;
        tracing::info!(username = %username, "MFA secret rotated");
        Ok(credential)
    }

    fn fresh_credential(&self, username: &str) -> Result<MfaCredential> {
        self.config.validate()?;
        Ok(MfaCredential::with_secret(
            username,
            Secret::generate(self.config.secret_length)?,
            Utc::now(),
        ))
    }

    pub async fn activate(&self, username: &str) -> Result<()> {
        self.store.set_active(username, true, Utc::now()).await?;
        tracing::info!(username = %username, "MFA activated");
        Ok(())
    }

    pub async fn deactivate(&self, username: &str) -> Result<()> {
        self.store.set_active(username, false, Utc::now()).await?;
        tracing::info!(username = %username, "MFA deactivated");
        Ok(())
    }

    /// Remove the user's credential. Returns whether one existed.
    pub async fn revoke(&self, username: &str) -> Result<bool> {
        let removed = self.store.revoke(username).await?;
        if removed {
            tracing::info!(username = %username, "MFA revoked");
        }
        Ok(removed)
    }

    /// Enrollment URI for a user's current credential.
    pub async fn provisioning_uri(&self, username: &str) -> Result<Option<String>> {
        Ok(self
            .store
            .find(username)
            .await?
            .map(|credential| credential.provisioning_uri(&self.config.issuer)))
    }

    /// Summaries for the admin list.
    pub async fn summaries(&self) -> Result<Vec<CredentialSummary>> {
        Ok(self
            .store
            .list()
            .await?
            .iter()
            .map(|credential| credential.summary(&self.config.issuer))
            .collect())
    }
}
