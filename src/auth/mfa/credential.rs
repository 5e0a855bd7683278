//! Per-user MFA credential.

use crate::auth::mfa::secret::Secret;
use crate::auth::mfa::storage::MfaStore;
use crate::auth::mfa::totp::{self, TotpConfig};
use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A user's TOTP secret together with its activation state.
///
/// One credential per user. The secret is fixed for the life of the
/// credential; rotating it means provisioning a new credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MfaCredential {
    username: String,
    secret: Secret,
    is_active: bool,
    created: DateTime<Utc>,
    updated: DateTime<Utc>,
    last_verified: Option<DateTime<Utc>>,
}

impl MfaCredential {
    /// Provision a new, active credential with a freshly generated secret.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidConfig`](crate::AuthError::InvalidConfig)
    /// when `secret_length` is zero.
    pub fn provision(username: impl Into<String>, secret_length: usize) -> Result<Self> {
        Ok(Self::with_secret(
            username,
            Secret::generate(secret_length)?,
            Utc::now(),
        ))
    }

    /// Build a new, active credential around an existing secret.
    pub fn with_secret(username: impl Into<String>, secret: Secret, now: DateTime<Utc>) -> Self {
        Self {
            username: username.into(),
            secret,
            is_active: true,
            created: now,
            updated: now,
            last_verified: None,
        }
    }

    /// Rebuild a credential loaded from storage.
    pub fn restore(
        username: impl Into<String>,
        secret: Secret,
        is_active: bool,
        created: DateTime<Utc>,
        updated: DateTime<Utc>,
        last_verified: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            username: username.into(),
            secret,
            is_active,
            created,
            updated,
            last_verified,
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn secret(&self) -> &Secret {
        &self.secret
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn created(&self) -> DateTime<Utc> {
        self.created
    }

    pub fn updated(&self) -> DateTime<Utc> {
        self.updated
    }

    pub fn last_verified(&self) -> Option<DateTime<Utc>> {
        self.last_verified
    }

    /// Turn the second factor on or off.
    pub fn set_active(&mut self, active: bool, now: DateTime<Utc>) {
        self.is_active = active;
        self.updated = now;
    }

    /// Record a successful verification. Leaves `updated` alone.
    pub(crate) fn mark_verified(&mut self, at: DateTime<Utc>) {
        self.last_verified = Some(at);
    }

    /// Enrollment URI for an authenticator app.
    pub fn provisioning_uri(&self, issuer: &str) -> String {
        totp::provisioning_uri(self.secret.as_str(), issuer, &self.username)
    }

    /// Whether `submitted` is accepted at instant `at`. Changes nothing.
    pub fn matches_at(&self, submitted: &str, at: DateTime<Utc>, config: &TotpConfig) -> Result<bool> {
        totp::verify_at(self.secret.as_str(), submitted, at, config)
    }

    /// Check `submitted` at instant `at` and record the success in memory.
    ///
    /// A failed check changes nothing.
    pub fn verify_at(&mut self, submitted: &str, at: DateTime<Utc>, config: &TotpConfig) -> Result<bool> {
        if !self.matches_at(submitted, at, config)? {
            return Ok(false);
        }
        self.mark_verified(at);
        Ok(true)
    }

    /// Check `submitted` at instant `at` and persist `last_verified` on success.
    ///
    /// The store is written before `self`, so a storage error leaves both
    /// unchanged. Only the timestamp is written. Two concurrent successes both
    /// write it and the later write wins.
    pub async fn verify_and_record<S>(
        &mut self,
        store: &S,
        submitted: &str,
        at: DateTime<Utc>,
        config: &TotpConfig,
    ) -> Result<bool>
    where
        S: MfaStore + ?Sized,
    {
        if !self.matches_at(submitted, at, config)? {
            return Ok(false);
        }
        store.record_verified(&self.username, at).await?;
        self.mark_verified(at);
        Ok(true)
    }

    /// Check `submitted` against the wall clock and persist on success.
    pub async fn verify<S>(&mut self, store: &S, submitted: &str, config: &TotpConfig) -> Result<bool>
    where
        S: MfaStore + ?Sized,
    {
        self.verify_and_record(store, submitted, Utc::now(), config).await
    }

    /// Admin listing view of this credential.
    pub fn summary(&self, issuer: &str) -> CredentialSummary {
        CredentialSummary {
            username: self.username.clone(),
            is_active: self.is_active,
            last_verified: self.last_verified,
            updated: self.updated,
            provisioning_uri: self.provisioning_uri(issuer),
        }
    }
}

impl fmt::Display for MfaCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MFA configuration for {}", self.username)
    }
}

/// What the admin list shows for one credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CredentialSummary {
    pub username: String,
    pub is_active: bool,
    pub last_verified: Option<DateTime<Utc>>,
    pub updated: DateTime<Utc>,
    pub provisioning_uri: String,
}
