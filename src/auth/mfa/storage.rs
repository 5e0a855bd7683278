//! MFA storage trait.

use crate::auth::mfa::credential::MfaCredential;
use crate::error::{AuthError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Trait for storing MFA credentials.
///
/// Implement this for your database layer. Credentials are keyed by
/// username and a user has at most one. Deleting a user should call
/// [`MfaStore::revoke`] for them.
///
/// # Example
///
/// ```rust,ignore
/// use portfolio_auth::auth::mfa::{MfaCredential, MfaStore};
/// use async_trait::async_trait;
///
/// struct PgMfaStore {
///     pool: PgPool,
/// }
///
/// #[async_trait]
/// impl MfaStore for PgMfaStore {
///     async fn find(&self, username: &str) -> Result<Option<MfaCredential>> {
///         // SELECT ... FROM user_mfa WHERE username = $1
///     }
///
///     // ... implement other methods
/// }
/// ```
#[async_trait]
pub trait MfaStore: Send + Sync {
    /// Get the credential for a user (None if MFA was never provisioned).
    async fn find(&self, username: &str) -> Result<Option<MfaCredential>>;

    /// Store a new credential. Fails with `Conflict` if the user already has one.
    async fn insert(&self, credential: MfaCredential) -> Result<()>;

    /// Store `credential`, replacing any the user already has.
    ///
    /// Must be atomic: if it fails, the previous credential is still in place.
    async fn replace(&self, credential: MfaCredential) -> Result<()>;

    /// Turn a user's second factor on or off.
    async fn set_active(&self, username: &str, active: bool, at: DateTime<Utc>) -> Result<()>;

    /// Write `last_verified` and nothing else.
    async fn record_verified(&self, username: &str, at: DateTime<Utc>) -> Result<()>;

    /// Remove a user's credential. Returns whether one existed.
    async fn revoke(&self, username: &str) -> Result<bool>;

    /// All credentials, ordered by username.
    async fn list(&self) -> Result<Vec<MfaCredential>>;

    /// Whether the user has an active credential.
    async fn is_active(&self, username: &str) -> Result<bool> {
        Ok(self
            .find(username)
            .await?
            .is_some_and(|credential| credential.is_active()))
    }
}

/// In-memory credential store
///
/// Suitable for development and testing; credentials are lost on restart.
#[derive(Clone, Default)]
pub struct InMemoryMfaStore {
    credentials: Arc<RwLock<HashMap<String, MfaCredential>>>,
}

impl InMemoryMfaStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MfaStore for InMemoryMfaStore {
    async fn find(&self, username: &str) -> Result<Option<MfaCredential>> {
        let credentials = self.credentials.read().await;
        Ok(credentials.get(username).cloned())
    }

    async fn insert(&self, credential: MfaCredential) -> Result<()> {
        let mut credentials = self.credentials.write().await;
        if credentials.contains_key(credential.username()) {
            return Err(AuthError::conflict(format!(
                "{} already has an MFA configuration",
                credential.username()
            )));
        }
        credentials.insert(credential.username().to_string(), credential);
        Ok(())
    }

    async fn replace(&self, credential: MfaCredential) -> Result<()> {
        let mut credentials = self.credentials.write().await;
        credentials.insert(credential.username().to_string(), credential);
        Ok(())
    }

    async fn set_active(&self, username: &str, active: bool, at: DateTime<Utc>) -> Result<()> {
        let mut credentials = self.credentials.write().await;
        let credential = credentials
            .get_mut(username)
            .ok_or_else(|| AuthError::not_found(format!("no MFA configuration for {}", username)))?;
        credential.set_active(active, at);
        Ok(())
    }

    async fn record_verified(&self, username: &str, at: DateTime<Utc>) -> Result<()> {
        let mut credentials = self.credentials.write().await;
        let credential = credentials
            .get_mut(username)
            .ok_or_else(|| AuthError::not_found(format!("no MFA configuration for {}", username)))?;
        credential.mark_verified(at);
        Ok(())
    }

    async fn revoke(&self, username: &str) -> Result<bool> {
        let mut credentials = self.credentials.write().await;
        Ok(credentials.remove(username).is_some())
    }

    async fn list(&self) -> Result<Vec<MfaCredential>> {
        let credentials = self.credentials.read().await;
        let mut all: Vec<MfaCredential> = credentials.values().cloned().collect();
        all.sort_by(|a, b| a.username().cmp(b.username()));
        Ok(all)
    }
}

/// Store whose reads go to an inner [`InMemoryMfaStore`] and whose writes all
/// fail, as a database does when it drops to read-only.
#[cfg(test)]
pub(crate) struct ReadOnlyStore(pub(crate) InMemoryMfaStore);

#[cfg(test)]
#[async_trait]
impl MfaStore for ReadOnlyStore {
    async fn find(&self, username: &str) -> Result<Option<MfaCredential>> {
        self.0.find(username).await
    }
    async fn insert(&self, _credential: MfaCredential) -> Result<()> {
        Err(AuthError::storage("read-only"))
    }
    async fn replace(&self, _credential: MfaCredential) -> Result<()> {
        Err(AuthError::storage("read-only"))
    }
    async fn set_active(&self, _username: &str, _active: bool, _at: DateTime<Utc>) -> Result<()> {
        Err(AuthError::storage("read-only"))
    }
    async fn record_verified(&self, _username: &str, _at: DateTime<Utc>) -> Result<()> {
        Err(AuthError::storage("read-only"))
    }
    async fn revoke(&self, _username: &str) -> Result<bool> {
        Err(AuthError::storage("read-only"))
    }
    async fn list(&self) -> Result<Vec<MfaCredential>> {
        self.0.list().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(ts: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(ts, 0).unwrap()
    }

    #[tokio::test]
    async fn test_insert_and_find() {
        let store = InMemoryMfaStore::new();
        let credential = MfaCredential::provision("admin", 20).unwrap();
        store.insert(credential.clone()).await.unwrap();

        assert_eq!(store.find("admin").await.unwrap(), Some(credential));
        assert_eq!(store.find("nobody").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_one_credential_per_user() {
        let store = InMemoryMfaStore::new();
        store.insert(MfaCredential::provision("admin", 20).unwrap()).await.unwrap();

        let err = store
            .insert(MfaCredential::provision("admin", 20).unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_replace_upserts() {
        let store = InMemoryMfaStore::new();
        let first = MfaCredential::provision("admin", 20).unwrap();
        store.replace(first.clone()).await.unwrap();
        assert_eq!(store.find("admin").await.unwrap(), Some(first.clone()));

        let second = MfaCredential::provision("admin", 20).unwrap();
        store.replace(second.clone()).await.unwrap();
        let stored = store.find("admin").await.unwrap().unwrap();
        assert_eq!(stored.secret(), second.secret());
        assert_ne!(stored.secret(), first.secret());
        assert_eq!(store.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_set_active() {
        let store = InMemoryMfaStore::new();
        store.insert(MfaCredential::provision("admin", 20).unwrap()).await.unwrap();
        assert!(store.is_active("admin").await.unwrap());

        store.set_active("admin", false, at(1_700_000_000)).await.unwrap();
        assert!(!store.is_active("admin").await.unwrap());
        let stored = store.find("admin").await.unwrap().unwrap();
        assert_eq!(stored.updated(), at(1_700_000_000));

        let err = store.set_active("nobody", true, at(0)).await.unwrap_err();
        assert!(matches!(err, AuthError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_record_verified_only_touches_timestamp() {
        let store = InMemoryMfaStore::new();
        let credential = MfaCredential::provision("admin", 20).unwrap();
        store.insert(credential.clone()).await.unwrap();

        store.record_verified("admin", at(1_700_000_000)).await.unwrap();
        let stored = store.find("admin").await.unwrap().unwrap();
        assert_eq!(stored.last_verified(), Some(at(1_700_000_000)));
        assert_eq!(stored.updated(), credential.updated());
        assert_eq!(stored.secret(), credential.secret());
    }

    #[tokio::test]
    async fn test_later_verification_wins() {
        let store = InMemoryMfaStore::new();
        store.insert(MfaCredential::provision("admin", 20).unwrap()).await.unwrap();

        store.record_verified("admin", at(100)).await.unwrap();
        store.record_verified("admin", at(200)).await.unwrap();
        let stored = store.find("admin").await.unwrap().unwrap();
        assert_eq!(stored.last_verified(), Some(at(200)));
    }

    #[tokio::test]
    async fn test_revoke() {
        let store = InMemoryMfaStore::new();
        store.insert(MfaCredential::provision("admin", 20).unwrap()).await.unwrap();

        assert!(store.revoke("admin").await.unwrap());
        assert!(!store.revoke("admin").await.unwrap());
        assert!(!store.is_active("admin").await.unwrap());
    }

    #[tokio::test]
    async fn test_list_sorted() {
        let store = InMemoryMfaStore::new();
        for name in ["zoe", "admin", "mike"] {
            store.insert(MfaCredential::provision(name, 20).unwrap()).await.unwrap();
        }
        let names: Vec<String> = store
            .list()
            .await
            .unwrap()
            .iter()
            .map(|c| c.username().to_string())
            .collect();
        assert_eq!(names, vec!["admin", "mike", "zoe"]);
    }
}
