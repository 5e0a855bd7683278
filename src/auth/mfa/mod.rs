//! Multi-factor authentication.
//!
//! TOTP second factor for admin login: Base32 secrets, RFC 6238 code
//! generation and windowed verification, the per-user credential record and
//! its storage.
//!
//! # Example
//!
//! ```rust,ignore
//! use portfolio_auth::auth::mfa::{InMemoryMfaStore, MfaAdmin, TotpConfig};
//!
//! let admin = MfaAdmin::new(InMemoryMfaStore::new(), TotpConfig::new("Portfolio Admin"));
//! let credential = admin.provision("admin").await?;
//!
//! // Show this to the user as a QR code
//! println!("{}", credential.provisioning_uri("Portfolio Admin"));
//! ```

mod admin;
mod credential;
pub mod secret;
mod storage;
pub mod totp;

pub use admin::MfaAdmin;
pub use credential::{CredentialSummary, MfaCredential};
pub use secret::Secret;
pub use storage::{InMemoryMfaStore, MfaStore};
pub use totp::{TotpConfig, TotpManager, TotpSetup};
