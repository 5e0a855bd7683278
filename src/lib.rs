//! Portfolio Auth - TOTP second factor for the portfolio admin backend
//!
//! Guards the admin login with a time-based one-time password. The password
//! check, sessions and HTTP handling belong to the host application; this
//! crate decides whether the second factor is satisfied.
//!
//! # Features
//!
//! - **Secrets**: CSPRNG-generated Base32 secrets and lenient decoding
//! - **TOTP**: RFC 6238 / RFC 4226 codes over HMAC-SHA1, windowed verification
//! - **Credentials**: one per user, with activation flag and last-verified time
//! - **Login gate**: distinguishes "code required" from "invalid code"
//!
//! Verification does not rate-limit attempts or reject replays within the
//! window; the host application must add both if it needs them.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use portfolio_auth::{ConfigBuilder, GateOutcome, InMemoryMfaStore, LoginGate, MfaAdmin};
//!
//! #[tokio::main]
//! async fn main() -> portfolio_auth::Result<()> {
//!     portfolio_auth::init_tracing();
//!
//!     let config = ConfigBuilder::new().from_env().build()?;
//!     let store = InMemoryMfaStore::new();
//!
//!     let admin = MfaAdmin::new(store.clone(), config.mfa.clone());
//!     let credential = admin.provision("admin").await?;
//!     println!("{}", credential.provisioning_uri(&config.mfa.issuer));
//!
//!     let gate = LoginGate::new(store, config.mfa);
//!     match gate.check("admin", Some("123456")).await? {
//!         GateOutcome::Allowed { .. } => println!("welcome"),
//!         refused => println!("{}", refused.message().unwrap_or_default()),
//!     }
//!     Ok(())
//! }
//! ```

pub mod auth;
mod config;
mod error;
pub mod utils;

pub use auth::{
    CredentialSummary, GateOutcome, InMemoryMfaStore, LoginGate, MfaAdmin, MfaCredential,
    MfaLoginRequest, MfaStore, Secret, TotpConfig, TotpManager, TotpSetup,
};
pub use config::{Config, ConfigBuilder, LoggingConfig};
pub use error::{AuthError, Result};

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing/logging with sensible defaults
///
/// # Environment Variables
///
/// - `RUST_LOG`: Set log level (e.g., "info", "debug", "portfolio_auth=debug")
/// - `PORTFOLIO_LOG_JSON`: Set to "true" for JSON formatted logs
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    install_subscriber(env_filter, json_logs_from_env());
}

/// Initialize tracing with a custom configuration
pub fn init_tracing_with_config(config: &Config) {
    install_subscriber(EnvFilter::new(&config.logging.level), config.logging.json);
}

/// `LOG_JSON` as a flag; unset or unparsable means plain text.
fn json_logs_from_env() -> bool {
    utils::parse_env_with_prefix::<bool>("LOG_JSON").unwrap_or(false)
}

fn install_subscriber(env_filter: EnvFilter, json: bool) {
    let registry = tracing_subscriber::registry().with(env_filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}
