//! Authentication flows.
//!
//! The login gate that sits after password verification and enforces the
//! TOTP second factor.

mod login;
mod types;

pub use login::LoginGate;
pub use types::*;
