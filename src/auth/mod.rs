pub mod flows;
pub mod mfa;

pub use flows::{GateOutcome, LoginGate, MfaLoginRequest};
pub use mfa::{
    CredentialSummary, InMemoryMfaStore, MfaAdmin, MfaCredential, MfaStore, Secret, TotpConfig,
    TotpManager, TotpSetup,
};
