//! Request and outcome types for the login gate.

use serde::{Deserialize, Serialize};

/// Second-factor part of a login attempt.
///
/// The password has already been checked by the time this reaches the gate.
#[derive(Debug, Clone, Deserialize)]
pub struct MfaLoginRequest {
    /// The user who passed the password check.
    pub username: String,
    /// One-time code from the authenticator app, if the form had one.
    #[serde(default)]
    pub token: Option<String>,
}

/// What the gate decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum GateOutcome {
    /// Login may proceed.
    Allowed {
        /// True when a code was checked, false when the user has no active MFA.
        mfa_verified: bool,
    },
    /// MFA is active and no code was supplied.
    CodeRequired,
    /// A code was supplied and did not match.
    InvalidCode,
}

impl GateOutcome {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed { .. })
    }

    /// Machine-readable reason for a refusal.
    pub fn error_code(&self) -> Option<&'static str> {
        match self {
            Self::Allowed { .. } => None,
            Self::CodeRequired => Some("mfa_required"),
            Self::InvalidCode => Some("invalid_mfa"),
        }
    }

    /// Message for the login form.
    pub fn message(&self) -> Option<&'static str> {
        match self {
            Self::Allowed { .. } => None,
            Self::CodeRequired => Some("Enter the code from your authenticator app to continue."),
            Self::InvalidCode => {
                Some("The authentication code you entered is invalid or has expired.")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refusals_are_distinct() {
        assert_ne!(
            GateOutcome::CodeRequired.message(),
            GateOutcome::InvalidCode.message()
        );
        assert_eq!(GateOutcome::CodeRequired.error_code(), Some("mfa_required"));
        assert_eq!(GateOutcome::InvalidCode.error_code(), Some("invalid_mfa"));
        assert!(GateOutcome::Allowed { mfa_verified: false }.message().is_none());
    }

    #[test]
    fn test_serialize_outcome() {
        let json = serde_json::to_value(GateOutcome::Allowed { mfa_verified: true }).unwrap();
        assert_eq!(json, serde_json::json!({"status": "allowed", "mfa_verified": true}));

        let json = serde_json::to_value(GateOutcome::CodeRequired).unwrap();
        assert_eq!(json, serde_json::json!({"status": "code_required"}));
    }

    #[test]
    fn test_deserialize_request_without_token() {
        let req: MfaLoginRequest = serde_json::from_str(r#"{"username": "admin"}"#).unwrap();
        assert_eq!(req.username, "admin");
        assert!(req.token.is_none());
    }
}
