/// The error type for MFA provisioning, verification and storage
///
/// A submitted code that does not match is not an error: verification
/// reports it as `Ok(false)`.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid secret: {0}")]
    Decode(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthError {
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Returns a message safe to show to the person at the login form.
    ///
    /// Secret decoding and storage failures are operator problems; their
    /// details stay in the logs.
    pub fn safe_message(&self) -> String {
        match self {
            Self::NotFound(msg) => format!("Not found: {}", msg),
            Self::Conflict(msg) => format!("Conflict: {}", msg),
            Self::InvalidConfig(_) | Self::Decode(_) | Self::Storage(_) | Self::Internal(_) => {
                "Internal server error".to_string()
            }
        }
    }
}

impl From<data_encoding::DecodeError> for AuthError {
    fn from(err: data_encoding::DecodeError) -> Self {
        AuthError::Decode(format!("Base32 decoding failed: {}", err))
    }
}

/// Result type alias for this crate
pub type Result<T> = std::result::Result<T, AuthError>;
