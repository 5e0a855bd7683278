//! Base32 shared secrets.
//!
//! Secrets are generated from the operating system's CSPRNG and kept in their
//! RFC 4648 Base32 form without padding, which is what authenticator apps
//! expect in an `otpauth://` URI and what a person can type by hand.

use crate::error::{AuthError, Result};
use data_encoding::{BASE32_NOPAD, Encoding, Specification};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default number of random bytes in a generated secret.
pub const DEFAULT_SECRET_LENGTH: usize = 32;

/// Generate a new Base32 secret from `length_bytes` random bytes.
///
/// The result has its trailing `=` padding stripped.
///
/// # Errors
///
/// Returns [`AuthError::InvalidConfig`] when `length_bytes` is zero.
pub fn generate(length_bytes: usize) -> Result<String> {
    if length_bytes == 0 {
        return Err(AuthError::invalid_config(
            "secret length must be at least one byte",
        ));
    }
    let mut raw = vec![0u8; length_bytes];
    rand::rngs::OsRng.fill_bytes(&mut raw);
    Ok(BASE32_NOPAD.encode(&raw))
}

/// RFC 4648 Base32 that ignores the unused bits of the final symbol.
///
/// `JBUR` and `JBUQ` both decode to `Hi`.
fn lenient_base32() -> Result<Encoding> {
    let mut spec = Specification::new();
    spec.symbols.push_str("ABCDEFGHIJKLMNOPQRSTUVWXYZ234567");
    spec.padding = Some('=');
    spec.check_trailing_bits = false;
    spec.encoding()
        .map_err(|e| AuthError::internal(format!("Base32 specification: {}", e)))
}

/// Decode a Base32 secret as typed or stored into raw key bytes.
///
/// Whitespace is removed, letters are upper-cased and padding is re-applied
/// before decoding, so `"jbsw y3dp ehpk 3pxp"` and `"JBSWY3DPEHPK3PXP"` decode
/// to the same key. Leftover bits in the last symbol are dropped.
///
/// # Errors
///
/// Returns [`AuthError::Decode`] when the input contains characters outside
/// the Base32 alphabet or has an impossible length.
pub fn normalize(input: &str) -> Result<Vec<u8>> {
    let mut cleaned: String = input
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| c.to_ascii_uppercase())
        .collect();

    let missing_padding = (8 - cleaned.len() % 8) % 8;
    cleaned.extend(std::iter::repeat_n('=', missing_padding));

    Ok(lenient_base32()?.decode(cleaned.as_bytes())?)
}

/// A Base32-encoded shared secret.
///
/// Holds the canonical form: upper-case, no whitespace, no padding. The value
/// never appears in `Debug` output.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Secret(String);

impl Secret {
    /// Generate a fresh secret of `length_bytes` random bytes.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidConfig`] when `length_bytes` is zero.
    pub fn generate(length_bytes: usize) -> Result<Self> {
        generate(length_bytes).map(Self)
    }

    /// Parse a secret typed by a person or loaded from storage.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Decode`] if the value is not valid Base32 or
    /// decodes to an empty key.
    pub fn parse(input: &str) -> Result<Self> {
        let raw = normalize(input)?;
        if raw.is_empty() {
            return Err(AuthError::decode("secret is empty"));
        }
        Ok(Self(BASE32_NOPAD.encode(&raw)))
    }

    /// The Base32 text of the secret.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Decode to raw key bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        normalize(&self.0)
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Secret")
            .field("len", &self.0.len())
            .finish_non_exhaustive()
    }
}

impl TryFrom<String> for Secret {
    type Error = AuthError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<Secret> for String {
    fn from(secret: Secret) -> Self {
        secret.0
    }
}
