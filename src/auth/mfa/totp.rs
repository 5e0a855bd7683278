//! TOTP (Time-based One-Time Password) support.
//!
//! RFC 6238 codes over HMAC-SHA1 with RFC 4226 dynamic truncation, the
//! combination every common authenticator app expects.
//!
//! Verification accepts `valid_window` steps on either side of the current
//! counter. There is no replay protection or rate limiting here: a code that
//! was accepted stays acceptable until it leaves the window, and repeated
//! guesses are not throttled. Callers that need either must add it around
//! [`verify`].

use crate::auth::mfa::secret::{self, DEFAULT_SECRET_LENGTH};
use crate::error::{AuthError, Result};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha1::Sha1;
use subtle::ConstantTimeEq;

type HmacSha1 = Hmac<Sha1>;

/// Default number of digits in a code.
pub const DEFAULT_DIGITS: u32 = 6;
/// Default seconds per counter step.
pub const DEFAULT_TIME_STEP: u64 = 30;
/// Default number of steps accepted on either side of the current one.
pub const DEFAULT_VALID_WINDOW: u32 = 1;
/// Default issuer shown in authenticator apps.
pub const DEFAULT_ISSUER: &str = "Portfolio Admin";

/// Largest accepted `valid_window`. Each step costs two HMACs per check and
/// widens the set of accepted codes.
pub const MAX_VALID_WINDOW: u32 = 10;

const MIN_DIGITS: u32 = 6;
const MAX_DIGITS: u32 = 8;

/// Configuration for TOTP generation and verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TotpConfig {
    /// Issuer name shown in authenticator apps.
    #[serde(default = "default_issuer")]
    pub issuer: String,
    /// Number of digits in the code (default: 6).
    #[serde(default = "default_digits")]
    pub digits: u32,
    /// Time step in seconds (default: 30).
    #[serde(default = "default_time_step")]
    pub time_step: u64,
    /// Steps accepted before and after the current one (default: 1).
    #[serde(default = "default_valid_window")]
    pub valid_window: u32,
    /// Random bytes per generated secret (default: 32).
    #[serde(default = "default_secret_length")]
    pub secret_length: usize,
}

impl Default for TotpConfig {
    fn default() -> Self {
        Self {
            issuer: default_issuer(),
            digits: default_digits(),
            time_step: default_time_step(),
            valid_window: default_valid_window(),
            secret_length: default_secret_length(),
        }
    }
}

fn default_issuer() -> String {
    DEFAULT_ISSUER.to_string()
}

fn default_digits() -> u32 {
    DEFAULT_DIGITS
}

fn default_time_step() -> u64 {
    DEFAULT_TIME_STEP
}

fn default_valid_window() -> u32 {
    DEFAULT_VALID_WINDOW
}

fn default_secret_length() -> usize {
    DEFAULT_SECRET_LENGTH
}

impl TotpConfig {
    /// Create a new TOTP config with the given issuer name.
    pub fn new(issuer: impl Into<String>) -> Self {
        Self {
            issuer: issuer.into(),
            ..Default::default()
        }
    }

    /// Set the number of digits.
    pub fn digits(mut self, digits: u32) -> Self {
        self.digits = digits;
        self
    }

    /// Set the time step in seconds.
    pub fn time_step(mut self, time_step: u64) -> Self {
        self.time_step = time_step;
        self
    }

    /// Set how many steps either side of the current one are accepted.
    pub fn valid_window(mut self, valid_window: u32) -> Self {
        self.valid_window = valid_window;
        self
    }

    /// Set the number of random bytes in generated secrets.
    pub fn secret_length(mut self, secret_length: usize) -> Self {
        self.secret_length = secret_length;
        self
    }

    /// Check the settings are usable.
    pub fn validate(&self) -> Result<()> {
        check_digits(self.digits)?;
        check_window(self.valid_window)?;
        if self.time_step == 0 {
            return Err(AuthError::invalid_config("time_step must be at least 1 second"));
        }
        if self.secret_length == 0 {
            return Err(AuthError::invalid_config("secret_length must be at least 1 byte"));
        }
        if self.issuer.trim().is_empty() {
            return Err(AuthError::invalid_config("issuer must not be empty"));
        }
        Ok(())
    }
}

fn check_window(valid_window: u32) -> Result<()> {
    if valid_window > MAX_VALID_WINDOW {
        return Err(AuthError::invalid_config(format!(
            "valid_window must be at most {}, got {}",
            MAX_VALID_WINDOW, valid_window
        )));
    }
    Ok(())
}

fn check_digits(digits: u32) -> Result<()> {
    if (MIN_DIGITS..=MAX_DIGITS).contains(&digits) {
        Ok(())
    } else {
        Err(AuthError::invalid_config(format!(
            "digits must be between {} and {}, got {}",
            MIN_DIGITS, MAX_DIGITS, digits
        )))
    }
}

/// Seconds since the Unix epoch, clamped at zero.
pub fn unix_timestamp(at: DateTime<Utc>) -> u64 {
    u64::try_from(at.timestamp()).unwrap_or(0)
}

/// RFC 6238: T = floor(unix_time / X).
///
/// A zero step is treated as one second.
pub fn counter_for(timestamp: u64, time_step: u64) -> u64 {
    timestamp / time_step.max(1)
}

/// Counter for the current wall-clock time.
pub fn counter_now(time_step: u64) -> u64 {
    counter_for(unix_timestamp(Utc::now()), time_step)
}

/// Seconds left before the step containing `at` ends.
pub fn seconds_remaining(at: DateTime<Utc>, time_step: u64) -> u64 {
    let step = time_step.max(1);
    step - unix_timestamp(at) % step
}

/// RFC 4226 dynamic truncation.
///
/// The low nibble of the last byte picks a 4-byte window; the top bit of
/// that window is masked off so the result is a positive 31-bit integer.
fn truncate(digest: &[u8]) -> u32 {
    let offset = (digest[digest.len() - 1] & 0x0f) as usize;
    let window = u32::from_be_bytes([
        digest[offset],
        digest[offset + 1],
        digest[offset + 2],
        digest[offset + 3],
    ]);
    window & 0x7FFF_FFFF
}

/// HOTP(K, C) = Truncate(HMAC-SHA1(K, C)) mod 10^digits, zero-padded.
pub fn hotp(key: &[u8], counter: u64, digits: u32) -> Result<String> {
    check_digits(digits)?;

    let mut mac = HmacSha1::new_from_slice(key)
        .map_err(|e| AuthError::internal(format!("Failed to key HMAC: {}", e)))?;
    mac.update(&counter.to_be_bytes());
    let digest = mac.finalize().into_bytes();

    let code = truncate(&digest) % 10u32.pow(digits);
    Ok(format!("{:0width$}", code, width = digits as usize))
}

/// Compute the code for a Base32 `secret` at `counter`.
///
/// # Errors
///
/// [`AuthError::Decode`] if the secret is not valid Base32 or is empty,
/// [`AuthError::InvalidConfig`] if `digits` is outside 6..=8.
pub fn code_for(secret: &str, counter: u64, digits: u32) -> Result<String> {
    let key = decode_key(secret)?;
    hotp(&key, counter, digits)
}

/// Compute the code valid at instant `at`.
pub fn code_at(secret: &str, at: DateTime<Utc>, config: &TotpConfig) -> Result<String> {
    let counter = counter_for(unix_timestamp(at), config.time_step);
    code_for(secret, counter, config.digits)
}

/// Verify `submitted` against the codes around the current time.
///
/// Reads the wall clock once; see [`verify_at`].
pub fn verify(secret: &str, submitted: &str, config: &TotpConfig) -> Result<bool> {
    verify_at(secret, submitted, Utc::now(), config)
}

/// Verify `submitted` against the codes for the counters within
/// `config.valid_window` steps of the one containing `at`.
///
/// Empty input, anything other than digits (spaces aside) or the wrong
/// number of digits is rejected before the secret is touched. A mismatch is
/// `Ok(false)`; only a corrupt secret or a window above
/// [`MAX_VALID_WINDOW`] is an error.
pub fn verify_at(
    secret: &str,
    submitted: &str,
    at: DateTime<Utc>,
    config: &TotpConfig,
) -> Result<bool> {
    check_window(config.valid_window)?;
    let Some(token) = normalize_submitted(submitted) else {
        return Ok(false);
    };
    if token.len() != config.digits as usize {
        return Ok(false);
    }

    let key = decode_key(secret)?;
    let current = counter_for(unix_timestamp(at), config.time_step);
    let window = i64::from(config.valid_window);

    for offset in -window..=window {
        let Some(counter) = current.checked_add_signed(offset) else {
            continue;
        };
        let candidate = hotp(&key, counter, config.digits)?;
        if bool::from(candidate.as_bytes().ct_eq(token.as_bytes())) {
            tracing::debug!(offset, "TOTP code matched");
            return Ok(true);
        }
    }

    Ok(false)
}

/// Strip whitespace and keep only all-digit, non-empty input.
fn normalize_submitted(submitted: &str) -> Option<String> {
    let token: String = submitted.chars().filter(|c| !c.is_whitespace()).collect();
    if token.is_empty() || !token.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    Some(token)
}

fn decode_key(secret: &str) -> Result<Vec<u8>> {
    let key = secret::normalize(secret).inspect_err(|e| {
        tracing::warn!(error = %e, "Stored TOTP secret could not be decoded");
    })?;
    if key.is_empty() {
        return Err(AuthError::decode("secret is empty"));
    }
    Ok(key)
}

/// Build an `otpauth://` enrollment URI.
///
/// Label, secret and issuer are percent-encoded independently:
/// `otpauth://totp/<Issuer:username>?secret=<secret>&issuer=<Issuer>`.
pub fn provisioning_uri(secret: &str, issuer: &str, username: &str) -> String {
    let label = urlencoding::encode(&format!("{}:{}", issuer, username)).into_owned();
    format!(
        "otpauth://totp/{}?secret={}&issuer={}",
        label,
        urlencoding::encode(secret),
        urlencoding::encode(issuer)
    )
}

/// Data returned when setting up TOTP for a user.
#[derive(Debug, Clone)]
pub struct TotpSetup {
    /// Base32-encoded secret to store.
    pub secret: String,
    /// URI for enrollment (otpauth://...).
    pub uri: String,
}

/// Manages TOTP operations for one configuration.
#[derive(Clone, Debug)]
pub struct TotpManager {
    config: TotpConfig,
}

impl TotpManager {
    /// Create a new TOTP manager with the given configuration.
    pub fn new(config: TotpConfig) -> Self {
        Self { config }
    }

    /// The configuration in use.
    pub fn config(&self) -> &TotpConfig {
        &self.config
    }

    /// Generate a new secret and its enrollment URI for `username`.
    pub fn generate_setup(&self, username: &str) -> Result<TotpSetup> {
        self.config.validate()?;
        let secret = secret::generate(self.config.secret_length)?;
        let uri = provisioning_uri(&secret, &self.config.issuer, username);
        Ok(TotpSetup { secret, uri })
    }

    /// Verify a code against a stored secret at the current time.
    pub fn verify(&self, secret: &str, code: &str) -> Result<bool> {
        verify(secret, code, &self.config)
    }

    /// Verify with a specific instant (useful for testing).
    pub fn verify_at(&self, secret: &str, code: &str, at: DateTime<Utc>) -> Result<bool> {
        verify_at(secret, code, at, &self.config)
    }

    /// The code a correctly configured authenticator shows at `at`.
    pub fn code_at(&self, secret: &str, at: DateTime<Utc>) -> Result<String> {
        code_at(secret, at, &self.config)
    }
}
