/// Get environment variable with PORTFOLIO_ prefix, falling back to unprefixed version
///
/// Checks `PORTFOLIO_{key}` first, then `{key}`, so deployments can either
/// namespace their settings or reuse conventional names.
///
/// # Examples
///
/// ```rust
/// use portfolio_auth::utils::get_env_with_prefix;
///
/// // Checks PORTFOLIO_MFA_ISSUER_NAME first, then MFA_ISSUER_NAME
/// let issuer = get_env_with_prefix("MFA_ISSUER_NAME");
/// ```
pub fn get_env_with_prefix(key: &str) -> Option<String> {
    std::env::var(format!("PORTFOLIO_{}", key))
        .or_else(|_| std::env::var(key))
        .ok()
}

/// Parse a prefixed environment variable, ignoring values that do not parse.
pub fn parse_env_with_prefix<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = get_env_with_prefix(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key = key, value = %raw, "Ignoring unparsable environment variable");
            None
        }
    }
}
