use serde::{Deserialize, Serialize};

use crate::auth::mfa::TotpConfig;
use crate::error::{AuthError, Result};
use crate::utils::{get_env_with_prefix, parse_env_with_prefix};

/// Main configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub mfa: TotpConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_json")]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: default_json(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_json() -> bool {
    false
}

/// Builder for Config with environment variable support
#[must_use = "builder does nothing until you call build()"]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    pub fn with_json_logging(mut self, enabled: bool) -> Self {
        self.config.logging.json = enabled;
        self
    }

    pub fn with_mfa(mut self, mfa: TotpConfig) -> Self {
        self.config.mfa = mfa;
        self
    }

    /// Set the issuer shown in authenticator apps
    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.config.mfa.issuer = issuer.into();
        self
    }

    /// Load configuration from environment variables with PORTFOLIO_ prefix
    pub fn from_env(mut self) -> Self {
        if let Some(level) = get_env_with_prefix("LOG_LEVEL") {
            self.config.logging.level = level;
        }
        if let Some(json) = get_env_with_prefix("LOG_JSON") {
            self.config.logging.json = json.parse().unwrap_or(false);
        }

        if let Some(issuer) = get_env_with_prefix("MFA_ISSUER_NAME") {
            self.config.mfa.issuer = issuer;
        }
        if let Some(digits) = parse_env_with_prefix("MFA_DIGITS") {
            self.config.mfa.digits = digits;
        }
        if let Some(time_step) = parse_env_with_prefix("MFA_TIME_STEP") {
            self.config.mfa.time_step = time_step;
        }
        if let Some(valid_window) = parse_env_with_prefix("MFA_VALID_WINDOW") {
            self.config.mfa.valid_window = valid_window;
        }
        if let Some(secret_length) = parse_env_with_prefix("MFA_SECRET_LENGTH") {
            self.config.mfa.secret_length = secret_length;
        }

        self
    }

    /// Build the configuration, validating all settings
    ///
    /// # Errors
    ///
    /// Returns an error if the log level is unknown or the MFA settings are
    /// unusable (digits outside 6..=8, zero time step, zero secret length,
    /// blank issuer).
    pub fn build(self) -> Result<Config> {
        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&self.config.logging.level.to_lowercase().as_str()) {
            return Err(AuthError::invalid_config(format!(
                "Invalid log level: {}. Must be one of: {}",
                self.config.logging.level,
                valid_log_levels.join(", ")
            )));
        }

        self.config.mfa.validate()?;

        Ok(self.config)
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ConfigBuilder::new().build().unwrap();
        assert_eq!(config.logging.level, "info");
        assert!(!config.logging.json);
        assert_eq!(config.mfa.issuer, "Portfolio Admin");
        assert_eq!(config.mfa.digits, 6);
        assert_eq!(config.mfa.time_step, 30);
        assert_eq!(config.mfa.valid_window, 1);
        assert_eq!(config.mfa.secret_length, 32);
    }

    #[test]
    fn test_builder_setters() {
        let config = ConfigBuilder::new()
            .with_log_level("debug")
            .with_json_logging(true)
            .with_issuer("jane.dev")
            .build()
            .unwrap();
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.json);
        assert_eq!(config.mfa.issuer, "jane.dev");
    }

    #[test]
    fn test_build_rejects_bad_values() {
        assert!(ConfigBuilder::new().with_log_level("loud").build().is_err());
        assert!(matches!(
            ConfigBuilder::new()
                .with_mfa(TotpConfig::default().digits(12))
                .build(),
            Err(AuthError::InvalidConfig(_))
        ));
        assert!(matches!(
            ConfigBuilder::new()
                .with_mfa(TotpConfig::default().valid_window(4_000_000_000))
                .build(),
            Err(AuthError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_from_env() {
        unsafe {
            std::env::set_var("PORTFOLIO_MFA_ISSUER_NAME", "Env Issuer");
            std::env::set_var("PORTFOLIO_MFA_VALID_WINDOW", "2");
            std::env::set_var("PORTFOLIO_MFA_DIGITS", "eight");
        }
        let config = ConfigBuilder::new().from_env().build().unwrap();
        unsafe {
            std::env::remove_var("PORTFOLIO_MFA_ISSUER_NAME");
            std::env::remove_var("PORTFOLIO_MFA_VALID_WINDOW");
            std::env::remove_var("PORTFOLIO_MFA_DIGITS");
        }
        assert_eq!(config.mfa.issuer, "Env Issuer");
        assert_eq!(config.mfa.valid_window, 2);
        // Unparsable values keep the default
        assert_eq!(config.mfa.digits, 6);
    }

    #[test]
    fn test_deserialize_partial() {
        let config: Config =
            serde_json::from_str(r#"{"mfa": {"issuer": "Site", "valid_window": 0}}"#).unwrap();
        assert_eq!(config.mfa.issuer, "Site");
        assert_eq!(config.mfa.valid_window, 0);
        assert_eq!(config.mfa.digits, 6);
        assert_eq!(config.logging.level, "info");
    }
}
