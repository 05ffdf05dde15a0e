//! Authentication configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::password::PasswordPolicy;

/// Root authentication configuration.
///
/// # Example (TOML)
///
/// ```toml
/// [auth.cookie]
/// secure = false
/// expire_time = "30m"
///
/// [auth.password]
/// required_length = 8
/// ```
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Session cookie settings.
    pub cookie: CookieConfig,

    /// Rules new passwords must satisfy.
    pub password: PasswordPolicy,
}

/// Session cookie settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CookieConfig {
    /// Cookie name.
    pub name: String,

    /// Emit the `Secure` attribute.
    pub secure: bool,

    /// `SameSite` attribute: "strict", "lax" or "none".
    pub same_site: String,

    /// Cookie path.
    pub path: String,

    /// Where unauthenticated requests are sent.
    pub login_path: String,

    /// Session lifetime.
    #[serde(with = "humantime_serde")]
    pub expire_time: Duration,

    /// Reset the lifetime on every request that uses the session.
    pub sliding_expiration: bool,
}

impl Default for CookieConfig {
    fn default() -> Self {
        Self {
            name: ".StudentDesk.Session".to_string(),
            secure: true,
            same_site: "lax".to_string(),
            path: "/".to_string(),
            login_path: "/Account/Login".to_string(),
            expire_time: Duration::from_secs(30 * 60),
            sliding_expiration: true,
        }
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// An invalid configuration value was provided.
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

impl AuthConfig {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if the cookie name is empty, the
    /// session lifetime is zero, a path is not absolute or `same_site` is
    /// unknown.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let cookie = &self.cookie;
        if cookie.name.trim().is_empty() {
            return Err(ConfigError::InvalidValue(
                "auth.cookie.name cannot be empty".to_string(),
            ));
        }
        if cookie.expire_time.is_zero() {
            return Err(ConfigError::InvalidValue(
                "auth.cookie.expire_time must be > 0".to_string(),
            ));
        }
        for (key, path) in [("path", &cookie.path), ("login_path", &cookie.login_path)] {
            if !path.starts_with('/') {
                return Err(ConfigError::InvalidValue(format!(
                    "auth.cookie.{key} must start with '/'"
                )));
            }
        }
        match cookie.same_site.to_ascii_lowercase().as_str() {
            "strict" | "lax" | "none" => {}
            other => {
                return Err(ConfigError::InvalidValue(format!(
                    "Invalid auth.cookie.same_site: '{other}'. Must be strict, lax, or none"
                )));
            }
        }
        Ok(())
    }
}
