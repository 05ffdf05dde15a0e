//! Password hashing and password policy.
//!
//! Hashing uses Argon2id with default parameters and a random salt per
//! password. Hashes are stored in PHC string format.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use serde::{Deserialize, Serialize};

/// Hash a password for storage.
///
/// # Errors
///
/// Returns `argon2::password_hash::Error` if hashing fails (rare).
///
/// # Example
///
/// ```
/// use studentdesk_auth::password::{hash_password, verify_password};
///
/// let hash = hash_password("Secr3t!").unwrap();
/// assert!(hash.starts_with("$argon2id$"));
/// assert!(verify_password("Secr3t!", &hash).unwrap());
/// ```
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// Verify a password against a stored Argon2 hash.
///
/// Returns `Ok(false)` on mismatch and `Err` only if the stored hash is not
/// a valid PHC string.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, argon2::password_hash::Error> {
    let parsed_hash = PasswordHash::new(hash)?;
    let result = Argon2::default().verify_password(password.as_bytes(), &parsed_hash);
    Ok(result.is_ok())
}

/// Rules a new password must satisfy.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PasswordPolicy {
    pub required_length: usize,
    pub require_digit: bool,
    pub require_lowercase: bool,
    pub require_uppercase: bool,
    pub require_non_alphanumeric: bool,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            required_length: 6,
            require_digit: true,
            require_lowercase: true,
            require_uppercase: true,
            require_non_alphanumeric: true,
        }
    }
}

impl PasswordPolicy {
    /// Returns every rule the password breaks, in a stable order.
    pub fn violations(&self, password: &str) -> Vec<String> {
        let mut errors = Vec::new();

        if password.chars().count() < self.required_length {
            errors.push(format!(
                "Passwords must be at least {} characters.",
                self.required_length
            ));
        }
        if self.require_non_alphanumeric && password.chars().all(char::is_alphanumeric) {
            errors.push("Passwords must have at least one non alphanumeric character.".into());
        }
        if self.require_digit && !password.chars().any(|c| c.is_ascii_digit()) {
            errors.push("Passwords must have at least one digit ('0'-'9').".into());
        }
        if self.require_lowercase && !password.chars().any(|c| c.is_ascii_lowercase()) {
            errors.push("Passwords must have at least one lowercase ('a'-'z').".into());
        }
        if self.require_uppercase && !password.chars().any(|c| c.is_ascii_uppercase()) {
            errors.push("Passwords must have at least one uppercase ('A'-'Z').".into());
        }

        errors
    }

    /// Checks the password, joining all violations into one message.
    pub fn check(&self, password: &str) -> Result<(), String> {
        let errors = self.violations(password);
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors.join(", "))
        }
    }
}
