//! Credential syntax rules shared by forms, the session manager and the memory backend.

use std::sync::LazyLock;

use regex::Regex;

/// Minimum password length accepted by the identity provider.
pub const MIN_PASSWORD_LEN: usize = 6;

// Literal pattern; compiling it cannot fail.
static EMAIL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern compiles"));

/// `true` if `email` (trimmed) has the `local@domain.tld` shape.
#[must_use]
pub fn is_valid_email(email: &str) -> bool {
    EMAIL_PATTERN.is_match(email.trim())
}

/// Trim and lowercase an email for use as a lookup key.
#[must_use]
pub fn normalize_email(email: &str) -> Option<String> {
    is_valid_email(email).then(|| email.trim().to_ascii_lowercase())
}

/// `true` if the password meets the provider's length minimum.
#[must_use]
pub fn meets_password_minimum(password: &str) -> bool {
    password.chars().count() >= MIN_PASSWORD_LEN
}

#[cfg(test)]
#[path = "validate_test.rs"]
mod tests;
