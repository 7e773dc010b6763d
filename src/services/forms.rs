//! Login and registration forms: local pre-checks and the busy/error contract.
//!
//! DESIGN
//! ======
//! A form validates what it can before any remote call, then hands the
//! credentials to the session manager. `FormStatus` carries the busy flag
//! and a local-only error; the manager's shared error remains the source of
//! truth for operation failures. When both are present the local one wins.
//! Forms are borrowed by `submit`, so fields survive every failure.

use serde::Deserialize;

use crate::error::{AuthError, ErrorCode};
use crate::services::session::SessionManager;
use crate::validate::meets_password_minimum;

const GOOGLE_FALLBACK_MESSAGE: &str = "Failed to sign in with Google. Please try again.";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormError {
    #[error("All fields are required")]
    MissingField,
    #[error("Passwords do not match")]
    PasswordMismatch,
    #[error("Password must be at least 6 characters long")]
    PasswordTooShort,
}

impl ErrorCode for FormError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::MissingField => "E_MISSING_FIELD",
            Self::PasswordMismatch => "E_PASSWORD_MISMATCH",
            Self::PasswordTooShort => "E_PASSWORD_TOO_SHORT",
        }
    }
}

/// Failure of a form submission: rejected locally, or by the session manager.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubmitError {
    #[error(transparent)]
    Form(#[from] FormError),
    #[error(transparent)]
    Auth(#[from] AuthError),
}

// =============================================================================
// STATUS
// =============================================================================

/// Busy indicator and local error of one form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormStatus {
    pub busy: bool,
    pub local_error: Option<String>,
}

impl FormStatus {
    /// Error to display: the local one if set, else the manager's shared error.
    #[must_use]
    pub fn visible_error(&self, shared: Option<&AuthError>) -> Option<String> {
        self.local_error
            .clone()
            .or_else(|| shared.map(ToString::to_string))
    }

    /// Run `op` with `busy` raised; `busy` is lowered whatever the outcome.
    async fn run<F>(&mut self, op: F) -> Result<(), AuthError>
    where
        F: Future<Output = Result<(), AuthError>>,
    {
        self.busy = true;
        let result = op.await;
        self.busy = false;
        result
    }

    fn reject(&mut self, err: FormError) -> SubmitError {
        self.local_error = Some(err.to_string());
        SubmitError::Form(err)
    }
}

// =============================================================================
// LOGIN
// =============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

impl LoginForm {
    /// # Errors
    ///
    /// Returns [`FormError::MissingField`] if either field is blank.
    pub fn precheck(&self) -> Result<(), FormError> {
        if self.email.trim().is_empty() || self.password.is_empty() {
            return Err(FormError::MissingField);
        }
        Ok(())
    }

    /// # Errors
    ///
    /// Returns the local pre-check failure or the manager's classified error.
    pub async fn submit(&self, manager: &SessionManager, status: &mut FormStatus) -> Result<(), SubmitError> {
        status.local_error = None;
        if let Err(e) = self.precheck() {
            return Err(status.reject(e));
        }
        status
            .run(manager.sign_in(&self.email, &self.password))
            .await
            .map_err(SubmitError::Auth)
    }
}

// =============================================================================
// REGISTRATION
// =============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegistrationForm {
    pub name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

impl RegistrationForm {
    /// Required fields, then confirmation, then length.
    ///
    /// # Errors
    ///
    /// Returns the first [`FormError`] found.
    pub fn precheck(&self) -> Result<(), FormError> {
        if self.name.trim().is_empty() || self.email.trim().is_empty() || self.password.is_empty() {
            return Err(FormError::MissingField);
        }
        if self.password != self.confirm_password {
            return Err(FormError::PasswordMismatch);
        }
        if !meets_password_minimum(&self.password) {
            return Err(FormError::PasswordTooShort);
        }
        Ok(())
    }

    /// # Errors
    ///
    /// Returns the local pre-check failure (no remote call made) or the
    /// manager's classified error.
    pub async fn submit(&self, manager: &SessionManager, status: &mut FormStatus) -> Result<(), SubmitError> {
        status.local_error = None;
        if let Err(e) = self.precheck() {
            return Err(status.reject(e));
        }
        status
            .run(manager.sign_up(&self.email, &self.password, self.name.trim()))
            .await
            .map_err(SubmitError::Auth)
    }
}

// =============================================================================
// GOOGLE
// =============================================================================

/// Google button shared by both forms. Failures are also shown as a local error.
///
/// # Errors
///
/// Returns the manager's classified error.
pub async fn submit_google(manager: &SessionManager, status: &mut FormStatus) -> Result<(), SubmitError> {
    status.local_error = None;
    let result = status.run(manager.sign_in_with_google()).await;
    if let Err(e) = &result {
        let message = e.to_string();
        status.local_error = Some(if message.trim().is_empty() { GOOGLE_FALLBACK_MESSAGE.to_owned() } else { message });
    }
    result.map_err(SubmitError::Auth)
}

#[cfg(test)]
#[path = "forms_test.rs"]
mod tests;
