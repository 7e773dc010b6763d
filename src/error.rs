//! Auth error taxonomy and provider-failure classification.
//!
//! DESIGN
//! ======
//! Every provider failure is translated into one `AuthError` at the session
//! manager boundary. `Display` is the user-facing message shown by forms, and
//! `ErrorCode` supplies the grepable code used in HTTP error bodies.

use crate::provider::codes;
use crate::provider::ProviderError;

/// Grepable error code and retryable flag for structured error responses.
pub trait ErrorCode: std::fmt::Display {
    fn error_code(&self) -> &'static str;

    fn retryable(&self) -> bool {
        false
    }
}

// =============================================================================
// AUTH ERROR
// =============================================================================

/// Classified failure of a session operation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// The provider (or the federated provider) never initialized.
    #[error("{what} not initialized")]
    Uninitialized { what: &'static str },

    #[error("Invalid email or password. Please try again.")]
    InvalidCredentials,

    #[error("Please enter a valid email address.")]
    InvalidEmailFormat,

    #[error("Password is too weak. Please use a stronger password.")]
    WeakPassword,

    #[error("This email is already in use. Please try another email or sign in.")]
    EmailAlreadyInUse,

    #[error("Too many failed login attempts. Please try again later or reset your password.")]
    RateLimited,

    #[error("Sign in was cancelled. Please try again.")]
    PopupClosed,

    #[error("Pop-up was blocked by your browser. Please allow pop-ups for this site.")]
    PopupBlocked,

    #[error("Multiple pop-up requests were detected. Please try again.")]
    DuplicatePopupRequest,

    /// Operator error: the federated provider is not enabled for the project.
    #[error("Authentication configuration issue. Please contact support.")]
    ProviderMisconfigured,

    #[error("{message}")]
    GenericFailure { message: String },
}

impl AuthError {
    pub(crate) const fn uninitialized() -> Self {
        Self::Uninitialized { what: "Authentication" }
    }

    pub(crate) const fn google_uninitialized() -> Self {
        Self::Uninitialized { what: "Google authentication" }
    }

    /// Translate a provider failure into the taxonomy for the given operation.
    ///
    /// Codes outside an operation's known set fall through to
    /// `GenericFailure`, keeping the provider's message when it has one.
    #[must_use]
    pub fn classify(op: AuthOperation, err: &ProviderError) -> Self {
        let code = err.code.as_str();
        let classified = match op {
            AuthOperation::SignIn => match code {
                codes::USER_NOT_FOUND | codes::WRONG_PASSWORD | codes::INVALID_CREDENTIAL => {
                    Some(Self::InvalidCredentials)
                }
                codes::INVALID_EMAIL => Some(Self::InvalidEmailFormat),
                codes::TOO_MANY_REQUESTS => Some(Self::RateLimited),
                _ => None,
            },
            AuthOperation::SignUp => match code {
                codes::EMAIL_ALREADY_IN_USE => Some(Self::EmailAlreadyInUse),
                codes::INVALID_EMAIL => Some(Self::InvalidEmailFormat),
                codes::WEAK_PASSWORD => Some(Self::WeakPassword),
                _ => None,
            },
            AuthOperation::GoogleSignIn => match code {
                codes::POPUP_CLOSED_BY_USER => Some(Self::PopupClosed),
                codes::POPUP_BLOCKED => Some(Self::PopupBlocked),
                codes::CANCELLED_POPUP_REQUEST => Some(Self::DuplicatePopupRequest),
                codes::CONFIGURATION_NOT_FOUND => Some(Self::ProviderMisconfigured),
                _ => None,
            },
            AuthOperation::Logout => None,
        };

        classified.unwrap_or_else(|| {
            let message = err.message.trim();
            let message = if message.is_empty() { op.fallback_message() } else { message };
            Self::GenericFailure { message: message.to_owned() }
        })
    }
}

impl ErrorCode for AuthError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Uninitialized { .. } => "E_UNINITIALIZED",
            Self::InvalidCredentials => "E_INVALID_CREDENTIALS",
            Self::InvalidEmailFormat => "E_INVALID_EMAIL",
            Self::WeakPassword => "E_WEAK_PASSWORD",
            Self::EmailAlreadyInUse => "E_EMAIL_IN_USE",
            Self::RateLimited => "E_RATE_LIMITED",
            Self::PopupClosed => "E_POPUP_CLOSED",
            Self::PopupBlocked => "E_POPUP_BLOCKED",
            Self::DuplicatePopupRequest => "E_DUPLICATE_POPUP",
            Self::ProviderMisconfigured => "E_PROVIDER_MISCONFIGURED",
            Self::GenericFailure { .. } => "E_AUTH_FAILED",
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::RateLimited | Self::PopupClosed | Self::DuplicatePopupRequest)
    }
}

// =============================================================================
// OPERATIONS
// =============================================================================

/// The four credential-changing operations the session manager mediates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthOperation {
    SignIn,
    SignUp,
    GoogleSignIn,
    Logout,
}

impl AuthOperation {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SignIn => "sign_in",
            Self::SignUp => "sign_up",
            Self::GoogleSignIn => "google_sign_in",
            Self::Logout => "logout",
        }
    }

    fn fallback_message(self) -> &'static str {
        match self {
            Self::SignIn => "An error occurred during sign in. Please try again.",
            Self::SignUp => "An error occurred during sign up. Please try again.",
            Self::GoogleSignIn => "An error occurred during Google sign in. Please try again.",
            Self::Logout => "An error occurred during logout. Please try again.",
        }
    }
}

#[cfg(test)]
#[path = "error_test.rs"]
mod tests;
