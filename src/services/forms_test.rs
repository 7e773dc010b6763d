use std::sync::Arc;

use super::*;
use crate::provider::memory::{MemoryDirectory, PopupOutcome};
use crate::provider::{FederatedProvider, IdentityProvider};

fn registration(password: &str, confirm: &str) -> RegistrationForm {
    RegistrationForm {
        name: "Coach Carter".into(),
        email: "coach@example.com".into(),
        password: password.into(),
        confirm_password: confirm.into(),
    }
}

fn memory_manager(dir: &MemoryDirectory) -> SessionManager {
    SessionManager::new(dir.open() as Arc<dyn IdentityProvider>).with_federated(FederatedProvider::google())
}

// =============================================================================
// pre-checks
// =============================================================================

#[test]
fn registration_precheck_order() {
    let mut form = registration("hunter22", "hunter22");
    assert_eq!(form.precheck(), Ok(()));

    form.confirm_password = "hunter23".into();
    assert_eq!(form.precheck(), Err(FormError::PasswordMismatch));

    // Mismatch is reported before length.
    let form = registration("123", "456");
    assert_eq!(form.precheck(), Err(FormError::PasswordMismatch));

    let form = registration("123", "123");
    assert_eq!(form.precheck(), Err(FormError::PasswordTooShort));

    let form = RegistrationForm { name: "  ".into(), ..registration("hunter22", "hunter22") };
    assert_eq!(form.precheck(), Err(FormError::MissingField));
}

#[test]
fn login_precheck_requires_both_fields() {
    let form = LoginForm { email: "a@b.com".into(), password: String::new() };
    assert_eq!(form.precheck(), Err(FormError::MissingField));
    let form = LoginForm { email: "a@b.com".into(), password: "x".into() };
    assert_eq!(form.precheck(), Ok(()));
}

#[test]
fn form_error_messages() {
    assert_eq!(FormError::PasswordMismatch.to_string(), "Passwords do not match");
    assert_eq!(FormError::PasswordTooShort.to_string(), "Password must be at least 6 characters long");
}

// =============================================================================
// error precedence
// =============================================================================

#[test]
fn local_error_takes_precedence_over_shared() {
    let shared = AuthError::InvalidCredentials;
    let mut status = FormStatus::default();
    assert_eq!(status.visible_error(None), None);
    assert_eq!(status.visible_error(Some(&shared)), Some(shared.to_string()));

    status.local_error = Some("Passwords do not match".into());
    assert_eq!(status.visible_error(Some(&shared)).as_deref(), Some("Passwords do not match"));
}

// =============================================================================
// submission
// =============================================================================

#[tokio::test]
async fn registration_mismatch_makes_no_remote_call() {
    let dir = MemoryDirectory::new();
    let manager = memory_manager(&dir);
    let mut status = FormStatus::default();
    let form = registration("hunter22", "hunter99");

    let err = form.submit(&manager, &mut status).await.unwrap_err();
    assert_eq!(err, SubmitError::Form(FormError::PasswordMismatch));
    assert_eq!(status.local_error.as_deref(), Some("Passwords do not match"));
    assert!(!status.busy);

    // No account was created.
    let err = dir.open().sign_in_with_password("coach@example.com", "hunter22").await.unwrap_err();
    assert_eq!(err.code, crate::provider::codes::USER_NOT_FOUND);
    // Fields survive the failure.
    assert_eq!(form.email, "coach@example.com");
}

#[tokio::test]
async fn registration_then_login_round_trip() {
    let dir = MemoryDirectory::new();
    let manager = memory_manager(&dir);
    let mut status = FormStatus::default();

    registration("hunter22", "hunter22")
        .submit(&manager, &mut status)
        .await
        .unwrap();
    assert!(!status.busy);
    assert_eq!(status.local_error, None);

    let other = memory_manager(&dir);
    let login = LoginForm { email: "coach@example.com".into(), password: "hunter22".into() };
    login.submit(&other, &mut status).await.unwrap();
}

#[tokio::test]
async fn login_failure_leaves_local_error_empty() {
    let dir = MemoryDirectory::new();
    let manager = memory_manager(&dir);
    let mut status = FormStatus { local_error: Some("stale".into()), ..FormStatus::default() };

    let login = LoginForm { email: "ghost@example.com".into(), password: "hunter22".into() };
    let err = login.submit(&manager, &mut status).await.unwrap_err();
    assert_eq!(err, SubmitError::Auth(AuthError::InvalidCredentials));
    assert_eq!(status.local_error, None);
    assert_eq!(
        status.visible_error(manager.snapshot().error.as_ref()),
        Some(AuthError::InvalidCredentials.to_string())
    );
}

#[tokio::test]
async fn google_failure_is_shown_locally() {
    let dir = MemoryDirectory::new().with_google_account("fan@gmail.com", "Fan");
    dir.queue_popup_outcome(PopupOutcome::Close);
    let manager = memory_manager(&dir);
    let mut status = FormStatus::default();

    let err = submit_google(&manager, &mut status).await.unwrap_err();
    assert_eq!(err, SubmitError::Auth(AuthError::PopupClosed));
    assert_eq!(status.local_error, Some(AuthError::PopupClosed.to_string()));

    submit_google(&manager, &mut status).await.unwrap();
    assert_eq!(status.local_error, None);
}
