//! Command handlers for the accounts context.
//!
//! Provider failures of any kind are reported to callers as a single
//! `DomainError::AuthenticationFailed`; nothing is retried.

use tracing::{info, warn};
use twistale_core::auth::{AuthProvider, Session};
use twistale_core::error::DomainError;

use crate::domain::commands::{RegisterAccount, SignIn, SignOut};

fn as_auth_failure(e: DomainError) -> DomainError {
    match e {
        DomainError::AuthenticationFailed => e,
        other => {
            warn!(error = %other, "auth provider call failed");
            DomainError::AuthenticationFailed
        }
    }
}

/// Handles the `RegisterAccount` command: creates the account, then sets its
/// display name.
///
/// # Errors
///
/// Returns `DomainError::Validation` if the display name is blank, and
/// `DomainError::AuthenticationFailed` if the provider rejects either step.
pub async fn handle_register(
    command: &RegisterAccount,
    provider: &dyn AuthProvider,
) -> Result<Session, DomainError> {
    let display_name = command.display_name.trim();
    if display_name.is_empty() {
        return Err(DomainError::Validation("display name must not be blank".into()));
    }

    let mut session = provider
        .register(&command.email, &command.password)
        .await
        .map_err(as_auth_failure)?;
    provider
        .update_display_name(&session.token, display_name)
        .await
        .map_err(as_auth_failure)?;
    display_name.clone_into(&mut session.user.display_name);

    info!(correlation_id = %command.correlation_id, uid = %session.user.uid, "account registered");
    Ok(session)
}

/// Handles the `SignIn` command.
///
/// # Errors
///
/// Returns `DomainError::AuthenticationFailed` if the provider rejects the
/// credentials or cannot be reached.
pub async fn handle_sign_in(
    command: &SignIn,
    provider: &dyn AuthProvider,
) -> Result<Session, DomainError> {
    let session = provider
        .login(&command.email, &command.password)
        .await
        .map_err(as_auth_failure)?;

    info!(correlation_id = %command.correlation_id, uid = %session.user.uid, "signed in");
    Ok(session)
}

/// Handles the `SignOut` command. Unknown sessions are ignored.
///
/// # Errors
///
/// Returns `DomainError::AuthenticationFailed` if the provider fails.
pub async fn handle_sign_out(
    command: &SignOut,
    provider: &dyn AuthProvider,
) -> Result<(), DomainError> {
    provider
        .logout(&command.token)
        .await
        .map_err(as_auth_failure)?;

    info!(correlation_id = %command.correlation_id, "signed out");
    Ok(())
}

#[cfg(test)]
mod tests {
    use twistale_core::auth::AuthProvider;
    use twistale_core::error::DomainError;
    use twistale_store::memory_auth::InMemoryAuthProvider;
    use twistale_test_support::FailingAuthProvider;
    use uuid::Uuid;

    use super::*;

    fn register(email: &str, password: &str, name: &str) -> RegisterAccount {
        RegisterAccount {
            correlation_id: Uuid::new_v4(),
            email: email.into(),
            password: password.into(),
            display_name: name.into(),
        }
    }

    #[tokio::test]
    async fn test_handle_register_sets_display_name() {
        // Arrange
        let provider = InMemoryAuthProvider::new();

        // Act
        let session = handle_register(&register("ana@example.com", "secret1", " Ana "), &provider)
            .await
            .unwrap();

        // Assert
        assert_eq!(session.user.display_name, "Ana");
        let stored = provider.current_user(&session.token).await.unwrap().unwrap();
        assert_eq!(stored.display_name, "Ana");
    }

    #[tokio::test]
    async fn test_handle_register_rejects_blank_name_before_calling_provider() {
        // Arrange
        let provider = InMemoryAuthProvider::new();

        // Act
        let result = handle_register(&register("ana@example.com", "secret1", "   "), &provider).await;

        // Assert
        assert!(matches!(result, Err(DomainError::Validation(_))));
        assert!(
            provider.login("ana@example.com", "secret1").await.is_err(),
            "no account should have been created"
        );
    }

    #[tokio::test]
    async fn test_provider_outage_surfaces_as_authentication_failed() {
        let provider = FailingAuthProvider;

        let registered = handle_register(&register("ana@example.com", "secret1", "Ana"), &provider).await;
        let signed_in = handle_sign_in(
            &SignIn {
                correlation_id: Uuid::new_v4(),
                email: "ana@example.com".into(),
                password: "secret1".into(),
            },
            &provider,
        )
        .await;

        assert!(matches!(registered, Err(DomainError::AuthenticationFailed)));
        assert!(matches!(signed_in, Err(DomainError::AuthenticationFailed)));
    }

    #[tokio::test]
    async fn test_sign_in_then_sign_out() {
        // Arrange
        let provider = InMemoryAuthProvider::new();
        handle_register(&register("ana@example.com", "secret1", "Ana"), &provider)
            .await
            .unwrap();

        // Act
        let session = handle_sign_in(
            &SignIn {
                correlation_id: Uuid::new_v4(),
                email: "ana@example.com".into(),
                password: "secret1".into(),
            },
            &provider,
        )
        .await
        .unwrap();
        handle_sign_out(
            &SignOut {
                correlation_id: Uuid::new_v4(),
                token: session.token.clone(),
            },
            &provider,
        )
        .await
        .unwrap();

        // Assert
        assert_eq!(session.user.display_name, "Ana");
        assert_eq!(provider.current_user(&session.token).await.unwrap(), None);
    }
}
