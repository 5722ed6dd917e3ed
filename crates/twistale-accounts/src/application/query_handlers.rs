//! Query handlers for the accounts context.

use twistale_core::auth::{AuthProvider, AuthUser, SessionToken};
use twistale_core::error::DomainError;

/// Returns the session's user, or `None` if nobody is signed in with it.
///
/// # Errors
///
/// Returns `DomainError::AuthenticationFailed` if the provider fails.
pub async fn current_user(
    provider: &dyn AuthProvider,
    token: &SessionToken,
) -> Result<Option<AuthUser>, DomainError> {
    provider.current_user(token).await.map_err(|e| match e {
        DomainError::Infrastructure(_) => DomainError::AuthenticationFailed,
        other => other,
    })
}

/// Returns the session's user. An identity is never fabricated.
///
/// # Errors
///
/// Returns `DomainError::Unauthenticated` if nobody is signed in with the
/// token, and `DomainError::AuthenticationFailed` if the provider fails.
pub async fn require_user(
    provider: &dyn AuthProvider,
    token: &SessionToken,
) -> Result<AuthUser, DomainError> {
    current_user(provider, token)
        .await?
        .ok_or(DomainError::Unauthenticated)
}
