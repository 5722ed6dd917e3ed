//! Test authentication provider that fails every call.

use async_trait::async_trait;
use twistale_core::auth::{AuthProvider, AuthUser, Session, SessionToken};
use twistale_core::error::DomainError;

/// An authentication provider whose every operation fails with
/// `DomainError::Infrastructure`, as a provider outage would.
#[derive(Debug)]
pub struct FailingAuthProvider;

fn outage() -> DomainError {
    DomainError::Infrastructure("auth provider unreachable".into())
}

#[async_trait]
impl AuthProvider for FailingAuthProvider {
    async fn register(&self, _email: &str, _password: &str) -> Result<Session, DomainError> {
        Err(outage())
    }

    async fn login(&self, _email: &str, _password: &str) -> Result<Session, DomainError> {
        Err(outage())
    }

    async fn update_display_name(
        &self,
        _token: &SessionToken,
        _display_name: &str,
    ) -> Result<(), DomainError> {
        Err(outage())
    }

    async fn current_user(&self, _token: &SessionToken) -> Result<Option<AuthUser>, DomainError> {
        Err(outage())
    }

    async fn logout(&self, _token: &SessionToken) -> Result<(), DomainError> {
        Err(outage())
    }
}
