//! Authentication provider abstraction.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// An authenticated user as reported by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    /// Stable user identifier.
    pub uid: String,
    /// E-mail address the account was registered with.
    pub email: String,
    /// Display name shown to other players; empty until set.
    pub display_name: String,
}

/// Opaque bearer token identifying a signed-in session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionToken(pub String);

impl SessionToken {
    /// Returns the raw token string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A freshly opened session.
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    /// The bearer token for subsequent calls.
    pub token: SessionToken,
    /// The signed-in user.
    pub user: AuthUser,
}

/// Email/password authentication provider.
///
/// Implementations report every credential or transport failure as
/// `DomainError::AuthenticationFailed`.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Creates an account and signs it in.
    async fn register(&self, email: &str, password: &str) -> Result<Session, DomainError>;

    /// Signs an existing account in.
    async fn login(&self, email: &str, password: &str) -> Result<Session, DomainError>;

    /// Sets the display name of the session's user.
    async fn update_display_name(
        &self,
        token: &SessionToken,
        display_name: &str,
    ) -> Result<(), DomainError>;

    /// Returns the session's user, or `None` if the token is unknown.
    async fn current_user(&self, token: &SessionToken) -> Result<Option<AuthUser>, DomainError>;

    /// Ends the session. Unknown tokens are ignored.
    async fn logout(&self, token: &SessionToken) -> Result<(), DomainError>;
}
