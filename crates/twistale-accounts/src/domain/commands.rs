//! Commands for the accounts context.

use twistale_core::auth::SessionToken;
use twistale_core::command::Command;
use uuid::Uuid;

/// Command to create an account and sign it in.
#[derive(Clone)]
pub struct RegisterAccount {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// Sign-in e-mail address.
    pub email: String,
    /// Plain-text password, handed straight to the provider.
    pub password: String,
    /// Name shown to other players.
    pub display_name: String,
}

impl std::fmt::Debug for RegisterAccount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisterAccount")
            .field("correlation_id", &self.correlation_id)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("display_name", &self.display_name)
            .finish()
    }
}

impl Command for RegisterAccount {
    fn command_type(&self) -> &'static str {
        "accounts.register"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// Command to sign an existing account in.
#[derive(Clone)]
pub struct SignIn {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// Sign-in e-mail address.
    pub email: String,
    /// Plain-text password.
    pub password: String,
}

impl std::fmt::Debug for SignIn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignIn")
            .field("correlation_id", &self.correlation_id)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl Command for SignIn {
    fn command_type(&self) -> &'static str {
        "accounts.sign_in"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// Command to end a session.
#[derive(Debug, Clone)]
pub struct SignOut {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The session to end.
    pub token: SessionToken,
}

impl Command for SignOut {
    fn command_type(&self) -> &'static str {
        "accounts.sign_out"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_output_never_shows_password() {
        let command = RegisterAccount {
            correlation_id: Uuid::nil(),
            email: "ana@example.com".into(),
            password: "hunter22".into(),
            display_name: "Ana".into(),
        };

        let rendered = format!("{command:?}");

        assert!(rendered.contains("ana@example.com"));
        assert!(!rendered.contains("hunter22"));
    }
}
