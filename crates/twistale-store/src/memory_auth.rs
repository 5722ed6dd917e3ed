//! In-memory e-mail/password authentication provider.
//!
//! A stand-in for development and tests, not a credential store. Passwords
//! are kept as one round of salted SHA-256 and compared directly, and
//! everything is lost on restart. Deployments that keep real accounts need a
//! provider backed by a proper identity service.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tracing::debug;
use twistale_core::auth::{AuthProvider, AuthUser, Session, SessionToken};
use twistale_core::error::DomainError;
use uuid::Uuid;

/// Shortest password the provider accepts.
pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone)]
struct Account {
    user: AuthUser,
    salt: String,
    digest: String,
}

#[derive(Debug, Default)]
struct Accounts {
    by_email: HashMap<String, Account>,
    sessions: HashMap<SessionToken, String>,
}

impl Accounts {
    fn user_for(&self, token: &SessionToken) -> Option<&Account> {
        let email = self.sessions.get(token)?;
        self.by_email.get(email)
    }

    fn open_session(&mut self, user: AuthUser) -> Session {
        let token = SessionToken(Uuid::new_v4().simple().to_string());
        self.sessions.insert(token.clone(), user.email.clone());
        Session { token, user }
    }
}

fn digest(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Authentication provider keeping accounts and sessions in memory.
///
/// Every rejection is reported as `DomainError::AuthenticationFailed`; the
/// reason is only logged.
#[derive(Debug, Default)]
pub struct InMemoryAuthProvider {
    accounts: Mutex<Accounts>,
}

impl InMemoryAuthProvider {
    /// Creates a provider with no accounts.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn accounts(&self) -> Result<MutexGuard<'_, Accounts>, DomainError> {
        self.accounts
            .lock()
            .map_err(|e| DomainError::Infrastructure(format!("auth mutex poisoned: {e}")))
    }
}

fn reject(reason: &str) -> DomainError {
    debug!(reason, "authentication rejected");
    DomainError::AuthenticationFailed
}

#[async_trait]
impl AuthProvider for InMemoryAuthProvider {
    async fn register(&self, email: &str, password: &str) -> Result<Session, DomainError> {
        let email = normalize_email(email);
        if email.is_empty() || !email.contains('@') {
            return Err(reject("malformed e-mail"));
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(reject("password too short"));
        }

        let mut accounts = self.accounts()?;
        if accounts.by_email.contains_key(&email) {
            return Err(reject("e-mail already registered"));
        }
        let salt = Uuid::new_v4().simple().to_string();
        let user = AuthUser {
            uid: Uuid::new_v4().to_string(),
            email: email.clone(),
            display_name: String::new(),
        };
        accounts.by_email.insert(
            email,
            Account {
                user: user.clone(),
                digest: digest(&salt, password),
                salt,
            },
        );
        Ok(accounts.open_session(user))
    }

    async fn login(&self, email: &str, password: &str) -> Result<Session, DomainError> {
        let email = normalize_email(email);
        let mut accounts = self.accounts()?;
        let user = match accounts.by_email.get(&email) {
            Some(account) if account.digest == digest(&account.salt, password) => {
                account.user.clone()
            }
            Some(_) => return Err(reject("wrong password")),
            None => return Err(reject("unknown e-mail")),
        };
        Ok(accounts.open_session(user))
    }

    async fn update_display_name(
        &self,
        token: &SessionToken,
        display_name: &str,
    ) -> Result<(), DomainError> {
        let mut accounts = self.accounts()?;
        let email = accounts
            .user_for(token)
            .map(|account| account.user.email.clone())
            .ok_or_else(|| reject("unknown session"))?;
        if let Some(account) = accounts.by_email.get_mut(&email) {
            display_name.clone_into(&mut account.user.display_name);
        }
        Ok(())
    }

    async fn current_user(&self, token: &SessionToken) -> Result<Option<AuthUser>, DomainError> {
        let accounts = self.accounts()?;
        Ok(accounts.user_for(token).map(|account| account.user.clone()))
    }

    async fn logout(&self, token: &SessionToken) -> Result<(), DomainError> {
        let mut accounts = self.accounts()?;
        accounts.sessions.remove(token);
        Ok(())
    }
}
