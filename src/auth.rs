//! Authentication engine
//!
//! Login, registration, and logout. Login runs its input through the query
//! evaluator first: with injection protection off, a tautology in either
//! credential half bypasses password verification entirely, which is the
//! simulated authentication-bypass flaw. Everything else is a literal lookup
//! and credential comparison.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::audit::{AuditAction, AuditLog};
use crate::config::ProtectionProfile;
use crate::domain::{Balance, Credential, Role, Session, SessionStore, User};
use crate::error::{AuthError, ValidationError};
use crate::ledger::AccountLedger;
use crate::query::{QueryEvaluator, QueryPurpose};

/// Registration input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

impl RegisterRequest {
    pub fn new(
        username: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
        confirm_password: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            email: email.into(),
            password: password.into(),
            confirm_password: confirm_password.into(),
        }
    }
}

/// Authentication component.
pub struct AuthEngine {
    ledger: Arc<AccountLedger>,
    sessions: Arc<SessionStore>,
    audit: Arc<AuditLog>,
    evaluator: QueryEvaluator,
    profile: ProtectionProfile,
}

impl AuthEngine {
    pub fn new(
        ledger: Arc<AccountLedger>,
        sessions: Arc<SessionStore>,
        audit: Arc<AuditLog>,
        profile: ProtectionProfile,
    ) -> Self {
        Self {
            ledger,
            sessions,
            audit,
            evaluator: QueryEvaluator::new(profile.clone()),
            profile,
        }
    }

    /// Authenticate and issue a session.
    pub async fn login(&self, username: &str, password: &str) -> Result<Session, AuthError> {
        // Both halves of the credential pair feed the simulated query, so an
        // injection through the password field works the same as through the
        // username field.
        let probe = format!("{username} {password}");
        let outcome = self.evaluator.evaluate(&probe, QueryPurpose::Login);

        tracing::debug!(
            query = %format!(
                "SELECT * FROM users WHERE username = '{username}' AND password = '{password}'"
            ),
            "simulated login query"
        );

        if outcome.matched_always_true {
            return Ok(self.bypass_login(username).await);
        }

        match self.ledger.get_user_by_username(username).await {
            Some(user) if user.credential().verify(password) => {
                let session = Session::issue(user.id());
                self.sessions.insert(session.clone()).await;
                self.audit
                    .record(
                        AuditAction::LoginSucceeded,
                        Some(user.id()),
                        json!({ "username": user.username() }),
                    )
                    .await;
                tracing::info!(username = %user.username(), "login succeeded");
                Ok(session)
            }
            _ => {
                self.audit
                    .record(
                        AuditAction::LoginFailed,
                        None,
                        json!({ "username": username }),
                    )
                    .await;
                tracing::warn!(username = %username, "login failed");
                Err(AuthError::InvalidCredentials)
            }
        }
    }

    /// Tautology-matched login: password verification is skipped outright.
    ///
    /// The session goes to whatever user the username clause (the portion
    /// before the first quote) resolves to, falling back to the literal
    /// username. If neither matches, a record is provisioned on the fly,
    /// with an admin role when the clause names "admin".
    async fn bypass_login(&self, supplied_username: &str) -> Session {
        let clause = supplied_username
            .split('\'')
            .next()
            .unwrap_or("")
            .trim();
        let lookup = if clause.is_empty() {
            supplied_username
        } else {
            clause
        };

        let user = match self.ledger.get_user_by_username(lookup).await {
            Some(user) => user,
            None => match self.ledger.get_user_by_username(supplied_username).await {
                Some(user) => user,
                None => self.provision_bypass_user(lookup).await,
            },
        };

        let session = Session::issue(user.id());
        self.sessions.insert(session.clone()).await;
        self.audit
            .record(
                AuditAction::InjectionBypass,
                Some(user.id()),
                json!({
                    "supplied": supplied_username,
                    "resolved": user.username(),
                    "role": user.role().as_str(),
                }),
            )
            .await;
        tracing::warn!(
            supplied = %supplied_username,
            resolved = %user.username(),
            role = %user.role(),
            "authentication bypassed by tautology input"
        );
        session
    }

    async fn provision_bypass_user(&self, name: &str) -> User {
        let role = if name.eq_ignore_ascii_case("admin") {
            Role::Admin
        } else {
            Role::User
        };
        // Unguessable throwaway credential; the bypass never consults it.
        let user = User::new(
            name,
            format!("{name}@securebank.test"),
            Credential::derive(&crate::domain::random_hex(16), &self.profile),
            role,
            Balance::new(self.profile.starting_balance),
        );

        match self.ledger.create_user(user.clone()).await {
            Ok(created) => created,
            // Lost a race with a concurrent provision; use whoever won.
            Err(_) => self
                .ledger
                .get_user_by_username(name)
                .await
                .unwrap_or(user),
        }
    }

    /// Register a new account.
    pub async fn register(&self, request: RegisterRequest) -> Result<User, ValidationError> {
        if request.password.len() < self.profile.password_min_length {
            return Err(ValidationError::WeakPassword);
        }
        if request.password != request.confirm_password {
            return Err(ValidationError::PasswordMismatch);
        }

        let credential = Credential::derive(&request.password, &self.profile);
        let user = User::new(
            request.username.clone(),
            request.email,
            credential,
            Role::User,
            Balance::new(self.profile.starting_balance),
        );

        let user = self
            .ledger
            .create_user(user)
            .await
            .map_err(|_| ValidationError::UsernameTaken(request.username))?;

        self.audit
            .record(
                AuditAction::UserRegistered,
                Some(user.id()),
                json!({ "username": user.username() }),
            )
            .await;
        tracing::info!(username = %user.username(), "user registered");
        Ok(user)
    }

    /// Revoke a session. Returns whether the token was live.
    pub async fn logout(&self, token: &str) -> bool {
        let revoked = self.sessions.revoke(token).await;
        if revoked {
            self.audit
                .record(AuditAction::SessionRevoked, None, json!({}))
                .await;
        }
        revoked
    }
}
