//! Access controller
//!
//! Role-based authorization gate consulted before every privileged
//! operation. With `access_control_enforced` off, every check passes no
//! matter what the session claims; that is the simulated
//! broken-access-control flaw. With it on, the session must resolve to a
//! live user whose role equals the requirement.

use std::sync::Arc;

use crate::config::ProtectionProfile;
use crate::domain::{Role, Session, SessionStore, User};
use crate::error::AccessError;
use crate::ledger::AccountLedger;

pub struct AccessController {
    ledger: Arc<AccountLedger>,
    sessions: Arc<SessionStore>,
    profile: ProtectionProfile,
}

impl AccessController {
    pub fn new(
        ledger: Arc<AccountLedger>,
        sessions: Arc<SessionStore>,
        profile: ProtectionProfile,
    ) -> Self {
        Self {
            ledger,
            sessions,
            profile,
        }
    }

    /// Gate a privileged operation.
    pub async fn check_access(
        &self,
        session: &Session,
        required_role: Role,
    ) -> Result<(), AccessError> {
        if !self.profile.access_control_enforced {
            tracing::debug!(required = %required_role, "access check skipped, enforcement off");
            return Ok(());
        }

        let user = self.resolve(session).await?;
        if user.role() == required_role {
            Ok(())
        } else {
            tracing::warn!(
                username = %user.username(),
                role = %user.role(),
                required = %required_role,
                "access denied"
            );
            Err(AccessError::Denied)
        }
    }

    /// Resolve a session to its owning user. The token must still be live in
    /// the store and its user must still exist in the ledger.
    pub async fn resolve(&self, session: &Session) -> Result<User, AccessError> {
        let stored = self
            .sessions
            .resolve(&session.token)
            .await
            .ok_or(AccessError::UnknownSession)?;

        self.ledger
            .get_user(stored.user_id)
            .await
            .ok_or(AccessError::UnknownSession)
    }
}
