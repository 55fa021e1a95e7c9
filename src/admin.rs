//! Admin operations
//!
//! User management, search, and the raw-query tool. Every mutating
//! operation consults the access controller first; with enforcement off the
//! gate waves everything through, which is what makes the privilege
//! escalation exercises work. Raw queries never touch the live ledger:
//! destructive statements run against a detached copy so the report can
//! show the would-be damage while the sandbox stays intact.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::access::AccessController;
use crate::audit::{AuditAction, AuditLog};
use crate::config::ProtectionProfile;
use crate::domain::{Role, Session, User};
use crate::error::AccessError;
use crate::ledger::AccountLedger;
use crate::query::{QueryEvaluator, QueryOutcome, QueryPurpose};

/// Outcome of a raw-query execution. Always a successful result: the
/// interesting cases (tautologies, destructive statements) are flags to
/// observe, not faults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryReport {
    pub query: String,
    pub outcome: QueryOutcome,
    /// Whether the simulated engine "ran" the statement
    pub executed: bool,
    /// Rows a SELECT would have returned
    pub rows_returned: usize,
    /// User count in the detached copy after a destructive statement
    pub simulated_user_count: usize,
    pub message: String,
}

/// Live totals for the admin overview.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemSummary {
    pub total_users: usize,
    pub total_balance: rust_decimal::Decimal,
    pub admin_count: usize,
}

pub struct AdminOperations {
    ledger: Arc<AccountLedger>,
    access: AccessController,
    audit: Arc<AuditLog>,
    evaluator: QueryEvaluator,
    profile: ProtectionProfile,
}

impl AdminOperations {
    pub fn new(
        ledger: Arc<AccountLedger>,
        access: AccessController,
        audit: Arc<AuditLog>,
        profile: ProtectionProfile,
    ) -> Self {
        Self {
            ledger,
            access,
            audit,
            evaluator: QueryEvaluator::new(profile.clone()),
            profile,
        }
    }

    /// Search users by username or email substring.
    ///
    /// A tautology match returns the full user set regardless of the filter
    /// (the injected clause "widened" the query); a syntax error returns
    /// nothing (the simulated query failed). Anything else is a literal
    /// case-insensitive substring match.
    pub async fn search(&self, query: &str) -> Vec<User> {
        let outcome = self.evaluator.evaluate(query, QueryPurpose::Search);

        if outcome.matched_always_true {
            self.audit
                .record(
                    AuditAction::SearchBypassed,
                    None,
                    json!({ "query": query }),
                )
                .await;
            tracing::warn!(query = %query, "search filter bypassed by tautology input");
            return self.ledger.all_users().await;
        }

        if outcome.syntax_error {
            tracing::debug!(query = %query, "search query rejected as malformed");
            return Vec::new();
        }

        let needle = query.to_lowercase();
        self.ledger
            .all_users()
            .await
            .into_iter()
            .filter(|u| {
                u.username().to_lowercase().contains(&needle)
                    || u.email().to_lowercase().contains(&needle)
            })
            .collect()
    }

    /// Execute a raw query against the simulated database.
    pub async fn run_raw_query(
        &self,
        session: &Session,
        query: &str,
    ) -> Result<QueryReport, AccessError> {
        self.guarded(session, "raw_query").await?;

        let outcome = self.evaluator.evaluate(query, QueryPurpose::RawQuery);
        let live_count = self.ledger.user_count().await;
        let lower = query.to_lowercase();

        let report = if outcome.destructive {
            if self.profile.sql_injection_protection {
                QueryReport {
                    query: query.to_string(),
                    outcome,
                    executed: false,
                    rows_returned: 0,
                    simulated_user_count: live_count,
                    message: "Destructive statement blocked".to_string(),
                }
            } else {
                // Run the wipe against a detached copy only; the live ledger
                // must come through unscathed.
                let wiped = self.simulate_destruction().await;
                QueryReport {
                    query: query.to_string(),
                    outcome,
                    executed: true,
                    rows_returned: 0,
                    simulated_user_count: wiped,
                    message: format!(
                        "Destructive statement executed: {live_count} rows would be lost"
                    ),
                }
            }
        } else if lower.contains("select") {
            QueryReport {
                query: query.to_string(),
                outcome,
                executed: true,
                rows_returned: live_count,
                simulated_user_count: live_count,
                message: format!("Query returned {live_count} rows"),
            }
        } else {
            QueryReport {
                query: query.to_string(),
                outcome,
                executed: false,
                rows_returned: 0,
                simulated_user_count: live_count,
                message: "Unrecognized statement".to_string(),
            }
        };

        let action = if report.executed {
            AuditAction::RawQueryExecuted
        } else {
            AuditAction::RawQueryBlocked
        };
        self.audit
            .record(
                action,
                Some(session.user_id),
                json!({ "query": query, "destructive": outcome.destructive }),
            )
            .await;
        tracing::info!(
            query = %query,
            executed = report.executed,
            destructive = outcome.destructive,
            "raw query evaluated"
        );

        Ok(report)
    }

    /// Grant a user the admin role.
    pub async fn promote_user(
        &self,
        session: &Session,
        target_id: Uuid,
    ) -> Result<User, AccessError> {
        self.change_role(session, target_id, Role::Admin).await
    }

    /// Strip a user back to the plain user role.
    pub async fn demote_user(
        &self,
        session: &Session,
        target_id: Uuid,
    ) -> Result<User, AccessError> {
        self.change_role(session, target_id, Role::User).await
    }

    async fn change_role(
        &self,
        session: &Session,
        target_id: Uuid,
        role: Role,
    ) -> Result<User, AccessError> {
        self.guarded(session, "role_change").await?;

        let user = self
            .ledger
            .set_role(target_id, role)
            .await
            .map_err(|_| AccessError::TargetNotFound(target_id))?;

        self.audit
            .record(
                AuditAction::RoleChanged,
                Some(session.user_id),
                json!({ "target": user.username(), "role": role.as_str() }),
            )
            .await;
        Ok(user)
    }

    /// Delete a user outright. There is deliberately no confirmation step.
    pub async fn delete_user(
        &self,
        session: &Session,
        target_id: Uuid,
    ) -> Result<(), AccessError> {
        self.guarded(session, "delete_user").await?;

        let user = self
            .ledger
            .delete_user(target_id)
            .await
            .map_err(|_| AccessError::TargetNotFound(target_id))?;

        self.audit
            .record(
                AuditAction::UserDeleted,
                Some(session.user_id),
                json!({ "target": user.username() }),
            )
            .await;
        Ok(())
    }

    /// Live totals for the admin overview.
    pub async fn system_summary(&self) -> SystemSummary {
        let users = self.ledger.all_users().await;
        SystemSummary {
            total_users: users.len(),
            total_balance: users.iter().map(|u| u.balance().value()).sum(),
            admin_count: users.iter().filter(|u| u.is_admin()).count(),
        }
    }

    /// Admin gate shared by the privileged operations.
    async fn guarded(&self, session: &Session, operation: &str) -> Result<(), AccessError> {
        match self.access.check_access(session, Role::Admin).await {
            Ok(()) => Ok(()),
            Err(err) => {
                self.audit
                    .record(
                        AuditAction::AccessDenied,
                        Some(session.user_id),
                        json!({ "operation": operation }),
                    )
                    .await;
                Err(err)
            }
        }
    }

    /// Apply the wipe to a detached copy of the user set and report what
    /// would remain. The live ledger is never touched.
    async fn simulate_destruction(&self) -> usize {
        let mut copy = self.ledger.all_users().await;
        copy.retain(|_| false);
        copy.len()
    }
}
