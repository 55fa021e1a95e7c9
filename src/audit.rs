//! Audit log
//!
//! Tamper-evident, in-memory audit trail. Every engine operation records an
//! entry; each entry is SHA-256 hash-chained to its predecessor so tests and
//! the demo binary can verify that nothing rewrote history. Observational
//! only: recording never changes an operation's outcome.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::sha256_hex;

/// Hash of the empty chain.
const GENESIS_HASH: &str = "0000000000000000000000000000000000000000000000000000000000000000";

/// Audit action types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuditAction {
    UserRegistered,
    LoginSucceeded,
    LoginFailed,
    InjectionBypass,
    SessionRevoked,
    TransferExecuted,
    TransferRejected,
    AccessDenied,
    RoleChanged,
    UserDeleted,
    RawQueryExecuted,
    RawQueryBlocked,
    SearchBypassed,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::UserRegistered => "user.registered",
            AuditAction::LoginSucceeded => "auth.login_succeeded",
            AuditAction::LoginFailed => "auth.login_failed",
            AuditAction::InjectionBypass => "auth.injection_bypass",
            AuditAction::SessionRevoked => "auth.session_revoked",
            AuditAction::TransferExecuted => "transfer.executed",
            AuditAction::TransferRejected => "transfer.rejected",
            AuditAction::AccessDenied => "access.denied",
            AuditAction::RoleChanged => "admin.role_changed",
            AuditAction::UserDeleted => "admin.user_deleted",
            AuditAction::RawQueryExecuted => "admin.raw_query_executed",
            AuditAction::RawQueryBlocked => "admin.raw_query_blocked",
            AuditAction::SearchBypassed => "admin.search_bypassed",
        }
    }
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One recorded operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: Uuid,
    pub sequence: u64,
    pub action: AuditAction,
    /// Acting user, when one is known
    pub actor: Option<Uuid>,
    pub detail: serde_json::Value,
    pub previous_hash: String,
    pub current_hash: String,
    pub recorded_at: DateTime<Utc>,
}

impl AuditEntry {
    /// The canonical hash input for an entry. Chain integrity depends on
    /// this being a pure function of the recorded fields.
    fn hash_input(&self) -> String {
        format!(
            "{}{}{}{}{}{}",
            self.id,
            self.sequence,
            self.action.as_str(),
            self.actor.map(|a| a.to_string()).unwrap_or_default(),
            self.detail,
            self.previous_hash,
        )
    }
}

/// Result of hash chain verification
#[derive(Debug, Clone)]
pub struct ChainVerification {
    pub is_valid: bool,
    pub entries_checked: u64,
    pub first_invalid_entry: Option<Uuid>,
}

/// Append-only audit trail with hash chaining.
#[derive(Debug, Default)]
pub struct AuditLog {
    entries: RwLock<Vec<AuditEntry>>,
}

impl AuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one operation. The entry is chained to the current tail.
    pub async fn record(
        &self,
        action: AuditAction,
        actor: Option<Uuid>,
        detail: serde_json::Value,
    ) -> Uuid {
        let mut entries = self.entries.write().await;
        let previous_hash = entries
            .last()
            .map(|e| e.current_hash.clone())
            .unwrap_or_else(|| GENESIS_HASH.to_string());

        let mut entry = AuditEntry {
            id: Uuid::new_v4(),
            sequence: entries.len() as u64,
            action,
            actor,
            detail,
            previous_hash,
            current_hash: String::new(),
            recorded_at: Utc::now(),
        };
        entry.current_hash = sha256_hex(&entry.hash_input());

        tracing::debug!(audit_id = %entry.id, action = %action, "audit entry recorded");

        let id = entry.id;
        entries.push(entry);
        id
    }

    /// Walk the chain and recompute every hash.
    pub async fn verify_chain(&self) -> ChainVerification {
        let entries = self.entries.read().await;
        let mut previous_hash = GENESIS_HASH.to_string();

        for entry in entries.iter() {
            if entry.previous_hash != previous_hash
                || sha256_hex(&entry.hash_input()) != entry.current_hash
            {
                return ChainVerification {
                    is_valid: false,
                    entries_checked: entry.sequence,
                    first_invalid_entry: Some(entry.id),
                };
            }
            previous_hash = entry.current_hash.clone();
        }

        ChainVerification {
            is_valid: true,
            entries_checked: entries.len() as u64,
            first_invalid_entry: None,
        }
    }

    /// Most recent entries, newest first.
    pub async fn recent(&self, limit: usize) -> Vec<AuditEntry> {
        let entries = self.entries.read().await;
        entries.iter().rev().take(limit).cloned().collect()
    }

    /// Entries recorded for a given action.
    pub async fn by_action(&self, action: AuditAction) -> Vec<AuditEntry> {
        let entries = self.entries.read().await;
        entries
            .iter()
            .filter(|e| e.action == action)
            .cloned()
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    #[cfg(test)]
    pub(crate) async fn tamper_with(&self, sequence: u64, new_detail: serde_json::Value) {
        let mut entries = self.entries.write().await;
        if let Some(entry) = entries.get_mut(sequence as usize) {
            entry.detail = new_detail;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_audit_action_as_str() {
        assert_eq!(AuditAction::UserRegistered.as_str(), "user.registered");
        assert_eq!(AuditAction::TransferExecuted.as_str(), "transfer.executed");
        assert_eq!(AuditAction::AccessDenied.as_str(), "access.denied");
    }

    #[tokio::test]
    async fn test_empty_chain_is_valid() {
        let log = AuditLog::new();
        let verification = log.verify_chain().await;
        assert!(verification.is_valid);
        assert_eq!(verification.entries_checked, 0);
    }

    #[tokio::test]
    async fn test_chain_links_entries() {
        let log = AuditLog::new();
        let actor = Uuid::new_v4();

        log.record(AuditAction::LoginSucceeded, Some(actor), json!({"username": "alice"}))
            .await;
        log.record(
            AuditAction::TransferExecuted,
            Some(actor),
            json!({"amount": "80.00"}),
        )
        .await;

        let verification = log.verify_chain().await;
        assert!(verification.is_valid);
        assert_eq!(verification.entries_checked, 2);

        let recent = log.recent(10).await;
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].action, AuditAction::TransferExecuted);
        assert_eq!(recent[1].current_hash, recent[0].previous_hash);
    }

    #[tokio::test]
    async fn test_tampering_is_detected() {
        let log = AuditLog::new();
        log.record(AuditAction::LoginSucceeded, None, json!({"username": "alice"}))
            .await;
        log.record(AuditAction::UserDeleted, None, json!({"target": "bob"}))
            .await;

        log.tamper_with(0, json!({"username": "mallory"})).await;

        let verification = log.verify_chain().await;
        assert!(!verification.is_valid);
        assert_eq!(verification.entries_checked, 0);
        assert!(verification.first_invalid_entry.is_some());
    }

    #[tokio::test]
    async fn test_by_action_filter() {
        let log = AuditLog::new();
        log.record(AuditAction::LoginFailed, None, json!({})).await;
        log.record(AuditAction::LoginSucceeded, None, json!({})).await;
        log.record(AuditAction::LoginFailed, None, json!({})).await;

        assert_eq!(log.by_action(AuditAction::LoginFailed).await.len(), 2);
        assert_eq!(log.by_action(AuditAction::AccessDenied).await.len(), 0);
    }
}
