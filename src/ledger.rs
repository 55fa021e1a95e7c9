//! Account ledger
//!
//! The authoritative in-memory store of users, balances, and the append-only
//! transaction log. The ledger enforces record-level invariants (username
//! uniqueness, append-only history) and nothing else: it never clamps a
//! balance and never checks sufficiency. Limiting is the transfer
//! processor's responsibility and is profile-dependent.

use std::collections::HashMap;
use std::sync::Arc;

use rust_decimal::Decimal;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::domain::{Balance, Role, Transaction, TransactionKind, User};
use crate::error::LedgerError;

/// Shared in-memory account store.
///
/// All mutations take the write lock, so login, registration, role changes,
/// and deletion are single-critical-section updates regardless of the
/// protection profile. The per-account guards handed out by
/// [`AccountLedger::account_guard`] exist for the one operation with a real
/// ordering hazard: the transfer read-check-write sequence.
#[derive(Debug, Default)]
pub struct AccountLedger {
    users: RwLock<HashMap<Uuid, User>>,
    log: RwLock<Vec<Transaction>>,
    guards: Mutex<HashMap<Uuid, Arc<Mutex<()>>>>,
}

impl AccountLedger {
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // Reads
    // =========================================================================

    pub async fn get_user(&self, id: Uuid) -> Option<User> {
        self.users.read().await.get(&id).cloned()
    }

    /// Look up a user by username, case-insensitively.
    pub async fn get_user_by_username(&self, name: &str) -> Option<User> {
        let users = self.users.read().await;
        users
            .values()
            .find(|u| u.username().eq_ignore_ascii_case(name))
            .cloned()
    }

    /// All users, ordered by username for deterministic iteration.
    pub async fn all_users(&self) -> Vec<User> {
        let users = self.users.read().await;
        let mut all: Vec<User> = users.values().cloned().collect();
        all.sort_by(|a, b| a.username().cmp(b.username()));
        all
    }

    pub async fn user_count(&self) -> usize {
        self.users.read().await.len()
    }

    /// Sum of all balances.
    pub async fn total_balance(&self) -> Decimal {
        let users = self.users.read().await;
        users.values().map(|u| u.balance().value()).sum()
    }

    pub async fn balance_of(&self, id: Uuid) -> Result<Balance, LedgerError> {
        self.users
            .read()
            .await
            .get(&id)
            .map(|u| u.balance())
            .ok_or(LedgerError::UserNotFound(id))
    }

    /// Transaction history for one account, oldest first.
    pub async fn transactions_for(&self, id: Uuid) -> Vec<Transaction> {
        let log = self.log.read().await;
        log.iter().filter(|tx| tx.account_id == id).cloned().collect()
    }

    /// Length of the full ledger log.
    pub async fn log_len(&self) -> usize {
        self.log.read().await.len()
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Insert a new user. Fails if the username is already taken
    /// (case-insensitive).
    pub async fn create_user(&self, user: User) -> Result<User, LedgerError> {
        let mut users = self.users.write().await;
        if users
            .values()
            .any(|u| u.username().eq_ignore_ascii_case(user.username()))
        {
            return Err(LedgerError::UsernameTaken(user.username().to_string()));
        }

        tracing::debug!(user_id = %user.id(), username = %user.username(), "user created");
        users.insert(user.id(), user.clone());
        Ok(user)
    }

    /// Append a transaction and adjust the account balance by `+amount`
    /// (credit) or `-amount` (debit). No sufficiency check, no clamping.
    pub async fn apply_transaction(
        &self,
        user_id: Uuid,
        tx: Transaction,
    ) -> Result<Balance, LedgerError> {
        let mut users = self.users.write().await;
        let user = users
            .get_mut(&user_id)
            .ok_or(LedgerError::UserNotFound(user_id))?;

        let updated = match tx.kind {
            TransactionKind::Credit => Balance::new(user.balance().value() + tx.amount),
            TransactionKind::Debit => Balance::new(user.balance().value() - tx.amount),
        };
        user.set_balance(updated);

        self.log.write().await.push(tx);
        Ok(updated)
    }

    pub async fn set_role(&self, id: Uuid, role: Role) -> Result<User, LedgerError> {
        let mut users = self.users.write().await;
        let user = users.get_mut(&id).ok_or(LedgerError::UserNotFound(id))?;
        user.set_role(role);
        tracing::debug!(user_id = %id, role = %role, "role updated");
        Ok(user.clone())
    }

    /// Remove a user record. The transaction log keeps its entries: the
    /// ledger history is append-only even across deletions.
    pub async fn delete_user(&self, id: Uuid) -> Result<User, LedgerError> {
        let mut users = self.users.write().await;
        let user = users.remove(&id).ok_or(LedgerError::UserNotFound(id))?;
        tracing::debug!(user_id = %id, username = %user.username(), "user deleted");
        Ok(user)
    }

    // =========================================================================
    // Transfer serialization
    // =========================================================================

    /// The serialization guard for one account. Held across the whole
    /// read-check-write sequence by the hardened transfer path; the
    /// vulnerable path never takes it.
    pub async fn account_guard(&self, id: Uuid) -> Arc<Mutex<()>> {
        let mut guards = self.guards.lock().await;
        guards.entry(id).or_default().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProtectionProfile;
    use crate::domain::Credential;
    use rust_decimal_macros::dec;

    fn sample_user(name: &str, balance: Decimal) -> User {
        let profile = ProtectionProfile::vulnerable();
        User::new(
            name,
            format!("{name}@example.com"),
            Credential::derive("password", &profile),
            Role::User,
            Balance::new(balance),
        )
    }

    #[tokio::test]
    async fn test_create_and_lookup() {
        let ledger = AccountLedger::new();
        let user = ledger
            .create_user(sample_user("alice", dec!(100)))
            .await
            .unwrap();

        assert!(ledger.get_user(user.id()).await.is_some());
        assert!(ledger.get_user_by_username("ALICE").await.is_some());
        assert!(ledger.get_user_by_username("bob").await.is_none());
    }

    #[tokio::test]
    async fn test_duplicate_username_rejected() {
        let ledger = AccountLedger::new();
        ledger
            .create_user(sample_user("alice", dec!(100)))
            .await
            .unwrap();

        let result = ledger.create_user(sample_user("Alice", dec!(50))).await;
        assert!(matches!(result, Err(LedgerError::UsernameTaken(_))));
        assert_eq!(ledger.user_count().await, 1);
    }

    #[tokio::test]
    async fn test_apply_transaction_adjusts_balance() {
        let ledger = AccountLedger::new();
        let user = ledger
            .create_user(sample_user("alice", dec!(100)))
            .await
            .unwrap();

        let credit = Transaction::new(
            user.id(),
            TransactionKind::Credit,
            dec!(50),
            "Salary Deposit",
            None,
        );
        let balance = ledger.apply_transaction(user.id(), credit).await.unwrap();
        assert_eq!(balance.value(), dec!(150));

        let debit = Transaction::new(
            user.id(),
            TransactionKind::Debit,
            dec!(200),
            "Overdraw",
            None,
        );
        // The ledger does not check sufficiency; that is the caller's job.
        let balance = ledger.apply_transaction(user.id(), debit).await.unwrap();
        assert_eq!(balance.value(), dec!(-50));

        assert_eq!(ledger.transactions_for(user.id()).await.len(), 2);
    }

    #[tokio::test]
    async fn test_transaction_for_unknown_user() {
        let ledger = AccountLedger::new();
        let tx = Transaction::new(
            Uuid::new_v4(),
            TransactionKind::Credit,
            dec!(10),
            "ghost",
            None,
        );
        let result = ledger.apply_transaction(tx.account_id, tx).await;
        assert!(matches!(result, Err(LedgerError::UserNotFound(_))));
    }

    #[tokio::test]
    async fn test_set_role_and_delete() {
        let ledger = AccountLedger::new();
        let user = ledger
            .create_user(sample_user("alice", dec!(100)))
            .await
            .unwrap();

        let promoted = ledger.set_role(user.id(), Role::Admin).await.unwrap();
        assert!(promoted.is_admin());

        ledger.delete_user(user.id()).await.unwrap();
        assert!(ledger.get_user(user.id()).await.is_none());
        assert!(matches!(
            ledger.delete_user(user.id()).await,
            Err(LedgerError::UserNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_log_survives_deletion() {
        let ledger = AccountLedger::new();
        let user = ledger
            .create_user(sample_user("alice", dec!(100)))
            .await
            .unwrap();

        let tx = Transaction::new(user.id(), TransactionKind::Debit, dec!(10), "fee", None);
        ledger.apply_transaction(user.id(), tx).await.unwrap();
        ledger.delete_user(user.id()).await.unwrap();

        assert_eq!(ledger.log_len().await, 1);
        assert_eq!(ledger.transactions_for(user.id()).await.len(), 1);
    }

    #[tokio::test]
    async fn test_all_users_ordered() {
        let ledger = AccountLedger::new();
        for name in ["charlie", "alice", "bob"] {
            ledger.create_user(sample_user(name, dec!(10))).await.unwrap();
        }

        let names: Vec<String> = ledger
            .all_users()
            .await
            .iter()
            .map(|u| u.username().to_string())
            .collect();
        assert_eq!(names, vec!["alice", "bob", "charlie"]);
        assert_eq!(ledger.total_balance().await, dec!(30));
    }

    #[tokio::test]
    async fn test_account_guard_identity() {
        let ledger = AccountLedger::new();
        let id = Uuid::new_v4();
        let a = ledger.account_guard(id).await;
        let b = ledger.account_guard(id).await;
        assert!(Arc::ptr_eq(&a, &b));
    }
}
