//! Engine facade
//!
//! Wires the ledger, session store, audit log, and operation components
//! into one object exposing the full operation surface. Everything is
//! injected; no component reads ambient state.

use std::sync::Arc;

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::access::AccessController;
use crate::admin::{AdminOperations, QueryReport, SystemSummary};
use crate::audit::AuditLog;
use crate::auth::{AuthEngine, RegisterRequest};
use crate::catalog::{VulnerabilityCatalog, VulnerabilityRecord};
use crate::config::ProtectionProfile;
use crate::domain::{Balance, Credential, Role, Session, SessionStore, Transaction, TransactionPair, User};
use crate::error::{AccessError, AuthError, LedgerError, TransferError, ValidationError};
use crate::ledger::AccountLedger;
use crate::transfer::TransferProcessor;

/// Demo fixtures: username, password, email, role, starting balance.
const DEMO_ACCOUNTS: &[(&str, &str, &str, Role, &str)] = &[
    ("admin", "admin", "admin@securebank.com", Role::Admin, "50000.00"),
    ("john_doe", "sunshine1", "john@email.com", Role::User, "2500.00"),
    ("jane_smith", "letmein22", "jane@email.com", Role::User, "1750.50"),
];

/// The simulated bank.
///
/// One instance is one simulation run: the protection profile is fixed at
/// construction and every component shares the same ledger, session store,
/// and audit log.
pub struct SecureBank {
    profile: ProtectionProfile,
    ledger: Arc<AccountLedger>,
    sessions: Arc<SessionStore>,
    audit: Arc<AuditLog>,
    catalog: VulnerabilityCatalog,
    auth: AuthEngine,
    transfers: TransferProcessor,
    admin: AdminOperations,
}

impl SecureBank {
    pub fn new(profile: ProtectionProfile) -> Self {
        let ledger = Arc::new(AccountLedger::new());
        let sessions = Arc::new(SessionStore::new());
        let audit = Arc::new(AuditLog::new());

        let auth = AuthEngine::new(
            Arc::clone(&ledger),
            Arc::clone(&sessions),
            Arc::clone(&audit),
            profile.clone(),
        );
        let transfers = TransferProcessor::new(
            Arc::clone(&ledger),
            Arc::clone(&audit),
            profile.clone(),
        );
        let access = AccessController::new(
            Arc::clone(&ledger),
            Arc::clone(&sessions),
            profile.clone(),
        );
        let admin = AdminOperations::new(
            Arc::clone(&ledger),
            access,
            Arc::clone(&audit),
            profile.clone(),
        );

        Self {
            profile,
            ledger,
            sessions,
            audit,
            catalog: VulnerabilityCatalog::new(),
            auth,
            transfers,
            admin,
        }
    }

    /// Seed the demo fixtures the exercises assume.
    pub async fn seed_demo_accounts(&self) -> Result<(), LedgerError> {
        for (username, password, email, role, balance) in DEMO_ACCOUNTS {
            let balance: Decimal = balance
                .parse()
                .expect("Invalid DEMO_ACCOUNTS balance constant");
            self.ledger
                .create_user(User::new(
                    *username,
                    *email,
                    Credential::derive(password, &self.profile),
                    *role,
                    Balance::new(balance),
                ))
                .await?;
        }
        tracing::info!(count = DEMO_ACCOUNTS.len(), "demo accounts seeded");
        Ok(())
    }

    // =========================================================================
    // Operation surface
    // =========================================================================

    pub async fn register(&self, request: RegisterRequest) -> Result<User, ValidationError> {
        self.auth.register(request).await
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<Session, AuthError> {
        self.auth.login(username, password).await
    }

    pub async fn logout(&self, token: &str) -> bool {
        self.auth.logout(token).await
    }

    pub async fn search(&self, query: &str) -> Vec<User> {
        self.admin.search(query).await
    }

    pub async fn run_raw_query(
        &self,
        session: &Session,
        query: &str,
    ) -> Result<QueryReport, AccessError> {
        self.admin.run_raw_query(session, query).await
    }

    pub async fn transfer(
        &self,
        session: &Session,
        recipient: &str,
        amount: Decimal,
        description: &str,
    ) -> Result<TransactionPair, TransferError> {
        self.transfers
            .transfer(session, recipient, amount, description)
            .await
    }

    pub async fn promote_user(
        &self,
        session: &Session,
        target_id: Uuid,
    ) -> Result<User, AccessError> {
        self.admin.promote_user(session, target_id).await
    }

    pub async fn demote_user(
        &self,
        session: &Session,
        target_id: Uuid,
    ) -> Result<User, AccessError> {
        self.admin.demote_user(session, target_id).await
    }

    pub async fn delete_user(
        &self,
        session: &Session,
        target_id: Uuid,
    ) -> Result<(), AccessError> {
        self.admin.delete_user(session, target_id).await
    }

    pub fn list_vulnerabilities(&self) -> &[VulnerabilityRecord] {
        self.catalog.records()
    }

    pub async fn system_summary(&self) -> SystemSummary {
        self.admin.system_summary().await
    }

    pub async fn transactions_for(&self, user_id: Uuid) -> Vec<Transaction> {
        self.ledger.transactions_for(user_id).await
    }

    // =========================================================================
    // Shared state accessors
    // =========================================================================

    pub fn profile(&self) -> &ProtectionProfile {
        &self.profile
    }

    pub fn ledger(&self) -> &AccountLedger {
        &self.ledger
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub fn audit(&self) -> &AuditLog {
        &self.audit
    }
}
