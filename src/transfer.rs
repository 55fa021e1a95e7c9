//! Transfer processor
//!
//! Funds movement between accounts, and the one place in the engine with a
//! real ordering hazard. The read-check-write sequence against the sender's
//! balance runs in two modes:
//!
//! - `race_condition_safe = true`: the whole sequence holds the sender's
//!   account guard, so concurrent transfers serialize and the second one
//!   sees the post-debit balance.
//! - `race_condition_safe = false`: the sufficiency check runs against a
//!   stale read, then the task yields for the configured race window before
//!   the debit lands. Two concurrent transfers both pass the check and the
//!   balance goes negative: the reproducible double-spend.

use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use serde_json::json;
use uuid::Uuid;

use crate::audit::{AuditAction, AuditLog};
use crate::config::ProtectionProfile;
use crate::domain::{Amount, Session, Transaction, TransactionKind, TransactionPair, User};
use crate::error::TransferError;
use crate::ledger::AccountLedger;
use crate::sanitize::sanitize_text;

/// Description used when the caller supplies none.
const DEFAULT_DESCRIPTION: &str = "Money Transfer";

pub struct TransferProcessor {
    ledger: Arc<AccountLedger>,
    audit: Arc<AuditLog>,
    profile: ProtectionProfile,
}

impl TransferProcessor {
    pub fn new(
        ledger: Arc<AccountLedger>,
        audit: Arc<AuditLog>,
        profile: ProtectionProfile,
    ) -> Self {
        Self {
            ledger,
            audit,
            profile,
        }
    }

    /// Move funds from the session's user to a recipient.
    pub async fn transfer(
        &self,
        session: &Session,
        recipient_username: &str,
        amount: Decimal,
        description: &str,
    ) -> Result<TransactionPair, TransferError> {
        let amount =
            Amount::new(amount).map_err(|e| TransferError::InvalidAmount(e.to_string()))?;

        let sender = self
            .ledger
            .get_user(session.user_id)
            .await
            .ok_or(TransferError::UnknownSender)?;

        let recipient = self
            .ledger
            .get_user_by_username(recipient_username)
            .await
            .ok_or_else(|| TransferError::UnknownRecipient(recipient_username.to_string()))?;

        let description = if description.is_empty() {
            DEFAULT_DESCRIPTION.to_string()
        } else {
            sanitize_text(description, &self.profile)
        };

        let result = if self.profile.race_condition_safe {
            self.debit_serialized(&sender, &amount, &description, &recipient)
                .await
        } else {
            self.debit_unguarded(&sender, &amount, &description, &recipient)
                .await
        };

        let debit = match result {
            Ok(debit) => debit,
            Err(err) => {
                self.audit
                    .record(
                        AuditAction::TransferRejected,
                        Some(sender.id()),
                        json!({
                            "recipient": recipient.username(),
                            "amount": amount.value(),
                            "reason": err.to_string(),
                        }),
                    )
                    .await;
                return Err(err);
            }
        };

        let credit = Transaction::new(
            recipient.id(),
            TransactionKind::Credit,
            amount.value(),
            description.clone(),
            Some(sender.username().to_string()),
        );
        self.ledger
            .apply_transaction(recipient.id(), credit.clone())
            .await
            .map_err(|_| TransferError::UnknownRecipient(recipient_username.to_string()))?;

        self.audit
            .record(
                AuditAction::TransferExecuted,
                Some(sender.id()),
                json!({
                    "recipient": recipient.username(),
                    "amount": amount.value(),
                }),
            )
            .await;
        tracing::info!(
            from = %sender.username(),
            to = %recipient.username(),
            amount = %amount,
            "transfer executed"
        );

        Ok(TransactionPair { debit, credit })
    }

    /// Hardened path: read-check-write as one serialized unit per account.
    async fn debit_serialized(
        &self,
        sender: &User,
        amount: &Amount,
        description: &str,
        recipient: &User,
    ) -> Result<Transaction, TransferError> {
        let guard = self.ledger.account_guard(sender.id()).await;
        let _held = guard.lock().await;

        let balance = self
            .ledger
            .balance_of(sender.id())
            .await
            .map_err(|_| TransferError::UnknownSender)?;

        if !balance.is_sufficient_for(amount) {
            return Err(TransferError::insufficient_funds(
                amount.value(),
                balance.value(),
            ));
        }

        self.apply_debit(sender.id(), amount, description, recipient)
            .await
    }

    /// Vulnerable path: the check uses a stale read and the task yields
    /// before the debit lands, so concurrent callers interleave here.
    async fn debit_unguarded(
        &self,
        sender: &User,
        amount: &Amount,
        description: &str,
        recipient: &User,
    ) -> Result<Transaction, TransferError> {
        let balance = self
            .ledger
            .balance_of(sender.id())
            .await
            .map_err(|_| TransferError::UnknownSender)?;

        if !balance.is_sufficient_for(amount) {
            return Err(TransferError::insufficient_funds(
                amount.value(),
                balance.value(),
            ));
        }

        tokio::time::sleep(Duration::from_millis(self.profile.race_window_ms)).await;

        self.apply_debit(sender.id(), amount, description, recipient)
            .await
    }

    async fn apply_debit(
        &self,
        sender_id: Uuid,
        amount: &Amount,
        description: &str,
        recipient: &User,
    ) -> Result<Transaction, TransferError> {
        let debit = Transaction::new(
            sender_id,
            TransactionKind::Debit,
            amount.value(),
            description,
            Some(recipient.username().to_string()),
        );
        self.ledger
            .apply_transaction(sender_id, debit.clone())
            .await
            .map_err(|_| TransferError::UnknownSender)?;
        Ok(debit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Balance, Credential, Role};
    use rust_decimal_macros::dec;

    async fn setup(
        profile: ProtectionProfile,
    ) -> (TransferProcessor, Arc<AccountLedger>, Session, User) {
        let ledger = Arc::new(AccountLedger::new());

        let sender = ledger
            .create_user(User::new(
                "alice",
                "alice@example.com",
                Credential::derive("s3cret", &profile),
                Role::User,
                Balance::new(dec!(100.00)),
            ))
            .await
            .unwrap();
        let recipient = ledger
            .create_user(User::new(
                "bob",
                "bob@example.com",
                Credential::derive("s3cret", &profile),
                Role::User,
                Balance::new(dec!(50.00)),
            ))
            .await
            .unwrap();

        let session = Session::issue(sender.id());

        let processor = TransferProcessor::new(
            Arc::clone(&ledger),
            Arc::new(AuditLog::new()),
            profile,
        );
        (processor, ledger, session, recipient)
    }

    #[tokio::test]
    async fn test_successful_transfer() {
        let (processor, ledger, session, recipient) =
            setup(ProtectionProfile::hardened()).await;

        let pair = processor
            .transfer(&session, "bob", dec!(30.00), "Rent share")
            .await
            .unwrap();

        assert_eq!(pair.debit.kind, TransactionKind::Debit);
        assert_eq!(pair.credit.kind, TransactionKind::Credit);
        assert_eq!(pair.debit.counterparty.as_deref(), Some("bob"));
        assert_eq!(pair.credit.counterparty.as_deref(), Some("alice"));

        assert_eq!(
            ledger.balance_of(session.user_id).await.unwrap().value(),
            dec!(70.00)
        );
        assert_eq!(
            ledger.balance_of(recipient.id()).await.unwrap().value(),
            dec!(80.00)
        );
    }

    #[tokio::test]
    async fn test_invalid_amounts() {
        let (processor, _, session, _) = setup(ProtectionProfile::hardened()).await;

        for amount in [dec!(0), dec!(-5), dec!(0.001)] {
            let result = processor.transfer(&session, "bob", amount, "x").await;
            assert!(
                matches!(result, Err(TransferError::InvalidAmount(_))),
                "amount: {amount}"
            );
        }
    }

    #[tokio::test]
    async fn test_unknown_recipient() {
        let (processor, ledger, session, _) = setup(ProtectionProfile::hardened()).await;

        let result = processor
            .transfer(&session, "mallory", dec!(10.00), "x")
            .await;
        assert!(matches!(result, Err(TransferError::UnknownRecipient(_))));

        // Nothing was debited.
        assert_eq!(
            ledger.balance_of(session.user_id).await.unwrap().value(),
            dec!(100.00)
        );
    }

    #[tokio::test]
    async fn test_insufficient_funds() {
        let (processor, ledger, session, _) = setup(ProtectionProfile::hardened()).await;

        let result = processor
            .transfer(&session, "bob", dec!(100.01), "x")
            .await;
        assert!(matches!(
            result,
            Err(TransferError::InsufficientFunds { .. })
        ));
        assert_eq!(ledger.log_len().await, 0);
    }

    #[tokio::test]
    async fn test_unknown_sender() {
        let (processor, ledger, session, _) = setup(ProtectionProfile::hardened()).await;
        ledger.delete_user(session.user_id).await.unwrap();

        let result = processor.transfer(&session, "bob", dec!(10.00), "x").await;
        assert!(matches!(result, Err(TransferError::UnknownSender)));
    }

    #[tokio::test]
    async fn test_description_sanitized_when_protected() {
        let (processor, _, session, _) = setup(ProtectionProfile::hardened()).await;

        let pair = processor
            .transfer(&session, "bob", dec!(1.00), "<script>alert('XSS')</script>")
            .await
            .unwrap();
        assert!(!pair.debit.description.contains('<'));
        assert!(pair.debit.description.contains("&lt;script&gt;"));
    }

    #[tokio::test]
    async fn test_description_raw_when_unprotected() {
        let mut profile = ProtectionProfile::hardened();
        profile.xss_protection = false;
        let (processor, _, session, _) = setup(profile).await;

        let pair = processor
            .transfer(&session, "bob", dec!(1.00), "<script>alert('XSS')</script>")
            .await
            .unwrap();
        assert_eq!(pair.debit.description, "<script>alert('XSS')</script>");
    }

    #[tokio::test]
    async fn test_default_description() {
        let (processor, _, session, _) = setup(ProtectionProfile::hardened()).await;
        let pair = processor
            .transfer(&session, "bob", dec!(1.00), "")
            .await
            .unwrap();
        assert_eq!(pair.debit.description, DEFAULT_DESCRIPTION);
    }

    #[tokio::test]
    async fn test_serialized_transfers_cannot_double_spend() {
        let (processor, ledger, session, _) = setup(ProtectionProfile::hardened()).await;

        let (a, b) = tokio::join!(
            processor.transfer(&session, "bob", dec!(80.00), "first"),
            processor.transfer(&session, "bob", dec!(80.00), "second"),
        );

        // Exactly one succeeds; the loser saw the post-debit balance.
        assert_ne!(a.is_ok(), b.is_ok());
        let loser = if a.is_ok() { b } else { a };
        assert!(matches!(
            loser,
            Err(TransferError::InsufficientFunds { .. })
        ));

        assert_eq!(
            ledger.balance_of(session.user_id).await.unwrap().value(),
            dec!(20.00)
        );
    }

    #[tokio::test]
    async fn test_unguarded_transfers_double_spend() {
        let mut profile = ProtectionProfile::hardened();
        profile.race_condition_safe = false;
        profile.race_window_ms = 10;
        let (processor, ledger, session, _) = setup(profile).await;

        let (a, b) = tokio::join!(
            processor.transfer(&session, "bob", dec!(80.00), "first"),
            processor.transfer(&session, "bob", dec!(80.00), "second"),
        );

        // Both checks ran against the stale balance, so both succeed and
        // the account ends up overdrawn.
        assert!(a.is_ok());
        assert!(b.is_ok());
        assert_eq!(
            ledger.balance_of(session.user_id).await.unwrap().value(),
            dec!(-60.00)
        );
    }
}
