//! Transaction records
//!
//! Entries of the append-only ledger log. A transaction is immutable once
//! appended; nothing edits or removes one.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Direction of a ledger entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Credit,
    Debit,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Credit => "credit",
            TransactionKind::Debit => "debit",
        }
    }
}

/// An immutable ledger entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    /// The account this entry belongs to
    pub account_id: Uuid,
    pub kind: TransactionKind,
    pub amount: Decimal,
    pub description: String,
    pub timestamp: DateTime<Utc>,
    /// Username of the other party, if any. Not an owning reference: the
    /// entry survives the counterparty's deletion.
    pub counterparty: Option<String>,
}

impl Transaction {
    pub fn new(
        account_id: Uuid,
        kind: TransactionKind,
        amount: Decimal,
        description: impl Into<String>,
        counterparty: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            account_id,
            kind,
            amount,
            description: description.into(),
            timestamp: Utc::now(),
            counterparty,
        }
    }
}

/// The two halves of a completed transfer: the sender's debit and the
/// recipient's credit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionPair {
    pub debit: Transaction,
    pub credit: Transaction,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_transaction_serialization() {
        let tx = Transaction::new(
            Uuid::new_v4(),
            TransactionKind::Debit,
            dec!(75.50),
            "Gas Station",
            Some("jane_smith".to_string()),
        );

        let json = serde_json::to_string(&tx).unwrap();
        assert!(json.contains("debit"));
        assert!(json.contains("Gas Station"));
        assert!(json.contains("jane_smith"));

        let back: Transaction = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, tx.id);
        assert_eq!(back.amount, dec!(75.50));
    }

    #[test]
    fn test_kind_as_str() {
        assert_eq!(TransactionKind::Credit.as_str(), "credit");
        assert_eq!(TransactionKind::Debit.as_str(), "debit");
    }
}
