//! Error taxonomy
//!
//! Every operation returns a typed result; the engine never panics in
//! non-test code and never terminates the process. Exploit outcomes
//! (tautology matches, destructive queries) are NOT errors: they are
//! reported as successful results carrying flags so callers can observe
//! them.

use thiserror::Error;
use uuid::Uuid;

/// Registration failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Password shorter than the profile's minimum length
    #[error("Password too short")]
    WeakPassword,

    /// Password and confirmation do not match
    #[error("Passwords don't match")]
    PasswordMismatch,

    /// Username already registered (case-insensitive)
    #[error("Username is already taken: {0}")]
    UsernameTaken(String),
}

/// Login failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,
}

/// Authorization failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccessError {
    /// Session resolved but the role does not satisfy the requirement
    #[error("Access denied")]
    Denied,

    /// Session token unknown, revoked, or its user no longer exists
    #[error("Unknown session")]
    UnknownSession,

    /// The operation's target user does not exist
    #[error("Target user not found: {0}")]
    TargetNotFound(Uuid),
}

/// Transfer failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransferError {
    /// Amount is zero, negative, too precise, or out of range
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Sender balance below the requested amount
    #[error("Insufficient funds: required {required}, available {available}")]
    InsufficientFunds {
        required: rust_decimal::Decimal,
        available: rust_decimal::Decimal,
    },

    /// Recipient username resolves to no user
    #[error("Unknown recipient: {0}")]
    UnknownRecipient(String),

    /// The session's user no longer exists in the ledger
    #[error("Unknown sender")]
    UnknownSender,
}

/// Ledger store failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("Username is already taken: {0}")]
    UsernameTaken(String),

    #[error("User not found: {0}")]
    UserNotFound(Uuid),
}

impl TransferError {
    /// Create an insufficient funds error
    pub fn insufficient_funds(
        required: rust_decimal::Decimal,
        available: rust_decimal::Decimal,
    ) -> Self {
        Self::InsufficientFunds {
            required,
            available,
        }
    }
}
