//! User record
//!
//! Account holder data owned by the ledger. Roles are a closed enumeration;
//! credentials are stored either as plaintext or as a salted digest depending
//! on the active profile.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::ProtectionProfile;
use crate::domain::Balance;

/// User role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Default for Role {
    fn default() -> Self {
        Self::User
    }
}

/// Stored login credential.
///
/// The plaintext variant exists on purpose: it is the simulated
/// cryptographic failure, selected by `ProtectionProfile::plaintext_passwords`
/// at derivation time. The hashed variant is a salted SHA-256 digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credential {
    Plaintext(String),
    Sha256 { salt: String, digest: String },
}

impl Credential {
    /// Derive a credential from a raw password per the active profile.
    pub fn derive(password: &str, profile: &ProtectionProfile) -> Self {
        if profile.plaintext_passwords {
            Credential::Plaintext(password.to_string())
        } else {
            let salt = random_hex(16);
            let digest = sha256_hex(&format!("{salt}{password}"));
            Credential::Sha256 { salt, digest }
        }
    }

    /// Check a raw password against the stored credential.
    pub fn verify(&self, password: &str) -> bool {
        match self {
            Credential::Plaintext(stored) => stored == password,
            Credential::Sha256 { salt, digest } => {
                sha256_hex(&format!("{salt}{password}")) == *digest
            }
        }
    }
}

/// Calculate SHA-256 hash and return as hex string
pub(crate) fn sha256_hex(input: &str) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}

/// Random bytes as a hex string
pub(crate) fn random_hex(bytes: usize) -> String {
    use rand::RngCore;
    let mut buf = vec![0u8; bytes];
    rand::thread_rng().fill_bytes(&mut buf);
    hex::encode(buf)
}

/// Account holder record.
///
/// The credential is intentionally excluded from serialization: search
/// results and reports hand `User` values to the presentation layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    id: Uuid,
    username: String,
    email: String,
    #[serde(skip, default = "blank_credential")]
    credential: Credential,
    role: Role,
    balance: Balance,
    created_at: DateTime<Utc>,
}

fn blank_credential() -> Credential {
    Credential::Plaintext(String::new())
}

impl User {
    /// Create a new user record with a fresh id.
    pub fn new(
        username: impl Into<String>,
        email: impl Into<String>,
        credential: Credential,
        role: Role,
        balance: Balance,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            username: username.into(),
            email: email.into(),
            credential,
            role,
            balance,
            created_at: Utc::now(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn balance(&self) -> Balance {
        self.balance
    }

    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub(crate) fn set_role(&mut self, role: Role) {
        self.role = role;
    }

    pub(crate) fn set_balance(&mut self, balance: Balance) {
        self.balance = balance;
    }
}
