//! Vulnerability catalog
//!
//! Static registry of the flaws this sandbox simulates. Pure metadata for
//! reporting and test assertions: nothing here influences runtime behavior.
//! Each record names the protection flag that governs its flaw.

use serde::{Deserialize, Serialize};

use crate::config::ProtectionFlag;

/// Severity grading
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "Low",
            Severity::Medium => "Medium",
            Severity::High => "High",
            Severity::Critical => "Critical",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One catalogued flaw.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VulnerabilityRecord {
    pub id: &'static str,
    pub title: &'static str,
    pub severity: Severity,
    pub exploit_example: &'static str,
    pub impact: &'static str,
    /// The profile flag whose state decides whether the exploit lands
    pub related_flag: ProtectionFlag,
}

/// Immutable, ordered registry of simulated vulnerabilities.
pub struct VulnerabilityCatalog {
    records: Vec<VulnerabilityRecord>,
}

impl VulnerabilityCatalog {
    pub fn new() -> Self {
        Self {
            records: Self::build_records(),
        }
    }

    fn build_records() -> Vec<VulnerabilityRecord> {
        vec![
            VulnerabilityRecord {
                id: "A01",
                title: "Broken Access Control",
                severity: Severity::High,
                exploit_example: "Call an admin operation with any session",
                impact: "Full system access, user data exposure",
                related_flag: ProtectionFlag::AccessControlEnforced,
            },
            VulnerabilityRecord {
                id: "A02",
                title: "Cryptographic Failures",
                severity: Severity::High,
                exploit_example: "Dump the stored credential of any account",
                impact: "Credential theft, session hijacking",
                related_flag: ProtectionFlag::PlaintextPasswords,
            },
            VulnerabilityRecord {
                id: "A03",
                title: "SQL Injection",
                severity: Severity::Critical,
                exploit_example: "admin' OR '1'='1' --",
                impact: "Authentication bypass, data theft",
                related_flag: ProtectionFlag::SqlInjectionProtection,
            },
            VulnerabilityRecord {
                id: "A04",
                title: "Transfer Race Condition",
                severity: Severity::High,
                exploit_example: "Submit two transfers before the first debit lands",
                impact: "Double-spend, negative balance",
                related_flag: ProtectionFlag::RaceConditionSafe,
            },
            VulnerabilityRecord {
                id: "A05",
                title: "Weak Password Policy",
                severity: Severity::Medium,
                exploit_example: "Register with a three-character password",
                impact: "Trivial brute force of user accounts",
                related_flag: ProtectionFlag::PasswordMinLength,
            },
            VulnerabilityRecord {
                id: "A07",
                title: "Cross-Site Scripting (XSS)",
                severity: Severity::Medium,
                exploit_example: "<script>alert('XSS')</script>",
                impact: "Session hijacking, data theft",
                related_flag: ProtectionFlag::XssProtection,
            },
        ]
    }

    /// All records, in stable catalog order.
    pub fn records(&self) -> &[VulnerabilityRecord] {
        &self.records
    }

    /// Look up the record tied to a protection flag.
    pub fn by_flag(&self, flag: ProtectionFlag) -> Option<&VulnerabilityRecord> {
        self.records.iter().find(|r| r.related_flag == flag)
    }

    pub fn by_id(&self, id: &str) -> Option<&VulnerabilityRecord> {
        self.records.iter().find(|r| r.id == id)
    }
}

impl Default for VulnerabilityCatalog {
    fn default() -> Self {
        Self::new()
    }
}
