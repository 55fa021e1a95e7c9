//! Protection profile
//!
//! The configuration snapshot that selects vulnerable vs. hardened behavior
//! per feature. A profile is fixed for the lifetime of a simulation run and
//! shared read-only by every component.

use std::env;
use std::str::FromStr;

use rust_decimal::Decimal;

/// Default minimum password length. Deliberately weak.
const DEFAULT_PASSWORD_MIN_LENGTH: usize = 3;

/// Balance granted to newly registered accounts.
const DEFAULT_STARTING_BALANCE: &str = "1000.00";

/// Width of the yield window in the unguarded transfer path, in milliseconds.
const DEFAULT_RACE_WINDOW_MS: u64 = 25;

/// Protection profile for a simulation run.
///
/// Each flag independently toggles one simulated defense. All fields are
/// public: the profile is plain data, constructed once and never mutated
/// while the engine runs.
#[derive(Debug, Clone, PartialEq)]
pub struct ProtectionProfile {
    /// Treat quotes and separators in query input as literal data.
    pub sql_injection_protection: bool,

    /// Enforce role checks on privileged operations.
    pub access_control_enforced: bool,

    /// Serialize read-check-write transfer sequences per account.
    pub race_condition_safe: bool,

    /// Store credentials as plaintext instead of salted digests.
    pub plaintext_passwords: bool,

    /// Minimum accepted password length at registration.
    pub password_min_length: usize,

    /// Escape text fields before they are stored or handed out.
    pub xss_protection: bool,

    /// Balance granted to newly registered accounts.
    pub starting_balance: Decimal,

    /// Yield window between the stale balance check and the debit in the
    /// unguarded transfer path. Wide enough that concurrent callers
    /// reliably interleave.
    pub race_window_ms: u64,
}

impl ProtectionProfile {
    /// Every defense enabled.
    pub fn hardened() -> Self {
        Self {
            sql_injection_protection: true,
            access_control_enforced: true,
            race_condition_safe: true,
            plaintext_passwords: false,
            password_min_length: DEFAULT_PASSWORD_MIN_LENGTH,
            xss_protection: true,
            starting_balance: Decimal::from_str(DEFAULT_STARTING_BALANCE)
                .expect("Invalid DEFAULT_STARTING_BALANCE constant"),
            race_window_ms: DEFAULT_RACE_WINDOW_MS,
        }
    }

    /// Every defense disabled. This is the sandbox's default posture.
    pub fn vulnerable() -> Self {
        Self {
            sql_injection_protection: false,
            access_control_enforced: false,
            race_condition_safe: false,
            plaintext_passwords: true,
            xss_protection: false,
            ..Self::hardened()
        }
    }

    /// Load a profile from `SECUREBANK_*` environment variables.
    ///
    /// Unset variables fall back to the vulnerable defaults; set variables
    /// must parse or the load fails.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::vulnerable();

        Ok(Self {
            sql_injection_protection: env_flag(
                "SECUREBANK_SQL_INJECTION_PROTECTION",
                defaults.sql_injection_protection,
            )?,
            access_control_enforced: env_flag(
                "SECUREBANK_ACCESS_CONTROL_ENFORCED",
                defaults.access_control_enforced,
            )?,
            race_condition_safe: env_flag(
                "SECUREBANK_RACE_CONDITION_SAFE",
                defaults.race_condition_safe,
            )?,
            plaintext_passwords: env_flag(
                "SECUREBANK_PLAINTEXT_PASSWORDS",
                defaults.plaintext_passwords,
            )?,
            password_min_length: env_parsed(
                "SECUREBANK_PASSWORD_MIN_LENGTH",
                defaults.password_min_length,
            )?,
            xss_protection: env_flag("SECUREBANK_XSS_PROTECTION", defaults.xss_protection)?,
            starting_balance: env_parsed(
                "SECUREBANK_STARTING_BALANCE",
                defaults.starting_balance,
            )?,
            race_window_ms: env_parsed("SECUREBANK_RACE_WINDOW_MS", defaults.race_window_ms)?,
        })
    }
}

impl Default for ProtectionProfile {
    fn default() -> Self {
        Self::vulnerable()
    }
}

/// Names of the profile flags, used by the vulnerability catalog to tie each
/// simulated flaw to the defense that governs it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProtectionFlag {
    SqlInjectionProtection,
    AccessControlEnforced,
    RaceConditionSafe,
    PlaintextPasswords,
    PasswordMinLength,
    XssProtection,
}

impl ProtectionFlag {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProtectionFlag::SqlInjectionProtection => "sql_injection_protection",
            ProtectionFlag::AccessControlEnforced => "access_control_enforced",
            ProtectionFlag::RaceConditionSafe => "race_condition_safe",
            ProtectionFlag::PlaintextPasswords => "plaintext_passwords",
            ProtectionFlag::PasswordMinLength => "password_min_length",
            ProtectionFlag::XssProtection => "xss_protection",
        }
    }
}

impl std::fmt::Display for ProtectionFlag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(&'static str),
}

fn env_flag(name: &'static str, default: bool) -> Result<bool, ConfigError> {
    match env::var(name) {
        Ok(raw) => match raw.trim() {
            "1" => Ok(true),
            "0" => Ok(false),
            other => other
                .to_ascii_lowercase()
                .parse()
                .map_err(|_| ConfigError::InvalidValue(name)),
        },
        Err(_) => Ok(default),
    }
}

fn env_parsed<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(name)),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_hardened_profile() {
        let profile = ProtectionProfile::hardened();
        assert!(profile.sql_injection_protection);
        assert!(profile.access_control_enforced);
        assert!(profile.race_condition_safe);
        assert!(!profile.plaintext_passwords);
        assert!(profile.xss_protection);
        assert_eq!(profile.password_min_length, 3);
        assert_eq!(profile.starting_balance, dec!(1000.00));
    }

    #[test]
    fn test_vulnerable_profile() {
        let profile = ProtectionProfile::vulnerable();
        assert!(!profile.sql_injection_protection);
        assert!(!profile.access_control_enforced);
        assert!(!profile.race_condition_safe);
        assert!(profile.plaintext_passwords);
        assert!(!profile.xss_protection);
        // The weak length floor applies in both postures.
        assert_eq!(profile.password_min_length, 3);
    }

    #[test]
    fn test_default_is_vulnerable() {
        assert_eq!(ProtectionProfile::default(), ProtectionProfile::vulnerable());
    }

    // Environment mutation is process-global, so overrides and rejection are
    // exercised in a single test to avoid interleaving with parallel tests.
    #[test]
    fn test_from_env() {
        std::env::set_var("SECUREBANK_SQL_INJECTION_PROTECTION", "true");
        std::env::set_var("SECUREBANK_PASSWORD_MIN_LENGTH", "8");
        let profile = ProtectionProfile::from_env().unwrap();
        assert!(profile.sql_injection_protection);
        assert_eq!(profile.password_min_length, 8);

        std::env::set_var("SECUREBANK_RACE_WINDOW_MS", "soon");
        let result = ProtectionProfile::from_env();
        assert!(matches!(result, Err(ConfigError::InvalidValue(_))));

        std::env::remove_var("SECUREBANK_SQL_INJECTION_PROTECTION");
        std::env::remove_var("SECUREBANK_PASSWORD_MIN_LENGTH");
        std::env::remove_var("SECUREBANK_RACE_WINDOW_MS");
    }

    #[test]
    fn test_flag_names() {
        assert_eq!(
            ProtectionFlag::SqlInjectionProtection.as_str(),
            "sql_injection_protection"
        );
        assert_eq!(ProtectionFlag::XssProtection.to_string(), "xss_protection");
    }
}
