//! Query evaluator
//!
//! Simulates the classification step a SQL layer would perform on free-text
//! input, without any real SQL engine. The rules are deliberately enumerated
//! and centralized here so tests can target them directly.
//!
//! With `sql_injection_protection` off, quote breakouts and tautology
//! patterns are honored the way naive string concatenation would honor them.
//! With it on, the evaluator degrades to treating every character as literal
//! data and the call sites fall back to plain equality or substring matching.

use serde::{Deserialize, Serialize};

use crate::config::ProtectionProfile;

/// What the input is being evaluated for. Destructive-statement detection
/// only applies to raw queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryPurpose {
    Login,
    Search,
    RawQuery,
}

/// Classifier verdict. The fields are independent outputs, not mutually
/// exclusive branches: a raw query can be both destructive and malformed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryOutcome {
    /// A tautology pattern would make the simulated WHERE clause always true
    pub matched_always_true: bool,

    /// The statement would drop or delete data if executed
    pub destructive: bool,

    /// The input would fail to parse (unterminated string, stray separator)
    pub syntax_error: bool,
}

/// Pattern-based query classifier.
#[derive(Debug, Clone)]
pub struct QueryEvaluator {
    profile: ProtectionProfile,
}

impl QueryEvaluator {
    pub fn new(profile: ProtectionProfile) -> Self {
        Self { profile }
    }

    /// Classify a raw input string.
    ///
    /// Rules, in order:
    /// 1. Destructive classification (`drop`/`delete`, raw queries only) is
    ///    purely lexical and applies regardless of protection; whether a
    ///    destructive statement gets "executed" is the caller's decision.
    /// 2. With protection on, nothing else fires: quotes and separators are
    ///    literal data.
    /// 3. With protection off and a quote present: a tautology at or after
    ///    the first quote sets `matched_always_true`; failing that, an odd
    ///    quote count is an unterminated string and sets `syntax_error`.
    /// 4. With protection off, a statement separator in a search input also
    ///    sets `syntax_error` unless a tautology already matched.
    pub fn evaluate(&self, raw_input: &str, purpose: QueryPurpose) -> QueryOutcome {
        let lower = raw_input.to_lowercase();
        let mut outcome = QueryOutcome::default();

        if purpose == QueryPurpose::RawQuery
            && (lower.contains("drop") || lower.contains("delete"))
        {
            outcome.destructive = true;
        }

        if self.profile.sql_injection_protection {
            return outcome;
        }

        if let Some(quote_pos) = lower.find('\'') {
            if contains_tautology(&lower[quote_pos..]) {
                outcome.matched_always_true = true;
                return outcome;
            }
            if lower.matches('\'').count() % 2 == 1 {
                outcome.syntax_error = true;
            }
        }

        if purpose == QueryPurpose::Search && lower.contains(';') {
            outcome.syntax_error = true;
        }

        outcome
    }
}

/// Detect a boolean tautology in the region at or after a quote breakout.
///
/// Two enumerated forms: the classic quoted `'1'='1`, and any `lhs = rhs`
/// comparison whose operand tokens are equal once quoting is stripped.
fn contains_tautology(tail: &str) -> bool {
    if tail.contains("'1'='1") {
        return true;
    }

    for (i, c) in tail.char_indices() {
        if c != '=' {
            continue;
        }
        let left = tail[..i]
            .trim_end()
            .rsplit(char::is_whitespace)
            .next()
            .unwrap_or("")
            .trim_matches(TOKEN_TRIM);
        let right = tail[i + 1..]
            .trim_start()
            .split(char::is_whitespace)
            .next()
            .unwrap_or("")
            .trim_matches(TOKEN_TRIM);

        if !left.is_empty() && left == right {
            return true;
        }
    }

    false
}

/// Characters stripped from comparison operand tokens before equality.
const TOKEN_TRIM: &[char] = &['\'', '"', '(', ')', ';', ','];
