//! Text sanitization
//!
//! Escapes markup-significant characters in free-text fields before they are
//! stored or handed to the presentation layer. Governed by the
//! `xss_protection` flag: with it off, input passes through verbatim, which
//! is the simulated stored-XSS flaw.

use crate::config::ProtectionProfile;

/// Escape table for markup-significant characters.
const ESCAPES: &[(char, &str)] = &[
    ('&', "&amp;"),
    ('<', "&lt;"),
    ('>', "&gt;"),
    ('"', "&quot;"),
    ('\'', "&#x27;"),
];

/// Sanitize a text field per the active profile.
pub fn sanitize_text(input: &str, profile: &ProtectionProfile) -> String {
    if !profile.xss_protection {
        return input.to_string();
    }
    escape(input)
}

fn escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match ESCAPES.iter().find(|(raw, _)| *raw == c) {
            Some((_, replacement)) => out.push_str(replacement),
            None => out.push(c),
        }
    }
    out
}
