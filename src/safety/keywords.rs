//! Destructive and sensitive vocabularies

use adapter_core::to_snake_case;

/// Terms that escalate a capability to `destructive`
pub(crate) const DESTRUCTIVE_KEYWORDS: &[&str] = &[
    "delete", "purge", "destroy", "wipe", "remove", "erase", "drop", "truncate",
];

/// Matched as substrings of a squashed (lowercase alphanumeric) field name
pub(crate) const SENSITIVE_TERMS: &[&str] = &[
    "password",
    "passwd",
    "token",
    "secret",
    "creditcard",
    "cardnumber",
    "apikey",
    "cvv",
    "privatekey",
];

/// Too short to match as substrings; whole tokens only
pub(crate) const SENSITIVE_TOKENS: &[&str] = &["ssn"];

/// Inflections accepted after a keyword stem
const SUFFIXES: &[&str] = &["", "s", "d", "ed", "es", "ing"];

/// Lowercase word tokens of free text or identifiers
pub(crate) fn tokens(text: &str) -> impl Iterator<Item = String> {
    to_snake_case(text)
        .split('_')
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect::<Vec<_>>()
        .into_iter()
}

/// `deleted`, `deleting`, `dropped` all match their base keyword
pub(crate) fn matches_keyword(token: &str, keyword: &str) -> bool {
    let stems = [keyword, keyword.strip_suffix('e').unwrap_or(keyword)];
    stems.iter().any(|stem| {
        let Some(rest) = token.strip_prefix(stem) else {
            return false;
        };
        if SUFFIXES.contains(&rest) {
            return true;
        }
        // Doubled final consonant: drop -> dropped
        stem.chars()
            .last()
            .and_then(|c| rest.strip_prefix(c))
            .is_some_and(|tail| !tail.is_empty() && SUFFIXES.contains(&tail))
    })
}

/// Squash a field name to lowercase alphanumerics: `Credit-Card` -> `creditcard`
pub(crate) fn squash(name: &str) -> String {
    name.chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect()
}
