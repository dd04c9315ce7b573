//! Colon-delimited wildcard matching for permission patterns
//!
//! A permission is a sequence of tokens separated by `:` (`admin:users:delete`).
//! A pattern token `*` matches exactly one token at the same position, and a
//! pattern only matches a permission with the same number of tokens:
//!
//! ```
//! use cretoai_rbac::matcher::matches;
//!
//! assert!(matches("posts:*", "posts:read"));
//! assert!(matches("*:*:delete", "user:post:delete"));
//! assert!(!matches("posts:*", "posts:read:draft"));
//! ```
//!
//! Matching is token-wise only (no regex), so it is linear in the number of
//! tokens and allocation-free.

/// Token separator
pub const SEPARATOR: char = ':';

/// Single-token wildcard
pub const WILDCARD: &str = "*";

/// Returns `true` if `pattern` covers `permission`
pub fn matches(pattern: &str, permission: &str) -> bool {
    if !has_wildcard(pattern) {
        return pattern == permission;
    }

    let mut pattern_tokens = pattern.split(SEPARATOR);
    let mut permission_tokens = permission.split(SEPARATOR);

    loop {
        match (pattern_tokens.next(), permission_tokens.next()) {
            (None, None) => return true,
            (Some(p), Some(t)) => {
                if p != WILDCARD && p != t {
                    return false;
                }
            }
            // Token counts differ
            _ => return false,
        }
    }
}

/// Returns `true` if any token of `name` is a standalone `*`
pub fn has_wildcard(name: &str) -> bool {
    name.split(SEPARATOR).any(|token| token == WILDCARD)
}

/// Matcher bound to the engine's wildcard setting
///
/// With wildcards disabled every comparison is plain string equality and a
/// literal `*` is ordinary text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WildcardMatcher {
    enabled: bool,
}

impl WildcardMatcher {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    /// Whether `*` tokens are interpreted
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Returns `true` if `pattern` covers `permission`
    pub fn matches(&self, pattern: &str, permission: &str) -> bool {
        if self.enabled {
            matches(pattern, permission)
        } else {
            pattern == permission
        }
    }

    /// Whether `name` must be evaluated as a pattern rather than a single permission
    pub fn is_pattern(&self, name: &str) -> bool {
        self.enabled && has_wildcard(name)
    }

    /// Returns `true` if any of `patterns` covers `permission`
    pub fn matches_any<'a, I>(&self, patterns: I, permission: &str) -> bool
    where
        I: IntoIterator<Item = &'a String>,
    {
        patterns
            .into_iter()
            .any(|pattern| self.matches(pattern, permission))
    }
}

impl Default for WildcardMatcher {
    fn default() -> Self {
        Self::new(true)
    }
}
