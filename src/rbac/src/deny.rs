//! Per-user explicit denials
//!
//! A denial is a permission pattern stored against a user id. It is checked
//! with the same wildcard rules as grants and always wins over them.

use crate::matcher::WildcardMatcher;
use dashmap::DashMap;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Thread-safe deny list keyed by user id
#[derive(Debug, Clone, Default)]
pub struct DenyStore {
    entries: Arc<DashMap<String, BTreeSet<String>>>,
}

impl DenyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deny `pattern` for `user_id`; returns `false` if it was already denied
    pub fn deny(&self, user_id: &str, pattern: &str) -> bool {
        self.entries
            .entry(user_id.to_string())
            .or_default()
            .insert(pattern.to_string())
    }

    /// Remove the exact `pattern` string; returns `true` if it was present
    pub fn allow(&self, user_id: &str, pattern: &str) -> bool {
        let removed = match self.entries.get_mut(user_id) {
            Some(mut patterns) => patterns.remove(pattern),
            None => return false,
        };

        self.entries.remove_if(user_id, |_, patterns| patterns.is_empty());
        removed
    }

    /// Drop every denial for a user; returns how many were removed
    pub fn clear(&self, user_id: &str) -> usize {
        self.entries
            .remove(user_id)
            .map(|(_, patterns)| patterns.len())
            .unwrap_or(0)
    }

    /// Denied patterns for a user, sorted
    pub fn denied_patterns(&self, user_id: &str) -> Vec<String> {
        self.entries
            .get(user_id)
            .map(|patterns| patterns.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Returns `true` if any stored pattern for the user covers `permission`
    pub fn is_denied(&self, user_id: &str, permission: &str, matcher: &WildcardMatcher) -> bool {
        self.entries
            .get(user_id)
            .map(|patterns| matcher.matches_any(patterns.iter(), permission))
            .unwrap_or(false)
    }

    /// Copy of every entry, ordered by user id
    pub fn entries(&self) -> BTreeMap<String, Vec<String>> {
        self.entries
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().iter().cloned().collect()))
            .collect()
    }

    /// Number of users with at least one denial
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Forget every denial
    pub fn clear_all(&self) {
        self.entries.clear();
    }
}
