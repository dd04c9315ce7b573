//! Permission sets for the two evaluation strategies
//!
//! The strategy is chosen once per engine. Every set created by a
//! [`RoleStore`](super::RoleStore) carries the same variant, so the two
//! representations never mix inside one engine.

use crate::matcher::WildcardMatcher;
use crate::registry::PermissionRegistry;
use crate::types::PermissionMask;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Evaluation strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Registered permissions are bits in a `u64` mask
    Bitmask,
    /// Permission names are stored and compared as strings
    Legacy,
}

impl Strategy {
    pub fn from_bit_system(use_bit_system: bool) -> Self {
        if use_bit_system {
            Strategy::Bitmask
        } else {
            Strategy::Legacy
        }
    }

    /// Empty registry for this strategy; only the bit strategy is bounded by
    /// the mask width
    pub fn new_registry(self) -> PermissionRegistry {
        match self {
            Strategy::Bitmask => PermissionRegistry::new(),
            Strategy::Legacy => PermissionRegistry::unbounded(),
        }
    }
}

/// Set of granted permissions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PermissionSet {
    /// Bit strategy: registered names live in `mask`; wildcard patterns and
    /// unregistered literals are kept verbatim in `patterns`
    Mask {
        mask: PermissionMask,
        patterns: BTreeSet<String>,
    },
    /// Legacy strategy: every name kept verbatim
    Names(BTreeSet<String>),
}

impl PermissionSet {
    /// Empty set for the given strategy
    pub fn empty(strategy: Strategy) -> Self {
        match strategy {
            Strategy::Bitmask => PermissionSet::Mask {
                mask: 0,
                patterns: BTreeSet::new(),
            },
            Strategy::Legacy => PermissionSet::Names(BTreeSet::new()),
        }
    }

    /// Build a set from names
    pub fn from_names<'a, I>(
        strategy: Strategy,
        names: I,
        registry: &PermissionRegistry,
        matcher: &WildcardMatcher,
    ) -> Self
    where
        I: IntoIterator<Item = &'a String>,
    {
        let mut set = Self::empty(strategy);
        for name in names {
            set.insert(name, registry, matcher);
        }
        set
    }

    pub fn strategy(&self) -> Strategy {
        match self {
            PermissionSet::Mask { .. } => Strategy::Bitmask,
            PermissionSet::Names(_) => Strategy::Legacy,
        }
    }

    /// Add a permission or pattern
    pub fn insert(&mut self, name: &str, registry: &PermissionRegistry, matcher: &WildcardMatcher) {
        match self {
            PermissionSet::Mask { mask, patterns } => {
                match registry.bit_of(name).filter(|_| !matcher.is_pattern(name)) {
                    Some(bit) => *mask |= bit,
                    None => {
                        patterns.insert(name.to_string());
                    }
                }
            }
            PermissionSet::Names(names) => {
                names.insert(name.to_string());
            }
        }
    }

    /// OR raw bits into the set
    ///
    /// The legacy variant has no mask, so bits are expanded through the registry.
    pub fn insert_mask(&mut self, bits: PermissionMask, registry: &PermissionRegistry) {
        if bits == 0 {
            return;
        }

        match self {
            PermissionSet::Mask { mask, .. } => *mask |= bits,
            PermissionSet::Names(names) => names.extend(registry.names_in(bits)),
        }
    }

    /// Remove a permission or pattern; returns `true` if something was removed
    pub fn remove(&mut self, name: &str, registry: &PermissionRegistry) -> bool {
        match self {
            PermissionSet::Mask { mask, patterns } => {
                if patterns.remove(name) {
                    return true;
                }
                match registry.bit_of(name) {
                    Some(bit) if *mask & bit != 0 => {
                        *mask &= !bit;
                        true
                    }
                    _ => false,
                }
            }
            PermissionSet::Names(names) => names.remove(name),
        }
    }

    /// Union `other` into `self`
    pub fn extend(&mut self, other: &PermissionSet, registry: &PermissionRegistry) {
        match (self, other) {
            (
                PermissionSet::Mask { mask, patterns },
                PermissionSet::Mask {
                    mask: other_mask,
                    patterns: other_patterns,
                },
            ) => {
                *mask |= *other_mask;
                patterns.extend(other_patterns.iter().cloned());
            }
            (PermissionSet::Names(names), PermissionSet::Names(other_names)) => {
                names.extend(other_names.iter().cloned());
            }
            (PermissionSet::Mask { patterns, .. }, PermissionSet::Names(other_names)) => {
                patterns.extend(other_names.iter().cloned());
            }
            (
                PermissionSet::Names(names),
                PermissionSet::Mask {
                    mask: other_mask,
                    patterns: other_patterns,
                },
            ) => {
                names.extend(registry.names_in(*other_mask));
                names.extend(other_patterns.iter().cloned());
            }
        }
    }

    /// Returns `true` if this set grants `permission`
    pub fn covers(
        &self,
        permission: &str,
        registry: &PermissionRegistry,
        matcher: &WildcardMatcher,
    ) -> bool {
        match self {
            PermissionSet::Mask { mask, patterns } => {
                let by_bit = registry
                    .bit_of(permission)
                    .map(|bit| mask & bit != 0)
                    .unwrap_or(false);

                by_bit || matcher.matches_any(patterns, permission)
            }
            PermissionSet::Names(names) => matcher.matches_any(names, permission),
        }
    }

    /// Returns `true` if every permission of `other` is covered by `self`
    pub fn is_superset_of(
        &self,
        other: &PermissionSet,
        registry: &PermissionRegistry,
        matcher: &WildcardMatcher,
    ) -> bool {
        if let (
            PermissionSet::Mask { mask, .. },
            PermissionSet::Mask {
                mask: other_mask,
                patterns: other_patterns,
            },
        ) = (self, other)
        {
            if other_patterns.is_empty() && other_mask & !mask == 0 {
                return true;
            }
        }

        other
            .names(registry)
            .iter()
            .all(|name| self.covers(name, registry, matcher))
    }

    /// Bit part of the set (always 0 for the legacy variant)
    pub fn mask(&self) -> PermissionMask {
        match self {
            PermissionSet::Mask { mask, .. } => *mask,
            PermissionSet::Names(_) => 0,
        }
    }

    /// Names in the set: mask bits (by bit order) followed by verbatim entries
    pub fn names(&self, registry: &PermissionRegistry) -> Vec<String> {
        match self {
            PermissionSet::Mask { mask, patterns } => {
                let mut names = registry.names_in(*mask);
                names.extend(patterns.iter().cloned());
                names
            }
            PermissionSet::Names(names) => names.iter().cloned().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            PermissionSet::Mask { mask, patterns } => *mask == 0 && patterns.is_empty(),
            PermissionSet::Names(names) => names.is_empty(),
        }
    }
}
