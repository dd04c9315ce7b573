//! Property tests for the registry, the wildcard matcher and denials

use cretoai_rbac::matcher::{matches, WildcardMatcher};
use cretoai_rbac::{EngineConfig, PermissionEngine, PermissionRegistry, User};
use proptest::prelude::*;
use std::collections::HashSet;
use tokio_test::{assert_err, assert_ok};

fn token() -> impl Strategy<Value = String> {
    "[a-z]{1,6}"
}

fn permission() -> impl Strategy<Value = String> {
    prop::collection::vec(token(), 1..4).prop_map(|tokens| tokens.join(":"))
}

// ============================================================================
// SCENARIOS
// ============================================================================

#[test]
fn test_wildcard_coverage_examples() {
    assert!(matches("posts:*", "posts:read"));
    assert!(!matches("posts:*", "comments:read"));
    assert!(matches("*:*:delete", "user:post:delete"));
    assert!(!matches("*:*:delete", "user:post:read"));
}

#[test]
fn test_registry_capacity() {
    let mut registry = PermissionRegistry::new();
    for i in 0..64 {
        assert_ok!(registry.register(&format!("p:{}", i)));
    }
    assert_err!(registry.register("p:overflow"));
}

// ============================================================================
// PROPERTIES
// ============================================================================

proptest! {
    #[test]
    fn prop_bits_are_unique_single_bits(names in prop::collection::hash_set(permission(), 1..64)) {
        let mut registry = PermissionRegistry::new();
        let mut seen = HashSet::new();

        for name in &names {
            let bit = registry.register(name).unwrap();
            prop_assert!(bit.is_power_of_two());
            prop_assert!(seen.insert(bit), "bit {} reused", bit);
        }
    }

    #[test]
    fn prop_register_is_idempotent(names in prop::collection::vec(permission(), 1..32)) {
        let mut registry = PermissionRegistry::new();
        for name in &names {
            let first = registry.register(name).unwrap();
            prop_assert_eq!(registry.register(name).unwrap(), first);
            prop_assert_eq!(registry.bit_of(name), Some(first));
        }
    }

    #[test]
    fn prop_pattern_matches_itself(pattern in permission()) {
        prop_assert!(matches(&pattern, &pattern));
    }

    #[test]
    fn prop_star_matches_any_token(
        tokens in prop::collection::vec(token(), 1..5),
        idx in 0usize..5,
    ) {
        let idx = idx % tokens.len();
        let mut pattern = tokens.clone();
        pattern[idx] = "*".to_string();

        let permission = tokens.join(":");
        prop_assert!(matches(&pattern.join(":"), &permission));

        // One token more or less never matches
        let longer = format!("{}:extra", permission);
        prop_assert!(!matches(&pattern.join(":"), &longer));
    }

    #[test]
    fn prop_disabled_wildcards_are_plain_equality(a in permission(), b in permission()) {
        let matcher = WildcardMatcher::new(false);
        prop_assert_eq!(matcher.matches(&a, &b), a == b);
    }

    #[test]
    fn prop_deny_allow_round_trip(
        granted in prop::collection::vec(permission(), 0..6),
        checked in permission(),
    ) {
        let engine = PermissionEngine::new(EngineConfig::default()).unwrap();
        assert_ok!(engine.create_role("subject", &granted));
        let user = User::with_roles("u", ["subject"]);

        let before = engine.has_permission(&user, &checked);

        assert_ok!(engine.deny_permission("u", &checked));
        prop_assert!(!engine.has_permission(&user, &checked));

        assert_ok!(engine.allow_permission("u", &checked));
        prop_assert_eq!(engine.has_permission(&user, &checked), before);
    }
}
