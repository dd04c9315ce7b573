//! Permission engine integration tests
//!
//! Decision scenarios, strict mode, strategy parity, denials and observers
//! exercised through the public `PermissionEngine` API.

use cretoai_rbac::{
    AuditEvent, AuthContext, DenyReason, EngineConfig, EngineObserver, PermissionEngine,
    RbacConfig, RbacError, Strategy, User,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

fn engine_with(config: EngineConfig) -> PermissionEngine {
    PermissionEngine::new(config).unwrap()
}

fn default_engine() -> PermissionEngine {
    engine_with(EngineConfig::default())
}

fn legacy_config() -> EngineConfig {
    EngineConfig {
        use_bit_system: false,
        ..EngineConfig::default()
    }
}

fn strict_config() -> EngineConfig {
    EngineConfig {
        strict_mode: true,
        ..EngineConfig::default()
    }
}

/// Same engine under both strategies
fn both_strategies() -> Vec<PermissionEngine> {
    vec![default_engine(), engine_with(legacy_config())]
}

// ============================================================================
// BASIC DECISIONS
// ============================================================================

#[test]
fn test_editor_role() {
    for engine in both_strategies() {
        engine.create_role("editor", &["post:read", "post:write"]).unwrap();
        let user = User::with_roles("u1", ["editor"]);

        assert!(engine.has_permission(&user, "post:write"));
        assert!(engine.has_permission(&user, "post:read"));
        assert!(!engine.has_permission(&user, "post:delete"));
    }
}

#[test]
fn test_admin_wildcard_with_denial() {
    for engine in both_strategies() {
        engine.create_role("admin", &["admin:*"]).unwrap();
        let user = User::with_roles("a1", ["admin"]);

        assert!(engine.has_permission(&user, "admin:settings"));
        assert!(engine.deny_permission("a1", "admin:settings").unwrap());

        assert!(!engine.has_permission(&user, "admin:settings"));
        assert!(engine.has_permission(&user, "admin:users"));
    }
}

#[test]
fn test_combined_roles() {
    for engine in both_strategies() {
        engine.create_role("reader", &["content:read"]).unwrap();
        engine.create_role("writer", &["content:write"]).unwrap();
        let user = User::with_roles("u", ["reader", "writer"]);

        assert!(engine.has_permission(&user, "content:read"));
        assert!(engine.has_permission(&user, "content:write"));
        assert!(!engine.has_permission(&user, "content:delete"));
    }
}

#[test]
fn test_multi_segment_wildcards() {
    let engine = default_engine();
    engine.create_role("janitor", &["*:*:delete"]).unwrap();
    let user = User::with_roles("j", ["janitor"]);

    assert!(engine.has_permission(&user, "user:post:delete"));
    assert!(!engine.has_permission(&user, "user:post:read"));
    // Token counts must match
    assert!(!engine.has_permission(&user, "post:delete"));
}

#[test]
fn test_wildcards_disabled() {
    let engine = engine_with(EngineConfig {
        enable_wildcards: false,
        ..EngineConfig::default()
    });
    engine.create_role("admin", &["admin:*"]).unwrap();
    let user = User::with_roles("a", ["admin"]);

    assert!(!engine.has_permission(&user, "admin:users"));
    assert!(engine.has_permission(&user, "admin:*"));
}

#[test]
fn test_unknown_roles_grant_nothing() {
    let engine = default_engine();
    engine.create_role("reader", &["content:read"]).unwrap();

    let user = User::with_roles("u", ["ghost"]);
    let result = engine.authorize(&user, "content:read");
    assert!(!result.allowed);
    assert_eq!(result.reason, Some(DenyReason::LacksPermission));
}

#[test]
fn test_direct_grants() {
    let engine = default_engine();
    let bit = engine.register_permission("billing:export").unwrap();

    let user = User::new("u").with_permission("reports:*").with_mask(bit);
    assert!(engine.has_permission(&user, "reports:weekly"));
    assert!(engine.has_permission(&user, "billing:export"));
    assert!(!engine.has_permission(&user, "billing:refund"));
}

// ============================================================================
// AUTHORIZE
// ============================================================================

#[test]
fn test_authorize_reasons() {
    let engine = default_engine();
    engine.create_role("editor", &["post:read"]).unwrap();
    let user = User::with_roles("u1", ["editor"]);

    let allowed = engine.authorize(&user, "post:read");
    assert!(allowed.allowed);
    assert_eq!(allowed.reason, None);
    assert_eq!(allowed.permission, "post:read");
    assert_eq!(allowed.user.id, "u1");
    assert!(!allowed.cached);

    let denied = engine.authorize(&user, "post:write");
    assert_eq!(denied.reason, Some(DenyReason::LacksPermission));

    let invalid = engine.authorize(&User::with_roles("", ["editor"]), "post:read");
    assert_eq!(invalid.reason, Some(DenyReason::InvalidUser));

    let empty = engine.authorize(&user, "");
    assert_eq!(empty.reason, Some(DenyReason::InvalidPermission));
}

#[test]
fn test_authorize_with_context() {
    let engine = default_engine();
    engine.create_role("viewer", &["report:view"]).unwrap();

    let context = AuthContext::new(User::with_roles("v", ["viewer"]), "report", "view")
        .with_metadata("ip", "10.0.0.1");
    let result = engine.authorize_with_context(&context);
    assert!(result.allowed);
    assert_eq!(result.permission, "report:view");

    let context = AuthContext::new(User::with_roles("v", ["viewer"]), "report", "export");
    assert!(!engine.authorize_with_context(&context).allowed);
}

#[test]
fn test_any_and_all() {
    let engine = default_engine();
    engine.create_role("editor", &["post:read", "post:write"]).unwrap();
    let user = User::with_roles("u", ["editor"]);

    assert!(engine.has_any_permission(&user, &["post:delete", "post:read"]));
    assert!(!engine.has_any_permission(&user, &["post:delete", "post:publish"]));
    assert!(engine.has_all_permissions(&user, &["post:read", "post:write"]));
    assert!(!engine.has_all_permissions(&user, &["post:read", "post:delete"]));

    let none: [&str; 0] = [];
    assert!(!engine.has_any_permission(&user, &none));
    assert!(engine.has_all_permissions(&user, &none));
}

// ============================================================================
// DENIALS
// ============================================================================

#[test]
fn test_deny_allow_round_trip() {
    for engine in both_strategies() {
        engine.create_role("editor", &["post:read", "post:write"]).unwrap();
        let user = User::with_roles("u1", ["editor"]);

        for permission in ["post:read", "post:delete"] {
            let before = engine.has_permission(&user, permission);

            engine.deny_permission("u1", permission).unwrap();
            assert!(!engine.has_permission(&user, permission));

            engine.allow_permission("u1", permission).unwrap();
            assert_eq!(engine.has_permission(&user, permission), before);
        }
    }
}

#[test]
fn test_wildcard_denial_wins() {
    let engine = default_engine();
    engine.create_role("editor", &["post:read", "post:write"]).unwrap();
    let user = User::with_roles("u1", ["editor"]);

    engine.deny_permission("u1", "post:*").unwrap();
    let result = engine.authorize(&user, "post:read");
    assert_eq!(result.reason, Some(DenyReason::ExplicitlyDenied));

    // Allow removes the exact string only
    assert!(!engine.allow_permission("u1", "post:read").unwrap());
    assert!(!engine.has_permission(&user, "post:read"));

    assert!(engine.allow_permission("u1", "post:*").unwrap());
    assert!(engine.has_permission(&user, "post:read"));
}

#[test]
fn test_denials_are_per_user() {
    let engine = default_engine();
    engine.create_role("editor", &["post:write"]).unwrap();

    engine.deny_permission("u1", "post:write").unwrap();
    assert!(!engine.has_permission(&User::with_roles("u1", ["editor"]), "post:write"));
    assert!(engine.has_permission(&User::with_roles("u2", ["editor"]), "post:write"));
}

#[test]
fn test_denied_permissions_listing() {
    let engine = default_engine();
    engine.deny_permission("u1", "post:write").unwrap();
    engine.deny_permission("u1", "admin:*").unwrap();
    assert!(!engine.deny_permission("u1", "admin:*").unwrap());

    assert_eq!(
        engine.get_denied_permissions("u1"),
        vec!["admin:*".to_string(), "post:write".to_string()]
    );
    assert!(engine.get_denied_permissions("u2").is_empty());

    assert_eq!(engine.clear_denied_permissions("u1").unwrap(), 2);
    assert!(engine.get_denied_permissions("u1").is_empty());
}

#[test]
fn test_empty_deny_input_ignored() {
    let engine = default_engine();
    assert!(!engine.deny_permission("", "post:write").unwrap());
    assert!(!engine.deny_permission("u1", "").unwrap());
    assert!(engine.get_denied_permissions("").is_empty());
}

// ============================================================================
// STRICT MODE
// ============================================================================

#[test]
fn test_strict_mode_errors() {
    let engine = engine_with(strict_config());

    engine.register_permission("post:read").unwrap();
    assert!(matches!(
        engine.register_permission("post:read"),
        Err(RbacError::DuplicatePermission(_))
    ));

    engine.create_role("reader", &["post:read"]).unwrap();
    assert!(matches!(
        engine.create_role("reader", &["post:read"]),
        Err(RbacError::DuplicateRole(_))
    ));
    assert!(matches!(
        engine.create_role("writer", &["post:write"]),
        Err(RbacError::UndefinedPermissionReference { .. })
    ));
    assert!(matches!(
        engine.add_permission_to_role("ghost", "post:read"),
        Err(RbacError::RoleNotFound(_))
    ));
    assert!(matches!(
        engine.delete_role("ghost"),
        Err(RbacError::RoleNotFound(_))
    ));

    assert!(matches!(
        engine.deny_permission("", "post:read"),
        Err(RbacError::InvalidInput(_))
    ));
    assert!(matches!(
        engine.deny_permission("u1", "post:write"),
        Err(RbacError::UndefinedPermissionReference { .. })
    ));
    assert!(engine.deny_permission("u1", "post:*").unwrap());
}

#[test]
fn test_lenient_mode_accepts_redefinition() {
    let engine = default_engine();
    assert_eq!(engine.register_permission("post:read").unwrap(), 1);
    assert_eq!(engine.register_permission("post:read").unwrap(), 1);

    engine.create_role("reader", &["post:read"]).unwrap();
    engine.create_role("reader", &["post:write"]).unwrap();
    assert_eq!(
        engine.get_role_permissions("reader"),
        Some(vec!["post:write".to_string()])
    );

    assert!(!engine.add_permission_to_role("ghost", "post:read").unwrap());
    assert!(!engine.delete_role("ghost").unwrap());
}

#[test]
fn test_capacity_exceeded() {
    let engine = default_engine();
    for i in 0..64 {
        engine.register_permission(&format!("p:{}", i)).unwrap();
    }

    assert_eq!(engine.permission_bit("p:63"), Some(1u64 << 63));
    assert!(matches!(
        engine.register_permission("p:64"),
        Err(RbacError::CapacityExceeded { width: 64 })
    ));
    // Existing names stay idempotent at capacity
    assert_eq!(engine.register_permission("p:0").unwrap(), 1);
}

#[test]
fn test_legacy_strategy_is_not_width_bounded() {
    let engine = engine_with(legacy_config());
    for i in 0..70 {
        engine.register_permission(&format!("p:{}", i)).unwrap();
    }

    assert_eq!(engine.permission_bit("p:63"), Some(1u64 << 63));
    assert_eq!(engine.permission_bit("p:69"), None);
    assert_eq!(engine.get_all_permissions().len(), 70);

    engine.create_role("wide", &["p:69", "p:0"]).unwrap();
    let user = User::with_roles("u1", ["wide"]);
    assert!(engine.has_permission(&user, "p:69"));
    assert!(!engine.has_permission(&user, "p:68"));

    // Snapshots carry the names without a bit
    let restored = engine_with(legacy_config());
    restored.deserialize_json(&engine.serialize_json().unwrap()).unwrap();
    assert_eq!(restored.get_all_permissions(), engine.get_all_permissions());
    assert!(restored.has_permission(&user, "p:69"));
}

#[test]
fn test_legacy_config_with_many_permissions() {
    let permissions: Vec<serde_json::Value> = (0..70)
        .map(|i| serde_json::json!({ "name": format!("res{}:read", i) }))
        .collect();
    let document = serde_json::json!({
        "permissions": permissions,
        "roles": [{ "name": "reader", "permissions": ["res69:read"] }],
        "options": { "useBitSystem": false, "strictMode": true }
    });
    let config = RbacConfig::from_json_str(&document.to_string()).unwrap();

    let engine = PermissionEngine::from_config(&config).unwrap();
    assert_eq!(engine.get_all_permissions().len(), 70);
    assert!(engine.has_permission(&User::with_roles("u1", ["reader"]), "res69:read"));

    // The bit strategy keeps its width limit
    let bitmask = RbacConfig {
        options: Some(EngineConfig::default()),
        ..config
    };
    assert!(matches!(
        PermissionEngine::from_config(&bitmask),
        Err(RbacError::CapacityExceeded { width: 64 })
    ));
}

// ============================================================================
// ROLE MANAGEMENT
// ============================================================================

#[test]
fn test_role_lifecycle() {
    for engine in both_strategies() {
        engine.create_role("editor", &["post:read"]).unwrap();
        let user = User::with_roles("u", ["editor"]);
        assert!(engine.has_role("editor"));

        assert!(engine.add_permission_to_role("editor", "post:write").unwrap());
        assert!(engine.has_permission(&user, "post:write"));

        assert!(engine.remove_permission_from_role("editor", "post:write").unwrap());
        assert!(!engine.has_permission(&user, "post:write"));

        assert!(engine.delete_role("editor").unwrap());
        assert!(!engine.has_role("editor"));
        assert!(!engine.has_permission(&user, "post:read"));
        assert_eq!(engine.get_role_permissions("editor"), None);
    }
}

#[test]
fn test_queries() {
    let engine = default_engine();
    engine.create_role("writer", &["post:write", "post:read"]).unwrap();
    engine.create_role("admin", &["admin:*"]).unwrap();

    assert_eq!(engine.get_all_roles(), vec!["admin".to_string(), "writer".to_string()]);

    let permissions = engine.get_all_permissions();
    assert_eq!(permissions.len(), 2);
    assert_eq!(permissions[0].name, "post:write");
    assert_eq!(permissions[0].bit, 1);

    let user = User::with_roles("u", ["writer", "admin"]).with_permission("report:view");
    let granted = engine.get_user_permissions(&user);
    assert!(granted.contains(&"post:read".to_string()));
    assert!(granted.contains(&"admin:*".to_string()));
    assert!(granted.contains(&"report:view".to_string()));
}

#[test]
fn test_can_act_as_role() {
    for engine in both_strategies() {
        engine.create_role("basic", &["doc:read"]).unwrap();
        engine.create_role("advanced", &["doc:read", "doc:write"]).unwrap();

        assert!(engine.can_act_as_role("advanced", "basic"));
        assert!(!engine.can_act_as_role("basic", "advanced"));
        assert!(!engine.can_act_as_role("ghost", "basic"));
    }
}

#[test]
fn test_can_act_as_role_by_level() {
    let engine = default_engine();
    engine.create_role("lead", &["team:manage"]).unwrap();
    engine.create_role("dev", &["code:write"]).unwrap();
    assert!(!engine.can_act_as_role("lead", "dev"));

    assert!(engine.set_role_level("lead", 20).unwrap());
    assert!(engine.set_role_level("dev", 10).unwrap());
    assert_eq!(engine.get_role_level("lead"), Some(20));
    assert_eq!(engine.get_role_level("ghost"), None);

    assert!(engine.can_act_as_role("lead", "dev"));
    assert!(!engine.can_act_as_role("dev", "lead"));
}

#[test]
fn test_wildcard_role_covers_concrete_role() {
    let engine = default_engine();
    engine.create_role("post-admin", &["post:*"]).unwrap();
    engine.create_role("post-editor", &["post:read", "post:write"]).unwrap();

    assert!(engine.can_act_as_role("post-admin", "post-editor"));
    assert!(!engine.can_act_as_role("post-editor", "post-admin"));
}

#[test]
fn test_strategy_parity() {
    let bitmask = default_engine();
    let legacy = engine_with(legacy_config());
    assert_eq!(bitmask.strategy(), Strategy::Bitmask);
    assert_eq!(legacy.strategy(), Strategy::Legacy);

    for engine in [&bitmask, &legacy] {
        engine.create_role("editor", &["post:read", "post:write"]).unwrap();
        engine.create_role("admin", &["admin:*", "post:*"]).unwrap();
        engine.deny_permission("x", "post:write").unwrap();
    }

    let users = [
        User::with_roles("u", ["editor"]),
        User::with_roles("x", ["editor", "admin"]),
        User::with_roles("y", ["admin"]),
        User::new("z").with_permission("post:read"),
    ];
    let permissions = ["post:read", "post:write", "post:delete", "admin:users", "admin"];

    for user in &users {
        for permission in permissions {
            assert_eq!(
                bitmask.authorize(user, permission),
                legacy.authorize(user, permission),
                "{} / {}",
                user.id,
                permission
            );
        }
    }
}

// ============================================================================
// OBSERVERS
// ============================================================================

#[derive(Default)]
struct Recorder {
    decisions: Mutex<Vec<(String, bool)>>,
    roles: Mutex<Vec<String>>,
    denies: Mutex<Vec<(String, bool)>>,
}

impl EngineObserver for Recorder {
    fn name(&self) -> &str {
        "recorder"
    }

    fn on_role_changed(&self, role: &str, _permissions: &[String]) {
        self.roles.lock().push(role.to_string());
    }

    fn on_decision(&self, event: &AuditEvent) {
        self.decisions
            .lock()
            .push((event.permission.clone(), event.allowed));
    }

    fn on_deny_changed(&self, _user_id: &str, pattern: &str, denied: bool) {
        self.denies.lock().push((pattern.to_string(), denied));
    }
}

struct Exploding;

impl EngineObserver for Exploding {
    fn on_decision(&self, _event: &AuditEvent) {
        panic!("observer failure");
    }

    fn on_role_changed(&self, _role: &str, _permissions: &[String]) {
        panic!("observer failure");
    }
}

#[test]
fn test_observers_see_every_change() {
    let engine = default_engine();
    let recorder = Arc::new(Recorder::default());
    engine.add_observer(recorder.clone());
    assert_eq!(engine.observer_count(), 1);

    engine.create_role("editor", &["post:read"]).unwrap();
    engine.add_permission_to_role("editor", "post:write").unwrap();
    engine.delete_role("editor").unwrap();
    assert_eq!(*recorder.roles.lock(), vec!["editor", "editor", "editor"]);

    engine.deny_permission("u", "post:read").unwrap();
    engine.allow_permission("u", "post:read").unwrap();
    assert_eq!(
        *recorder.denies.lock(),
        vec![("post:read".to_string(), true), ("post:read".to_string(), false)]
    );

    engine.has_permission(&User::new("u"), "post:read");
    assert_eq!(*recorder.decisions.lock(), vec![("post:read".to_string(), false)]);
}

#[test]
fn test_failing_observer_is_isolated() {
    let engine = default_engine();
    let recorder = Arc::new(Recorder::default());
    engine.add_observer(Arc::new(Exploding));
    engine.add_observer(recorder.clone());

    engine.create_role("editor", &["post:read"]).unwrap();
    assert!(engine.has_permission(&User::with_roles("u", ["editor"]), "post:read"));

    // The observer after the failing one still ran
    assert_eq!(recorder.roles.lock().len(), 1);
    assert_eq!(recorder.decisions.lock().len(), 1);
}

// ============================================================================
// METRICS AND LIFECYCLE
// ============================================================================

#[test]
fn test_metrics_count_decisions() {
    let engine = default_engine();
    engine.create_role("editor", &["post:read"]).unwrap();
    engine.deny_permission("u", "post:read").unwrap();

    engine.has_permission(&User::with_roles("v", ["editor"]), "post:read");
    engine.has_permission(&User::with_roles("v", ["editor"]), "post:write");
    engine.has_permission(&User::with_roles("u", ["editor"]), "post:read");

    let metrics = engine.metrics();
    assert_eq!(metrics.total_checks, 3);
    assert_eq!(metrics.allowed, 1);
    assert_eq!(metrics.denied, 2);
    assert_eq!(metrics.explicit_denials, 1);

    engine.reset_metrics();
    assert_eq!(engine.metrics().total_checks, 0);
}

#[test]
fn test_reset_clears_state() {
    let engine = default_engine();
    engine.create_role("editor", &["post:read"]).unwrap();
    engine.deny_permission("u", "post:read").unwrap();

    engine.reset().unwrap();
    assert!(engine.get_all_roles().is_empty());
    assert!(engine.get_all_permissions().is_empty());
    assert!(engine.get_denied_permissions("u").is_empty());
    assert_eq!(engine.register_permission("fresh:start").unwrap(), 1);
}

#[test]
fn test_shutdown() {
    let engine = default_engine();
    engine.create_role("editor", &["post:read"]).unwrap();
    engine.shutdown();

    assert!(matches!(
        engine.register_permission("x:y"),
        Err(RbacError::NotInitialized(_))
    ));
    assert!(matches!(engine.reset(), Err(RbacError::NotInitialized(_))));
    assert!(engine.has_permission(&User::with_roles("u", ["editor"]), "post:read"));
}

#[test]
fn test_engine_is_shareable_across_threads() {
    let engine = Arc::new(default_engine());
    engine.create_role("editor", &["post:read"]).unwrap();

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let engine = Arc::clone(&engine);
            std::thread::spawn(move || {
                let user = User::with_roles(format!("u{}", i), ["editor"]);
                (0..100).all(|_| engine.has_permission(&user, "post:read"))
            })
        })
        .collect();

    for handle in handles {
        assert!(handle.join().unwrap());
    }
}

#[test]
fn test_deny_is_visible_to_concurrent_checks() {
    let engine = Arc::new(engine_with(EngineConfig {
        enable_cache: true,
        ..EngineConfig::default()
    }));
    engine.create_role("editor", &["post:read"]).unwrap();
    let user = User::with_roles("u1", ["editor"]);
    let done = Arc::new(AtomicBool::new(false));

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let engine = Arc::clone(&engine);
            let done = Arc::clone(&done);
            let user = user.clone();
            std::thread::spawn(move || {
                while !done.load(Ordering::Relaxed) {
                    engine.has_permission(&user, "post:read");
                }
            })
        })
        .collect();

    for _ in 0..200 {
        engine.deny_permission("u1", "post:read").unwrap();
        assert!(!engine.has_permission(&user, "post:read"));
        engine.allow_permission("u1", "post:read").unwrap();
    }
    engine.deny_permission("u1", "post:read").unwrap();

    done.store(true, Ordering::Relaxed);
    for handle in readers {
        handle.join().unwrap();
    }

    let result = engine.authorize(&user, "post:read");
    assert_eq!(result.reason, Some(DenyReason::ExplicitlyDenied));
}
