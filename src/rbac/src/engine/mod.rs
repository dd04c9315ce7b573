//! Permission engine
//!
//! Orchestrates the permission registry, role store, deny list and verdict
//! cache behind a single synchronous API, with audit events, metrics and
//! observer hooks on the side.
//!
//! Decision calls never fail: invalid input resolves to a denial with a
//! reason, and audit or observer failures are isolated from the verdict.

pub mod audit;
pub mod cache;
pub mod decision;
pub mod metrics;
pub mod observer;

pub use audit::{
    AuditContext, AuditEvent, AuditEventType, AuditSink, BufferedAuditSink, MemoryAuditSink,
    TracingAuditSink,
};
pub use cache::{CacheKey, CacheStats, PermissionCache};
pub use decision::{AuthResult, DenyReason, Verdict};
pub use metrics::{EngineMetrics, MetricsCollector};
pub use observer::EngineObserver;

use self::audit::AuditDispatcher;
use self::observer::notify;
use crate::config::{EngineConfig, RbacConfig};
use crate::deny::DenyStore;
use crate::error::{RbacError, Result};
use crate::matcher::WildcardMatcher;
use crate::roles::{RoleStore, Strategy};
use crate::snapshot::{EngineSnapshot, RoleSnapshot, SNAPSHOT_VERSION};
use crate::types::{AuthContext, Permission, PermissionMask, User};

use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Main permission engine
///
/// # Architecture
///
/// ```text
/// User + permission → validate → [Cache] → DenyStore → RoleStore → Verdict
///                                   ↑                                 ↓
///                                   └──────────── store ──────────────┤
///                                                                     ↓
///                                              [Audit] + [Metrics] + [Observers]
/// ```
///
/// The engine is `Send + Sync`; share it behind an `Arc`.
///
/// # Consistency
///
/// A decision holds the store read lock from the deny check until its
/// verdict is cached. Every mutation changes state and invalidates the cache
/// under the store write lock, so a verdict computed before a mutation is
/// never cached after it.
pub struct PermissionEngine {
    /// Engine options, fixed at construction
    config: EngineConfig,

    /// Wildcard rules shared by grants and denials
    matcher: WildcardMatcher,

    /// Registry and role definitions; its lock also orders deny-list
    /// changes against decisions
    store: RwLock<RoleStore>,

    /// Per-user explicit denials
    denies: DenyStore,

    /// Verdict cache (only when enabled)
    cache: Option<PermissionCache>,

    /// Audit sink wrapper
    audit: AuditDispatcher,

    /// Decision metrics
    metrics: MetricsCollector,

    /// Registered hooks
    observers: RwLock<Vec<Arc<dyn EngineObserver>>>,

    /// Set by `shutdown`
    shut_down: AtomicBool,
}

impl PermissionEngine {
    /// Create an engine without an audit sink
    pub fn new(config: EngineConfig) -> Result<Self> {
        Self::build(config, None)
    }

    /// Create an engine that reports every decision to `sink`
    pub fn with_audit_sink(config: EngineConfig, sink: Arc<dyn AuditSink>) -> Result<Self> {
        Self::build(config, Some(sink))
    }

    /// Build an engine from a configuration document
    ///
    /// Permissions with an explicit bit are registered first so that
    /// automatically assigned bits can never collide with them.
    pub fn from_config(document: &RbacConfig) -> Result<Self> {
        Self::from_config_with_sink(document, None)
    }

    pub fn from_config_with_sink(
        document: &RbacConfig,
        sink: Option<Arc<dyn AuditSink>>,
    ) -> Result<Self> {
        document.validate()?;

        let engine = Self::build(document.engine_config(), sink)?;
        {
            let mut store = engine.store.write();

            for permission in document.permissions.iter() {
                if let Some(bit) = permission.bit {
                    store.registry_mut().register_with_bit(&permission.name, bit)?;
                }
            }
            for permission in document.permissions.iter().filter(|p| p.bit.is_none()) {
                store.registry_mut().register(&permission.name)?;
            }

            for role in &document.roles {
                store.create_role(&role.name, &role.permissions, engine.config.strict_mode)?;
                if let Some(level) = role.level {
                    store.set_level(&role.name, level, true)?;
                }
            }

            info!(
                "Loaded configuration {}: {} permissions, {} roles",
                document.name.as_deref().unwrap_or("<unnamed>"),
                store.registry().len(),
                store.len()
            );
        }

        Ok(engine)
    }

    fn build(config: EngineConfig, sink: Option<Arc<dyn AuditSink>>) -> Result<Self> {
        config.validate()?;

        let matcher = config.matcher();
        let cache = if config.enable_cache {
            Some(PermissionCache::new(config.cache_options.clone())?)
        } else {
            None
        };

        info!(
            "PermissionEngine initialized with strategy={:?}, wildcards={}, cache={}, strict={}, audit={}",
            config.strategy(),
            config.enable_wildcards,
            config.enable_cache,
            config.strict_mode,
            sink.is_some()
        );

        Ok(Self {
            store: RwLock::new(RoleStore::new(config.strategy(), matcher)),
            matcher,
            denies: DenyStore::new(),
            cache,
            audit: AuditDispatcher::new(sink),
            metrics: MetricsCollector::new(),
            observers: RwLock::new(Vec::new()),
            shut_down: AtomicBool::new(false),
            config,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn strategy(&self) -> Strategy {
        self.config.strategy()
    }

    // ------------------------------------------------------------------
    // Registration
    // ------------------------------------------------------------------

    /// Register a permission and return its bit
    ///
    /// Re-registering returns the existing bit, or
    /// [`RbacError::DuplicatePermission`] in strict mode.
    pub fn register_permission(&self, name: &str) -> Result<PermissionMask> {
        self.ensure_active()?;
        crate::roles::store::validate_name("permission", name)?;

        let (bit, fresh) = {
            let mut store = self.store.write();
            let registry = store.registry_mut();

            let fresh = !registry.contains(name);
            if !fresh && self.config.strict_mode {
                return Err(RbacError::DuplicatePermission(name.to_string()));
            }
            let bit = registry.register(name)?;
            if fresh {
                self.invalidate_all_cache();
            }
            (bit, fresh)
        };

        if fresh {
            debug!("Registered permission '{}' with bit {}", name, bit);
            self.notify(|o| o.on_permission_registered(name, bit));
        }

        Ok(bit)
    }

    /// Register several permissions in order
    pub fn register_permissions<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<PermissionMask>> {
        names
            .iter()
            .map(|name| self.register_permission(name.as_ref()))
            .collect()
    }

    /// Register a permission with an explicit bit
    pub fn register_permission_with_bit(
        &self,
        name: &str,
        bit: PermissionMask,
    ) -> Result<PermissionMask> {
        self.ensure_active()?;
        crate::roles::store::validate_name("permission", name)?;

        let fresh = {
            let mut store = self.store.write();
            let registry = store.registry_mut();
            let fresh = !registry.contains(name);
            if !fresh && self.config.strict_mode {
                return Err(RbacError::DuplicatePermission(name.to_string()));
            }
            registry.register_with_bit(name, bit)?;
            if fresh {
                self.invalidate_all_cache();
            }
            fresh
        };

        if fresh {
            self.notify(|o| o.on_permission_registered(name, bit));
        }

        Ok(bit)
    }

    /// Bit of a registered permission
    pub fn permission_bit(&self, name: &str) -> Option<PermissionMask> {
        self.store.read().registry().bit_of(name)
    }

    /// Every registered permission, ordered by bit
    pub fn get_all_permissions(&self) -> Vec<Permission> {
        self.store.read().registry().permissions()
    }

    // ------------------------------------------------------------------
    // Roles
    // ------------------------------------------------------------------

    /// Create or replace a role
    pub fn create_role<S: AsRef<str>>(&self, name: &str, permissions: &[S]) -> Result<()> {
        self.ensure_active()?;

        let permissions: Vec<String> = permissions.iter().map(|p| p.as_ref().to_string()).collect();
        let resolved = {
            let mut store = self.store.write();
            store.create_role(name, &permissions, self.config.strict_mode)?;
            self.invalidate_all_cache();
            store.role_permissions(name).unwrap_or_default()
        };

        info!("Role '{}' created with {} permission(s)", name, resolved.len());
        self.role_changed(name, &resolved);
        Ok(())
    }

    /// Add one permission to a role
    ///
    /// Returns `Ok(false)` for an unknown role, or [`RbacError::RoleNotFound`]
    /// in strict mode.
    pub fn add_permission_to_role(&self, role: &str, permission: &str) -> Result<bool> {
        self.ensure_active()?;

        let resolved = {
            let mut store = self.store.write();
            if !store.add_permission_to_role(role, permission, self.config.strict_mode)? {
                return Ok(false);
            }
            self.invalidate_all_cache();
            store.role_permissions(role).unwrap_or_default()
        };

        debug!("Added '{}' to role '{}'", permission, role);
        self.role_changed(role, &resolved);
        Ok(true)
    }

    /// Remove one permission (or pattern, by exact string) from a role
    pub fn remove_permission_from_role(&self, role: &str, permission: &str) -> Result<bool> {
        self.ensure_active()?;

        let resolved = {
            let mut store = self.store.write();
            if !store.remove_permission_from_role(role, permission, self.config.strict_mode)? {
                return Ok(false);
            }
            self.invalidate_all_cache();
            store.role_permissions(role).unwrap_or_default()
        };

        debug!("Removed '{}' from role '{}'", permission, role);
        self.role_changed(role, &resolved);
        Ok(true)
    }

    /// Delete a role; users that still list it lose its grants
    pub fn delete_role(&self, role: &str) -> Result<bool> {
        self.ensure_active()?;

        let removed = {
            let mut store = self.store.write();
            let removed = store.delete_role(role);
            if removed {
                self.invalidate_all_cache();
            }
            removed
        };
        if removed {
            info!("Role '{}' deleted", role);
            self.role_changed(role, &[]);
        } else if self.config.strict_mode {
            return Err(RbacError::RoleNotFound(role.to_string()));
        }

        Ok(removed)
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.store.read().contains(role)
    }

    /// Configure a role's hierarchy level
    pub fn set_role_level(&self, role: &str, level: i32) -> Result<bool> {
        self.ensure_active()?;

        let updated = self
            .store
            .write()
            .set_level(role, level, self.config.strict_mode)?;
        if updated {
            debug!("Role '{}' level set to {}", role, level);
        }

        Ok(updated)
    }

    /// Configured level of a role (`None` for unknown roles or no level)
    pub fn get_role_level(&self, role: &str) -> Option<i32> {
        self.store.read().get(role).and_then(|r| r.level)
    }

    /// Permission names of a role: registered names by bit, then patterns
    pub fn get_role_permissions(&self, role: &str) -> Option<Vec<String>> {
        self.store.read().role_permissions(role)
    }

    /// All role names, sorted
    pub fn get_all_roles(&self) -> Vec<String> {
        self.store.read().role_names()
    }

    /// Everything the user is granted by roles and direct grants
    ///
    /// Deny entries are not subtracted; use the decision calls for verdicts.
    pub fn get_user_permissions(&self, user: &User) -> Vec<String> {
        let store = self.store.read();
        store.user_permissions(user).names(store.registry())
    }

    /// Returns `true` if role `a` can act as role `b`
    pub fn can_act_as_role(&self, a: &str, b: &str) -> bool {
        self.store.read().can_act_as(a, b)
    }

    fn role_changed(&self, role: &str, permissions: &[String]) {
        self.notify(|o| o.on_role_changed(role, permissions));
    }

    // ------------------------------------------------------------------
    // Decisions
    // ------------------------------------------------------------------

    /// Returns `true` if the user may perform `permission`
    pub fn has_permission(&self, user: &User, permission: &str) -> bool {
        self.decide(user, permission, AuditEventType::PermissionCheck, None)
            .allowed
    }

    /// Full decision with the denial reason
    pub fn authorize(&self, user: &User, permission: &str) -> AuthResult {
        self.decide(user, permission, AuditEventType::Authorization, None)
    }

    /// Decide `resource:action` for the context's user
    ///
    /// Resource, action and metadata are attached to the audit event.
    pub fn authorize_with_context(&self, context: &AuthContext) -> AuthResult {
        let permission = context.permission();
        self.decide(
            &context.user,
            &permission,
            AuditEventType::Authorization,
            Some(context),
        )
    }

    /// Returns `true` if any permission is allowed; `false` for an empty list
    pub fn has_any_permission<S: AsRef<str>>(&self, user: &User, permissions: &[S]) -> bool {
        permissions
            .iter()
            .any(|permission| self.has_permission(user, permission.as_ref()))
    }

    /// Returns `true` if every permission is allowed; `true` for an empty list
    pub fn has_all_permissions<S: AsRef<str>>(&self, user: &User, permissions: &[S]) -> bool {
        permissions
            .iter()
            .all(|permission| self.has_permission(user, permission.as_ref()))
    }

    fn decide(
        &self,
        user: &User,
        permission: &str,
        event_type: AuditEventType,
        context: Option<&AuthContext>,
    ) -> AuthResult {
        let start = Instant::now();

        if !user.is_valid() {
            let verdict = Verdict::deny(DenyReason::InvalidUser);
            return self.finish(user, permission, verdict, false, event_type, context, start);
        }
        if permission.trim().is_empty() {
            let verdict = Verdict::deny(DenyReason::InvalidPermission);
            return self.finish(user, permission, verdict, false, event_type, context, start);
        }

        // Step 1: cache
        let key = self.cache.as_ref().map(|_| CacheKey::new(user, permission));
        if let (Some(cache), Some(key)) = (&self.cache, &key) {
            if let Some(verdict) = cache.get(key) {
                return self.finish(user, permission, verdict, true, event_type, context, start);
            }
        }

        let verdict = {
            let store = self.store.read();

            // Step 2: explicit denials always win
            if self.denies.is_denied(&user.id, permission, &self.matcher) {
                Verdict::deny(DenyReason::ExplicitlyDenied)
            } else {
                // Step 3: role and direct grants
                let verdict = if store.grants(user, permission) {
                    Verdict::allow()
                } else {
                    Verdict::deny(DenyReason::LacksPermission)
                };

                // Step 4: cache store, still under the read lock
                if let (Some(cache), Some(key)) = (&self.cache, key) {
                    cache.put(key, verdict);
                }
                verdict
            }
        };

        self.finish(user, permission, verdict, false, event_type, context, start)
    }

    #[allow(clippy::too_many_arguments)]
    fn finish(
        &self,
        user: &User,
        permission: &str,
        verdict: Verdict,
        cached: bool,
        event_type: AuditEventType,
        context: Option<&AuthContext>,
        start: Instant,
    ) -> AuthResult {
        self.metrics.record(&verdict, cached, start.elapsed());

        debug!(
            "Permission check: user={}, permission={}, allowed={}, cached={}",
            user.id, permission, verdict.allowed, cached
        );

        let observers = {
            let observers = self.observers.read();
            if observers.is_empty() {
                None
            } else {
                Some(observers.clone())
            }
        };
        if self.audit.is_enabled() || observers.is_some() {
            let mut audit_context = AuditContext {
                roles: user.roles.clone(),
                cached,
                ..AuditContext::default()
            };
            if let Some(context) = context {
                audit_context.resource = Some(context.resource.clone());
                audit_context.action = Some(context.action.clone());
                audit_context.metadata = context.metadata.clone();
            }

            let mut event = AuditEvent::new(event_type, &user.id, permission, verdict.allowed)
                .with_context(audit_context);
            if let Some(reason) = verdict.reason {
                event = event.with_reason(reason.as_str());
            }

            self.audit.emit(&event);
            if let Some(observers) = &observers {
                notify(observers, |o| o.on_decision(&event));
            }
        }

        AuthResult::new(user, permission, verdict, cached)
    }

    // ------------------------------------------------------------------
    // Denials
    // ------------------------------------------------------------------

    /// Deny `pattern` for a user; returns `false` if it was already denied
    ///
    /// Outside strict mode an empty user id or pattern is ignored. In strict
    /// mode it is [`RbacError::InvalidInput`], and a non-wildcard pattern must
    /// name a registered permission.
    pub fn deny_permission(&self, user_id: &str, pattern: &str) -> Result<bool> {
        self.ensure_active()?;
        if !self.validate_deny_input(user_id, pattern)? {
            return Ok(false);
        }

        let added = {
            let store = self.store.write();
            if self.config.strict_mode
                && !self.matcher.is_pattern(pattern)
                && !store.registry().contains(pattern)
            {
                return Err(RbacError::UndefinedPermissionReference {
                    owner: format!("deny entry for user '{}'", user_id),
                    permission: pattern.to_string(),
                });
            }

            let added = self.denies.deny(user_id, pattern);
            if added {
                self.invalidate_user_cache(user_id);
            }
            added
        };
        if added {
            info!("Denied '{}' for user '{}'", pattern, user_id);
            self.deny_changed(user_id, pattern, AuditEventType::DenyAdded);
        }

        Ok(added)
    }

    /// Remove the exact deny entry; returns `true` if it existed
    pub fn allow_permission(&self, user_id: &str, pattern: &str) -> Result<bool> {
        self.ensure_active()?;
        if !self.validate_deny_input(user_id, pattern)? {
            return Ok(false);
        }

        let removed = {
            let _store = self.store.write();
            let removed = self.denies.allow(user_id, pattern);
            if removed {
                self.invalidate_user_cache(user_id);
            }
            removed
        };
        if removed {
            info!("Lifted denial of '{}' for user '{}'", pattern, user_id);
            self.deny_changed(user_id, pattern, AuditEventType::DenyRemoved);
        }

        Ok(removed)
    }

    /// Denied patterns for a user, sorted
    pub fn get_denied_permissions(&self, user_id: &str) -> Vec<String> {
        self.denies.denied_patterns(user_id)
    }

    /// Drop every denial of a user; returns how many were removed
    pub fn clear_denied_permissions(&self, user_id: &str) -> Result<usize> {
        self.ensure_active()?;

        let (patterns, removed) = {
            let _store = self.store.write();
            let patterns = self.denies.denied_patterns(user_id);
            let removed = self.denies.clear(user_id);
            if removed > 0 {
                self.invalidate_user_cache(user_id);
            }
            (patterns, removed)
        };
        if removed > 0 {
            info!("Cleared {} denial(s) for user '{}'", removed, user_id);
            for pattern in &patterns {
                self.deny_changed(user_id, pattern, AuditEventType::DenyRemoved);
            }
        }

        Ok(removed)
    }

    fn validate_deny_input(&self, user_id: &str, pattern: &str) -> Result<bool> {
        if !user_id.trim().is_empty() && !pattern.trim().is_empty() {
            return Ok(true);
        }

        if self.config.strict_mode {
            Err(RbacError::InvalidInput(
                "deny entries need a user id and a permission".to_string(),
            ))
        } else {
            debug!("Ignoring deny-list change with empty user id or pattern");
            Ok(false)
        }
    }

    fn deny_changed(&self, user_id: &str, pattern: &str, event_type: AuditEventType) {
        let denied = event_type == AuditEventType::DenyAdded;
        let event = AuditEvent::new(event_type, user_id, pattern, !denied);
        self.audit.emit(&event);

        self.notify(|o| o.on_deny_changed(user_id, pattern, denied));
    }

    // ------------------------------------------------------------------
    // Cache
    // ------------------------------------------------------------------

    /// Drop cached verdicts of one user
    pub fn invalidate_user_cache(&self, user_id: &str) {
        if let Some(cache) = &self.cache {
            let removed = cache.invalidate_user(user_id);
            debug!("Invalidated {} cached verdict(s) for user '{}'", removed, user_id);
        }
    }

    /// Drop every cached verdict
    pub fn invalidate_all_cache(&self) {
        if let Some(cache) = &self.cache {
            cache.invalidate_all();
        }
    }

    /// Cache statistics (`None` when caching is disabled)
    pub fn get_cache_stats(&self) -> Option<CacheStats> {
        self.cache.as_ref().map(|cache| cache.stats())
    }

    pub fn reset_cache_stats(&self) {
        if let Some(cache) = &self.cache {
            cache.reset_stats();
        }
    }

    // ------------------------------------------------------------------
    // Observability
    // ------------------------------------------------------------------

    /// Decision metrics snapshot
    pub fn metrics(&self) -> EngineMetrics {
        self.metrics.snapshot()
    }

    pub fn reset_metrics(&self) {
        self.metrics.reset();
    }

    /// Register a hook; hooks run in registration order
    pub fn add_observer(&self, observer: Arc<dyn EngineObserver>) {
        debug!("Observer '{}' registered", observer.name());
        self.observers.write().push(observer);
    }

    pub fn observer_count(&self) -> usize {
        self.observers.read().len()
    }

    fn notify<F: Fn(&dyn EngineObserver)>(&self, hook: F) {
        let observers = {
            let observers = self.observers.read();
            if observers.is_empty() {
                return;
            }
            observers.clone()
        };
        notify(&observers, hook);
    }

    // ------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------

    /// Capture the registry, roles and deny list
    pub fn serialize(&self) -> EngineSnapshot {
        // Holding the read lock keeps the deny list consistent with the roles
        let store = self.store.read();

        let roles = store
            .roles()
            .into_iter()
            .map(|role| RoleSnapshot {
                name: role.name.clone(),
                permissions: role.permissions.names(store.registry()),
                level: role.level,
            })
            .collect();

        EngineSnapshot {
            version: SNAPSHOT_VERSION,
            strategy: store.strategy(),
            permissions: store.registry().permissions(),
            roles,
            denied: self.denies.entries(),
        }
    }

    /// Replace the registry, roles and deny list with a snapshot
    ///
    /// The new state is built aside and swapped in only when the whole
    /// snapshot loads, so a failure leaves the engine untouched.
    pub fn deserialize(&self, snapshot: &EngineSnapshot) -> Result<()> {
        self.ensure_active()?;

        if snapshot.version > SNAPSHOT_VERSION {
            return Err(RbacError::InvalidConfig(format!(
                "unsupported snapshot version {}",
                snapshot.version
            )));
        }

        let mut registry = self.config.strategy().new_registry();
        for permission in &snapshot.permissions {
            registry.register_with_bit(&permission.name, permission.bit)?;
        }

        let mut store = RoleStore::with_registry(self.config.strategy(), self.matcher, registry);
        for role in &snapshot.roles {
            store.create_role(&role.name, &role.permissions, false)?;
            if let Some(level) = role.level {
                store.set_level(&role.name, level, true)?;
            }
        }

        {
            let mut current = self.store.write();
            *current = store;

            self.denies.clear_all();
            for (user_id, patterns) in &snapshot.denied {
                for pattern in patterns {
                    self.denies.deny(user_id, pattern);
                }
            }

            self.invalidate_all_cache();
        }

        info!(
            "Engine state restored: {} permissions, {} roles, {} denied user(s)",
            snapshot.permissions.len(),
            snapshot.roles.len(),
            snapshot.denied.len()
        );
        Ok(())
    }

    /// Snapshot as pretty JSON
    pub fn serialize_json(&self) -> Result<String> {
        self.serialize().to_json()
    }

    /// Restore from a JSON snapshot
    pub fn deserialize_json(&self, json: &str) -> Result<()> {
        let snapshot = EngineSnapshot::from_json(json)?;
        self.deserialize(&snapshot)
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Drop every permission, role, denial and cached verdict
    pub fn reset(&self) -> Result<()> {
        self.ensure_active()?;

        {
            let mut store = self.store.write();
            store.clear();
            self.denies.clear_all();
            self.invalidate_all_cache();
        }
        info!("Engine state reset");
        Ok(())
    }

    /// Stop background work and flush the audit sink
    ///
    /// Decisions keep working afterwards; mutating calls return
    /// [`RbacError::NotInitialized`]. Idempotent.
    pub fn shutdown(&self) {
        if self.shut_down.swap(true, Ordering::SeqCst) {
            return;
        }

        if let Some(cache) = &self.cache {
            cache.shutdown();
        }
        self.audit.shutdown();
        info!("PermissionEngine shut down");
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }

    fn ensure_active(&self) -> Result<()> {
        if self.is_shut_down() {
            return Err(RbacError::NotInitialized(
                "engine has been shut down".to_string(),
            ));
        }
        Ok(())
    }
}

impl std::fmt::Debug for PermissionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let store = self.store.read();
        f.debug_struct("PermissionEngine")
            .field("strategy", &store.strategy())
            .field("permissions", &store.registry().len())
            .field("roles", &store.len())
            .field("denied_users", &self.denies.len())
            .field("cache", &self.cache.is_some())
            .field("shut_down", &self.is_shut_down())
            .finish()
    }
}
