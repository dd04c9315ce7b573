//! Role store: role name → permission set + optional hierarchy level
//!
//! The store owns the [`PermissionRegistry`] so that bit assignment and role
//! composition happen under the same lock in the engine.

use super::grants::{PermissionSet, Strategy};
use crate::error::{RbacError, Result};
use crate::matcher::WildcardMatcher;
use crate::registry::PermissionRegistry;
use crate::types::{PermissionMask, User};
use std::collections::HashMap;
use tracing::debug;

/// A named bundle of permissions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Role {
    /// Role name
    pub name: String,

    /// Granted permissions and patterns
    pub permissions: PermissionSet,

    /// Hierarchy level, `None` when never configured
    pub level: Option<i32>,
}

impl Role {
    /// Effective level (0 when not configured)
    pub fn level(&self) -> i32 {
        self.level.unwrap_or(0)
    }
}

/// Role definitions plus the permission registry they reference
#[derive(Debug, Clone)]
pub struct RoleStore {
    strategy: Strategy,
    matcher: WildcardMatcher,
    registry: PermissionRegistry,
    roles: HashMap<String, Role>,
}

impl RoleStore {
    pub fn new(strategy: Strategy, matcher: WildcardMatcher) -> Self {
        Self::with_registry(strategy, matcher, strategy.new_registry())
    }

    pub fn with_registry(
        strategy: Strategy,
        matcher: WildcardMatcher,
        registry: PermissionRegistry,
    ) -> Self {
        Self {
            strategy,
            matcher,
            registry,
            roles: HashMap::new(),
        }
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    pub fn matcher(&self) -> &WildcardMatcher {
        &self.matcher
    }

    pub fn registry(&self) -> &PermissionRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut PermissionRegistry {
        &mut self.registry
    }

    /// Create (or wholesale replace) a role
    ///
    /// In strict mode an existing role is a [`RbacError::DuplicateRole`] and
    /// every non-wildcard permission must already be registered. Otherwise
    /// the bit strategy registers unknown names on the fly and the legacy
    /// strategy stores them verbatim.
    pub fn create_role(&mut self, name: &str, permissions: &[String], strict: bool) -> Result<()> {
        validate_name("role", name)?;

        let existing_level = match self.roles.get(name) {
            Some(_) if strict => return Err(RbacError::DuplicateRole(name.to_string())),
            Some(role) => role.level,
            None => None,
        };

        for permission in permissions {
            self.resolve_reference(name, permission, strict)?;
        }

        let set = PermissionSet::from_names(
            self.strategy,
            permissions,
            &self.registry,
            &self.matcher,
        );

        debug!("Role '{}' defined with {} permission(s)", name, permissions.len());

        self.roles.insert(
            name.to_string(),
            Role {
                name: name.to_string(),
                permissions: set,
                level: existing_level,
            },
        );

        Ok(())
    }

    /// Add one permission to an existing role
    ///
    /// Returns `Ok(false)` for an unknown role outside strict mode.
    pub fn add_permission_to_role(
        &mut self,
        name: &str,
        permission: &str,
        strict: bool,
    ) -> Result<bool> {
        validate_name("permission", permission)?;

        if !self.roles.contains_key(name) {
            return missing_role(name, strict);
        }

        self.resolve_reference(name, permission, strict)?;

        let Self {
            roles,
            registry,
            matcher,
            ..
        } = self;

        match roles.get_mut(name) {
            Some(role) => {
                role.permissions.insert(permission, registry, matcher);
                Ok(true)
            }
            None => missing_role(name, strict),
        }
    }

    /// Remove one permission (or pattern, by exact string) from a role
    pub fn remove_permission_from_role(
        &mut self,
        name: &str,
        permission: &str,
        strict: bool,
    ) -> Result<bool> {
        let Self { roles, registry, .. } = self;

        match roles.get_mut(name) {
            Some(role) => Ok(role.permissions.remove(permission, registry)),
            None => missing_role(name, strict),
        }
    }

    /// Delete a role; users still referencing it simply lose its grants
    pub fn delete_role(&mut self, name: &str) -> bool {
        self.roles.remove(name).is_some()
    }

    /// Configure a role's hierarchy level
    pub fn set_level(&mut self, name: &str, level: i32, strict: bool) -> Result<bool> {
        match self.roles.get_mut(name) {
            Some(role) => {
                role.level = Some(level);
                Ok(true)
            }
            None => missing_role(name, strict),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Role> {
        self.roles.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.roles.contains_key(name)
    }

    /// All role names, sorted
    pub fn role_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.roles.keys().cloned().collect();
        names.sort();
        names
    }

    /// Roles ordered by name
    pub fn roles(&self) -> Vec<&Role> {
        let mut roles: Vec<&Role> = self.roles.values().collect();
        roles.sort_by(|a, b| a.name.cmp(&b.name));
        roles
    }

    /// Permission names of one role
    pub fn role_permissions(&self, name: &str) -> Option<Vec<String>> {
        self.roles
            .get(name)
            .map(|role| role.permissions.names(&self.registry))
    }

    /// Union of the named roles' permissions; unknown roles contribute nothing
    pub fn effective_permissions(&self, role_names: &[String]) -> PermissionSet {
        let mut set = PermissionSet::empty(self.strategy);
        for role in role_names.iter().filter_map(|name| self.roles.get(name)) {
            set.extend(&role.permissions, &self.registry);
        }
        set
    }

    /// Everything a user holds: all listed roles plus direct grants
    pub fn user_permissions(&self, user: &User) -> PermissionSet {
        let mut set = self.effective_permissions(&user.roles);
        for permission in &user.direct_permissions {
            set.insert(permission, &self.registry, &self.matcher);
        }
        set.insert_mask(user.direct_mask, &self.registry);
        set
    }

    /// Returns `true` if the user is granted `permission` by a role or directly
    ///
    /// Equivalent to `user_permissions(user).covers(permission)` without
    /// building the union.
    pub fn grants(&self, user: &User, permission: &str) -> bool {
        let by_role = user
            .roles
            .iter()
            .filter_map(|name| self.roles.get(name))
            .any(|role| role.permissions.covers(permission, &self.registry, &self.matcher));

        by_role || self.grants_directly(user, permission)
    }

    fn grants_directly(&self, user: &User, permission: &str) -> bool {
        let by_mask = user.direct_mask != 0
            && self
                .registry
                .bit_of(permission)
                .map(|bit| user.direct_mask & bit != 0)
                .unwrap_or(false);

        by_mask || self.matcher.matches_any(&user.direct_permissions, permission)
    }

    /// Returns `true` if role `a` can act as role `b`
    ///
    /// Either `a`'s permissions include all of `b`'s, or both roles have a
    /// configured level and `a.level >= b.level`. Unknown roles never qualify.
    pub fn can_act_as(&self, a: &str, b: &str) -> bool {
        let (Some(role_a), Some(role_b)) = (self.roles.get(a), self.roles.get(b)) else {
            return false;
        };

        if role_a
            .permissions
            .is_superset_of(&role_b.permissions, &self.registry, &self.matcher)
        {
            return true;
        }

        matches!((role_a.level, role_b.level), (Some(la), Some(lb)) if la >= lb)
    }

    /// Mask of a role (0 for unknown roles and for the legacy strategy)
    pub fn role_mask(&self, name: &str) -> PermissionMask {
        self.roles
            .get(name)
            .map(|role| role.permissions.mask())
            .unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.roles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }

    /// Drop every role and permission
    pub fn clear(&mut self) {
        self.roles.clear();
        self.registry.clear();
    }

    /// Make sure a permission referenced by `role` can be resolved
    fn resolve_reference(&mut self, role: &str, permission: &str, strict: bool) -> Result<()> {
        validate_name("permission", permission)?;

        if self.matcher.is_pattern(permission) || self.registry.contains(permission) {
            return Ok(());
        }

        if strict {
            return Err(RbacError::UndefinedPermissionReference {
                owner: format!("role '{}'", role),
                permission: permission.to_string(),
            });
        }

        if self.strategy == Strategy::Bitmask {
            let bit = self.registry.register(permission)?;
            debug!("Auto-registered permission '{}' (bit {}) for role '{}'", permission, bit, role);
        }

        Ok(())
    }
}

fn missing_role(name: &str, strict: bool) -> Result<bool> {
    if strict {
        Err(RbacError::RoleNotFound(name.to_string()))
    } else {
        debug!("Ignoring operation on unknown role '{}'", name);
        Ok(false)
    }
}

pub(crate) fn validate_name(kind: &str, name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(RbacError::InvalidInput(format!("{} name cannot be empty", kind)));
    }
    Ok(())
}
