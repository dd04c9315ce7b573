//! Core permission engine types

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Permission name (e.g. "post:write")
pub type PermissionName = String;

/// Role name
pub type RoleName = String;

/// Permission bit mask; each set bit is exactly one registered permission
pub type PermissionMask = u64;

/// A registered permission and the bit it owns
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Permission {
    /// Unique permission name
    pub name: PermissionName,

    /// Single set bit assigned at registration; `0` for a legacy-strategy
    /// name registered after every bit was taken
    pub bit: PermissionMask,
}

impl Permission {
    pub fn new(name: impl Into<String>, bit: PermissionMask) -> Self {
        Self {
            name: name.into(),
            bit,
        }
    }
}

/// Principal supplied on every decision call
///
/// The engine never stores users. Identity is assumed to be verified by the
/// caller; only the listed roles and direct grants are consulted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// User identifier
    pub id: String,

    /// Assigned role names (unknown roles contribute nothing)
    #[serde(default)]
    pub roles: Vec<RoleName>,

    /// Permissions attached to the user directly (may contain wildcards)
    #[serde(default)]
    pub direct_permissions: Vec<PermissionName>,

    /// Bits attached to the user directly
    #[serde(default)]
    pub direct_mask: PermissionMask,
}

impl User {
    /// Create a user with no roles
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    /// Create a user holding the given roles
    pub fn with_roles<I, S>(id: impl Into<String>, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id: id.into(),
            roles: roles.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    /// Add a role
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.roles.push(role.into());
        self
    }

    /// Attach a permission directly to the user
    pub fn with_permission(mut self, permission: impl Into<String>) -> Self {
        self.direct_permissions.push(permission.into());
        self
    }

    /// Attach a raw bit mask directly to the user
    pub fn with_mask(mut self, mask: PermissionMask) -> Self {
        self.direct_mask |= mask;
        self
    }

    /// A user without an id cannot be authorized
    pub fn is_valid(&self) -> bool {
        !self.id.trim().is_empty()
    }
}

/// Resource/action request, turned into `"{resource}:{action}"`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthContext {
    /// Who is making the request
    pub user: User,

    /// Resource being accessed (e.g. "post")
    pub resource: String,

    /// Action being performed (e.g. "write")
    pub action: String,

    /// Free-form metadata forwarded to the audit event
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl AuthContext {
    pub fn new(user: User, resource: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            user,
            resource: resource.into(),
            action: action.into(),
            metadata: HashMap::new(),
        }
    }

    /// Add a metadata entry
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Permission string for this request
    pub fn permission(&self) -> String {
        format!("{}:{}", self.resource, self.action)
    }
}
