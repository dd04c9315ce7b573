//! Verdict and authorization result types

use crate::types::User;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a permission check was denied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenyReason {
    /// No role or direct grant covers the permission
    LacksPermission,

    /// A deny entry for the user covers the permission
    ExplicitlyDenied,

    /// The user has no usable id
    InvalidUser,

    /// The requested permission is empty
    InvalidPermission,
}

impl DenyReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DenyReason::LacksPermission => "lacks permission",
            DenyReason::ExplicitlyDenied => "explicitly denied",
            DenyReason::InvalidUser => "invalid user",
            DenyReason::InvalidPermission => "invalid permission",
        }
    }
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one check, as stored in the cache
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    pub allowed: bool,

    /// Set on denial only
    pub reason: Option<DenyReason>,
}

impl Verdict {
    pub fn allow() -> Self {
        Self {
            allowed: true,
            reason: None,
        }
    }

    pub fn deny(reason: DenyReason) -> Self {
        Self {
            allowed: false,
            reason: Some(reason),
        }
    }
}

/// Result of [`PermissionEngine::authorize`](crate::PermissionEngine::authorize)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthResult {
    /// Whether the permission is granted
    pub allowed: bool,

    /// Reason for a denial (absent on allow)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<DenyReason>,

    /// The user the decision was made for
    pub user: User,

    /// Permission that was checked
    pub permission: String,

    /// Whether the verdict came from the cache
    pub cached: bool,
}

impl AuthResult {
    pub(crate) fn new(user: &User, permission: &str, verdict: Verdict, cached: bool) -> Self {
        Self {
            allowed: verdict.allowed,
            reason: verdict.reason,
            user: user.clone(),
            permission: permission.to_string(),
            cached,
        }
    }

    /// Verdict without the user and permission
    pub fn verdict(&self) -> Verdict {
        Verdict {
            allowed: self.allowed,
            reason: self.reason,
        }
    }
}
