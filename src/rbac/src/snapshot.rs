//! Serializable engine state
//!
//! A snapshot carries everything needed to rebuild an engine's decisions:
//! the permission bits, the role definitions and (optionally) the deny list.
//! Loading a snapshot replaces the current state wholesale.

use crate::error::Result;
use crate::roles::Strategy;
use crate::types::Permission;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Current snapshot format version
pub const SNAPSHOT_VERSION: u32 = 1;

/// Serialized role
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleSnapshot {
    pub name: String,

    pub permissions: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<i32>,
}

/// Serialized engine state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineSnapshot {
    /// Format version
    pub version: u32,

    /// Strategy of the engine that produced the snapshot
    pub strategy: Strategy,

    /// Registered permissions, ordered by bit
    pub permissions: Vec<Permission>,

    /// Roles, ordered by name
    pub roles: Vec<RoleSnapshot>,

    /// Deny list keyed by user id
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub denied: BTreeMap<String, Vec<String>>,
}

impl EngineSnapshot {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Look up a serialized role by name
    pub fn role(&self, name: &str) -> Option<&RoleSnapshot> {
        self.roles.iter().find(|role| role.name == name)
    }
}
