//! Engine options and the JSON configuration document
//!
//! The document consumed by the CLI and by [`PermissionEngine::from_config`]
//! looks like:
//!
//! ```json
//! {
//!   "name": "blog",
//!   "version": "1.0.0",
//!   "permissions": [{ "name": "post:read" }, { "name": "post:write", "bit": 2 }],
//!   "roles": [{ "name": "editor", "permissions": ["post:read", "post:write"], "level": 10 }],
//!   "options": { "useBitSystem": true, "enableCache": true }
//! }
//! ```
//!
//! [`PermissionEngine::from_config`]: crate::PermissionEngine::from_config

use crate::error::{RbacError, Result};
use crate::matcher::WildcardMatcher;
use crate::roles::Strategy;
use crate::types::PermissionMask;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::time::Duration;

/// Permission cache options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CacheOptions {
    /// Time-to-live of a cached verdict, in milliseconds
    #[serde(rename = "ttl")]
    pub ttl_ms: u64,

    /// Maximum number of cached verdicts
    pub max_size: usize,

    /// Interval of the background expiry sweep, in milliseconds
    #[serde(rename = "cleanupInterval")]
    pub cleanup_interval_ms: u64,
}

impl CacheOptions {
    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms)
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_millis(self.cleanup_interval_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_size == 0 {
            return Err(RbacError::InvalidConfig("cache maxSize must be greater than 0".into()));
        }
        if self.ttl_ms == 0 {
            return Err(RbacError::InvalidConfig("cache ttl must be greater than 0".into()));
        }
        if self.cleanup_interval_ms == 0 {
            return Err(RbacError::InvalidConfig(
                "cache cleanupInterval must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            ttl_ms: 60_000,
            max_size: 1_000,
            cleanup_interval_ms: 60_000,
        }
    }
}

/// Permission engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    /// Bit-mask strategy (`true`) or legacy name strategy (`false`)
    pub use_bit_system: bool,

    /// Interpret `*` tokens in grants and denials
    pub enable_wildcards: bool,

    /// Memoize verdicts
    pub enable_cache: bool,

    /// Cache configuration
    pub cache_options: CacheOptions,

    /// Raise errors for malformed setup calls instead of ignoring them
    pub strict_mode: bool,
}

impl EngineConfig {
    pub fn strategy(&self) -> Strategy {
        Strategy::from_bit_system(self.use_bit_system)
    }

    pub fn matcher(&self) -> WildcardMatcher {
        WildcardMatcher::new(self.enable_wildcards)
    }

    pub fn validate(&self) -> Result<()> {
        if self.enable_cache {
            self.cache_options.validate()?;
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            use_bit_system: true,
            enable_wildcards: true,
            enable_cache: false,
            cache_options: CacheOptions::default(),
            strict_mode: false,
        }
    }
}

/// Permission entry of the configuration document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionDef {
    pub name: String,

    /// Explicit bit; assigned automatically when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bit: Option<PermissionMask>,
}

/// Role entry of the configuration document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleDef {
    pub name: String,

    pub permissions: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<i32>,
}

/// Configuration document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RbacConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    pub permissions: Vec<PermissionDef>,

    pub roles: Vec<RoleDef>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<EngineConfig>,
}

impl RbacConfig {
    /// Parse and validate a JSON document
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| RbacError::InvalidConfig(format!("malformed configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    /// Serialize back to pretty JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Engine options (defaults when the document has none)
    pub fn engine_config(&self) -> EngineConfig {
        self.options.clone().unwrap_or_default()
    }

    /// Check the document for structural problems
    ///
    /// All problems are collected into a single [`RbacError::InvalidConfig`].
    pub fn validate(&self) -> Result<()> {
        let issues = self.issues();
        if issues.is_empty() {
            Ok(())
        } else {
            Err(RbacError::InvalidConfig(issues.join("; ")))
        }
    }

    /// Every structural problem in the document
    pub fn issues(&self) -> Vec<String> {
        let mut issues = Vec::new();
        let options = self.engine_config();
        let matcher = options.matcher();

        if let Err(e) = options.validate() {
            issues.push(e.to_string());
        }

        let mut names = HashSet::new();
        let mut bits: HashMap<PermissionMask, &str> = HashMap::new();

        for (idx, permission) in self.permissions.iter().enumerate() {
            if permission.name.trim().is_empty() {
                issues.push(format!("permissions[{}]: name cannot be empty", idx));
                continue;
            }
            if !names.insert(permission.name.as_str()) {
                issues.push(format!(
                    "permissions[{}]: duplicate permission '{}'",
                    idx, permission.name
                ));
            }
            if let Some(bit) = permission.bit {
                if !bit.is_power_of_two() {
                    issues.push(format!(
                        "permissions[{}]: bit {} of '{}' is not a single set bit",
                        idx, bit, permission.name
                    ));
                } else if let Some(owner) = bits.insert(bit, permission.name.as_str()) {
                    issues.push(format!(
                        "permissions[{}]: bit {} of '{}' is already used by '{}'",
                        idx, bit, permission.name, owner
                    ));
                }
            }
        }

        let mut role_names = HashSet::new();
        for (idx, role) in self.roles.iter().enumerate() {
            if role.name.trim().is_empty() {
                issues.push(format!("roles[{}]: name cannot be empty", idx));
                continue;
            }
            if !role_names.insert(role.name.as_str()) {
                issues.push(format!("roles[{}]: duplicate role '{}'", idx, role.name));
            }
            for permission in &role.permissions {
                if permission.trim().is_empty() {
                    issues.push(format!("roles[{}]: '{}' has an empty permission", idx, role.name));
                } else if !matcher.is_pattern(permission) && !names.contains(permission.as_str()) {
                    issues.push(format!(
                        "roles[{}]: '{}' references undefined permission '{}'",
                        idx, role.name, permission
                    ));
                }
            }
        }

        issues
    }
}
