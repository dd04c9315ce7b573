//! Error types for the permission engine

use thiserror::Error;

/// Permission engine errors
///
/// Only setup and registration calls return these. Decision calls
/// (`has_permission`, `authorize`, ...) always resolve to a verdict.
#[derive(Debug, Error)]
pub enum RbacError {
    /// Operation issued against an engine that is not ready (or already shut down)
    #[error("Engine not initialized: {0}")]
    NotInitialized(String),

    /// Permission registered twice while strict mode is enabled
    #[error("Duplicate permission: {0}")]
    DuplicatePermission(String),

    /// Role created twice while strict mode is enabled
    #[error("Duplicate role: {0}")]
    DuplicateRole(String),

    /// A role (or deny entry) references a permission that was never registered
    #[error("{owner} references undefined permission '{permission}'")]
    UndefinedPermissionReference { owner: String, permission: String },

    /// Every bit of the permission mask is already assigned
    #[error("Permission capacity exceeded: all {width} bits are assigned")]
    CapacityExceeded { width: u32 },

    /// Malformed configuration document or engine options
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Role lookup failed
    #[error("Role not found: {0}")]
    RoleNotFound(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Snapshot or configuration (de)serialization failure
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for permission engine operations
pub type Result<T> = std::result::Result<T, RbacError>;
