//! # CretoAI RBAC Engine
//!
//! In-process role-based permission engine: permissions, roles, explicit
//! denials and a verdict cache behind one synchronous decision API.
//!
//! ## Features
//!
//! - **Bit-mask permissions** with a name-set strategy for parity checks
//! - **Colon wildcards** (`posts:*`) on grants and denials
//! - **Deny always wins** over any grant
//! - **TTL verdict cache** with per-user and global invalidation
//! - **Audit sinks** (tracing, in-memory, buffered) that can never change a verdict
//! - **Observer hooks** isolated from the decision path
//! - **JSON configuration** and full-state snapshots
//!
//! ## Example
//!
//! ```rust
//! use cretoai_rbac::{EngineConfig, PermissionEngine, User};
//!
//! fn main() -> Result<(), cretoai_rbac::RbacError> {
//!     let engine = PermissionEngine::new(EngineConfig::default())?;
//!
//!     engine.create_role("editor", &["post:read", "post:write"])?;
//!     engine.create_role("admin", &["admin:*"])?;
//!
//!     let alice = User::with_roles("alice", ["editor"]);
//!     assert!(engine.has_permission(&alice, "post:write"));
//!     assert!(!engine.has_permission(&alice, "post:delete"));
//!
//!     let root = User::with_roles("root", ["admin"]);
//!     engine.deny_permission("root", "admin:billing")?;
//!     assert!(engine.has_permission(&root, "admin:users"));
//!     assert!(!engine.has_permission(&root, "admin:billing"));
//!
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod deny;
pub mod engine;
pub mod error;
pub mod matcher;
pub mod registry;
pub mod roles;
pub mod snapshot;
pub mod types;

// Re-export commonly used types
pub use config::{CacheOptions, EngineConfig, PermissionDef, RbacConfig, RoleDef};
pub use engine::{
    AuditContext, AuditEvent, AuditEventType, AuditSink, AuthResult, BufferedAuditSink,
    CacheStats, DenyReason, EngineMetrics, EngineObserver, MemoryAuditSink, PermissionEngine,
    TracingAuditSink, Verdict,
};
pub use error::{RbacError, Result};
pub use matcher::WildcardMatcher;
pub use registry::PermissionRegistry;
pub use roles::Strategy;
pub use snapshot::{EngineSnapshot, RoleSnapshot};
pub use types::{AuthContext, Permission, PermissionMask, User};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
