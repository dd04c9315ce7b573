//! Role module
//!
//! Provides role definitions, the permission sets behind them, and the
//! store that resolves a user's effective permissions.
//!
//! # Features
//!
//! - **Two strategies**: `u64` bit masks or verbatim permission names
//! - **Wildcard grants**: patterns such as `posts:*` are stored verbatim and
//!   expanded at check time
//! - **Lenient resolution**: roles that no longer exist contribute nothing
//! - **Role comparison**: permission-set inclusion or configured hierarchy level
//!
//! # Example
//!
//! ```rust
//! use cretoai_rbac::matcher::WildcardMatcher;
//! use cretoai_rbac::roles::{RoleStore, Strategy};
//! use cretoai_rbac::User;
//!
//! let mut store = RoleStore::new(Strategy::Bitmask, WildcardMatcher::default());
//! store.create_role("editor", &["post:read".to_string(), "post:write".to_string()], false)?;
//!
//! let user = User::with_roles("u1", ["editor"]);
//! assert!(store.grants(&user, "post:write"));
//! assert!(!store.grants(&user, "post:delete"));
//! # Ok::<(), cretoai_rbac::RbacError>(())
//! ```

pub mod grants;
pub mod store;


pub use grants::{PermissionSet, Strategy};
pub use store::{Role, RoleStore};
