//! Engine observers (plugin hooks)
//!
//! Observers run synchronously after the operation they describe has been
//! finalized. A failing (panicking) observer is isolated: it cannot affect the
//! decision, the engine state, or the other observers.

use super::audit::AuditEvent;
use std::panic::{catch_unwind, AssertUnwindSafe};
use tracing::warn;

/// Hooks invoked by the engine; every method defaults to a no-op
pub trait EngineObserver: Send + Sync {
    /// Observer name used in diagnostics
    fn name(&self) -> &str {
        "observer"
    }

    /// A permission received a bit
    fn on_permission_registered(&self, _name: &str, _bit: u64) {}

    /// A role was created, modified or deleted (`permissions` is empty on delete)
    fn on_role_changed(&self, _role: &str, _permissions: &[String]) {}

    /// A permission check completed
    fn on_decision(&self, _event: &AuditEvent) {}

    /// A deny entry was added (`denied == true`) or removed
    fn on_deny_changed(&self, _user_id: &str, _pattern: &str, _denied: bool) {}
}

/// Run `f`, converting a panic into `None` and a warning on the fallback channel
pub(crate) fn guarded<R>(what: &str, f: impl FnOnce() -> R) -> Option<R> {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("{} panicked; failure isolated", what);
            None
        }
    }
}

/// Invoke `hook` on every observer, isolating each one
pub(crate) fn notify<O, F>(observers: &[O], hook: F)
where
    O: AsRef<dyn EngineObserver>,
    F: Fn(&dyn EngineObserver),
{
    for observer in observers {
        let observer = observer.as_ref();
        guarded(observer.name(), || hook(observer));
    }
}
