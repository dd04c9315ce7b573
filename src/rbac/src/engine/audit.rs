//! Audit events and sinks
//!
//! The engine emits one [`AuditEvent`] per decision (and per deny-list
//! change). Sink failures never reach the caller: errors and panics are
//! swallowed by the engine and reported through `tracing::warn!`.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::observer::guarded;
use crate::error::{RbacError, Result};

/// Tracing target used by [`TracingAuditSink`]
pub const AUDIT_TARGET: &str = "cretoai_rbac::audit";

/// Kind of audited event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    /// `has_permission` / `has_any_permission` / `has_all_permissions`
    PermissionCheck,
    /// `authorize` / `authorize_with_context`
    Authorization,
    /// A deny entry was added
    DenyAdded,
    /// A deny entry was removed
    DenyRemoved,
}

/// Structured context attached to an event
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,

    /// Roles the user presented
    #[serde(default)]
    pub roles: Vec<String>,

    /// Verdict served from the cache
    #[serde(default)]
    pub cached: bool,

    /// Free-form metadata
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// One audited event; never modified after creation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub id: Uuid,

    #[serde(rename = "type")]
    pub event_type: AuditEventType,

    pub user_id: String,

    pub permission: String,

    pub allowed: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<AuditContext>,

    pub timestamp: DateTime<Utc>,
}

impl AuditEvent {
    pub fn new(
        event_type: AuditEventType,
        user_id: impl Into<String>,
        permission: impl Into<String>,
        allowed: bool,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            event_type,
            user_id: user_id.into(),
            permission: permission.into(),
            allowed,
            reason: None,
            context: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn with_context(mut self, context: AuditContext) -> Self {
        self.context = Some(context);
        self
    }
}

/// Destination for audit events
pub trait AuditSink: Send + Sync {
    /// Record one event
    fn log(&self, event: &AuditEvent) -> Result<()>;

    /// Record several events
    fn log_batch(&self, events: &[AuditEvent]) -> Result<()> {
        for event in events {
            self.log(event)?;
        }
        Ok(())
    }

    /// Push out anything buffered
    fn flush(&self) -> Result<()> {
        Ok(())
    }

    /// Final flush and release of background resources
    fn shutdown(&self) -> Result<()> {
        self.flush()
    }
}

/// Writes events as structured `tracing` events on [`AUDIT_TARGET`]
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditSink;

impl TracingAuditSink {
    pub fn new() -> Self {
        Self
    }
}

impl AuditSink for TracingAuditSink {
    fn log(&self, event: &AuditEvent) -> Result<()> {
        info!(
            target: AUDIT_TARGET,
            event_id = %event.id,
            event_type = ?event.event_type,
            user_id = %event.user_id,
            permission = %event.permission,
            allowed = event.allowed,
            reason = event.reason.as_deref().unwrap_or(""),
            "{}",
            if event.allowed { "ALLOW" } else { "DENY" }
        );
        Ok(())
    }
}

/// Keeps the most recent events in memory
pub struct MemoryAuditSink {
    events: Mutex<VecDeque<AuditEvent>>,
    capacity: usize,
}

impl MemoryAuditSink {
    /// Default number of retained events
    pub const DEFAULT_CAPACITY: usize = 10_000;

    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }

    /// Retain at most `capacity` events (oldest dropped first)
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            events: Mutex::new(VecDeque::new()),
            capacity: capacity.max(1),
        }
    }

    /// Copy of the retained events, oldest first
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().iter().cloned().collect()
    }

    /// Retained events for one user
    pub fn events_for_user(&self, user_id: &str) -> Vec<AuditEvent> {
        self.events
            .lock()
            .iter()
            .filter(|event| event.user_id == user_id)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl Default for MemoryAuditSink {
    fn default() -> Self {
        Self::new()
    }
}

impl AuditSink for MemoryAuditSink {
    fn log(&self, event: &AuditEvent) -> Result<()> {
        let mut events = self.events.lock();
        if events.len() >= self.capacity {
            events.pop_front();
        }
        events.push_back(event.clone());
        Ok(())
    }
}

struct BufferShared {
    downstream: Arc<dyn AuditSink>,
    buffer: Mutex<Vec<AuditEvent>>,
    batch_size: usize,
    destroyed: AtomicBool,
}

impl BufferShared {
    fn flush(&self) -> Result<()> {
        let events = std::mem::take(&mut *self.buffer.lock());
        if events.is_empty() {
            return Ok(());
        }

        debug!("Flushing {} audit event(s)", events.len());
        let result = match guarded("audit downstream", || self.downstream.log_batch(&events)) {
            Some(result) => result,
            None => Err(RbacError::Internal("audit downstream panicked".into())),
        };

        if result.is_err() {
            self.requeue(events);
        }
        result
    }

    /// Put a failed batch back in front of newer events
    ///
    /// After `destroy` nothing flushes the buffer again, so the batch is
    /// dropped instead. Retention is capped at `batch_size * RETRY_BATCHES`.
    fn requeue(&self, mut events: Vec<AuditEvent>) {
        if self.destroyed.load(Ordering::SeqCst) {
            warn!("Dropped {} audit event(s) after failed final flush", events.len());
            return;
        }

        let mut buffer = self.buffer.lock();
        events.append(&mut buffer);

        let limit = self.batch_size.saturating_mul(RETRY_BATCHES);
        if events.len() > limit {
            let dropped = events.len() - limit;
            events.drain(..dropped);
            warn!("Audit buffer full; dropped {} oldest event(s)", dropped);
        }
        *buffer = events;
    }
}

/// Batches a [`BufferedAuditSink`] keeps while its downstream keeps failing
const RETRY_BATCHES: usize = 8;

/// Buffers events and forwards them to another sink in batches
///
/// A batch is flushed when the buffer reaches `batch_size` or when the flush
/// timer fires (the timer needs a Tokio runtime). [`destroy`](Self::destroy)
/// flushes what is left and stops the timer; events logged afterwards go
/// straight to the downstream sink.
pub struct BufferedAuditSink {
    shared: Arc<BufferShared>,
    flusher: Mutex<Option<JoinHandle<()>>>,
}

impl BufferedAuditSink {
    pub fn new(
        downstream: Arc<dyn AuditSink>,
        batch_size: usize,
        flush_interval: Duration,
    ) -> Self {
        let sink = Self {
            shared: Arc::new(BufferShared {
                downstream,
                buffer: Mutex::new(Vec::new()),
                batch_size: batch_size.max(1),
                destroyed: AtomicBool::new(false),
            }),
            flusher: Mutex::new(None),
        };
        sink.start_flusher(flush_interval);
        sink
    }

    /// Number of events waiting to be flushed
    pub fn pending(&self) -> usize {
        self.shared.buffer.lock().len()
    }

    /// Whether the flush timer is running
    pub fn is_timer_running(&self) -> bool {
        self.flusher
            .lock()
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }

    /// Final flush; cancels the timer
    pub fn destroy(&self) -> Result<()> {
        self.shared.destroyed.store(true, Ordering::SeqCst);
        if let Some(handle) = self.flusher.lock().take() {
            handle.abort();
        }
        self.shared.flush()
    }

    fn start_flusher(&self, interval: Duration) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            debug!("No Tokio runtime; audit buffer flushes on size only");
            return;
        };
        if interval.is_zero() {
            return;
        }

        let shared: Weak<BufferShared> = Arc::downgrade(&self.shared);
        let handle = runtime.spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;

            loop {
                ticker.tick().await;
                let Some(shared) = shared.upgrade() else {
                    break;
                };
                if let Err(e) = shared.flush() {
                    warn!("Timed audit flush failed: {}", e);
                }
            }
        });

        *self.flusher.lock() = Some(handle);
    }
}

impl AuditSink for BufferedAuditSink {
    fn log(&self, event: &AuditEvent) -> Result<()> {
        if self.shared.destroyed.load(Ordering::SeqCst) {
            return self.shared.downstream.log(event);
        }

        let full = {
            let mut buffer = self.shared.buffer.lock();
            buffer.push(event.clone());
            buffer.len() >= self.shared.batch_size
        };

        if full {
            self.shared.flush()
        } else {
            Ok(())
        }
    }

    fn flush(&self) -> Result<()> {
        self.shared.flush()
    }

    fn shutdown(&self) -> Result<()> {
        self.destroy()
    }
}

impl Drop for BufferedAuditSink {
    fn drop(&mut self) {
        if let Some(handle) = self.flusher.lock().take() {
            handle.abort();
        }
    }
}

/// Engine-side wrapper that never lets a sink failure escape
#[derive(Clone, Default)]
pub(crate) struct AuditDispatcher {
    sink: Option<Arc<dyn AuditSink>>,
}

impl AuditDispatcher {
    pub(crate) fn new(sink: Option<Arc<dyn AuditSink>>) -> Self {
        Self { sink }
    }

    pub(crate) fn is_enabled(&self) -> bool {
        self.sink.is_some()
    }

    pub(crate) fn emit(&self, event: &AuditEvent) {
        let Some(sink) = &self.sink else {
            return;
        };

        if let Some(Err(e)) = guarded("audit sink", || sink.log(event)) {
            warn!("Audit sink failed for event {}: {}", event.id, e);
        }
    }

    pub(crate) fn shutdown(&self) {
        let Some(sink) = &self.sink else {
            return;
        };

        if let Some(Err(e)) = guarded("audit sink", || sink.shutdown()) {
            warn!("Audit sink shutdown failed: {}", e);
        }
    }
}
