//! Verdict cache with TTL expiry and insertion-order eviction

use blake3::Hasher;
use lru::LruCache;
use parking_lot::Mutex;
use serde::Serialize;
use std::num::NonZeroUsize;
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::debug;

use super::decision::Verdict;
use crate::config::CacheOptions;
use crate::error::{RbacError, Result};
use crate::types::User;

/// Fingerprint of everything on the user that can change a verdict (BLAKE3)
pub type Fingerprint = [u8; 32];

/// Composite cache key: user id, permission and grant fingerprint
///
/// The fingerprint covers the role list (order-insensitive) plus the direct
/// grants, so a verdict cached for one role combination is never served for
/// another.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub user_id: String,
    pub permission: String,
    pub fingerprint: Fingerprint,
}

impl CacheKey {
    pub fn new(user: &User, permission: &str) -> Self {
        Self {
            user_id: user.id.clone(),
            permission: permission.to_string(),
            fingerprint: Self::fingerprint(user),
        }
    }

    /// Compute the grant fingerprint of a user
    pub fn fingerprint(user: &User) -> Fingerprint {
        let mut hasher = Hasher::new();

        // Roles (sorted)
        let mut roles: Vec<&String> = user.roles.iter().collect();
        roles.sort();
        roles.dedup();
        for role in roles {
            hasher.update(role.as_bytes());
            hasher.update(&[0]);
        }
        hasher.update(&[0xff]);

        // Direct permissions (sorted)
        let mut direct: Vec<&String> = user.direct_permissions.iter().collect();
        direct.sort();
        direct.dedup();
        for permission in direct {
            hasher.update(permission.as_bytes());
            hasher.update(&[0]);
        }
        hasher.update(&[0xff]);

        hasher.update(&user.direct_mask.to_le_bytes());

        *hasher.finalize().as_bytes()
    }
}

/// Cached verdict with its insertion time
#[derive(Debug, Clone, Copy)]
struct CachedEntry {
    verdict: Verdict,
    cached_at: Instant,
}

impl CachedEntry {
    fn new(verdict: Verdict) -> Self {
        Self {
            verdict,
            cached_at: Instant::now(),
        }
    }

    fn is_expired(&self, ttl: Duration) -> bool {
        self.cached_at.elapsed() > ttl
    }
}

struct CacheState {
    /// Only `peek`/`push`/`pop` are used, so LRU order is insertion order
    entries: LruCache<CacheKey, CachedEntry>,
    hits: u64,
    misses: u64,
    evictions: u64,
    expirations: u64,
}

impl CacheState {
    fn purge_expired(&mut self, ttl: Duration) -> usize {
        let expired: Vec<CacheKey> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired(ttl))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            self.entries.pop(key);
        }
        self.expirations += expired.len() as u64;
        expired.len()
    }
}

/// Cache statistics
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
    pub evictions: u64,
    pub expirations: u64,
    pub size: usize,
    pub max_size: usize,
}

/// Permission verdict cache
///
/// Provides:
/// - TTL checked lazily on every lookup
/// - Optional background sweep (needs a Tokio runtime)
/// - Oldest-inserted eviction once `max_size` is reached
/// - Per-user and global invalidation
pub struct PermissionCache {
    state: Arc<Mutex<CacheState>>,
    options: CacheOptions,
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

impl PermissionCache {
    /// Create a cache; the sweep starts when called inside a Tokio runtime
    pub fn new(options: CacheOptions) -> Result<Self> {
        options.validate()?;
        let capacity = NonZeroUsize::new(options.max_size).ok_or_else(|| {
            RbacError::InvalidConfig("cache maxSize must be greater than 0".into())
        })?;

        let cache = Self {
            state: Arc::new(Mutex::new(CacheState {
                entries: LruCache::new(capacity),
                hits: 0,
                misses: 0,
                evictions: 0,
                expirations: 0,
            })),
            options,
            sweeper: Mutex::new(None),
        };
        cache.start_sweeper();

        Ok(cache)
    }

    /// Look up a fresh verdict
    pub fn get(&self, key: &CacheKey) -> Option<Verdict> {
        let ttl = self.options.ttl();
        let mut guard = self.state.lock();
        let state = &mut *guard;

        let expired = match state.entries.peek(key) {
            Some(entry) if !entry.is_expired(ttl) => {
                let verdict = entry.verdict;
                state.hits += 1;
                return Some(verdict);
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            state.entries.pop(key);
            state.expirations += 1;
        }
        state.misses += 1;
        None
    }

    /// Store a verdict, evicting the oldest entry when full
    pub fn put(&self, key: CacheKey, verdict: Verdict) {
        let mut state = self.state.lock();
        let replacing = state.entries.contains(&key);

        if state.entries.push(key, CachedEntry::new(verdict)).is_some() && !replacing {
            state.evictions += 1;
        }
    }

    /// Drop every entry for one user; returns how many were removed
    pub fn invalidate_user(&self, user_id: &str) -> usize {
        let mut state = self.state.lock();
        let keys: Vec<CacheKey> = state
            .entries
            .iter()
            .filter(|(key, _)| key.user_id == user_id)
            .map(|(key, _)| key.clone())
            .collect();

        for key in &keys {
            state.entries.pop(key);
        }

        if !keys.is_empty() {
            debug!("Invalidated {} cached verdict(s) for user {}", keys.len(), user_id);
        }
        keys.len()
    }

    /// Drop every entry (statistics are kept)
    pub fn invalidate_all(&self) {
        self.state.lock().entries.clear();
    }

    /// Remove expired entries now; returns how many were removed
    pub fn purge_expired(&self) -> usize {
        self.state.lock().purge_expired(self.options.ttl())
    }

    pub fn stats(&self) -> CacheStats {
        let state = self.state.lock();
        let total = state.hits + state.misses;

        CacheStats {
            hits: state.hits,
            misses: state.misses,
            hit_rate: if total == 0 {
                0.0
            } else {
                state.hits as f64 / total as f64
            },
            evictions: state.evictions,
            expirations: state.expirations,
            size: state.entries.len(),
            max_size: self.options.max_size,
        }
    }

    /// Zero the counters
    pub fn reset_stats(&self) {
        let mut state = self.state.lock();
        state.hits = 0;
        state.misses = 0;
        state.evictions = 0;
        state.expirations = 0;
    }

    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn options(&self) -> &CacheOptions {
        &self.options
    }

    /// Whether the background sweep task is running
    pub fn is_sweeping(&self) -> bool {
        self.sweeper
            .lock()
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }

    /// Stop the background sweep
    pub fn shutdown(&self) {
        if let Some(handle) = self.sweeper.lock().take() {
            handle.abort();
            debug!("Cache sweep stopped");
        }
    }

    fn start_sweeper(&self) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            debug!("No Tokio runtime; cache relies on lazy expiry only");
            return;
        };

        let state: Weak<Mutex<CacheState>> = Arc::downgrade(&self.state);
        let ttl = self.options.ttl();
        let interval = self.options.cleanup_interval();

        let handle = runtime.spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // First tick completes immediately
            ticker.tick().await;

            loop {
                ticker.tick().await;
                let Some(state) = state.upgrade() else {
                    break;
                };
                let removed = state.lock().purge_expired(ttl);
                if removed > 0 {
                    debug!("Cache sweep removed {} expired verdict(s)", removed);
                }
            }
        });

        *self.sweeper.lock() = Some(handle);
    }
}

impl Drop for PermissionCache {
    fn drop(&mut self) {
        self.shutdown();
    }
}
