//! Time-bounded policy cache.
//!
//! Keyed by [`PolicyKey`], each entry pairs an immutable policy with its
//! creation instant. A lookup at or past the TTL is a miss and removes the
//! entry; a background sweeper evicts expired entries that nobody reads.
//!
//! # Lifecycle
//!
//! One instance per process in production, constructed explicitly and
//! injected into the repository; tests create isolated instances freely.
//! `dispose()` (or `Drop`) stops the sweeper thread; the cache never relies
//! on finalization.
//!
//! # Lock discipline
//!
//! The entry map mutex is held only for the duration of a single map
//! operation, never across store or directory I/O. The sweeper re-acquires
//! the lock per deletion, so the worst case a concurrent reader waits for is
//! one map operation, not a full sweep.

use std::collections::HashMap;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex, Weak};
use std::thread;
use std::time::{Duration, Instant};

use aperio_arp::ArpDocument;
use aperio_types::PolicyKey;
use tracing::debug;

/// Default interval between background sweeps.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(300);

struct CacheEntry {
    policy: Arc<ArpDocument>,
    created_at: Instant,
}

struct CacheInner {
    ttl: Duration,
    entries: Mutex<HashMap<PolicyKey, CacheEntry>>,
}

impl CacheInner {
    fn is_expired(&self, entry: &CacheEntry, now: Instant) -> bool {
        now.duration_since(entry.created_at) >= self.ttl
    }
}

/// A TTL-bounded, identity-keyed policy cache with a background sweeper.
pub struct PolicyCache {
    inner: Arc<CacheInner>,
    shutdown_tx: mpsc::Sender<()>,
    sweeper: Mutex<Option<thread::JoinHandle<()>>>,
}

impl PolicyCache {
    /// Creates a cache with the given TTL and the default sweep interval.
    ///
    /// # Panics
    ///
    /// Panics if `ttl` is zero. A zero TTL means caching is disabled, which
    /// callers express by not constructing a cache at all.
    pub fn new(ttl: Duration) -> Self {
        Self::with_sweep_interval(ttl, DEFAULT_SWEEP_INTERVAL)
    }

    /// Creates a cache with an explicit sweep interval.
    ///
    /// # Panics
    ///
    /// Panics if `ttl` or `sweep_interval` is zero.
    pub fn with_sweep_interval(ttl: Duration, sweep_interval: Duration) -> Self {
        assert!(!ttl.is_zero(), "cache TTL must be positive");
        assert!(!sweep_interval.is_zero(), "sweep interval must be positive");

        let inner = Arc::new(CacheInner {
            ttl,
            entries: Mutex::new(HashMap::new()),
        });

        let (shutdown_tx, shutdown_rx) = mpsc::channel();
        let weak = Arc::downgrade(&inner);

        let sweeper = thread::Builder::new()
            .name("aperio-arp-sweeper".to_string())
            .spawn(move || Self::sweeper_loop(&weak, &shutdown_rx, sweep_interval))
            .expect("failed to spawn cache sweeper thread");

        Self {
            inner,
            shutdown_tx,
            sweeper: Mutex::new(Some(sweeper)),
        }
    }

    /// Stores a policy under the given key, replacing any existing entry.
    pub fn insert(&self, key: PolicyKey, policy: Arc<ArpDocument>) {
        let entry = CacheEntry {
            policy,
            created_at: Instant::now(),
        };
        self.inner
            .entries
            .lock()
            .expect("cache lock poisoned")
            .insert(key, entry);
    }

    /// Returns the cached policy for `key`, or `None` on a miss.
    ///
    /// An entry at or past its TTL is treated as a miss and removed under
    /// the same lock acquisition.
    pub fn get(&self, key: &PolicyKey) -> Option<Arc<ArpDocument>> {
        let mut entries = self.inner.entries.lock().expect("cache lock poisoned");

        let expired = match entries.get(key) {
            Some(entry) => {
                if !self.inner.is_expired(entry, Instant::now()) {
                    debug!(key = %key, "policy cache hit");
                    return Some(Arc::clone(&entry.policy));
                }
                true
            }
            None => false,
        };

        if expired {
            debug!(key = %key, "policy cache entry expired on read");
            entries.remove(key);
        }
        None
    }

    /// Returns the number of live entries (expired entries not yet swept
    /// still count).
    pub fn len(&self) -> usize {
        self.inner.entries.lock().expect("cache lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stops the sweeper thread. Safe to call more than once; `Drop`
    /// delegates here.
    pub fn dispose(&self) {
        // A closed channel wakes the sweeper immediately.
        let _ = self.shutdown_tx.send(());
        if let Some(handle) = self.sweeper.lock().expect("sweeper lock poisoned").take() {
            let _ = handle.join();
        }
    }

    /// The sweeper wakes on a fixed interval, snapshots the key set, and
    /// re-checks each key under its own lock acquisition. Holding only a
    /// `Weak` to the entry map lets the loop exit once the cache is gone.
    fn sweeper_loop(
        inner: &Weak<CacheInner>,
        shutdown_rx: &mpsc::Receiver<()>,
        interval: Duration,
    ) {
        loop {
            match shutdown_rx.recv_timeout(interval) {
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                Err(RecvTimeoutError::Timeout) => {}
            }

            let Some(inner) = inner.upgrade() else { break };
            Self::sweep(&inner);
        }
    }

    fn sweep(inner: &CacheInner) {
        let keys: Vec<PolicyKey> = {
            let entries = inner.entries.lock().expect("cache lock poisoned");
            entries.keys().cloned().collect()
        };

        let now = Instant::now();
        let mut evicted = 0usize;

        for key in keys {
            // Lock per deletion so readers are never blocked for a full sweep.
            let mut entries = inner.entries.lock().expect("cache lock poisoned");
            if entries.get(&key).is_some_and(|e| inner.is_expired(e, now)) {
                entries.remove(&key);
                evicted += 1;
            }
        }

        if evicted > 0 {
            debug!(evicted, "cache sweep removed expired policies");
        }
    }
}

impl Drop for PolicyCache {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl std::fmt::Debug for PolicyCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PolicyCache")
            .field("ttl", &self.inner.ttl)
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn site_policy() -> Arc<ArpDocument> {
        Arc::new(ArpDocument::site())
    }

    #[test]
    fn insert_and_get_within_ttl() {
        let cache = PolicyCache::new(Duration::from_secs(60));
        cache.insert(PolicyKey::Site, site_policy());

        assert!(cache.get(&PolicyKey::Site).is_some());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn read_past_ttl_is_a_miss_and_removes_the_entry() {
        let cache = PolicyCache::with_sweep_interval(
            Duration::from_millis(40),
            Duration::from_secs(60),
        );
        cache.insert(PolicyKey::Site, site_policy());

        thread::sleep(Duration::from_millis(60));

        assert!(cache.get(&PolicyKey::Site).is_none());
        assert_eq!(cache.len(), 0, "expired entry removed on read");
    }

    #[test]
    fn sweeper_evicts_without_reads() {
        let cache = PolicyCache::with_sweep_interval(
            Duration::from_millis(20),
            Duration::from_millis(20),
        );
        cache.insert(PolicyKey::Site, site_policy());

        thread::sleep(Duration::from_millis(120));

        assert_eq!(cache.len(), 0, "sweeper removed the expired entry");
    }

    #[test]
    fn fresh_entries_survive_a_sweep() {
        let cache = PolicyCache::with_sweep_interval(
            Duration::from_secs(60),
            Duration::from_millis(20),
        );
        cache.insert(PolicyKey::Site, site_policy());

        thread::sleep(Duration::from_millis(80));

        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn dispose_is_idempotent() {
        let cache = PolicyCache::new(Duration::from_secs(60));
        cache.dispose();
        cache.dispose();
    }

    #[test]
    #[should_panic(expected = "TTL must be positive")]
    fn zero_ttl_panics() {
        let _ = PolicyCache::new(Duration::ZERO);
    }
}
