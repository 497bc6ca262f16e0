//! Per-key advisory lock with a blocking acquire-timeout and an
//! auto-releasing hold-timeout (`spec.md` §4.2, §5, §9).
//!
//! Realizes the same contract as `redis.asyncio.lock.Lock(timeout=...,
//! blocking_timeout=...)` the Python original uses around every
//! agent-mutating operation: `acquire()` gives up (returns `None`) after
//! `acquire_timeout` of contention, and a held lock releases itself after
//! `hold_timeout` even if its owner never calls `release` — bounding the
//! damage a crashed holder can do without requiring a second watchdog
//! process.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// A named lock's semaphore plus a generation counter identifying the
/// current acquisition. The counter lets a hold-timeout watchdog tell
/// "I am still the holder I was spawned for" apart from "someone else
/// has since legitimately acquired this same name" — the permit count
/// alone cannot distinguish those two cases (see [`LockRegistry::acquire`]).
#[derive(Clone)]
struct LockEntry {
    semaphore: Arc<Semaphore>,
    generation: Arc<AtomicU64>,
}

/// Registry of named advisory locks, keyed by lock name (`lock:<agent_key>`
/// in `spec.md` terms — this type stores the registry of all such locks,
/// not a single lock).
#[derive(Clone, Default)]
pub struct LockRegistry {
    entries: Arc<Mutex<HashMap<String, LockEntry>>>,
}

/// A held advisory lock. Releases on `Drop`, or after its hold-timeout
/// elapses, whichever comes first.
pub struct LockGuard {
    _permit: OwnedSemaphorePermit,
}

impl LockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn entry_for(&self, name: &str) -> LockEntry {
        self.entries
            .lock()
            .entry(name.to_string())
            .or_insert_with(|| LockEntry { semaphore: Arc::new(Semaphore::new(1)), generation: Arc::new(AtomicU64::new(0)) })
            .clone()
    }

    /// Attempt to acquire the lock named `name`, blocking up to
    /// `acquire_timeout`. Returns `None` on timeout (the caller surfaces
    /// `LOCKED` without side effects, per `spec.md` §4.2).
    ///
    /// The returned guard force-releases after `hold_timeout` even if
    /// still held, matching the Python lock's self-expiring `timeout`
    /// parameter. The watchdog only forces a permit back if this exact
    /// acquisition is still the current one (its captured generation
    /// still matches the entry's generation) *and* the semaphore is
    /// still fully held — otherwise a later, legitimate holder's permit
    /// would be duplicated, letting two callers hold the same named lock
    /// at once (breaking I2/P1).
    pub async fn acquire(&self, name: &str, acquire_timeout: Duration, hold_timeout: Duration) -> Option<LockGuard> {
        let entry = self.entry_for(name);
        let permit = tokio::time::timeout(acquire_timeout, entry.semaphore.clone().acquire_owned())
            .await
            .ok()?
            .expect("semaphore never closed");

        let my_generation = entry.generation.fetch_add(1, Ordering::SeqCst) + 1;

        tokio::spawn({
            let semaphore = entry.semaphore.clone();
            let generation = entry.generation.clone();
            async move {
                tokio::time::sleep(hold_timeout).await;
                if generation.load(Ordering::SeqCst) == my_generation && semaphore.available_permits() == 0 {
                    semaphore.add_permits(1);
                }
            }
        });

        Some(LockGuard { _permit: permit })
    }
}
