//! Process configuration.
//!
//! Plain struct with a `Default` impl and an `from_env` constructor, the
//! style `rvoip-call-engine::config::CallCenterConfig` uses — no external
//! config-loading crate is introduced since the teacher crate doesn't
//! depend on one either.

use std::time::Duration;

/// Runtime configuration for the ACD server.
#[derive(Debug, Clone)]
pub struct AcdConfig {
    /// Address the REST surface binds to.
    pub bind_addr: String,
    /// Endpoint for a networked store backend. Unused by the in-memory
    /// store shipped in this crate, but threaded through so a networked
    /// [`crate::store::Store`] implementation can be swapped in without
    /// touching callers.
    pub store_url: String,
    /// Advisory lock blocking-acquire budget (`spec.md` §4.2: ~100ms).
    pub lock_acquire_timeout: Duration,
    /// Advisory lock auto-release hold timeout (`spec.md` §4.2: ~1s).
    pub lock_hold_timeout: Duration,
    /// TTL applied to a contact document once it reaches `COMPLETE`
    /// (`spec.md` §6: 3600s).
    pub contact_ttl: Duration,
    /// Score increment applied when a contact is requeued after a failed
    /// match (`spec.md` §4.4: the "decelerator", 1000ms).
    pub requeue_decelerator: Duration,
}

impl Default for AcdConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:3000".to_string(),
            store_url: "memory://local".to_string(),
            lock_acquire_timeout: Duration::from_millis(100),
            lock_hold_timeout: Duration::from_millis(1000),
            contact_ttl: Duration::from_secs(3600),
            requeue_decelerator: Duration::from_millis(1000),
        }
    }
}

impl AcdConfig {
    /// Load configuration from the process environment, falling back to
    /// [`Default`] for anything unset. `REST_URL` doubles as the bind
    /// address for parity with the Python simulator's client-side env var
    /// of the same name.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            bind_addr: std::env::var("REST_URL").unwrap_or(defaults.bind_addr),
            store_url: std::env::var("STORE_URL").unwrap_or(defaults.store_url),
            lock_acquire_timeout: env_millis("LOCK_ACQUIRE_TIMEOUT_MS", defaults.lock_acquire_timeout),
            lock_hold_timeout: env_millis("LOCK_HOLD_TIMEOUT_MS", defaults.lock_hold_timeout),
            contact_ttl: env_secs("CONTACT_TTL_SECS", defaults.contact_ttl),
            requeue_decelerator: env_millis("REQUEUE_DECELERATOR_MS", defaults.requeue_decelerator),
        }
    }
}

fn env_millis(key: &str, default: Duration) -> Duration {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(default)
}

fn env_secs(key: &str, default: Duration) -> Duration {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or(default)
}
