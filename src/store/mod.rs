//! # State store abstraction
//!
//! Component A of `spec.md` §2/§4.1/§5: the set of atomic primitives the
//! rest of the crate is built on, so the operations layer and dispatcher
//! never talk to a concrete backend directly. `spec.md` is explicit that
//! "an implementer may realize them on any store that supports them" —
//! this crate ships [`memory::MemoryStore`], a fully in-process
//! realization, behind the same [`Store`] trait a networked
//! implementation would use.
//!
//! ## Capabilities
//!
//! - **Ordered sets** ([`ordered_set::OrderedSet`]): the FIFO `queue` and
//!   the per-skill `avail:{s}` availability indexes are each one named
//!   ordered set, obtained via [`Store::ordered_set`]. `ZINTER`-equivalent
//!   intersection is the free function [`ordered_set::zinter`].
//! - **JSON documents**: `contact:<uuid>` and `agent:<id>` records are
//!   whole-document JSON values, addressed by key with field-level patch
//!   operations (`doc_set`/`doc_get`/`doc_patch`/`doc_mpatch`) mirroring
//!   the Python original's `client.json().set/get/mset` calls against
//!   top-level fields (`$.state`, `$.skills`, ...); array operations
//!   (`arr_append`/`arr_index`/`arr_pop`) mirror `arrappend`/`arrindex`/
//!   `arrpop` against the `skills` array specifically.
//! - **Key housekeeping**: `exists`/`delete`/`expire`/`scan`.
//! - **Advisory locks**: [`lock::LockRegistry`], with an acquire-timeout
//!   and a self-expiring hold-timeout (`spec.md` §4.2, §9).

pub mod lock;
pub mod memory;
pub mod ordered_set;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

pub use lock::LockGuard;
pub use memory::MemoryStore;
pub use ordered_set::{zinter, OrderedSet};

/// The abstract store capabilities `spec.md` §4.1 requires. Every method
/// here is expected to be atomic with respect to other callers of the same
/// method; cross-method atomicity (e.g. "set two fields and touch an
/// ordered set in one step") is explicitly not required — see `spec.md`
/// §4.2's "Atomicity caveat" — the per-agent advisory lock is what makes
/// the operations layer correct, not store-level transactions.
#[async_trait]
pub trait Store: Send + Sync {
    /// Get the named ordered set, creating it empty on first use. Backs
    /// both the `queue` and each `avail:{s}` index.
    fn ordered_set(&self, name: &str) -> Arc<OrderedSet>;

    /// Whole-document read. `None` if `key` does not exist.
    async fn doc_get(&self, key: &str) -> Option<Value>;

    /// Whole-document write (create or replace).
    async fn doc_set(&self, key: &str, value: Value);

    /// Set a single top-level field of an existing document. Returns
    /// `false` if the document does not exist.
    async fn doc_patch(&self, key: &str, field: &str, value: Value) -> bool;

    /// Atomically set several top-level fields of an existing document in
    /// one call (`jsonMSet`). Returns `false` if the document does not
    /// exist.
    async fn doc_mpatch(&self, key: &str, patches: &[(&str, Value)]) -> bool;

    /// Append a value to an array field (`jsonArrAppend`).
    async fn arr_append(&self, key: &str, field: &str, value: Value) -> bool;

    /// Index of `value` within an array field, if present
    /// (`jsonArrIndex`).
    async fn arr_index(&self, key: &str, field: &str, value: &Value) -> Option<usize>;

    /// Remove and return the element at `index` within an array field
    /// (`jsonArrPop`).
    async fn arr_pop(&self, key: &str, field: &str, index: usize) -> Option<Value>;

    /// Whether `key` exists (as a document).
    async fn exists(&self, key: &str) -> bool;

    /// Delete `key`'s document, if present. Returns whether it was
    /// present.
    async fn delete(&self, key: &str) -> bool;

    /// Schedule `key` for deletion after `ttl` elapses.
    async fn expire(&self, key: &str, ttl: Duration);

    /// All document keys beginning with `prefix`.
    async fn scan(&self, prefix: &str) -> Vec<String>;

    /// Acquire the named advisory lock (`spec.md` §4.2).
    async fn lock(&self, name: &str, acquire_timeout: Duration, hold_timeout: Duration) -> Option<LockGuard>;
}
