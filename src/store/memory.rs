//! In-process realization of [`Store`], built on `dashmap` for documents
//! and named ordered sets, in the idiom `rvoip-call-engine` uses for its
//! in-memory registries (`registrar-core::presence::PresenceStore`,
//! `orchestrator::core::CallCenterState`'s `DashMap`-backed fields).

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use tracing::debug;

use super::lock::{LockGuard, LockRegistry};
use super::ordered_set::OrderedSet;
use super::Store;

/// A store with no external dependencies: every document and ordered set
/// lives in process memory. Suitable for tests, single-node deployments,
/// and as the reference realization of the [`Store`] contract.
#[derive(Clone, Default)]
pub struct MemoryStore {
    docs: Arc<DashMap<String, Value>>,
    ordered_sets: Arc<DashMap<String, Arc<OrderedSet>>>,
    locks: LockRegistry,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    fn ordered_set(&self, name: &str) -> Arc<OrderedSet> {
        self.ordered_sets
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(OrderedSet::new()))
            .clone()
    }

    async fn doc_get(&self, key: &str) -> Option<Value> {
        self.docs.get(key).map(|entry| entry.clone())
    }

    async fn doc_set(&self, key: &str, value: Value) {
        self.docs.insert(key.to_string(), value);
    }

    async fn doc_patch(&self, key: &str, field: &str, value: Value) -> bool {
        match self.docs.get_mut(key) {
            Some(mut entry) => {
                if let Value::Object(map) = entry.value_mut() {
                    map.insert(field.to_string(), value);
                    true
                } else {
                    false
                }
            }
            None => false,
        }
    }

    async fn doc_mpatch(&self, key: &str, patches: &[(&str, Value)]) -> bool {
        match self.docs.get_mut(key) {
            Some(mut entry) => {
                if let Value::Object(map) = entry.value_mut() {
                    for (field, value) in patches {
                        map.insert((*field).to_string(), value.clone());
                    }
                    true
                } else {
                    false
                }
            }
            None => false,
        }
    }

    async fn arr_append(&self, key: &str, field: &str, value: Value) -> bool {
        match self.docs.get_mut(key) {
            Some(mut entry) => {
                if let Value::Object(map) = entry.value_mut() {
                    match map.get_mut(field) {
                        Some(Value::Array(arr)) => {
                            arr.push(value);
                            true
                        }
                        _ => false,
                    }
                } else {
                    false
                }
            }
            None => false,
        }
    }

    async fn arr_index(&self, key: &str, field: &str, value: &Value) -> Option<usize> {
        let entry = self.docs.get(key)?;
        let arr = entry.get(field)?.as_array()?;
        arr.iter().position(|v| v == value)
    }

    async fn arr_pop(&self, key: &str, field: &str, index: usize) -> Option<Value> {
        let mut entry = self.docs.get_mut(key)?;
        let map = entry.value_mut().as_object_mut()?;
        let arr = map.get_mut(field)?.as_array_mut()?;
        if index < arr.len() {
            Some(arr.remove(index))
        } else {
            None
        }
    }

    async fn exists(&self, key: &str) -> bool {
        self.docs.contains_key(key)
    }

    async fn delete(&self, key: &str) -> bool {
        self.docs.remove(key).is_some()
    }

    async fn expire(&self, key: &str, ttl: Duration) {
        let docs = self.docs.clone();
        let key = key.to_string();
        tokio::spawn(async move {
            tokio::time::sleep(ttl).await;
            if docs.remove(&key).is_some() {
                debug!("{key} expired after TTL");
            }
        });
    }

    async fn scan(&self, prefix: &str) -> Vec<String> {
        self.docs
            .iter()
            .map(|entry| entry.key().clone())
            .filter(|key| key.starts_with(prefix))
            .collect()
    }

    async fn lock(&self, name: &str, acquire_timeout: Duration, hold_timeout: Duration) -> Option<LockGuard> {
        self.locks.acquire(name, acquire_timeout, hold_timeout).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn doc_set_get_roundtrip() {
        let store = MemoryStore::new();
        store.doc_set("agent:1", json!({"fname": "Ada"})).await;
        assert_eq!(store.doc_get("agent:1").await, Some(json!({"fname": "Ada"})));
        assert!(store.exists("agent:1").await);
        assert!(!store.exists("agent:2").await);
    }

    #[tokio::test]
    async fn doc_patch_requires_existing_doc() {
        let store = MemoryStore::new();
        assert!(!store.doc_patch("agent:1", "state", json!(1)).await);
        store.doc_set("agent:1", json!({"state": 0})).await;
        assert!(store.doc_patch("agent:1", "state", json!(1)).await);
        assert_eq!(store.doc_get("agent:1").await.unwrap()["state"], json!(1));
    }

    #[tokio::test]
    async fn doc_mpatch_sets_multiple_fields_atomically() {
        let store = MemoryStore::new();
        store.doc_set("contact:1", json!({"state": 1, "agent": null})).await;
        let ok = store
            .doc_mpatch("contact:1", &[("state", json!(2)), ("agent", json!("agent:1"))])
            .await;
        assert!(ok);
        let doc = store.doc_get("contact:1").await.unwrap();
        assert_eq!(doc["state"], json!(2));
        assert_eq!(doc["agent"], json!("agent:1"));
    }

    #[tokio::test]
    async fn arr_append_index_pop() {
        let store = MemoryStore::new();
        store.doc_set("agent:1", json!({"skills": ["English"]})).await;
        assert!(store.arr_append("agent:1", "skills", json!("Billing")).await);
        assert_eq!(store.arr_index("agent:1", "skills", &json!("Billing")).await, Some(1));
        assert_eq!(store.arr_index("agent:1", "skills", &json!("Spanish")).await, None);
        let popped = store.arr_pop("agent:1", "skills", 1).await;
        assert_eq!(popped, Some(json!("Billing")));
        assert_eq!(store.arr_index("agent:1", "skills", &json!("Billing")).await, None);
    }

    #[tokio::test]
    async fn delete_removes_document() {
        let store = MemoryStore::new();
        store.doc_set("agent:1", json!({})).await;
        assert!(store.delete("agent:1").await);
        assert!(!store.delete("agent:1").await);
        assert!(!store.exists("agent:1").await);
    }

    #[tokio::test]
    async fn expire_removes_document_after_ttl() {
        let store = MemoryStore::new();
        store.doc_set("contact:1", json!({})).await;
        store.expire("contact:1", Duration::from_millis(20)).await;
        assert!(store.exists("contact:1").await);
        tokio::time::sleep(Duration::from_millis(80)).await;
        assert!(!store.exists("contact:1").await);
    }

    #[tokio::test]
    async fn scan_filters_by_prefix() {
        let store = MemoryStore::new();
        store.doc_set("agent:1", json!({})).await;
        store.doc_set("agent:2", json!({})).await;
        store.doc_set("contact:1", json!({})).await;
        let mut agents = store.scan("agent:").await;
        agents.sort();
        assert_eq!(agents, vec!["agent:1".to_string(), "agent:2".to_string()]);
    }

    #[tokio::test]
    async fn ordered_set_is_created_on_demand_and_shared() {
        let store = MemoryStore::new();
        let a = store.ordered_set("queue");
        a.zadd("contact:1", 100);
        let b = store.ordered_set("queue");
        assert!(b.contains("contact:1"));
    }
}
