use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use anyhow::anyhow;
use serde_json::Value;

use super::client::DocumentStore;
use super::types::Document;

/// In-memory store backing tests and offline runs.
#[derive(Default)]
pub struct MockDocumentStore {
    collections: Mutex<HashMap<String, Vec<Document>>>,
    unavailable: Mutex<HashSet<String>>,
    id_counter: AtomicU64,
}

impl MockDocumentStore {
    fn next_id(&self) -> String {
        let id = self.id_counter.fetch_add(1, Ordering::Relaxed) + 1;
        format!("mock-doc-{id}")
    }

    /// Insert a record from a plain JSON object of fields, returning the
    /// assigned key.
    #[allow(dead_code)]
    pub fn insert(&self, collection: &str, fields: Value) -> String {
        let id = self.next_id();
        let fields = fields.as_object().cloned().unwrap_or_default();
        self.collections
            .lock()
            .expect("mock store lock poisoned")
            .entry(collection.to_string())
            .or_default()
            .push(Document::new(id.clone(), fields));
        id
    }

    /// Make every subsequent read of `collection` fail, simulating an
    /// unreachable store.
    #[allow(dead_code)]
    pub fn set_unavailable(&self, collection: &str) {
        self.unavailable
            .lock()
            .expect("mock store lock poisoned")
            .insert(collection.to_string());
    }
}

#[async_trait::async_trait]
impl DocumentStore for MockDocumentStore {
    async fn list_all(&self, collection: &str) -> anyhow::Result<Vec<Document>> {
        if self
            .unavailable
            .lock()
            .map_err(|_| anyhow!("mock store lock poisoned"))?
            .contains(collection)
        {
            return Err(anyhow!("collection '{collection}' is unavailable"));
        }

        let collections = self
            .collections
            .lock()
            .map_err(|_| anyhow!("mock store lock poisoned"))?;
        Ok(collections.get(collection).cloned().unwrap_or_default())
    }
}
