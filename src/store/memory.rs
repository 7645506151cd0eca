//! In-memory store, used by tests and available for dry runs.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;

use super::{DocKey, DocumentStore, Mutation, StoreError, TxApply};

/// Map-backed store. A single async mutex serializes transactions, which is
/// what gives `transact` its read-then-write atomicity.
#[derive(Default)]
pub struct MemoryStore {
    docs: Mutex<BTreeMap<(String, String), Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn map_key(key: &DocKey) -> (String, String) {
        (key.collection.to_string(), key.id.clone())
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, key: &DocKey) -> Result<Option<Value>, StoreError> {
        let docs = self.docs.lock().await;
        Ok(docs.get(&Self::map_key(key)).cloned())
    }

    async fn list(&self, collection: &'static str) -> Result<Vec<(String, Value)>, StoreError> {
        let docs = self.docs.lock().await;
        Ok(docs
            .iter()
            .filter(|((coll, _), _)| coll == collection)
            .map(|((_, id), v)| (id.clone(), v.clone()))
            .collect())
    }

    async fn transact<'a>(&self, key: &DocKey, mut apply: TxApply<'a>) -> Result<bool, StoreError> {
        let mut docs = self.docs.lock().await;
        let map_key = Self::map_key(key);
        match apply(docs.get(&map_key)) {
            Mutation::Keep => Ok(false),
            Mutation::Write(v) => {
                docs.insert(map_key, v);
                Ok(true)
            }
        }
    }
}
