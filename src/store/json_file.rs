//! File-backed store: one pretty-printed JSON file per document under a
//! state directory, `<root>/<collection>/<id>.json`.
//!
//! Transactions are serialized by a store-wide async mutex, so the
//! read-then-conditional-write inside `transact` is atomic with respect to
//! every other transaction in this process.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;
use tokio::fs;
use tokio::sync::Mutex;

use super::{DocKey, DocumentStore, Mutation, StoreError, TxApply};

pub struct JsonFileStore {
    root: PathBuf,
    tx_lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            tx_lock: Mutex::new(()),
        }
    }

    fn doc_path(&self, key: &DocKey) -> PathBuf {
        self.root
            .join(key.collection)
            .join(format!("{}.json", key.id))
    }

    fn io_err(path: &Path, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: path.display().to_string(),
            source,
        }
    }

    async fn read_doc(&self, key: &DocKey) -> Result<Option<Value>, StoreError> {
        let path = self.doc_path(key);
        let raw = match fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(Self::io_err(&path, e)),
        };
        match serde_json::from_str(&raw) {
            Ok(v) => Ok(Some(v)),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "unreadable document, treating as absent");
                Ok(None)
            }
        }
    }

    async fn write_doc(&self, key: &DocKey, value: &Value) -> Result<(), StoreError> {
        let path = self.doc_path(key);
        let dir = self.root.join(key.collection);
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| Self::io_err(&dir, e))?;
        let bytes = serde_json::to_vec_pretty(value).map_err(|source| StoreError::Encode {
            key: key.to_string(),
            source,
        })?;
        fs::write(&path, bytes)
            .await
            .map_err(|e| Self::io_err(&path, e))
    }
}

#[async_trait]
impl DocumentStore for JsonFileStore {
    async fn get(&self, key: &DocKey) -> Result<Option<Value>, StoreError> {
        self.read_doc(key).await
    }

    async fn list(&self, collection: &'static str) -> Result<Vec<(String, Value)>, StoreError> {
        let dir = self.root.join(collection);
        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(Self::io_err(&dir, e)),
        };

        let mut docs = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| Self::io_err(&dir, e))?
        {
            let path = entry.path();
            if path.extension().and_then(|s| s.to_str()) != Some("json") {
                continue;
            }
            let Some(id) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let key = DocKey::new(collection, id);
            if let Some(value) = self.read_doc(&key).await? {
                docs.push((id.to_string(), value));
            }
        }
        docs.sort_by(|(a, _), (b, _)| a.cmp(b));
        Ok(docs)
    }

    async fn transact<'a>(&self, key: &DocKey, mut apply: TxApply<'a>) -> Result<bool, StoreError> {
        let _guard = self.tx_lock.lock().await;
        let current = self.read_doc(key).await?;
        match apply(current.as_ref()) {
            Mutation::Keep => Ok(false),
            Mutation::Write(v) => {
                self.write_doc(key, &v).await?;
                Ok(true)
            }
        }
    }
}
