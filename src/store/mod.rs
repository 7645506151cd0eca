//! Transactional document store capability.
//!
//! The engine's only shared mutable resource. Every read-then-write of a
//! single document goes through [`DocumentStore::transact`], which applies a
//! caller-supplied closure atomically and isolated from other transactions
//! touching the same document.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

mod json_file;
mod memory;

pub use json_file::JsonFileStore;
pub use memory::MemoryStore;

/// Collection holding one state document per provider.
pub const PROVIDER_STATES: &str = "provider_states";
/// Collection holding one record per (user, provider) subscription.
pub const SUBSCRIPTIONS: &str = "subscriptions";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("store i/o at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("encoding document {key}: {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// Two transactions raced on the same document and this one lost. The
    /// bundled stores serialize transactions and never produce it; backends
    /// with optimistic versioning surface it here. Not retried by the core.
    #[error("transaction conflict on {key}")]
    Conflict { key: String },
}

/// Identifies one document: a collection name plus a document id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocKey {
    pub collection: &'static str,
    pub id: String,
}

impl DocKey {
    pub fn new(collection: &'static str, id: impl Into<String>) -> Self {
        Self {
            collection,
            id: id.into(),
        }
    }

    pub fn provider_state(provider: &str) -> Self {
        Self::new(PROVIDER_STATES, provider)
    }

    pub fn subscription(id: impl Into<String>) -> Self {
        Self::new(SUBSCRIPTIONS, id)
    }
}

impl std::fmt::Display for DocKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.collection, self.id)
    }
}

/// Outcome of a transaction closure: leave the document alone or replace it.
#[derive(Debug, Clone)]
pub enum Mutation {
    Keep,
    Write(Value),
}

/// The closure a transaction applies to the current document value.
pub type TxApply<'a> = Box<dyn FnMut(Option<&Value>) -> Mutation + Send + 'a>;

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Read one document, `None` if it does not exist.
    async fn get(&self, key: &DocKey) -> Result<Option<Value>, StoreError>;

    /// All documents in a collection as `(id, value)` pairs, in id order.
    async fn list(&self, collection: &'static str) -> Result<Vec<(String, Value)>, StoreError>;

    /// Atomically read the document, apply `apply`, and commit the returned
    /// mutation. Returns `true` when a write was committed.
    async fn transact<'a>(&self, key: &DocKey, apply: TxApply<'a>) -> Result<bool, StoreError>;
}

/// Last-observed page state for one provider. Which field is populated
/// depends on the provider's detection strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_msg: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_links: Option<Vec<String>>,
}

/// One user's opt-in for one provider, plus the email-thread anchor once the
/// first notification has gone out.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionRecord {
    #[serde(default)]
    pub base: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
}

/// Decode a stored document, treating a missing or undecodable value as the
/// type's default.
pub fn decode_or_default<T: for<'de> Deserialize<'de> + Default>(value: Option<&Value>) -> T {
    value
        .cloned()
        .and_then(|v| serde_json::from_value(v).ok())
        .unwrap_or_default()
}

pub fn encode<T: Serialize>(key: &DocKey, value: &T) -> Result<Value, StoreError> {
    serde_json::to_value(value).map_err(|source| StoreError::Encode {
        key: key.to_string(),
        source,
    })
}
