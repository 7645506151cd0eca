//! Hand-rolled mocks for the injected capabilities, shared across
//! integration tests.
#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::json;

use inventory_watcher::error::{Result, WatchError};
use inventory_watcher::fetch::PageFetcher;
use inventory_watcher::notify::{MailTransport, OutgoingEmail, SentReceipt};
use inventory_watcher::store::{DocKey, DocumentStore, MemoryStore, Mutation};
use inventory_watcher::subscribers::subscription_id;

/// Serves canned page bodies by URL; everything else is unreachable.
#[derive(Default)]
pub struct MockFetcher {
    pages: Mutex<HashMap<String, String>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_page(&self, url: &str, body: &str) {
        self.pages
            .lock()
            .unwrap()
            .insert(url.to_string(), body.to_string());
    }

    pub fn remove_page(&self, url: &str) {
        self.pages.lock().unwrap().remove(url);
    }
}

#[async_trait]
impl PageFetcher for MockFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        self.pages
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| WatchError::Network {
                url: url.to_string(),
                reason: "connection refused".into(),
            })
    }
}

/// Records every outgoing email; addresses in the failure set bounce.
#[derive(Default)]
pub struct MockTransport {
    sent: Mutex<Vec<OutgoingEmail>>,
    failing: Mutex<HashSet<String>>,
    seq: AtomicU64,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_for(&self, addr: &str) {
        self.failing.lock().unwrap().insert(addr.to_string());
    }

    pub fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl MailTransport for MockTransport {
    async fn send(&self, email: &OutgoingEmail) -> Result<SentReceipt> {
        if self.failing.lock().unwrap().contains(&email.to) {
            return Err(WatchError::Transport {
                reason: format!("delivery to {} refused", email.to),
            });
        }
        self.sent.lock().unwrap().push(email.clone());
        let n = self.seq.fetch_add(1, Ordering::Relaxed) + 1;
        Ok(SentReceipt {
            message_id: format!("<mock-{n}@test>"),
        })
    }
}

/// Opt a user into a provider's base updates.
pub async fn seed_base(store: &MemoryStore, user: &str, provider: &str) {
    store
        .transact(
            &DocKey::subscription(subscription_id(user, provider)),
            Box::new(|_| Mutation::Write(json!({"base": true}))),
        )
        .await
        .unwrap();
}

/// Preset a provider's stored state document.
pub async fn seed_provider_state(store: &MemoryStore, provider: &str, state: serde_json::Value) {
    store
        .transact(
            &DocKey::provider_state(provider),
            Box::new(move |_| Mutation::Write(state.clone())),
        )
        .await
        .unwrap();
}
