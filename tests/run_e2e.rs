// tests/run_e2e.rs
// Full engine passes over the real registry with mocked fetch/transport.

mod common;

use std::sync::Arc;

use serde_json::json;

use common::{seed_base, seed_provider_state, MockFetcher, MockTransport};
use inventory_watcher::registry::registry;
use inventory_watcher::runner::WatchRunner;
use inventory_watcher::store::{
    decode_or_default, DocKey, DocumentStore, MemoryStore, ProviderState, SubscriptionRecord,
};
use inventory_watcher::subscribers::subscription_id;

const SECONDUSE_URL: &str = "https://www.seconduse.com/inventory/";
const BALLARD_URL: &str = "https://ballardreuse.com/shop/";

const SECONDUSE_JAN1: &str = include_str!("fixtures/seconduse_jan1.html");
const SECONDUSE_JAN2: &str = include_str!("fixtures/seconduse_jan2.html");
const BALLARD_XYZ: &str = include_str!("fixtures/ballardreuse_xyz.html");
const BALLARD_WXY: &str = include_str!("fixtures/ballardreuse_wxy.html");

struct Harness {
    store: Arc<MemoryStore>,
    fetcher: Arc<MockFetcher>,
    transport: Arc<MockTransport>,
    runner: WatchRunner,
}

fn harness() -> Harness {
    let store = Arc::new(MemoryStore::new());
    let fetcher = Arc::new(MockFetcher::new());
    let transport = Arc::new(MockTransport::new());
    let runner = WatchRunner::new(
        registry(),
        fetcher.clone(),
        store.clone(),
        transport.clone(),
        None,
    );
    Harness {
        store,
        fetcher,
        transport,
        runner,
    }
}

async fn subscription(store: &MemoryStore, user: &str, provider: &str) -> SubscriptionRecord {
    let v = store
        .get(&DocKey::subscription(subscription_id(user, provider)))
        .await
        .unwrap();
    decode_or_default(v.as_ref())
}

async fn provider_state(store: &MemoryStore, provider: &str) -> ProviderState {
    let v = store.get(&DocKey::provider_state(provider)).await.unwrap();
    decode_or_default(v.as_ref())
}

#[tokio::test]
async fn marker_update_notifies_every_subscriber_once() {
    let h = harness();
    seed_provider_state(
        &h.store,
        "seconduse",
        json!({"updatedMsg": "Inventory last updated January 1 at 9:14 am"}),
    )
    .await;
    seed_base(&h.store, "alice@example.com", "seconduse").await;
    seed_base(&h.store, "bob@example.com", "seconduse").await;
    h.fetcher.set_page(SECONDUSE_URL, SECONDUSE_JAN2);
    h.fetcher.set_page(BALLARD_URL, BALLARD_XYZ);

    h.runner.run_once().await.unwrap();

    let sent = h.transport.sent();
    assert_eq!(sent.len(), 2);
    let recipients: Vec<_> = sent.iter().map(|e| e.to.as_str()).collect();
    assert_eq!(recipients, vec!["alice@example.com", "bob@example.com"]);
    for email in &sent {
        assert_eq!(email.subject, "There is new inventory at Second Use");
        assert!(email.text.contains("January 2"));
    }

    // State moved to the fresh marker.
    assert_eq!(
        provider_state(&h.store, "seconduse").await.updated_msg.unwrap(),
        "Inventory last updated January 2 at 8:02 am"
    );

    // Each subscription got its thread anchor from the transport receipt.
    let alice = subscription(&h.store, "alice@example.com", "seconduse").await;
    let bob = subscription(&h.store, "bob@example.com", "seconduse").await;
    assert_eq!(alice.message_id.as_deref(), Some("<mock-1@test>"));
    assert_eq!(bob.message_id.as_deref(), Some("<mock-2@test>"));
}

#[tokio::test]
async fn unchanged_pages_send_nothing() {
    let h = harness();
    seed_base(&h.store, "alice@example.com", "seconduse").await;
    h.fetcher.set_page(SECONDUSE_URL, SECONDUSE_JAN1);
    h.fetcher.set_page(BALLARD_URL, BALLARD_XYZ);

    // First run establishes state (and notifies, first observation counts
    // as changed); the second run over identical pages is silent.
    h.runner.run_once().await.unwrap();
    let after_first = h.transport.sent().len();
    assert_eq!(after_first, 1);

    h.runner.run_once().await.unwrap();
    assert_eq!(h.transport.sent().len(), after_first);
}

#[tokio::test]
async fn listing_update_notifies_and_overwrites_sequence() {
    let h = harness();
    seed_provider_state(
        &h.store,
        "ballardreuse",
        json!({"productLinks": [
            "https://ballardreuse.com/product/x",
            "https://ballardreuse.com/product/y",
            "https://ballardreuse.com/product/z",
        ]}),
    )
    .await;
    seed_base(&h.store, "dana@example.com", "ballardreuse").await;
    h.fetcher.set_page(SECONDUSE_URL, SECONDUSE_JAN1);
    h.fetcher.set_page(BALLARD_URL, BALLARD_WXY);

    h.runner.run_once().await.unwrap();

    let sent = h.transport.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "dana@example.com");
    assert!(sent[0].text.contains("product/w"));

    assert_eq!(
        provider_state(&h.store, "ballardreuse")
            .await
            .product_links
            .unwrap(),
        vec![
            "https://ballardreuse.com/product/w",
            "https://ballardreuse.com/product/x",
            "https://ballardreuse.com/product/y",
        ]
    );
}

#[tokio::test]
async fn one_failing_subscriber_does_not_block_the_rest() {
    let h = harness();
    seed_provider_state(&h.store, "seconduse", json!({"updatedMsg": "Jan 1"})).await;
    seed_base(&h.store, "alice@example.com", "seconduse").await;
    seed_base(&h.store, "bob@example.com", "seconduse").await;
    h.fetcher.set_page(SECONDUSE_URL, SECONDUSE_JAN2);
    h.fetcher.set_page(BALLARD_URL, BALLARD_XYZ);
    h.transport.fail_for("alice@example.com");

    // No error propagates out of the run.
    h.runner.run_once().await.unwrap();

    let sent = h.transport.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "bob@example.com");

    // The bounced subscriber has no thread anchor; the delivered one does.
    let alice = subscription(&h.store, "alice@example.com", "seconduse").await;
    let bob = subscription(&h.store, "bob@example.com", "seconduse").await;
    assert_eq!(alice.message_id, None);
    assert!(bob.message_id.is_some());
}

#[tokio::test]
async fn one_unreachable_provider_does_not_block_the_next() {
    let h = harness();
    seed_provider_state(
        &h.store,
        "ballardreuse",
        json!({"productLinks": ["https://ballardreuse.com/product/x"]}),
    )
    .await;
    seed_base(&h.store, "dana@example.com", "ballardreuse").await;
    // seconduse has no page: fetch fails with a network error.
    h.fetcher.set_page(BALLARD_URL, BALLARD_WXY);

    h.runner.run_once().await.unwrap();

    let sent = h.transport.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "dana@example.com");
}

#[tokio::test]
async fn broken_page_layout_preserves_prior_state() {
    let h = harness();
    seed_provider_state(&h.store, "seconduse", json!({"updatedMsg": "Jan 1"})).await;
    seed_base(&h.store, "alice@example.com", "seconduse").await;
    // Page lost its timestamp block: extraction fails, provider skipped.
    h.fetcher
        .set_page(SECONDUSE_URL, "<html><body><p>maintenance</p></body></html>");
    h.fetcher.set_page(BALLARD_URL, BALLARD_XYZ);

    h.runner.run_once().await.unwrap();

    assert!(h.transport.sent().is_empty());
    assert_eq!(
        provider_state(&h.store, "seconduse").await.updated_msg.unwrap(),
        "Jan 1"
    );
}
