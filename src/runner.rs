//! The run orchestrator: one pass over every registered provider.
//!
//! All state transitions are transactional, so overlapping runs launched by
//! an at-least-once scheduler are safe; at worst a losing run's verdict is
//! dropped, never duplicated.

use std::collections::HashMap;
use std::sync::Arc;

use metrics::{counter, describe_counter};
use once_cell::sync::OnceCell;
use tracing::{info, warn};

use crate::detect::detect;
use crate::error::Result;
use crate::fetch::PageFetcher;
use crate::notify::{MailTransport, Notifier};
use crate::registry::Provider;
use crate::store::DocumentStore;
use crate::subscribers::resolve_subscribers;

/// One-time metrics registration.
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("watch_runs_total", "Completed watch runs.");
        describe_counter!("watch_updates_total", "Provider checks that detected an update.");
        describe_counter!(
            "watch_provider_errors_total",
            "Provider iterations aborted by fetch/extract/store errors."
        );
        describe_counter!("watch_emails_sent_total", "Update emails handed to the transport.");
        describe_counter!(
            "watch_notify_errors_total",
            "Per-subscriber notification failures (isolated, run continues)."
        );
    });
}

struct ProviderOutcome {
    changed: bool,
    recipients: usize,
}

pub struct WatchRunner {
    providers: Vec<Provider>,
    fetcher: Arc<dyn PageFetcher>,
    store: Arc<dyn DocumentStore>,
    notifier: Notifier,
}

impl WatchRunner {
    pub fn new(
        providers: Vec<Provider>,
        fetcher: Arc<dyn PageFetcher>,
        store: Arc<dyn DocumentStore>,
        transport: Arc<dyn MailTransport>,
        fixed_thread_ref: Option<String>,
    ) -> Self {
        let notifier = Notifier::new(store.clone(), transport, fixed_thread_ref);
        Self {
            providers,
            fetcher,
            store,
            notifier,
        }
    }

    /// One watch pass: resolve subscribers once, then check every provider
    /// in registry order. A provider's failure is logged and the pass moves
    /// on to the next provider.
    pub async fn run_once(&self) -> Result<()> {
        ensure_metrics_described();
        counter!("watch_runs_total").increment(1);

        let groups = resolve_subscribers(self.store.as_ref()).await?;

        for provider in &self.providers {
            match self.check_provider(provider, &groups).await {
                Ok(outcome) => info!(
                    provider = provider.key,
                    changed = outcome.changed,
                    recipients = outcome.recipients,
                    "provider checked"
                ),
                Err(e) => {
                    counter!("watch_provider_errors_total").increment(1);
                    warn!(provider = provider.key, error = %e, "provider check failed");
                }
            }
        }

        Ok(())
    }

    async fn check_provider(
        &self,
        provider: &Provider,
        groups: &HashMap<String, Vec<String>>,
    ) -> Result<ProviderOutcome> {
        let body = self.fetcher.fetch(provider.url).await?;
        let obs = provider.strategy.observe(&body)?;
        let changed = detect(self.store.as_ref(), provider, &obs).await?;

        if !changed {
            return Ok(ProviderOutcome {
                changed: false,
                recipients: 0,
            });
        }

        counter!("watch_updates_total").increment(1);
        let users = groups
            .get(provider.key)
            .map(Vec::as_slice)
            .unwrap_or_default();
        for user in users {
            // notify() isolates its own failures.
            self.notifier.notify(provider, user, &obs).await;
        }

        Ok(ProviderOutcome {
            changed: true,
            recipients: users.len(),
        })
    }
}
