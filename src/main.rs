//! Inventory Watcher binary entrypoint.
//! Wires the store, SMTP transport, and fetcher into the watch runner, then
//! either runs once (`--once`) or loops on the configured interval.

use std::sync::Arc;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use inventory_watcher::config::WatchConfig;
use inventory_watcher::fetch::{HttpFetcher, PageFetcher};
use inventory_watcher::notify::{MailTransport, SmtpMailer};
use inventory_watcher::registry::registry;
use inventory_watcher::runner::WatchRunner;
use inventory_watcher::scheduler;
use inventory_watcher::store::{DocumentStore, JsonFileStore};
use inventory_watcher::subscribers::seed_subscriptions;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("inventory_watcher=info,warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();
    init_tracing();

    let config = WatchConfig::from_env()?;

    let store: Arc<dyn DocumentStore> = Arc::new(JsonFileStore::new(&config.state_dir));
    let transport: Arc<dyn MailTransport> = Arc::new(SmtpMailer::new(&config)?);
    let fetcher: Arc<dyn PageFetcher> = Arc::new(HttpFetcher::new());
    let providers = registry();

    let created = seed_subscriptions(store.as_ref(), &providers, &config.recipients).await?;
    if created > 0 {
        info!(created, "seeded subscriptions from WATCH_RECIPIENTS");
    }

    let runner = Arc::new(WatchRunner::new(
        providers,
        fetcher,
        store,
        transport,
        config.thread_ref.clone(),
    ));

    // Manual trigger path; the scheduler path below is the default.
    if std::env::args().any(|a| a == "--once") {
        runner.run_once().await?;
        return Ok(());
    }

    info!(interval_secs = config.interval_secs, "starting watch loop");
    scheduler::spawn(runner, config.interval_secs).await?;
    Ok(())
}
