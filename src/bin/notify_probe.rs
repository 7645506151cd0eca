//! One-shot transport smoke test: sends a probe email to the first
//! configured recipient through the real SMTP transport.

use anyhow::Context;
use inventory_watcher::config::WatchConfig;
use inventory_watcher::notify::{MailTransport, OutgoingEmail, SmtpMailer};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt().with_target(false).init();

    let config = WatchConfig::from_env()?;
    let mailer = SmtpMailer::new(&config)?;
    let to = config
        .recipients
        .first()
        .cloned()
        .context("WATCH_RECIPIENTS is empty")?;

    let email = OutgoingEmail {
        to,
        subject: "inventory-watcher probe".into(),
        text: "Probe email from inventory-watcher.".into(),
        html: "<b>Probe email from inventory-watcher.</b>".into(),
        thread_ref: config.thread_ref.clone(),
    };

    let receipt = mailer.send(&email).await?;
    println!("sent probe, message id {}", receipt.message_id);
    Ok(())
}
