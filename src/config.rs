//! Environment-provided configuration. `.env` is loaded by the binary
//! before this runs; in production the variables come from the deployment
//! environment.

use std::path::PathBuf;

use anyhow::{Context, Result};

#[derive(Debug, Clone)]
pub struct WatchConfig {
    pub smtp_host: String,
    pub smtp_user: String,
    pub smtp_pass: String,
    /// Sender mailbox, display name allowed: `Inventory Watcher <bot@x.com>`.
    pub from_addr: String,
    /// Comma-separated seed recipients; subscriptions are created for each
    /// at startup where none exist yet.
    pub recipients: Vec<String>,
    /// Optional fixed thread anchor for single-provider deployments where
    /// the conversation predates the store.
    pub thread_ref: Option<String>,
    pub interval_secs: u64,
    pub state_dir: PathBuf,
}

impl WatchConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            smtp_host: std::env::var("SMTP_HOST").context("SMTP_HOST missing")?,
            smtp_user: std::env::var("SMTP_USER").context("SMTP_USER missing")?,
            smtp_pass: std::env::var("SMTP_PASS").context("SMTP_PASS missing")?,
            from_addr: std::env::var("WATCH_EMAIL_FROM").context("WATCH_EMAIL_FROM missing")?,
            recipients: std::env::var("WATCH_RECIPIENTS")
                .map(|s| split_recipients(&s))
                .unwrap_or_default(),
            thread_ref: std::env::var("WATCH_THREAD_REF")
                .ok()
                .filter(|s| !s.trim().is_empty()),
            interval_secs: std::env::var("CHECK_INTERVAL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(900),
            state_dir: std::env::var("WATCH_STATE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("state")),
        })
    }
}

pub fn split_recipients(s: &str) -> Vec<String> {
    s.split(',')
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(str::to_string)
        .collect()
}
