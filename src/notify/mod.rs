//! Update notification: per-provider email composition, the outbound mail
//! capability, and the per-subscriber dispatch with isolated failures.

use std::sync::Arc;

use async_trait::async_trait;
use metrics::counter;
use tracing::{debug, warn};

use crate::error::Result;
use crate::extract::Observation;
use crate::registry::Provider;
use crate::store::{decode_or_default, DocKey, DocumentStore, Mutation, SubscriptionRecord};
use crate::subscribers::subscription_id;

mod email;

pub use email::SmtpMailer;

/// One outbound update email, transport-agnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub text: String,
    pub html: String,
    /// Message id of the conversation to thread onto, if any.
    pub thread_ref: Option<String>,
}

/// What the transport reports back after a successful send.
#[derive(Debug, Clone)]
pub struct SentReceipt {
    pub message_id: String,
}

#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, email: &OutgoingEmail) -> Result<SentReceipt>;
}

/// Build the provider-specific update email. Timestamp providers interpolate
/// the fresh marker into the body; listing providers point at the newest
/// item.
pub fn compose(
    provider: &Provider,
    to: &str,
    obs: &Observation,
    thread_ref: Option<String>,
) -> OutgoingEmail {
    let subject = format!("There is new inventory at {}", provider.label);
    let (text, html) = match obs {
        Observation::Marker(marker) => (
            format!("{} {} {}", provider.label, marker, provider.url),
            format!("<b>{} {} {}</b>", provider.label, marker, provider.url),
        ),
        Observation::Links(_) => {
            let newest = obs.newest_link().unwrap_or(provider.url);
            (
                format!(
                    "{} has new items: {}\n{}",
                    provider.label, newest, provider.url
                ),
                format!(
                    "<b>{} has new items:</b> <a href=\"{newest}\">{newest}</a>",
                    provider.label
                ),
            )
        }
    };
    OutgoingEmail {
        to: to.to_string(),
        subject,
        text,
        html,
        thread_ref,
    }
}

/// Sends update emails and keeps each subscription threaded onto a single
/// conversation. Failures never propagate to the caller: one subscriber's
/// bad day must not block the rest.
pub struct Notifier {
    store: Arc<dyn DocumentStore>,
    transport: Arc<dyn MailTransport>,
    fixed_thread_ref: Option<String>,
}

impl Notifier {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        transport: Arc<dyn MailTransport>,
        fixed_thread_ref: Option<String>,
    ) -> Self {
        Self {
            store,
            transport,
            fixed_thread_ref,
        }
    }

    /// Notify one subscriber about one provider's update. Best-effort.
    pub async fn notify(&self, provider: &Provider, user: &str, obs: &Observation) {
        match self.send_update(provider, user, obs).await {
            Ok(()) => debug!(provider = provider.key, user, "update email sent"),
            Err(e) => {
                counter!("watch_notify_errors_total").increment(1);
                warn!(provider = provider.key, user, error = %e, "notification failed");
            }
        }
    }

    async fn send_update(&self, provider: &Provider, user: &str, obs: &Observation) -> Result<()> {
        let key = DocKey::subscription(subscription_id(user, provider.key));
        let record: SubscriptionRecord = decode_or_default(self.store.get(&key).await?.as_ref());

        let had_anchor = record.message_id.is_some();
        let thread_ref = record.message_id.or_else(|| self.fixed_thread_ref.clone());

        let email = compose(provider, user, obs, thread_ref);
        let receipt = self.transport.send(&email).await?;
        counter!("watch_emails_sent_total").increment(1);

        if !had_anchor {
            // First send for this subscription anchors the thread, unless a
            // concurrent run committed an anchor between our read and now.
            self.store
                .transact(
                    &key,
                    Box::new(|cur| {
                        let mut rec: SubscriptionRecord = decode_or_default(cur);
                        if rec.message_id.is_some() {
                            return Mutation::Keep;
                        }
                        rec.message_id = Some(receipt.message_id.clone());
                        match serde_json::to_value(&rec) {
                            Ok(v) => Mutation::Write(v),
                            Err(_) => Mutation::Keep,
                        }
                    }),
                )
                .await?;
        }

        Ok(())
    }
}
