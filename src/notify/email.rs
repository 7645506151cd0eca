//! SMTP transport backed by lettre.
//!
//! SMTP does not echo back a message identifier, so the mailer generates one
//! client-side, stamps it as `Message-ID`, and returns it in the receipt;
//! that id is what later sends thread onto via `In-Reply-To`/`References`.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use lettre::message::{Mailbox, Message, MultiPart};
use lettre::transport::smtp::{authentication::Credentials, AsyncSmtpTransport};
use lettre::{AsyncTransport, Tokio1Executor};

use super::{MailTransport, OutgoingEmail, SentReceipt};
use crate::config::WatchConfig;
use crate::error::{Result, WatchError};

pub struct SmtpMailer {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    seq: AtomicU64,
}

impl SmtpMailer {
    pub fn new(config: &WatchConfig) -> Result<Self> {
        let from: Mailbox = config
            .from_addr
            .parse()
            .map_err(|source| WatchError::Address {
                addr: config.from_addr.clone(),
                source,
            })?;

        let creds = Credentials::new(config.smtp_user.clone(), config.smtp_pass.clone());
        let mailer = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_host)
            .map_err(|e| WatchError::Transport {
                reason: e.to_string(),
            })?
            .credentials(creds)
            .build();

        Ok(Self {
            mailer,
            from,
            seq: AtomicU64::new(0),
        })
    }

    fn next_message_id(&self) -> String {
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        format!(
            "<{}.{}.watch@{}>",
            Utc::now().timestamp_millis(),
            seq,
            self.from.email.domain()
        )
    }
}

#[async_trait]
impl MailTransport for SmtpMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<SentReceipt> {
        let to: Mailbox = email.to.parse().map_err(|source| WatchError::Address {
            addr: email.to.clone(),
            source,
        })?;

        let message_id = self.next_message_id();
        let mut builder = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(email.subject.clone())
            .message_id(Some(message_id.clone()));
        if let Some(anchor) = &email.thread_ref {
            builder = builder.in_reply_to(anchor.clone()).references(anchor.clone());
        }

        let msg = builder.multipart(MultiPart::alternative_plain_html(
            email.text.clone(),
            email.html.clone(),
        ))?;

        self.mailer
            .send(msg)
            .await
            .map_err(|e| WatchError::Transport {
                reason: e.to_string(),
            })?;
        Ok(SentReceipt { message_id })
    }
}
