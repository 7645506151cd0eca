//! Subscription records: resolution into per-provider recipient lists, plus
//! startup seeding from the configured recipient list.
//!
//! Records live in the `subscriptions` collection under the composite id
//! `"<user>__<provider>"`; the provider key is recovered from the id.

use std::collections::HashMap;

use tracing::warn;

use crate::error::Result;
use crate::registry::Provider;
use crate::store::{
    decode_or_default, encode, DocKey, DocumentStore, Mutation, SubscriptionRecord, SUBSCRIPTIONS,
};

pub fn subscription_id(user: &str, provider: &str) -> String {
    format!("{user}__{provider}")
}

/// Split a record id back into `(user, provider)`. Provider keys never
/// contain `"__"`, so the last occurrence is the separator even when the
/// user identity contains one.
pub fn split_subscription_id(id: &str) -> Option<(&str, &str)> {
    id.rsplit_once("__")
}

/// Scan every subscription record and group opted-in users by provider.
/// Records without `base = true` are discarded; scan order (id order) is
/// preserved within each group. Read-only.
pub async fn resolve_subscribers(
    store: &dyn DocumentStore,
) -> Result<HashMap<String, Vec<String>>> {
    let mut groups: HashMap<String, Vec<String>> = HashMap::new();

    for (id, value) in store.list(SUBSCRIPTIONS).await? {
        let record: SubscriptionRecord = decode_or_default(Some(&value));
        if !record.base {
            continue;
        }
        let Some((user, provider)) = split_subscription_id(&id) else {
            warn!(id = %id, "subscription id missing provider part, skipping");
            continue;
        };
        groups
            .entry(provider.to_string())
            .or_default()
            .push(user.to_string());
    }

    Ok(groups)
}

/// Create `base = true` records for every (recipient, provider) pair that
/// does not already have one. Existing records are never touched, so a
/// previously stored thread anchor or opt-out survives restarts.
pub async fn seed_subscriptions(
    store: &dyn DocumentStore,
    providers: &[Provider],
    recipients: &[String],
) -> Result<usize> {
    let mut created = 0;

    for provider in providers {
        for user in recipients {
            let key = DocKey::subscription(subscription_id(user, provider.key));
            let seeded = encode(
                &key,
                &SubscriptionRecord {
                    base: true,
                    message_id: None,
                },
            )?;
            let wrote = store
                .transact(
                    &key,
                    Box::new(|cur| {
                        if cur.is_some() {
                            Mutation::Keep
                        } else {
                            Mutation::Write(seeded.clone())
                        }
                    }),
                )
                .await?;
            if wrote {
                created += 1;
            }
        }
    }

    Ok(created)
}
