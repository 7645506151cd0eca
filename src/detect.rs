//! Change detection against persisted provider state.
//!
//! The verdict and the state write happen inside one store transaction, so
//! two overlapping runs cannot both decide "changed" off the same stale
//! baseline. State always tracks the latest observation; whether that
//! observation also notifies is a separate predicate per strategy.

use serde_json::to_value;

use crate::error::Result;
use crate::extract::Observation;
use crate::registry::Provider;
use crate::store::{decode_or_default, DocKey, DocumentStore, Mutation, ProviderState};

/// Compare a fresh observation against the provider's stored state, persist
/// the new state when it differs, and report whether an update occurred.
///
/// An absent (or undecodable) stored document always reads as changed.
pub async fn detect(
    store: &dyn DocumentStore,
    provider: &Provider,
    obs: &Observation,
) -> Result<bool> {
    let key = DocKey::provider_state(provider.key);
    let mut changed = false;

    store
        .transact(
            &key,
            Box::new(|cur| {
                let state: ProviderState = decode_or_default(cur);
                match obs {
                    Observation::Marker(fresh) => {
                        changed = state.updated_msg.as_deref() != Some(fresh.as_str());
                        if !changed {
                            return Mutation::Keep;
                        }
                        write(ProviderState {
                            updated_msg: Some(fresh.clone()),
                            ..state
                        })
                    }
                    Observation::Links(fresh) => {
                        changed = match (&state.product_links, fresh.first()) {
                            (None, _) => true,
                            (Some(_), None) => false,
                            (Some(prev), Some(first)) => !prev.contains(first),
                        };
                        if state.product_links.as_deref() == Some(fresh.as_slice()) {
                            return Mutation::Keep;
                        }
                        write(ProviderState {
                            product_links: Some(fresh.clone()),
                            ..state
                        })
                    }
                }
            }),
        )
        .await?;

    Ok(changed)
}

fn write(next: ProviderState) -> Mutation {
    match to_value(&next) {
        Ok(v) => Mutation::Write(v),
        Err(_) => Mutation::Keep,
    }
}
