//! Static provider registry.
//!
//! Each watched site gets one descriptor: where to fetch, how to tell
//! whether its inventory changed, and how its update emails read. Strategies
//! are a closed set selected per provider; see [`Strategy`].

use crate::error::Result;
use crate::extract::{self, Observation};

/// How a provider signals "new inventory", and where on the page to look.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// The page carries a human-readable "last updated" marker; any exact
    /// text change means new inventory.
    Timestamp { selector: &'static str },
    /// The page lists items newest-first; a first-position link we have not
    /// seen before means new inventory.
    Listing { selector: &'static str },
}

impl Strategy {
    /// Extract this strategy's observation from a fetched page body.
    /// Synchronous: the parsed tree never crosses an await point.
    pub fn observe(&self, body: &str) -> Result<Observation> {
        match *self {
            Strategy::Timestamp { selector } => {
                extract::marker(body, selector).map(Observation::Marker)
            }
            Strategy::Listing { selector } => {
                extract::links(body, selector).map(Observation::Links)
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Provider {
    pub key: &'static str,
    pub label: &'static str,
    pub url: &'static str,
    pub strategy: Strategy,
}

/// All watched providers, in processing order.
pub fn registry() -> Vec<Provider> {
    vec![
        Provider {
            key: "seconduse",
            label: "Second Use",
            url: "https://www.seconduse.com/inventory/",
            strategy: Strategy::Timestamp {
                selector: ".timestamp > p",
            },
        },
        Provider {
            key: "ballardreuse",
            label: "Ballard Reuse",
            url: "https://ballardreuse.com/shop/",
            strategy: Strategy::Listing {
                selector: "ul.products li.product .product-images a",
            },
        },
    ]
}
