//! Error types for the watch engine.

use thiserror::Error;

use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum WatchError {
    /// Page unreachable or non-2xx status. Fatal to that provider's
    /// iteration for the current run; the run continues.
    #[error("fetching {url}: {reason}")]
    Network { url: String, reason: String },

    /// A provider selector matched nothing (or only empty text). Treated as
    /// a scraping failure rather than "the page is now empty", so prior
    /// state is preserved.
    #[error("selector {selector:?} yielded no content")]
    EmptyExtraction { selector: &'static str },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("invalid mail address {addr:?}: {source}")]
    Address {
        addr: String,
        #[source]
        source: lettre::address::AddressError,
    },

    #[error("building email: {0}")]
    Compose(#[from] lettre::error::Error),

    /// Auth or delivery failure in the mail transport. Caught per
    /// subscriber; never aborts the run.
    #[error("mail transport: {reason}")]
    Transport { reason: String },
}

pub type Result<T> = std::result::Result<T, WatchError>;
