//! CSS-selector extraction of provider observations from fetched pages.
//!
//! Extraction that matches nothing is reported as [`WatchError::EmptyExtraction`]
//! rather than as an empty value, so a broken page layout skips the provider
//! instead of erasing its stored state.

use scraper::{Html, Selector};

use crate::error::{Result, WatchError};

/// The strategy-shaped value pulled out of a fresh page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Observation {
    /// Last-update marker text.
    Marker(String),
    /// Item links in document order, newest first.
    Links(Vec<String>),
}

impl Observation {
    /// The newest item link, when this observation carries links.
    pub fn newest_link(&self) -> Option<&str> {
        match self {
            Observation::Marker(_) => None,
            Observation::Links(links) => links.first().map(String::as_str),
        }
    }
}

// Provider selectors are compile-time constants; validity is pinned by the
// registry tests.
fn compiled(selector: &'static str) -> Selector {
    Selector::parse(selector).expect("provider selector")
}

/// Text of the first node matching `selector`, whitespace-trimmed.
pub fn marker(body: &str, selector: &'static str) -> Result<String> {
    let doc = Html::parse_document(body);
    let text = doc
        .select(&compiled(selector))
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .unwrap_or_default();
    if text.is_empty() {
        return Err(WatchError::EmptyExtraction { selector });
    }
    Ok(text)
}

/// `href` of every anchor matching `selector`, in document order.
pub fn links(body: &str, selector: &'static str) -> Result<Vec<String>> {
    let doc = Html::parse_document(body);
    let links: Vec<String> = doc
        .select(&compiled(selector))
        .filter_map(|a| a.value().attr("href"))
        .map(str::to_string)
        .collect();
    if links.is_empty() {
        return Err(WatchError::EmptyExtraction { selector });
    }
    Ok(links)
}
