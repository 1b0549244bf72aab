//! Markup queries used by the discovery and extraction phases
//!
//! HTML parsing itself is delegated to `scraper`; this module only compiles
//! the configured selectors once and provides the handful of queries the
//! pipeline relies on: select by tag/class, first child anchor, attribute
//! lookup and trimmed text content.

use scraper::{ElementRef, Selector};

use crate::config::SelectorConfig;
use crate::error::{Error, Result};

/// Compiled form of [`SelectorConfig`]
#[derive(Debug, Clone)]
pub struct Selectors {
    /// Any anchor element
    pub anchor: Selector,
    /// Pagination control
    pub pager_item: Selector,
    /// General info container on a detail page
    pub info_container: Selector,
    /// Labeled field block
    pub field: Selector,
    /// Label inside a field block
    pub field_label: Selector,
    /// Value inside a field block
    pub field_item: Selector,
    /// Field block that may carry the artifact link
    pub protocol_block: Selector,
    /// Lowercased label marking the artifact block
    pub protocol_label: String,
}

impl Selectors {
    /// Compile every selector, failing on the first invalid one
    pub fn compile(config: &SelectorConfig) -> Result<Self> {
        Ok(Self {
            anchor: selector("a", "anchor")?,
            pager_item: selector(&config.pager_item, "selectors.pager_item")?,
            info_container: selector(&config.info_container, "selectors.info_container")?,
            field: selector(&config.field, "selectors.field")?,
            field_label: selector(&config.field_label, "selectors.field_label")?,
            field_item: selector(&config.field_item, "selectors.field_item")?,
            protocol_block: selector(&config.protocol_block, "selectors.protocol_block")?,
            protocol_label: config.protocol_label.trim().to_lowercase(),
        })
    }
}

fn selector(css: &str, key: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| Error::Config {
        message: format!("invalid selector `{css}`: {e}"),
        key: Some(key.to_string()),
    })
}

/// Concatenated text of an element and its descendants, trimmed
pub fn text_content(element: &ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// `href` of the first anchor inside `element`, if it has one
pub fn first_anchor_href<'a>(element: &ElementRef<'a>, anchor: &Selector) -> Option<&'a str> {
    element
        .select(anchor)
        .next()
        .and_then(|a| a.value().attr("href"))
}
