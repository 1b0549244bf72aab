//! Pagination walker

use std::collections::HashSet;

use scraper::Html;
use url::Url;

use crate::error::Result;
use crate::http::HttpClient;
use crate::markup::{Selectors, first_anchor_href};

/// Fetch the root listing page and return the listing pages its pager links to.
///
/// Each pager item's first anchor is resolved against `listing_url`, so a
/// relative target like `?page=3` becomes `<listing_url>?page=3`. The root page
/// is not part of the result unless its own pager links to it. Duplicate
/// targets (e.g. "next" and "2" pointing at the same page) are kept once, at
/// their first position.
///
/// A page without pager items yields an empty list.
///
/// # Errors
///
/// Returns [`Error::Fetch`](crate::Error::Fetch) if the root page cannot be retrieved.
pub async fn discover_listing_pages(
    client: &HttpClient,
    selectors: &Selectors,
    listing_url: &Url,
) -> Result<Vec<String>> {
    let html = client.get_text(listing_url.as_str()).await?;
    let pages = pager_targets(&html, selectors, listing_url);
    tracing::info!(root = %listing_url, pages = pages.len(), "discovered listing pages");
    Ok(pages)
}

pub(crate) fn pager_targets(html: &str, selectors: &Selectors, listing_url: &Url) -> Vec<String> {
    let document = Html::parse_document(html);
    let mut seen = HashSet::new();
    let mut pages = Vec::new();

    for item in document.select(&selectors.pager_item) {
        let Some(href) = first_anchor_href(&item, &selectors.anchor) else {
            continue;
        };
        match listing_url.join(href) {
            Ok(target) => {
                let target = target.to_string();
                if seen.insert(target.clone()) {
                    pages.push(target);
                }
            }
            Err(e) => {
                tracing::debug!(href = %href, error = %e, "skipping unresolvable pager link");
            }
        }
    }
    pages
}
