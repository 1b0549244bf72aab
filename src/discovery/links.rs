//! Link collector

use scraper::Html;
use url::Url;

use crate::error::Result;
use crate::http::HttpClient;
use crate::markup::Selectors;
use crate::types::RecordLink;

/// Fetch one page and return every anchor target accepted by `predicate`,
/// resolved against `site_root`, in document order.
///
/// The predicate sees the raw `href` attribute. Anchors without an `href`, or
/// whose target cannot be resolved, are skipped.
///
/// # Errors
///
/// Returns [`Error::Fetch`](crate::Error::Fetch) if the page cannot be retrieved.
pub async fn collect_links<P>(
    client: &HttpClient,
    selectors: &Selectors,
    page_url: &str,
    site_root: &Url,
    predicate: P,
) -> Result<Vec<RecordLink>>
where
    P: Fn(&str) -> bool,
{
    let html = client.get_text(page_url).await?;
    let links = matching_links(&html, selectors, site_root, predicate);
    tracing::debug!(page = %page_url, links = links.len(), "collected links");
    Ok(links)
}

/// Predicate accepting hrefs that start with `prefix`, e.g. `/study`
pub fn has_path_prefix(prefix: &str) -> impl Fn(&str) -> bool + Clone + '_ {
    move |href: &str| href.starts_with(prefix)
}

pub(crate) fn matching_links<P>(
    html: &str,
    selectors: &Selectors,
    site_root: &Url,
    predicate: P,
) -> Vec<RecordLink>
where
    P: Fn(&str) -> bool,
{
    let document = Html::parse_document(html);
    document
        .select(&selectors.anchor)
        .filter_map(|a| a.value().attr("href"))
        .filter(|&href| predicate(href))
        .filter_map(|href| match site_root.join(href) {
            Ok(url) => Some(url.to_string()),
            Err(e) => {
                tracing::debug!(href = %href, error = %e, "skipping unresolvable link");
                None
            }
        })
        .collect()
}
