//! Record extraction from detail pages
//!
//! A detail page carries its metadata as labeled field blocks inside a "general
//! info" container. Every block with both a label and a value becomes one
//! record field, keyed by the normalized label. Separately, the first
//! protocol-typed block labeled "Protocol" contributes the artifact link.
//!
//! Missing pieces are never fatal: a page without the info container yields a
//! record carrying only its source URL (protocol blocks elsewhere on such a
//! page are ignored), and a page without a protocol block simply has no
//! artifact reference.

use scraper::{ElementRef, Html};
use url::Url;

use crate::error::Result;
use crate::http::HttpClient;
use crate::markup::{Selectors, first_anchor_href, text_content};
use crate::types::{ARTIFACT_URL_KEY, Record};

/// Fetch a detail page and convert it into a [`Record`]
///
/// # Errors
///
/// Returns [`Error::Fetch`](crate::Error::Fetch) if the page cannot be retrieved.
pub async fn extract_record(
    client: &HttpClient,
    selectors: &Selectors,
    page_url: &str,
) -> Result<Record> {
    let html = client.get_text(page_url).await?;
    let record = parse_record(&html, selectors, page_url);
    tracing::debug!(url = %page_url, fields = record.len(), "extracted record");
    Ok(record)
}

/// Build a record from an already-fetched detail page
pub fn parse_record(html: &str, selectors: &Selectors, page_url: &str) -> Record {
    let document = Html::parse_document(html);
    let mut record = Record::new(page_url);

    match document.select(&selectors.info_container).next() {
        Some(container) => {
            for field in container.select(&selectors.field) {
                if let Some((label, value)) = labeled_value(&field, selectors) {
                    record.insert(label, value);
                }
            }
        }
        None => {
            tracing::warn!(url = %page_url, "detail page has no info container");
            return record;
        }
    }

    if let Some(href) = protocol_href(&document, selectors) {
        record.insert(ARTIFACT_URL_KEY, resolve(page_url, href));
    }

    record
}

/// Lowercase and trim a field label into a record key
pub fn normalize_label(label: &str) -> String {
    label.trim().to_lowercase()
}

fn labeled_value(field: &ElementRef<'_>, selectors: &Selectors) -> Option<(String, String)> {
    let label = field.select(&selectors.field_label).next()?;
    let label = normalize_label(&text_content(&label));
    if label.is_empty() {
        return None;
    }
    let value = field.select(&selectors.field_item).next()?;
    Some((label, text_content(&value)))
}

fn protocol_href<'a>(document: &'a Html, selectors: &Selectors) -> Option<&'a str> {
    document
        .select(&selectors.protocol_block)
        .filter(|block| {
            block
                .select(&selectors.field_label)
                .next()
                .is_some_and(|label| normalize_label(&text_content(&label)) == selectors.protocol_label)
        })
        .find_map(|block| first_anchor_href(&block, &selectors.anchor))
}

fn resolve(page_url: &str, href: &str) -> String {
    match Url::parse(page_url).and_then(|base| base.join(href)) {
        Ok(url) => url.to_string(),
        Err(e) => {
            tracing::debug!(href = %href, error = %e, "keeping unresolvable artifact link as-is");
            href.to_string()
        }
    }
}
