//! HTML fixtures shaped like a Drupal catalog

/// Body bytes served for every artifact
pub const ARTIFACT_BODY: &[u8] = b"%PDF-1.4\n% catalog-harvest test protocol\n";

/// A listing page with the given pager targets and record links
///
/// Navigation links outside the record prefix are always present so link
/// filtering is exercised.
pub fn listing_page(pager: &[&str], studies: &[&str]) -> String {
    let pager: String = pager
        .iter()
        .enumerate()
        .map(|(i, href)| {
            format!(r#"<li class="pager__item"><a href="{href}" title="Go to page {i}">{i}</a></li>"#)
        })
        .collect();
    let rows: String = studies
        .iter()
        .map(|href| {
            format!(
                r#"<div class="views-row"><span class="field-content"><a href="{href}" hreflang="en">{href}</a></span></div>"#
            )
        })
        .collect();

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head><title>Data | Catalog</title></head>
<body>
  <header><a href="/">Home</a><a href="/about">About</a><a href="/data">Data</a></header>
  <div class="view-content">{rows}</div>
  <nav class="pager"><ul class="pager__items js-pager__items">{pager}</ul></nav>
</body>
</html>"#
    )
}

/// A detail page with labeled fields and an optional protocol link
pub fn detail_page(fields: &[(&str, &str)], protocol_href: Option<&str>) -> String {
    let fields: String = fields
        .iter()
        .map(|(label, value)| {
            format!(
                r#"<div class="field field--label-above">
        <div class="field__label">{label}</div>
        <div class="field__item">{value}</div>
      </div>"#
            )
        })
        .collect();
    let protocol = protocol_href
        .map(|href| {
            format!(
                r#"<div class="field field--name-field-clintri-protocol field--label-above">
        <div class="field__label">Protocol</div>
        <div class="field__item"><span class="file"><a href="{href}" type="application/pdf">protocol.pdf</a></span></div>
      </div>"#
            )
        })
        .unwrap_or_default();

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<body>
  <div class="layout--twocol">
    <div class="group-left">
      {fields}
      {protocol}
    </div>
    <div class="group-right"><div class="field"><div class="field__label">Sidebar</div><div class="field__item">ignored</div></div></div>
  </div>
</body>
</html>"#
    )
}
