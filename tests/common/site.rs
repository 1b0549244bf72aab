//! Mock catalog site served by wiremock

use catalog_harvest::Config;
use std::path::Path;
use std::time::Duration;
use wiremock::matchers::{method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::fixtures::{ARTIFACT_BODY, detail_page, listing_page};

/// A catalog served from a local mock server
pub struct MockCatalog {
    /// The underlying server, for extra mocks and request inspection
    pub server: MockServer,
}

impl MockCatalog {
    /// Start an empty catalog
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    /// Absolute URL of a path on this catalog
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.server.uri())
    }

    /// Crawler configuration pointed at this catalog, writing under `dir`
    pub fn config(&self, dir: &Path) -> Config {
        let mut config = Config::default();
        config.site.root_url = self.server.uri();
        config.data_dir = dir.join("data");
        config.output_path = dir.join("studies.json");
        config.http.request_timeout = Duration::from_secs(5);
        config
    }

    /// Serve the root listing page (`/data` without a page parameter)
    pub async fn root(&self, pager: &[&str], studies: &[&str]) {
        Mock::given(method("GET"))
            .and(path("/data"))
            .and(query_param_is_missing("page"))
            .respond_with(html(listing_page(pager, studies)))
            .mount(&self.server)
            .await;
    }

    /// Serve `/data?page={page}`
    pub async fn listing(&self, page: u32, studies: &[&str]) {
        Mock::given(method("GET"))
            .and(path("/data"))
            .and(query_param("page", page.to_string()))
            .respond_with(html(listing_page(&[], studies)))
            .mount(&self.server)
            .await;
    }

    /// Answer `/data?page={page}` with a bare status code
    pub async fn fail_listing(&self, page: u32, status: u16) {
        Mock::given(method("GET"))
            .and(path("/data"))
            .and(query_param("page", page.to_string()))
            .respond_with(ResponseTemplate::new(status))
            .mount(&self.server)
            .await;
    }

    /// Serve a detail page at `at`
    pub async fn study(&self, at: &str, fields: &[(&str, &str)], protocol_href: Option<&str>) {
        self.respond(at, html(detail_page(fields, protocol_href)))
            .await;
    }

    /// Serve an artifact at `at`
    pub async fn artifact(&self, at: &str) {
        self.respond(
            at,
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/pdf")
                .set_body_bytes(ARTIFACT_BODY.to_vec()),
        )
        .await;
    }

    /// Answer `at` with a bare status code
    pub async fn fail(&self, at: &str, status: u16) {
        self.respond(at, ResponseTemplate::new(status)).await;
    }

    async fn respond(&self, at: &str, response: ResponseTemplate) {
        Mock::given(method("GET"))
            .and(path(at))
            .respond_with(response)
            .mount(&self.server)
            .await;
    }
}

fn html(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("content-type", "text/html; charset=utf-8")
        .set_body_string(body)
}
