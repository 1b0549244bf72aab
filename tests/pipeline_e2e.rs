//! End-to-end crawl tests against a mock catalog
//!
//! Each test serves a small Drupal-style catalog from wiremock, runs the full
//! pipeline and checks the dataset, the files under the data directory and
//! the written JSON.
//!
//! # Running the tests
//!
//! ```bash
//! cargo test --test pipeline_e2e
//! ```

mod common;

use catalog_harvest::types::{ARTIFACT_URL_KEY, LOCAL_ARTIFACT_KEY, SOURCE_URL_KEY};
use catalog_harvest::{ArtifactFailurePolicy, Crawler, Phase, Record};
use common::{ARTIFACT_BODY, MockCatalog};
use tempfile::TempDir;

/// Two listing pages with three studies each; only study 5 links a protocol
async fn two_page_catalog() -> MockCatalog {
    let catalog = MockCatalog::start().await;
    catalog.root(&["?page=0", "?page=1"], &[]).await;
    catalog
        .listing(0, &["/study/ctn-1", "/study/ctn-2", "/study/ctn-3"])
        .await;
    catalog
        .listing(1, &["/study/ctn-4", "/study/ctn-5", "/study/ctn-6"])
        .await;

    for n in 1..=6 {
        let title = format!("Trial {n}");
        let fields = [("Study Title", title.as_str()), ("Phase", "Phase III")];
        let protocol = (n == 5).then_some("/sites/default/files/CTN-0005_Protocol.pdf");
        catalog
            .study(&format!("/study/ctn-{n}"), &fields, protocol)
            .await;
    }
    catalog
        .artifact("/sites/default/files/CTN-0005_Protocol.pdf")
        .await;
    catalog
}

// ============================================================================
// Full pipeline
// ============================================================================

#[tokio::test]
async fn crawl_collects_every_record_in_discovery_order() {
    let catalog = two_page_catalog().await;
    let dir = TempDir::new().unwrap();

    let report = Crawler::new(catalog.config(dir.path()))
        .unwrap()
        .run()
        .await
        .unwrap();

    assert!(report.is_complete(), "failure: {:?}", report.failure);
    let urls: Vec<&str> = report.dataset.iter().map(Record::source_url).collect();
    let expected: Vec<String> = (1..=6)
        .map(|n| catalog.url(&format!("/study/ctn-{n}")))
        .collect();
    assert_eq!(urls, expected);

    for (i, record) in report.dataset.iter().enumerate() {
        assert_eq!(
            record.get("study title"),
            Some(format!("Trial {}", i + 1).as_str())
        );
        assert_eq!(record.get("phase"), Some("Phase III"));
        assert_eq!(record.get("sidebar"), None, "only the info container is read");
    }

    assert_eq!(report.artifacts_downloaded(), 1);
    let with_protocol = &report.dataset[4];
    assert_eq!(
        with_protocol.artifact_url(),
        Some(
            catalog
                .url("/sites/default/files/CTN-0005_Protocol.pdf")
                .as_str()
        )
    );
    let local = with_protocol.local_artifact_path().unwrap();
    assert_eq!(local.file_name().unwrap(), "CTN-0005_Protocol.pdf");
    assert!(local.starts_with(dir.path().join("data").canonicalize().unwrap()));
    assert_eq!(std::fs::read(local).unwrap(), ARTIFACT_BODY);
}

#[tokio::test]
async fn chunk_size_does_not_change_the_dataset() {
    let catalog = two_page_catalog().await;

    let mut datasets = Vec::new();
    for chunk_size in [1, 4, 20] {
        let dir = TempDir::new().unwrap();
        let mut config = catalog.config(dir.path());
        config.chunk_size = chunk_size;
        config.link_chunk_size = chunk_size;
        let report = Crawler::new(config).unwrap().run().await.unwrap();
        assert!(report.is_complete());

        // Local paths differ per temp dir
        let without_paths: Vec<Vec<(String, String)>> = report
            .dataset
            .iter()
            .map(|r| {
                r.iter()
                    .filter(|(k, _)| *k != LOCAL_ARTIFACT_KEY)
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect()
            })
            .collect();
        datasets.push(without_paths);
    }

    assert_eq!(datasets[0], datasets[1]);
    assert_eq!(datasets[1], datasets[2]);
}

#[tokio::test]
async fn written_dataset_is_an_indented_json_array() {
    let catalog = two_page_catalog().await;
    let dir = TempDir::new().unwrap();
    let crawler = Crawler::new(catalog.config(dir.path())).unwrap();

    let report = crawler.run_and_write().await.unwrap();

    let json = std::fs::read_to_string(dir.path().join("studies.json")).unwrap();
    assert!(json.starts_with("[\n  {\n    \"study_url\": "), "got: {json}");

    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    let array = value.as_array().unwrap();
    assert_eq!(array.len(), report.dataset.len());
    for entry in array {
        let object = entry.as_object().unwrap();
        assert!(object.contains_key(SOURCE_URL_KEY));
        assert!(object.values().all(serde_json::Value::is_string));
    }

    let fifth = array[4].as_object().unwrap();
    assert!(fifth.contains_key(ARTIFACT_URL_KEY));
    assert!(fifth.contains_key(LOCAL_ARTIFACT_KEY));
    assert!(!array[0].as_object().unwrap().contains_key(ARTIFACT_URL_KEY));
}

// ============================================================================
// Failures
// ============================================================================

#[tokio::test]
async fn record_failure_keeps_completed_chunks() {
    let catalog = MockCatalog::start().await;
    let studies = ["/study/a", "/study/b", "/study/c", "/study/d", "/study/e"];
    catalog.root(&[], &studies).await;
    catalog
        .study("/study/a", &[("Title", "A")], Some("/files/a.pdf"))
        .await;
    catalog.study("/study/b", &[("Title", "B")], None).await;
    catalog.fail("/study/c", 500).await;
    catalog.study("/study/d", &[("Title", "D")], None).await;
    catalog.study("/study/e", &[("Title", "E")], None).await;
    catalog.artifact("/files/a.pdf").await;

    let dir = TempDir::new().unwrap();
    let mut config = catalog.config(dir.path());
    config.chunk_size = 2;
    let report = Crawler::new(config).unwrap().run().await.unwrap();

    let urls: Vec<&str> = report.dataset.iter().map(Record::source_url).collect();
    assert_eq!(urls, vec![catalog.url("/study/a"), catalog.url("/study/b")]);

    let failure = report.failure.as_ref().unwrap();
    assert_eq!(failure.phase(), Some(Phase::Records));
    assert_eq!(failure.url(), Some(catalog.url("/study/c").as_str()));

    assert!(dir.path().join("data").join("a.pdf").exists());
}

#[tokio::test]
async fn record_failure_without_partial_results_fails_the_run() {
    let catalog = MockCatalog::start().await;
    catalog.root(&[], &["/study/a", "/study/b"]).await;
    catalog.study("/study/a", &[("Title", "A")], None).await;
    catalog.fail("/study/b", 502).await;

    let dir = TempDir::new().unwrap();
    let mut config = catalog.config(dir.path());
    config.partial_results = false;
    let crawler = Crawler::new(config).unwrap();

    let err = crawler.run_and_write().await.unwrap_err();
    assert_eq!(err.phase(), Some(Phase::Records));
    assert_eq!(err.url(), Some(catalog.url("/study/b").as_str()));
    assert!(err.to_string().contains("502"), "got: {err}");
    assert!(!dir.path().join("studies.json").exists());
}

#[tokio::test]
async fn listing_page_failure_keeps_links_from_earlier_pages() {
    let catalog = MockCatalog::start().await;
    catalog.root(&["?page=0", "?page=1"], &[]).await;
    catalog.listing(0, &["/study/a"]).await;
    catalog.fail_listing(1, 500).await;
    catalog.study("/study/a", &[("Title", "A")], None).await;

    let dir = TempDir::new().unwrap();
    let mut config = catalog.config(dir.path());
    config.link_chunk_size = 1;
    let report = Crawler::new(config).unwrap().run().await.unwrap();

    assert_eq!(report.dataset.len(), 1);
    assert_eq!(report.dataset[0].source_url(), catalog.url("/study/a"));
    let failure = report.failure.unwrap();
    assert_eq!(failure.phase(), Some(Phase::Links));
    assert_eq!(failure.url(), Some(catalog.url("/data?page=1").as_str()));
}

#[tokio::test]
async fn artifact_failures_follow_the_configured_policy() {
    let catalog = MockCatalog::start().await;
    catalog.root(&[], &["/study/a", "/study/b"]).await;
    catalog
        .study("/study/a", &[("Title", "A")], Some("/files/gone.pdf"))
        .await;
    catalog
        .study("/study/b", &[("Title", "B")], Some("/files/b.pdf"))
        .await;
    catalog.fail("/files/gone.pdf", 404).await;
    catalog.artifact("/files/b.pdf").await;

    // Skip: the failure is recorded and the other artifact is still fetched
    let dir = TempDir::new().unwrap();
    let mut config = catalog.config(dir.path());
    config.chunk_size = 1;
    let report = Crawler::new(config).unwrap().run().await.unwrap();
    assert!(report.is_complete());
    assert_eq!(report.artifact_failures.len(), 1);
    assert_eq!(report.artifact_failures[0].record_url, catalog.url("/study/a"));
    assert!(report.dataset[1].local_artifact_path().is_some());

    // Abort: the artifact phase stops at the first failure
    let dir = TempDir::new().unwrap();
    let mut config = catalog.config(dir.path());
    config.chunk_size = 1;
    config.artifact_failure = ArtifactFailurePolicy::Abort;
    let report = Crawler::new(config).unwrap().run().await.unwrap();
    assert_eq!(report.dataset.len(), 2);
    assert_eq!(report.artifacts_downloaded(), 0);
    let failure = report.failure.unwrap();
    assert_eq!(failure.phase(), Some(Phase::Artifacts));
    assert_eq!(failure.url(), Some(catalog.url("/files/gone.pdf").as_str()));
    assert!(!dir.path().join("data").join("b.pdf").exists());
}
