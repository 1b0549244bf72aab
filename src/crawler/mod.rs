//! Pipeline orchestration: pages → links → records → artifacts.
//!
//! [`Crawler`] owns the HTTP client, the compiled selectors, the event bus and
//! the cancellation token, and sequences the phases:
//!
//! 1. discover listing pages from the root page's pager
//! 2. collect record links from every listing page (chunked)
//! 3. extract one record per link (chunked)
//! 4. download the artifact of every record that references one (chunked)
//!
//! Phases run one after another, so at most one phase's chunk size bounds the
//! number of in-flight requests. Order is preserved end to end: the dataset
//! lists records in page order, then link order within a page.
//!
//! When a phase fails and partial results are enabled, the phase stops
//! producing new items, the items it already produced still flow through the
//! later phases, and the failure is reported in [`CrawlReport::failure`].
//! Cancellation stops the run where it is.

use std::sync::Arc;

use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::artifact::download_artifact;
use crate::batch::{BatchError, BatchFailure, BatchScheduler};
use crate::config::{ArtifactFailurePolicy, Config};
use crate::discovery::{collect_links, discover_listing_pages, has_path_prefix};
use crate::error::{Error, Phase, Result};
use crate::extract::extract_record;
use crate::http::HttpClient;
use crate::markup::Selectors;
use crate::output;
use crate::types::{ArtifactFailure, CrawlReport, Dataset, Event, Record, RecordLink};


/// Capacity of the event broadcast channel; slow subscribers skip events beyond it
const EVENT_CHANNEL_CAPACITY: usize = 1000;

/// Catalog crawler (cloneable - all fields are cheap to clone)
#[derive(Clone)]
pub struct Crawler {
    config: Arc<Config>,
    client: HttpClient,
    selectors: Arc<Selectors>,
    listing_url: Url,
    site_root: Url,
    event_tx: broadcast::Sender<Event>,
    cancel_token: CancellationToken,
}

impl Crawler {
    /// Create a crawler, validating the configuration and compiling selectors
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for invalid settings or selectors.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let selectors = Selectors::compile(&config.selectors)?;
        let client = HttpClient::new(&config.http)?;
        let listing_url = config.site.listing_url()?;
        let site_root = Url::parse(&config.site.root_url).map_err(|e| Error::InvalidUrl {
            url: config.site.root_url.clone(),
            reason: e.to_string(),
        })?;
        let (event_tx, _rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Ok(Self {
            config: Arc::new(config),
            client,
            selectors: Arc::new(selectors),
            listing_url,
            site_root,
            event_tx,
            cancel_token: CancellationToken::new(),
        })
    }

    /// Subscribe to crawl events
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Cancel the running crawl; outstanding requests of the current chunk are dropped
    pub fn cancel(&self) {
        self.cancel_token.cancel();
    }

    /// The configuration this crawler runs with
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run the whole pipeline and return the dataset
    ///
    /// # Errors
    ///
    /// With `partial_results` disabled, the first phase failure is returned as
    /// [`Error::Phase`]. With it enabled (the default) failures are reported
    /// in the returned [`CrawlReport`] instead.
    pub async fn run(&self) -> Result<CrawlReport> {
        let mut report = CrawlReport::default();
        tracing::info!(root = %self.listing_url, "starting crawl");

        let pages = match self.discover_pages().await {
            Ok(pages) => pages,
            Err(e) => {
                self.absorb(&mut report, Some(e.in_phase(Phase::Discovery)))?;
                return Ok(self.finish(report));
            }
        };

        let (links, failure) = self.collect_record_links(pages).await;
        if !self.absorb(&mut report, failure)? {
            return Ok(self.finish(report));
        }

        let (records, failure) = self.extract_records(links).await;
        report.dataset = records;
        if !self.absorb(&mut report, failure)? {
            return Ok(self.finish(report));
        }

        let failure = self
            .download_artifacts(&mut report.dataset, &mut report.artifact_failures)
            .await;
        self.absorb(&mut report, failure)?;

        Ok(self.finish(report))
    }

    /// Run the pipeline and write the dataset to the configured output path
    pub async fn run_and_write(&self) -> Result<CrawlReport> {
        let report = self.run().await?;
        output::write_dataset(&report.dataset, &self.config.output_path)
            .await
            .map_err(|e| e.in_phase(Phase::Output))?;
        Ok(report)
    }

    /// Listing pages to scan for record links
    ///
    /// Falls back to the root listing page itself when it has no pager and
    /// `scan_root_when_unpaged` is set.
    pub async fn discover_pages(&self) -> Result<Vec<String>> {
        self.emit(Event::PhaseStarted {
            phase: Phase::Discovery,
            items: 1,
        });

        let mut pages =
            discover_listing_pages(&self.client, &self.selectors, &self.listing_url).await?;
        if pages.is_empty() && self.config.scan_root_when_unpaged {
            tracing::info!(root = %self.listing_url, "no pager found, scanning root page");
            pages.push(self.listing_url.to_string());
        }

        self.emit(Event::PagesDiscovered { count: pages.len() });
        Ok(pages)
    }

    async fn collect_record_links(&self, pages: Vec<String>) -> (Vec<RecordLink>, Option<Error>) {
        let phase = Phase::Links;
        self.emit(Event::PhaseStarted {
            phase,
            items: pages.len(),
        });

        let client = &self.client;
        let selectors = self.selectors.as_ref();
        let site_root = &self.site_root;
        let prefix = self.config.site.record_path_prefix.as_str();

        let outcome = self
            .scheduler(self.config.link_chunk_size)
            .run_with_progress(
                pages,
                move |page: String| async move {
                    collect_links(client, selectors, &page, site_root, has_path_prefix(prefix))
                        .await
                },
                |chunk, chunks| self.chunk_completed(phase, chunk, chunks),
            )
            .await;

        let (per_page, failure) = settle(phase, outcome);
        let links: Vec<RecordLink> = per_page.into_iter().flatten().collect();
        tracing::info!(links = links.len(), "collected record links");
        self.emit(Event::LinksCollected { count: links.len() });
        (links, failure)
    }

    async fn extract_records(&self, links: Vec<RecordLink>) -> (Dataset, Option<Error>) {
        let phase = Phase::Records;
        self.emit(Event::PhaseStarted {
            phase,
            items: links.len(),
        });

        let outcome = self
            .scheduler(self.config.chunk_size)
            .run_with_progress(
                links,
                move |link: RecordLink| async move {
                    let record = extract_record(&self.client, &self.selectors, &link).await?;
                    self.emit(Event::RecordExtracted {
                        url: link,
                        fields: record.len(),
                    });
                    Ok::<Record, Error>(record)
                },
                |chunk, chunks| self.chunk_completed(phase, chunk, chunks),
            )
            .await;

        let (records, failure) = settle(phase, outcome);
        tracing::info!(records = records.len(), "extracted records");
        (records, failure)
    }

    /// Download artifacts of the records that reference one, attaching local paths in place
    async fn download_artifacts(
        &self,
        dataset: &mut Dataset,
        skipped: &mut Vec<ArtifactFailure>,
    ) -> Option<Error> {
        let phase = Phase::Artifacts;
        let targets: Vec<(usize, String)> = dataset
            .iter()
            .enumerate()
            .filter_map(|(index, record)| record.artifact_url().map(|url| (index, url.to_string())))
            .collect();

        tracing::info!(
            artifacts = targets.len(),
            without_artifact = dataset.len() - targets.len(),
            "downloading artifacts"
        );
        self.emit(Event::PhaseStarted {
            phase,
            items: targets.len(),
        });

        let data_dir = self.config.data_dir.as_path();
        let policy = self.config.artifact_failure;

        let outcome = self
            .scheduler(self.config.chunk_size)
            .run_with_progress(
                targets,
                move |(index, url): (usize, String)| async move {
                    let downloaded =
                        download_artifact(&self.client, &url, data_dir, |downloaded, total| {
                            self.emit(Event::ArtifactProgress {
                                url: url.clone(),
                                downloaded,
                                total,
                            })
                        })
                        .await;
                    match downloaded {
                        Ok(path) => Ok((index, url, Ok(path))),
                        Err(e) if policy == ArtifactFailurePolicy::Skip => Ok((index, url, Err(e))),
                        Err(e) => Err(e),
                    }
                },
                |chunk, chunks| self.chunk_completed(phase, chunk, chunks),
            )
            .await;

        let (done, failure) = settle(phase, outcome);
        for (index, url, result) in done {
            let record = &mut dataset[index];
            match result {
                Ok(path) => {
                    record.set_local_artifact_path(&path);
                    self.emit(Event::ArtifactSaved { url, path });
                }
                Err(e) => {
                    tracing::warn!(
                        record = %record.source_url(),
                        url = %url,
                        error = %e,
                        "skipping artifact"
                    );
                    self.emit(Event::ArtifactSkipped {
                        url: url.clone(),
                        error: e.to_string(),
                    });
                    skipped.push(ArtifactFailure {
                        record_url: record.source_url().to_string(),
                        artifact_url: url,
                        error: e.to_string(),
                    });
                }
            }
        }
        failure
    }

    fn scheduler(&self, chunk_size: usize) -> BatchScheduler {
        BatchScheduler::new(chunk_size).with_cancellation(self.cancel_token.clone())
    }

    fn chunk_completed(&self, phase: Phase, chunk: usize, chunks: usize) {
        tracing::debug!(phase = %phase, chunk, chunks, "chunk completed");
        self.emit(Event::ChunkCompleted {
            phase,
            chunk,
            chunks,
        });
    }

    /// Fold a phase failure into the report
    ///
    /// Returns whether later phases should still run.
    fn absorb(&self, report: &mut CrawlReport, failure: Option<Error>) -> Result<bool> {
        let Some(error) = failure else {
            return Ok(true);
        };
        if !self.config.partial_results {
            tracing::error!(error = %error, "crawl aborted");
            return Err(error);
        }

        tracing::error!(error = %error, "crawl phase failed, keeping partial results");
        let proceed = !error.is_cancelled();
        if report.failure.is_none() {
            report.failure = Some(error);
        }
        Ok(proceed)
    }

    fn finish(&self, report: CrawlReport) -> CrawlReport {
        let records = report.dataset.len();
        let artifacts = report.artifacts_downloaded();
        tracing::info!(
            records,
            artifacts,
            skipped_artifacts = report.artifact_failures.len(),
            complete = report.is_complete(),
            "crawl finished"
        );
        self.emit(Event::Completed { records, artifacts });
        report
    }

    fn emit(&self, event: Event) {
        // No subscribers is fine
        self.event_tx.send(event).ok();
    }
}

/// Split a chunked outcome into the items produced and the phase failure, if any
fn settle<R>(
    phase: Phase,
    outcome: std::result::Result<Vec<R>, BatchFailure<R, Error>>,
) -> (Vec<R>, Option<Error>) {
    match outcome {
        Ok(items) => (items, None),
        Err(BatchFailure { completed, error }) => {
            let error = match error {
                BatchError::Task { index, error } => {
                    tracing::error!(phase = %phase, index, error = %error, "task failed");
                    error
                }
                BatchError::Cancelled => {
                    tracing::warn!(phase = %phase, "phase cancelled");
                    Error::Cancelled
                }
            };
            (completed, Some(error.in_phase(phase)))
        }
    }
}
