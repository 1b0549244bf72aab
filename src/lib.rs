//! # catalog-harvest
//!
//! Concurrent crawler for paginated data catalogs.
//!
//! A run walks the pager of a root listing page, collects record links from
//! every listing page, extracts one flat record per detail page and downloads
//! the artifact (typically a protocol PDF) each record references. Work is
//! done in fixed-size chunks: everything inside a chunk runs concurrently,
//! chunks run one after another, and results keep their discovery order.
//!
//! ## Quick Start
//!
//! ```no_run
//! use catalog_harvest::{Config, Crawler};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut config = Config::default();
//!     config.chunk_size = 10;
//!
//!     let crawler = Crawler::new(config)?;
//!
//!     // Subscribe to events
//!     let mut events = crawler.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     let report = crawler.run_and_write().await?;
//!     println!("{} records", report.dataset.len());
//!     if let Some(failure) = report.failure {
//!         eprintln!("stopped early: {failure}");
//!     }
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Artifact download
pub mod artifact;
/// Chunked concurrent execution
pub mod batch;
/// Configuration types
pub mod config;
/// Pipeline orchestration
pub mod crawler;
/// Listing page and record link discovery
pub mod discovery;
/// Error types
pub mod error;
/// Record extraction from detail pages
pub mod extract;
/// HTTP client wrapper
pub mod http;
/// Compiled selectors and element helpers
pub mod markup;
/// Dataset output
pub mod output;
/// Core types and events
pub mod types;
/// Utility functions
pub mod utils;

// Re-export commonly used types
pub use batch::{BatchError, BatchFailure, BatchScheduler, run_chunked};
pub use config::{ArtifactFailurePolicy, Config, HttpConfig, SelectorConfig, SiteConfig};
pub use crawler::Crawler;
pub use error::{Error, Phase, Result};
pub use types::{ArtifactFailure, CrawlReport, Dataset, Event, Record, RecordLink};

/// Run a crawl, cancelling it on a termination signal.
///
/// On a signal the crawler is cancelled and the records gathered so far are
/// returned, with the cancellation reported in [`CrawlReport::failure`] (or as
/// an error when partial results are disabled).
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// # Example
///
/// ```no_run
/// use catalog_harvest::{Config, Crawler, run_until_signal};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let crawler = Crawler::new(Config::default())?;
///     let report = run_until_signal(&crawler).await?;
///     catalog_harvest::output::write_dataset(&report.dataset, &crawler.config().output_path)
///         .await?;
///     Ok(())
/// }
/// ```
pub async fn run_until_signal(crawler: &Crawler) -> Result<CrawlReport> {
    let run = crawler.run();
    tokio::pin!(run);

    tokio::select! {
        report = &mut run => report,
        _ = wait_for_signal() => {
            crawler.cancel();
            run.await
        }
    }
}

/// Resolves once the process is asked to stop
#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Registration can fail in restricted environments; fall back to whatever works
    match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            let name = tokio::select! {
                _ = sigterm.recv() => "SIGTERM",
                _ = sigint.recv() => "SIGINT",
            };
            tracing::info!(signal = name, "stop requested, cancelling crawl");
        }
        (Ok(mut sigterm), Err(e)) => {
            tracing::warn!(error = %e, "SIGINT handler unavailable, crawl stops on SIGTERM only");
            sigterm.recv().await;
            tracing::info!(signal = "SIGTERM", "stop requested, cancelling crawl");
        }
        (Err(e), Ok(mut sigint)) => {
            tracing::warn!(error = %e, "SIGTERM handler unavailable, crawl stops on SIGINT only");
            sigint.recv().await;
            tracing::info!(signal = "SIGINT", "stop requested, cancelling crawl");
        }
        (Err(term), Err(int)) => {
            tracing::error!(
                sigterm = %term,
                sigint = %int,
                "no signal handlers registered, crawl stops on ctrl_c only"
            );
            wait_for_ctrl_c().await;
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    wait_for_ctrl_c().await;
}

async fn wait_for_ctrl_c() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!(signal = "ctrl_c", "stop requested, cancelling crawl"),
        Err(e) => {
            // Never resolve: without a signal source the crawl runs to completion
            tracing::error!(error = %e, "cannot listen for ctrl_c, crawl cannot be interrupted");
            std::future::pending::<()>().await;
        }
    }
}
