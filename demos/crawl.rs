//! Crawl a catalog and write the dataset to disk
//!
//! Usage: `cargo run --example crawl [config.json]`
//!
//! Without an argument the built-in defaults are used. Set `RUST_LOG` to
//! change verbosity (default: `info`). Ctrl+C cancels the crawl and still
//! writes the records gathered so far.

use catalog_harvest::{Config, Crawler, Event, output, run_until_signal};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config: Config = match std::env::args().nth(1) {
        Some(path) => serde_json::from_str(&std::fs::read_to_string(path)?)?,
        None => Config::default(),
    };

    let crawler = Crawler::new(config)?;

    // Progress subscriber - chunk and phase updates only
    let mut events = crawler.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                Event::PhaseStarted { phase, items } => {
                    println!("[{phase}] starting, {items} items");
                }
                Event::ChunkCompleted {
                    phase,
                    chunk,
                    chunks,
                } => {
                    println!("[{phase}] chunk {chunk}/{chunks}");
                }
                Event::ArtifactSaved { path, .. } => {
                    println!("[artifacts] saved {}", path.display());
                }
                Event::ArtifactSkipped { url, error } => {
                    println!("[artifacts] skipped {url}: {error}");
                }
                _ => {}
            }
        }
    });

    let report = run_until_signal(&crawler).await?;
    output::write_dataset(&report.dataset, &crawler.config().output_path).await?;

    println!(
        "{} records, {} artifacts downloaded, {} skipped -> {}",
        report.dataset.len(),
        report.artifacts_downloaded(),
        report.artifact_failures.len(),
        crawler.config().output_path.display()
    );
    if let Some(failure) = &report.failure {
        println!("crawl stopped early: {failure}");
    }

    Ok(())
}
