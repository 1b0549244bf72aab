//! Artifact download with byte-progress reporting
//!
//! The artifact is streamed chunk by chunk into the destination directory
//! under the percent-decoded last path segment of its URL. The response must
//! declare its size: the `Content-Length` header is the progress total, and a
//! response without one is rejected before anything is written.
//!
//! Bytes go to a hidden `.part` file unique to the download, which is renamed
//! onto the final name only once the body is complete. If the download fails,
//! or its future is dropped (cancellation, or a failing sibling in the same
//! chunk), the `.part` file is removed and nothing is left behind.
//!
//! Two records whose artifact URLs share a file name end up at the same path.
//! Their bodies never mix: the download that completes last replaces the file.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use reqwest::header::CONTENT_LENGTH;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::error::{Error, Result};
use crate::http::HttpClient;
use crate::utils::artifact_filename;

/// Distinguishes concurrent `.part` files within a process
static PART_SEQ: AtomicU64 = AtomicU64::new(0);

/// Download `url` into `destination_dir` and return the absolute local path
///
/// `on_progress(downloaded, total)` is called after every body chunk with the
/// cumulative number of bytes written and the declared size.
///
/// # Errors
///
/// - [`Error::InvalidUrl`] if no file name can be derived from `url`
/// - [`Error::Fetch`] on network failure or a non-success status
/// - [`Error::SizeUnknown`] if the response has no usable `Content-Length`
/// - [`Error::Io`] (naming `url`) if the directory or file cannot be written
pub async fn download_artifact<P>(
    client: &HttpClient,
    url: &str,
    destination_dir: &Path,
    on_progress: P,
) -> Result<PathBuf>
where
    P: FnMut(u64, u64),
{
    save(client, url, destination_dir, on_progress)
        .await
        .map_err(|e| e.for_url(url))
}

async fn save<P>(
    client: &HttpClient,
    url: &str,
    destination_dir: &Path,
    mut on_progress: P,
) -> Result<PathBuf>
where
    P: FnMut(u64, u64),
{
    let filename = artifact_filename(url)?;

    let mut response = client.get_artifact(url).await?;
    let total = declared_length(&response).ok_or_else(|| Error::SizeUnknown {
        url: url.to_string(),
    })?;

    fs::create_dir_all(destination_dir)
        .await
        .map_err(|e| Error::io(destination_dir, e))?;
    let dir = fs::canonicalize(destination_dir)
        .await
        .map_err(|e| Error::io(destination_dir, e))?;
    let path = dir.join(&filename);
    let part = PartFile::new(dir.join(format!(
        ".{filename}.{}.part",
        PART_SEQ.fetch_add(1, Ordering::Relaxed)
    )));

    tracing::info!(url = %url, path = %path.display(), bytes = total, "downloading artifact");

    // Declared after `part` so it is closed before the guard removes the file
    let mut file = fs::File::create(part.path())
        .await
        .map_err(|e| Error::io(part.path(), e))?;

    let mut downloaded = 0u64;
    while let Some(chunk) = response.chunk().await.map_err(|e| Error::fetch(url, &e))? {
        file.write_all(&chunk)
            .await
            .map_err(|e| Error::io(part.path(), e))?;
        downloaded += chunk.len() as u64;
        on_progress(downloaded, total);
    }
    file.flush().await.map_err(|e| Error::io(part.path(), e))?;
    drop(file);

    fs::rename(part.path(), &path)
        .await
        .map_err(|e| Error::io(&path, e))?;
    part.keep();

    if downloaded != total {
        tracing::warn!(
            url = %url,
            downloaded,
            declared = total,
            "artifact size differs from Content-Length"
        );
    }
    Ok(path)
}

fn declared_length(response: &reqwest::Response) -> Option<u64> {
    response
        .headers()
        .get(CONTENT_LENGTH)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}

/// In-progress download file, removed on drop unless kept
struct PartFile {
    path: PathBuf,
    armed: bool,
}

impl PartFile {
    fn new(path: PathBuf) -> Self {
        Self { path, armed: true }
    }

    fn path(&self) -> &Path {
        &self.path
    }

    /// The file was renamed into place; nothing to clean up
    fn keep(mut self) {
        self.armed = false;
    }
}

impl Drop for PartFile {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!(path = %self.path.display(), "removed partial artifact"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(
                path = %self.path.display(),
                error = %e,
                "could not remove partial artifact"
            ),
        }
    }
}
