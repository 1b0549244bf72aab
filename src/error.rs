//! Error types for catalog-harvest
//!
//! This module provides the error taxonomy for the crawl pipeline:
//! - Fetch failures (network, timeout, non-success HTTP status)
//! - Markup that is structurally unexpected
//! - Artifact responses without a declared size
//! - Local filesystem failures
//! - Phase attribution, so an aborted run reports which phase, which URL and why

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for catalog-harvest operations
pub type Result<T> = std::result::Result<T, Error>;

/// Pipeline phase, used to attribute failures and progress events
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Walking the pager of the root listing page
    Discovery,
    /// Collecting record links from listing pages
    Links,
    /// Extracting records from detail pages
    Records,
    /// Downloading artifacts referenced by records
    Artifacts,
    /// Handing the dataset to the output writer
    Output,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Phase::Discovery => "discovery",
            Phase::Links => "links",
            Phase::Records => "records",
            Phase::Artifacts => "artifacts",
            Phase::Output => "output",
        };
        f.write_str(name)
    }
}

/// Main error type for catalog-harvest
#[derive(Debug, Error)]
pub enum Error {
    /// Network failure, timeout or non-success HTTP status
    #[error("failed to fetch {url}: {reason}")]
    Fetch {
        /// The URL that could not be fetched
        url: String,
        /// What went wrong (status line, timeout, connection error)
        reason: String,
    },

    /// Markup did not have the expected structure
    #[error("unexpected markup at {url}: {message}")]
    Parse {
        /// The page whose markup was rejected
        url: String,
        /// Description of the structural problem
        message: String,
    },

    /// Artifact response did not declare a Content-Length
    #[error("artifact at {url} has no declared size (missing Content-Length)")]
    SizeUnknown {
        /// The artifact URL
        url: String,
    },

    /// Local filesystem failure
    #[error(
        "I/O error at {}{}: {source}",
        path.display(),
        url.as_deref().map(|u| format!(" while saving {u}")).unwrap_or_default()
    )]
    Io {
        /// The local path being read or written
        path: PathBuf,
        /// Remote resource being written, when the failure happened while saving one
        url: Option<String>,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// A link or configured URL could not be parsed or resolved
    #[error("invalid URL {url}: {reason}")]
    InvalidUrl {
        /// The offending URL or href
        url: String,
        /// Why it was rejected
        reason: String,
    },

    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "chunk_size")
        key: Option<String>,
    },

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The run was cancelled before it finished
    #[error("crawl cancelled")]
    Cancelled,

    /// A failure attributed to the pipeline phase it happened in
    #[error("{phase} phase failed: {source}")]
    Phase {
        /// The phase that failed
        phase: Phase,
        /// The underlying cause
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Build a fetch error from a reqwest failure, classifying timeouts and connection errors
    pub fn fetch(url: impl Into<String>, err: &reqwest::Error) -> Self {
        let reason = if err.is_timeout() {
            "request timed out".to_string()
        } else if err.is_connect() {
            format!("connection failed: {err}")
        } else if let Some(status) = err.status() {
            format!("HTTP {status}")
        } else {
            err.to_string()
        };
        Error::Fetch {
            url: url.into(),
            reason,
        }
    }

    /// Build a parse error for the given page
    pub fn parse(url: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Parse {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Build an I/O error for the given path
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            url: None,
            source,
        }
    }

    /// Attribute a local I/O failure to the remote resource being saved
    ///
    /// Other variants already carry their URL, or have none, and are returned unchanged.
    pub fn for_url(self, remote: &str) -> Self {
        match self {
            Error::Io {
                path,
                url: None,
                source,
            } => Error::Io {
                path,
                url: Some(remote.to_string()),
                source,
            },
            other => other,
        }
    }

    /// Wrap this error with the phase it happened in
    ///
    /// Already-attributed errors are returned unchanged.
    pub fn in_phase(self, phase: Phase) -> Self {
        match self {
            Error::Phase { .. } => self,
            other => Error::Phase {
                phase,
                source: Box::new(other),
            },
        }
    }

    /// The phase this error is attributed to, if any
    pub fn phase(&self) -> Option<Phase> {
        match self {
            Error::Phase { phase, .. } => Some(*phase),
            _ => None,
        }
    }

    /// True if the run was cancelled rather than failing
    pub fn is_cancelled(&self) -> bool {
        match self {
            Error::Cancelled => true,
            Error::Phase { source, .. } => source.is_cancelled(),
            _ => false,
        }
    }

    /// The URL this failure is attributable to, if any
    pub fn url(&self) -> Option<&str> {
        match self {
            Error::Fetch { url, .. }
            | Error::Parse { url, .. }
            | Error::SizeUnknown { url }
            | Error::InvalidUrl { url, .. } => Some(url),
            Error::Io { url, .. } => url.as_deref(),
            Error::Phase { source, .. } => source.url(),
            _ => None,
        }
    }
}
