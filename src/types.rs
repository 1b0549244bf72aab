//! Core types for catalog-harvest

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Phase};

/// Reserved key holding the detail page a record was extracted from
pub const SOURCE_URL_KEY: &str = "study_url";

/// Reserved key holding the remote artifact URL, when the detail page links one
pub const ARTIFACT_URL_KEY: &str = "protocol_file";

/// Reserved key holding the local path of the downloaded artifact
pub const LOCAL_ARTIFACT_KEY: &str = "local_artifact_path";

/// Absolute URL of a record's detail page
pub type RecordLink = String;

/// One catalog entry: field name to extracted text, in extraction order
///
/// Field names come from the page's labels (lowercased and trimmed), so two
/// records need not share any keys beyond the reserved ones.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(IndexMap<String, String>);

impl Record {
    /// Create a record carrying only its source URL
    pub fn new(source_url: impl Into<String>) -> Self {
        let mut fields = IndexMap::new();
        fields.insert(SOURCE_URL_KEY.to_string(), source_url.into());
        Self(fields)
    }

    /// The detail page this record came from
    pub fn source_url(&self) -> &str {
        self.get(SOURCE_URL_KEY).unwrap_or_default()
    }

    /// Look up a field by its normalized name
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Insert a field; a repeated label replaces the earlier value in place
    ///
    /// Returns `false` (and leaves the record untouched) when `key` is the
    /// reserved source-URL key.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> bool {
        let key = key.into();
        if key == SOURCE_URL_KEY {
            return false;
        }
        self.0.insert(key, value.into());
        true
    }

    /// Remote artifact referenced by the record, if any
    pub fn artifact_url(&self) -> Option<&str> {
        self.get(ARTIFACT_URL_KEY)
    }

    /// Local path of the downloaded artifact, once it has been fetched
    pub fn local_artifact_path(&self) -> Option<&Path> {
        self.get(LOCAL_ARTIFACT_KEY).map(Path::new)
    }

    /// Attach the local path of the downloaded artifact
    pub fn set_local_artifact_path(&mut self, path: &Path) {
        self.0.insert(
            LOCAL_ARTIFACT_KEY.to_string(),
            path.to_string_lossy().into_owned(),
        );
    }

    /// Number of keys, reserved ones included
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false: a record carries at least its source URL
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over fields in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Ordered records, in page discovery order then link order within a page
pub type Dataset = Vec<Record>;

/// An artifact that could not be downloaded and was skipped
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ArtifactFailure {
    /// Detail page of the record that referenced the artifact
    pub record_url: String,
    /// The artifact URL
    pub artifact_url: String,
    /// Rendered error
    pub error: String,
}

/// Outcome of a crawl run
#[derive(Debug, Default)]
pub struct CrawlReport {
    /// Records gathered, in discovery order
    pub dataset: Dataset,
    /// Phase failure that ended the run early, when partial results are enabled
    pub failure: Option<Error>,
    /// Artifacts skipped under [`ArtifactFailurePolicy::Skip`](crate::config::ArtifactFailurePolicy)
    pub artifact_failures: Vec<ArtifactFailure>,
}

impl CrawlReport {
    /// True when every phase ran to completion
    pub fn is_complete(&self) -> bool {
        self.failure.is_none()
    }

    /// Number of records that carry a downloaded artifact
    pub fn artifacts_downloaded(&self) -> usize {
        self.dataset
            .iter()
            .filter(|r| r.local_artifact_path().is_some())
            .count()
    }
}

/// Event emitted while a crawl runs
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A phase started
    PhaseStarted {
        /// The phase
        phase: Phase,
        /// Number of work items in the phase
        items: usize,
    },

    /// A chunk of a phase finished
    ChunkCompleted {
        /// The phase
        phase: Phase,
        /// Chunk number, starting at 1
        chunk: usize,
        /// Total chunks in the phase
        chunks: usize,
    },

    /// Listing pages found behind the root pager
    PagesDiscovered {
        /// Number of listing pages
        count: usize,
    },

    /// Record links collected across all listing pages
    LinksCollected {
        /// Number of record links
        count: usize,
    },

    /// A record was extracted
    RecordExtracted {
        /// Detail page URL
        url: String,
        /// Number of keys in the record
        fields: usize,
    },

    /// Artifact download progress
    ArtifactProgress {
        /// Artifact URL
        url: String,
        /// Bytes written so far
        downloaded: u64,
        /// Declared size
        total: u64,
    },

    /// Artifact written to disk
    ArtifactSaved {
        /// Artifact URL
        url: String,
        /// Local path
        path: PathBuf,
    },

    /// Artifact download failed and was skipped
    ArtifactSkipped {
        /// Artifact URL
        url: String,
        /// Rendered error
        error: String,
    },

    /// The crawl finished
    Completed {
        /// Records in the dataset
        records: usize,
        /// Records with a downloaded artifact
        artifacts: usize,
    },
}
