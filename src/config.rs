//! Configuration types for catalog-harvest

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, time::Duration};

/// Where the catalog lives and which links count as records
///
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Site root; record links are resolved against it (default: "https://datashare.nida.nih.gov")
    #[serde(default = "default_root_url")]
    pub root_url: String,

    /// Path of the root listing page, relative to the site root (default: "/data")
    #[serde(default = "default_listing_path")]
    pub listing_path: String,

    /// Anchors whose href starts with this prefix are record links (default: "/study")
    #[serde(default = "default_record_path_prefix")]
    pub record_path_prefix: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            root_url: default_root_url(),
            listing_path: default_listing_path(),
            record_path_prefix: default_record_path_prefix(),
        }
    }
}

impl SiteConfig {
    /// Absolute URL of the root listing page
    pub fn listing_url(&self) -> Result<url::Url> {
        let root = url::Url::parse(&self.root_url).map_err(|e| Error::InvalidUrl {
            url: self.root_url.clone(),
            reason: e.to_string(),
        })?;
        root.join(&self.listing_path)
            .map_err(|e| Error::InvalidUrl {
                url: self.listing_path.clone(),
                reason: e.to_string(),
            })
    }
}

/// CSS selectors describing the catalog's markup
///
/// Defaults match a Drupal-style catalog: pager items in `li.pager__item`,
/// record fields in `div.field` blocks inside `div.group-left`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SelectorConfig {
    /// One pagination control (default: "li.pager__item")
    #[serde(default = "default_pager_item")]
    pub pager_item: String,

    /// Container holding the record's general info (default: "div.group-left")
    #[serde(default = "default_info_container")]
    pub info_container: String,

    /// Labeled field block inside the info container (default: "div.field")
    #[serde(default = "default_field")]
    pub field: String,

    /// Label element of a field block (default: "div.field__label")
    #[serde(default = "default_field_label")]
    pub field_label: String,

    /// Value element of a field block (default: "div.field__item")
    #[serde(default = "default_field_item")]
    pub field_item: String,

    /// Field blocks that may carry the artifact link
    /// (default: "div.field--name-field-clintri-protocol")
    #[serde(default = "default_protocol_block")]
    pub protocol_block: String,

    /// Label text (compared case-insensitively) marking the artifact block (default: "protocol")
    #[serde(default = "default_protocol_label")]
    pub protocol_label: String,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            pager_item: default_pager_item(),
            info_container: default_info_container(),
            field: default_field(),
            field_label: default_field_label(),
            field_item: default_field_item(),
            protocol_block: default_protocol_block(),
            protocol_label: default_protocol_label(),
        }
    }
}

/// HTTP client settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Timeout for a whole request, body included (default: 30 seconds)
    #[serde(default = "default_request_timeout", with = "duration_serde")]
    pub request_timeout: Duration,

    /// Timeout for a whole artifact download, body included (default: 600 seconds)
    ///
    /// Replaces `request_timeout` for artifact requests, whose bodies are
    /// streamed and can be large.
    #[serde(default = "default_artifact_timeout", with = "duration_serde")]
    pub artifact_timeout: Duration,

    /// Timeout for establishing a connection (default: 10 seconds)
    #[serde(default = "default_connect_timeout", with = "duration_serde")]
    pub connect_timeout: Duration,

    /// User-Agent header sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            request_timeout: default_request_timeout(),
            artifact_timeout: default_artifact_timeout(),
            connect_timeout: default_connect_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

/// What to do when a single artifact cannot be downloaded
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactFailurePolicy {
    /// Record the failure in the crawl report and keep going
    #[default]
    Skip,
    /// Abort the artifact phase on the first failure
    Abort,
}

/// Main configuration for [`Crawler`](crate::Crawler)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// Site location and record link filter
    #[serde(default)]
    pub site: SiteConfig,

    /// Markup selectors
    #[serde(default)]
    pub selectors: SelectorConfig,

    /// HTTP client settings
    #[serde(default)]
    pub http: HttpConfig,

    /// Maximum in-flight requests per chunk for records and artifacts (default: 20)
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Maximum listing pages scanned concurrently (default: 20)
    #[serde(default = "default_chunk_size")]
    pub link_chunk_size: usize,

    /// Directory downloaded artifacts are written to (default: "data")
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Path of the JSON dataset written by `run_and_write` (default: "studies.json")
    #[serde(default = "default_output_path")]
    pub output_path: PathBuf,

    /// Per-artifact failure handling (default: skip and record)
    #[serde(default)]
    pub artifact_failure: ArtifactFailurePolicy,

    /// Return the records gathered so far when a phase fails (default: true)
    #[serde(default = "default_true")]
    pub partial_results: bool,

    /// Scan the root listing page itself when it has no pager (default: true)
    #[serde(default = "default_true")]
    pub scan_root_when_unpaged: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            site: SiteConfig::default(),
            selectors: SelectorConfig::default(),
            http: HttpConfig::default(),
            chunk_size: default_chunk_size(),
            link_chunk_size: default_chunk_size(),
            data_dir: default_data_dir(),
            output_path: default_output_path(),
            artifact_failure: ArtifactFailurePolicy::default(),
            partial_results: true,
            scan_root_when_unpaged: true,
        }
    }
}

impl Config {
    /// Check the settings that would otherwise fail deep inside a run
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(Error::Config {
                message: "chunk_size must be at least 1".to_string(),
                key: Some("chunk_size".to_string()),
            });
        }
        if self.link_chunk_size == 0 {
            return Err(Error::Config {
                message: "link_chunk_size must be at least 1".to_string(),
                key: Some("link_chunk_size".to_string()),
            });
        }
        self.site.listing_url().map_err(|e| Error::Config {
            message: e.to_string(),
            key: Some("site.root_url".to_string()),
        })?;
        Ok(())
    }
}

fn default_root_url() -> String {
    "https://datashare.nida.nih.gov".to_string()
}

fn default_listing_path() -> String {
    "/data".to_string()
}

fn default_record_path_prefix() -> String {
    "/study".to_string()
}

fn default_pager_item() -> String {
    "li.pager__item".to_string()
}

fn default_info_container() -> String {
    "div.group-left".to_string()
}

fn default_field() -> String {
    "div.field".to_string()
}

fn default_field_label() -> String {
    "div.field__label".to_string()
}

fn default_field_item() -> String {
    "div.field__item".to_string()
}

fn default_protocol_block() -> String {
    "div.field--name-field-clintri-protocol".to_string()
}

fn default_protocol_label() -> String {
    "protocol".to_string()
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_artifact_timeout() -> Duration {
    Duration::from_secs(600)
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_user_agent() -> String {
    concat!("catalog-harvest/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_chunk_size() -> usize {
    20
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_output_path() -> PathBuf {
    PathBuf::from("studies.json")
}

fn default_true() -> bool {
    true
}

// Duration serialization helper (whole seconds)
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
