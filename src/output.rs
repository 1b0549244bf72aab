//! JSON output of the final dataset
//!
//! The dataset is written as a single JSON array of flat string-to-string
//! objects, indented with two spaces, with each record's fields in
//! extraction order.

use std::path::Path;

use crate::error::{Error, Result};
use crate::types::Record;

/// Render the dataset as pretty-printed JSON (2-space indentation)
pub fn to_json_string(dataset: &[Record]) -> Result<String> {
    Ok(serde_json::to_string_pretty(dataset)?)
}

/// Write the dataset to `path`, creating parent directories as needed
pub async fn write_dataset(dataset: &[Record], path: &Path) -> Result<()> {
    let json = to_json_string(dataset)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| Error::io(parent, e))?;
    }
    tokio::fs::write(path, json)
        .await
        .map_err(|e| Error::io(path, e))?;

    tracing::info!(path = %path.display(), records = dataset.len(), "wrote dataset");
    Ok(())
}
