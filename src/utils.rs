//! Utility functions for deriving local file names from URLs

use crate::error::{Error, Result};

/// Local file name for an artifact URL
///
/// Takes the last non-empty path segment, percent-decodes it, and keeps only
/// the part after the last path separator the decoding may have revealed, so
/// `.../data%2Fset%201.pdf` becomes `set 1.pdf`. Query and fragment are ignored.
///
/// # Errors
///
/// Returns [`Error::InvalidUrl`] if the URL does not parse, has no usable
/// segment, or the segment decodes to `.` or `..`.
///
/// # Examples
///
/// ```
/// use catalog_harvest::utils::artifact_filename;
///
/// let name = artifact_filename("https://example.com/files/Protocol%20v2.pdf?dl=1").unwrap();
/// assert_eq!(name, "Protocol v2.pdf");
/// ```
pub fn artifact_filename(url: &str) -> Result<String> {
    let invalid = |reason: &str| Error::InvalidUrl {
        url: url.to_string(),
        reason: reason.to_string(),
    };

    let parsed = url::Url::parse(url).map_err(|e| invalid(&e.to_string()))?;
    let segment = parsed
        .path_segments()
        .and_then(|segments| segments.filter(|s| !s.is_empty()).next_back())
        .ok_or_else(|| invalid("URL path has no file name segment"))?;

    let decoded = urlencoding::decode(segment)
        .map_err(|_| invalid("file name is not valid UTF-8 after percent-decoding"))?;

    let name = decoded
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();

    match name {
        "" | "." | ".." => Err(invalid("file name is empty after decoding")),
        _ => Ok(name.to_string()),
    }
}
