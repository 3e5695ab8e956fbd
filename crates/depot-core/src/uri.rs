//! # Artifact URIs
//!
//! An artifact's URI is derived from where its blob lives:
//! `/uploads/<YYYY-MM-DD>/<storedName>`. The date segment is the calendar-day
//! partition (UTC) the blob was written under.
//!
//! Parsing is strict. Anything that would let a client step outside the
//! upload root (`..`, embedded separators, malformed dates) does not parse.

use std::path::PathBuf;

use chrono::{DateTime, NaiveDate, Utc};

/// Path prefix shared by every artifact URI.
pub const URI_PREFIX: &str = "/uploads/";

const PARTITION_FORMAT: &str = "%Y-%m-%d";

/// Date partition name for a point in time.
pub fn partition_for(at: DateTime<Utc>) -> String {
    at.format(PARTITION_FORMAT).to_string()
}

/// A parsed artifact URI: date partition plus stored name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArtifactUri {
    partition: String,
    stored_name: String,
}

impl ArtifactUri {
    /// Build a URI from a partition and stored name, validating both.
    pub fn new(partition: &str, stored_name: &str) -> Option<Self> {
        if !is_valid_partition(partition) || !is_safe_segment(stored_name) {
            return None;
        }
        Some(Self {
            partition: partition.to_string(),
            stored_name: stored_name.to_string(),
        })
    }

    /// Parse `/uploads/<date>/<storedName>`.
    pub fn parse(raw: &str) -> Option<Self> {
        let rest = raw.strip_prefix(URI_PREFIX)?;
        let (partition, stored_name) = rest.split_once('/')?;
        Self::new(partition, stored_name)
    }

    /// The `YYYY-MM-DD` partition.
    pub fn partition(&self) -> &str {
        &self.partition
    }

    /// The on-disk file name.
    pub fn stored_name(&self) -> &str {
        &self.stored_name
    }

    /// Path of the blob relative to the upload root.
    pub fn relative_path(&self) -> PathBuf {
        PathBuf::from(&self.partition).join(&self.stored_name)
    }
}

impl std::fmt::Display for ArtifactUri {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{URI_PREFIX}{}/{}", self.partition, self.stored_name)
    }
}

fn is_valid_partition(s: &str) -> bool {
    match NaiveDate::parse_from_str(s, PARTITION_FORMAT) {
        // Round-trip rejects unpadded forms like 2024-1-5.
        Ok(date) => date.format(PARTITION_FORMAT).to_string() == s,
        Err(_) => false,
    }
}

/// True when `s` is usable as a single path component.
pub(crate) fn is_safe_segment(s: &str) -> bool {
    !s.is_empty()
        && s != "."
        && s != ".."
        && !s.contains(['/', '\\', '\0'])
}
