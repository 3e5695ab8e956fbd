//! # Artifact Record
//!
//! Metadata for one ingested file. Created once when ingestion succeeds and
//! never mutated afterwards; the index owns the `uri -> Artifact` mapping and
//! the content store owns the bytes at `path`.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::digest::{sha256_bytes, ContentDigest};
use crate::mime::mime_type_of;
use crate::uri::ArtifactUri;

/// The stored representation of one uploaded file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    /// Process-unique identifier assigned at ingestion.
    pub id: Uuid,
    /// Client-supplied filename. Untrusted; display only.
    pub original_name: String,
    /// Sanitized, collision-resistant on-disk name.
    pub stored_name: String,
    /// Retrieval key, `/uploads/<date>/<storedName>`.
    pub uri: String,
    /// Absolute path of the blob.
    pub path: PathBuf,
    /// MIME type inferred from the extension at ingestion.
    pub mime_type: String,
    /// Blob length in bytes.
    pub size: u64,
    /// Digest recorded at write time. `None` means the blob is trusted as-is.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_hash: Option<ContentDigest>,
    /// Ingestion timestamp.
    pub created_at: DateTime<Utc>,
}

impl Artifact {
    /// Build the record for a blob just written at `path`.
    ///
    /// The MIME type is inferred from the stored name, falling back to the
    /// original name when the stored name yields nothing better.
    pub fn from_write(
        original_name: &str,
        uri: &ArtifactUri,
        path: PathBuf,
        bytes: &[u8],
        record_hash: bool,
        created_at: DateTime<Utc>,
    ) -> Self {
        let mut mime_type = mime_type_of(uri.stored_name());
        if mime_type == crate::mime::OCTET_STREAM {
            mime_type = mime_type_of(original_name);
        }
        Self {
            id: Uuid::new_v4(),
            original_name: original_name.to_string(),
            stored_name: uri.stored_name().to_string(),
            uri: uri.to_string(),
            path,
            mime_type,
            size: bytes.len() as u64,
            content_hash: record_hash.then(|| sha256_bytes(bytes)),
            created_at,
        }
    }
}
