//! # Retrieval Pipeline
//!
//! Resolves a batch of URIs to their bytes. Strictly all-or-nothing: one
//! unknown URI or one failed integrity check fails the whole request, and
//! no partial payload is ever returned.

use std::sync::Arc;

use depot_core::{sha256_bytes, Artifact, DepotError};
use depot_store::{ArtifactIndex, BlobStore};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Raw bytes in the `{ "type": "Buffer", "data": [..] }` wire shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct BufferPayload {
    /// Always `"Buffer"`.
    #[serde(rename = "type")]
    pub kind: String,
    /// File contents, one integer 0-255 per byte.
    pub data: Vec<u8>,
}

impl From<Vec<u8>> for BufferPayload {
    fn from(data: Vec<u8>) -> Self {
        Self {
            kind: "Buffer".to_string(),
            data,
        }
    }
}

/// One entry of a load response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct LoadedFile {
    /// File contents as read from the store.
    pub buffer: BufferPayload,
    /// MIME type recorded for the artifact.
    #[serde(rename = "type")]
    pub mime_type: String,
}

/// Batch and single-URI reads over a [`BlobStore`] and [`ArtifactIndex`].
#[derive(Debug, Clone)]
pub struct RetrievalPipeline {
    store: Arc<dyn BlobStore>,
    index: Arc<dyn ArtifactIndex>,
}

impl RetrievalPipeline {
    /// Create a pipeline reading from `store` and resolving through `index`.
    pub fn new(store: Arc<dyn BlobStore>, index: Arc<dyn ArtifactIndex>) -> Self {
        Self { store, index }
    }

    /// Load every URI in `uris`, in order.
    ///
    /// Elements arrive as raw JSON values so that a non-string element is
    /// reported with its position instead of as a generic parse failure.
    pub async fn load(&self, uris: Vec<serde_json::Value>) -> Result<Vec<LoadedFile>, DepotError> {
        let uris = validate_uris(uris)?;

        let resolved = self.index.resolve_many(&uris);
        let missing = resolved.iter().filter(|a| a.is_none()).count();
        if missing > 0 {
            tracing::info!(requested = uris.len(), missing, "load rejected: unresolved uris");
            return Err(DepotError::NotFound("one or more files not found".to_string()));
        }

        let mut loaded = Vec::with_capacity(resolved.len());
        for artifact in resolved.into_iter().flatten() {
            let bytes = self.read_verified(&artifact).await?;
            loaded.push(LoadedFile {
                buffer: BufferPayload::from(bytes),
                mime_type: artifact.mime_type,
            });
        }

        tracing::debug!(count = loaded.len(), "batch loaded");
        Ok(loaded)
    }

    /// Resolve and read a single artifact, with the same integrity rules as
    /// [`load`](Self::load).
    pub async fn load_one(&self, uri: &str) -> Result<(Artifact, Vec<u8>), DepotError> {
        let artifact = self
            .index
            .resolve(uri)
            .ok_or_else(|| DepotError::NotFound(format!("no artifact at {uri}")))?;
        let bytes = self.read_verified(&artifact).await?;
        Ok((artifact, bytes))
    }

    /// Read the blob once and check the recorded digest against those bytes.
    /// [`BlobStore::verify_integrity`] would read the file again.
    async fn read_verified(&self, artifact: &Artifact) -> Result<Vec<u8>, DepotError> {
        let bytes = self.store.read(&artifact.uri).await?;
        if let Some(expected) = &artifact.content_hash {
            if !expected.matches(&bytes) {
                return Err(DepotError::Integrity {
                    uri: artifact.uri.clone(),
                    expected: expected.to_hex(),
                    actual: sha256_bytes(&bytes).to_hex(),
                });
            }
        }
        Ok(bytes)
    }
}

fn validate_uris(uris: Vec<serde_json::Value>) -> Result<Vec<String>, DepotError> {
    if uris.is_empty() {
        return Err(DepotError::Validation(
            "uris must be a non-empty array".to_string(),
        ));
    }
    uris.into_iter()
        .enumerate()
        .map(|(i, value)| match value {
            serde_json::Value::String(uri) => Ok(uri),
            _ => Err(DepotError::Validation(format!("uris[{i}] must be a string"))),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{IncomingFile, IngestionPipeline};
    use bytes::Bytes;
    use depot_core::ErrorKind;
    use depot_store::{ContentStore, MemoryIndex};
    use serde_json::json;

    struct Fixture {
        _dir: tempfile::TempDir,
        ingestion: IngestionPipeline,
        retrieval: RetrievalPipeline,
    }

    fn fixture(record_hash: bool) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let store: Arc<dyn BlobStore> = Arc::new(ContentStore::new(dir.path()));
        let index: Arc<dyn ArtifactIndex> = Arc::new(MemoryIndex::new());
        Fixture {
            ingestion: IngestionPipeline::new(store.clone(), index.clone())
                .with_content_hash(record_hash),
            retrieval: RetrievalPipeline::new(store, index),
            _dir: dir,
        }
    }

    async fn ingest(fx: &Fixture, files: &[(&str, &'static [u8])]) -> Vec<String> {
        let batch = files
            .iter()
            .map(|(name, bytes)| IncomingFile {
                original_name: name.to_string(),
                mime_hint: "application/octet-stream".to_string(),
                bytes: Bytes::from_static(bytes),
            })
            .collect();
        fx.ingestion
            .ingest(batch)
            .await
            .unwrap()
            .into_iter()
            .map(|f| f.uri)
            .collect()
    }

    #[tokio::test]
    async fn loads_in_request_order() {
        let fx = fixture(true);
        let uris = ingest(&fx, &[("a.txt", b"alpha"), ("b.png", b"\x89PNG")]).await;

        let request = vec![json!(uris[1]), json!(uris[0]), json!(uris[1])];
        let loaded = fx.retrieval.load(request).await.unwrap();

        assert_eq!(loaded.len(), 3);
        assert_eq!(loaded[0].buffer.data, b"\x89PNG");
        assert_eq!(loaded[0].mime_type, "image/png");
        assert_eq!(loaded[1].buffer.data, b"alpha");
        assert_eq!(loaded[1].mime_type, "text/plain");
        assert_eq!(loaded[2], loaded[0]);
        assert_eq!(loaded[0].buffer.kind, "Buffer");
    }

    #[tokio::test]
    async fn wire_shape() {
        let fx = fixture(true);
        let uris = ingest(&fx, &[("a.txt", b"hi")]).await;
        let loaded = fx.retrieval.load(vec![json!(uris[0])]).await.unwrap();

        let value = serde_json::to_value(&loaded).unwrap();
        assert_eq!(
            value,
            json!([{ "buffer": { "type": "Buffer", "data": [104, 105] }, "type": "text/plain" }])
        );
    }

    #[tokio::test]
    async fn empty_batch_is_validation_error() {
        let fx = fixture(true);
        let err = fx.retrieval.load(vec![]).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn non_string_element_names_its_position() {
        let fx = fixture(true);
        let uris = ingest(&fx, &[("a.txt", b"a")]).await;
        let err = fx
            .retrieval
            .load(vec![json!(uris[0]), json!(42)])
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(err.to_string().contains("uris[1]"));
    }

    #[tokio::test]
    async fn one_unknown_uri_fails_the_batch() {
        let fx = fixture(true);
        let uris = ingest(&fx, &[("a.txt", b"a")]).await;
        let err = fx
            .retrieval
            .load(vec![json!(uris[0]), json!("/uploads/2024-01-01/missing.txt")])
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(err.to_string().contains("one or more files not found"));
    }

    #[tokio::test]
    async fn corrupted_blob_fails_integrity_check() {
        let fx = fixture(true);
        let uris = ingest(&fx, &[("a.txt", b"original")]).await;
        let (artifact, _) = fx.retrieval.load_one(&uris[0]).await.unwrap();
        std::fs::write(&artifact.path, b"tampered").unwrap();

        let err = fx.retrieval.load(vec![json!(uris[0])]).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Integrity);
        match err {
            DepotError::Integrity { expected, actual, .. } => {
                assert_eq!(expected, sha256_bytes(b"original").to_hex());
                assert_eq!(actual, sha256_bytes(b"tampered").to_hex());
            }
            other => panic!("expected Integrity, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn load_agrees_with_store_integrity_check() {
        let fx = fixture(true);
        let uris = ingest(&fx, &[("a.txt", b"original")]).await;
        let (artifact, _) = fx.retrieval.load_one(&uris[0]).await.unwrap();
        let expected = artifact.content_hash.as_ref();

        let store = &fx.retrieval.store;
        assert!(store.verify_integrity(&artifact.path, expected).await.unwrap());
        assert!(fx.retrieval.load(vec![json!(uris[0])]).await.is_ok());

        std::fs::write(&artifact.path, b"tampered").unwrap();
        assert!(!store.verify_integrity(&artifact.path, expected).await.unwrap());
        assert!(fx.retrieval.load(vec![json!(uris[0])]).await.is_err());
    }

    #[tokio::test]
    async fn unhashed_blob_is_trusted() {
        let fx = fixture(false);
        let uris = ingest(&fx, &[("a.txt", b"original")]).await;
        let (artifact, _) = fx.retrieval.load_one(&uris[0]).await.unwrap();
        std::fs::write(&artifact.path, b"tampered").unwrap();

        let loaded = fx.retrieval.load(vec![json!(uris[0])]).await.unwrap();
        assert_eq!(loaded[0].buffer.data, b"tampered");
    }

    #[tokio::test]
    async fn blob_deleted_behind_the_index_is_not_found() {
        let fx = fixture(true);
        let uris = ingest(&fx, &[("a.txt", b"a")]).await;
        let (artifact, _) = fx.retrieval.load_one(&uris[0]).await.unwrap();
        std::fs::remove_file(&artifact.path).unwrap();

        let err = fx.retrieval.load(vec![json!(uris[0])]).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn load_one_unknown_uri() {
        let fx = fixture(true);
        let err = fx.retrieval.load_one("/uploads/2024-01-01/x").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
