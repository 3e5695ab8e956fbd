//! # Ingestion Pipeline
//!
//! Turns a batch of already-buffered uploads into stored, indexed artifacts.
//!
//! ## Batch Semantics
//!
//! The batch is all-or-nothing. Validation runs over every item before any
//! side effect. Blobs are then written in input order; if any write fails,
//! the blobs already written for this batch are removed and the storage
//! error is returned. The index is only touched once every write succeeded,
//! so a failed batch never leaves resolvable entries behind.

use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use depot_core::{partition_for, stored_name, Artifact, ArtifactUri, DepotError, MimePolicy};
use depot_store::{ArtifactIndex, BlobStore};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// One file as received at the transport boundary.
#[derive(Debug, Clone)]
pub struct IncomingFile {
    /// Client-supplied filename.
    pub original_name: String,
    /// Client-declared MIME type.
    pub mime_hint: String,
    /// Full file contents.
    pub bytes: Bytes,
}

/// Per-file ingestion result, in request order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct IngestedFile {
    /// Original filename as uploaded.
    pub name: String,
    /// Retrieval key for `POST /v1/files/load`.
    pub uri: String,
    /// MIME type declared by the client.
    #[serde(rename = "type")]
    pub mime_type: String,
}

/// Write-then-register pipeline over a [`BlobStore`] and an [`ArtifactIndex`].
#[derive(Debug, Clone)]
pub struct IngestionPipeline {
    store: Arc<dyn BlobStore>,
    index: Arc<dyn ArtifactIndex>,
    mime_policy: MimePolicy,
    record_content_hash: bool,
}

impl IngestionPipeline {
    /// Pipeline with MIME checking off and content hashing on.
    pub fn new(store: Arc<dyn BlobStore>, index: Arc<dyn ArtifactIndex>) -> Self {
        Self {
            store,
            index,
            mime_policy: MimePolicy::disabled(),
            record_content_hash: true,
        }
    }

    /// Enforce a declared-MIME allow-list.
    pub fn with_mime_policy(mut self, policy: MimePolicy) -> Self {
        self.mime_policy = policy;
        self
    }

    /// Toggle recording of content digests.
    pub fn with_content_hash(mut self, enabled: bool) -> Self {
        self.record_content_hash = enabled;
        self
    }

    /// Ingest a batch, returning one entry per input file in input order.
    pub async fn ingest(&self, files: Vec<IncomingFile>) -> Result<Vec<IngestedFile>, DepotError> {
        self.validate(&files)?;

        let mut staged: Vec<Artifact> = Vec::with_capacity(files.len());
        for (position, file) in files.iter().enumerate() {
            match self.store_one(file).await {
                Ok(artifact) => staged.push(artifact),
                Err(err) => {
                    tracing::error!(
                        position,
                        original_name = %file.original_name,
                        written = staged.len(),
                        error = %err,
                        "ingestion failed, rolling back batch"
                    );
                    self.rollback(&staged).await;
                    return Err(err);
                }
            }
        }

        let mut response = Vec::with_capacity(files.len());
        for (file, artifact) in files.into_iter().zip(staged) {
            let uri = artifact.uri.clone();
            tracing::info!(
                id = %artifact.id,
                uri = %uri,
                size = artifact.size,
                mime_type = %artifact.mime_type,
                "artifact ingested"
            );
            if let Some(previous) = self.index.register(artifact) {
                tracing::warn!(uri = %uri, replaced = %previous.id, "index entry overwritten");
            }
            response.push(IngestedFile {
                name: file.original_name,
                uri,
                mime_type: file.mime_hint,
            });
        }

        Ok(response)
    }

    fn validate(&self, files: &[IncomingFile]) -> Result<(), DepotError> {
        if files.is_empty() {
            return Err(DepotError::Validation("no files uploaded".to_string()));
        }
        if let Some(rejected) = files
            .iter()
            .find(|f| !self.mime_policy.permits(&f.mime_hint))
        {
            return Err(DepotError::Validation(format!(
                "file type {} is not allowed ({})",
                rejected.mime_hint, rejected.original_name
            )));
        }
        Ok(())
    }

    async fn store_one(&self, file: &IncomingFile) -> Result<Artifact, DepotError> {
        let now = Utc::now();
        let partition = partition_for(now);
        let name = stored_name(&file.original_name, now);
        let uri = ArtifactUri::new(&partition, &name)
            .ok_or_else(|| DepotError::Validation(format!("cannot derive a URI for {name:?}")))?;

        let path = self.store.write(&partition, &name, &file.bytes).await?;

        Ok(Artifact::from_write(
            &file.original_name,
            &uri,
            path,
            &file.bytes,
            self.record_content_hash,
            now,
        ))
    }

    async fn rollback(&self, staged: &[Artifact]) {
        for artifact in staged {
            if let Err(err) = self.store.remove(&artifact.path).await {
                tracing::warn!(
                    path = %artifact.path.display(),
                    error = %err,
                    "failed to remove blob during rollback; orphan left on disk"
                );
            }
        }
    }
}
