//! # Application State
//!
//! Shared state for the Axum application, passed to all route handlers
//! via the `State` extractor. Cloning is cheap: every field is behind an `Arc`.
//!
//! The store and index are trait objects so tests can substitute failing or
//! instrumented implementations without touching the handlers.

use std::sync::Arc;

use depot_core::DepotError;
use depot_store::{ArtifactIndex, BlobStore, ContentStore, MemoryIndex};

use crate::config::AppConfig;
use crate::pipeline::{IngestionPipeline, RetrievalPipeline};

#[derive(Debug, Clone)]
pub struct AppState {
    /// Settings loaded at startup. Read-only after construction.
    pub config: Arc<AppConfig>,

    // -- Storage --
    /// Blob persistence under `config.upload_dir`.
    pub store: Arc<dyn BlobStore>,
    /// URI to artifact mapping. In-memory only; lost on restart.
    pub index: Arc<dyn ArtifactIndex>,

    // -- Pipelines --
    /// Validates, stores and registers uploaded batches.
    pub ingestion: Arc<IngestionPipeline>,
    /// Resolves and reads batches by URI, enforcing recorded digests.
    pub retrieval: Arc<RetrievalPipeline>,
}

impl AppState {
    /// Wire pipelines over the given store and index.
    pub fn new(
        config: AppConfig,
        store: Arc<dyn BlobStore>,
        index: Arc<dyn ArtifactIndex>,
    ) -> Self {
        let ingestion = IngestionPipeline::new(store.clone(), index.clone())
            .with_mime_policy(config.mime_policy.clone())
            .with_content_hash(config.record_content_hash);
        let retrieval = RetrievalPipeline::new(store.clone(), index.clone());

        Self {
            config: Arc::new(config),
            store,
            index,
            ingestion: Arc::new(ingestion),
            retrieval: Arc::new(retrieval),
        }
    }

    /// Open the filesystem store at `config.upload_dir` (creating it if
    /// needed) with a fresh in-memory index.
    pub async fn from_config(config: AppConfig) -> Result<Self, DepotError> {
        let store = ContentStore::open(config.upload_dir.clone()).await?;
        tracing::info!(root = %store.root().display(), "content store opened");
        Ok(Self::new(
            config,
            Arc::new(store),
            Arc::new(MemoryIndex::new()),
        ))
    }
}
