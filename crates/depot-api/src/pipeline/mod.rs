//! # File Pipelines
//!
//! Ingestion (bytes in, URIs out) and retrieval (URIs in, bytes out). Both
//! operate on whole batches and are independent of the HTTP layer: handlers
//! decode the transport format into these types and map
//! [`DepotError`](depot_core::DepotError) into responses.

pub mod ingest;
pub mod retrieve;

pub use ingest::{IncomingFile, IngestedFile, IngestionPipeline};
pub use retrieve::{BufferPayload, LoadedFile, RetrievalPipeline};
