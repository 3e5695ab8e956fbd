//! # depot-store: Blob Storage and Artifact Index
//!
//! The two stateful components behind the pipelines:
//!
//! - [`content`]: [`BlobStore`] and its filesystem implementation
//!   [`ContentStore`]. Owns the bytes and the directory tree.
//! - [`index`]: [`ArtifactIndex`] and the in-memory [`MemoryIndex`]. Owns
//!   the `uri -> Artifact` mapping.
//!
//! Both are shared across requests behind `Arc<dyn ...>`; neither holds a
//! lock across an `.await`.

pub mod content;
pub mod index;

pub use content::{BlobStore, ContentStore};
pub use index::{ArtifactIndex, MemoryIndex};
