//! # depot-core: Foundational Types for the depot File Service
//!
//! Leaf crate of the workspace. Defines the artifact model and the pure
//! functions the ingestion and retrieval pipelines are built from:
//!
//! 1. **[`ContentDigest`]**: algorithm-tagged SHA-256 digest over raw blob
//!    bytes, compared in constant time on verification.
//!
//! 2. **[`naming::stored_name()`]**: collision-resistant, time-sortable,
//!    filesystem-safe on-disk names derived from untrusted client filenames.
//!
//! 3. **[`ArtifactUri`]**: the one place that knows the
//!    `/uploads/<YYYY-MM-DD>/<storedName>` shape, in both directions.
//!
//! 4. **[`mime::mime_type_of()`]**: extension-table MIME inference, no
//!    content sniffing.
//!
//! 5. **[`DepotError`]**: tagged error taxonomy. Every variant carries its
//!    kind and HTTP status; callers match on the variant.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `depot-*` crates.
//! - No I/O. Filesystem access lives in `depot-store`.
//! - No `.unwrap()` outside tests.

pub mod artifact;
pub mod digest;
pub mod error;
pub mod mime;
pub mod naming;
pub mod uri;

pub use artifact::Artifact;
pub use digest::{sha256_bytes, ContentDigest, DigestAlgorithm};
pub use error::{DepotError, ErrorKind};
pub use mime::{mime_type_of, MimePolicy, OCTET_STREAM};
pub use naming::stored_name;
pub use uri::{partition_for, ArtifactUri, URI_PREFIX};
