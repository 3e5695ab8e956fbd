//! # Content Store
//!
//! Physical persistence of blobs under a root upload directory, partitioned
//! by calendar day: `{root}/{YYYY-MM-DD}/{storedName}`. Partition directories
//! are created lazily on first write.
//!
//! ## Write Invariant
//!
//! Blobs are opened with create-new semantics. An existing file is never
//! overwritten, so a stored name that somehow repeats fails loudly with a
//! storage error instead of silently replacing another artifact's bytes.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use depot_core::{ArtifactUri, ContentDigest, DepotError};
use tokio::io::AsyncWriteExt;

/// Byte-blob persistence used by the ingestion and retrieval pipelines.
#[async_trait]
pub trait BlobStore: Send + Sync + std::fmt::Debug {
    /// The root upload directory.
    fn root(&self) -> &Path;

    /// Write `bytes` as `{partition}/{stored_name}`, returning the full path.
    async fn write(
        &self,
        partition: &str,
        stored_name: &str,
        bytes: &[u8],
    ) -> Result<PathBuf, DepotError>;

    /// Read the blob addressed by `uri`.
    async fn read(&self, uri: &str) -> Result<Vec<u8>, DepotError>;

    /// Delete the blob at `path`. Deleting a missing blob is not an error.
    async fn remove(&self, path: &Path) -> Result<(), DepotError>;

    /// Recompute the digest of the blob at `path` and compare to `expected`.
    ///
    /// With no expected digest the blob is trusted and this returns `true`
    /// without touching the filesystem.
    ///
    /// This is the check for callers that hold only a path. Callers that
    /// already read the blob compare with [`ContentDigest::matches`] on the
    /// bytes they have instead of reading the file a second time.
    async fn verify_integrity(
        &self,
        path: &Path,
        expected: Option<&ContentDigest>,
    ) -> Result<bool, DepotError>;
}

/// Filesystem [`BlobStore`] backed by `tokio::fs`.
#[derive(Debug, Clone)]
pub struct ContentStore {
    root: PathBuf,
}

impl ContentStore {
    /// Create a store rooted at `root`. The directory need not exist yet.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Create a store rooted at `root`, resolving it to an absolute path and
    /// creating it if missing.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, DepotError> {
        let mut root = root.into();
        if root.is_relative() {
            let cwd = std::env::current_dir().map_err(|e| DepotError::storage("resolve root", e))?;
            root = cwd.join(root);
        }
        tokio::fs::create_dir_all(&root)
            .await
            .map_err(|e| DepotError::storage("create root", e))?;
        Ok(Self::new(root))
    }

    /// Map a URI to an absolute blob path.
    ///
    /// `/uploads/<date>/<name>` resolves inside its partition. Anything else
    /// is treated as a bare filename directly under the root; only its final
    /// path component is used.
    pub fn resolve_path(&self, uri: &str) -> Result<PathBuf, DepotError> {
        if let Some(parsed) = ArtifactUri::parse(uri) {
            return Ok(self.root.join(parsed.relative_path()));
        }
        let name = Path::new(uri)
            .file_name()
            .and_then(|n| n.to_str())
            .filter(|n| !n.contains('\\'))
            .ok_or_else(|| DepotError::NotFound(format!("no file at {uri}")))?;
        Ok(self.root.join(name))
    }
}

#[async_trait]
impl BlobStore for ContentStore {
    fn root(&self) -> &Path {
        &self.root
    }

    async fn write(
        &self,
        partition: &str,
        stored_name: &str,
        bytes: &[u8],
    ) -> Result<PathBuf, DepotError> {
        let uri = ArtifactUri::new(partition, stored_name).ok_or_else(|| {
            DepotError::Validation(format!(
                "unsafe storage location {partition:?}/{stored_name:?}"
            ))
        })?;

        let dir = self.root.join(uri.partition());
        // create_dir_all treats a directory that already exists, including
        // one created concurrently by another request, as success.
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| DepotError::storage("create partition", e))?;

        let path = self.root.join(uri.relative_path());
        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
            .map_err(|e| DepotError::storage("open blob", e))?;

        let written = async {
            file.write_all(bytes).await?;
            file.flush().await?;
            file.sync_all().await
        }
        .await;

        if let Err(e) = written {
            drop(file);
            if let Err(cleanup) = tokio::fs::remove_file(&path).await {
                tracing::warn!(path = %path.display(), error = %cleanup, "failed to remove partial blob");
            }
            return Err(DepotError::storage("write blob", e));
        }

        tracing::debug!(path = %path.display(), size = bytes.len(), "blob written");
        Ok(path)
    }

    async fn read(&self, uri: &str) -> Result<Vec<u8>, DepotError> {
        let path = self.resolve_path(uri)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(DepotError::NotFound(format!("no file at {uri}")))
            }
            Err(e) => Err(DepotError::storage("read blob", e)),
        }
    }

    async fn remove(&self, path: &Path) -> Result<(), DepotError> {
        match tokio::fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(DepotError::storage("remove blob", e)),
        }
    }

    async fn verify_integrity(
        &self,
        path: &Path,
        expected: Option<&ContentDigest>,
    ) -> Result<bool, DepotError> {
        let Some(expected) = expected else {
            return Ok(true);
        };
        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(expected.matches(&bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(DepotError::NotFound(
                format!("no file at {}", path.display()),
            )),
            Err(e) => Err(DepotError::storage("read blob", e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use depot_core::{sha256_bytes, ErrorKind};

    const DAY: &str = "2024-03-09";

    fn store() -> (tempfile::TempDir, ContentStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = ContentStore::new(dir.path());
        (dir, store)
    }

    #[tokio::test]
    async fn write_creates_partition_and_returns_absolute_path() {
        let (dir, store) = store();
        let path = store.write(DAY, "a.txt", b"hello").await.unwrap();
        assert_eq!(path, dir.path().join(DAY).join("a.txt"));
        assert!(path.is_absolute());
        assert_eq!(std::fs::read(&path).unwrap(), b"hello");
    }

    #[tokio::test]
    async fn write_never_overwrites() {
        let (_dir, store) = store();
        store.write(DAY, "a.txt", b"first").await.unwrap();
        let err = store.write(DAY, "a.txt", b"second").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Storage);
        let bytes = store.read("/uploads/2024-03-09/a.txt").await.unwrap();
        assert_eq!(bytes, b"first");
    }

    #[tokio::test]
    async fn write_rejects_unsafe_names() {
        let (_dir, store) = store();
        let err = store.write(DAY, "../escape", b"x").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        let err = store.write("not-a-date", "a.txt", b"x").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn write_fails_with_storage_error_when_partition_is_blocked() {
        let (dir, store) = store();
        // A regular file where the partition directory should go.
        std::fs::write(dir.path().join(DAY), b"not a dir").unwrap();
        let err = store.write(DAY, "a.txt", b"x").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Storage);
    }

    #[tokio::test]
    async fn concurrent_writes_share_a_partition() {
        let (_dir, store) = store();
        let mut handles = Vec::new();
        for i in 0..16 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.write(DAY, &format!("f{i}.bin"), &[i as u8]).await
            }));
        }
        for h in handles {
            h.await.unwrap().unwrap();
        }
        let count = std::fs::read_dir(store.root().join(DAY)).unwrap().count();
        assert_eq!(count, 16);
    }

    #[tokio::test]
    async fn read_missing_is_not_found() {
        let (_dir, store) = store();
        let err = store.read("/uploads/2024-03-09/missing.txt").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn read_bare_filename_from_root() {
        let (dir, store) = store();
        std::fs::write(dir.path().join("loose.txt"), b"loose").unwrap();
        assert_eq!(store.read("loose.txt").await.unwrap(), b"loose");
        // Only the last component of a non-URI path is honoured.
        assert_eq!(store.read("some/dir/loose.txt").await.unwrap(), b"loose");
    }

    #[tokio::test]
    async fn read_does_not_escape_root() {
        let (_dir, store) = store();
        let err = store.read("/uploads/2024-03-09/../../etc/passwd").await;
        // Falls back to the bare name "passwd" under the root, which is absent.
        assert_eq!(err.unwrap_err().kind(), ErrorKind::NotFound);
        let err = store.read("..").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn remove_is_idempotent() {
        let (_dir, store) = store();
        let path = store.write(DAY, "a.txt", b"x").await.unwrap();
        store.remove(&path).await.unwrap();
        assert!(!path.exists());
        store.remove(&path).await.unwrap();
    }

    #[tokio::test]
    async fn verify_integrity_detects_tampering() {
        let (_dir, store) = store();
        let path = store.write(DAY, "a.txt", b"original").await.unwrap();
        let digest = sha256_bytes(b"original");
        assert!(store.verify_integrity(&path, Some(&digest)).await.unwrap());

        std::fs::write(&path, b"tampered").unwrap();
        assert!(!store.verify_integrity(&path, Some(&digest)).await.unwrap());
    }

    #[tokio::test]
    async fn verify_integrity_without_digest_trusts_blob() {
        let (dir, store) = store();
        let missing = dir.path().join("nothing-here");
        assert!(store.verify_integrity(&missing, None).await.unwrap());
    }

    #[tokio::test]
    async fn verify_integrity_missing_blob_is_not_found() {
        let (dir, store) = store();
        let missing = dir.path().join("nothing-here");
        let digest = sha256_bytes(b"x");
        let err = store.verify_integrity(&missing, Some(&digest)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn open_creates_root() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("nested").join("uploads");
        let store = ContentStore::open(&root).await.unwrap();
        assert!(store.root().is_dir());
    }
}
