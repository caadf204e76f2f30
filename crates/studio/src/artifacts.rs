//! Durable storage for image binaries.
//!
//! Uploads and generated results are written under an owner-namespaced path
//! (`{owner_id}/{folder}/{file_name}`) and referenced by a stable relative
//! path that outlives the in-memory payload it was generated from.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;

use espelho_core::error::CoreError;
use espelho_core::storage::{object_path, FolderKind};
use espelho_core::types::DbId;

/// Storage seam for image binaries. Returns and accepts the owner-namespaced
/// relative path produced by [`object_path`].
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Store `bytes` and return the durable relative reference.
    async fn put(
        &self,
        owner_id: DbId,
        folder: FolderKind,
        file_name: &str,
        bytes: &[u8],
    ) -> Result<String, CoreError>;

    /// Read a stored binary back.
    async fn get(&self, reference: &str) -> Result<Vec<u8>, CoreError>;

    /// Remove a stored binary. Missing objects are not an error.
    async fn delete(&self, reference: &str) -> Result<(), CoreError>;
}

/// Filesystem-backed artifact store rooted at a configured directory.
pub struct FsArtifactStore {
    root: PathBuf,
}

impl FsArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve a stored reference to an absolute path, rejecting references
    /// that would escape the root.
    fn resolve(&self, reference: &str) -> Result<PathBuf, CoreError> {
        if reference.is_empty()
            || reference.contains("..")
            || Path::new(reference).is_absolute()
        {
            return Err(CoreError::Validation(format!(
                "Invalid artifact reference '{reference}'"
            )));
        }
        Ok(self.root.join(reference))
    }
}

#[async_trait]
impl ArtifactStore for FsArtifactStore {
    async fn put(
        &self,
        owner_id: DbId,
        folder: FolderKind,
        file_name: &str,
        bytes: &[u8],
    ) -> Result<String, CoreError> {
        let reference = object_path(owner_id, folder, file_name)?;
        let path = self.resolve(&reference)?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| CoreError::Internal(format!("Failed to create {parent:?}: {e}")))?;
        }
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| CoreError::Internal(format!("Failed to write artifact: {e}")))?;

        Ok(reference)
    }

    async fn get(&self, reference: &str) -> Result<Vec<u8>, CoreError> {
        let path = self.resolve(reference)?;
        tokio::fs::read(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                CoreError::Validation(format!("Artifact '{reference}' does not exist"))
            } else {
                CoreError::Internal(format!("Failed to read artifact: {e}"))
            }
        })
    }

    async fn delete(&self, reference: &str) -> Result<(), CoreError> {
        let path = self.resolve(reference)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CoreError::Internal(format!(
                "Failed to delete artifact: {e}"
            ))),
        }
    }
}

/// Shared handle type used across the service layer.
pub type SharedArtifactStore = Arc<dyn ArtifactStore>;

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn store() -> FsArtifactStore {
        let dir = std::env::temp_dir().join(format!("espelho-test-{}", uuid::Uuid::new_v4()));
        FsArtifactStore::new(dir)
    }

    #[tokio::test]
    async fn put_then_get_roundtrip() {
        let store = store();
        let reference = store
            .put(42, FolderKind::Results, "look-1.jpg", b"jpeg bytes")
            .await
            .unwrap();
        assert_eq!(reference, "42/results/look-1.jpg");

        let bytes = store.get(&reference).await.unwrap();
        assert_eq!(bytes, b"jpeg bytes");
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let store = store();
        let reference = store
            .put(1, FolderKind::Uploads, "a.jpg", b"x")
            .await
            .unwrap();
        store.delete(&reference).await.unwrap();
        store.delete(&reference).await.unwrap();
        assert_matches!(
            store.get(&reference).await,
            Err(CoreError::Validation(_))
        );
    }

    #[tokio::test]
    async fn escaping_references_rejected() {
        let store = store();
        assert_matches!(
            store.get("../outside.jpg").await,
            Err(CoreError::Validation(_))
        );
        assert_matches!(
            store.get("/etc/passwd").await,
            Err(CoreError::Validation(_))
        );
        assert_matches!(
            store
                .put(1, FolderKind::Uploads, "../x.jpg", b"x")
                .await,
            Err(CoreError::Validation(_))
        );
    }
}
