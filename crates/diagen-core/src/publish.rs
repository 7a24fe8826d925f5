//! Artifact publication to object storage.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{info, warn};

use crate::domain::{Artifact, DiagenError, Result};
use crate::sandbox::scratch::unique_suffix;

/// Object-storage collaborator. Keys are write-once; there is no
/// read-modify-write in this pipeline.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `bytes` under `key` and return a retrievable URL.
    async fn put(&self, key: &str, bytes: &[u8], content_type: &str) -> Result<String>;
}

/// Filesystem-backed object store.
///
/// Serves local deployments and tests; objects land under `root/<key>`
/// and the returned handle is a `file://` URL.
#[derive(Debug, Clone)]
pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// Filesystem location of a stored key.
    pub fn object_path(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }
}

#[async_trait]
impl ObjectStore for FsObjectStore {
    async fn put(&self, key: &str, bytes: &[u8], _content_type: &str) -> Result<String> {
        let path = self.object_path(key);
        if path.exists() {
            return Err(DiagenError::Upload(format!("key already exists: {key}")));
        }
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, bytes).await?;
        Ok(format!("file://{}", path.display()))
    }
}

/// Handle to a successfully published artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedArtifact {
    pub url: String,
    pub key: String,
    pub content_type: String,
}

/// Persists rendered artifacts and returns retrievable handles.
pub struct ArtifactPublisher<S: ObjectStore> {
    store: S,
    key_prefix: String,
}

impl<S: ObjectStore> ArtifactPublisher<S> {
    pub fn new(store: S, key_prefix: impl Into<String>) -> Self {
        Self {
            store,
            key_prefix: key_prefix.into(),
        }
    }

    /// Upload `artifact` under a collision-resistant key.
    ///
    /// An upload failure is a distinct failure class from execution
    /// failures and is not retried here; it bubbles to the caller.
    pub async fn publish(&self, artifact: &Artifact) -> Result<PublishedArtifact> {
        let key = format!(
            "{}/{}_{}",
            self.key_prefix,
            unique_suffix(),
            artifact.file_name
        );
        let content_type = artifact.content_type();

        match self.store.put(&key, &artifact.bytes, content_type).await {
            Ok(url) => {
                info!(event = "publish.uploaded", key = %key, url = %url, size = artifact.bytes.len());
                Ok(PublishedArtifact {
                    url,
                    key,
                    content_type: content_type.to_string(),
                })
            }
            Err(err) => {
                warn!(event = "publish.failed", key = %key, error = %err);
                if err.is_upload() {
                    Err(err)
                } else {
                    Err(DiagenError::Upload(err.to_string()))
                }
            }
        }
    }
}
