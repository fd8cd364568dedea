use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use super::attachment::StagedAttachment;
use super::repository::{AttachmentStore, StorageError};

/// Attachment store writing each staged file beneath a root directory.
#[derive(Debug, Clone)]
pub struct LocalAttachmentStore {
    root: PathBuf,
}

impl LocalAttachmentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a storage key onto the filesystem. Keys may only contain plain segments.
    pub fn resolve(&self, key: &str) -> Result<PathBuf, StorageError> {
        let relative = Path::new(key);
        let plain = !key.is_empty()
            && relative
                .components()
                .all(|component| matches!(component, Component::Normal(_)));
        if !plain {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl AttachmentStore for LocalAttachmentStore {
    async fn upload(&self, attachment: &StagedAttachment) -> Result<(), StorageError> {
        let path = self.resolve(attachment.key.as_str())?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut file = match tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
        {
            Ok(file) => file,
            Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => {
                return Err(StorageError::Conflict(attachment.key.0.clone()));
            }
            Err(err) => return Err(err.into()),
        };

        file.write_all(&attachment.bytes).await?;
        file.flush().await?;

        debug!(
            key = attachment.key.as_str(),
            content_type = %attachment.content_type,
            bytes = attachment.bytes.len(),
            "resume written to local store"
        );
        Ok(())
    }
}
