use chrono::{DateTime, Utc};

use super::domain::{IdentityId, StorageKey};

/// 5 MiB, inclusive.
pub const MAX_RESUME_BYTES: u64 = 5 * 1024 * 1024;

pub const RESUME_EXTENSIONS: [&str; 3] = ["pdf", "doc", "docx"];

/// Resume file as received from the applicant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResumeUpload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl ResumeUpload {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// An accepted resume ready to hand to the attachment store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedAttachment {
    pub key: StorageKey,
    pub content_type: mime::Mime,
    pub original_name: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AttachmentError {
    #[error("invalid file type for '{file_name}': please upload a PDF, DOC, or DOCX file")]
    InvalidType { file_name: String },
    #[error("file too large: please upload a file no larger than {max} bytes")]
    TooLarge { size: u64, max: u64 },
}

impl AttachmentError {
    pub const fn code(&self) -> &'static str {
        match self {
            AttachmentError::InvalidType { .. } => "invalid_type",
            AttachmentError::TooLarge { .. } => "too_large",
        }
    }
}

/// Type and size dial for resume uploads.
#[derive(Debug, Clone)]
pub struct AttachmentPolicy {
    max_bytes: u64,
    extensions: Vec<String>,
}

impl Default for AttachmentPolicy {
    fn default() -> Self {
        Self::new(
            MAX_RESUME_BYTES,
            RESUME_EXTENSIONS.iter().map(|ext| ext.to_string()).collect(),
        )
    }
}

impl AttachmentPolicy {
    pub fn new(max_bytes: u64, extensions: Vec<String>) -> Self {
        let extensions = extensions
            .into_iter()
            .map(|ext| ext.trim_start_matches('.').to_ascii_lowercase())
            .collect();
        Self {
            max_bytes,
            extensions,
        }
    }

    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    /// Check type then size, returning the lowercased extension on success.
    pub fn inspect(&self, file_name: &str, size: u64) -> Result<String, AttachmentError> {
        let extension = file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .filter(|ext| self.extensions.iter().any(|allowed| allowed == ext))
            .ok_or_else(|| AttachmentError::InvalidType {
                file_name: file_name.to_string(),
            })?;

        if size > self.max_bytes {
            return Err(AttachmentError::TooLarge {
                size,
                max: self.max_bytes,
            });
        }

        Ok(extension)
    }

    /// Rejection for a resume cut off at the transport body limit. `received` is a lower
    /// bound on its size; a disallowed type is still reported first.
    pub fn reject_truncated(&self, file_name: &str, received: u64) -> AttachmentError {
        let size = received.max(self.max_bytes.saturating_add(1));
        match self.inspect(file_name, size) {
            Err(rejection) => rejection,
            Ok(_) => AttachmentError::TooLarge {
                size,
                max: self.max_bytes,
            },
        }
    }

    /// Accept an upload and key it by owner and submission instant.
    pub fn stage(
        &self,
        owner: &IdentityId,
        upload: ResumeUpload,
        at: DateTime<Utc>,
    ) -> Result<StagedAttachment, AttachmentError> {
        let extension = self.inspect(&upload.file_name, upload.size())?;
        let key = StorageKey::for_upload(owner, at, &extension);
        let content_type = mime_guess::from_ext(&extension).first_or_octet_stream();

        Ok(StagedAttachment {
            key,
            content_type,
            original_name: upload.file_name,
            bytes: upload.bytes,
        })
    }
}
