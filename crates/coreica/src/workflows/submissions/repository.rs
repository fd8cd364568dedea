use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::attachment::StagedAttachment;
use super::domain::{
    ApplicationId, ApplicationRecord, ApplicationStatus, IdempotencyKey, IdentityId,
    IdentityRole, JobPostingId, JobPostingRecord,
};

/// Row storage for applicant submissions.
#[async_trait]
pub trait ApplicationRepository: Send + Sync {
    /// Store `record`. Fails with [`RepositoryError::Conflict`] when the same owner already
    /// holds a record with the same idempotency key created at or after `replay_since`; the
    /// check and the write must be a single atomic step.
    async fn insert(
        &self,
        record: ApplicationRecord,
        replay_since: DateTime<Utc>,
    ) -> Result<ApplicationRecord, RepositoryError>;
    async fn fetch(&self, id: &ApplicationId) -> Result<Option<ApplicationRecord>, RepositoryError>;
    async fn update_status(
        &self,
        id: &ApplicationId,
        status: ApplicationStatus,
    ) -> Result<ApplicationRecord, RepositoryError>;
    /// Most recent record by `owner` carrying `key`, created at or after `since`.
    async fn find_replay(
        &self,
        owner: &IdentityId,
        key: &IdempotencyKey,
        since: DateTime<Utc>,
    ) -> Result<Option<ApplicationRecord>, RepositoryError>;
}

/// Row storage for job postings.
#[async_trait]
pub trait JobPostingRepository: Send + Sync {
    /// Same uniqueness contract as [`ApplicationRepository::insert`].
    async fn insert(
        &self,
        record: JobPostingRecord,
        replay_since: DateTime<Utc>,
    ) -> Result<JobPostingRecord, RepositoryError>;
    async fn fetch(&self, id: &JobPostingId) -> Result<Option<JobPostingRecord>, RepositoryError>;
    async fn find_replay(
        &self,
        owner: &IdentityId,
        key: &IdempotencyKey,
        since: DateTime<Utc>,
    ) -> Result<Option<JobPostingRecord>, RepositoryError>;
}

/// Role assignments held by the identity provider.
#[async_trait]
pub trait RoleDirectory: Send + Sync {
    async fn roles_of(&self, identity: &IdentityId) -> Result<Vec<IdentityRole>, RoleDirectoryError>;
    async fn grant(&self, identity: &IdentityId, role: IdentityRole)
        -> Result<(), RoleDirectoryError>;
}

/// Blob storage for staged resumes.
#[async_trait]
pub trait AttachmentStore: Send + Sync {
    async fn upload(&self, attachment: &StagedAttachment) -> Result<(), StorageError>;
}

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, thiserror::Error)]
pub enum RoleDirectoryError {
    #[error("role directory unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("an object already exists at '{0}'")]
    Conflict(String),
    #[error("storage key '{0}' is not a relative path")]
    InvalidKey(String),
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

impl From<std::io::Error> for StorageError {
    fn from(value: std::io::Error) -> Self {
        Self::Unavailable(value.to_string())
    }
}
