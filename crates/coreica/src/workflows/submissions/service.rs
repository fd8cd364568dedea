use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use super::attachment::{AttachmentError, AttachmentPolicy, ResumeUpload, StagedAttachment};
use super::domain::{
    ApplicationForm, ApplicationId, ApplicationRecord, ApplicationStatus, IdempotencyKey,
    IdentityId, IdentityRole, JobPostingForm, JobPostingId, JobPostingRecord, StorageKey,
};
use super::notification::{Notification, NotificationDispatcher, NotificationKind};
use super::repository::{
    ApplicationRepository, AttachmentStore, JobPostingRepository, RepositoryError,
    RoleDirectory, RoleDirectoryError, StorageError,
};
use super::validation::{SubmissionValidator, ValidationError};

/// Source of the submission instant used for storage keys and timestamps.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// External collaborators the pipeline talks to.
#[derive(Clone)]
pub struct SubmissionPorts {
    pub applications: Arc<dyn ApplicationRepository>,
    pub job_postings: Arc<dyn JobPostingRepository>,
    pub roles: Arc<dyn RoleDirectory>,
    pub attachments: Arc<dyn AttachmentStore>,
    pub notifications: Arc<dyn NotificationDispatcher>,
}

#[derive(Debug, Clone)]
pub struct SubmissionConfig {
    pub attachments: AttachmentPolicy,
    pub idempotency_window: Duration,
}

impl Default for SubmissionConfig {
    fn default() -> Self {
        Self {
            attachments: AttachmentPolicy::default(),
            idempotency_window: Duration::minutes(10),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ApplicationRequest {
    pub owner: IdentityId,
    pub form: ApplicationForm,
    pub resume: Option<ResumeUpload>,
    pub idempotency_key: Option<IdempotencyKey>,
}

#[derive(Debug, Clone)]
pub struct JobPostingRequest {
    pub owner: IdentityId,
    pub form: JobPostingForm,
    pub idempotency_key: Option<IdempotencyKey>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleGrantOutcome {
    NotRequired,
    AlreadyHeld,
    Granted,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationOutcome {
    Sent,
    Skipped,
    Failed(String),
}

/// Successful submission. Side-step outcomes are for operators, never for the submitter.
#[derive(Debug, Clone)]
pub struct SubmissionReceipt<T> {
    pub record: T,
    pub replayed: bool,
    pub role_grant: RoleGrantOutcome,
    pub notification: NotificationOutcome,
}

impl<T> SubmissionReceipt<T> {
    fn replay(record: T) -> Self {
        Self {
            record,
            replayed: true,
            role_grant: RoleGrantOutcome::NotRequired,
            notification: NotificationOutcome::Skipped,
        }
    }
}

/// Pipeline step a failed submission stopped at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionStep {
    Validation,
    Attachment,
    Upload,
    Persistence,
}

/// What the submitter should do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryAction {
    FixInput,
    RetryLater,
}

impl RecoveryAction {
    pub const fn label(self) -> &'static str {
        match self {
            RecoveryAction::FixInput => "fix_input",
            RecoveryAction::RetryLater => "retry_later",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SubmissionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Attachment(#[from] AttachmentError),
    #[error("resume upload failed: {0}")]
    Upload(#[source] StorageError),
    #[error("submission could not be saved: {0}")]
    Persistence(#[source] RepositoryError),
}

impl SubmissionError {
    pub const fn step(&self) -> SubmissionStep {
        match self {
            SubmissionError::Validation(_) => SubmissionStep::Validation,
            SubmissionError::Attachment(_) => SubmissionStep::Attachment,
            SubmissionError::Upload(_) => SubmissionStep::Upload,
            SubmissionError::Persistence(_) => SubmissionStep::Persistence,
        }
    }

    pub const fn kind(&self) -> &'static str {
        match self {
            SubmissionError::Validation(_) => "validation",
            SubmissionError::Attachment(_) => "attachment",
            SubmissionError::Upload(_) => "upload",
            SubmissionError::Persistence(_) => "persistence",
        }
    }

    pub const fn action(&self) -> RecoveryAction {
        match self {
            SubmissionError::Validation(_) | SubmissionError::Attachment(_) => {
                RecoveryAction::FixInput
            }
            SubmissionError::Upload(_) | SubmissionError::Persistence(_) => {
                RecoveryAction::RetryLater
            }
        }
    }

    /// Message safe to show the submitter. Backend details stay in the logs.
    pub fn user_message(&self) -> String {
        match self {
            SubmissionError::Validation(_) => {
                "Some fields need attention. Please fix them and resubmit.".to_string()
            }
            SubmissionError::Attachment(err) => err.to_string(),
            SubmissionError::Upload(_) | SubmissionError::Persistence(_) => {
                "Submission failed. Please try again later.".to_string()
            }
        }
    }
}

/// Errors for reads and reviews of existing applications.
#[derive(Debug, thiserror::Error)]
pub enum AccessError {
    #[error("application not found")]
    NotFound,
    #[error("identity is not permitted to access this application")]
    Forbidden,
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Roles(#[from] RoleDirectoryError),
}

/// Orchestrates validation, staging, persistence, role grant, and confirmation mail.
pub struct SubmissionService {
    validator: SubmissionValidator,
    config: SubmissionConfig,
    ports: SubmissionPorts,
    clock: Arc<dyn Clock>,
}

impl SubmissionService {
    pub fn new(ports: SubmissionPorts, config: SubmissionConfig) -> Self {
        Self::with_clock(ports, config, Arc::new(SystemClock))
    }

    pub fn with_clock(
        ports: SubmissionPorts,
        config: SubmissionConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            validator: SubmissionValidator,
            config,
            ports,
            clock,
        }
    }

    pub fn config(&self) -> &SubmissionConfig {
        &self.config
    }

    #[instrument(name = "submissions.application", skip_all, fields(owner = %request.owner))]
    pub async fn submit_application(
        &self,
        request: ApplicationRequest,
    ) -> Result<SubmissionReceipt<ApplicationRecord>, SubmissionError> {
        let ApplicationRequest {
            owner,
            form,
            resume,
            idempotency_key,
        } = request;
        let now = self.clock.now();

        let details = self.validator.application(&form)?;
        let staged = resume
            .map(|upload| self.config.attachments.stage(&owner, upload, now))
            .transpose()?;

        let since = now - self.config.idempotency_window;
        if let Some(key) = &idempotency_key {
            let existing = self
                .ports
                .applications
                .find_replay(&owner, key, since)
                .await
                .map_err(|err| persistence_failure("application replay lookup", err, None))?;
            if let Some(record) = existing {
                info!(application_id = %record.id, "duplicate application collapsed onto existing record");
                return Ok(SubmissionReceipt::replay(record));
            }
        }

        let resume = match staged {
            Some(attachment) => Some(self.upload(attachment).await?),
            None => None,
        };

        let record = ApplicationRecord {
            id: ApplicationId(Uuid::new_v4()),
            owner,
            details,
            resume: resume.clone(),
            status: ApplicationStatus::Pending,
            created_at: now,
            idempotency_key: idempotency_key.clone(),
        };
        let stored = match self.ports.applications.insert(record, since).await {
            Ok(stored) => stored,
            Err(err) => {
                let winner = match (&err, &idempotency_key) {
                    // A concurrent request with the same key won the insert.
                    (RepositoryError::Conflict, Some(key)) => {
                        self.concurrent_application(&owner, key, since, resume.as_ref())
                            .await?
                    }
                    _ => None,
                };
                return match winner {
                    Some(record) => Ok(SubmissionReceipt::replay(record)),
                    None => Err(persistence_failure("application insert", err, resume.as_ref())),
                };
            }
        };
        info!(application_id = %stored.id, resume = stored.resume.is_some(), "application accepted");

        let notification = self
            .notify(Notification {
                to: stored.details.email.clone(),
                name: stored.details.full_name.clone(),
                kind: NotificationKind::Application,
                details: BTreeMap::from([
                    ("branch".to_string(), stored.details.branch.label().to_string()),
                    (
                        "interest_area".to_string(),
                        stored.details.interest_area.label().to_string(),
                    ),
                ]),
            })
            .await;

        Ok(SubmissionReceipt {
            record: stored,
            replayed: false,
            role_grant: RoleGrantOutcome::NotRequired,
            notification,
        })
    }

    #[instrument(name = "submissions.job_posting", skip_all, fields(owner = %request.owner))]
    pub async fn submit_job_posting(
        &self,
        request: JobPostingRequest,
    ) -> Result<SubmissionReceipt<JobPostingRecord>, SubmissionError> {
        let JobPostingRequest {
            owner,
            form,
            idempotency_key,
        } = request;
        let now = self.clock.now();

        let details = self.validator.job_posting(&form)?;

        let since = now - self.config.idempotency_window;
        if let Some(key) = &idempotency_key {
            let existing = self
                .ports
                .job_postings
                .find_replay(&owner, key, since)
                .await
                .map_err(|err| persistence_failure("job posting replay lookup", err, None))?;
            if let Some(record) = existing {
                info!(job_posting_id = %record.id, "duplicate job posting collapsed onto existing record");
                return Ok(SubmissionReceipt::replay(record));
            }
        }

        let record = JobPostingRecord {
            id: JobPostingId(Uuid::new_v4()),
            owner,
            details,
            is_active: true,
            created_at: now,
            idempotency_key: idempotency_key.clone(),
        };
        let stored = match self.ports.job_postings.insert(record, since).await {
            Ok(stored) => stored,
            Err(err) => {
                let winner = match (&err, &idempotency_key) {
                    (RepositoryError::Conflict, Some(key)) => self
                        .ports
                        .job_postings
                        .find_replay(&owner, key, since)
                        .await
                        .map_err(|err| persistence_failure("job posting replay lookup", err, None))?,
                    _ => None,
                };
                return match winner {
                    Some(record) => {
                        info!(job_posting_id = %record.id, "concurrent duplicate job posting collapsed onto existing record");
                        Ok(SubmissionReceipt::replay(record))
                    }
                    None => Err(persistence_failure("job posting insert", err, None)),
                };
            }
        };
        info!(job_posting_id = %stored.id, "job posting accepted");

        let role_grant = self.ensure_company_role(&owner).await;

        let mut details = BTreeMap::new();
        details.insert("role".to_string(), stored.details.role.clone());
        details.insert("company".to_string(), stored.details.company_name.clone());
        details.insert(
            "job_type".to_string(),
            stored.details.job_type.label().to_string(),
        );
        if let Some(location) = &stored.details.location {
            details.insert("location".to_string(), location.clone());
        }
        let notification = self
            .notify(Notification {
                to: stored.details.contact_email.clone(),
                name: stored.details.company_name.clone(),
                kind: NotificationKind::JobPosting,
                details,
            })
            .await;

        Ok(SubmissionReceipt {
            record: stored,
            replayed: false,
            role_grant,
            notification,
        })
    }

    /// Fetch an application for its owner or an admin.
    pub async fn application_status(
        &self,
        viewer: &IdentityId,
        id: &ApplicationId,
    ) -> Result<ApplicationRecord, AccessError> {
        let record = self
            .ports
            .applications
            .fetch(id)
            .await?
            .ok_or(AccessError::NotFound)?;

        if record.owner != *viewer && !self.is_admin(viewer).await? {
            return Err(AccessError::Forbidden);
        }
        Ok(record)
    }

    /// Change an application's review status. Admins only.
    #[instrument(
        name = "submissions.review",
        skip_all,
        fields(reviewer = %reviewer, application_id = %id)
    )]
    pub async fn review_application(
        &self,
        reviewer: &IdentityId,
        id: &ApplicationId,
        status: ApplicationStatus,
    ) -> Result<ApplicationRecord, AccessError> {
        if !self.is_admin(reviewer).await? {
            return Err(AccessError::Forbidden);
        }

        let updated = self
            .ports
            .applications
            .update_status(id, status)
            .await
            .map_err(|err| match err {
                RepositoryError::NotFound => AccessError::NotFound,
                other => AccessError::Repository(other),
            })?;
        info!(status = status.label(), "application reviewed");
        Ok(updated)
    }

    /// Find the record that won an insert conflict. `uploaded` is the resume this request
    /// already stored, which nothing references once the winner is returned.
    async fn concurrent_application(
        &self,
        owner: &IdentityId,
        key: &IdempotencyKey,
        since: DateTime<Utc>,
        uploaded: Option<&StorageKey>,
    ) -> Result<Option<ApplicationRecord>, SubmissionError> {
        let existing = self
            .ports
            .applications
            .find_replay(owner, key, since)
            .await
            .map_err(|err| persistence_failure("application replay lookup", err, uploaded))?;

        if let Some(record) = &existing {
            match uploaded {
                Some(orphan) => warn!(
                    application_id = %record.id,
                    orphaned_resume = orphan.as_str(),
                    "concurrent duplicate application collapsed; its resume upload is orphaned"
                ),
                None => info!(
                    application_id = %record.id,
                    "concurrent duplicate application collapsed onto existing record"
                ),
            }
        }
        Ok(existing)
    }

    async fn is_admin(&self, identity: &IdentityId) -> Result<bool, RoleDirectoryError> {
        let roles = self.ports.roles.roles_of(identity).await?;
        Ok(roles.contains(&IdentityRole::Admin))
    }

    async fn upload(
        &self,
        attachment: StagedAttachment,
    ) -> Result<StorageKey, SubmissionError> {
        match self.ports.attachments.upload(&attachment).await {
            Ok(()) => Ok(attachment.key),
            Err(err) => {
                error!(key = attachment.key.as_str(), error = %err, "resume upload failed");
                Err(SubmissionError::Upload(err))
            }
        }
    }

    async fn ensure_company_role(&self, owner: &IdentityId) -> RoleGrantOutcome {
        let roles = match self.ports.roles.roles_of(owner).await {
            Ok(roles) => roles,
            Err(err) => {
                error!(identity = %owner, error = %err, "role lookup failed; company role not granted");
                return RoleGrantOutcome::Failed(err.to_string());
            }
        };

        if roles.iter().any(|role| role.is_elevated()) {
            return RoleGrantOutcome::AlreadyHeld;
        }

        match self.ports.roles.grant(owner, IdentityRole::Company).await {
            Ok(()) => {
                info!(identity = %owner, "company role granted");
                RoleGrantOutcome::Granted
            }
            Err(err) => {
                error!(identity = %owner, error = %err, "company role grant failed; posting kept");
                RoleGrantOutcome::Failed(err.to_string())
            }
        }
    }

    async fn notify(&self, notification: Notification) -> NotificationOutcome {
        match self.ports.notifications.send(&notification).await {
            Ok(()) => NotificationOutcome::Sent,
            Err(err) => {
                warn!(kind = notification.kind.label(), error = %err, "confirmation email failed");
                NotificationOutcome::Failed(err.to_string())
            }
        }
    }
}

/// Log a persistence failure. `orphaned` is a resume already uploaded for the lost record.
fn persistence_failure(
    operation: &'static str,
    err: RepositoryError,
    orphaned: Option<&StorageKey>,
) -> SubmissionError {
    match orphaned {
        Some(key) => error!(
            operation,
            error = %err,
            orphaned_resume = key.as_str(),
            "submission persistence failed; uploaded resume left orphaned"
        ),
        None => error!(operation, error = %err, "submission persistence failed"),
    }
    SubmissionError::Persistence(err)
}
