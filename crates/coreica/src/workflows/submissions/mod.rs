//! Applicant and job posting intake.
//!
//! A submission runs validate, stage attachment, upload, persist, grant role (job postings
//! only), then notify. Everything up to persistence is fatal and reported to the submitter
//! with a recovery action; the role grant and confirmation mail are best effort and only
//! logged when they fail.

pub mod attachment;
pub mod domain;
pub mod notification;
pub mod repository;
pub mod router;
pub mod service;
pub mod storage;
pub(crate) mod validation;

#[cfg(test)]
mod tests;

pub use attachment::{
    AttachmentError, AttachmentPolicy, ResumeUpload, StagedAttachment, MAX_RESUME_BYTES,
    RESUME_EXTENSIONS,
};
pub use domain::{
    ApplicantDetails, ApplicationForm, ApplicationId, ApplicationRecord, ApplicationStatus,
    ApplicationStatusView, Branch, IdempotencyKey, IdentityId, IdentityRole, InterestArea,
    JobPostingDetails, JobPostingForm, JobPostingId, JobPostingRecord, JobType, StorageKey,
    YearOfStudy,
};
pub use notification::{
    DispatchError, EmailTemplates, LogDispatcher, Notification, NotificationDispatcher,
    NotificationKind, RenderedEmail, ResendDispatcher,
};
pub use repository::{
    ApplicationRepository, AttachmentStore, JobPostingRepository, RepositoryError,
    RoleDirectory, RoleDirectoryError, StorageError,
};
pub use router::{
    submission_router, AuthenticatedIdentity, IDEMPOTENCY_HEADER, IDENTITY_HEADER,
};
pub use service::{
    AccessError, ApplicationRequest, Clock, JobPostingRequest, NotificationOutcome,
    RecoveryAction, RoleGrantOutcome, SubmissionConfig, SubmissionError, SubmissionPorts,
    SubmissionReceipt, SubmissionService, SubmissionStep, SystemClock,
};
pub use storage::LocalAttachmentStore;
pub use validation::{FieldViolation, SubmissionValidator, ValidationError, ViolationReason};
