use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::response::Response;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;
use uuid::Uuid;

use crate::workflows::submissions::attachment::{ResumeUpload, StagedAttachment};
use crate::workflows::submissions::domain::{
    ApplicationForm, ApplicationId, ApplicationRecord, ApplicationStatus, IdempotencyKey,
    IdentityId, IdentityRole, JobPostingForm, JobPostingId, JobPostingRecord,
};
use crate::workflows::submissions::notification::{
    DispatchError, Notification, NotificationDispatcher,
};
use crate::workflows::submissions::repository::{
    ApplicationRepository, AttachmentStore, JobPostingRepository, RepositoryError,
    RoleDirectory, RoleDirectoryError, StorageError,
};
use crate::workflows::submissions::service::{
    Clock, SubmissionConfig, SubmissionPorts, SubmissionService,
};

pub(super) fn submitted_at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 10, 1, 9, 30, 0)
        .single()
        .expect("valid instant")
}

pub(super) fn applicant() -> IdentityId {
    IdentityId(Uuid::from_u128(0x1111_0000_0000_4000_8000_0000_0000_0001))
}

pub(super) fn recruiter() -> IdentityId {
    IdentityId(Uuid::from_u128(0x2222_0000_0000_4000_8000_0000_0000_0002))
}

pub(super) fn admin() -> IdentityId {
    IdentityId(Uuid::from_u128(0x3333_0000_0000_4000_8000_0000_0000_0003))
}

pub(super) fn application_form() -> ApplicationForm {
    ApplicationForm {
        full_name: "Asha Rao".to_string(),
        email: "asha@example.com".to_string(),
        branch: "Mechanical Engineering".to_string(),
        interest_area: "Manufacturing & Production".to_string(),
        ..ApplicationForm::default()
    }
}

pub(super) fn job_posting_form() -> JobPostingForm {
    JobPostingForm {
        company_name: "Acme Forge".to_string(),
        role: "Design Intern".to_string(),
        job_type: "internship".to_string(),
        description: "Support the R&D lab".to_string(),
        contact_email: "hr@acme.test".to_string(),
        ..JobPostingForm::default()
    }
}

pub(super) fn resume(file_name: &str, size: usize) -> ResumeUpload {
    ResumeUpload::new(file_name, vec![b'%'; size])
}

pub(super) fn key(raw: &str) -> IdempotencyKey {
    IdempotencyKey(raw.to_string())
}

#[derive(Debug, Clone, Copy)]
pub(super) struct FixedClock(pub(super) DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryApplications {
    records: Arc<Mutex<HashMap<ApplicationId, ApplicationRecord>>>,
}

impl MemoryApplications {
    pub(super) fn records(&self) -> Vec<ApplicationRecord> {
        self.records
            .lock()
            .expect("application mutex poisoned")
            .values()
            .cloned()
            .collect()
    }
}

#[async_trait]
impl ApplicationRepository for MemoryApplications {
    async fn insert(
        &self,
        record: ApplicationRecord,
        replay_since: DateTime<Utc>,
    ) -> Result<ApplicationRecord, RepositoryError> {
        let mut guard = self.records.lock().expect("application mutex poisoned");
        let duplicate = record.idempotency_key.as_ref().is_some_and(|key| {
            guard
                .values()
                .any(|existing| existing.matches_replay(&record.owner, key, replay_since))
        });
        if duplicate || guard.contains_key(&record.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(record.id, record.clone());
        Ok(record)
    }

    async fn fetch(
        &self,
        id: &ApplicationId,
    ) -> Result<Option<ApplicationRecord>, RepositoryError> {
        let guard = self.records.lock().expect("application mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    async fn update_status(
        &self,
        id: &ApplicationId,
        status: ApplicationStatus,
    ) -> Result<ApplicationRecord, RepositoryError> {
        let mut guard = self.records.lock().expect("application mutex poisoned");
        let record = guard.get_mut(id).ok_or(RepositoryError::NotFound)?;
        record.status = status;
        Ok(record.clone())
    }

    async fn find_replay(
        &self,
        owner: &IdentityId,
        key: &IdempotencyKey,
        since: DateTime<Utc>,
    ) -> Result<Option<ApplicationRecord>, RepositoryError> {
        let guard = self.records.lock().expect("application mutex poisoned");
        Ok(guard
            .values()
            .filter(|record| record.matches_replay(owner, key, since))
            .max_by_key(|record| record.created_at)
            .cloned())
    }
}

/// Delegates to [`MemoryApplications`] but yields before every call, so concurrent
/// submissions interleave the way they would around a database round trip.
#[derive(Default, Clone)]
pub(super) struct SlowApplications(pub(super) MemoryApplications);

#[async_trait]
impl ApplicationRepository for SlowApplications {
    async fn insert(
        &self,
        record: ApplicationRecord,
        replay_since: DateTime<Utc>,
    ) -> Result<ApplicationRecord, RepositoryError> {
        tokio::task::yield_now().await;
        self.0.insert(record, replay_since).await
    }

    async fn fetch(
        &self,
        id: &ApplicationId,
    ) -> Result<Option<ApplicationRecord>, RepositoryError> {
        tokio::task::yield_now().await;
        self.0.fetch(id).await
    }

    async fn update_status(
        &self,
        id: &ApplicationId,
        status: ApplicationStatus,
    ) -> Result<ApplicationRecord, RepositoryError> {
        tokio::task::yield_now().await;
        self.0.update_status(id, status).await
    }

    async fn find_replay(
        &self,
        owner: &IdentityId,
        key: &IdempotencyKey,
        since: DateTime<Utc>,
    ) -> Result<Option<ApplicationRecord>, RepositoryError> {
        tokio::task::yield_now().await;
        self.0.find_replay(owner, key, since).await
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryJobPostings {
    records: Arc<Mutex<HashMap<JobPostingId, JobPostingRecord>>>,
}

impl MemoryJobPostings {
    pub(super) fn records(&self) -> Vec<JobPostingRecord> {
        self.records
            .lock()
            .expect("job posting mutex poisoned")
            .values()
            .cloned()
            .collect()
    }
}

#[async_trait]
impl JobPostingRepository for MemoryJobPostings {
    async fn insert(
        &self,
        record: JobPostingRecord,
        replay_since: DateTime<Utc>,
    ) -> Result<JobPostingRecord, RepositoryError> {
        let mut guard = self.records.lock().expect("job posting mutex poisoned");
        let duplicate = record.idempotency_key.as_ref().is_some_and(|key| {
            guard
                .values()
                .any(|existing| existing.matches_replay(&record.owner, key, replay_since))
        });
        if duplicate || guard.contains_key(&record.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(record.id, record.clone());
        Ok(record)
    }

    async fn fetch(&self, id: &JobPostingId) -> Result<Option<JobPostingRecord>, RepositoryError> {
        let guard = self.records.lock().expect("job posting mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    async fn find_replay(
        &self,
        owner: &IdentityId,
        key: &IdempotencyKey,
        since: DateTime<Utc>,
    ) -> Result<Option<JobPostingRecord>, RepositoryError> {
        let guard = self.records.lock().expect("job posting mutex poisoned");
        Ok(guard
            .values()
            .filter(|record| record.matches_replay(owner, key, since))
            .max_by_key(|record| record.created_at)
            .cloned())
    }
}

pub(super) struct UnavailableRepository;

#[async_trait]
impl ApplicationRepository for UnavailableRepository {
    async fn insert(
        &self,
        _record: ApplicationRecord,
        _replay_since: DateTime<Utc>,
    ) -> Result<ApplicationRecord, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    async fn fetch(
        &self,
        _id: &ApplicationId,
    ) -> Result<Option<ApplicationRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    async fn update_status(
        &self,
        _id: &ApplicationId,
        _status: ApplicationStatus,
    ) -> Result<ApplicationRecord, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    async fn find_replay(
        &self,
        _owner: &IdentityId,
        _key: &IdempotencyKey,
        _since: DateTime<Utc>,
    ) -> Result<Option<ApplicationRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

#[async_trait]
impl JobPostingRepository for UnavailableRepository {
    async fn insert(
        &self,
        _record: JobPostingRecord,
        _replay_since: DateTime<Utc>,
    ) -> Result<JobPostingRecord, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    async fn fetch(&self, _id: &JobPostingId) -> Result<Option<JobPostingRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    async fn find_replay(
        &self,
        _owner: &IdentityId,
        _key: &IdempotencyKey,
        _since: DateTime<Utc>,
    ) -> Result<Option<JobPostingRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryRoles {
    roles: Arc<Mutex<HashMap<IdentityId, Vec<IdentityRole>>>>,
    grants: Arc<Mutex<Vec<(IdentityId, IdentityRole)>>>,
}

impl MemoryRoles {
    pub(super) fn with_role(self, identity: IdentityId, role: IdentityRole) -> Self {
        self.roles
            .lock()
            .expect("role mutex poisoned")
            .entry(identity)
            .or_default()
            .push(role);
        self
    }

    pub(super) fn grants(&self) -> Vec<(IdentityId, IdentityRole)> {
        self.grants.lock().expect("grant mutex poisoned").clone()
    }
}

#[async_trait]
impl RoleDirectory for MemoryRoles {
    async fn roles_of(&self, identity: &IdentityId) -> Result<Vec<IdentityRole>, RoleDirectoryError> {
        let guard = self.roles.lock().expect("role mutex poisoned");
        Ok(guard.get(identity).cloned().unwrap_or_default())
    }

    async fn grant(&self, identity: &IdentityId, role: IdentityRole) -> Result<(), RoleDirectoryError> {
        self.roles
            .lock()
            .expect("role mutex poisoned")
            .entry(*identity)
            .or_default()
            .push(role);
        self.grants
            .lock()
            .expect("grant mutex poisoned")
            .push((*identity, role));
        Ok(())
    }
}

/// Directory that answers lookups but refuses every grant.
pub(super) struct ReadOnlyRoles;

#[async_trait]
impl RoleDirectory for ReadOnlyRoles {
    async fn roles_of(&self, _identity: &IdentityId) -> Result<Vec<IdentityRole>, RoleDirectoryError> {
        Ok(Vec::new())
    }

    async fn grant(&self, _identity: &IdentityId, _role: IdentityRole) -> Result<(), RoleDirectoryError> {
        Err(RoleDirectoryError::Unavailable("identity provider timeout".to_string()))
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryAttachments {
    uploads: Arc<Mutex<Vec<StagedAttachment>>>,
}

impl MemoryAttachments {
    pub(super) fn uploads(&self) -> Vec<StagedAttachment> {
        self.uploads.lock().expect("upload mutex poisoned").clone()
    }
}

#[async_trait]
impl AttachmentStore for MemoryAttachments {
    async fn upload(&self, attachment: &StagedAttachment) -> Result<(), StorageError> {
        let mut guard = self.uploads.lock().expect("upload mutex poisoned");
        if guard.iter().any(|existing| existing.key == attachment.key) {
            return Err(StorageError::Conflict(attachment.key.0.clone()));
        }
        guard.push(attachment.clone());
        Ok(())
    }
}

pub(super) struct OfflineAttachments;

#[async_trait]
impl AttachmentStore for OfflineAttachments {
    async fn upload(&self, _attachment: &StagedAttachment) -> Result<(), StorageError> {
        Err(StorageError::Unavailable("bucket unreachable".to_string()))
    }
}

#[derive(Default, Clone)]
pub(super) struct RecordingDispatcher {
    sent: Arc<Mutex<Vec<Notification>>>,
}

impl RecordingDispatcher {
    pub(super) fn sent(&self) -> Vec<Notification> {
        self.sent.lock().expect("dispatch mutex poisoned").clone()
    }
}

#[async_trait]
impl NotificationDispatcher for RecordingDispatcher {
    async fn send(&self, notification: &Notification) -> Result<(), DispatchError> {
        self.sent
            .lock()
            .expect("dispatch mutex poisoned")
            .push(notification.clone());
        Ok(())
    }
}

pub(super) struct FailingDispatcher;

#[async_trait]
impl NotificationDispatcher for FailingDispatcher {
    async fn send(&self, _notification: &Notification) -> Result<(), DispatchError> {
        Err(DispatchError::Rejected {
            status: 500,
            body: "provider down".to_string(),
        })
    }
}

/// Shared buffer a fmt subscriber writes log lines into.
#[derive(Default, Clone)]
pub(super) struct LogCapture(Arc<Mutex<Vec<u8>>>);

impl LogCapture {
    pub(super) fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().expect("log mutex poisoned")).into_owned()
    }
}

impl std::io::Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0
            .lock()
            .expect("log mutex poisoned")
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for LogCapture {
    type Writer = LogCapture;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// In-memory collaborators plus the ports bundle that points at them.
pub(super) struct Harness {
    pub(super) applications: MemoryApplications,
    pub(super) job_postings: MemoryJobPostings,
    pub(super) roles: MemoryRoles,
    pub(super) attachments: MemoryAttachments,
    pub(super) notifications: RecordingDispatcher,
    pub(super) ports: SubmissionPorts,
}

impl Harness {
    pub(super) fn new() -> Self {
        let applications = MemoryApplications::default();
        let job_postings = MemoryJobPostings::default();
        let roles = MemoryRoles::default().with_role(admin(), IdentityRole::Admin);
        let attachments = MemoryAttachments::default();
        let notifications = RecordingDispatcher::default();
        let ports = SubmissionPorts {
            applications: Arc::new(applications.clone()),
            job_postings: Arc::new(job_postings.clone()),
            roles: Arc::new(roles.clone()),
            attachments: Arc::new(attachments.clone()),
            notifications: Arc::new(notifications.clone()),
        };

        Self {
            applications,
            job_postings,
            roles,
            attachments,
            notifications,
            ports,
        }
    }

    pub(super) fn service(&self) -> SubmissionService {
        self.service_at(submitted_at())
    }

    pub(super) fn service_at(&self, now: DateTime<Utc>) -> SubmissionService {
        SubmissionService::with_clock(
            self.ports.clone(),
            SubmissionConfig::default(),
            Arc::new(FixedClock(now)),
        )
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
