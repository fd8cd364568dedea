use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use coreica::workflows::submissions::{
    ApplicationId, ApplicationRecord, ApplicationRepository, ApplicationStatus, AttachmentStore,
    IdempotencyKey, IdentityId, IdentityRole, JobPostingId, JobPostingRecord,
    JobPostingRepository, RepositoryError, RoleDirectory, RoleDirectoryError, StagedAttachment,
    StorageError,
};
use metrics_exporter_prometheus::PrometheusHandle;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryApplicationRepository {
    records: Arc<Mutex<HashMap<ApplicationId, ApplicationRecord>>>,
}

#[async_trait]
impl ApplicationRepository for InMemoryApplicationRepository {
    async fn insert(
        &self,
        record: ApplicationRecord,
        replay_since: DateTime<Utc>,
    ) -> Result<ApplicationRecord, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
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
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    async fn update_status(
        &self,
        id: &ApplicationId,
        status: ApplicationStatus,
    ) -> Result<ApplicationRecord, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        match guard.get_mut(id) {
            Some(record) => {
                record.status = status;
                Ok(record.clone())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    async fn find_replay(
        &self,
        owner: &IdentityId,
        key: &IdempotencyKey,
        since: DateTime<Utc>,
    ) -> Result<Option<ApplicationRecord>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard
            .values()
            .filter(|record| record.matches_replay(owner, key, since))
            .max_by_key(|record| record.created_at)
            .cloned())
    }
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryJobPostingRepository {
    records: Arc<Mutex<HashMap<JobPostingId, JobPostingRecord>>>,
}

impl InMemoryJobPostingRepository {
    pub(crate) fn active(&self) -> Vec<JobPostingRecord> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        guard
            .values()
            .filter(|record| record.is_active)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl JobPostingRepository for InMemoryJobPostingRepository {
    async fn insert(
        &self,
        record: JobPostingRecord,
        replay_since: DateTime<Utc>,
    ) -> Result<JobPostingRecord, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
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
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    async fn find_replay(
        &self,
        owner: &IdentityId,
        key: &IdempotencyKey,
        since: DateTime<Utc>,
    ) -> Result<Option<JobPostingRecord>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard
            .values()
            .filter(|record| record.matches_replay(owner, key, since))
            .max_by_key(|record| record.created_at)
            .cloned())
    }
}

/// Role assignments kept in process; admins are seeded from configuration.
#[derive(Default, Clone)]
pub(crate) struct InMemoryRoleDirectory {
    roles: Arc<Mutex<HashMap<IdentityId, Vec<IdentityRole>>>>,
}

impl InMemoryRoleDirectory {
    pub(crate) fn with_admins(admins: impl IntoIterator<Item = IdentityId>) -> Self {
        let roles = admins
            .into_iter()
            .map(|identity| (identity, vec![IdentityRole::Admin]))
            .collect();
        Self {
            roles: Arc::new(Mutex::new(roles)),
        }
    }
}

#[async_trait]
impl RoleDirectory for InMemoryRoleDirectory {
    async fn roles_of(
        &self,
        identity: &IdentityId,
    ) -> Result<Vec<IdentityRole>, RoleDirectoryError> {
        let guard = self.roles.lock().expect("role mutex poisoned");
        Ok(guard.get(identity).cloned().unwrap_or_default())
    }

    async fn grant(
        &self,
        identity: &IdentityId,
        role: IdentityRole,
    ) -> Result<(), RoleDirectoryError> {
        let mut guard = self.roles.lock().expect("role mutex poisoned");
        let held = guard.entry(*identity).or_default();
        if !held.contains(&role) {
            held.push(role);
        }
        Ok(())
    }
}

/// Attachment store for the demo; keeps staged files in memory.
#[derive(Default, Clone)]
pub(crate) struct InMemoryAttachmentStore {
    objects: Arc<Mutex<HashMap<String, StagedAttachment>>>,
}

impl InMemoryAttachmentStore {
    pub(crate) fn keys(&self) -> Vec<String> {
        let guard = self.objects.lock().expect("attachment mutex poisoned");
        let mut keys: Vec<String> = guard.keys().cloned().collect();
        keys.sort();
        keys
    }
}

#[async_trait]
impl AttachmentStore for InMemoryAttachmentStore {
    async fn upload(&self, attachment: &StagedAttachment) -> Result<(), StorageError> {
        let mut guard = self.objects.lock().expect("attachment mutex poisoned");
        if guard.contains_key(attachment.key.as_str()) {
            return Err(StorageError::Conflict(attachment.key.0.clone()));
        }
        guard.insert(attachment.key.0.clone(), attachment.clone());
        Ok(())
    }
}
