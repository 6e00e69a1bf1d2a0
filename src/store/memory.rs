// src/store/memory.rs

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use log::trace;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use crate::models::{EmailReference, Job, JobId, JobStatus, NewJob, UserId, UserJobLink};
use crate::store::{JobStore, UnitOfWork};

/// Store operations that can be made to fail, to exercise rollback paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailPoint {
    CreateJob,
    CreateLink,
    UpdateLink,
    DeleteLink,
    RepointReference,
    DeleteJob,
    Commit,
}

#[derive(Debug, Clone, Default)]
struct MemoryState {
    jobs: BTreeMap<JobId, Job>,
    links: BTreeMap<(JobId, UserId), UserJobLink>,
    references: BTreeMap<Uuid, EmailReference>,
    last_job_id: i64,
}

/// In-process job store.
///
/// A unit of work holds the whole store exclusively and applies its changes to a
/// private copy, published on commit. Every trait call bumps a counter so tests
/// can assert how much of the store was touched.
#[derive(Clone, Default)]
pub struct MemoryJobStore {
    state: Arc<Mutex<MemoryState>>,
    calls: Arc<AtomicUsize>,
    fail_point: Arc<std::sync::Mutex<Option<FailPoint>>>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of store calls made so far (seeding and inspection not included)
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Make the given operation fail in every unit of work begun afterwards.
    pub fn fail_at(&self, point: Option<FailPoint>) {
        let mut guard = self
            .fail_point
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = point;
    }

    fn current_fail_point(&self) -> Option<FailPoint> {
        *self
            .fail_point
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn record_call(&self, op: &str) {
        trace!("memory store: {}", op);
        self.calls.fetch_add(1, Ordering::SeqCst);
    }

    // --- seeding and inspection ---

    pub async fn add_job(&self, id: i64, title: &str, business_name: &str) -> Job {
        let now = Utc::now().naive_utc();
        let job = Job {
            id: JobId(id),
            title: title.to_string(),
            business_name: business_name.to_string(),
            location: None,
            pay: None,
            job_type: None,
            description: None,
            posted_date: None,
            created_at: now,
            updated_at: now,
        };
        let mut state = self.state.lock().await;
        state.last_job_id = state.last_job_id.max(id);
        state.jobs.insert(job.id, job.clone());
        job
    }

    pub async fn add_link(
        &self,
        user_id: &str,
        job_id: i64,
        status: JobStatus,
        created_at: NaiveDateTime,
    ) -> UserJobLink {
        let link = UserJobLink {
            user_id: UserId(user_id.to_string()),
            job_id: JobId(job_id),
            status,
            created_at,
            updated_at: created_at,
        };
        let mut state = self.state.lock().await;
        state
            .links
            .insert((link.job_id, link.user_id.clone()), link.clone());
        link
    }

    pub async fn add_reference(&self, user_id: &str, matched_job_id: Option<i64>) -> Uuid {
        let reference = EmailReference {
            id: Uuid::new_v4(),
            user_id: UserId(user_id.to_string()),
            matched_job_id: matched_job_id.map(JobId),
        };
        let id = reference.id;
        self.state.lock().await.references.insert(id, reference);
        id
    }

    pub async fn job(&self, id: i64) -> Option<Job> {
        self.state.lock().await.jobs.get(&JobId(id)).cloned()
    }

    pub async fn job_count(&self) -> usize {
        self.state.lock().await.jobs.len()
    }

    pub async fn link(&self, user_id: &str, job_id: i64) -> Option<UserJobLink> {
        self.state
            .lock()
            .await
            .links
            .get(&(JobId(job_id), UserId(user_id.to_string())))
            .cloned()
    }

    pub async fn links_for_job(&self, job_id: i64) -> Vec<UserJobLink> {
        self.state
            .lock()
            .await
            .links
            .values()
            .filter(|l| l.job_id == JobId(job_id))
            .cloned()
            .collect()
    }

    pub async fn reference(&self, id: Uuid) -> Option<EmailReference> {
        self.state.lock().await.references.get(&id).cloned()
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn get_job(&self, id: JobId) -> Result<Option<Job>> {
        self.record_call("get_job");
        Ok(self.state.lock().await.jobs.get(&id).cloned())
    }

    async fn list_jobs(&self) -> Result<Vec<Job>> {
        self.record_call("list_jobs");
        Ok(self.state.lock().await.jobs.values().cloned().collect())
    }

    async fn search_jobs_by_title(&self, title: &str, limit: i64) -> Result<Vec<Job>> {
        self.record_call("search_jobs_by_title");
        let needle = title.to_lowercase();
        let limit = usize::try_from(limit).unwrap_or(0);
        Ok(self
            .state
            .lock()
            .await
            .jobs
            .values()
            .filter(|job| job.title.to_lowercase().contains(&needle))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn begin(&self) -> Result<Box<dyn UnitOfWork>> {
        self.record_call("begin");
        let guard = self.state.clone().lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(MemoryUnitOfWork {
            guard,
            working,
            store: self.clone(),
            fail_point: self.current_fail_point(),
        }))
    }
}

pub struct MemoryUnitOfWork {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
    store: MemoryJobStore,
    fail_point: Option<FailPoint>,
}

impl MemoryUnitOfWork {
    fn enter(&self, op: &str, point: Option<FailPoint>) -> Result<()> {
        self.store.record_call(op);
        match (point, self.fail_point) {
            (Some(p), Some(f)) if p == f => Err(anyhow!("Injected failure at {:?}", p)),
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl UnitOfWork for MemoryUnitOfWork {
    async fn get_job(&mut self, id: JobId) -> Result<Option<Job>> {
        self.enter("get_job", None)?;
        Ok(self.working.jobs.get(&id).cloned())
    }

    async fn get_job_for_update(&mut self, id: JobId) -> Result<Option<Job>> {
        // the unit of work already holds the whole store
        self.enter("get_job_for_update", None)?;
        Ok(self.working.jobs.get(&id).cloned())
    }

    async fn create_job(&mut self, job: &NewJob) -> Result<Job> {
        self.enter("create_job", Some(FailPoint::CreateJob))?;
        let now = Utc::now().naive_utc();
        self.working.last_job_id += 1;
        let created = Job {
            id: JobId(self.working.last_job_id),
            title: job.title.clone(),
            business_name: job.business_name.clone(),
            location: job.location.clone(),
            pay: job.pay.clone(),
            job_type: job.job_type.clone(),
            description: job.description.clone(),
            posted_date: job.posted_date,
            created_at: now,
            updated_at: now,
        };
        self.working.jobs.insert(created.id, created.clone());
        Ok(created)
    }

    async fn delete_job_if_exists(&mut self, id: JobId) -> Result<bool> {
        self.enter("delete_job_if_exists", Some(FailPoint::DeleteJob))?;
        if self.working.links.keys().any(|(job_id, _)| *job_id == id) {
            return Err(anyhow!("Job {} is still referenced by user links", id));
        }
        Ok(self.working.jobs.remove(&id).is_some())
    }

    async fn get_link(&mut self, user_id: &UserId, job_id: JobId) -> Result<Option<UserJobLink>> {
        self.enter("get_link", None)?;
        Ok(self.working.links.get(&(job_id, user_id.clone())).cloned())
    }

    async fn list_links_for_job(&mut self, job_id: JobId) -> Result<Vec<UserJobLink>> {
        self.enter("list_links_for_job", None)?;
        Ok(self
            .working
            .links
            .values()
            .filter(|l| l.job_id == job_id)
            .cloned()
            .collect())
    }

    async fn create_link(&mut self, link: &UserJobLink) -> Result<()> {
        self.enter("create_link", Some(FailPoint::CreateLink))?;
        if !self.working.jobs.contains_key(&link.job_id) {
            return Err(anyhow!("Job {} does not exist", link.job_id));
        }
        let key = (link.job_id, link.user_id.clone());
        if self.working.links.contains_key(&key) {
            return Err(anyhow!(
                "Link ({}, {}) already exists",
                link.user_id,
                link.job_id
            ));
        }
        self.working.links.insert(key, link.clone());
        Ok(())
    }

    async fn update_link(&mut self, link: &UserJobLink) -> Result<()> {
        self.enter("update_link", Some(FailPoint::UpdateLink))?;
        let existing = self
            .working
            .links
            .get_mut(&(link.job_id, link.user_id.clone()))
            .ok_or_else(|| {
                anyhow!(
                    "Link ({}, {}) not found for update",
                    link.user_id,
                    link.job_id
                )
            })?;
        existing.status = link.status;
        existing.updated_at = link.updated_at;
        Ok(())
    }

    async fn delete_link(&mut self, user_id: &UserId, job_id: JobId) -> Result<bool> {
        self.enter("delete_link", Some(FailPoint::DeleteLink))?;
        Ok(self
            .working
            .links
            .remove(&(job_id, user_id.clone()))
            .is_some())
    }

    async fn get_reference(&mut self, id: Uuid) -> Result<Option<EmailReference>> {
        self.enter("get_reference", None)?;
        Ok(self.working.references.get(&id).cloned())
    }

    async fn list_references_for_job(&mut self, job_id: JobId) -> Result<Vec<EmailReference>> {
        self.enter("list_references_for_job", None)?;
        Ok(self
            .working
            .references
            .values()
            .filter(|r| r.matched_job_id == Some(job_id))
            .cloned()
            .collect())
    }

    async fn repoint_reference(&mut self, id: Uuid, job_id: JobId) -> Result<()> {
        self.enter("repoint_reference", Some(FailPoint::RepointReference))?;
        let reference = self
            .working
            .references
            .get_mut(&id)
            .ok_or_else(|| anyhow!("Analyzed email {} not found for repoint", id))?;
        reference.matched_job_id = Some(job_id);
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        self.enter("commit", Some(FailPoint::Commit))?;
        let MemoryUnitOfWork {
            mut guard, working, ..
        } = *self;
        *guard = working;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        self.enter("rollback", None)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_uncommitted_changes_are_discarded() -> Result<()> {
        let store = MemoryJobStore::new();
        store.add_job(1, "Engineer", "Acme").await;

        let mut uow = store.begin().await?;
        assert!(uow.delete_job_if_exists(JobId(1)).await?);
        drop(uow);

        assert!(store.job(1).await.is_some());
        Ok(())
    }

    #[tokio::test]
    async fn test_commit_publishes_changes() -> Result<()> {
        let store = MemoryJobStore::new();
        store.add_job(1, "Engineer", "Acme").await;

        let mut uow = store.begin().await?;
        let created = uow.create_job(&NewJob::new("Designer", "Globex")).await?;
        assert_eq!(created.id, JobId(2));
        uow.commit().await?;

        assert_eq!(store.job(2).await.map(|j| j.title), Some("Designer".into()));
        Ok(())
    }

    #[tokio::test]
    async fn test_duplicate_link_is_refused() -> Result<()> {
        let store = MemoryJobStore::new();
        store.add_job(1, "Engineer", "Acme").await;
        let now = Utc::now().naive_utc();
        let link = store.add_link("u1", 1, JobStatus::Applied, now).await;

        let mut uow = store.begin().await?;
        assert!(uow.create_link(&link).await.is_err());
        Ok(())
    }

    #[tokio::test]
    async fn test_title_search_is_case_insensitive_and_bounded() -> Result<()> {
        let store = MemoryJobStore::new();
        store.add_job(1, "Senior Rust Engineer", "Acme").await;
        store.add_job(2, "Rust engineer", "Globex").await;
        store.add_job(3, "Accountant", "Initech").await;

        let hits = store.search_jobs_by_title("RUST ENGINEER", 10).await?;
        assert_eq!(hits.iter().map(|j| j.id.0).collect::<Vec<_>>(), vec![1, 2]);

        let bounded = store.search_jobs_by_title("engineer", 1).await?;
        assert_eq!(bounded.len(), 1);
        Ok(())
    }
}
