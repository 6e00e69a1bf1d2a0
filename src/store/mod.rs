// src/store/mod.rs

//! Persistence seam for jobs, tracking links and email references.
//!
//! Reads that tolerate a moving corpus go straight through [`JobStore`]. Anything
//! that writes goes through a [`UnitOfWork`] obtained from [`JobStore::begin`]:
//! either every change in it is committed, or none is. Dropping a unit of work
//! without committing discards its changes.

pub mod memory;
pub mod postgres;

use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

use crate::models::{EmailReference, Job, JobId, NewJob, UserId, UserJobLink};

pub use memory::{FailPoint, MemoryJobStore};
pub use postgres::PgJobStore;

#[async_trait]
pub trait JobStore: Send + Sync {
    async fn get_job(&self, id: JobId) -> Result<Option<Job>>;

    /// Every job, ordered by id
    async fn list_jobs(&self) -> Result<Vec<Job>>;

    /// Jobs whose title contains `title` (case-insensitive), ordered by id
    async fn search_jobs_by_title(&self, title: &str, limit: i64) -> Result<Vec<Job>>;

    async fn begin(&self) -> Result<Box<dyn UnitOfWork>>;
}

#[async_trait]
pub trait UnitOfWork: Send {
    // --- jobs ---
    async fn get_job(&mut self, id: JobId) -> Result<Option<Job>>;

    /// Like `get_job`, but holds the row against concurrent writers until the
    /// unit of work ends.
    async fn get_job_for_update(&mut self, id: JobId) -> Result<Option<Job>>;

    async fn create_job(&mut self, job: &NewJob) -> Result<Job>;

    /// Compare-and-delete: removes the job only if it is still there.
    /// Returns whether a row was removed.
    async fn delete_job_if_exists(&mut self, id: JobId) -> Result<bool>;

    // --- user job links ---
    async fn get_link(&mut self, user_id: &UserId, job_id: JobId) -> Result<Option<UserJobLink>>;

    async fn list_links_for_job(&mut self, job_id: JobId) -> Result<Vec<UserJobLink>>;

    /// Fails if a link for the same (user, job) already exists.
    async fn create_link(&mut self, link: &UserJobLink) -> Result<()>;

    /// Writes status and updated_at of an existing link.
    async fn update_link(&mut self, link: &UserJobLink) -> Result<()>;

    async fn delete_link(&mut self, user_id: &UserId, job_id: JobId) -> Result<bool>;

    // --- external references ---
    async fn get_reference(&mut self, id: Uuid) -> Result<Option<EmailReference>>;

    async fn list_references_for_job(&mut self, job_id: JobId) -> Result<Vec<EmailReference>>;

    async fn repoint_reference(&mut self, id: Uuid, job_id: JobId) -> Result<()>;

    // --- completion ---
    async fn commit(self: Box<Self>) -> Result<()>;

    async fn rollback(self: Box<Self>) -> Result<()>;
}
