// src/store/postgres.rs

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use bb8::PooledConnection;
use bb8_postgres::PostgresConnectionManager;
use chrono::Utc;
use log::{debug, warn};
use tokio_postgres::{Client, NoTls, Row as PgRow};
use uuid::Uuid;

use crate::db::PgPool;
use crate::models::{EmailReference, Job, JobId, JobStatus, NewJob, UserId, UserJobLink};
use crate::store::{JobStore, UnitOfWork};

type PgConnection = PooledConnection<'static, PostgresConnectionManager<NoTls>>;

const JOB_COLUMNS: &str = "id, title, business_name, location, pay, job_type, description, \
                           posted_date, created_at, updated_at";
const LINK_COLUMNS: &str = "user_id, job_id, status, created_at, updated_at";
const REFERENCE_COLUMNS: &str = "id, user_id, matched_job_id";

fn job_from_row(row: &PgRow) -> Result<Job> {
    Ok(Job {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        business_name: row.try_get("business_name")?,
        location: row.try_get("location")?,
        pay: row.try_get("pay")?,
        job_type: row.try_get("job_type")?,
        description: row.try_get("description")?,
        posted_date: row.try_get("posted_date")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn link_from_row(row: &PgRow) -> Result<UserJobLink> {
    let status: String = row.try_get("status")?;
    Ok(UserJobLink {
        user_id: row.try_get("user_id")?,
        job_id: row.try_get("job_id")?,
        status: status.parse::<JobStatus>()?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn reference_from_row(row: &PgRow) -> Result<EmailReference> {
    Ok(EmailReference {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        matched_job_id: row.try_get("matched_job_id")?,
    })
}

// ILIKE treats % and _ as wildcards
fn escape_like(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Job tracker tables in PostgreSQL: `jobs`, `user_jobs`, `analyzed_emails`.
#[derive(Clone)]
pub struct PgJobStore {
    pool: PgPool,
}

impl PgJobStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JobStore for PgJobStore {
    async fn get_job(&self, id: JobId) -> Result<Option<Job>> {
        let conn = self
            .pool
            .get()
            .await
            .context("Failed to get DB connection for get_job")?;
        let sql = format!("SELECT {} FROM jobs WHERE id = $1", JOB_COLUMNS);
        let row = conn
            .query_opt(sql.as_str(), &[&id])
            .await
            .with_context(|| format!("Failed to fetch job {}", id))?;
        row.as_ref().map(job_from_row).transpose()
    }

    async fn list_jobs(&self) -> Result<Vec<Job>> {
        let conn = self
            .pool
            .get()
            .await
            .context("Failed to get DB connection for list_jobs")?;
        let sql = format!("SELECT {} FROM jobs ORDER BY id", JOB_COLUMNS);
        let rows = conn
            .query(sql.as_str(), &[])
            .await
            .context("Failed to list jobs")?;
        debug!("Loaded {} jobs", rows.len());
        rows.iter().map(job_from_row).collect()
    }

    async fn search_jobs_by_title(&self, title: &str, limit: i64) -> Result<Vec<Job>> {
        let conn = self
            .pool
            .get()
            .await
            .context("Failed to get DB connection for search_jobs_by_title")?;
        let sql = format!(
            "SELECT {} FROM jobs WHERE title ILIKE '%' || $1 || '%' ORDER BY id LIMIT $2",
            JOB_COLUMNS
        );
        let pattern = escape_like(title);
        let rows = conn
            .query(sql.as_str(), &[&pattern, &limit])
            .await
            .with_context(|| format!("Failed to search jobs by title '{}'", title))?;
        rows.iter().map(job_from_row).collect()
    }

    async fn begin(&self) -> Result<Box<dyn UnitOfWork>> {
        let conn = self
            .pool
            .get_owned()
            .await
            .context("Failed to get DB connection for unit of work")?;
        conn.batch_execute("BEGIN")
            .await
            .context("Failed to start transaction")?;
        Ok(Box::new(PgUnitOfWork { conn: Some(conn) }))
    }
}

/// One transaction on a connection held for its whole lifetime.
pub struct PgUnitOfWork {
    // None once committed or rolled back
    conn: Option<PgConnection>,
}

impl PgUnitOfWork {
    fn client(&self) -> Result<&Client> {
        self.conn
            .as_deref()
            .ok_or_else(|| anyhow!("Unit of work already finished"))
    }

    fn take(&mut self) -> Result<PgConnection> {
        self.conn
            .take()
            .ok_or_else(|| anyhow!("Unit of work already finished"))
    }
}

impl Drop for PgUnitOfWork {
    fn drop(&mut self) {
        let Some(conn) = self.conn.take() else {
            return;
        };
        warn!("Unit of work dropped before commit, rolling back");
        // The connection goes back to the pool once the rollback has run
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(e) = conn.batch_execute("ROLLBACK").await {
                        warn!("Rollback of abandoned unit of work failed: {}", e);
                    }
                });
            }
            Err(_) => warn!("No runtime available to roll back abandoned unit of work"),
        }
    }
}

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
    async fn get_job(&mut self, id: JobId) -> Result<Option<Job>> {
        let sql = format!("SELECT {} FROM jobs WHERE id = $1", JOB_COLUMNS);
        let row = self
            .client()?
            .query_opt(sql.as_str(), &[&id])
            .await
            .with_context(|| format!("Failed to fetch job {}", id))?;
        row.as_ref().map(job_from_row).transpose()
    }

    async fn get_job_for_update(&mut self, id: JobId) -> Result<Option<Job>> {
        let sql = format!("SELECT {} FROM jobs WHERE id = $1 FOR UPDATE", JOB_COLUMNS);
        let row = self
            .client()?
            .query_opt(sql.as_str(), &[&id])
            .await
            .with_context(|| format!("Failed to lock job {}", id))?;
        row.as_ref().map(job_from_row).transpose()
    }

    async fn create_job(&mut self, job: &NewJob) -> Result<Job> {
        let now = Utc::now().naive_utc();
        let sql = format!(
            "INSERT INTO jobs (title, business_name, location, pay, job_type, description, \
             posted_date, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8)
             RETURNING {}",
            JOB_COLUMNS
        );
        let row = self
            .client()?
            .query_one(
                sql.as_str(),
                &[
                    &job.title,
                    &job.business_name,
                    &job.location,
                    &job.pay,
                    &job.job_type,
                    &job.description,
                    &job.posted_date,
                    &now,
                ],
            )
            .await
            .context("Failed to insert job")?;
        job_from_row(&row)
    }

    async fn delete_job_if_exists(&mut self, id: JobId) -> Result<bool> {
        let rows_affected = self
            .client()?
            .execute("DELETE FROM jobs WHERE id = $1", &[&id])
            .await
            .with_context(|| format!("Failed to delete job {}", id))?;
        Ok(rows_affected == 1)
    }

    async fn get_link(&mut self, user_id: &UserId, job_id: JobId) -> Result<Option<UserJobLink>> {
        let sql = format!(
            "SELECT {} FROM user_jobs WHERE user_id = $1 AND job_id = $2",
            LINK_COLUMNS
        );
        let row = self
            .client()?
            .query_opt(sql.as_str(), &[user_id, &job_id])
            .await
            .with_context(|| format!("Failed to fetch link ({}, {})", user_id, job_id))?;
        row.as_ref().map(link_from_row).transpose()
    }

    async fn list_links_for_job(&mut self, job_id: JobId) -> Result<Vec<UserJobLink>> {
        let sql = format!(
            "SELECT {} FROM user_jobs WHERE job_id = $1 ORDER BY user_id",
            LINK_COLUMNS
        );
        let rows = self
            .client()?
            .query(sql.as_str(), &[&job_id])
            .await
            .with_context(|| format!("Failed to list links for job {}", job_id))?;
        rows.iter().map(link_from_row).collect()
    }

    async fn create_link(&mut self, link: &UserJobLink) -> Result<()> {
        self.client()?
            .execute(
                "INSERT INTO user_jobs (user_id, job_id, status, created_at, updated_at)
                 VALUES ($1, $2, $3, $4, $5)",
                &[
                    &link.user_id,
                    &link.job_id,
                    &link.status.as_str(),
                    &link.created_at,
                    &link.updated_at,
                ],
            )
            .await
            .with_context(|| {
                format!("Failed to insert link ({}, {})", link.user_id, link.job_id)
            })?;
        Ok(())
    }

    async fn update_link(&mut self, link: &UserJobLink) -> Result<()> {
        let rows_affected = self
            .client()?
            .execute(
                "UPDATE user_jobs SET status = $3, updated_at = $4
                 WHERE user_id = $1 AND job_id = $2",
                &[
                    &link.user_id,
                    &link.job_id,
                    &link.status.as_str(),
                    &link.updated_at,
                ],
            )
            .await
            .with_context(|| {
                format!("Failed to update link ({}, {})", link.user_id, link.job_id)
            })?;
        if rows_affected != 1 {
            return Err(anyhow!(
                "Link ({}, {}) not found for update",
                link.user_id,
                link.job_id
            ));
        }
        Ok(())
    }

    async fn delete_link(&mut self, user_id: &UserId, job_id: JobId) -> Result<bool> {
        let rows_affected = self
            .client()?
            .execute(
                "DELETE FROM user_jobs WHERE user_id = $1 AND job_id = $2",
                &[user_id, &job_id],
            )
            .await
            .with_context(|| format!("Failed to delete link ({}, {})", user_id, job_id))?;
        Ok(rows_affected == 1)
    }

    async fn get_reference(&mut self, id: Uuid) -> Result<Option<EmailReference>> {
        let sql = format!(
            "SELECT {} FROM analyzed_emails WHERE id = $1 FOR UPDATE",
            REFERENCE_COLUMNS
        );
        let row = self
            .client()?
            .query_opt(sql.as_str(), &[&id])
            .await
            .with_context(|| format!("Failed to fetch analyzed email {}", id))?;
        row.as_ref().map(reference_from_row).transpose()
    }

    async fn list_references_for_job(&mut self, job_id: JobId) -> Result<Vec<EmailReference>> {
        let sql = format!(
            "SELECT {} FROM analyzed_emails WHERE matched_job_id = $1 ORDER BY id",
            REFERENCE_COLUMNS
        );
        let rows = self
            .client()?
            .query(sql.as_str(), &[&job_id])
            .await
            .with_context(|| format!("Failed to list analyzed emails for job {}", job_id))?;
        rows.iter().map(reference_from_row).collect()
    }

    async fn repoint_reference(&mut self, id: Uuid, job_id: JobId) -> Result<()> {
        let rows_affected = self
            .client()?
            .execute(
                "UPDATE analyzed_emails SET matched_job_id = $2 WHERE id = $1",
                &[&id, &job_id],
            )
            .await
            .with_context(|| format!("Failed to repoint analyzed email {}", id))?;
        if rows_affected != 1 {
            return Err(anyhow!("Analyzed email {} not found for repoint", id));
        }
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let mut this = self;
        let conn = this.take()?;
        conn.batch_execute("COMMIT")
            .await
            .context("Failed to commit transaction")
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        let mut this = self;
        let conn = this.take()?;
        conn.batch_execute("ROLLBACK")
            .await
            .context("Failed to roll back transaction")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("Software Engineer"), "Software Engineer");
        assert_eq!(escape_like("100%_remote"), "100\\%\\_remote");
        assert_eq!(escape_like("a\\b"), "a\\\\b");
    }
}
