// src/enrichment.rs

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use log::{debug, info, warn};
use uuid::Uuid;

use crate::matching::MatchFinder;
use crate::models::{JobId, JobStatus, NewJob, UserId, UserJobLink};
use crate::progression::should_adopt;
use crate::results::EnrichmentOutcome;
use crate::store::{JobStore, UnitOfWork};

/// The job an analyzed recruiting email talks about, as the classifier read it.
#[derive(Debug, Clone, PartialEq)]
pub struct IncomingJob {
    pub title: String,
    pub company: String,
    /// Status the email implies for the recipient (e.g. Interviewing for an invite)
    pub status: JobStatus,
}

/// Attaches analyzed emails to jobs, creating the job when nothing matches,
/// and keeps the recipient's tracking link in step with what the email says.
pub struct EmailEnricher {
    store: Arc<dyn JobStore>,
    finder: MatchFinder,
}

impl EmailEnricher {
    pub fn new(store: Arc<dyn JobStore>) -> Self {
        Self {
            finder: MatchFinder::new(store.clone()),
            store,
        }
    }

    pub async fn enrich(
        &self,
        reference_id: Uuid,
        incoming: &IncomingJob,
    ) -> Result<EnrichmentOutcome> {
        let title = incoming.title.trim();
        let company = incoming.company.trim();
        if title.is_empty() || company.is_empty() {
            debug!("Email {} has no usable title/company, skipping", reference_id);
            return Ok(EnrichmentOutcome::Skipped);
        }

        let matched = self.finder.match_incoming(title, company).await?;
        let matched_job_id = matched.matched_job.as_ref().map(|job| job.id);

        let mut uow = self.store.begin().await?;
        let applied = apply_enrichment(
            uow.as_mut(),
            reference_id,
            title,
            company,
            incoming.status,
            matched_job_id,
            matched.similarity,
        )
        .await;
        match applied {
            Ok(EnrichmentOutcome::ReferenceMissing) => {
                warn!("Analyzed email {} not found", reference_id);
                uow.rollback().await?;
                Ok(EnrichmentOutcome::ReferenceMissing)
            }
            Ok(outcome) => {
                uow.commit().await.with_context(|| {
                    format!("Failed to commit enrichment of email {}", reference_id)
                })?;
                info!("Enriched email {}: {:?}", reference_id, outcome);
                Ok(outcome)
            }
            Err(e) => {
                if let Err(rollback_err) = uow.rollback().await {
                    warn!("Rollback failed: {:#}", rollback_err);
                }
                Err(e.context(format!("Failed to enrich email {}", reference_id)))
            }
        }
    }
}

async fn apply_enrichment(
    uow: &mut dyn UnitOfWork,
    reference_id: Uuid,
    title: &str,
    company: &str,
    status: JobStatus,
    matched_job_id: Option<JobId>,
    similarity: f64,
) -> Result<EnrichmentOutcome> {
    let Some(reference) = uow.get_reference(reference_id).await? else {
        return Ok(EnrichmentOutcome::ReferenceMissing);
    };

    // The match was read outside this unit of work; a merge may have removed it since
    let existing = match matched_job_id {
        Some(id) => uow.get_job_for_update(id).await?,
        None => None,
    };

    let (job_id, created) = match existing {
        Some(job) => (job.id, false),
        None => {
            let job = uow.create_job(&NewJob::new(title, company)).await?;
            info!("Created job {} for '{}' at '{}'", job.id, title, company);
            (job.id, true)
        }
    };

    uow.repoint_reference(reference.id, job_id).await?;
    let status_changed = ensure_link(uow, &reference.user_id, job_id, status).await?;

    Ok(if created {
        EnrichmentOutcome::Created { job_id }
    } else {
        EnrichmentOutcome::Attached {
            job_id,
            similarity,
            status_changed,
        }
    })
}

// Returns whether the user's status for the job changed
async fn ensure_link(
    uow: &mut dyn UnitOfWork,
    user_id: &UserId,
    job_id: JobId,
    status: JobStatus,
) -> Result<bool> {
    let now = Utc::now().naive_utc();
    match uow.get_link(user_id, job_id).await? {
        Some(mut link) => {
            if !should_adopt(link.status, status) {
                return Ok(false);
            }
            debug!("User {} job {}: {} -> {}", user_id, job_id, link.status, status);
            link.status = status;
            link.updated_at = now;
            uow.update_link(&link).await?;
            Ok(true)
        }
        None => {
            uow.create_link(&UserJobLink {
                user_id: user_id.clone(),
                job_id,
                status,
                created_at: now,
                updated_at: now,
            })
            .await?;
            Ok(true)
        }
    }
}
