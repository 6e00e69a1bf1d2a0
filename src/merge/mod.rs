// src/merge/mod.rs

//! Consolidation of two canonical jobs found to be duplicates.
//!
//! A merge moves every user's tracking link and every analyzed email from the
//! source job onto the target job, then deletes the source. All of it happens in
//! one unit of work: it commits as a whole or not at all.

pub mod locks;

use std::sync::Arc;

use chrono::Utc;
use log::{debug, info, warn};

use crate::error::{MergeError, MergeRole};
use crate::matching::MatchFinder;
use crate::models::{JobId, UserJobLink};
use crate::progression::should_adopt;
use crate::results::{MergeResult, PotentialMatch};
use crate::store::{JobStore, UnitOfWork};

pub use locks::MergeLocks;

/// What a successful merge did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeSummary {
    /// Links recreated on the target for users who had none there
    pub links_moved: usize,
    /// Existing target links that took on the source link's status
    pub links_upgraded: usize,
    /// Existing target links left as they were
    pub links_kept: usize,
    pub references_repointed: usize,
}

pub struct MergeEngine {
    store: Arc<dyn JobStore>,
    finder: MatchFinder,
    locks: MergeLocks,
}

impl MergeEngine {
    pub fn new(store: Arc<dyn JobStore>) -> Self {
        Self {
            finder: MatchFinder::new(store.clone()),
            store,
            locks: MergeLocks::new(),
        }
    }

    /// Duplicate suggestions for human review. Never merges anything.
    pub async fn find_potential_matches(&self, job_id: JobId) -> anyhow::Result<Vec<PotentialMatch>> {
        self.finder.find_duplicate_candidates(job_id).await
    }

    /// Merges `source_id` into `target_id`.
    ///
    /// Expected refusals (same id, missing job, lost race) come back as
    /// `success = false`. Only storage failures are returned as errors, after the
    /// unit of work has been rolled back.
    pub async fn merge_jobs(&self, source_id: JobId, target_id: JobId) -> anyhow::Result<MergeResult> {
        match self.try_merge(source_id, target_id).await {
            Ok(summary) => Ok(MergeResult::succeeded(format!(
                "Merged job {} into {}: {} links moved, {} upgraded, {} kept, {} emails repointed",
                source_id,
                target_id,
                summary.links_moved,
                summary.links_upgraded,
                summary.links_kept,
                summary.references_repointed
            ))),
            Err(MergeError::Storage(e)) => Err(e.context(format!(
                "Failed to merge job {} into {}",
                source_id, target_id
            ))),
            Err(e) => Ok(MergeResult::failed(e.to_string())),
        }
    }

    pub async fn try_merge(
        &self,
        source_id: JobId,
        target_id: JobId,
    ) -> Result<MergeSummary, MergeError> {
        if source_id == target_id {
            warn!("Refusing to merge job {} into itself", source_id);
            return Err(MergeError::InvalidArgument(source_id));
        }

        let _pair = self.locks.acquire(source_id, target_id).await;
        info!("Merging job {} into job {}", source_id, target_id);

        let mut uow = self.store.begin().await?;
        match apply_merge(uow.as_mut(), source_id, target_id).await {
            Ok(summary) => {
                uow.commit().await?;
                info!(
                    "Merged job {} into job {}: {:?}",
                    source_id, target_id, summary
                );
                Ok(summary)
            }
            Err(e) => {
                warn!(
                    "Merge of job {} into job {} aborted, rolling back: {}",
                    source_id, target_id, e
                );
                if let Err(rollback_err) = uow.rollback().await {
                    warn!("Rollback failed: {:#}", rollback_err);
                }
                Err(e)
            }
        }
    }
}

async fn apply_merge(
    uow: &mut dyn UnitOfWork,
    source_id: JobId,
    target_id: JobId,
) -> Result<MergeSummary, MergeError> {
    // Lock both rows lowest id first, same order as MergeLocks
    let (first, second) = if source_id < target_id {
        (source_id, target_id)
    } else {
        (target_id, source_id)
    };
    let first_job = uow.get_job_for_update(first).await?;
    let second_job = uow.get_job_for_update(second).await?;
    let (source, target) = if first == source_id {
        (first_job, second_job)
    } else {
        (second_job, first_job)
    };
    if source.is_none() {
        return Err(MergeError::NotFound {
            role: MergeRole::Source,
            id: source_id,
        });
    }
    if target.is_none() {
        return Err(MergeError::NotFound {
            role: MergeRole::Target,
            id: target_id,
        });
    }

    let mut summary = MergeSummary::default();
    let now = Utc::now().naive_utc();

    for link in uow.list_links_for_job(source_id).await? {
        match uow.get_link(&link.user_id, target_id).await? {
            Some(mut existing) => {
                if should_adopt(existing.status, link.status) {
                    debug!(
                        "User {}: target link {} -> {}",
                        link.user_id, existing.status, link.status
                    );
                    existing.status = link.status;
                    existing.updated_at = now;
                    uow.update_link(&existing).await?;
                    summary.links_upgraded += 1;
                } else {
                    debug!(
                        "User {}: keeping target link at {} over {}",
                        link.user_id, existing.status, link.status
                    );
                    summary.links_kept += 1;
                }
            }
            None => {
                debug!(
                    "User {}: carrying {} link over to job {}",
                    link.user_id, link.status, target_id
                );
                uow.create_link(&UserJobLink {
                    user_id: link.user_id.clone(),
                    job_id: target_id,
                    status: link.status,
                    created_at: link.created_at,
                    updated_at: now,
                })
                .await?;
                summary.links_moved += 1;
            }
        }
        uow.delete_link(&link.user_id, source_id).await?;
    }

    for reference in uow.list_references_for_job(source_id).await? {
        uow.repoint_reference(reference.id, target_id).await?;
        summary.references_repointed += 1;
    }

    if !uow.delete_job_if_exists(source_id).await? {
        return Err(MergeError::Conflict(source_id));
    }

    Ok(summary)
}
