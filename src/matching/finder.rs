// src/matching/finder.rs

use std::cmp::Ordering;
use std::sync::Arc;

use anyhow::{Context, Result};
use log::{debug, info};

use crate::config::{
    DUPLICATE_COMPANY_WEIGHT, DUPLICATE_COMPOSITE_THRESHOLD, DUPLICATE_TITLE_WEIGHT,
    INCOMING_CANDIDATE_LIMIT, INCOMING_COMPANY_MATCH_THRESHOLD,
};
use crate::matching::similarity::similarity;
use crate::models::{Job, JobId};
use crate::results::{MatchResult, PotentialMatch};
use crate::store::JobStore;

/// Weighted title/company similarity between two jobs, company counting double.
pub fn composite_similarity(a: &Job, b: &Job) -> f64 {
    let title = similarity(&a.title, &b.title);
    let company = similarity(&a.business_name, &b.business_name);
    (DUPLICATE_TITLE_WEIGHT * title + DUPLICATE_COMPANY_WEIGHT * company)
        / (DUPLICATE_TITLE_WEIGHT + DUPLICATE_COMPANY_WEIGHT)
}

/// Finds existing jobs for incoming references, and duplicate candidates for
/// existing jobs.
///
/// The two lookups have different decision rules on purpose. Incoming
/// references are accepted on company similarity alone (title only narrows the
/// candidate set), while duplicate discovery scores a title/company blend over
/// the whole corpus.
#[derive(Clone)]
pub struct MatchFinder {
    store: Arc<dyn JobStore>,
}

impl MatchFinder {
    pub fn new(store: Arc<dyn JobStore>) -> Self {
        Self { store }
    }

    /// First title-prefiltered job whose company scores at least 0.7.
    pub async fn match_incoming(&self, title: &str, company: &str) -> Result<MatchResult> {
        let candidates = self
            .store
            .search_jobs_by_title(title, INCOMING_CANDIDATE_LIMIT)
            .await
            .with_context(|| format!("Failed to load candidates for title '{}'", title))?;
        debug!(
            "Matching incoming '{}' at '{}' against {} candidates",
            title,
            company,
            candidates.len()
        );

        for candidate in candidates {
            let company_similarity = similarity(&candidate.business_name, company);
            if company_similarity >= INCOMING_COMPANY_MATCH_THRESHOLD {
                info!(
                    "Incoming '{}' at '{}' matched job {} (company similarity {:.3})",
                    title, company, candidate.id, company_similarity
                );
                return Ok(MatchResult::matched(candidate, company_similarity));
            }
        }

        debug!("No existing job matched '{}' at '{}'", title, company);
        Ok(MatchResult::no_match())
    }

    /// Jobs scoring above 0.8 composite similarity against `job_id`, best first.
    ///
    /// An unknown `job_id` yields no candidates rather than an error.
    pub async fn find_duplicate_candidates(&self, job_id: JobId) -> Result<Vec<PotentialMatch>> {
        let Some(source) = self
            .store
            .get_job(job_id)
            .await
            .with_context(|| format!("Failed to load job {}", job_id))?
        else {
            debug!("Job {} not found, no duplicate candidates", job_id);
            return Ok(Vec::new());
        };

        // TODO: block on normalized business name once the corpus outgrows a full scan
        let corpus = self
            .store
            .list_jobs()
            .await
            .context("Failed to load jobs for duplicate scan")?;
        let scanned = corpus.len();

        let mut matches: Vec<PotentialMatch> = corpus
            .into_iter()
            .filter(|job| job.id != source.id)
            .filter_map(|job| {
                let score = composite_similarity(&source, &job);
                (score > DUPLICATE_COMPOSITE_THRESHOLD).then_some(PotentialMatch {
                    job,
                    similarity: score,
                })
            })
            .collect();

        // stable, so ties keep corpus (id) order
        matches.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(Ordering::Equal)
        });

        info!(
            "Found {} duplicate candidates for job {} out of {} jobs scanned",
            matches.len(),
            job_id,
            scanned
        );
        Ok(matches)
    }
}
