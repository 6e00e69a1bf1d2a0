// tests/matching_tests.rs

use std::sync::Arc;

use anyhow::Result;

use jobmatch_lib::matching::{composite_similarity, similarity};
use jobmatch_lib::{JobId, JobStore, MatchFinder, MemoryJobStore};

const EPS: f64 = 1e-9;

fn finder_for(store: &MemoryJobStore) -> MatchFinder {
    let store: Arc<dyn JobStore> = Arc::new(store.clone());
    MatchFinder::new(store)
}

// --- MatchIncoming ---

#[tokio::test]
async fn test_match_incoming_accepts_company_at_075() -> Result<()> {
    let store = MemoryJobStore::new();
    let job = store.add_job(1, "Backend Engineer", "Acme").await;

    assert!((similarity("Acme", "Acne") - 0.75).abs() < EPS);
    let result = finder_for(&store)
        .match_incoming("Backend Engineer", "Acne")
        .await?;

    assert!(result.is_match);
    assert_eq!(result.matched_job, Some(job));
    assert!((result.similarity - 0.75).abs() < EPS);
    Ok(())
}

#[tokio::test]
async fn test_match_incoming_rejects_company_at_065() -> Result<()> {
    let store = MemoryJobStore::new();
    store
        .add_job(1, "Backend Engineer", "Northwind Traders Co")
        .await;

    assert!((similarity("Northwind Traders Co", "Northwind Trazzzzzzz") - 0.65).abs() < EPS);
    let result = finder_for(&store)
        .match_incoming("Backend Engineer", "Northwind Trazzzzzzz")
        .await?;

    assert!(!result.is_match);
    assert_eq!(result.matched_job, None);
    assert_eq!(result.similarity, 0.0);
    Ok(())
}

#[tokio::test]
async fn test_match_incoming_takes_first_candidate_over_threshold() -> Result<()> {
    let store = MemoryJobStore::new();
    store.add_job(1, "Backend Engineer", "Initech").await;
    // 0.8 company similarity, clears the bar first
    store.add_job(2, "Backend Engineer", "Acmee").await;
    // exact company, but later in candidate order
    store.add_job(3, "Backend Engineer", "Acme").await;

    let result = finder_for(&store)
        .match_incoming("Backend Engineer", "Acme")
        .await?;

    assert!(result.is_match);
    assert_eq!(result.matched_job.map(|j| j.id), Some(JobId(2)));
    assert!((result.similarity - 0.8).abs() < EPS);
    Ok(())
}

#[tokio::test]
async fn test_match_incoming_ignores_title_in_decision() -> Result<()> {
    let store = MemoryJobStore::new();
    // title only has to pass the prefilter, its similarity is not scored
    store
        .add_job(1, "Senior Backend Engineer, Payments Platform (Remote)", "Acme")
        .await;

    let result = finder_for(&store)
        .match_incoming("Backend Engineer", "acme")
        .await?;

    assert!(result.is_match);
    assert!((result.similarity - 1.0).abs() < EPS);
    Ok(())
}

#[tokio::test]
async fn test_match_incoming_only_considers_title_prefiltered_jobs() -> Result<()> {
    let store = MemoryJobStore::new();
    store.add_job(1, "Accountant", "Acme").await;

    let result = finder_for(&store)
        .match_incoming("Backend Engineer", "Acme")
        .await?;

    assert!(!result.is_match);
    Ok(())
}

#[tokio::test]
async fn test_match_incoming_empty_company_never_matches() -> Result<()> {
    let store = MemoryJobStore::new();
    store.add_job(1, "Backend Engineer", "Acme").await;

    let result = finder_for(&store)
        .match_incoming("Backend Engineer", "")
        .await?;

    assert!(!result.is_match);
    assert_eq!(result.similarity, 0.0);
    Ok(())
}

// --- FindDuplicateCandidates ---

#[tokio::test]
async fn test_duplicate_candidates_blend_title_and_company() -> Result<()> {
    let store = MemoryJobStore::new();
    let source = store.add_job(1, "Software Engineer", "Acme").await;
    let senior = store.add_job(2, "Sr Software Engineer", "Acme").await;
    store.add_job(3, "Data Analyst", "Globex").await;

    // title 0.85, company 1.0
    let expected = (0.85 + 2.0 * 1.0) / 3.0;
    assert!((composite_similarity(&source, &senior) - expected).abs() < EPS);

    let matches = finder_for(&store)
        .find_duplicate_candidates(JobId(1))
        .await?;

    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].job.id, JobId(2));
    assert!((matches[0].similarity - expected).abs() < EPS);
    Ok(())
}

#[tokio::test]
async fn test_duplicate_candidates_exclude_half_similar_jobs() -> Result<()> {
    let store = MemoryJobStore::new();
    store.add_job(1, "Software Engineer", "Acme").await;
    // title 1.0, company 0.5: composite 0.667
    store.add_job(2, "Software Engineer", "Acme Inc").await;

    let matches = finder_for(&store)
        .find_duplicate_candidates(JobId(1))
        .await?;

    assert!(matches.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_duplicate_candidates_sorted_best_first() -> Result<()> {
    let store = MemoryJobStore::new();
    store.add_job(1, "Software Engineer", "Acme").await;
    store.add_job(2, "Sr Software Engineer", "Acme").await; // 0.95
    store.add_job(3, "Software Engineers", "Acmee").await; // ~0.848
    store.add_job(4, "Software Engineer", "Acme").await; // 1.0
    store.add_job(5, "Data Analyst", "Globex").await;

    let matches = finder_for(&store)
        .find_duplicate_candidates(JobId(1))
        .await?;

    let ids: Vec<i64> = matches.iter().map(|m| m.job.id.0).collect();
    assert_eq!(ids, vec![4, 2, 3]);
    assert!(matches.windows(2).all(|w| w[0].similarity >= w[1].similarity));
    assert!(matches.iter().all(|m| m.similarity > 0.8));
    Ok(())
}

#[tokio::test]
async fn test_duplicate_candidates_never_include_source() -> Result<()> {
    let store = MemoryJobStore::new();
    store.add_job(1, "Software Engineer", "Acme").await;

    let matches = finder_for(&store)
        .find_duplicate_candidates(JobId(1))
        .await?;

    assert!(matches.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_duplicate_candidates_for_missing_job_is_empty() -> Result<()> {
    let store = MemoryJobStore::new();
    store.add_job(1, "Software Engineer", "Acme").await;

    let matches = finder_for(&store)
        .find_duplicate_candidates(JobId(42))
        .await?;

    assert!(matches.is_empty());
    Ok(())
}
