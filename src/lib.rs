// src/lib.rs
pub mod config;
pub mod db;
pub mod enrichment;
pub mod error;
pub mod matching;
pub mod merge;
pub mod models;
pub mod progression;
pub mod results;
pub mod store;

// Re-export common types for easier access
pub use models::{EmailReference, Job, JobId, JobStatus, NewJob, UserId, UserJobLink};
pub use results::{EnrichmentOutcome, MatchResult, MergeResult, PotentialMatch};

// Re-export important functionality
pub use db::PgPool;
pub use enrichment::{EmailEnricher, IncomingJob};
pub use error::MergeError;
pub use matching::MatchFinder;
pub use merge::MergeEngine;
pub use store::{JobStore, MemoryJobStore, PgJobStore, UnitOfWork};
