// src/config.rs

// Incoming references (emails) match on company similarity alone; inclusive.
pub const INCOMING_COMPANY_MATCH_THRESHOLD: f64 = 0.7;

// How many title-prefiltered jobs MatchIncoming looks at
pub const INCOMING_CANDIDATE_LIMIT: i64 = 10;

// Duplicate discovery blends title and company; exclusive.
pub const DUPLICATE_COMPOSITE_THRESHOLD: f64 = 0.8;
pub const DUPLICATE_TITLE_WEIGHT: f64 = 1.0;
pub const DUPLICATE_COMPANY_WEIGHT: f64 = 2.0;

// Pool sizing for the job tracker database
pub const DB_POOL_MAX_SIZE: u32 = 16;
pub const DB_POOL_MIN_IDLE: u32 = 1;
