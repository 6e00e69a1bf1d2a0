// src/matching/mod.rs
pub mod finder;
pub mod similarity;

pub use finder::{composite_similarity, MatchFinder};
pub use similarity::similarity;
