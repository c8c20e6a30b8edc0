//! Query-to-candidate matching: similarity scoring and best-match selection

pub mod selector;
pub mod similarity;

pub use selector::{select, MatchError};
pub use similarity::{normalize_query, score};
