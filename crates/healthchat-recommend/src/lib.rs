//! Keyword-driven product recommendations.

pub mod keyword_map;
pub mod matcher;

pub use keyword_map::{KeywordMap, KeywordRule, MatchMode};
pub use matcher::match_recommendations;
