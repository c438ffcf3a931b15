use std::collections::HashSet;

use healthchat_core::types::Recommendation;

use crate::keyword_map::{KeywordMap, MatchMode};

/// Products for every keyword found in `query`, in keyword-map order. A
/// product reached through several keywords is listed once, at its first
/// position.
pub fn match_recommendations(query: &str, map: &KeywordMap) -> Vec<Recommendation> {
    let query = query.to_lowercase();
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for rule in map.rules() {
        if !contains_keyword(&query, &rule.keyword, map.mode()) {
            continue;
        }
        for product in &rule.products {
            if seen.insert(product.id) {
                out.push(product.clone());
            }
        }
    }
    out
}

fn contains_keyword(query: &str, keyword: &str, mode: MatchMode) -> bool {
    match mode {
        MatchMode::Substring => query.contains(keyword),
        MatchMode::WholeWord => {
            if keyword.is_empty() {
                return false;
            }
            let mut from = 0;
            while let Some(offset) = query[from..].find(keyword) {
                let start = from + offset;
                let before = query[..start].chars().next_back();
                let after = query[start + keyword.len()..].chars().next();
                if !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric) {
                    return true;
                }
                // Step one char so overlapping occurrences are still checked.
                from = start + query[start..].chars().next().map_or(1, char::len_utf8);
            }
            false
        }
    }
}
