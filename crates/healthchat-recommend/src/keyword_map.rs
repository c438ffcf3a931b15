//! Keyword-to-product table loaded from TOML.
//!
//! ```toml
//! match_mode = "substring"   # or "whole_word"
//!
//! [[rules]]
//! keyword = "headache"
//! [[rules.products]]
//! id = 1
//! name = "Herbal Tea"
//! reason = "Helps relax and reduce tension."
//! ```
//!
//! Rule order is significant: it decides the order of recommendations.

use std::collections::HashSet;
use std::path::Path;

use figment::providers::{Format, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use tracing::info;

use healthchat_core::types::Recommendation;
use healthchat_core::{Error, Result};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    /// Keyword may appear anywhere in the query, including inside longer words.
    #[default]
    Substring,
    /// Keyword must be bounded by non-alphanumeric characters or the ends of the query.
    WholeWord,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordRule {
    pub keyword: String,
    #[serde(default)]
    pub products: Vec<Recommendation>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct KeywordFile {
    #[serde(default)]
    match_mode: MatchMode,
    #[serde(default)]
    rules: Vec<KeywordRule>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeywordMap {
    mode: MatchMode,
    rules: Vec<KeywordRule>,
}

impl KeywordMap {
    /// Keywords are trimmed and lowercased; blank or repeated keywords and
    /// products without a name are rejected.
    pub fn new(rules: Vec<KeywordRule>) -> Result<Self> {
        let mut seen = HashSet::new();
        let mut normalized = Vec::with_capacity(rules.len());
        for rule in rules {
            let keyword = rule.keyword.trim().to_lowercase();
            if keyword.is_empty() {
                return Err(Error::InvalidConfig("keyword map contains a blank keyword".into()));
            }
            if !seen.insert(keyword.clone()) {
                return Err(Error::InvalidConfig(format!("keyword '{}' is listed more than once", keyword)));
            }
            if let Some(product) = rule.products.iter().find(|p| p.name.trim().is_empty()) {
                return Err(Error::InvalidConfig(format!(
                    "product {} under keyword '{}' has no name",
                    product.id, keyword
                )));
            }
            normalized.push(KeywordRule { keyword, products: rule.products });
        }
        Ok(Self { mode: MatchMode::default(), rules: normalized })
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(Error::NotFound(format!("keyword map {}", path.display())));
        }
        let map = Self::from_figment(Figment::new().merge(Toml::file(path)))?;
        info!(path = %path.display(), keywords = map.len(), mode = ?map.mode, "loaded keyword map");
        Ok(map)
    }

    pub fn from_toml_str(toml: &str) -> Result<Self> {
        Self::from_figment(Figment::new().merge(Toml::string(toml)))
    }

    fn from_figment(figment: Figment) -> Result<Self> {
        let file: KeywordFile = figment
            .extract()
            .map_err(|e| Error::InvalidConfig(format!("keyword map: {}", e)))?;
        Ok(Self::new(file.rules)?.with_mode(file.match_mode))
    }

    #[must_use]
    pub fn with_mode(mut self, mode: MatchMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn mode(&self) -> MatchMode {
        self.mode
    }

    pub fn rules(&self) -> &[KeywordRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
