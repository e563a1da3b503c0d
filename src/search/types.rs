use serde::{Deserialize, Serialize};

/// A single search hit. Identity is the `url`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub title: String,
    pub snippet: String,
    pub url: String,
    /// The query that produced this hit.
    pub source_query: String,
    /// Set by the offline backend so answers built on canned data can be told apart.
    #[serde(default)]
    pub is_synthetic: bool,
}

impl Document {
    pub fn new(title: &str, snippet: &str, url: &str, source_query: &str) -> Self {
        Self {
            title: title.to_string(),
            snippet: snippet.to_string(),
            url: url.to_string(),
            source_query: source_query.to_string(),
            is_synthetic: false,
        }
    }

    pub fn synthetic(mut self) -> Self {
        self.is_synthetic = true;
        self
    }
}
