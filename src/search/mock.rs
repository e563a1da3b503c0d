use async_trait::async_trait;

use super::types::Document;
use super::{SearchBackend, SearchError};

/// (key, [(title, snippet, url)])
type Canned = (&'static str, &'static [(&'static str, &'static str, &'static str)]);

const CANNED: &[Canned] = &[
    (
        "python programming",
        &[
            (
                "Python Programming Language",
                "Python is a high-level, interpreted programming language known for its simplicity and readability.",
                "https://python.org",
            ),
            (
                "Learn Python - Tutorials",
                "Comprehensive tutorials and documentation for learning Python programming.",
                "https://docs.python.org",
            ),
        ],
    ),
    (
        "machine learning",
        &[
            (
                "Machine Learning Basics",
                "Machine learning is a subset of artificial intelligence that enables computers to learn without explicit programming.",
                "https://ml-basics.com",
            ),
            (
                "Introduction to ML",
                "A comprehensive introduction to machine learning concepts and algorithms.",
                "https://ml-intro.org",
            ),
        ],
    ),
    (
        "artificial intelligence",
        &[
            (
                "What is Artificial Intelligence",
                "Artificial Intelligence (AI) refers to the simulation of human intelligence in machines.",
                "https://ai-definition.org",
            ),
            (
                "AI Applications",
                "Real-world applications of artificial intelligence in various industries.",
                "https://ai-applications.com",
            ),
        ],
    ),
    (
        "world cup 2022",
        &[
            (
                "Argentina win World Cup 2022",
                "Argentina won the 2022 FIFA World Cup, beating France 4-2 on penalties after a 3-3 draw in extra time.",
                "https://www.fifa.com/worldcup/news/argentina-win",
            ),
            (
                "FIFA World Cup 2022 Final",
                "The 2022 FIFA World Cup final was played between Argentina and France on December 18, 2022, at Lusail Stadium in Qatar.",
                "https://fifa-world-cup-2022.com/final",
            ),
        ],
    ),
    (
        "who won the 2022 fifa world cup",
        &[(
            "Argentina win World Cup 2022",
            "Argentina won the 2022 FIFA World Cup, beating France 4-2 on penalties after a 3-3 draw in extra time.",
            "https://www.fifa.com/worldcup/news/argentina-win",
        )],
    ),
];

/// Offline backend with a handful of canned result sets. Used when no real
/// search credentials are configured; every hit is flagged synthetic.
#[derive(Default)]
pub struct MockSearch;

impl MockSearch {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SearchBackend for MockSearch {
    fn name(&self) -> &str {
        "mock_web_search"
    }

    async fn search(&self, query: &str) -> Result<Vec<Document>, SearchError> {
        let query_lower = query.to_lowercase();

        for (key, hits) in CANNED {
            if query_lower.contains(key) || key.contains(query_lower.as_str()) {
                return Ok(hits
                    .iter()
                    .map(|(title, snippet, url)| {
                        Document::new(title, snippet, url, query).synthetic()
                    })
                    .collect());
            }
        }

        let url = format!(
            "https://mock-search.com/results?q={}",
            query.split_whitespace().collect::<Vec<_>>().join("+")
        );
        Ok(vec![Document::new(
            &format!("Search Results for: {}", query),
            &format!(
                "This is a mock result for the query: {}. A configured search backend would return real results.",
                query
            ),
            &url,
            query,
        )
        .synthetic()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_known_topic_returns_canned_hits() {
        let docs = MockSearch::new()
            .search("Who won the World Cup 2022 final?")
            .await
            .unwrap();
        assert_eq!(docs.len(), 2);
        assert!(docs[0].title.contains("Argentina"));
        assert!(docs.iter().all(|d| d.is_synthetic));
        assert_eq!(docs[0].source_query, "Who won the World Cup 2022 final?");
    }

    #[tokio::test]
    async fn test_unknown_topic_returns_generic_hit() {
        let docs = MockSearch::new().search("rust borrow checker").await.unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].url, "https://mock-search.com/results?q=rust+borrow+checker");
        assert!(docs[0].is_synthetic);
    }
}
