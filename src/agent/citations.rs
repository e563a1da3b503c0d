use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::search::types::Document;

pub const NO_INFORMATION: &str = "No information found";

/// A numbered source backing an `[n]` marker in the answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    pub id: u32,
    pub title: String,
    /// Empty when the citation could not be matched to a document.
    pub url: String,
}

/// Citations as the synthesis step returned them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawCitations {
    /// `{id, title, url}` objects, already in final shape.
    Structured(Vec<Citation>),
    /// Bare source names, older prompt format.
    Legacy(Vec<String>),
}

impl Default for RawCitations {
    fn default() -> Self {
        RawCitations::Legacy(Vec::new())
    }
}

impl RawCitations {
    /// Read a `citations` array. The first element decides the shape.
    pub fn from_value(value: Option<&Value>) -> Self {
        let Some(items) = value.and_then(Value::as_array) else {
            return Self::default();
        };

        if items.first().is_some_and(Value::is_object) {
            let citations = items
                .iter()
                .enumerate()
                .filter_map(|(i, item)| {
                    let obj = item.as_object()?;
                    let field = |k: &str| {
                        obj.get(k)
                            .and_then(Value::as_str)
                            .unwrap_or_default()
                            .to_string()
                    };
                    let id = obj
                        .get("id")
                        .and_then(Value::as_u64)
                        .and_then(|id| u32::try_from(id).ok())
                        .unwrap_or(i as u32 + 1);
                    Some(Citation {
                        id,
                        title: field("title"),
                        url: field("url"),
                    })
                })
                .collect();
            RawCitations::Structured(citations)
        } else {
            RawCitations::Legacy(
                items
                    .iter()
                    .map(|v| match v {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .collect(),
            )
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            RawCitations::Structured(c) => c.is_empty(),
            RawCitations::Legacy(c) => c.is_empty(),
        }
    }
}

/// Produce the canonical citation list.
///
/// Structured citations pass through untouched. Legacy strings are numbered
/// by position and matched to the first document whose title contains the
/// string, or is contained by it, ignoring case.
pub fn reconcile(raw: RawCitations, docs: &[Document]) -> Vec<Citation> {
    match raw {
        RawCitations::Structured(citations) => citations,
        RawCitations::Legacy(names) => names
            .into_iter()
            .enumerate()
            .map(|(i, name)| {
                let id = i as u32 + 1;
                match find_document(&name, docs) {
                    Some(doc) => Citation {
                        id,
                        title: doc.title.clone(),
                        url: doc.url.clone(),
                    },
                    None => Citation {
                        id,
                        title: name,
                        url: String::new(),
                    },
                }
            })
            .collect(),
    }
}

fn find_document<'a>(citation: &str, docs: &'a [Document]) -> Option<&'a Document> {
    let needle = citation.to_lowercase();
    docs.iter().filter(|doc| !doc.title.is_empty()).find(|doc| {
        let title = doc.title.to_lowercase();
        needle.contains(&title) || title.contains(&needle)
    })
}

/// Answer to use when synthesis produced nothing usable: quote the first
/// document and cite it, or admit there was nothing to go on.
pub fn fallback_answer(docs: &[Document]) -> (String, Vec<Citation>) {
    match docs.first() {
        Some(doc) => {
            let snippet = if doc.snippet.is_empty() {
                "No information available."
            } else {
                doc.snippet.as_str()
            };
            (
                format!(
                    "Based on the search results, here's what I found: {} [1]",
                    snippet
                ),
                vec![Citation {
                    id: 1,
                    title: if doc.title.is_empty() {
                        "Unknown source".to_string()
                    } else {
                        doc.title.clone()
                    },
                    url: doc.url.clone(),
                }],
            )
        }
        None => (NO_INFORMATION.to_string(), Vec::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn docs() -> Vec<Document> {
        vec![
            Document::new(
                "Argentina win World Cup 2022",
                "Argentina won the 2022 FIFA World Cup.",
                "https://www.fifa.com/worldcup/news/argentina-win",
                "world cup 2022",
            ),
            Document::new(
                "FIFA World Cup 2022 Final",
                "The final was played on December 18, 2022.",
                "https://fifa-world-cup-2022.com/final",
                "world cup 2022",
            ),
        ]
    }

    #[test]
    fn test_structured_pass_through() {
        let raw = RawCitations::from_value(Some(&json!([
            {"id": 1, "title": "Made up", "url": "https://not-a-doc.example"},
            {"id": 7, "title": "Other", "url": ""}
        ])));
        let citations = reconcile(raw, &docs());
        assert_eq!(citations.len(), 2);
        assert_eq!(citations[0].url, "https://not-a-doc.example");
        assert_eq!(citations[1].id, 7);
    }

    #[test]
    fn test_structured_missing_id_uses_position() {
        let raw = RawCitations::from_value(Some(&json!([{"title": "A"}, {"title": "B"}])));
        let citations = reconcile(raw, &[]);
        assert_eq!(citations[1].id, 2);
        assert_eq!(citations[1].url, "");
    }

    #[test]
    fn test_legacy_matches_title_substring() {
        let raw = RawCitations::Legacy(vec![
            "Source: argentina win world cup 2022 (fifa.com)".to_string(),
            "World Cup 2022 Final".to_string(),
        ]);
        let citations = reconcile(raw, &docs());
        assert_eq!(citations[0].id, 1);
        assert_eq!(citations[0].title, "Argentina win World Cup 2022");
        assert_eq!(citations[0].url, "https://www.fifa.com/worldcup/news/argentina-win");
        assert_eq!(citations[1].id, 2);
        assert_eq!(citations[1].url, "https://fifa-world-cup-2022.com/final");
    }

    #[test]
    fn test_legacy_first_document_wins() {
        // "World Cup 2022" is contained in both titles
        let raw = RawCitations::Legacy(vec!["world cup 2022".to_string()]);
        let citations = reconcile(raw, &docs());
        assert_eq!(citations[0].title, "Argentina win World Cup 2022");
    }

    #[test]
    fn test_legacy_unmatched_keeps_raw_text() {
        let raw = RawCitations::Legacy(vec!["Wikipedia".to_string()]);
        let citations = reconcile(raw, &docs());
        assert_eq!(
            citations,
            vec![Citation {
                id: 1,
                title: "Wikipedia".to_string(),
                url: String::new(),
            }]
        );
    }

    #[test]
    fn test_from_value_non_array_is_empty() {
        assert!(RawCitations::from_value(Some(&json!("none"))).is_empty());
        assert!(RawCitations::from_value(None).is_empty());
    }

    #[test]
    fn test_fallback_answer_with_documents() {
        let (answer, citations) = fallback_answer(&docs());
        assert_eq!(
            answer,
            "Based on the search results, here's what I found: Argentina won the 2022 FIFA World Cup. [1]"
        );
        assert_eq!(citations.len(), 1);
        assert_eq!(citations[0].url, "https://www.fifa.com/worldcup/news/argentina-win");
    }

    #[test]
    fn test_fallback_answer_without_documents() {
        let (answer, citations) = fallback_answer(&[]);
        assert_eq!(answer, NO_INFORMATION);
        assert!(citations.is_empty());
    }
}
