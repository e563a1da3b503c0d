//! Slot completeness evaluation.
//!
//! The reflection step reports which information slots a question needs and
//! which of them the current documents fill. That report comes from a model and
//! is never trusted as-is: this module repairs it and decides whether another
//! search round is needed and with which queries.

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::search::types::Document;

use super::parse::string_list;

/// Fewer documents than this with no declared slots means search again.
const MIN_DOCS_WITHOUT_SLOTS: usize = 2;
/// Stricter threshold when the reflection could not be parsed at all.
const MIN_DOCS_UNPARSED: usize = 3;

/// Declared and filled slots. `filled` is always a subset of `declared`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SlotState {
    pub declared: Vec<String>,
    pub filled: Vec<String>,
}

impl SlotState {
    /// Declared slots not yet filled, in declaration order.
    pub fn missing(&self) -> Vec<String> {
        self.declared
            .iter()
            .filter(|s| !self.filled.contains(s))
            .cloned()
            .collect()
    }

    pub fn has_declared(&self) -> bool {
        !self.declared.is_empty()
    }
}

/// Reflection output as the model produced it. Every field is optional; a
/// field that is absent or of the wrong shape is `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawReflection {
    pub slots: Option<Vec<String>>,
    pub filled: Option<Vec<String>>,
    pub need_more: Option<bool>,
    pub new_queries: Option<Vec<String>>,
}

impl RawReflection {
    /// Best-effort read of a reflection object. Anything other than a JSON
    /// object is unusable and yields `None`.
    pub fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        Some(Self {
            slots: string_list(obj.get("slots")),
            filled: string_list(obj.get("filled")),
            need_more: obj.get("need_more").and_then(Value::as_bool),
            new_queries: string_list(obj.get("new_queries")),
        })
    }
}

/// The sanitized decision input handed to the iteration controller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReflectionReport {
    pub slots: SlotState,
    pub need_more: bool,
    pub pending_queries: Vec<String>,
    /// Filled slots the model reported that were never declared.
    pub dropped: Vec<String>,
}

/// Validates raw reflections against the question and the documents at hand.
#[derive(Debug, Clone)]
pub struct SlotEvaluator {
    max_fallback_queries: usize,
}

impl Default for SlotEvaluator {
    fn default() -> Self {
        Self {
            max_fallback_queries: 3,
        }
    }
}

impl SlotEvaluator {
    pub fn new(max_fallback_queries: usize) -> Self {
        Self {
            max_fallback_queries: max_fallback_queries.max(1),
        }
    }

    /// Turn a raw reflection (or its absence) into a report the controller can act on.
    ///
    /// Missing declared slots always force another round, whatever the model
    /// said, and a report asking for more always carries at least one query.
    pub fn evaluate(
        &self,
        raw: Option<RawReflection>,
        question: &str,
        docs: &[Document],
    ) -> ReflectionReport {
        let Some(raw) = raw else {
            warn!(
                doc_count = docs.len(),
                "Reflection unusable, falling back to document count"
            );
            return by_document_count(question, docs, MIN_DOCS_UNPARSED);
        };

        let declared = dedup(raw.slots.unwrap_or_default());
        if declared.is_empty() {
            debug!(doc_count = docs.len(), "No slots declared, falling back to document count");
            return by_document_count(question, docs, MIN_DOCS_WITHOUT_SLOTS);
        }

        let (filled, dropped): (Vec<String>, Vec<String>) = dedup(raw.filled.unwrap_or_default())
            .into_iter()
            .partition(|s| declared.contains(s));
        if !dropped.is_empty() {
            warn!(dropped = ?dropped, declared = ?declared, "Filled slots not in declared set, dropping");
        }

        let slots = SlotState { declared, filled };
        let missing = slots.missing();
        let mut pending = raw.new_queries.unwrap_or_default();

        let need_more = if missing.is_empty() {
            let need_more = raw.need_more.unwrap_or(false);
            if need_more {
                info!(filled = ?slots.filled, "All slots filled but reflection asks for more");
            } else {
                debug!(filled = ?slots.filled, "All slots filled");
            }
            need_more
        } else {
            if raw.need_more == Some(false) {
                warn!(missing = ?missing, "Reflection claimed completeness with missing slots, overriding");
            }
            if pending.is_empty() {
                pending = self.fallback_queries(&missing, question);
                debug!(queries = ?pending, "Synthesized fallback queries for missing slots");
            }
            info!(missing = ?missing, "Slots missing");
            true
        };

        ReflectionReport {
            slots,
            need_more,
            pending_queries: pending,
            dropped,
        }
    }

    /// One targeted query per missing slot, capped.
    pub fn fallback_queries(&self, missing: &[String], question: &str) -> Vec<String> {
        missing
            .iter()
            .take(self.max_fallback_queries)
            .map(|slot| slot_query(slot, question))
            .collect()
    }
}

/// Query template for a slot, keyed on a few well-known slot names.
fn slot_query(slot: &str, question: &str) -> String {
    match slot.to_lowercase().as_str() {
        "winner" | "loser" | "participants" => format!("{} {}", slot, question),
        "score" | "result" | "outcome" => format!("final score result {}", question),
        "date" | "when" | "time" => format!("date when {}", question),
        "location" | "where" | "venue" => format!("location venue {}", question),
        _ => format!("{} {}", slot, question),
    }
}

fn by_document_count(question: &str, docs: &[Document], min_docs: usize) -> ReflectionReport {
    let need_more = docs.len() < min_docs;
    ReflectionReport {
        slots: SlotState::default(),
        need_more,
        pending_queries: if need_more {
            vec![question.to_string()]
        } else {
            Vec::new()
        },
        dropped: Vec::new(),
    }
}

/// Remove repeats, keeping first occurrence order.
fn dedup(items: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(items.len());
    for item in items {
        if !out.contains(&item) {
            out.push(item);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn docs(n: usize) -> Vec<Document> {
        (0..n)
            .map(|i| {
                Document::new(
                    &format!("Doc {}", i),
                    "info",
                    &format!("https://example.com/{}", i),
                    "q",
                )
            })
            .collect()
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn raw(slots: &[&str], filled: &[&str], need_more: bool, queries: &[&str]) -> RawReflection {
        RawReflection {
            slots: Some(strings(slots)),
            filled: Some(strings(filled)),
            need_more: Some(need_more),
            new_queries: Some(strings(queries)),
        }
    }

    const WORLD_CUP: &str = "Who won the 2022 World Cup?";

    #[test]
    fn test_all_slots_filled_respects_flag() {
        let eval = SlotEvaluator::default();
        let report = eval.evaluate(
            Some(raw(&["definition", "features"], &["definition", "features"], false, &[])),
            "What is Python?",
            &docs(2),
        );
        assert!(!report.need_more);
        assert!(report.pending_queries.is_empty());
        assert!(report.slots.missing().is_empty());
    }

    #[test]
    fn test_all_slots_filled_quality_continuation() {
        let eval = SlotEvaluator::default();
        let report = eval.evaluate(
            Some(raw(&["definition"], &["definition"], true, &["python history"])),
            "What is Python?",
            &docs(2),
        );
        assert!(report.need_more);
        assert_eq!(report.pending_queries, strings(&["python history"]));
    }

    #[test]
    fn test_missing_slots_force_continuation() {
        let eval = SlotEvaluator::default();
        for claimed in [true, false] {
            let report = eval.evaluate(
                Some(raw(&["winner", "score", "date"], &["winner"], claimed, &["q1", "q2"])),
                WORLD_CUP,
                &docs(5),
            );
            assert!(report.need_more, "need_more must be forced when claimed={}", claimed);
            assert_eq!(report.pending_queries, strings(&["q1", "q2"]));
            assert_eq!(report.slots.missing(), strings(&["score", "date"]));
        }
    }

    #[test]
    fn test_fallback_queries_from_templates() {
        let eval = SlotEvaluator::default();
        let report = eval.evaluate(
            Some(raw(&["winner", "score", "date", "venue"], &[], false, &[])),
            WORLD_CUP,
            &docs(1),
        );
        assert!(report.need_more);
        assert_eq!(
            report.pending_queries,
            vec![
                format!("winner {}", WORLD_CUP),
                format!("final score result {}", WORLD_CUP),
                format!("date when {}", WORLD_CUP),
            ]
        );
    }

    #[test]
    fn test_fallback_template_variants() {
        let q = "Q";
        assert_eq!(slot_query("participants", q), "participants Q");
        assert_eq!(slot_query("outcome", q), "final score result Q");
        assert_eq!(slot_query("time", q), "date when Q");
        assert_eq!(slot_query("where", q), "location venue Q");
        assert_eq!(slot_query("Location", q), "location venue Q");
        assert_eq!(slot_query("key_people", q), "key_people Q");
    }

    #[test]
    fn test_undeclared_filled_slots_dropped() {
        let eval = SlotEvaluator::default();
        let report = eval.evaluate(
            Some(raw(&["winner"], &["winner", "score"], false, &[])),
            WORLD_CUP,
            &docs(2),
        );
        assert_eq!(report.dropped, strings(&["score"]));
        assert_eq!(report.slots.filled, strings(&["winner"]));
        assert!(report.slots.missing().is_empty());
        assert!(!report.need_more);
    }

    #[test]
    fn test_repaired_state_always_subset() {
        let eval = SlotEvaluator::default();
        let cases = [
            raw(&["a"], &["a", "b", "c"], false, &[]),
            raw(&["a", "b"], &["c"], true, &[]),
            raw(&["a", "a", "b"], &["b", "b", "z"], false, &["x"]),
        ];
        for case in cases {
            let report = eval.evaluate(Some(case), "q", &docs(3));
            assert!(report
                .slots
                .filled
                .iter()
                .all(|s| report.slots.declared.contains(s)));
            assert!(!report.dropped.is_empty());
        }
    }

    #[test]
    fn test_no_slots_few_docs_resubmits_question() {
        let eval = SlotEvaluator::default();
        let report = eval.evaluate(
            Some(RawReflection {
                need_more: Some(true),
                new_queries: Some(strings(&["more specific query"])),
                ..Default::default()
            }),
            "What is Python?",
            &docs(1),
        );
        assert!(report.need_more);
        assert_eq!(report.pending_queries, strings(&["What is Python?"]));
        assert!(!report.slots.has_declared());
    }

    #[test]
    fn test_no_slots_enough_docs_stops() {
        let eval = SlotEvaluator::default();
        let report = eval.evaluate(
            Some(RawReflection {
                need_more: Some(true),
                ..Default::default()
            }),
            "What is Python?",
            &docs(2),
        );
        assert!(!report.need_more);
        assert!(report.pending_queries.is_empty());
    }

    #[test]
    fn test_unparsed_uses_stricter_threshold() {
        let eval = SlotEvaluator::default();

        let report = eval.evaluate(None, "What is Python?", &docs(2));
        assert!(report.need_more);
        assert_eq!(report.pending_queries, strings(&["What is Python?"]));

        let report = eval.evaluate(None, "What is Python?", &docs(3));
        assert!(!report.need_more);
        assert!(report.pending_queries.is_empty());
    }

    #[test]
    fn test_fallback_cap_is_configurable() {
        let eval = SlotEvaluator::new(1);
        let report = eval.evaluate(Some(raw(&["a", "b"], &[], true, &[])), "q", &docs(0));
        assert_eq!(report.pending_queries, strings(&["a q"]));
    }

    #[test]
    fn test_raw_from_value_tolerates_bad_fields() {
        let parsed = RawReflection::from_value(&json!({
            "slots": "winner",
            "filled": ["winner"],
            "need_more": "yes",
        }))
        .unwrap();
        assert_eq!(parsed.slots, None);
        assert_eq!(parsed.filled, Some(strings(&["winner"])));
        assert_eq!(parsed.need_more, None);
        assert_eq!(parsed.new_queries, None);

        assert!(RawReflection::from_value(&json!(["not", "an", "object"])).is_none());
    }
}
