pub mod citations;
pub mod controller;
pub mod generator;
pub mod parse;
pub mod prompts;
pub mod slots;

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use futures::FutureExt;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::search::{FanOut, SearchBackend};
use crate::state::ResearchConfig;

use citations::{fallback_answer, reconcile, Citation, NO_INFORMATION};
use controller::{IterationState, Stage, Transition};
use generator::{GenerateError, Generator};
use slots::SlotEvaluator;

const SESSION_FAILED: &str = "Error occurred while processing the question.";
const NO_ANSWER: &str = "Unable to generate answer.";

/// Terminal outcome of one research session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionResult {
    pub answer: String,
    pub citations: Vec<Citation>,
    pub slots: Vec<String>,
    pub filled_slots: Vec<String>,
    #[serde(rename = "iterations")]
    pub rounds: u32,
}

impl SessionResult {
    fn failed() -> Self {
        Self {
            answer: SESSION_FAILED.to_string(),
            citations: Vec::new(),
            slots: Vec::new(),
            filled_slots: Vec::new(),
            rounds: 0,
        }
    }
}

/// Drives the generate / search / reflect / decide loop for one question at a time.
pub struct ResearchEngine {
    generator: Arc<dyn Generator>,
    fan_out: FanOut,
    evaluator: SlotEvaluator,
    max_rounds: u32,
    max_initial_queries: usize,
}

impl ResearchEngine {
    pub fn new(
        generator: Arc<dyn Generator>,
        backend: Arc<dyn SearchBackend>,
        config: &ResearchConfig,
    ) -> Self {
        Self {
            generator,
            fan_out: FanOut::new(backend, Duration::from_secs(config.search_timeout_secs)),
            evaluator: SlotEvaluator::new(config.max_fallback_queries),
            max_rounds: config.max_rounds,
            max_initial_queries: config.max_initial_queries.max(1),
        }
    }

    /// Research a question. Never fails: anything that goes wrong inside the
    /// session, panics included, comes back as a generic error answer.
    ///
    /// Dropping the returned future cancels every search still in flight.
    pub async fn run(&self, question: &str, max_rounds: Option<u32>) -> SessionResult {
        let max_rounds = max_rounds.unwrap_or(self.max_rounds);

        match AssertUnwindSafe(self.run_session(question, max_rounds))
            .catch_unwind()
            .await
        {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => {
                error!(error = %e, "Research session failed");
                SessionResult::failed()
            }
            Err(_) => {
                error!("Research session panicked");
                SessionResult::failed()
            }
        }
    }

    async fn run_session(&self, question: &str, max_rounds: u32) -> Result<SessionResult> {
        anyhow::ensure!(!question.trim().is_empty(), "question is empty");

        info!(
            question,
            max_rounds,
            backend = self.fan_out.backend_name(),
            "Starting research session"
        );

        let mut state = IterationState::new(max_rounds);
        let mut stage = Stage::Generate;

        loop {
            debug!(round = state.round, stage = ?stage, "─── Stage ───");
            stage = match stage {
                Stage::Generate => {
                    state.active_queries = self.initial_queries(question).await;
                    Stage::Search
                }
                Stage::Search => {
                    state.docs = self.fan_out.search_all(&state.active_queries).await;
                    Stage::Reflect
                }
                Stage::Reflect => {
                    let raw = match self.generator.reflect(question, &state.docs).await {
                        Ok(raw) => Some(raw),
                        Err(e @ GenerateError::Malformed { .. }) => {
                            warn!(round = state.round, error = %e, "Reflection malformed");
                            None
                        }
                        Err(e) => {
                            warn!(round = state.round, error = %e, "Reflection request failed");
                            None
                        }
                    };
                    let report = self.evaluator.evaluate(raw, question, &state.docs);
                    state.absorb(report);
                    Stage::Decide
                }
                Stage::Decide => match state.decide() {
                    Transition::Continue { queries } => Stage::Update { queries },
                    Transition::Synthesize => Stage::Synthesize,
                },
                Stage::Update { queries } => {
                    state.advance(queries);
                    info!(round = state.round, queries = ?state.active_queries, "Searching again");
                    Stage::Search
                }
                Stage::Synthesize => break,
            };
        }

        let (answer, citations) = self.synthesize(question, &state).await;

        info!(
            rounds = state.round,
            doc_count = state.docs.len(),
            citations = citations.len(),
            answer_len = answer.len(),
            "Research session complete"
        );

        Ok(SessionResult {
            answer,
            citations,
            slots: state.slots.declared,
            filled_slots: state.slots.filled,
            rounds: state.round,
        })
    }

    /// First-round queries. Falls back to the question itself.
    async fn initial_queries(&self, question: &str) -> Vec<String> {
        let mut queries = match self.generator.generate_queries(question).await {
            Ok(queries) => queries,
            Err(e) => {
                warn!(error = %e, "Query generation failed, searching the question as-is");
                Vec::new()
            }
        };

        if queries.is_empty() {
            queries.push(question.to_string());
        }
        queries.truncate(self.max_initial_queries);
        debug!(queries = ?queries, "Initial queries");
        queries
    }

    async fn synthesize(&self, question: &str, state: &IterationState) -> (String, Vec<Citation>) {
        match self
            .generator
            .synthesize(question, &state.slots, &state.docs)
            .await
        {
            Ok(raw) if raw.citations.is_empty() && state.docs.is_empty() => {
                (NO_INFORMATION.to_string(), Vec::new())
            }
            Ok(raw) => {
                let answer = raw
                    .answer
                    .filter(|a| !a.trim().is_empty())
                    .unwrap_or_else(|| NO_ANSWER.to_string());
                (answer, reconcile(raw.citations, &state.docs))
            }
            Err(e) => {
                warn!(error = %e, doc_count = state.docs.len(), "Synthesis unusable, answering from first document");
                fallback_answer(&state.docs)
            }
        }
    }
}
