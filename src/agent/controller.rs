use tracing::{debug, info};

use crate::search::types::Document;

use super::slots::{ReflectionReport, SlotState};

/// Stages of a research session. The topology is fixed:
/// generate, search, reflect, decide, then update-and-search again or synthesize.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stage {
    Generate,
    Search,
    Reflect,
    Decide,
    Update { queries: Vec<String> },
    Synthesize,
}

/// Outcome of the decide step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// Start another round with these queries.
    Continue { queries: Vec<String> },
    Synthesize,
}

/// Mutable per-session state, owned by one session.
#[derive(Debug, Clone)]
pub struct IterationState {
    pub round: u32,
    pub max_rounds: u32,
    pub active_queries: Vec<String>,
    pub docs: Vec<Document>,
    pub slots: SlotState,
    pub need_more: bool,
    pub pending_queries: Vec<String>,
}

impl IterationState {
    pub fn new(max_rounds: u32) -> Self {
        Self {
            round: 0,
            max_rounds,
            active_queries: Vec::new(),
            docs: Vec::new(),
            slots: SlotState::default(),
            need_more: false,
            pending_queries: Vec::new(),
        }
    }

    /// Take over the validated outcome of a reflection.
    pub fn absorb(&mut self, report: ReflectionReport) {
        self.slots = report.slots;
        self.need_more = report.need_more;
        self.pending_queries = report.pending_queries;
    }

    fn has_budget(&self) -> bool {
        self.round < self.max_rounds
    }

    /// Decide whether to search again or answer now.
    ///
    /// Every branch that continues requires pending queries and remaining round
    /// budget, so a session reflects at most `max_rounds + 1` times.
    pub fn decide(&self) -> Transition {
        let can_continue = !self.pending_queries.is_empty() && self.has_budget();

        let go = if !self.slots.has_declared() {
            self.need_more && can_continue
        } else {
            let missing = self.slots.missing();
            debug!(
                round = self.round,
                declared = self.slots.declared.len(),
                filled = self.slots.filled.len(),
                missing = missing.len(),
                "Slot analysis"
            );

            if !missing.is_empty() {
                if self.pending_queries.is_empty() {
                    info!(missing = ?missing, "No queries left for missing slots, answering with incomplete evidence");
                } else if !self.has_budget() {
                    info!(missing = ?missing, round = self.round, "Round budget spent with missing slots");
                }
                can_continue
            } else {
                self.need_more && can_continue
            }
        };

        if go {
            Transition::Continue {
                queries: self.pending_queries.clone(),
            }
        } else {
            Transition::Synthesize
        }
    }

    /// Enter the next round. Documents are collected fresh each round and
    /// fill status starts over; declared slots carry across.
    pub fn advance(&mut self, queries: Vec<String>) {
        self.round += 1;
        self.active_queries = queries;
        self.docs.clear();
        self.slots.filled.clear();
        self.need_more = false;
        self.pending_queries.clear();
        debug!(round = self.round, queries = ?self.active_queries, "Advanced to next round");
    }
}
