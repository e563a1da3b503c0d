use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

use crate::llm::{LlmClient, Message};
use crate::search::types::Document;

use super::citations::RawCitations;
use super::parse::{extract_json, string_list};
use super::prompts;
use super::slots::{RawReflection, SlotState};

#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    #[error("generator request failed: {0:#}")]
    Transport(#[from] anyhow::Error),
    #[error("generator returned malformed {stage} output")]
    Malformed { stage: &'static str },
}

/// Synthesis output as the model produced it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawSynthesis {
    pub answer: Option<String>,
    pub citations: RawCitations,
}

impl RawSynthesis {
    pub fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        Some(Self {
            answer: obj.get("answer").and_then(Value::as_str).map(str::to_string),
            citations: RawCitations::from_value(obj.get("citations")),
        })
    }
}

/// The text-generation capability the research loop depends on.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Propose search queries for a question.
    async fn generate_queries(&self, question: &str) -> Result<Vec<String>, GenerateError>;

    /// Judge slot coverage of the documents gathered this round.
    async fn reflect(
        &self,
        question: &str,
        docs: &[Document],
    ) -> Result<RawReflection, GenerateError>;

    /// Draft the final answer with citations.
    async fn synthesize(
        &self,
        question: &str,
        slots: &SlotState,
        docs: &[Document],
    ) -> Result<RawSynthesis, GenerateError>;
}

/// `Generator` backed by the chat completions client.
pub struct LlmGenerator {
    llm: Arc<LlmClient>,
}

impl LlmGenerator {
    pub fn new(llm: Arc<LlmClient>) -> Self {
        Self { llm }
    }

    async fn ask_json(&self, stage: &'static str, prompt: String) -> Result<Value, GenerateError> {
        let messages = vec![Message {
            role: "user".to_string(),
            content: prompt,
        }];

        let response = self.llm.chat(&messages, None).await?;
        debug!(stage, response_len = response.len(), "─── LLM Response ───");
        for line in response.lines().take(20) {
            debug!("  │ {}", line);
        }

        extract_json(&response).ok_or_else(|| {
            let preview: String = response.chars().take(300).collect();
            warn!(stage, raw = %preview, "LLM output is not JSON");
            GenerateError::Malformed { stage }
        })
    }
}

#[async_trait]
impl Generator for LlmGenerator {
    async fn generate_queries(&self, question: &str) -> Result<Vec<String>, GenerateError> {
        let today = chrono::Utc::now().format("%Y-%m-%d").to_string();
        let value = self
            .ask_json("generate_queries", prompts::generate_queries(question, &today))
            .await?;

        string_list(Some(&value)).ok_or(GenerateError::Malformed {
            stage: "generate_queries",
        })
    }

    async fn reflect(
        &self,
        question: &str,
        docs: &[Document],
    ) -> Result<RawReflection, GenerateError> {
        let value = self.ask_json("reflect", prompts::reflect(question, docs)).await?;
        RawReflection::from_value(&value).ok_or(GenerateError::Malformed { stage: "reflect" })
    }

    async fn synthesize(
        &self,
        question: &str,
        slots: &SlotState,
        docs: &[Document],
    ) -> Result<RawSynthesis, GenerateError> {
        let value = self
            .ask_json("synthesize", prompts::synthesize(question, slots, docs))
            .await?;
        RawSynthesis::from_value(&value).ok_or(GenerateError::Malformed {
            stage: "synthesize",
        })
    }
}
