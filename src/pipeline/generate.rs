use std::sync::Arc;

use crate::llm::{GenerateRequest, LlmClient};

const SYSTEM_PROMPT: &str = "You are an expert market analyst.";

#[derive(Debug, Clone, PartialEq)]
pub enum GenerationOutcome {
    Success(String),
    Failure(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenerationConfig {
    pub model: String,
    pub max_output_tokens: u32,
    /// Clamped to `[0, 1]` when the request is built.
    pub temperature: f32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            model: "gpt-3.5-turbo".to_string(),
            max_output_tokens: 1000,
            temperature: 0.7,
        }
    }
}

/// Local text generation used when the workflow webhook cannot produce a report.
#[async_trait::async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, country: &str) -> GenerationOutcome;
}

pub struct LlmGenerator {
    llm_client: Arc<LlmClient>,
    config: GenerationConfig,
}

impl LlmGenerator {
    pub fn new(llm_client: Arc<LlmClient>, config: GenerationConfig) -> Self {
        Self { llm_client, config }
    }

    fn request_for(&self, country: &str) -> GenerateRequest {
        GenerateRequest {
            model: self.config.model.clone(),
            system: SYSTEM_PROMPT.to_string(),
            prompt: build_prompt(country),
            temperature: self.config.temperature.clamp(0.0, 1.0),
            max_tokens: self.config.max_output_tokens,
        }
    }
}

#[async_trait::async_trait]
impl Generator for LlmGenerator {
    #[tracing::instrument(
        name = "pipeline_stage generate",
        skip(self),
        fields(pipeline.stage = "generate", generate.output_len)
    )]
    async fn generate(&self, country: &str) -> GenerationOutcome {
        match self.llm_client.generate(&self.request_for(country)).await {
            Ok(resp) if resp.content.trim().is_empty() => {
                GenerationOutcome::Failure("provider returned an empty completion".to_string())
            }
            Ok(resp) => {
                tracing::Span::current().record("generate.output_len", resp.content.len());
                GenerationOutcome::Success(resp.content)
            }
            Err(e) => GenerationOutcome::Failure(e.to_string()),
        }
    }
}

/// Five-part market brief for one country.
pub fn build_prompt(country: &str) -> String {
    format!(
        "Act as a market intelligence analyst. For {country}, provide structured insights in this format:\n\
         (1) Title: A catchy, 1-line market headline relevant to the selected country.\n\
         (2) Lead Text: 3 concise lines summarizing the market opportunity or trend.\n\
         (3) Latest News: 5-6 lines highlighting a key piece of recent business news for this market.\n\
         (4) Regulation Snapshot: 5-6 lines about key regulatory factors or legal updates exporters should know.\n\
         (5) Export Opportunities: 5-6 lines describing specific export or partnership opportunities in this market.\n\n\
         Separate the five parts with a blank line."
    )
}
