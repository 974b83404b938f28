pub mod anthropic;
pub mod client;
pub mod openai;

use std::sync::Arc;

pub use client::LlmClient;

#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub model: String,
    pub system: String,
    pub prompt: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

#[derive(Debug, Clone)]
pub struct GenerateResponse {
    pub content: String,
    pub model: String,
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub finish_reason: String,
}

#[async_trait::async_trait]
pub trait Provider: Send + Sync {
    async fn generate(&self, req: &GenerateRequest) -> anyhow::Result<GenerateResponse>;
    fn name(&self) -> &str;
}

/// Builds the provider named by `LLM_PROVIDER`. Unknown names fall back to OpenAI.
pub fn provider_from_config(config: &crate::config::Config) -> Arc<dyn Provider> {
    match config.llm_provider.as_str() {
        "anthropic" => Arc::new(anthropic::AnthropicProvider::new(
            config.anthropic_api_key.as_deref().unwrap_or(""),
        )),
        "google" => Arc::new(openai::OpenAIProvider::new_google(
            config.google_api_key.as_deref().unwrap_or(""),
        )),
        "ollama" => Arc::new(openai::OpenAIProvider::new_ollama(&config.ollama_base_url)),
        _ => Arc::new(openai::OpenAIProvider::new(
            config.openai_api_key.as_deref().unwrap_or(""),
        )),
    }
}
