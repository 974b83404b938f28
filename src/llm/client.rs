use std::sync::Arc;
use std::time::Instant;

use opentelemetry::KeyValue;
use tracing::Instrument;
use tracing_opentelemetry::OpenTelemetrySpanExt;

use super::{GenerateRequest, GenerateResponse, Provider};
use crate::telemetry::metrics::{GEN_AI_ERROR_COUNT, GEN_AI_OPERATION_DURATION, GEN_AI_TOKEN_USAGE};

/// Single-shot chat completion against one provider, with GenAI spans and
/// metrics around the call. Failures are returned as-is; there are no
/// retries at this layer.
pub struct LlmClient {
    provider: Arc<dyn Provider>,
}

impl LlmClient {
    pub fn new(provider: Arc<dyn Provider>) -> Self {
        Self { provider }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub async fn generate(&self, req: &GenerateRequest) -> anyhow::Result<GenerateResponse> {
        let provider_name = self.provider.name().to_string();
        let span_display_name = format!("gen_ai.chat {}", req.model);
        let start = Instant::now();

        let (server_addr, server_port) = provider_endpoint(&provider_name);

        let span = tracing::info_span!(
            "gen_ai.chat",
            otel.name = %span_display_name,
            gen_ai.operation.name = "chat",
            gen_ai.provider.name = %provider_name,
            gen_ai.request.model = %req.model,
            server.address = %server_addr,
            server.port = server_port,
            gen_ai.request.temperature = req.temperature,
            gen_ai.request.max_tokens = req.max_tokens as i64,
            gen_ai.response.model = tracing::field::Empty,
            gen_ai.usage.input_tokens = tracing::field::Empty,
            gen_ai.usage.output_tokens = tracing::field::Empty,
            gen_ai.response.finish_reasons = tracing::field::Empty,
            otel.status_code = tracing::field::Empty,
            error.type = tracing::field::Empty,
        );

        {
            let mut user_event_attrs =
                vec![KeyValue::new("gen_ai.prompt", truncate(&req.prompt, 1000))];
            if !req.system.is_empty() {
                user_event_attrs.push(KeyValue::new(
                    "gen_ai.system_instructions",
                    truncate(&req.system, 500),
                ));
            }
            span.add_event("gen_ai.user.message", user_event_attrs);
        }

        let result = self.provider.generate(req).instrument(span.clone()).await;

        let duration = start.elapsed().as_secs_f64();
        let op_kv = KeyValue::new("gen_ai.operation.name", "chat");
        let provider_kv = KeyValue::new("gen_ai.provider.name", provider_name.clone());

        match result {
            Ok(resp) => {
                span.record("gen_ai.response.model", resp.model.as_str());
                span.record("gen_ai.usage.input_tokens", resp.input_tokens as i64);
                span.record("gen_ai.usage.output_tokens", resp.output_tokens as i64);
                if !resp.finish_reason.is_empty() {
                    span.record(
                        "gen_ai.response.finish_reasons",
                        resp.finish_reason.as_str(),
                    );
                }

                span.add_event(
                    "gen_ai.assistant.message",
                    vec![KeyValue::new(
                        "gen_ai.completion",
                        truncate(&resp.content, 2000),
                    )],
                );

                let model_kv = KeyValue::new("gen_ai.request.model", resp.model.clone());

                GEN_AI_TOKEN_USAGE.record(
                    f64::from(resp.input_tokens),
                    &[
                        KeyValue::new("gen_ai.token.type", "input"),
                        op_kv.clone(),
                        provider_kv.clone(),
                        model_kv.clone(),
                    ],
                );
                GEN_AI_TOKEN_USAGE.record(
                    f64::from(resp.output_tokens),
                    &[
                        KeyValue::new("gen_ai.token.type", "output"),
                        op_kv.clone(),
                        provider_kv.clone(),
                        model_kv.clone(),
                    ],
                );
                GEN_AI_OPERATION_DURATION.record(duration, &[op_kv, provider_kv, model_kv]);

                Ok(resp)
            }
            Err(err) => {
                let error_type = classify_error(&err);
                span.record("otel.status_code", "ERROR");
                span.record("error.type", error_type);

                GEN_AI_ERROR_COUNT.add(
                    1,
                    &[
                        provider_kv,
                        KeyValue::new("gen_ai.request.model", req.model.clone()),
                        KeyValue::new("error.type", error_type),
                    ],
                );

                Err(err)
            }
        }
    }
}

fn provider_endpoint(provider_name: &str) -> (&'static str, i64) {
    match provider_name {
        "openai" => ("api.openai.com", 443),
        "anthropic" => ("api.anthropic.com", 443),
        "google" => ("generativelanguage.googleapis.com", 443),
        "ollama" => ("localhost", 11434),
        _ => ("unknown", 443),
    }
}

fn classify_error(err: &anyhow::Error) -> &'static str {
    let msg = err.to_string().to_lowercase();
    if msg.contains("rate limit") || msg.contains("429") || msg.contains("quota") {
        "rate_limit"
    } else if msg.contains("timeout") || msg.contains("timed out") || msg.contains("deadline") {
        "timeout"
    } else if msg.contains("401")
        || msg.contains("403")
        || msg.contains("auth")
        || msg.contains("api key")
    {
        "auth_error"
    } else if msg.contains("400") || msg.contains("422") || msg.contains("invalid") {
        "invalid_request"
    } else if msg.contains("500")
        || msg.contains("502")
        || msg.contains("503")
        || msg.contains("server")
    {
        "server_error"
    } else if msg.contains("connect")
        || msg.contains("dns")
        || msg.contains("network")
        || msg.contains("reset")
    {
        "network_error"
    } else {
        "unknown_error"
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    s[..end].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoProvider;

    #[async_trait::async_trait]
    impl Provider for EchoProvider {
        async fn generate(&self, req: &GenerateRequest) -> anyhow::Result<GenerateResponse> {
            Ok(GenerateResponse {
                content: format!("echo: {}", req.prompt),
                model: req.model.clone(),
                input_tokens: 12,
                output_tokens: 3,
                finish_reason: "stop".to_string(),
            })
        }

        fn name(&self) -> &str {
            "openai"
        }
    }

    struct QuotaProvider;

    #[async_trait::async_trait]
    impl Provider for QuotaProvider {
        async fn generate(&self, _req: &GenerateRequest) -> anyhow::Result<GenerateResponse> {
            Err(anyhow::anyhow!("429 quota exceeded"))
        }

        fn name(&self) -> &str {
            "anthropic"
        }
    }

    fn request() -> GenerateRequest {
        GenerateRequest {
            model: "gpt-3.5-turbo".to_string(),
            system: "You are an expert market analyst.".to_string(),
            prompt: "Chile".to_string(),
            temperature: 0.7,
            max_tokens: 1000,
        }
    }

    #[tokio::test]
    async fn test_generate_passes_response_through() {
        let client = LlmClient::new(Arc::new(EchoProvider));
        let resp = client.generate(&request()).await.unwrap();
        assert_eq!(resp.content, "echo: Chile");
        assert_eq!(resp.model, "gpt-3.5-turbo");
        assert_eq!(client.provider_name(), "openai");
    }

    #[tokio::test]
    async fn test_generate_surfaces_provider_error() {
        let client = LlmClient::new(Arc::new(QuotaProvider));
        let err = client.generate(&request()).await.unwrap_err();
        assert!(err.to_string().contains("quota"));
    }

    #[test]
    fn test_classify_error_categories() {
        let cases = vec![
            ("rate limit exceeded", "rate_limit"),
            ("status 429: too many requests", "rate_limit"),
            ("insufficient_quota", "rate_limit"),
            ("context deadline exceeded: timeout", "timeout"),
            ("request timed out", "timeout"),
            ("401 unauthorized", "auth_error"),
            ("invalid api key", "auth_error"),
            ("422 unprocessable entity", "invalid_request"),
            ("503 service unavailable", "server_error"),
            ("connection refused", "network_error"),
            ("something unexpected", "unknown_error"),
        ];

        for (msg, expected) in cases {
            let err = anyhow::anyhow!("{}", msg);
            assert_eq!(
                classify_error(&err),
                expected,
                "classify_error({msg:?}) should be {expected:?}"
            );
        }
    }

    #[test]
    fn test_provider_endpoint() {
        assert_eq!(provider_endpoint("openai"), ("api.openai.com", 443));
        assert_eq!(provider_endpoint("ollama"), ("localhost", 11434));
        assert_eq!(provider_endpoint("mystery"), ("unknown", 443));
    }

    #[test]
    fn test_truncate_multibyte_safe() {
        assert_eq!(truncate("hello", 10), "hello");
        let result = truncate("hé世界!", 3);
        assert!(result.len() <= 3);
        assert!(result.is_char_boundary(result.len()));
        assert_eq!(truncate("ab世", 3), "ab");
        assert_eq!(truncate("ab世界", 5), "ab世");
    }
}
