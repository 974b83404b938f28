use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::error::AppError;
use crate::pipeline::JsonGenericPolicy;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub environment: String,
    pub delegate_webhook_url: Option<String>,
    pub delegate_timeout_secs: u64,
    pub llm_provider: String,
    pub llm_model: String,
    pub ollama_base_url: String,
    pub openai_api_key: Option<String>,
    pub anthropic_api_key: Option<String>,
    pub google_api_key: Option<String>,
    pub generator_timeout_secs: u64,
    pub generator_max_tokens: u32,
    pub generator_temperature: f32,
    pub default_country: Option<String>,
    pub json_generic_policy: JsonGenericPolicy,
    pub otel_service_name: String,
    pub otel_exporter_endpoint: String,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();

        let delegate_timeout_secs = parse_var("DELEGATE_TIMEOUT_SECS", 60)?;
        let generator_timeout_secs = parse_var("GENERATOR_TIMEOUT_SECS", 30)?;
        validate_timeouts(delegate_timeout_secs, generator_timeout_secs)?;

        let temperature: f32 = parse_var("GENERATOR_TEMPERATURE", 0.7)?;

        Ok(Self {
            port: parse_var("APP_PORT", 8080)?,
            environment: env::var("APP_ENVIRONMENT")
                .unwrap_or_else(|_| "development".to_string()),
            delegate_webhook_url: env::var("DELEGATE_WEBHOOK_URL")
                .ok()
                .filter(|url| !url.trim().is_empty()),
            delegate_timeout_secs,
            llm_provider: env::var("LLM_PROVIDER").unwrap_or_else(|_| "openai".to_string()),
            llm_model: env::var("LLM_MODEL").unwrap_or_else(|_| "gpt-3.5-turbo".to_string()),
            ollama_base_url: env::var("OLLAMA_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:11434".to_string()),
            openai_api_key: env::var("OPENAI_API_KEY").ok(),
            anthropic_api_key: env::var("ANTHROPIC_API_KEY").ok(),
            google_api_key: env::var("GOOGLE_API_KEY").ok(),
            generator_timeout_secs,
            generator_max_tokens: parse_var("GENERATOR_MAX_TOKENS", 1000)?,
            generator_temperature: temperature.clamp(0.0, 1.0),
            default_country: match env::var("DEFAULT_COUNTRY") {
                Ok(value) => Some(value.trim().to_string()).filter(|c| !c.is_empty()),
                Err(_) => Some("United States".to_string()),
            },
            json_generic_policy: parse_var("JSON_GENERIC_POLICY", JsonGenericPolicy::Render)?,
            otel_service_name: env::var("OTEL_SERVICE_NAME")
                .unwrap_or_else(|_| "market-report-proxy".to_string()),
            otel_exporter_endpoint: env::var("OTEL_EXPORTER_OTLP_ENDPOINT")
                .unwrap_or_else(|_| "http://localhost:4317".to_string()),
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn delegate_timeout(&self) -> Duration {
        Duration::from_secs(self.delegate_timeout_secs)
    }

    pub fn generator_timeout(&self) -> Duration {
        Duration::from_secs(self.generator_timeout_secs)
    }
}

fn validate_timeouts(delegate_secs: u64, generator_secs: u64) -> Result<(), AppError> {
    if delegate_secs == 0 || generator_secs == 0 {
        return Err(AppError::Config("timeouts must be greater than zero".into()));
    }
    if generator_secs > delegate_secs {
        return Err(AppError::Config(
            "GENERATOR_TIMEOUT_SECS must not exceed DELEGATE_TIMEOUT_SECS".into(),
        ));
    }
    Ok(())
}

fn parse_var<T>(name: &str, default: T) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => parse_value(name, &raw),
        Err(_) => Ok(default),
    }
}

fn parse_value<T>(name: &str, raw: &str) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e| AppError::Config(format!("{name} is invalid ({raw:?}): {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_value_number() {
        let port: u16 = parse_value("APP_PORT", " 9090 ").unwrap();
        assert_eq!(port, 9090);
    }

    #[test]
    fn test_parse_value_rejects_garbage() {
        let err = parse_value::<u64>("DELEGATE_TIMEOUT_SECS", "soon").unwrap_err();
        assert!(err.to_string().contains("DELEGATE_TIMEOUT_SECS"));
    }

    #[test]
    fn test_parse_value_policy() {
        let policy: JsonGenericPolicy = parse_value("JSON_GENERIC_POLICY", "fallback").unwrap();
        assert_eq!(policy, JsonGenericPolicy::Fallback);
    }

    #[test]
    fn test_validate_timeouts_rejects_zero() {
        let err = validate_timeouts(0, 30).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
        assert!(validate_timeouts(60, 0).is_err());
    }

    #[test]
    fn test_validate_timeouts_generator_within_delegate() {
        let err = validate_timeouts(30, 31).unwrap_err();
        assert!(err.to_string().contains("GENERATOR_TIMEOUT_SECS"));
    }

    #[test]
    fn test_validate_timeouts_accepts_equal_and_defaults() {
        assert!(validate_timeouts(30, 30).is_ok());
        assert!(validate_timeouts(60, 30).is_ok());
    }
}
