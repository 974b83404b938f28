use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use opentelemetry::KeyValue;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::delegate::{Delegate, DelegateOutcome};
use crate::error::{AppError, AppResult, Degradation};
use crate::telemetry::metrics::{PAYLOAD_KINDS, REPORT_GENERATION_DURATION, REPORT_REQUESTS};

use super::classify::{ClassifiedPayload, classify};
use super::format::{format_report, render_json, wrap_fallback};
use super::generate::{GenerationOutcome, Generator};

pub const DEGRADED_MESSAGE: &str =
    "Market insights are currently unavailable. Please try again later.";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReportRequest {
    #[serde(default)]
    pub country: Option<String>,
}

/// Caller-facing payload. Exactly one shape per response.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReportResult {
    Html { html: String },
    Sections { sections: BTreeMap<String, String> },
    ErrorMessage { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportSource {
    Delegate,
    Fallback,
    Degraded,
}

impl ReportSource {
    pub fn as_str(self) -> &'static str {
        match self {
            ReportSource::Delegate => "delegate",
            ReportSource::Fallback => "fallback",
            ReportSource::Degraded => "degraded",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportResponse {
    pub id: Uuid,
    pub country: String,
    pub source: ReportSource,
    pub generated_at: DateTime<Utc>,
    pub report: ReportResult,
}

/// What to do with a webhook JSON payload that has no `html` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonGenericPolicy {
    /// Show the JSON as an escaped `<pre>` block.
    Render,
    /// Top-level object fields become named sections.
    Sections,
    /// Treat as unusable and run the fallback generator.
    Fallback,
}

impl FromStr for JsonGenericPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "render" => Ok(Self::Render),
            "sections" => Ok(Self::Sections),
            "fallback" => Ok(Self::Fallback),
            other => Err(format!(
                "unknown policy {other:?}, expected render, sections or fallback"
            )),
        }
    }
}

#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    pub delegate_timeout: Duration,
    pub generator_timeout: Duration,
    /// Used when the caller sends no country. `None` rejects such requests.
    pub default_country: Option<String>,
    pub json_generic_policy: JsonGenericPolicy,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            delegate_timeout: Duration::from_secs(60),
            generator_timeout: Duration::from_secs(30),
            default_country: Some("United States".to_string()),
            json_generic_policy: JsonGenericPolicy::Render,
        }
    }
}

/// Tries the workflow webhook once, then the generator once, and always ends
/// in a `ReportResult`. The two calls are strictly sequential.
pub struct ReportOrchestrator {
    delegate: Option<Arc<dyn Delegate>>,
    generator: Arc<dyn Generator>,
    settings: OrchestratorSettings,
}

impl ReportOrchestrator {
    pub fn new(
        delegate: Option<Arc<dyn Delegate>>,
        generator: Arc<dyn Generator>,
        settings: OrchestratorSettings,
    ) -> Self {
        Self {
            delegate,
            generator,
            settings,
        }
    }

    #[tracing::instrument(
        name = "report.generate",
        skip(self, request),
        fields(
            country = tracing::field::Empty,
            report.id = tracing::field::Empty,
            report.source = tracing::field::Empty,
            report.duration_ms = tracing::field::Empty,
        )
    )]
    pub async fn handle(&self, request: &ReportRequest) -> AppResult<ReportResponse> {
        let start = Instant::now();
        let country = self.resolve_country(request.country.as_deref())?;

        let span = tracing::Span::current();
        span.record("country", country.as_str());

        let (source, report) = match self.try_delegate(&country).await? {
            Some(report) => (ReportSource::Delegate, report),
            None => self.try_fallback(&country).await,
        };

        let response = ReportResponse {
            id: Uuid::new_v4(),
            country,
            source,
            generated_at: Utc::now(),
            report,
        };

        let duration = start.elapsed();
        REPORT_REQUESTS.add(1, &[KeyValue::new("report.source", source.as_str())]);
        REPORT_GENERATION_DURATION.record(
            duration.as_secs_f64(),
            &[KeyValue::new("report.source", source.as_str())],
        );

        span.record("report.id", response.id.to_string());
        span.record("report.source", source.as_str());
        span.record("report.duration_ms", duration.as_millis() as u64);

        tracing::info!(
            report.source = source.as_str(),
            duration_ms = duration.as_millis() as u64,
            "Report generated"
        );

        Ok(response)
    }

    fn resolve_country(&self, requested: Option<&str>) -> AppResult<String> {
        let trimmed = requested.map(str::trim).unwrap_or_default();

        if trimmed.is_empty() {
            return match &self.settings.default_country {
                Some(default) => {
                    tracing::debug!(country = %default, "No country given, using default");
                    Ok(default.clone())
                }
                None => Err(AppError::Validation("country is required".into())),
            };
        }

        Ok(trimmed.to_string())
    }

    /// `Ok(None)` means the webhook produced nothing usable and the fallback
    /// generator should run.
    async fn try_delegate(&self, country: &str) -> AppResult<Option<ReportResult>> {
        let Some(delegate) = &self.delegate else {
            tracing::debug!("No delegate webhook configured, going straight to fallback");
            return Ok(None);
        };

        let outcome =
            match tokio::time::timeout(self.settings.delegate_timeout, delegate.call(country))
                .await
            {
                Ok(outcome) => outcome,
                Err(_) => DelegateOutcome::Timeout,
            };

        match outcome {
            DelegateOutcome::Success { body, content_type } => {
                let payload = classify(&body, content_type.as_deref());
                PAYLOAD_KINDS.add(1, &[KeyValue::new("payload.kind", payload.kind())]);
                tracing::debug!(payload.kind = payload.kind(), "Classified delegate response");
                self.render_payload(payload)
            }
            DelegateOutcome::Timeout => {
                log_delegate_failure("timeout", None, "deadline expired");
                Ok(None)
            }
            DelegateOutcome::TransportError(message) => {
                log_delegate_failure("transport_error", None, &message);
                Ok(None)
            }
            DelegateOutcome::UpstreamError { status, body } => {
                log_delegate_failure("upstream_error", Some(status), &body);
                Ok(None)
            }
        }
    }

    fn render_payload(&self, payload: ClassifiedPayload) -> AppResult<Option<ReportResult>> {
        let report = match payload {
            ClassifiedPayload::Html(markup) => Some(ReportResult::Html { html: markup }),
            ClassifiedPayload::JsonWithHtml(markup) if markup.trim().is_empty() => {
                unusable_payload("json_with_html", "html field is empty");
                None
            }
            ClassifiedPayload::JsonWithHtml(markup) => Some(ReportResult::Html { html: markup }),
            ClassifiedPayload::JsonGeneric(value) => self.render_generic_json(value)?,
            ClassifiedPayload::PlainText(text) => render_text(&text, "plain_text"),
            ClassifiedPayload::Unparseable(text) => {
                tracing::warn!(
                    degradation = Degradation::MalformedUpstreamPayload.as_str(),
                    "Delegate response is not valid UTF-8, treating as plain text"
                );
                render_text(&text, "unparseable")
            }
        };
        Ok(report)
    }

    fn render_generic_json(&self, value: Value) -> AppResult<Option<ReportResult>> {
        match self.settings.json_generic_policy {
            JsonGenericPolicy::Fallback => {
                unusable_payload("json_generic", "no html field");
                Ok(None)
            }
            JsonGenericPolicy::Sections => match json_sections(&value) {
                Some(sections) => Ok(Some(ReportResult::Sections { sections })),
                None => render_json_diagnostic(&value).map(Some),
            },
            JsonGenericPolicy::Render => render_json_diagnostic(&value).map(Some),
        }
    }

    async fn try_fallback(&self, country: &str) -> (ReportSource, ReportResult) {
        let outcome = match tokio::time::timeout(
            self.settings.generator_timeout,
            self.generator.generate(country),
        )
        .await
        {
            Ok(outcome) => outcome,
            Err(_) => GenerationOutcome::Failure(format!(
                "generation timed out after {}s",
                self.settings.generator_timeout.as_secs_f64()
            )),
        };

        match outcome {
            GenerationOutcome::Success(text) => {
                tracing::info!("Report produced by fallback generator");
                let html = wrap_fallback(&format_report(&text));
                (ReportSource::Fallback, ReportResult::Html { html })
            }
            GenerationOutcome::Failure(reason) => {
                tracing::warn!(
                    degradation = Degradation::GenerationUnavailable.as_str(),
                    reason = %reason,
                    "Fallback generation failed, returning degraded report"
                );
                (
                    ReportSource::Degraded,
                    ReportResult::ErrorMessage {
                        message: DEGRADED_MESSAGE.to_string(),
                    },
                )
            }
        }
    }
}

fn log_delegate_failure(outcome: &str, status: Option<u16>, detail: &str) {
    tracing::warn!(
        degradation = Degradation::DelegateUnavailable.as_str(),
        delegate.outcome = outcome,
        http.response.status_code = status,
        detail = %truncate_detail(detail),
        "Delegate webhook failed, falling back to generator"
    );
}

fn unusable_payload(kind: &str, detail: &str) {
    tracing::warn!(
        degradation = Degradation::DelegateUnavailable.as_str(),
        payload.kind = kind,
        detail = detail,
        "Delegate response unusable, falling back to generator"
    );
}

fn render_text(text: &str, kind: &str) -> Option<ReportResult> {
    if text.trim().is_empty() {
        unusable_payload(kind, "empty body");
        return None;
    }
    Some(ReportResult::Html {
        html: format_report(text),
    })
}

fn render_json_diagnostic(value: &Value) -> AppResult<ReportResult> {
    render_json(value)
        .map(|html| ReportResult::Html { html })
        .map_err(|e| AppError::Internal(format!("failed to render delegate JSON: {e}")))
}

/// Top-level fields of a non-empty JSON object; non-string values keep their
/// JSON text.
fn json_sections(value: &Value) -> Option<BTreeMap<String, String>> {
    let object = value.as_object().filter(|o| !o.is_empty())?;
    Some(
        object
            .iter()
            .map(|(key, field)| {
                let text = match field {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                (key.clone(), text)
            })
            .collect(),
    )
}

fn truncate_detail(detail: &str) -> &str {
    const MAX: usize = 300;
    if detail.len() <= MAX {
        return detail;
    }
    let mut end = MAX;
    while !detail.is_char_boundary(end) {
        end -= 1;
    }
    &detail[..end]
}
