pub mod classify;
pub mod format;
pub mod generate;
pub mod orchestrator;

pub use generate::{GenerationConfig, LlmGenerator};
pub use orchestrator::{
    JsonGenericPolicy, OrchestratorSettings, ReportOrchestrator, ReportRequest, ReportResponse,
};
