// AI performance report: downsample → prompt → external backend → normalized AnalysisResult.
// Backend failures degrade to AnalysisResult::fallback(); only a missing credential is an error.

mod client;

pub use client::GeminiBackend;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Value, json};
use tracing::{info, warn};

use crate::models::{AnalysisResult, Sample, format_timestamp};

#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    /// Detected before any network attempt.
    #[error("analysis API key is not configured")]
    MissingCredential,
    #[error("analysis request failed: {0}")]
    Request(String),
    #[error("analysis service returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("analysis response could not be decoded: {0}")]
    Decode(String),
}

/// What the backend is asked for: model, prompt text, and the JSON shape the reply must match.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisRequest {
    pub model: String,
    pub prompt: String,
    pub response_schema: Value,
}

/// External text-generation capability. Implementations return the raw JSON text of the reply.
#[async_trait]
pub trait AnalysisBackend: Send + Sync {
    fn has_credential(&self) -> bool;

    async fn generate(&self, request: &AnalysisRequest) -> Result<String, AnalysisError>;
}

/// One downsampled point as sent to the model.
#[derive(Debug, Serialize)]
struct PromptPoint {
    t: String,
    user: f64,
    sys: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    mem: Option<f64>,
}

/// Every Nth sample with `N = ceil(len / max_points)`, starting at the first.
pub fn downsample(samples: &[Sample], max_points: usize) -> Vec<&Sample> {
    if samples.is_empty() || max_points == 0 {
        return Vec::new();
    }
    let step = samples.len().div_ceil(max_points);
    samples.iter().step_by(step).collect()
}

pub fn build_prompt(points: &[&Sample]) -> String {
    let series: Vec<PromptPoint> = points
        .iter()
        .map(|s| PromptPoint {
            t: format_timestamp(&s.timestamp),
            user: s.cpu_user_percent,
            sys: s.cpu_sys_percent,
            mem: s.memory_percent,
        })
        .collect();
    let command = points
        .iter()
        .find_map(|s| s.command.as_deref())
        .unwrap_or("unknown");
    let data = serde_json::to_string(&series).unwrap_or_else(|_| "[]".into());

    format!(
        "You are a performance engineer reviewing CPU and memory usage of a single process \
         ({command}).\n\
         Each point has a timestamp (t), user CPU percent (user), system CPU percent (sys) \
         and memory percent (mem, when captured).\n\
         Identify sustained load, spikes, memory growth and likely causes. Reply with a short \
         summary, concrete recommendations, and an overall severity of LOW, MEDIUM or HIGH.\n\n\
         Data ({n} points):\n{data}",
        n = series.len(),
    )
}

/// JSON schema the backend must constrain its reply to.
pub fn response_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "summary": { "type": "STRING" },
            "recommendations": { "type": "ARRAY", "items": { "type": "STRING" } },
            "severity": { "type": "STRING", "enum": ["LOW", "MEDIUM", "HIGH"] }
        },
        "required": ["summary", "recommendations", "severity"]
    })
}

/// Decodes a reply into an AnalysisResult; tolerates a ```json fenced block around the object.
pub fn parse_response(text: &str) -> Result<AnalysisResult, AnalysisError> {
    let trimmed = text.trim();
    let body = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.trim_end().strip_suffix("```"))
        .unwrap_or(trimmed);
    serde_json::from_str(body.trim()).map_err(|e| AnalysisError::Decode(e.to_string()))
}

/// Requests a report for `samples`. Missing credential → `Err`; any other failure → fallback report.
pub async fn request_analysis(
    backend: &dyn AnalysisBackend,
    model: &str,
    samples: &[Sample],
    max_points: usize,
) -> Result<AnalysisResult, AnalysisError> {
    if !backend.has_credential() {
        return Err(AnalysisError::MissingCredential);
    }

    let points = downsample(samples, max_points);
    let request = AnalysisRequest {
        model: model.to_string(),
        prompt: build_prompt(&points),
        response_schema: response_schema(),
    };

    let outcome = match backend.generate(&request).await {
        Ok(text) => parse_response(&text),
        Err(e) => Err(e),
    };
    match outcome {
        Ok(result) => {
            info!(
                points = points.len(),
                severity = ?result.severity,
                "analysis complete"
            );
            Ok(result)
        }
        Err(AnalysisError::MissingCredential) => Err(AnalysisError::MissingCredential),
        Err(e) => {
            warn!(error = %e, "analysis failed; using fallback report");
            Ok(AnalysisResult::fallback())
        }
    }
}
