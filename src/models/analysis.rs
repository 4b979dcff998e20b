// AI performance report shape (shared by the analysis backend and the persisted slot)

use serde::{Deserialize, Serialize};

/// Report severity; serializes to uppercase JSON (e.g. "HIGH").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub summary: String,
    pub recommendations: Vec<String>,
    pub severity: Severity,
}

impl AnalysisResult {
    /// Low-confidence report substituted whenever the external call fails.
    pub fn fallback() -> Self {
        Self {
            summary: "Failed to generate analysis using AI.".into(),
            recommendations: vec![
                "Check your network connection".into(),
                "Verify API Key".into(),
            ],
            severity: Severity::Low,
        }
    }

    pub fn is_fallback(&self) -> bool {
        *self == Self::fallback()
    }
}
