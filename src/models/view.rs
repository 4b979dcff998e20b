// Derived projections over the store: stats, incidents, the full session view

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::{AnalysisResult, Sample, TimeRange};

/// Aggregate metrics over a filtered view. `avg_mem` is `None` when no sample carries memory data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesStats {
    pub avg_user: f64,
    pub avg_sys: f64,
    pub max_total: f64,
    pub avg_mem: Option<f64>,
    pub count: usize,
}

/// A maximal run of consecutive samples whose user + sys CPU exceeded the threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Incident {
    #[serde(with = "crate::models::sample::timestamp_serde")]
    pub start: NaiveDateTime,
    #[serde(with = "crate::models::sample::timestamp_serde")]
    pub end: NaiveDateTime,
    pub peak: f64,
}

/// Everything a front end needs to render: recomputed from scratch on every request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct View {
    pub samples: Vec<Sample>,
    pub stats: SeriesStats,
    pub incidents: Vec<Incident>,
    pub threshold: u8,
    pub range: TimeRange,
    pub streaming: bool,
    pub analyzing: bool,
    pub analysis: Option<AnalysisResult>,
}

/// Pushed to /ws/stream subscribers; serializes as `{"type": "...", ...}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SessionEvent {
    /// One simulated sample appended by the stream.
    Sample { sample: Sample },
    /// The store was replaced wholesale (new upload or demo data).
    Reloaded { count: usize },
    StreamStarted,
    StreamStopped,
    Analysis { analysis: Option<AnalysisResult> },
}
