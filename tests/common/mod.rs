// Shared test helpers

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use procview::analysis::{AnalysisBackend, AnalysisError, AnalysisRequest};
use procview::analysis_repo::AnalysisRepo;
use procview::models::Sample;
use procview::session::{Session, SessionSettings};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tokio::sync::Notify;

/// 2024-05-01 12:00:00 + `offset_secs`.
pub fn ts(offset_secs: i64) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 5, 1)
        .unwrap()
        .and_hms_opt(12, 0, 0)
        .unwrap()
        + chrono::Duration::seconds(offset_secs)
}

pub fn sample(offset_secs: i64, user: f64, sys: f64) -> Sample {
    Sample {
        timestamp: ts(offset_secs),
        pid: 100,
        cpu_user_percent: user,
        cpu_sys_percent: sys,
        memory_percent: Some(40.0),
        command: Some("test-proc".into()),
    }
}

/// One sample per second whose user + sys equals each total (sys fixed at 0).
pub fn series_from_totals(totals: &[f64]) -> Vec<Sample> {
    totals
        .iter()
        .enumerate()
        .map(|(i, t)| sample(i as i64, *t, 0.0))
        .collect()
}

pub fn jsonl(samples: &[Sample]) -> String {
    samples
        .iter()
        .map(|s| serde_json::to_string(s).unwrap())
        .collect::<Vec<_>>()
        .join("\n")
}

pub const VALID_REPORT: &str =
    r#"{"summary":"Sustained load around the spike.","recommendations":["Profile the hot loop"],"severity":"MEDIUM"}"#;

/// Scripted stand-in for the external text-generation service.
pub struct FakeBackend {
    pub credential: bool,
    pub reply: Result<String, String>,
    pub calls: AtomicUsize,
    pub last_request: Mutex<Option<AnalysisRequest>>,
    /// When set, `generate` waits for a notification before replying.
    pub gate: Option<Arc<Notify>>,
}

impl FakeBackend {
    pub fn replying(text: &str) -> Self {
        Self {
            credential: true,
            reply: Ok(text.to_string()),
            calls: AtomicUsize::new(0),
            last_request: Mutex::new(None),
            gate: None,
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            reply: Err(message.to_string()),
            ..Self::replying("")
        }
    }

    pub fn without_credential() -> Self {
        Self {
            credential: false,
            ..Self::replying(VALID_REPORT)
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AnalysisBackend for FakeBackend {
    fn has_credential(&self) -> bool {
        self.credential
    }

    async fn generate(&self, request: &AnalysisRequest) -> Result<String, AnalysisError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().unwrap() = Some(request.clone());
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        self.reply.clone().map_err(AnalysisError::Request)
    }
}

pub async fn test_repo(dir: &TempDir) -> Arc<AnalysisRepo> {
    let path = dir.path().join("procview.db");
    let repo = AnalysisRepo::connect(path.to_str().unwrap()).await.unwrap();
    repo.init().await.unwrap();
    Arc::new(repo)
}

pub async fn test_session(
    dir: &TempDir,
    backend: Arc<FakeBackend>,
    settings: SessionSettings,
) -> Session {
    let repo = test_repo(dir).await;
    Session::new(settings, backend, repo)
}
