// JSON-lines ingestion (best effort, line by line) and the demo series generator

use chrono::{Duration, Local, NaiveDateTime, Timelike};
use rand::Rng;
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::models::{Sample, parse_timestamp, round2};

/// Number of samples in the demo series (one per second, ending now).
pub const DEMO_LEN: usize = 60;
/// Demo samples with index strictly inside (start, end) are elevated.
pub const DEMO_SPIKE: (usize, usize) = (40, 50);
const DEMO_PID: i64 = 4242;
const DEMO_COMMAND: &str = "demo-worker --spike";

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("no valid lines found")]
    NoValidLines,
}

/// Why a line was dropped (logged, never surfaced).
#[derive(Debug)]
enum LineRejection {
    Json(serde_json::Error),
    NotAnObject,
    MissingCpu,
}

impl std::fmt::Display for LineRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LineRejection::Json(e) => write!(f, "invalid json: {}", e),
            LineRejection::NotAnObject => write!(f, "line is not a json object"),
            LineRejection::MissingCpu => write!(f, "missing numeric cpu_user_percent/cpu_sys_percent"),
        }
    }
}

/// Parses newline-delimited JSON samples. Invalid lines are skipped; input order is kept.
/// An empty result means nothing was usable; callers surface that as [`IngestError::NoValidLines`].
pub fn parse(text: &str) -> Vec<Sample> {
    let captured_at = capture_time();
    let mut out = Vec::new();
    let mut skipped = 0usize;

    for (idx, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match parse_line(line, idx + 1, captured_at) {
            Ok(sample) => out.push(sample),
            Err(reason) => {
                skipped += 1;
                debug!(line = idx + 1, reason = %reason, "skipping sample line");
            }
        }
    }

    info!(kept = out.len(), skipped, "parsed samples");
    out
}

/// Like [`parse`], but treats a fully unusable input as an error.
pub fn parse_non_empty(text: &str) -> Result<Vec<Sample>, IngestError> {
    let samples = parse(text);
    if samples.is_empty() {
        return Err(IngestError::NoValidLines);
    }
    Ok(samples)
}

/// Only an undecodable line or a missing/non-numeric CPU field drops the line.
/// Any other malformed field falls back to its default.
fn parse_line(line: &str, line_no: usize, captured_at: NaiveDateTime) -> Result<Sample, LineRejection> {
    let value: Value = serde_json::from_str(line).map_err(LineRejection::Json)?;
    let Value::Object(fields) = value else {
        return Err(LineRejection::NotAnObject);
    };
    let cpu = |key: &str| fields.get(key).and_then(Value::as_f64);
    let (Some(user), Some(sys)) = (cpu("cpu_user_percent"), cpu("cpu_sys_percent")) else {
        return Err(LineRejection::MissingCpu);
    };

    let timestamp = optional_field(&fields, "timestamp", line_no, |v| {
        v.as_str().and_then(parse_timestamp)
    })
    .unwrap_or(captured_at);
    let pid = optional_field(&fields, "pid", line_no, as_whole_i64).unwrap_or(0);
    let memory_percent = optional_field(&fields, "memory_percent", line_no, Value::as_f64);
    let command = optional_field(&fields, "command", line_no, |v| v.as_str().map(String::from));

    Ok(Sample {
        timestamp,
        pid,
        cpu_user_percent: round2(user),
        cpu_sys_percent: round2(sys),
        memory_percent: memory_percent.map(round2),
        command,
    })
}

/// Decodes `key` with `decode`. Absent or null → `None`; present but malformed → `None`, logged.
fn optional_field<T>(
    fields: &Map<String, Value>,
    key: &str,
    line_no: usize,
    decode: impl FnOnce(&Value) -> Option<T>,
) -> Option<T> {
    let value = fields.get(key).filter(|v| !v.is_null())?;
    let decoded = decode(value);
    if decoded.is_none() {
        debug!(line = line_no, field = key, value = %value, "malformed field; using default");
    }
    decoded
}

/// Integers, or floats with no fractional part (`1234.0`).
fn as_whole_i64(value: &Value) -> Option<i64> {
    value.as_i64().or_else(|| {
        value
            .as_f64()
            .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
            .map(|f| f as i64)
    })
}

fn capture_time() -> NaiveDateTime {
    let now = Local::now().naive_local();
    now.with_nanosecond(0).unwrap_or(now)
}

/// 60 one-second samples ending now, with an elevated CPU spike between indices 40 and 50.
pub fn generate_demo() -> Vec<Sample> {
    generate_demo_at(capture_time(), &mut rand::thread_rng())
}

pub fn generate_demo_at<R: Rng + ?Sized>(end: NaiveDateTime, rng: &mut R) -> Vec<Sample> {
    (0..DEMO_LEN)
        .map(|i| {
            let in_spike = i > DEMO_SPIKE.0 && i < DEMO_SPIKE.1;
            let (user_base, sys_base) = if in_spike { (60.0, 20.0) } else { (10.0, 2.0) };
            let offset = (DEMO_LEN - 1 - i) as i64;
            Sample {
                timestamp: end - Duration::seconds(offset),
                pid: DEMO_PID,
                cpu_user_percent: round2(user_base + rng.gen_range(0.0..5.0)),
                cpu_sys_percent: round2(sys_base + rng.gen_range(0.0..2.0)),
                memory_percent: Some(round2(45.0 + rng.gen_range(0.0..5.0))),
                command: Some(DEMO_COMMAND.into()),
            }
        })
        .collect()
}
