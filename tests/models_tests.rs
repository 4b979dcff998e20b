// Model serialization tests (wire field names, timestamp format, event tags)

mod common;

use common::{sample, ts};
use procview::models::*;
use serde_json::json;

#[test]
fn test_sample_uses_capture_field_names() {
    let json = serde_json::to_value(sample(3, 12.5, 2.25)).unwrap();
    assert_eq!(
        json,
        json!({
            "timestamp": "2024-05-01T12:00:03",
            "pid": 100,
            "cpu_user_percent": 12.5,
            "cpu_sys_percent": 2.25,
            "memory_percent": 40.0,
            "command": "test-proc",
        })
    );
}

#[test]
fn test_sample_omits_absent_optional_fields() {
    let mut s = sample(0, 1.0, 1.0);
    s.memory_percent = None;
    s.command = None;
    let json = serde_json::to_string(&s).unwrap();
    assert!(!json.contains("memory_percent"));
    assert!(!json.contains("command"));
    let back: Sample = serde_json::from_str(&json).unwrap();
    assert_eq!(back, s);
}

#[test]
fn test_timestamp_keeps_millis_when_present() {
    let t = ts(0) + chrono::Duration::milliseconds(250);
    assert_eq!(format_timestamp(&t), "2024-05-01T12:00:00.250");
    assert_eq!(parse_timestamp("2024-05-01T12:00:00.250"), Some(t));
    assert_eq!(format_timestamp(&ts(59)), "2024-05-01T12:00:59");
}

#[test]
fn test_timestamp_keeps_sub_millisecond_precision() {
    let micros = ts(0) + chrono::Duration::microseconds(123_456);
    assert_eq!(format_timestamp(&micros), "2024-05-01T12:00:00.123456");
    assert_eq!(parse_timestamp(&format_timestamp(&micros)), Some(micros));

    let nanos = ts(0) + chrono::Duration::nanoseconds(1);
    assert_eq!(format_timestamp(&nanos), "2024-05-01T12:00:00.000000001");
    assert_eq!(parse_timestamp(&format_timestamp(&nanos)), Some(nanos));
}

#[test]
fn test_range_bound_read_back_from_json_includes_sample() {
    let mut s = sample(0, 1.0, 1.0);
    s.timestamp += chrono::Duration::microseconds(500_700);
    let wire = serde_json::to_value(&s).unwrap();
    let range: TimeRange =
        serde_json::from_value(json!({ "start": wire["timestamp"], "end": wire["timestamp"] }))
            .unwrap();
    assert!(range.contains(&s.timestamp));
}

#[test]
fn test_parse_timestamp_variants() {
    assert_eq!(parse_timestamp("2024-05-01 12:00:07"), Some(ts(7)));
    assert_eq!(parse_timestamp("2024-05-01T12:00:07Z"), Some(ts(7)));
    assert_eq!(parse_timestamp("2024-05-01T14:00:07+02:00"), Some(ts(7)));
    assert_eq!(parse_timestamp("yesterday"), None);
    assert_eq!(parse_timestamp(""), None);
}

#[test]
fn test_time_range_accepts_null_and_empty_bounds() {
    let range: TimeRange = serde_json::from_str(r#"{"start": "", "end": null}"#).unwrap();
    assert!(range.is_unbounded());
    let range: TimeRange = serde_json::from_str("{}").unwrap();
    assert!(range.is_unbounded());
    let range: TimeRange =
        serde_json::from_str(r#"{"start": "2024-05-01T12:00:01", "end": null}"#).unwrap();
    assert_eq!(range, TimeRange::new(Some(ts(1)), None));
    assert!(serde_json::from_str::<TimeRange>(r#"{"start": "soon"}"#).is_err());
}

#[test]
fn test_time_range_serializes_missing_bounds_as_null() {
    let json = serde_json::to_value(TimeRange::new(None, Some(ts(2)))).unwrap();
    assert_eq!(json, json!({ "start": null, "end": "2024-05-01T12:00:02" }));
}

#[test]
fn test_session_event_tagging() {
    let json = serde_json::to_value(SessionEvent::StreamStarted).unwrap();
    assert_eq!(json, json!({ "type": "streamStarted" }));

    let json = serde_json::to_value(SessionEvent::Reloaded { count: 7 }).unwrap();
    assert_eq!(json, json!({ "type": "reloaded", "count": 7 }));

    let json = serde_json::to_value(SessionEvent::Sample {
        sample: sample(1, 5.0, 1.0),
    })
    .unwrap();
    assert_eq!(json["type"], "sample");
    assert_eq!(json["sample"]["timestamp"], "2024-05-01T12:00:01");

    let json = serde_json::to_value(SessionEvent::Analysis { analysis: None }).unwrap();
    assert_eq!(json, json!({ "type": "analysis", "analysis": null }));
}

#[test]
fn test_analysis_result_json_roundtrip() {
    let result = AnalysisResult {
        summary: "ok".into(),
        recommendations: vec![],
        severity: Severity::High,
    };
    let json = serde_json::to_string(&result).unwrap();
    assert!(json.contains("\"HIGH\""));
    let back: AnalysisResult = serde_json::from_str(&json).unwrap();
    assert_eq!(back, result);
}

#[test]
fn test_incident_timestamps_use_wire_format() {
    let incident = Incident {
        start: ts(4),
        end: ts(7),
        peak: 95.0,
    };
    let json = serde_json::to_value(&incident).unwrap();
    assert_eq!(
        json,
        json!({ "start": "2024-05-01T12:00:04", "end": "2024-05-01T12:00:07", "peak": 95.0 })
    );
}

#[test]
fn test_rounding_helpers() {
    assert_eq!(round2(12.345_6), 12.35);
    assert_eq!(round1(12.36), 12.4);
    assert_eq!(round1(0.04), 0.0);
}
