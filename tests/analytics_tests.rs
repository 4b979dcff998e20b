// Statistics and incident detection tests

mod common;

use common::{sample, series_from_totals, ts};
use procview::analytics::incidents::detect_incidents_with;
use procview::analytics::{compute_stats, detect_incidents};

const TOTALS: [f64; 9] = [90.0, 90.0, 90.0, 10.0, 95.0, 95.0, 95.0, 95.0, 10.0];

#[test]
fn stats_on_empty_input() {
    let stats = compute_stats(&[]);
    assert_eq!(stats.count, 0);
    assert_eq!(stats.avg_user, 0.0);
    assert_eq!(stats.avg_sys, 0.0);
    assert_eq!(stats.max_total, 0.0);
    assert!(stats.avg_mem.is_none());
}

#[test]
fn stats_averages_and_peak() {
    let samples = vec![
        sample(0, 10.0, 2.0),
        sample(1, 20.0, 4.0),
        sample(2, 33.0, 3.0),
    ];
    let stats = compute_stats(&samples);
    assert_eq!(stats.count, 3);
    assert_eq!(stats.avg_user, 21.0);
    assert_eq!(stats.avg_sys, 3.0);
    assert_eq!(stats.max_total, 36.0);
    assert_eq!(stats.avg_mem, Some(40.0));
}

#[test]
fn stats_without_memory_has_no_memory_average() {
    let mut s = sample(0, 10.0, 2.0);
    s.memory_percent = None;
    let stats = compute_stats(&[s]);
    assert!(stats.avg_mem.is_none());
    assert_eq!(stats.count, 1);
}

#[test]
fn stats_serialize_memory_sentinel_as_null() {
    let json = serde_json::to_value(compute_stats(&[])).unwrap();
    assert!(json["avgMem"].is_null());
    assert_eq!(json["count"], 0);
    assert_eq!(json["maxTotal"], 0.0);
}

#[test]
fn incidents_require_runs_of_three() {
    let samples = series_from_totals(&TOTALS);
    let incidents = detect_incidents(&samples, 80.0);
    assert_eq!(incidents.len(), 2);

    assert_eq!(incidents[0].start, ts(0));
    assert_eq!(incidents[0].end, ts(2));
    assert_eq!(incidents[0].peak, 90.0);

    assert_eq!(incidents[1].start, ts(4));
    assert_eq!(incidents[1].end, ts(7));
    assert_eq!(incidents[1].peak, 95.0);
}

#[test]
fn raising_threshold_removes_all_incidents() {
    let samples = series_from_totals(&TOTALS);
    assert!(detect_incidents(&samples, 96.0).is_empty());
}

#[test]
fn short_runs_are_discarded_regardless_of_height() {
    let samples = series_from_totals(&[100.0, 100.0, 5.0, 100.0, 5.0, 99.0, 99.0]);
    assert!(detect_incidents(&samples, 80.0).is_empty());
}

#[test]
fn threshold_comparison_is_strict() {
    let samples = series_from_totals(&[80.0, 80.0, 80.0, 80.0]);
    assert!(detect_incidents(&samples, 80.0).is_empty());
    assert_eq!(detect_incidents(&samples, 79.0).len(), 1);
}

#[test]
fn open_run_is_flushed_at_end() {
    let samples = series_from_totals(&[10.0, 85.0, 91.0, 88.0]);
    let incidents = detect_incidents(&samples, 80.0);
    assert_eq!(incidents.len(), 1);
    assert_eq!(incidents[0].start, ts(1));
    assert_eq!(incidents[0].end, ts(3));
    assert_eq!(incidents[0].peak, 91.0);
}

#[test]
fn peak_uses_combined_cpu() {
    let samples = vec![
        sample(0, 50.0, 35.0),
        sample(1, 60.0, 39.5),
        sample(2, 45.0, 40.0),
    ];
    let incidents = detect_incidents(&samples, 80.0);
    assert_eq!(incidents.len(), 1);
    assert_eq!(incidents[0].peak, 99.5);
}

#[test]
fn custom_minimum_run_length() {
    let samples = series_from_totals(&[90.0, 90.0, 10.0, 90.0, 90.0, 90.0, 90.0]);
    assert_eq!(detect_incidents_with(&samples, 80.0, 2).len(), 2);
    assert_eq!(detect_incidents_with(&samples, 80.0, 4).len(), 1);
    assert!(detect_incidents_with(&samples, 80.0, 5).is_empty());
}

#[test]
fn empty_input_has_no_incidents() {
    assert!(detect_incidents(&[], 80.0).is_empty());
}
