// Sustained-threshold incident sweep. Single left-to-right pass, no incremental state:
// a threshold change can merge or split runs, so callers always rescan.

use chrono::NaiveDateTime;

use crate::models::{Incident, Sample};

/// Runs shorter than this are treated as noise and never reported.
pub const MIN_RUN_LENGTH: usize = 3;

struct Run {
    start: NaiveDateTime,
    end: NaiveDateTime,
    len: usize,
    peak: f64,
}

/// Reports every maximal run of at least [`MIN_RUN_LENGTH`] samples whose user + sys CPU is
/// strictly greater than `threshold`, in chronological (input) order.
pub fn detect_incidents(samples: &[Sample], threshold: f64) -> Vec<Incident> {
    detect_incidents_with(samples, threshold, MIN_RUN_LENGTH)
}

pub fn detect_incidents_with(
    samples: &[Sample],
    threshold: f64,
    min_run_length: usize,
) -> Vec<Incident> {
    let mut out = Vec::new();
    let mut run: Option<Run> = None;

    for s in samples {
        let total = s.total_cpu();
        if total > threshold {
            match run.as_mut() {
                Some(r) => {
                    r.len += 1;
                    r.end = s.timestamp;
                    r.peak = r.peak.max(total);
                }
                None => {
                    run = Some(Run {
                        start: s.timestamp,
                        end: s.timestamp,
                        len: 1,
                        peak: total,
                    })
                }
            }
        } else if let Some(r) = run.take() {
            close_run(r, min_run_length, &mut out);
        }
    }

    // An open run at the end of the view is flushed with the last in-run sample as `end`,
    // even when a range filter cut it short.
    if let Some(r) = run {
        close_run(r, min_run_length, &mut out);
    }
    out
}

fn close_run(run: Run, min_run_length: usize, out: &mut Vec<Incident>) {
    if run.len >= min_run_length {
        out.push(Incident {
            start: run.start,
            end: run.end,
            peak: run.peak,
        });
    }
}
