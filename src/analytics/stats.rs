use crate::models::{Sample, SeriesStats, round1};

/// Averages and peak over `samples`, one decimal place. Empty input → zeros and no memory average.
pub fn compute_stats(samples: &[Sample]) -> SeriesStats {
    let count = samples.len();
    if count == 0 {
        return SeriesStats {
            avg_user: 0.0,
            avg_sys: 0.0,
            max_total: 0.0,
            avg_mem: None,
            count: 0,
        };
    }

    let avg_user = mean_f64(&samples.iter().map(|s| s.cpu_user_percent).collect::<Vec<_>>());
    let avg_sys = mean_f64(&samples.iter().map(|s| s.cpu_sys_percent).collect::<Vec<_>>());
    let max_total = samples
        .iter()
        .map(Sample::total_cpu)
        .fold(f64::NEG_INFINITY, f64::max);

    let mem: Vec<f64> = samples.iter().filter_map(|s| s.memory_percent).collect();
    let avg_mem = (!mem.is_empty()).then(|| round1(mean_f64(&mem)));

    SeriesStats {
        avg_user: round1(avg_user),
        avg_sys: round1(avg_sys),
        max_total: round1(max_total),
        avg_mem,
        count,
    }
}

fn mean_f64(v: &[f64]) -> f64 {
    if v.is_empty() {
        return 0.0;
    }
    v.iter().sum::<f64>() / (v.len() as f64)
}
