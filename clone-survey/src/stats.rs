//! Summary statistics over repeated runs.

/// `q`-th percentile (0..=100) with linear interpolation between order
/// statistics, the NumPy default. `None` for an empty slice.
pub fn percentile(values: &[f64], q: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let rank = (q.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

pub fn median(values: &[f64]) -> Option<f64> {
    percentile(values, 50.0)
}

/// Per-column percentile of equally long rows (one row per run).
pub fn column_percentile(rows: &[Vec<f64>], q: f64) -> Vec<f64> {
    let width = rows.first().map_or(0, Vec::len);
    (0..width)
        .map(|j| {
            let column: Vec<f64> = rows.iter().filter_map(|r| r.get(j).copied()).collect();
            percentile(&column, q).unwrap_or(f64::NAN)
        })
        .collect()
}

/// Values sorted largest first: the rank-size distribution of a repertoire.
pub fn rank_sorted(values: &[f64]) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| b.total_cmp(a));
    sorted
}
