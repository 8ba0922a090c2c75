//! Robust statistics shared by the extraction and comparison stages.

/// Median of `values`, `0.0` for an empty slice. Non-finite entries are ignored.
pub fn median(values: &[f64]) -> f64 {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if sorted.is_empty() {
        return 0.0;
    }
    sorted.sort_by(|a, b| a.total_cmp(b));

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Merge sorted-or-unsorted vertical centers into line positions.
///
/// The first center of a line anchors it; later centers within `threshold`
/// of the last accepted position are dropped, not averaged.
pub fn cluster_lines(centers: &[f64], threshold: f64) -> Vec<f64> {
    let mut sorted: Vec<f64> = centers.iter().copied().filter(|v| v.is_finite()).collect();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let mut lines: Vec<f64> = Vec::new();
    for center in sorted {
        match lines.last() {
            Some(&last) if center - last <= threshold => {}
            _ => lines.push(center),
        }
    }
    lines
}

/// Consecutive differences of `values`.
pub fn diffs(values: &[f64]) -> Vec<f64> {
    values.windows(2).map(|pair| pair[1] - pair[0]).collect()
}

pub fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

/// Round half away from zero to `decimals` places. Non-finite input yields `0.0`.
pub fn round_to(value: f64, decimals: u32) -> f64 {
    if !value.is_finite() {
        return 0.0;
    }
    let factor = 10f64.powi(decimals as i32);
    let rounded = (value * factor).round() / factor;
    // -0.0 and 0.0 must serialize identically
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}
