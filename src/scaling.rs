//! Cross-sectional rescaling of a population of values.

const FLAT_TOLERANCE: f64 = 1e-12;

/// Result of rescaling a population. `degenerate` is set when the population
/// had no spread and every value was replaced by the fallback.
#[derive(Debug, Clone, PartialEq)]
pub struct Scaled {
    pub values: Vec<f64>,
    pub degenerate: bool,
}

impl Scaled {
    fn fallback(len: usize, value: f64) -> Self {
        Self {
            values: vec![value; len],
            degenerate: true,
        }
    }
}

fn bounds(values: &[f64]) -> Option<(f64, f64)> {
    let mut iter = values.iter().copied().filter(|v| v.is_finite());
    let first = iter.next()?;
    Some(iter.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v))))
}

fn is_flat(lo: f64, hi: f64) -> bool {
    (hi - lo).abs() <= FLAT_TOLERANCE
}

/// `x / max(population)`. The largest observation maps to exactly 1.0.
/// A flat (or non-positive) population maps to 0 everywhere.
pub fn scale_to_max(values: &[f64]) -> Scaled {
    let Some((lo, hi)) = bounds(values) else {
        return Scaled::fallback(values.len(), 0.0);
    };
    if is_flat(lo, hi) || hi <= 0.0 {
        return Scaled::fallback(values.len(), 0.0);
    }
    Scaled {
        values: values
            .iter()
            .map(|v| if v.is_finite() { (v / hi).clamp(0.0, 1.0) } else { 0.0 })
            .collect(),
        degenerate: false,
    }
}

/// `(max - x) / (max - min)`, for lower-is-better metrics such as team DEF.
/// The smallest observation maps to exactly 1.0, the largest to 0.0.
pub fn scale_inverted(values: &[f64]) -> Scaled {
    let Some((lo, hi)) = bounds(values) else {
        return Scaled::fallback(values.len(), 0.0);
    };
    if is_flat(lo, hi) {
        return Scaled::fallback(values.len(), 0.0);
    }
    let span = hi - lo;
    Scaled {
        values: values
            .iter()
            .map(|v| if v.is_finite() { ((hi - v) / span).clamp(0.0, 1.0) } else { 0.0 })
            .collect(),
        degenerate: false,
    }
}

/// Min-max onto `[lo, hi]`. A flat population maps to the range midpoint.
pub fn rescale_to_range(values: &[f64], lo: f64, hi: f64) -> Scaled {
    let midpoint = (lo + hi) / 2.0;
    let Some((min, max)) = bounds(values) else {
        return Scaled::fallback(values.len(), midpoint);
    };
    if is_flat(min, max) {
        return Scaled::fallback(values.len(), midpoint);
    }
    let span = max - min;
    Scaled {
        values: values
            .iter()
            .map(|v| {
                if v.is_finite() {
                    lo + (v - min) / span * (hi - lo)
                } else {
                    lo
                }
            })
            .collect(),
        degenerate: false,
    }
}

/// Percentile rank of each value within the population, on (0, 100].
/// Ties share their mean rank.
pub fn percentile_ranks(values: &[f64]) -> Vec<f64> {
    let n = values.len();
    if n == 0 {
        return Vec::new();
    }
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

    let mut ranks = vec![0.0; n];
    let mut start = 0usize;
    while start < n {
        let mut end = start + 1;
        while end < n && values[order[end]] == values[order[start]] {
            end += 1;
        }
        // 1-based ranks start+1 ..= end share their average.
        let avg_rank = (start + 1 + end) as f64 / 2.0;
        for &idx in &order[start..end] {
            ranks[idx] = avg_rank / n as f64 * 100.0;
        }
        start = end;
    }
    ranks
}

pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
