//! Bucketing of a numeric signal into cohort labels.
//!
//! Both functions return 1-based labels with right-closed bins, so a value equal to a
//! bin edge falls into the lower bucket.

use crate::error::{EventError, Result};
use crate::event::GroupLabel;

fn check(values: &[f64], buckets: usize) -> Result<()> {
    if buckets == 0 {
        return Err(EventError::InvalidInput("bucket count must be positive".to_string()));
    }
    if values.iter().any(|v| !v.is_finite()) {
        return Err(EventError::InvalidInput("values must be finite".to_string()));
    }
    Ok(())
}

/// Equal-count buckets: edges at the `k / buckets` sample quantiles.
///
/// Quantiles are linearly interpolated between order statistics.
pub fn quantile_buckets(values: &[f64], buckets: usize) -> Result<Vec<GroupLabel>> {
    check(values, buckets)?;
    if values.is_empty() {
        return Ok(Vec::new());
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let last = (sorted.len() - 1) as f64;
    let edges: Vec<f64> = (1..buckets)
        .map(|k| {
            let pos = last * k as f64 / buckets as f64;
            let lo = pos.floor() as usize;
            let hi = pos.ceil() as usize;
            sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
        })
        .collect();

    Ok(values
        .iter()
        .map(|v| GroupLabel::Int(edges.iter().filter(|e| v > *e).count() as i64 + 1))
        .collect())
}

/// Equal-width buckets spanning the range of `values`.
pub fn equal_width_buckets(values: &[f64], buckets: usize) -> Result<Vec<GroupLabel>> {
    check(values, buckets)?;
    let Some(min) = values.iter().copied().reduce(f64::min) else {
        return Ok(Vec::new());
    };
    let max = values.iter().copied().fold(min, f64::max);
    let width = (max - min) / buckets as f64;

    Ok(values
        .iter()
        .map(|v| {
            let label = if width > 0.0 {
                ((v - min) / width).ceil().clamp(1.0, buckets as f64) as i64
            } else {
                1
            };
            GroupLabel::Int(label)
        })
        .collect())
}
