//! Percentage breakdown by largest-remainder apportionment

use biaslens_core::{BiasScoreBreakdown, BreakdownCategory};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Turn raw, non-negative contributions into integer percentages that sum
/// to exactly 100.
///
/// `smoothing` is added to every contribution first. When it is positive,
/// every category is guaranteed at least 1%. If all contributions are zero
/// the 100 points are spread evenly.
pub fn apportion(raw: &[(BreakdownCategory, f32)], smoothing: f32) -> BiasScoreBreakdown {
    let n = raw.len();
    if n == 0 {
        return BiasScoreBreakdown::default();
    }

    let floor_each: u32 = if smoothing > 0.0 && n <= 100 { 1 } else { 0 };
    let budget = 100 - floor_each * n as u32;

    let mut weights: Vec<f64> = raw
        .iter()
        .map(|(_, v)| f64::from(v.max(0.0)) + f64::from(smoothing.max(0.0)))
        .collect();
    let mut total: f64 = weights.iter().sum();
    if total <= 0.0 || !total.is_finite() {
        weights = vec![1.0; n];
        total = n as f64;
    }

    let exact: Vec<f64> = weights
        .iter()
        .map(|w| w / total * f64::from(budget))
        .collect();
    let mut shares: Vec<u32> = exact.iter().map(|e| e.floor() as u32).collect();

    let assigned: u32 = shares.iter().sum();
    let mut remaining = budget.saturating_sub(assigned);

    // Largest fractional part first, ties in category order
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| {
        let fa = exact[a] - exact[a].floor();
        let fb = exact[b] - exact[b].floor();
        fb.partial_cmp(&fa).unwrap_or(Ordering::Equal)
    });
    for &idx in order.iter().cycle() {
        if remaining == 0 {
            break;
        }
        shares[idx] += 1;
        remaining -= 1;
    }

    let map: BTreeMap<_, _> = raw
        .iter()
        .zip(shares)
        .map(|((category, _), share)| (*category, share + floor_each))
        .collect();
    BiasScoreBreakdown(map)
}
