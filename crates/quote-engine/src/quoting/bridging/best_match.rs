//! Representative-row selection for bucketed bridging rates.
//!
//! Bridging sheets price in [min, max] buckets (LTV for Bridge, loan size
//! for Fusion). When several bucketed rows survive filtering, one
//! representative is chosen: a containing bucket wins (tightest first),
//! then the bucket whose midpoint sits closest to the value, then the
//! lowest-rate row, then the first row in source order.

use crate::catalog::RateRow;

/// Which bucket bounds the metric reads from a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BucketMetric {
    /// [min_ltv, max_ltv] — the Bridge convention.
    Ltv,
    /// [min_loan, max_loan] — the Fusion convention.
    LoanSize,
}

impl BucketMetric {
    fn bounds(self, row: &RateRow) -> Option<(f64, f64)> {
        let (min, max) = match self {
            BucketMetric::Ltv => (row.min_ltv, row.max_ltv),
            BucketMetric::LoanSize => (row.min_loan, row.max_loan),
        };
        match (min, max) {
            (Some(min), Some(max)) if min.is_finite() && max.is_finite() => Some((min, max)),
            _ => None,
        }
    }
}

pub fn pick_best<'a>(
    rows: &'a [RateRow],
    primary: Option<f64>,
    metric: BucketMetric,
) -> Option<&'a RateRow> {
    if rows.is_empty() {
        return None;
    }

    let value = match primary.filter(|value| value.is_finite()) {
        Some(value) => value,
        // No usable metric: fall back to the cheapest priced row.
        None => return lowest_rate(rows).or_else(|| rows.first()),
    };

    // Containing buckets win; the tightest (lowest max, then lowest min)
    // is preferred.
    let mut containing: Vec<(&RateRow, f64, f64)> = rows
        .iter()
        .filter_map(|row| {
            metric
                .bounds(row)
                .filter(|(min, max)| value >= *min && value <= *max)
                .map(|(min, max)| (row, min, max))
        })
        .collect();
    if !containing.is_empty() {
        containing.sort_by(|a, b| {
            a.2.partial_cmp(&b.2)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
        });
        return Some(containing[0].0);
    }

    // No containing bucket: closest midpoint, first row winning ties so
    // the choice stays stable in source order.
    let mut best: Option<&RateRow> = None;
    let mut best_distance = f64::INFINITY;
    for row in rows {
        if let Some((min, max)) = metric.bounds(row) {
            let midpoint = (min + max) / 2.0;
            let distance = (value - midpoint).abs();
            if distance < best_distance {
                best_distance = distance;
                best = Some(row);
            }
        }
    }
    if best.is_some() {
        return best;
    }

    lowest_rate(rows).or_else(|| rows.first())
}

fn lowest_rate(rows: &[RateRow]) -> Option<&RateRow> {
    rows.iter()
        .filter(|row| row.rate_value().is_some())
        .min_by(|a, b| {
            a.rate_value()
                .partial_cmp(&b.rate_value())
                .unwrap_or(std::cmp::Ordering::Equal)
        })
}
