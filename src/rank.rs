//! Ranking and top-N windowing of aggregate buckets.
use std::cmp::Ordering;

use serde::Serialize;

use crate::aggregate::{AggregateBucket, GroupKey};

/// Metrics the dashboards rank by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Metric {
    TotalValue,
    Count,
    WinCount,
    WinRate,
    AvgPriceCut,
    AvgBidRatio,
}

impl Metric {
    pub fn value(self, bucket: &AggregateBucket) -> f64 {
        match self {
            Metric::TotalValue => bucket.total_value,
            Metric::Count => bucket.count as f64,
            Metric::WinCount => bucket.win_count as f64,
            Metric::WinRate => bucket.win_rate(),
            Metric::AvgPriceCut => bucket.avg_price_cut(),
            Metric::AvgBidRatio => bucket.avg_bid_ratio(),
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Metric::TotalValue => "Total Value",
            Metric::Count => "Total Bids",
            Metric::WinCount => "Wins",
            Metric::WinRate => "Win Rate (%)",
            Metric::AvgPriceCut => "Average Price Cut",
            Metric::AvgBidRatio => "Average Bid Ratio",
        }
    }
}

// NaN sinks to the bottom instead of poisoning the sort.
fn sortable(v: f64) -> f64 {
    if v.is_nan() {
        f64::NEG_INFINITY
    } else {
        v
    }
}

/// Sort `buckets` by `metric` descending, ties broken by ascending key id,
/// optionally move `pin` to the front, then keep at most `limit` entries
/// (the pinned one included).
pub fn rank<M>(
    buckets: Vec<AggregateBucket>,
    metric: M,
    limit: usize,
    pin: Option<&GroupKey>,
) -> Vec<AggregateBucket>
where
    M: Fn(&AggregateBucket) -> f64,
{
    if limit == 0 {
        return Vec::new();
    }
    let mut scored: Vec<(f64, AggregateBucket)> = buckets
        .into_iter()
        .map(|b| (sortable(metric(&b)), b))
        .collect();
    scored.sort_by(|a, b| {
        b.0.partial_cmp(&a.0)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.1.key.id.cmp(&b.1.key.id))
    });
    let mut ranked: Vec<AggregateBucket> = scored.into_iter().map(|(_, b)| b).collect();

    if let Some(pin) = pin {
        if let Some(pos) = ranked.iter().position(|b| &b.key == pin) {
            let pinned = ranked.remove(pos);
            ranked.insert(0, pinned);
        }
    }
    ranked.truncate(limit);
    ranked
}

/// Drop buckets with fewer than `min_count` records (the "minimum bids"
/// filter).
pub fn filter_min_count(buckets: Vec<AggregateBucket>, min_count: usize) -> Vec<AggregateBucket> {
    buckets.into_iter().filter(|b| b.count >= min_count).collect()
}
