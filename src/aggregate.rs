//! Grouping/aggregation engine.
//!
//! One pass over normalized records, lazily creating a bucket per key. What
//! counts as a "win" is supplied by the caller because it depends on whose
//! perspective the grouping takes: the record's own flag, or whether the
//! project's winner is the group subject.
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::Serialize;

use crate::normalize::{NormalizedRecord, Period, UNKNOWN};
use crate::util::percentage;

/// Identity plus display label of a group.
///
/// Equality, ordering and hashing use `id` only; `label` is whatever the
/// first record of the group called it. Year ids are `YYYY`, month ids
/// `YYYY-MM`, so lexical order is chronological and `Unknown` sorts last.
#[derive(Debug, Clone, Serialize)]
pub struct GroupKey {
    pub id: String,
    pub label: String,
}

impl GroupKey {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
        }
    }

    /// Same text for identity and display.
    pub fn text(value: impl Into<String>) -> Self {
        let value = value.into();
        Self {
            label: value.clone(),
            id: value,
        }
    }

    pub fn unknown() -> Self {
        Self::text(UNKNOWN)
    }

    pub fn year(period: Period) -> Self {
        match period.year() {
            Some(y) => Self::text(format!("{:04}", y)),
            None => Self::unknown(),
        }
    }

    pub fn year_month(period: Period) -> Self {
        match period {
            Period::Known { year, month } => {
                Self::new(format!("{:04}-{:02}", year, month), period.to_string())
            }
            Period::Unknown => Self::unknown(),
        }
    }

    /// The bidding company (or the winner on project rows).
    pub fn bidder(record: &NormalizedRecord) -> Self {
        match (record.bidder_id(), record.bidder_name()) {
            (Some(id), Some(name)) => Self::new(id, name),
            _ => Self::unknown(),
        }
    }

    pub fn winner(record: &NormalizedRecord) -> Self {
        match (record.winner_id(), record.winner_name()) {
            (Some(id), Some(name)) => Self::new(id, name),
            _ => Self::unknown(),
        }
    }

    pub fn department(record: &NormalizedRecord) -> Self {
        Self::text(record.raw.dept_name.as_deref().unwrap_or(UNKNOWN))
    }
}

impl PartialEq for GroupKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for GroupKey {}

impl Hash for GroupKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl PartialOrd for GroupKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for GroupKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.id.cmp(&other.id)
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)
    }
}

/// Aggregates for one group. `members` keeps input order.
#[derive(Debug, Clone, Serialize)]
pub struct AggregateBucket {
    pub key: GroupKey,
    pub count: usize,
    pub total_value: f64,
    pub win_count: usize,
    pub price_cut_sum: f64,
    pub bid_ratio_sum: f64,
    pub bid_ratio_count: usize,
    pub members: Vec<NormalizedRecord>,
}

impl AggregateBucket {
    pub fn new(key: GroupKey) -> Self {
        Self {
            key,
            count: 0,
            total_value: 0.0,
            win_count: 0,
            price_cut_sum: 0.0,
            bid_ratio_sum: 0.0,
            bid_ratio_count: 0,
            members: Vec::new(),
        }
    }

    fn push(&mut self, record: &NormalizedRecord, won: bool) {
        self.count += 1;
        self.total_value += record.agreed_value;
        if won {
            self.win_count += 1;
        }
        self.price_cut_sum += record.price_cut;
        if let Some(ratio) = record.bid_ratio {
            self.bid_ratio_sum += ratio;
            self.bid_ratio_count += 1;
        }
        self.members.push(record.clone());
    }

    /// Percentage of member records that are wins; 0 for an empty bucket.
    pub fn win_rate(&self) -> f64 {
        percentage(self.win_count, self.count)
    }

    pub fn loss_count(&self) -> usize {
        self.count - self.win_count
    }

    pub fn avg_price_cut(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        self.price_cut_sum / self.count as f64
    }

    pub fn avg_bid_ratio(&self) -> f64 {
        if self.bid_ratio_count == 0 {
            return 0.0;
        }
        self.bid_ratio_sum / self.bid_ratio_count as f64
    }
}

pub type Grouping = BTreeMap<GroupKey, AggregateBucket>;

/// Group `records` by `key_fn`, counting a win whenever `is_win` holds for
/// the group's key and the record.
pub fn aggregate<K, W>(records: &[NormalizedRecord], key_fn: K, is_win: W) -> Grouping
where
    K: Fn(&NormalizedRecord) -> GroupKey,
    W: Fn(&GroupKey, &NormalizedRecord) -> bool,
{
    let mut groups = Grouping::new();
    for record in records {
        let key = key_fn(record);
        let bucket = groups
            .entry(key.clone())
            .or_insert_with(|| AggregateBucket::new(key));
        let won = is_win(&bucket.key, record);
        bucket.push(record, won);
    }
    tracing::trace!(records = records.len(), groups = groups.len(), "aggregated");
    groups
}

/// Buckets in key order.
pub fn into_buckets(groups: Grouping) -> Vec<AggregateBucket> {
    groups.into_values().collect()
}

/// Ready-made win predicates for [`aggregate`].
pub mod wins {
    use super::GroupKey;
    use crate::normalize::NormalizedRecord;

    /// The record's own resolved `won` flag.
    pub fn flagged(_: &GroupKey, record: &NormalizedRecord) -> bool {
        record.won
    }

    /// The project's winner is the group subject itself (matched by TIN or
    /// by name).
    pub fn winner_is_subject(key: &GroupKey, record: &NormalizedRecord) -> bool {
        let by_id = record.winner_id().is_some_and(|w| w == key.id);
        let by_name = record.raw.winner_name.as_deref().is_some_and(|w| w == key.label);
        by_id || by_name
    }

    /// The project's winner is a fixed company, regardless of grouping.
    pub fn winner_is(tin: &str) -> impl Fn(&GroupKey, &NormalizedRecord) -> bool + '_ {
        move |_, record| record.winner_id().is_some_and(|w| w == tin)
    }

    pub fn never(_: &GroupKey, _: &NormalizedRecord) -> bool {
        false
    }
}
