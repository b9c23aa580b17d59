//! Chart series construction.
//!
//! Every series in a set shares one `categories` allocation, so positional
//! alignment across series holds by construction. Values are dense: a
//! category with nothing to contribute gets 0, never a gap.
use std::collections::BTreeSet;
use std::sync::Arc;

use serde::Serialize;

use crate::aggregate::{aggregate, wins, AggregateBucket, GroupKey};
use crate::normalize::NormalizedRecord;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSeries {
    pub name: String,
    pub categories: Arc<[String]>,
    pub values: Vec<f64>,
}

/// A named value extractor, one per output series.
pub struct SeriesSpec<'a> {
    pub name: String,
    pub value_fn: Box<dyn Fn(&AggregateBucket) -> f64 + 'a>,
}

impl<'a> SeriesSpec<'a> {
    pub fn new(name: impl Into<String>, value_fn: impl Fn(&AggregateBucket) -> f64 + 'a) -> Self {
        Self {
            name: name.into(),
            value_fn: Box::new(value_fn),
        }
    }
}

fn dense(v: f64) -> f64 {
    if v.is_finite() {
        v
    } else {
        0.0
    }
}

/// One series per spec over the ranked groups, categories = group labels.
pub fn build_series(groups: &[AggregateBucket], specs: &[SeriesSpec<'_>]) -> Vec<ChartSeries> {
    build_series_with_labels(groups, specs, |b| b.key.label.clone())
}

pub fn build_series_with_labels<L>(
    groups: &[AggregateBucket],
    specs: &[SeriesSpec<'_>],
    label: L,
) -> Vec<ChartSeries>
where
    L: Fn(&AggregateBucket) -> String,
{
    let categories: Arc<[String]> = groups.iter().map(label).collect();
    specs
        .iter()
        .map(|spec| ChartSeries {
            name: spec.name.clone(),
            categories: Arc::clone(&categories),
            values: groups.iter().map(|g| dense((spec.value_fn)(g))).collect(),
        })
        .collect()
}

/// Drill-down entry for a stacked segment tooltip.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectPoint {
    pub name: String,
    pub value: f64,
    pub date: String,
}

/// Stacked breakdown: one series per stack key, aligned to the group
/// categories. `details[s][c]` lists up to the detail limit of projects
/// behind `series[s].values[c]`.
#[derive(Debug, Clone, Serialize)]
pub struct StackedChart {
    pub categories: Arc<[String]>,
    pub series: Vec<ChartSeries>,
    pub details: Vec<Vec<Vec<ProjectPoint>>>,
}

/// Distinct sub-keys over all members of `groups`, in key order.
pub fn stack_keys<K>(groups: &[AggregateBucket], sub_key: K) -> Vec<GroupKey>
where
    K: Fn(&NormalizedRecord) -> GroupKey,
{
    groups
        .iter()
        .flat_map(|g| g.members.iter().map(&sub_key))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Split each group's members by `sub_key` and sum agreed value per
/// (stack key, group). Stack keys not produced by `sub_key` yield all-zero
/// series; members whose sub-key is not listed are left out.
pub fn build_stacked<K>(
    groups: &[AggregateBucket],
    stacks: &[GroupKey],
    sub_key: K,
    detail_limit: usize,
) -> StackedChart
where
    K: Fn(&NormalizedRecord) -> GroupKey,
{
    let categories: Arc<[String]> = groups.iter().map(|g| g.key.label.clone()).collect();
    let per_group: Vec<_> = groups
        .iter()
        .map(|g| aggregate(&g.members, &sub_key, wins::never))
        .collect();

    let mut series = Vec::with_capacity(stacks.len());
    let mut details = Vec::with_capacity(stacks.len());
    for stack in stacks {
        let mut values = Vec::with_capacity(groups.len());
        let mut cells = Vec::with_capacity(groups.len());
        for split in &per_group {
            match split.get(stack) {
                Some(bucket) => {
                    values.push(dense(bucket.total_value));
                    cells.push(
                        bucket
                            .members
                            .iter()
                            .take(detail_limit)
                            .map(|r| ProjectPoint {
                                name: r.project_name().to_string(),
                                value: r.agreed_value,
                                date: r.date_text().to_string(),
                            })
                            .collect(),
                    );
                }
                None => {
                    values.push(0.0);
                    cells.push(Vec::new());
                }
            }
        }
        series.push(ChartSeries {
            name: stack.label.clone(),
            categories: Arc::clone(&categories),
            values,
        });
        details.push(cells);
    }

    StackedChart {
        categories,
        series,
        details,
    }
}
