//! Dashboard views.
//!
//! Each view is the same normalize -> aggregate -> rank -> series pipeline,
//! differing only in the key, the win predicate, the metric and the window
//! it supplies.
use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::aggregate::{aggregate, into_buckets, wins, AggregateBucket, GroupKey};
use crate::normalize::{NormalizedRecord, UNKNOWN};
use crate::rank::{filter_min_count, rank, Metric};
use crate::series::{
    build_series, build_series_with_labels, build_stacked, ChartSeries, SeriesSpec, StackedChart,
};
use crate::types::{
    AdjacentCompany, BidRatioStats, BidStrategyResponse, CompetitorProject, DepartmentAnalysis,
    HeadToHeadCompetitor, HeadToHeadResponse, MonthlyTotal,
};
use crate::util::{average, median, round_to, std_dev, truncate_label};

/// Projects shown per stacked segment tooltip.
pub const DETAIL_LIMIT: usize = 5;
/// Companies need this many ratio-bearing bids to enter the percentile pool.
pub const PERCENTILE_MIN_BIDS: usize = 3;
pub const MAIN_MARKER: &str = " ★";

/// Winner of every project, resolved from whichever rows name it: an
/// explicit winner field, or a bid row flagged as the winning bid.
pub struct ProjectWinners {
    by_project: HashMap<String, String>,
}

impl ProjectWinners {
    pub fn from_records(records: &[NormalizedRecord]) -> Self {
        let mut by_project = HashMap::new();
        for r in records {
            let Some(project) = r.project_key() else {
                continue;
            };
            if let Some(winner) = r.winner_id() {
                by_project
                    .entry(project.to_string())
                    .or_insert_with(|| winner.to_string());
            } else if r.won && r.raw.company_tin.is_some() {
                if let Some(bidder) = r.bidder_id() {
                    by_project
                        .entry(project.to_string())
                        .or_insert_with(|| bidder.to_string());
                }
            }
        }
        Self { by_project }
    }

    pub fn winner_of(&self, record: &NormalizedRecord) -> Option<&str> {
        record
            .project_key()
            .and_then(|p| self.by_project.get(p))
            .map(String::as_str)
    }

    /// Did the record's bidder win its project? Falls back to the record's
    /// own flag when the project winner is unknown.
    pub fn bidder_won(&self, record: &NormalizedRecord) -> bool {
        match (self.winner_of(record), record.bidder_id()) {
            (Some(winner), Some(bidder)) => winner == bidder,
            _ => record.won,
        }
    }

    pub fn won_by(&self, record: &NormalizedRecord, company: &str) -> bool {
        self.winner_of(record).is_some_and(|w| w == company)
    }
}

/// Keep the first row per (bidder, project) so repeated bid rows count once.
/// Rows without a project identity are kept as they are.
pub fn dedupe_bids(records: &[NormalizedRecord]) -> Vec<NormalizedRecord> {
    let mut seen: HashSet<(String, String)> = HashSet::new();
    records
        .iter()
        .filter(|r| match (r.bidder_id(), r.project_key()) {
            (Some(b), Some(p)) => seen.insert((b.to_string(), p.to_string())),
            _ => true,
        })
        .cloned()
        .collect()
}

/// Keep the first row per project so a project's value counts once however
/// many bids it drew. Rows without a project identity are kept as they are.
pub fn dedupe_projects(records: &[NormalizedRecord]) -> Vec<NormalizedRecord> {
    let mut seen: HashSet<String> = HashSet::new();
    records
        .iter()
        .filter(|r| r.project_key().map_or(true, |p| seen.insert(p.to_string())))
        .cloned()
        .collect()
}

fn subject_projects<'a>(records: &'a [NormalizedRecord], subject: &str) -> HashSet<&'a str> {
    records
        .iter()
        .filter(|r| r.bidder_id() == Some(subject))
        .filter_map(NormalizedRecord::project_key)
        .collect()
}

fn subject_name(records: &[NormalizedRecord], subject: &str) -> Option<String> {
    records
        .iter()
        .find(|r| r.bidder_id() == Some(subject))
        .and_then(|r| r.bidder_name())
        .map(str::to_string)
}

#[derive(Debug, Clone, Serialize)]
pub struct MonthlyView {
    /// Known years, ascending, for the year selector.
    pub years: Vec<i32>,
    pub totals: Vec<MonthlyTotal>,
    pub series: Vec<ChartSeries>,
}

/// Total agreed value and project count per month, in calendar order with
/// undated projects in a trailing `Unknown` bucket. Each project counts
/// once however many bid rows it has.
pub fn monthly_totals(records: &[NormalizedRecord], year: Option<i32>) -> MonthlyView {
    let mut years: Vec<i32> = records
        .iter()
        .filter_map(|r| r.period.year())
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();
    years.sort_unstable();

    let projects = dedupe_projects(records);
    let selected: Vec<NormalizedRecord> = match year {
        Some(y) => projects
            .into_iter()
            .filter(|r| r.period.year() == Some(y))
            .collect(),
        None => projects,
    };
    let buckets = into_buckets(aggregate(
        &selected,
        |r| GroupKey::year_month(r.period),
        wins::never,
    ));

    let totals = buckets
        .iter()
        .map(|b| {
            let period = b.members[0].period;
            MonthlyTotal {
                month: period.month_label(),
                year: period.year(),
                total_sum_price_agree: b.total_value,
                count: b.count,
            }
        })
        .collect();
    let series = build_series(
        &buckets,
        &[
            SeriesSpec::new("Total Value", |b| b.total_value),
            SeriesSpec::new("Number of Projects", |b| b.count as f64),
        ],
    );
    MonthlyView {
        years,
        totals,
        series,
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TopCompaniesView {
    pub ranked: Vec<AggregateBucket>,
    pub chart: StackedChart,
}

/// Winners ranked by total agreed value, each bar split by year.
pub fn top_companies_by_year(records: &[NormalizedRecord], limit: usize) -> TopCompaniesView {
    let with_winner: Vec<NormalizedRecord> = records
        .iter()
        .filter(|r| r.winner_id().is_some())
        .cloned()
        .collect();
    let projects = dedupe_projects(&with_winner);
    let groups = aggregate(&projects, GroupKey::winner, wins::winner_is_subject);
    let ranked = rank(
        into_buckets(groups),
        |b| Metric::TotalValue.value(b),
        limit,
        None,
    );

    let mut years: Vec<i32> = ranked
        .iter()
        .flat_map(|b| b.members.iter().filter_map(|r| r.period.year()))
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();
    years.sort_unstable();
    let mut stacks: Vec<GroupKey> = years
        .into_iter()
        .map(|y| GroupKey::text(format!("{:04}", y)))
        .collect();
    stacks.push(GroupKey::new(UNKNOWN, "Unknown Year"));

    let chart = build_stacked(&ranked, &stacks, |r| GroupKey::year(r.period), DETAIL_LIMIT);
    TopCompaniesView { ranked, chart }
}

#[derive(Debug, Clone, Serialize)]
pub struct WinRateView {
    pub ranked: Vec<AggregateBucket>,
    pub series: Vec<ChartSeries>,
}

/// Bidders with at least `min_bids` bids, best win rate first.
pub fn win_rate_leaderboard(
    records: &[NormalizedRecord],
    min_bids: usize,
    limit: usize,
) -> WinRateView {
    leaderboard(bidder_buckets(records, |_| true), min_bids, limit)
}

fn leaderboard(buckets: Vec<AggregateBucket>, min_bids: usize, limit: usize) -> WinRateView {
    let eligible = filter_min_count(buckets, min_bids);
    let ranked = rank(eligible, |b| Metric::WinRate.value(b), limit, None);
    let series = build_series(
        &ranked,
        &[SeriesSpec::new(Metric::WinRate.title(), |b| b.win_rate())],
    );
    WinRateView { ranked, series }
}

/// Per-bidder buckets over deduplicated bids, restricted to rows `keep`
/// accepts. Project winners are resolved from every row first, so dropping
/// a winner's row does not turn its project into an unknown.
fn bidder_buckets<F>(records: &[NormalizedRecord], keep: F) -> Vec<AggregateBucket>
where
    F: Fn(&NormalizedRecord) -> bool,
{
    let bids = dedupe_bids(records);
    let winners = ProjectWinners::from_records(&bids);
    let kept: Vec<NormalizedRecord> = bids.into_iter().filter(|r| keep(r)).collect();
    into_buckets(aggregate(&kept, GroupKey::bidder, |_, r| winners.bidder_won(r)))
}

/// Competitors met on more than one shared project, with wins on those
/// projects counted for both sides. `None` when the subject never bid.
pub fn head_to_head(
    records: &[NormalizedRecord],
    subject: &str,
    top_n: usize,
) -> Option<HeadToHeadResponse> {
    let company = subject_name(records, subject)?;
    let bids = dedupe_bids(records);
    let winners = ProjectWinners::from_records(&bids);
    let shared = subject_projects(&bids, subject);

    let rivals: Vec<NormalizedRecord> = bids
        .iter()
        .filter(|r| r.bidder_id().is_some_and(|b| b != subject))
        .filter(|r| r.project_key().is_some_and(|p| shared.contains(p)))
        .cloned()
        .collect();
    let groups = aggregate(&rivals, GroupKey::bidder, |_, r| winners.won_by(r, subject));
    let repeated: Vec<AggregateBucket> = into_buckets(groups)
        .into_iter()
        .filter(|b| b.count > 1)
        .collect();
    let ranked = rank(repeated, |b| Metric::Count.value(b), top_n, None);

    let competitors = ranked
        .iter()
        .map(|b| {
            let competitor_wins = b
                .members
                .iter()
                .filter(|r| winners.won_by(r, &b.key.id))
                .count();
            HeadToHeadCompetitor {
                competitor_tin: b.key.id.clone(),
                competitor: b.key.label.clone(),
                encounters: b.count,
                company_wins: b.win_count,
                competitor_wins,
                win_rate_vs_competitor: round_to(b.win_rate(), 2),
            }
        })
        .collect();
    tracing::debug!(subject, "head-to-head computed");
    Some(HeadToHeadResponse {
        company,
        competitors,
    })
}

/// Companies that bid on any project the subject bid on, with their
/// overall record. `None` when the subject never bid.
pub fn adjacent_companies(
    records: &[NormalizedRecord],
    subject: &str,
    limit: usize,
) -> Option<Vec<AdjacentCompany>> {
    subject_name(records, subject)?;
    let bids = dedupe_bids(records);
    let winners = ProjectWinners::from_records(&bids);
    let shared = subject_projects(&bids, subject);

    let overlapping: Vec<NormalizedRecord> = bids
        .iter()
        .filter(|r| r.bidder_id().is_some_and(|b| b != subject))
        .filter(|r| r.project_key().is_some_and(|p| shared.contains(p)))
        .cloned()
        .collect();
    let common = rank(
        into_buckets(aggregate(&overlapping, GroupKey::bidder, wins::never)),
        |b| Metric::Count.value(b),
        limit,
        None,
    );
    let overall = aggregate(&bids, GroupKey::bidder, |_, r| winners.bidder_won(r));

    Some(
        common
            .into_iter()
            .map(|b| {
                let (total_bids, wins, win_rate) = overall
                    .get(&b.key)
                    .map(|o| (o.count, o.win_count, round_to(o.win_rate(), 1)))
                    .unwrap_or((0, 0, 0.0));
                AdjacentCompany {
                    tin: b.key.id,
                    company: b.key.label,
                    common_bids: b.count,
                    total_bids,
                    wins,
                    win_rate,
                }
            })
            .collect(),
    )
}

fn ratio_stats(ratios: &[f64], winning: &[f64], losing: &[f64]) -> BidRatioStats {
    let non_empty_avg = |v: &[f64]| (!v.is_empty()).then(|| average(v));
    BidRatioStats {
        avg_bid_ratio: average(ratios),
        median_bid_ratio: (!ratios.is_empty()).then(|| median(ratios.to_vec())),
        min_bid_ratio: ratios.iter().copied().reduce(f64::min).unwrap_or(0.0),
        max_bid_ratio: ratios.iter().copied().reduce(f64::max).unwrap_or(0.0),
        std_bid_ratio: std_dev(ratios),
        avg_winning_bid_ratio: non_empty_avg(winning),
        avg_losing_bid_ratio: non_empty_avg(losing),
        percentile: None,
    }
}

/// Bid-to-agreed-value ratio profile of the subject plus its results per
/// department. `None` when the subject never bid.
pub fn bid_strategy(records: &[NormalizedRecord], subject: &str) -> Option<BidStrategyResponse> {
    let company = subject_name(records, subject)?;
    let bids: Vec<NormalizedRecord> = dedupe_bids(records)
        .into_iter()
        .filter(|r| r.bid_value > 0.0)
        .collect();
    let winners = ProjectWinners::from_records(&dedupe_bids(records));
    let own: Vec<NormalizedRecord> = bids
        .iter()
        .filter(|r| r.bidder_id() == Some(subject))
        .cloned()
        .collect();

    let mut ratios = Vec::new();
    let mut winning = Vec::new();
    let mut losing = Vec::new();
    for r in &own {
        if let Some(ratio) = r.bid_ratio {
            ratios.push(ratio);
            if winners.bidder_won(r) {
                winning.push(ratio);
            } else {
                losing.push(ratio);
            }
        }
    }
    let mut stats = ratio_stats(&ratios, &winning, &losing);

    let pool: Vec<AggregateBucket> = into_buckets(aggregate(&bids, GroupKey::bidder, wins::never))
        .into_iter()
        .filter(|b| b.bid_ratio_count >= PERCENTILE_MIN_BIDS)
        .collect();
    if let Some(target) = pool.iter().find(|b| b.key.id == subject) {
        let target_avg = target.avg_bid_ratio();
        let below = pool.iter().filter(|b| b.avg_bid_ratio() <= target_avg).count();
        stats.percentile = Some(below as f64 * 100.0 / pool.len() as f64);
    }

    let with_dept: Vec<NormalizedRecord> = own
        .into_iter()
        .filter(|r| r.raw.dept_name.is_some())
        .collect();
    let departments = rank(
        into_buckets(aggregate(&with_dept, GroupKey::department, |_, r| {
            winners.bidder_won(r)
        })),
        |b| Metric::Count.value(b),
        usize::MAX,
        None,
    );
    let department_analysis = departments
        .iter()
        .map(|b| DepartmentAnalysis {
            dept_name: b.key.label.clone(),
            bids: b.count,
            wins: b.win_count,
            win_rate: round_to(b.win_rate(), 2),
            avg_bid_ratio: b.avg_bid_ratio(),
        })
        .collect();

    Some(BidStrategyResponse {
        company,
        bid_ratio_stats: stats,
        department_analysis,
    })
}

/// Series of the department breakdown, aligned to department names.
pub fn department_series(response: &BidStrategyResponse) -> Vec<ChartSeries> {
    let buckets: Vec<AggregateBucket> = response
        .department_analysis
        .iter()
        .map(|d| {
            let mut b = AggregateBucket::new(GroupKey::text(d.dept_name.clone()));
            b.count = d.bids;
            b.win_count = d.wins;
            b
        })
        .collect();
    build_series(
        &buckets,
        &[
            SeriesSpec::new("Bids", |b| b.count as f64),
            SeriesSpec::new(Metric::WinRate.title(), |b| b.win_rate()),
        ],
    )
}

#[derive(Debug, Clone, Serialize)]
pub struct ComparisonView {
    pub metric: Metric,
    pub ranked: Vec<AggregateBucket>,
    pub series: Vec<ChartSeries>,
}

/// Bidders ranked by `metric` with the main company pinned first, limited to
/// `scope` when one is given. Labels are shortened to `label_max` characters
/// and the main company is starred. The bid-count metric is split into
/// stacked wins and losses.
pub fn company_comparison(
    records: &[NormalizedRecord],
    main: &str,
    scope: Option<&NetworkScope>,
    metric: Metric,
    limit: usize,
    label_max: usize,
) -> ComparisonView {
    let buckets = bidder_buckets(records, |r| scope.map_or(true, |s| s.has_bidder(r)));
    let pin = GroupKey::text(main);
    let ranked = rank(buckets, |b| metric.value(b), limit, Some(&pin));

    let specs = match metric {
        Metric::Count => vec![
            SeriesSpec::new("Wins", |b: &AggregateBucket| b.win_count as f64),
            SeriesSpec::new("Losses", |b: &AggregateBucket| b.loss_count() as f64),
        ],
        _ => vec![SeriesSpec::new(metric.title(), move |b: &AggregateBucket| {
            metric.value(b)
        })],
    };
    let series = build_series_with_labels(&ranked, &specs, |b| {
        let mut label = truncate_label(&b.key.label, label_max);
        if b.key.id == main {
            label.push_str(MAIN_MARKER);
        }
        label
    });
    ComparisonView {
        metric,
        ranked,
        series,
    }
}

/// The selected company plus the companies it meets on shared projects.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NetworkScope {
    /// Subject first, then its adjacent companies by common bids.
    pub tins: Vec<String>,
}

impl NetworkScope {
    pub fn contains(&self, tin: &str) -> bool {
        self.tins.iter().any(|t| t == tin)
    }

    pub fn has_bidder(&self, record: &NormalizedRecord) -> bool {
        record.bidder_id().is_some_and(|b| self.contains(b))
    }

    /// Rows of projects won by a member.
    pub fn won_projects(&self, records: &[NormalizedRecord]) -> Vec<NormalizedRecord> {
        records
            .iter()
            .filter(|r| r.winner_id().is_some_and(|w| self.contains(w)))
            .cloned()
            .collect()
    }
}

/// `None` when the subject never bid.
pub fn network_scope(
    records: &[NormalizedRecord],
    subject: &str,
    adjacent_limit: usize,
) -> Option<NetworkScope> {
    let adjacent = adjacent_companies(records, subject, adjacent_limit)?;
    let mut tins = vec![subject.to_string()];
    tins.extend(adjacent.into_iter().map(|a| a.tin));
    Some(NetworkScope { tins })
}

/// Market views narrowed to a company network: monthly totals and top
/// companies over the projects its members won, win rates over its members'
/// bids.
#[derive(Debug, Clone, Serialize)]
pub struct NetworkView {
    pub scope: NetworkScope,
    pub monthly: MonthlyView,
    pub top_companies: TopCompaniesView,
    pub win_rates: WinRateView,
}

pub fn network_view(
    records: &[NormalizedRecord],
    scope: &NetworkScope,
    year: Option<i32>,
    top_limit: usize,
    min_bids: usize,
    win_rate_limit: usize,
) -> NetworkView {
    let won = scope.won_projects(records);
    let win_rates = leaderboard(
        bidder_buckets(records, |r| scope.has_bidder(r)),
        min_bids,
        win_rate_limit,
    );
    tracing::debug!(members = scope.tins.len(), projects = won.len(), "network view");
    NetworkView {
        scope: scope.clone(),
        monthly: monthly_totals(&won, year),
        top_companies: top_companies_by_year(&won, top_limit),
        win_rates,
    }
}

/// Projects both `company` and `competitor` bid on, newest first with
/// undated ones last, carrying both bids and the outcome from `company`'s
/// side.
pub fn competitor_projects(
    records: &[NormalizedRecord],
    company: &str,
    competitor: &str,
) -> Vec<CompetitorProject> {
    let bids = dedupe_bids(records);
    let winners = ProjectWinners::from_records(&bids);
    let theirs: HashMap<&str, &NormalizedRecord> = bids
        .iter()
        .filter(|r| r.bidder_id() == Some(competitor))
        .filter_map(|r| r.project_key().map(|p| (p, r)))
        .collect();
    let mut shared: Vec<(&NormalizedRecord, &NormalizedRecord)> = bids
        .iter()
        .filter(|r| r.bidder_id() == Some(company))
        .filter_map(|r| {
            let other = theirs.get(r.project_key()?)?;
            Some((r, *other))
        })
        .collect();
    // `None < Some`, so descending order puts undated projects last.
    shared.sort_by(|a, b| b.0.event_date.cmp(&a.0.event_date));

    shared
        .into_iter()
        .map(|(own, other)| {
            let winner_tin = winners.winner_of(own).map(str::to_string);
            let company_won = match winner_tin.as_deref() {
                Some(w) if w == company => Some(true),
                Some(w) if w == competitor => Some(false),
                _ => None,
            };
            CompetitorProject {
                project_id: own.project_key().unwrap_or_default().to_string(),
                project_name: own.project_name().to_string(),
                winning_bid: own.agreed_value,
                winner: own
                    .raw
                    .winner_name
                    .clone()
                    .or_else(|| other.raw.winner_name.clone()),
                winner_tin,
                transaction_date: own.raw.transaction_date.clone(),
                contract_date: own.raw.contract_date.clone(),
                company_name: own.bidder_name().unwrap_or(company).to_string(),
                company_bid: own.bid_value,
                competitor_name: other.bidder_name().unwrap_or(competitor).to_string(),
                competitor_bid: other.bid_value,
                company_won,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::normalize;
    use crate::types::RawRecord;

    fn bid(project: &str, tin: &str, winner: &str, bid: f64, agreed: f64) -> RawRecord {
        RawRecord {
            project_id: Some(project.into()),
            company_tin: Some(tin.into()),
            company_name: Some(format!("{} Co", tin)),
            winner_tin: Some(winner.into()),
            bid_value: Some(bid),
            agreed_value: Some(agreed),
            dept_name: Some("Highways".into()),
            ..RawRecord::default()
        }
    }

    fn arena() -> Vec<NormalizedRecord> {
        normalize(&[
            bid("p1", "main", "main", 90.0, 100.0),
            bid("p1", "r1", "main", 95.0, 100.0),
            bid("p2", "main", "r1", 99.0, 100.0),
            bid("p2", "r1", "r1", 97.0, 100.0),
            bid("p3", "main", "main", 80.0, 100.0),
            bid("p3", "r1", "main", 85.0, 100.0),
            bid("p3", "r2", "main", 88.0, 100.0),
            bid("p4", "r2", "r2", 70.0, 100.0),
        ])
    }

    #[test]
    fn head_to_head_counts_shared_projects_only() {
        let h2h = head_to_head(&arena(), "main", 5).unwrap();
        assert_eq!(h2h.company, "main Co");
        // r2 shares a single project with main and is dropped.
        assert_eq!(h2h.competitors.len(), 1);
        let r1 = &h2h.competitors[0];
        assert_eq!(r1.competitor_tin, "r1");
        assert_eq!(r1.encounters, 3);
        assert_eq!(r1.company_wins, 2);
        assert_eq!(r1.competitor_wins, 1);
        assert_eq!(r1.win_rate_vs_competitor, 66.67);
    }

    #[test]
    fn unknown_subject_yields_none() {
        assert!(head_to_head(&arena(), "ghost", 5).is_none());
        assert!(adjacent_companies(&arena(), "ghost", 5).is_none());
        assert!(bid_strategy(&arena(), "ghost").is_none());
    }

    #[test]
    fn adjacent_companies_rank_by_common_bids() {
        let adj = adjacent_companies(&arena(), "main", 20).unwrap();
        let tins: Vec<_> = adj.iter().map(|a| a.tin.as_str()).collect();
        assert_eq!(tins, vec!["r1", "r2"]);
        assert_eq!(adj[0].common_bids, 3);
        assert_eq!(adj[1].common_bids, 1);
        assert_eq!(adj[1].total_bids, 2);
        assert_eq!(adj[1].wins, 1);
        assert_eq!(adj[1].win_rate, 50.0);
    }

    #[test]
    fn bid_strategy_stats_and_departments() {
        let s = bid_strategy(&arena(), "main").unwrap();
        let st = &s.bid_ratio_stats;
        assert!((st.avg_bid_ratio - 2.69 / 3.0).abs() < 1e-9);
        assert_eq!(st.min_bid_ratio, 0.8);
        assert_eq!(st.max_bid_ratio, 0.99);
        assert_eq!(st.median_bid_ratio, Some(0.9));
        assert!((st.avg_winning_bid_ratio.unwrap() - 0.85).abs() < 1e-9);
        assert_eq!(st.avg_losing_bid_ratio, Some(0.99));
        // main 0.897, r1 0.923; r2 has only two bids and stays out.
        assert_eq!(st.percentile, Some(50.0));
        assert_eq!(s.department_analysis.len(), 1);
        let d = &s.department_analysis[0];
        assert_eq!(d.bids, 3);
        assert_eq!(d.wins, 2);
        assert_eq!(d.win_rate, 66.67);
    }

    #[test]
    fn leaderboard_respects_min_bids() {
        let view = win_rate_leaderboard(&arena(), 3, 15);
        let ids: Vec<_> = view.ranked.iter().map(|b| b.key.id.as_str()).collect();
        assert_eq!(ids, vec!["main", "r1"]);
        assert_eq!(view.series[0].values.len(), 2);
        assert!((view.series[0].values[0] - 200.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn comparison_pins_and_marks_main() {
        let view = company_comparison(&arena(), "r2", None, Metric::WinRate, 2, 20);
        assert_eq!(view.ranked[0].key.id, "r2");
        assert_eq!(view.series[0].categories[0], "r2 Co ★");
        assert_eq!(view.ranked.len(), 2);

        let counts = company_comparison(&arena(), "main", None, Metric::Count, 10, 20);
        let names: Vec<_> = counts.series.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Wins", "Losses"]);
    }

    #[test]
    fn monthly_totals_keep_calendar_order_and_unknown() {
        let rows = vec![
            RawRecord {
                transaction_date: Some("2023-07-15".into()),
                agreed_value: Some(10.0),
                ..RawRecord::default()
            },
            RawRecord {
                contract_date: Some("2022-12-01".into()),
                agreed_value: Some(5.0),
                ..RawRecord::default()
            },
            RawRecord {
                agreed_value: Some(1.0),
                ..RawRecord::default()
            },
        ];
        let view = monthly_totals(&normalize(&rows), None);
        assert_eq!(view.years, vec![2022, 2023]);
        assert_eq!(
            &*view.series[0].categories,
            &["December 2022".to_string(), "July 2023".into(), "Unknown".into()]
        );
        assert_eq!(view.series[0].values, vec![5.0, 10.0, 1.0]);
        assert_eq!(view.series[1].values, vec![1.0, 1.0, 1.0]);

        let only_2023 = monthly_totals(&normalize(&rows), Some(2023));
        assert_eq!(only_2023.totals.len(), 1);
        assert_eq!(only_2023.totals[0].month, "July");
        assert_eq!(only_2023.years, vec![2022, 2023]);
    }

    #[test]
    fn top_companies_always_carry_unknown_year() {
        let rows = vec![
            RawRecord {
                winner_name: Some("A".into()),
                agreed_value: Some(10.0),
                transaction_date: Some("2021-01-01".into()),
                ..RawRecord::default()
            },
            RawRecord {
                winner_name: Some("B".into()),
                agreed_value: Some(30.0),
                transaction_date: Some("2022-01-01".into()),
                ..RawRecord::default()
            },
            RawRecord {
                agreed_value: Some(99.0),
                ..RawRecord::default()
            },
        ];
        let view = top_companies_by_year(&normalize(&rows), 20);
        assert_eq!(&*view.chart.categories, &["B".to_string(), "A".into()]);
        let names: Vec<_> = view.chart.series.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["2021", "2022", "Unknown Year"]);
        assert_eq!(view.chart.series[0].values, vec![0.0, 10.0]);
        assert_eq!(view.chart.series[2].values, vec![0.0, 0.0]);
    }

    fn dated_bid(project: &str, tin: &str, winner: &str, agreed: f64, date: &str) -> RawRecord {
        RawRecord {
            winner_name: Some(format!("{} Co", winner)),
            contract_date: Some(date.into()),
            ..bid(project, tin, winner, agreed * 0.9, agreed)
        }
    }

    #[test]
    fn market_views_count_each_project_once() {
        let records = normalize(&[
            dated_bid("p1", "a", "a", 100.0, "2023-03-01"),
            dated_bid("p1", "b", "a", 100.0, "2023-03-01"),
            dated_bid("p1", "c", "a", 100.0, "2023-03-01"),
            dated_bid("p2", "a", "b", 200.0, "2023-03-09"),
            dated_bid("p2", "b", "b", 200.0, "2023-03-09"),
        ]);
        let monthly = monthly_totals(&records, None);
        assert_eq!(monthly.totals.len(), 1);
        assert_eq!(monthly.totals[0].count, 2);
        assert_eq!(monthly.totals[0].total_sum_price_agree, 300.0);

        let top = top_companies_by_year(&records, 20);
        let ranked: Vec<_> = top
            .ranked
            .iter()
            .map(|b| (b.key.id.as_str(), b.count, b.total_value))
            .collect();
        assert_eq!(ranked, vec![("b", 1, 200.0), ("a", 1, 100.0)]);
    }

    #[test]
    fn dedupe_projects_keeps_rows_without_a_project() {
        let records = normalize(&[
            bid("p1", "a", "a", 1.0, 10.0),
            bid("p1", "b", "a", 1.0, 10.0),
            RawRecord {
                agreed_value: Some(5.0),
                ..RawRecord::default()
            },
            RawRecord {
                agreed_value: Some(5.0),
                ..RawRecord::default()
            },
        ]);
        let kept = dedupe_projects(&records);
        assert_eq!(kept.len(), 3);
        assert_eq!(kept[0].bidder_id(), Some("a"));
    }

    fn wider() -> Vec<NormalizedRecord> {
        let mut records = arena();
        // r3 never meets main's network.
        records.extend(normalize(&[bid("p5", "r3", "r3", 50.0, 400.0)]));
        records
    }

    #[test]
    fn network_scope_is_subject_plus_adjacent() {
        let scope = network_scope(&wider(), "r1", 20).unwrap();
        assert_eq!(scope.tins, vec!["r1", "main", "r2"]);
        assert!(!scope.contains("r3"));
        assert!(network_scope(&wider(), "ghost", 20).is_none());
    }

    #[test]
    fn network_view_only_covers_members() {
        let records = wider();
        let scope = network_scope(&records, "r1", 20).unwrap();
        let view = network_view(&records, &scope, None, 20, 1, 15);

        assert_eq!(view.monthly.totals.len(), 1);
        assert_eq!(view.monthly.totals[0].count, 4);
        assert_eq!(view.monthly.totals[0].total_sum_price_agree, 400.0);

        let top: Vec<_> = view.top_companies.ranked.iter().map(|b| b.key.id.as_str()).collect();
        assert_eq!(top, vec!["main", "r1", "r2"]);

        let rates: Vec<_> = view.win_rates.ranked.iter().map(|b| b.key.id.as_str()).collect();
        assert_eq!(rates, vec!["main", "r2", "r1"]);

        let cmp = company_comparison(&records, "r1", Some(&scope), Metric::WinRate, 10, 20);
        let ids: Vec<_> = cmp.ranked.iter().map(|b| b.key.id.as_str()).collect();
        assert_eq!(ids, vec!["r1", "main", "r2"]);
    }

    #[test]
    fn competitor_projects_report_outcome_from_company_side() {
        let shared = competitor_projects(&arena(), "main", "r1");
        let ids: Vec<_> = shared.iter().map(|p| p.project_id.as_str()).collect();
        assert_eq!(ids, vec!["p1", "p2", "p3"]);
        let outcomes: Vec<_> = shared.iter().map(|p| p.company_won).collect();
        assert_eq!(outcomes, vec![Some(true), Some(false), Some(true)]);
        assert_eq!(shared[1].company_bid, 99.0);
        assert_eq!(shared[1].competitor_bid, 97.0);
    }

    #[test]
    fn competitor_projects_third_party_win_is_none() {
        let shared = competitor_projects(&arena(), "r1", "r2");
        assert_eq!(shared.len(), 1);
        let p3 = &shared[0];
        assert_eq!(p3.project_id, "p3");
        assert_eq!(p3.company_won, None);
        assert_eq!(p3.winner_tin.as_deref(), Some("main"));
        assert_eq!((p3.company_bid, p3.competitor_bid, p3.winning_bid), (85.0, 88.0, 100.0));
        assert_eq!(p3.company_name, "r1 Co");
        assert_eq!(p3.competitor_name, "r2 Co");
    }

    #[test]
    fn competitor_projects_newest_first() {
        let records = normalize(&[
            dated_bid("old", "a", "a", 10.0, "2021-01-01"),
            dated_bid("old", "b", "a", 10.0, "2021-01-01"),
            bid("undated", "a", "b", 9.0, 10.0),
            bid("undated", "b", "b", 8.0, 10.0),
            dated_bid("new", "a", "b", 10.0, "2023-05-01"),
            dated_bid("new", "b", "b", 10.0, "2023-05-01"),
        ]);
        let ids: Vec<_> = competitor_projects(&records, "a", "b")
            .into_iter()
            .map(|p| p.project_id)
            .collect();
        assert_eq!(ids, vec!["new", "old", "undated"]);
    }
}
