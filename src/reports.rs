//! Report assembly: run the dashboard views and format their output into
//! table rows for preview and export.
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::AppError;
use crate::normalize::{NormalizedRecord, Period};
use crate::output;
use crate::rank::Metric;
use crate::series::ChartSeries;
use crate::settings::Settings;
use crate::table::{query_projects, ProjectQuery};
use crate::types::{
    AdjacentCompany, AdjacentRow, BidStrategyResponse, CompanyValueRow, CompetitorProject,
    CompetitorProjectRow, DepartmentRow, HeadToHeadResponse, HeadToHeadRow, MonthlyRow,
    ProjectRow, WinRateRow,
};
use crate::util::format_number;
use crate::views::{self, ComparisonView, MonthlyView, NetworkView, TopCompaniesView, WinRateView};

pub fn monthly_rows(view: &MonthlyView) -> Vec<MonthlyRow> {
    view.series
        .first()
        .map(|values| {
            values
                .categories
                .iter()
                .zip(&view.totals)
                .map(|(label, t)| MonthlyRow {
                    month: label.clone(),
                    projects: t.count,
                    total_value: format_number(t.total_sum_price_agree, 2),
                })
                .collect()
        })
        .unwrap_or_default()
}

pub fn company_value_rows(view: &TopCompaniesView) -> Vec<CompanyValueRow> {
    view.ranked
        .iter()
        .enumerate()
        .map(|(idx, b)| {
            let mut years: Vec<Period> = b
                .members
                .iter()
                .map(|r| r.period)
                .collect::<HashSet<_>>()
                .into_iter()
                .collect();
            years.sort();
            CompanyValueRow {
                rank: idx + 1,
                company: b.key.label.clone(),
                projects: b.count,
                total_value: format_number(b.total_value, 2),
                years: years
                    .iter()
                    .map(Period::year_label)
                    .collect::<Vec<_>>()
                    .join(", "),
            }
        })
        .collect()
}

pub fn win_rate_rows(view: &WinRateView) -> Vec<WinRateRow> {
    view.ranked
        .iter()
        .enumerate()
        .map(|(idx, b)| WinRateRow {
            rank: idx + 1,
            company: b.key.label.clone(),
            bids: b.count,
            wins: b.win_count,
            win_rate: format_number(b.win_rate(), 2),
        })
        .collect()
}

pub fn comparison_rows(view: &ComparisonView) -> Vec<WinRateRow> {
    let labels = view.series.first().map(|s| s.categories.clone());
    view.ranked
        .iter()
        .enumerate()
        .map(|(idx, b)| WinRateRow {
            rank: idx + 1,
            company: labels
                .as_ref()
                .and_then(|l| l.get(idx).cloned())
                .unwrap_or_else(|| b.key.label.clone()),
            bids: b.count,
            wins: b.win_count,
            win_rate: format_number(b.win_rate(), 2),
        })
        .collect()
}

pub fn head_to_head_rows(resp: &HeadToHeadResponse) -> Vec<HeadToHeadRow> {
    resp.competitors
        .iter()
        .map(|c| HeadToHeadRow {
            competitor: c.competitor.clone(),
            encounters: c.encounters,
            company_wins: c.company_wins,
            competitor_wins: c.competitor_wins,
            win_rate_vs: format_number(c.win_rate_vs_competitor, 1),
        })
        .collect()
}

pub fn adjacent_rows(companies: &[AdjacentCompany]) -> Vec<AdjacentRow> {
    companies
        .iter()
        .map(|c| AdjacentRow {
            company: c.company.clone(),
            common_bids: c.common_bids,
            total_bids: c.total_bids,
            win_rate: format_number(c.win_rate, 1),
        })
        .collect()
}

pub fn department_rows(resp: &BidStrategyResponse) -> Vec<DepartmentRow> {
    resp.department_analysis
        .iter()
        .map(|d| DepartmentRow {
            department: d.dept_name.clone(),
            bids: d.bids,
            wins: d.wins,
            win_rate: format_number(d.win_rate, 2),
            avg_bid_ratio: format_number(d.avg_bid_ratio, 4),
        })
        .collect()
}

pub fn competitor_project_rows(projects: &[CompetitorProject]) -> Vec<CompetitorProjectRow> {
    projects
        .iter()
        .map(|p| CompetitorProjectRow {
            project: p.project_name.clone(),
            company_bid: format_number(p.company_bid, 2),
            competitor_bid: format_number(p.competitor_bid, 2),
            winning_bid: format_number(p.winning_bid, 2),
            winner: p.winner.clone().or_else(|| p.winner_tin.clone()).unwrap_or_default(),
            result: match p.company_won {
                Some(true) => "Won",
                Some(false) => "Lost",
                None => "Other",
            }
            .to_string(),
        })
        .collect()
}

pub fn project_rows(records: &[&NormalizedRecord]) -> Vec<ProjectRow> {
    records
        .iter()
        .map(|r| ProjectRow {
            date: r
                .event_date
                .map(|d| d.format("%d %b %Y").to_string())
                .unwrap_or_else(|| "N/A".to_string()),
            project: r.project_name().to_string(),
            company: r.raw.company_name.clone().unwrap_or_default(),
            winner: r.winner_name().unwrap_or("").to_string(),
            value: format_number(r.agreed_value, 2),
        })
        .collect()
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SummaryStats {
    pub total_records: usize,
    pub total_companies: usize,
    pub total_projects: usize,
    /// Agreed value summed once per project.
    pub total_value: f64,
    pub undated_records: usize,
    pub first_year: Option<i32>,
    pub last_year: Option<i32>,
}

pub fn generate_summary(data: &[NormalizedRecord]) -> SummaryStats {
    let companies: HashSet<&str> = data.iter().filter_map(|r| r.bidder_id()).collect();
    let years = || data.iter().filter_map(|r| r.period.year());
    let projects = views::dedupe_projects(data);
    SummaryStats {
        total_records: data.len(),
        total_companies: companies.len(),
        total_projects: projects.len(),
        total_value: projects.iter().map(|r| r.agreed_value).sum(),
        undated_records: data.iter().filter(|r| r.period == Period::Unknown).count(),
        first_year: years().min(),
        last_year: years().max(),
    }
}

/// Everything the subject-specific part of the dashboard shows.
#[derive(Debug, Clone, Serialize)]
pub struct CompanyReports {
    pub tin: String,
    pub head_to_head: HeadToHeadResponse,
    pub adjacent: Vec<AdjacentCompany>,
    pub bid_strategy: BidStrategyResponse,
    pub comparison: ComparisonView,
    pub network: NetworkView,
    pub rival_projects: Vec<CompetitorProject>,
    pub department_series: Vec<ChartSeries>,
    pub projects: Vec<ProjectRow>,
}

/// Market-wide reports plus, when a company is selected, its own.
#[derive(Debug, Clone, Serialize)]
pub struct ReportSet {
    pub summary: SummaryStats,
    pub monthly: MonthlyView,
    pub top_companies: TopCompaniesView,
    pub win_rates: WinRateView,
    pub company: Option<CompanyReports>,
}

/// Per-run choices made by the user rather than the settings file.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportOptions {
    pub company: Option<String>,
    pub year: Option<i32>,
    pub metric: Metric,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            company: None,
            year: None,
            metric: Metric::WinRate,
        }
    }
}

pub fn generate_company(
    data: &[NormalizedRecord],
    settings: &Settings,
    tin: &str,
    options: &ReportOptions,
) -> Option<CompanyReports> {
    let head_to_head = views::head_to_head(data, tin, settings.head_to_head_top_n)?;
    let adjacent = views::adjacent_companies(data, tin, settings.adjacent_limit)?;
    let bid_strategy = views::bid_strategy(data, tin)?;
    let scope = views::network_scope(data, tin, settings.adjacent_limit)?;
    let comparison = views::company_comparison(
        data,
        tin,
        Some(&scope),
        options.metric,
        settings.comparison_limit,
        settings.label_max_chars,
    );
    let network = views::network_view(
        data,
        &scope,
        options.year,
        settings.top_companies,
        settings.min_bids,
        settings.win_rate_limit,
    );
    // Drill-down for the most frequent rival.
    let rival_projects = head_to_head
        .competitors
        .first()
        .map(|c| views::competitor_projects(data, tin, &c.competitor_tin))
        .unwrap_or_default();
    let department_series = views::department_series(&bid_strategy);
    let projects = project_rows(&company_projects(data, tin));
    Some(CompanyReports {
        tin: tin.to_string(),
        head_to_head,
        adjacent,
        bid_strategy,
        comparison,
        network,
        rival_projects,
        department_series,
        projects,
    })
}

pub fn generate_all(
    data: &[NormalizedRecord],
    settings: &Settings,
    options: &ReportOptions,
) -> ReportSet {
    ReportSet {
        summary: generate_summary(data),
        monthly: views::monthly_totals(data, options.year),
        top_companies: views::top_companies_by_year(data, settings.top_companies),
        win_rates: views::win_rate_leaderboard(data, settings.min_bids, settings.win_rate_limit),
        company: options
            .company
            .as_deref()
            .and_then(|tin| generate_company(data, settings, tin, options)),
    }
}

/// Projects involving the selected company, newest first.
pub fn company_projects<'a>(data: &'a [NormalizedRecord], tin: &str) -> Vec<&'a NormalizedRecord> {
    query_projects(data, &ProjectQuery::default())
        .into_iter()
        .filter(|r| r.bidder_id() == Some(tin) || r.winner_id() == Some(tin))
        .collect()
}

/// Write every table of `set` as CSV plus the whole set and its summary as
/// JSON into `dir`. Returns the written paths; the first failure aborts.
pub fn export_all(dir: &Path, set: &ReportSet) -> Result<Vec<PathBuf>, AppError> {
    output::ensure_dir(dir)?;
    let mut written = Vec::new();
    let mut target = |name: &str| {
        let path = dir.join(name);
        written.push(path.clone());
        path
    };

    output::write_csv(&target("monthly_totals.csv"), &monthly_rows(&set.monthly))?;
    output::write_csv(&target("top_companies.csv"), &company_value_rows(&set.top_companies))?;
    output::write_csv(&target("win_rates.csv"), &win_rate_rows(&set.win_rates))?;

    if let Some(company) = &set.company {
        output::write_csv(&target("head_to_head.csv"), &head_to_head_rows(&company.head_to_head))?;
        output::write_csv(&target("adjacent_companies.csv"), &adjacent_rows(&company.adjacent))?;
        output::write_csv(&target("comparison.csv"), &comparison_rows(&company.comparison))?;
        output::write_csv(&target("departments.csv"), &department_rows(&company.bid_strategy))?;
        output::write_csv(&target("projects.csv"), &company.projects)?;
        output::write_csv(
            &target("rival_projects.csv"),
            &competitor_project_rows(&company.rival_projects),
        )?;
        output::write_csv(
            &target("network_monthly_totals.csv"),
            &monthly_rows(&company.network.monthly),
        )?;
        output::write_csv(
            &target("network_top_companies.csv"),
            &company_value_rows(&company.network.top_companies),
        )?;
        output::write_csv(
            &target("network_win_rates.csv"),
            &win_rate_rows(&company.network.win_rates),
        )?;
    }

    output::write_json(&target("dashboard.json"), set)?;
    output::write_json(&target("summary.json"), &set.summary)?;

    tracing::info!(files = written.len(), dir = %dir.display(), "reports exported");
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::normalize;
    use crate::types::RawRecord;

    fn data() -> Vec<NormalizedRecord> {
        normalize(&[
            RawRecord {
                project_id: Some("p1".into()),
                company_tin: Some("a".into()),
                company_name: Some("Alpha".into()),
                winner_tin: Some("a".into()),
                winner_name: Some("Alpha".into()),
                bid_value: Some(90.0),
                agreed_value: Some(100.0),
                contract_date: Some("2023-07-01".into()),
                ..RawRecord::default()
            },
            RawRecord {
                project_id: Some("p1".into()),
                company_tin: Some("b".into()),
                company_name: Some("Beta".into()),
                winner_tin: Some("a".into()),
                winner_name: Some("Alpha".into()),
                bid_value: Some(95.0),
                agreed_value: Some(100.0),
                ..RawRecord::default()
            },
        ])
    }

    #[test]
    fn summary_counts() {
        let s = generate_summary(&data());
        assert_eq!(s.total_records, 2);
        assert_eq!(s.total_companies, 2);
        assert_eq!(s.total_projects, 1);
        assert_eq!(s.total_value, 100.0);
        assert_eq!(s.undated_records, 1);
        assert_eq!(s.first_year, Some(2023));
    }

    #[test]
    fn generate_all_with_and_without_company() {
        let settings = Settings::default();
        let market = generate_all(&data(), &settings, &ReportOptions::default());
        assert!(market.company.is_none());
        // Both rows belong to p1, which counts once.
        assert_eq!(monthly_rows(&market.monthly).len(), 1);
        assert_eq!(win_rate_rows(&market.win_rates)[0].company, "Alpha");

        let options = ReportOptions {
            company: Some("a".into()),
            ..ReportOptions::default()
        };
        let with = generate_all(&data(), &settings, &options);
        let company = with.company.unwrap();
        assert_eq!(company.adjacent.len(), 1);
        assert_eq!(comparison_rows(&company.comparison)[0].company, "Alpha ★");
        assert_eq!(company.network.scope.tins, vec!["a", "b"]);
        assert_eq!(company.network.monthly.totals[0].count, 1);
        // b meets a only once, so there is no head-to-head rival to drill into.
        assert!(company.rival_projects.is_empty());
        assert_eq!(company.projects.len(), 2);
        assert_eq!(company.projects[0].date, "01 Jul 2023");
        assert_eq!(company.projects[1].date, "N/A");

        let options = ReportOptions {
            company: Some("zz".into()),
            ..ReportOptions::default()
        };
        let ghost = generate_all(&data(), &settings, &options);
        assert!(ghost.company.is_none());
    }

    #[test]
    fn company_value_rows_list_years() {
        let view = views::top_companies_by_year(&data(), 20);
        let rows = company_value_rows(&view);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].company, "Alpha");
        assert_eq!(rows[0].projects, 1);
        assert_eq!(rows[0].years, "2023");
        assert_eq!(rows[0].total_value, "100.00");
    }

    #[test]
    fn company_projects_include_bids_and_wins() {
        let d = data();
        assert_eq!(company_projects(&d, "a").len(), 2);
        assert_eq!(company_projects(&d, "b").len(), 1);
    }

    #[test]
    fn competitor_project_rows_label_outcomes() {
        let base = CompetitorProject {
            project_id: "p1".into(),
            project_name: "Bridge".into(),
            winning_bid: 1500.0,
            winner: None,
            winner_tin: Some("c".into()),
            transaction_date: None,
            contract_date: None,
            company_name: "A".into(),
            company_bid: 1400.0,
            competitor_name: "B".into(),
            competitor_bid: 1450.5,
            company_won: None,
        };
        let won = CompetitorProject {
            company_won: Some(true),
            winner: Some("A".into()),
            ..base.clone()
        };
        let rows = competitor_project_rows(&[won, base]);
        assert_eq!(rows[0].result, "Won");
        assert_eq!(rows[0].winner, "A");
        assert_eq!(rows[1].result, "Other");
        assert_eq!(rows[1].winner, "c");
        assert_eq!(rows[1].competitor_bid, "1,450.50");
    }

    #[test]
    fn export_all_writes_company_tables() {
        let options = ReportOptions {
            company: Some("a".into()),
            ..ReportOptions::default()
        };
        let set = generate_all(&data(), &Settings::default(), &options);
        let dir = std::env::temp_dir().join(format!("bid_insight_export_{}", std::process::id()));
        let written = export_all(&dir, &set).unwrap();
        let all_exist = written.iter().all(|p| p.exists());
        std::fs::remove_dir_all(&dir).ok();
        assert_eq!(written.len(), 14);
        assert!(all_exist);
    }

    #[test]
    fn export_all_fails_when_target_is_a_file() {
        let set = generate_all(&data(), &Settings::default(), &ReportOptions::default());
        let blocker = std::env::temp_dir().join(format!("bid_insight_blocker_{}", std::process::id()));
        std::fs::write(&blocker, "not a directory").unwrap();
        let result = export_all(&blocker, &set);
        std::fs::remove_file(&blocker).ok();
        assert!(matches!(result, Err(AppError::Write { .. })));
    }
}
