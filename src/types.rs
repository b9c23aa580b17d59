use serde::{Deserialize, Serialize};
use tabled::Tabled;

use crate::util::{lenient_bool, lenient_f64, lenient_text};

/// One bid or one project agreement exactly as the backend sends it.
///
/// Project rows carry the winner and agreed value; bid rows carry the
/// bidding company, its bid and an `is_winner` flag. Both the backend's
/// snake_case names and the dashboard's camelCase names are accepted.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct RawRecord {
    #[serde(default, alias = "projectId", deserialize_with = "lenient_text")]
    pub project_id: Option<String>,
    #[serde(
        default,
        rename = "winner",
        alias = "winnerName",
        alias = "winner_name",
        deserialize_with = "lenient_text"
    )]
    pub winner_name: Option<String>,
    #[serde(default, alias = "winnerTin", deserialize_with = "lenient_text")]
    pub winner_tin: Option<String>,
    #[serde(default, alias = "companyTin", deserialize_with = "lenient_text")]
    pub company_tin: Option<String>,
    #[serde(
        default,
        rename = "company",
        alias = "companyName",
        alias = "company_name",
        deserialize_with = "lenient_text"
    )]
    pub company_name: Option<String>,
    #[serde(default, alias = "projectName", deserialize_with = "lenient_text")]
    pub project_name: Option<String>,
    #[serde(default, alias = "deptName", deserialize_with = "lenient_text")]
    pub dept_name: Option<String>,
    #[serde(
        default,
        rename = "sum_price_agree",
        alias = "agreedValue",
        alias = "agreed_value",
        deserialize_with = "lenient_f64"
    )]
    pub agreed_value: Option<f64>,
    #[serde(
        default,
        rename = "price_build",
        alias = "buildPrice",
        alias = "build_price",
        deserialize_with = "lenient_f64"
    )]
    pub build_price: Option<f64>,
    #[serde(
        default,
        rename = "bid",
        alias = "bidValue",
        alias = "bid_value",
        deserialize_with = "lenient_f64"
    )]
    pub bid_value: Option<f64>,
    #[serde(
        default,
        rename = "price_cut",
        alias = "priceCutRatio",
        alias = "price_cut_ratio",
        deserialize_with = "lenient_f64"
    )]
    pub price_cut_ratio: Option<f64>,
    #[serde(default, alias = "transactionDate", deserialize_with = "lenient_text")]
    pub transaction_date: Option<String>,
    #[serde(default, alias = "contractDate", deserialize_with = "lenient_text")]
    pub contract_date: Option<String>,
    #[serde(default, alias = "isWinner", deserialize_with = "lenient_bool")]
    pub is_winner: Option<bool>,
}

/// Per-company bidding summary, the shape of the company search results.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CompanyWinRate {
    pub tin: String,
    pub company: String,
    pub total_bids: usize,
    pub wins: usize,
    pub win_rate: f64,
    pub total_bid_value: f64,
    pub avg_bid: f64,
    pub avg_bid_ratio: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HeadToHeadCompetitor {
    pub competitor_tin: String,
    pub competitor: String,
    pub encounters: usize,
    pub company_wins: usize,
    pub competitor_wins: usize,
    pub win_rate_vs_competitor: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HeadToHeadResponse {
    pub company: String,
    pub competitors: Vec<HeadToHeadCompetitor>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AdjacentCompany {
    pub tin: String,
    pub company: String,
    pub common_bids: usize,
    pub total_bids: usize,
    pub wins: usize,
    pub win_rate: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BidRatioStats {
    pub avg_bid_ratio: f64,
    pub median_bid_ratio: Option<f64>,
    pub min_bid_ratio: f64,
    pub max_bid_ratio: f64,
    pub std_bid_ratio: Option<f64>,
    pub avg_winning_bid_ratio: Option<f64>,
    pub avg_losing_bid_ratio: Option<f64>,
    pub percentile: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DepartmentAnalysis {
    pub dept_name: String,
    pub bids: usize,
    pub wins: usize,
    pub win_rate: f64,
    pub avg_bid_ratio: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BidStrategyResponse {
    pub company: String,
    pub bid_ratio_stats: BidRatioStats,
    pub department_analysis: Vec<DepartmentAnalysis>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MonthlyTotal {
    pub month: String,
    pub year: Option<i32>,
    pub total_sum_price_agree: f64,
    pub count: usize,
}

/// One project both companies bid on. `company_won` is `None` when a third
/// party (or nobody known) won it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CompetitorProject {
    pub project_id: String,
    pub project_name: String,
    pub winning_bid: f64,
    pub winner: Option<String>,
    pub winner_tin: Option<String>,
    pub transaction_date: Option<String>,
    pub contract_date: Option<String>,
    pub company_name: String,
    pub company_bid: f64,
    pub competitor_name: String,
    pub competitor_bid: f64,
    pub company_won: Option<bool>,
}

// Report rows below are pre-formatted for CSV export and table previews.

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct MonthlyRow {
    #[serde(rename = "Month")]
    #[tabled(rename = "Month")]
    pub month: String,
    #[serde(rename = "Projects")]
    #[tabled(rename = "Projects")]
    pub projects: usize,
    #[serde(rename = "TotalValue")]
    #[tabled(rename = "TotalValue")]
    pub total_value: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct CompanyValueRow {
    #[serde(rename = "Rank")]
    #[tabled(rename = "Rank")]
    pub rank: usize,
    #[serde(rename = "Company")]
    #[tabled(rename = "Company")]
    pub company: String,
    #[serde(rename = "Projects")]
    #[tabled(rename = "Projects")]
    pub projects: usize,
    #[serde(rename = "TotalValue")]
    #[tabled(rename = "TotalValue")]
    pub total_value: String,
    #[serde(rename = "Years")]
    #[tabled(rename = "Years")]
    pub years: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct WinRateRow {
    #[serde(rename = "Rank")]
    #[tabled(rename = "Rank")]
    pub rank: usize,
    #[serde(rename = "Company")]
    #[tabled(rename = "Company")]
    pub company: String,
    #[serde(rename = "Bids")]
    #[tabled(rename = "Bids")]
    pub bids: usize,
    #[serde(rename = "Wins")]
    #[tabled(rename = "Wins")]
    pub wins: usize,
    #[serde(rename = "WinRate")]
    #[tabled(rename = "WinRate")]
    pub win_rate: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct HeadToHeadRow {
    #[serde(rename = "Competitor")]
    #[tabled(rename = "Competitor")]
    pub competitor: String,
    #[serde(rename = "Encounters")]
    #[tabled(rename = "Encounters")]
    pub encounters: usize,
    #[serde(rename = "CompanyWins")]
    #[tabled(rename = "CompanyWins")]
    pub company_wins: usize,
    #[serde(rename = "CompetitorWins")]
    #[tabled(rename = "CompetitorWins")]
    pub competitor_wins: usize,
    #[serde(rename = "WinRateVs")]
    #[tabled(rename = "WinRateVs")]
    pub win_rate_vs: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct AdjacentRow {
    #[serde(rename = "Company")]
    #[tabled(rename = "Company")]
    pub company: String,
    #[serde(rename = "CommonBids")]
    #[tabled(rename = "CommonBids")]
    pub common_bids: usize,
    #[serde(rename = "TotalBids")]
    #[tabled(rename = "TotalBids")]
    pub total_bids: usize,
    #[serde(rename = "WinRate")]
    #[tabled(rename = "WinRate")]
    pub win_rate: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct DepartmentRow {
    #[serde(rename = "Department")]
    #[tabled(rename = "Department")]
    pub department: String,
    #[serde(rename = "Bids")]
    #[tabled(rename = "Bids")]
    pub bids: usize,
    #[serde(rename = "Wins")]
    #[tabled(rename = "Wins")]
    pub wins: usize,
    #[serde(rename = "WinRate")]
    #[tabled(rename = "WinRate")]
    pub win_rate: String,
    #[serde(rename = "AvgBidRatio")]
    #[tabled(rename = "AvgBidRatio")]
    pub avg_bid_ratio: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct ProjectRow {
    #[serde(rename = "Date")]
    #[tabled(rename = "Date")]
    pub date: String,
    #[serde(rename = "Project")]
    #[tabled(rename = "Project")]
    pub project: String,
    #[serde(rename = "Company")]
    #[tabled(rename = "Company")]
    pub company: String,
    #[serde(rename = "Winner")]
    #[tabled(rename = "Winner")]
    pub winner: String,
    #[serde(rename = "Value")]
    #[tabled(rename = "Value")]
    pub value: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct CompetitorProjectRow {
    #[serde(rename = "Project")]
    #[tabled(rename = "Project")]
    pub project: String,
    #[serde(rename = "CompanyBid")]
    #[tabled(rename = "CompanyBid")]
    pub company_bid: String,
    #[serde(rename = "CompetitorBid")]
    #[tabled(rename = "CompetitorBid")]
    pub competitor_bid: String,
    #[serde(rename = "WinningBid")]
    #[tabled(rename = "WinningBid")]
    pub winning_bid: String,
    #[serde(rename = "Winner")]
    #[tabled(rename = "Winner")]
    pub winner: String,
    #[serde(rename = "Result")]
    #[tabled(rename = "Result")]
    pub result: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_backend_snake_case_payload() {
        let json = r#"{
            "project_id": 991,
            "winner": "Siam Build Co",
            "winner_tin": "0105551234567",
            "project_name": "Road repair",
            "sum_price_agree": "1,250,000.50",
            "transaction_date": "2023-07-15",
            "contract_date": null,
            "is_winner": 1
        }"#;
        let r: RawRecord = serde_json::from_str(json).unwrap();
        assert_eq!(r.project_id.as_deref(), Some("991"));
        assert_eq!(r.winner_name.as_deref(), Some("Siam Build Co"));
        assert_eq!(r.winner_tin.as_deref(), Some("0105551234567"));
        assert_eq!(r.agreed_value, Some(1_250_000.5));
        assert_eq!(r.contract_date, None);
        assert_eq!(r.is_winner, Some(true));
    }

    #[test]
    fn accepts_camel_case_payload_and_tolerates_garbage() {
        let json = r#"{
            "winnerName": "A",
            "companyName": "B",
            "agreedValue": "not a number",
            "bidValue": 90,
            "contractDate": "  ",
            "isWinner": "maybe"
        }"#;
        let r: RawRecord = serde_json::from_str(json).unwrap();
        assert_eq!(r.winner_name.as_deref(), Some("A"));
        assert_eq!(r.company_name.as_deref(), Some("B"));
        assert_eq!(r.agreed_value, None);
        assert_eq!(r.bid_value, Some(90.0));
        assert_eq!(r.contract_date, None);
        assert_eq!(r.is_winner, None);
    }
}
