//! Company directory and search over bid rows.
use crate::aggregate::{aggregate, into_buckets, AggregateBucket, GroupKey};
use crate::error::AppError;
use crate::normalize::NormalizedRecord;
use crate::rank::{rank, Metric};
use crate::types::CompanyWinRate;
use crate::util::round_to;
use crate::views::{dedupe_bids, ProjectWinners};

pub const MIN_QUERY_CHARS: usize = 2;
pub const SEARCH_LIMIT: usize = 20;

fn to_win_rate(bucket: &AggregateBucket) -> CompanyWinRate {
    let total_bid_value: f64 = bucket.members.iter().map(|r| r.bid_value).sum();
    let avg_bid = if bucket.count == 0 {
        0.0
    } else {
        total_bid_value / bucket.count as f64
    };
    CompanyWinRate {
        tin: bucket.key.id.clone(),
        company: bucket.key.label.clone(),
        total_bids: bucket.count,
        wins: bucket.win_count,
        win_rate: round_to(bucket.win_rate(), 2),
        total_bid_value,
        avg_bid,
        avg_bid_ratio: bucket.avg_bid_ratio(),
    }
}

/// Bidders with at least one positive bid, most active first.
pub fn company_directory(records: &[NormalizedRecord]) -> Vec<CompanyWinRate> {
    let all = dedupe_bids(records);
    let winners = ProjectWinners::from_records(&all);
    let bids: Vec<NormalizedRecord> = all.into_iter().filter(|r| r.bid_value > 0.0).collect();
    let groups = aggregate(&bids, GroupKey::bidder, |_, r| winners.bidder_won(r));
    rank(
        into_buckets(groups),
        |b| Metric::Count.value(b),
        usize::MAX,
        None,
    )
    .iter()
    .map(to_win_rate)
    .collect()
}

/// Case-insensitive substring match on company name or TIN.
pub fn search_companies(
    records: &[NormalizedRecord],
    query: &str,
) -> Result<Vec<CompanyWinRate>, AppError> {
    let needle = query.trim().to_lowercase();
    if needle.chars().count() < MIN_QUERY_CHARS {
        return Err(AppError::QueryTooShort {
            min: MIN_QUERY_CHARS,
        });
    }
    let hits: Vec<CompanyWinRate> = company_directory(records)
        .into_iter()
        .filter(|c| {
            c.company.to_lowercase().contains(&needle) || c.tin.to_lowercase().contains(&needle)
        })
        .take(SEARCH_LIMIT)
        .collect();
    tracing::info!(query, hits = hits.len(), "company search");
    Ok(hits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::normalize;
    use crate::types::RawRecord;

    fn bid(project: &str, tin: &str, name: &str, won: bool, bid: f64) -> RawRecord {
        RawRecord {
            project_id: Some(project.into()),
            company_tin: Some(tin.into()),
            company_name: Some(name.into()),
            is_winner: Some(won),
            bid_value: Some(bid),
            agreed_value: Some(100.0),
            ..RawRecord::default()
        }
    }

    fn records() -> Vec<NormalizedRecord> {
        normalize(&[
            bid("p1", "0105", "Siam Road Works", true, 90.0),
            bid("p2", "0105", "Siam Road Works", false, 110.0),
            bid("p1", "0207", "Bangkok Bridge", false, 95.0),
            bid("p3", "0309", "Chiang Mai Civil", true, 0.0),
        ])
    }

    #[test]
    fn directory_summarises_bids() {
        let dir = company_directory(&records());
        assert_eq!(dir.len(), 2);
        let siam = &dir[0];
        assert_eq!(siam.tin, "0105");
        assert_eq!(siam.total_bids, 2);
        assert_eq!(siam.wins, 1);
        assert_eq!(siam.win_rate, 50.0);
        assert_eq!(siam.total_bid_value, 200.0);
        assert_eq!(siam.avg_bid, 100.0);
        assert!((siam.avg_bid_ratio - 1.0).abs() < 1e-9);
    }

    #[test]
    fn search_matches_name_or_tin() {
        let by_name = search_companies(&records(), "bridge").unwrap();
        assert_eq!(by_name.len(), 1);
        assert_eq!(by_name[0].company, "Bangkok Bridge");

        let by_tin = search_companies(&records(), "01").unwrap();
        assert_eq!(by_tin[0].tin, "0105");
    }

    #[test]
    fn short_query_is_rejected() {
        assert!(matches!(
            search_companies(&records(), " s "),
            Err(AppError::QueryTooShort { min: 2 })
        ));
    }
}
