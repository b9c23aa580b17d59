//! Filtering and sorting for the project table.
use std::cmp::Ordering;
use std::collections::BTreeSet;

use chrono::NaiveDate;

use crate::normalize::NormalizedRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortColumn {
    #[default]
    Date,
    Name,
    Company,
    Winner,
    Value,
    BuildPrice,
    PriceCut,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    pub fn toggled(self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ProjectQuery {
    /// Case-insensitive substring of the project name.
    pub search: Option<String>,
    /// Exact bidder company name.
    pub company: Option<String>,
    /// Exact winner name.
    pub winner: Option<String>,
    pub sort: SortColumn,
    pub direction: SortDirection,
}

impl ProjectQuery {
    /// Clicking the active column flips direction; a new column starts
    /// descending.
    pub fn sort_by(&mut self, column: SortColumn) {
        if self.sort == column {
            self.direction = self.direction.toggled();
        } else {
            self.sort = column;
            self.direction = SortDirection::Desc;
        }
    }
}

fn sort_date(r: &NormalizedRecord) -> NaiveDate {
    r.event_date.unwrap_or_default()
}

fn compare(a: &NormalizedRecord, b: &NormalizedRecord, column: SortColumn) -> Ordering {
    match column {
        SortColumn::Date => sort_date(a).cmp(&sort_date(b)),
        SortColumn::Name => a.project_name().cmp(b.project_name()),
        SortColumn::Company => a
            .raw
            .company_name
            .as_deref()
            .unwrap_or("")
            .cmp(b.raw.company_name.as_deref().unwrap_or("")),
        SortColumn::Winner => a
            .winner_name()
            .unwrap_or("")
            .cmp(b.winner_name().unwrap_or("")),
        SortColumn::Value => a.agreed_value.total_cmp(&b.agreed_value),
        SortColumn::BuildPrice => a.build_price.total_cmp(&b.build_price),
        SortColumn::PriceCut => a.price_cut.total_cmp(&b.price_cut),
    }
}

/// Apply the query's filters, then a stable sort on its column.
pub fn query_projects<'a>(
    records: &'a [NormalizedRecord],
    query: &ProjectQuery,
) -> Vec<&'a NormalizedRecord> {
    let needle = query
        .search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_lowercase);

    let mut rows: Vec<&NormalizedRecord> = records
        .iter()
        .filter(|r| {
            needle
                .as_deref()
                .map_or(true, |n| r.project_name().to_lowercase().contains(n))
        })
        .filter(|r| {
            query
                .company
                .as_deref()
                .map_or(true, |c| r.raw.company_name.as_deref().unwrap_or("Unknown") == c)
        })
        .filter(|r| {
            query
                .winner
                .as_deref()
                .map_or(true, |w| r.winner_name() == Some(w))
        })
        .collect();

    rows.sort_by(|a, b| {
        let ord = compare(a, b, query.sort);
        match query.direction {
            SortDirection::Asc => ord,
            SortDirection::Desc => ord.reverse(),
        }
    });
    rows
}

/// Sorted distinct bidder company names, for the company filter.
pub fn company_options(records: &[NormalizedRecord]) -> Vec<String> {
    records
        .iter()
        .filter_map(|r| r.raw.company_name.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Sorted distinct winner names, for the winner filter.
pub fn winner_options(records: &[NormalizedRecord]) -> Vec<String> {
    records
        .iter()
        .filter_map(|r| r.winner_name().map(str::to_string))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
