//! Record normalization: resolve the event date, the calendar period and the
//! numeric fields of every raw record, one output per input.
use std::fmt;

use chrono::{Datelike, Month, NaiveDate};
use serde::Serialize;

use crate::types::RawRecord;
use crate::util::parse_date_safe;

pub const UNKNOWN: &str = "Unknown";

/// Calendar bucket of a record. `Unknown` when neither date resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Period {
    Known { year: i32, month: u32 },
    Unknown,
}

impl Period {
    pub fn from_date(date: Option<NaiveDate>) -> Self {
        match date {
            Some(d) => Period::Known {
                year: d.year(),
                month: d.month(),
            },
            None => Period::Unknown,
        }
    }

    pub fn year(&self) -> Option<i32> {
        match self {
            Period::Known { year, .. } => Some(*year),
            Period::Unknown => None,
        }
    }

    /// `"2023"` or `"Unknown"`.
    pub fn year_label(&self) -> String {
        match self {
            Period::Known { year, .. } => year.to_string(),
            Period::Unknown => UNKNOWN.to_string(),
        }
    }

    /// English month name (`"July"`) or `"Unknown"`.
    pub fn month_label(&self) -> String {
        match self {
            Period::Known { month, .. } => u8::try_from(*month)
                .ok()
                .and_then(|m| Month::try_from(m).ok())
                .map(|m| m.name().to_string())
                .unwrap_or_else(|| UNKNOWN.to_string()),
            Period::Unknown => UNKNOWN.to_string(),
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Period::Known { year, .. } => write!(f, "{} {}", self.month_label(), year),
            Period::Unknown => f.write_str(UNKNOWN),
        }
    }
}

/// A raw record with its date and numbers resolved. Built once, never
/// mutated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedRecord {
    pub raw: RawRecord,
    pub event_date: Option<NaiveDate>,
    pub period: Period,
    pub agreed_value: f64,
    pub build_price: f64,
    pub bid_value: f64,
    pub price_cut: f64,
    /// `bid / agreed value`; `None` without a positive bid or with a zero
    /// agreed value.
    pub bid_ratio: Option<f64>,
    pub won: bool,
}

impl NormalizedRecord {
    pub fn from_raw(raw: &RawRecord) -> Self {
        // Contract date wins over transaction date; a present but unparseable
        // contract date does not fall through to the transaction date.
        let event_date = match raw.contract_date.as_deref() {
            Some(s) => parse_date_safe(Some(s)),
            None => parse_date_safe(raw.transaction_date.as_deref()),
        };
        let agreed_value = raw.agreed_value.unwrap_or(0.0);
        let bid_value = raw.bid_value.unwrap_or(0.0);
        let bid_ratio = match (raw.bid_value, raw.agreed_value) {
            (Some(bid), Some(agreed)) if bid > 0.0 && agreed != 0.0 => Some(bid / agreed),
            _ => None,
        };
        let won = raw.is_winner.unwrap_or_else(|| match (&raw.company_tin, &raw.winner_tin) {
            (Some(company), Some(winner)) => company == winner,
            (None, _) => raw.company_name.is_none() && raw.winner_name.is_some(),
            _ => false,
        });

        Self {
            raw: raw.clone(),
            event_date,
            period: Period::from_date(event_date),
            agreed_value,
            build_price: raw.build_price.unwrap_or(0.0),
            bid_value,
            price_cut: raw.price_cut_ratio.unwrap_or(0.0),
            bid_ratio,
            won,
        }
    }

    /// Identity of the company this record is about: the bidder on bid rows,
    /// the winner on project rows. TIN first, name as fallback.
    pub fn bidder_id(&self) -> Option<&str> {
        self.raw
            .company_tin
            .as_deref()
            .or(self.raw.company_name.as_deref())
            .or(self.winner_id())
    }

    pub fn bidder_name(&self) -> Option<&str> {
        self.raw
            .company_name
            .as_deref()
            .or(self.raw.company_tin.as_deref())
            .or(self.raw.winner_name.as_deref())
            .or(self.raw.winner_tin.as_deref())
    }

    pub fn winner_id(&self) -> Option<&str> {
        self.raw
            .winner_tin
            .as_deref()
            .or(self.raw.winner_name.as_deref())
    }

    pub fn winner_name(&self) -> Option<&str> {
        self.raw
            .winner_name
            .as_deref()
            .or(self.raw.winner_tin.as_deref())
    }

    pub fn project_name(&self) -> &str {
        self.raw.project_name.as_deref().unwrap_or("")
    }

    /// Project identity for shared-project comparisons. Falls back to the
    /// project name when the payload has no id.
    pub fn project_key(&self) -> Option<&str> {
        self.raw
            .project_id
            .as_deref()
            .or(self.raw.project_name.as_deref())
    }

    /// Raw date text as shown in tooltips (`N/A` when absent).
    pub fn date_text(&self) -> &str {
        self.raw
            .contract_date
            .as_deref()
            .or(self.raw.transaction_date.as_deref())
            .unwrap_or("N/A")
    }
}

/// 1:1, order-preserving. Never fails; unparseable dates land in
/// [`Period::Unknown`].
pub fn normalize(records: &[RawRecord]) -> Vec<NormalizedRecord> {
    records.iter().map(NormalizedRecord::from_raw).collect()
}
