use std::fs;
use std::path::Path;

use csv::ReaderBuilder;
use serde_json::{Map, Value};

use crate::error::AppError;
use crate::normalize::{normalize, NormalizedRecord, Period};
use crate::types::RawRecord;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadReport {
    pub total_rows: usize,
    pub loaded_rows: usize,
    pub parse_errors: usize,
    pub undated_rows: usize,
}

/// Read a saved backend payload (`.json` array or `.csv` export) and
/// normalize it. Rows that are not objects are skipped and counted.
pub fn load_records(path: &Path) -> Result<(Vec<NormalizedRecord>, LoadReport), AppError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    let text = fs::read_to_string(path).map_err(|source| AppError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let (raw, mut report) = match ext.as_deref() {
        Some("json") => parse_json(&text)?,
        Some("csv") => parse_csv(&text)?,
        _ => return Err(AppError::UnsupportedFormat(path.to_path_buf())),
    };

    let records = normalize(&raw);
    report.loaded_rows = records.len();
    report.undated_rows = records
        .iter()
        .filter(|r| r.period == Period::Unknown)
        .count();
    tracing::info!(
        path = %path.display(),
        total = report.total_rows,
        loaded = report.loaded_rows,
        errors = report.parse_errors,
        "records loaded"
    );
    Ok((records, report))
}

pub fn parse_json(text: &str) -> Result<(Vec<RawRecord>, LoadReport), AppError> {
    let rows = match serde_json::from_str::<Value>(text)? {
        Value::Array(rows) => rows,
        Value::Object(mut obj) => match obj.remove("data") {
            Some(Value::Array(rows)) => rows,
            _ => return Err(AppError::UnexpectedShape),
        },
        _ => return Err(AppError::UnexpectedShape),
    };
    Ok(collect_rows(rows))
}

pub fn parse_csv(text: &str) -> Result<(Vec<RawRecord>, LoadReport), AppError> {
    let mut rdr = ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());
    let headers = rdr.headers()?.clone();
    let mut rows = Vec::new();
    let mut broken = 0usize;
    for result in rdr.records() {
        // Cells stay strings; the record's field adapters do the parsing so
        // leading zeros in TINs survive.
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                tracing::debug!(error = %e, "unreadable csv row");
                broken += 1;
                continue;
            }
        };
        let obj: Map<String, Value> = headers
            .iter()
            .zip(record.iter())
            .map(|(h, v)| {
                let v = if v.is_empty() {
                    Value::Null
                } else {
                    Value::String(v.to_string())
                };
                (h.to_string(), v)
            })
            .collect();
        rows.push(Value::Object(obj));
    }
    let (raw, mut report) = collect_rows(rows);
    report.total_rows += broken;
    report.parse_errors += broken;
    Ok((raw, report))
}

fn collect_rows(rows: Vec<Value>) -> (Vec<RawRecord>, LoadReport) {
    let mut report = LoadReport {
        total_rows: rows.len(),
        ..LoadReport::default()
    };
    let mut raw = Vec::with_capacity(rows.len());
    for row in rows {
        match serde_json::from_value::<RawRecord>(row) {
            Ok(r) => raw.push(r),
            Err(e) => {
                tracing::debug!(error = %e, "skipping malformed row");
                report.parse_errors += 1;
            }
        }
    }
    (raw, report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_array_with_a_bad_row() {
        let text = r#"[
            {"winner": "A", "sum_price_agree": 10, "contract_date": "2023-01-05"},
            42,
            {"winner": "B"}
        ]"#;
        let (raw, report) = parse_json(text).unwrap();
        assert_eq!(raw.len(), 2);
        assert_eq!(report.total_rows, 3);
        assert_eq!(report.parse_errors, 1);
    }

    #[test]
    fn json_object_with_data_array() {
        let (raw, _) = parse_json(r#"{"data": [{"winner": "A"}]}"#).unwrap();
        assert_eq!(raw[0].winner_name.as_deref(), Some("A"));
        assert!(matches!(
            parse_json(r#"{"rows": []}"#),
            Err(AppError::UnexpectedShape)
        ));
    }

    #[test]
    fn csv_keeps_tin_text_and_parses_numbers() {
        let text = "project_id,tin_unused,company_tin,company,bid,is_winner,transaction_date\n\
                    7,,0105551234567,Siam Co,\"1,500\",true,2023-07-15\n\
                    8,,0105551234567,Siam Co,,false,\n";
        let (raw, report) = parse_csv(text).unwrap();
        assert_eq!(report.parse_errors, 0);
        assert_eq!(raw.len(), 2);
        assert_eq!(raw[0].company_tin.as_deref(), Some("0105551234567"));
        assert_eq!(raw[0].bid_value, Some(1500.0));
        assert_eq!(raw[0].is_winner, Some(true));
        assert_eq!(raw[1].bid_value, None);
        assert_eq!(raw[1].transaction_date, None);
    }

    #[test]
    fn load_reports_undated_rows() {
        let path = std::env::temp_dir().join(format!("bid_insight_load_{}.json", std::process::id()));
        fs::write(
            &path,
            r#"[{"winner": "A", "transaction_date": "2023-07-15"}, {"winner": "B"}]"#,
        )
        .unwrap();
        let (records, report) = load_records(&path).unwrap();
        fs::remove_file(&path).ok();
        assert_eq!(records.len(), 2);
        assert_eq!(report.loaded_rows, 2);
        assert_eq!(report.undated_rows, 1);
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let path = std::env::temp_dir().join(format!("bid_insight_{}.xml", std::process::id()));
        fs::write(&path, "<x/>").unwrap();
        let result = load_records(&path);
        fs::remove_file(&path).ok();
        assert!(matches!(result, Err(AppError::UnsupportedFormat(_))));
    }
}
