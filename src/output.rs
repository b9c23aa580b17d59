use std::fs;
use std::path::Path;

use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use crate::error::AppError;

pub fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<(), AppError> {
    let mut wtr = csv::Writer::from_path(path)?;
    for r in rows {
        wtr.serialize(r)?;
    }
    wtr.flush().map_err(|source| AppError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::debug!(path = %path.display(), rows = rows.len(), "csv written");
    Ok(())
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), AppError> {
    let s = serde_json::to_string_pretty(value)?;
    fs::write(path, s).map_err(|source| AppError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::debug!(path = %path.display(), "json written");
    Ok(())
}

pub fn ensure_dir(dir: &Path) -> Result<(), AppError> {
    fs::create_dir_all(dir).map_err(|source| AppError::Write {
        path: dir.to_path_buf(),
        source,
    })
}

/// Markdown table of the first `max_rows` rows, or `(no data)`.
pub fn render_table<T>(rows: &[T], max_rows: usize) -> String
where
    T: Tabled + Clone,
{
    let slice: Vec<T> = rows.iter().take(max_rows).cloned().collect();
    if slice.is_empty() {
        return "(no data)".to_string();
    }
    Table::new(slice).with(Style::markdown()).to_string()
}

pub fn preview_table_rows<T>(rows: &[T], max_rows: usize)
where
    T: Tabled + Clone,
{
    println!("{}\n", render_table(rows, max_rows));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::WinRateRow;

    fn rows() -> Vec<WinRateRow> {
        vec![
            WinRateRow {
                rank: 1,
                company: "A".into(),
                bids: 4,
                wins: 3,
                win_rate: "75.00".into(),
            },
            WinRateRow {
                rank: 2,
                company: "B".into(),
                bids: 2,
                wins: 1,
                win_rate: "50.00".into(),
            },
        ]
    }

    #[test]
    fn preview_is_markdown_and_truncated() {
        let out = render_table(&rows(), 1);
        assert!(out.contains("| Rank |"));
        assert!(out.contains("| A "));
        assert!(!out.contains("| B "));
    }

    #[test]
    fn empty_preview_says_no_data() {
        assert_eq!(render_table::<WinRateRow>(&[], 5), "(no data)");
    }

    #[test]
    fn csv_uses_renamed_headers() {
        let path = std::env::temp_dir().join(format!("bid_insight_out_{}.csv", std::process::id()));
        write_csv(&path, &rows()).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        fs::remove_file(&path).ok();
        assert!(text.starts_with("Rank,Company,Bids,Wins,WinRate\n"));
        assert!(text.contains("1,A,4,3,75.00"));
    }
}
