use std::path::PathBuf;

use thiserror::Error;

use crate::settings::SettingsError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("unsupported input format for {0} (expected .json or .csv)")]
    UnsupportedFormat(PathBuf),
    #[error("expected a JSON array of records or an object with a `data` array")]
    UnexpectedShape,
    #[error("search query must be at least {min} characters")]
    QueryTooShort { min: usize },
    #[error("no data loaded; load a file first")]
    NoData,
    #[error("company `{0}` has no bids in the loaded data")]
    UnknownCompany(String),
}
