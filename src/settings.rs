//! Layered settings: built-in defaults, then an optional TOML file, then
//! `BID_INSIGHT__*` environment variables.
use std::path::{Path, PathBuf};

use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;

const CONFIG_FILE: &str = "bid_insight";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error(transparent)]
    Build(#[from] config::ConfigError),
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct Settings {
    pub input: Option<PathBuf>,
    pub output_dir: PathBuf,
    pub top_companies: usize,
    pub win_rate_limit: usize,
    pub min_bids: usize,
    pub comparison_limit: usize,
    pub head_to_head_top_n: usize,
    pub adjacent_limit: usize,
    pub label_max_chars: usize,
    pub preview_rows: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            input: None,
            output_dir: PathBuf::from("reports"),
            top_companies: 20,
            win_rate_limit: 15,
            min_bids: 1,
            comparison_limit: 10,
            head_to_head_top_n: 5,
            adjacent_limit: 20,
            label_max_chars: 20,
            preview_rows: 5,
        }
    }
}

/// Load settings. An explicit `path` must exist; the default
/// `bid_insight.toml` in the working directory is optional.
pub fn load(path: Option<&Path>) -> Result<Settings, SettingsError> {
    let d = Settings::default();
    let file = match path {
        Some(p) => File::from(p).required(true),
        None => File::with_name(CONFIG_FILE).required(false),
    };
    let builder = Config::builder()
        .set_default("output_dir", d.output_dir.to_string_lossy().to_string())?
        .set_default("top_companies", d.top_companies as u64)?
        .set_default("win_rate_limit", d.win_rate_limit as u64)?
        .set_default("min_bids", d.min_bids as u64)?
        .set_default("comparison_limit", d.comparison_limit as u64)?
        .set_default("head_to_head_top_n", d.head_to_head_top_n as u64)?
        .set_default("adjacent_limit", d.adjacent_limit as u64)?
        .set_default("label_max_chars", d.label_max_chars as u64)?
        .set_default("preview_rows", d.preview_rows as u64)?
        .add_source(file)
        .add_source(Environment::with_prefix("BID_INSIGHT").separator("__"));

    let settings = builder.build()?.try_deserialize()?;
    Ok(settings)
}
