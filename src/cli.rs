use std::path::PathBuf;

use clap::{ArgAction, Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use crate::rank::Metric;

/// Procurement bid analytics reports.
#[derive(Debug, Parser)]
#[command(name = "bid-insight", version, about = "Procurement bid analytics reports")]
pub struct Cli {
    /// Saved backend payload (.json or .csv). Overrides the settings file.
    #[arg(short, long)]
    pub input: Option<PathBuf>,
    /// Settings file (TOML). Defaults to ./bid_insight.toml when present.
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// TIN of the company to analyse.
    #[arg(long)]
    pub company: Option<String>,
    /// Restrict the monthly report to one year.
    #[arg(long)]
    pub year: Option<i32>,
    /// Metric used to rank the company comparison.
    #[arg(long, value_enum, default_value_t = CompareMetric::WinRate)]
    pub metric: CompareMetric,
    /// Generate reports once and exit instead of showing the menu.
    #[arg(long)]
    pub batch: bool,
    /// Increase logging verbosity (-v, -vv, -vvv).
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CompareMetric {
    WinRate,
    TotalBids,
    Wins,
    Value,
    PriceCut,
}

impl From<CompareMetric> for Metric {
    fn from(m: CompareMetric) -> Self {
        match m {
            CompareMetric::WinRate => Metric::WinRate,
            CompareMetric::TotalBids => Metric::Count,
            CompareMetric::Wins => Metric::WinCount,
            CompareMetric::Value => Metric::TotalValue,
            CompareMetric::PriceCut => Metric::AvgPriceCut,
        }
    }
}

/// Log filter for `-v` count: warn, info, debug, then trace. Without `-v`,
/// a valid `RUST_LOG` takes over.
pub fn log_filter(verbose: u8) -> EnvFilter {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    if verbose == 0 {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
    } else {
        EnvFilter::new(level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_batch_invocation() {
        let cli = Cli::try_parse_from([
            "bid-insight",
            "--input",
            "bids.json",
            "--company",
            "0105",
            "--metric",
            "total-bids",
            "--batch",
            "-vv",
        ])
        .unwrap();
        assert_eq!(cli.input, Some(PathBuf::from("bids.json")));
        assert_eq!(cli.company.as_deref(), Some("0105"));
        assert_eq!(Metric::from(cli.metric), Metric::Count);
        assert!(cli.batch);
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn metric_defaults_to_win_rate() {
        let cli = Cli::try_parse_from(["bid-insight"]).unwrap();
        assert_eq!(cli.metric, CompareMetric::WinRate);
        assert!(!cli.batch);
    }

    #[test]
    fn verbosity_overrides_rust_log() {
        assert_eq!(log_filter(1).to_string(), "info");
        assert_eq!(log_filter(2).to_string(), "debug");
        assert_eq!(log_filter(7).to_string(), "trace");
    }
}
