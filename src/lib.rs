pub mod aggregate;
pub mod cli;
pub mod error;
pub mod loader;
pub mod normalize;
pub mod output;
pub mod rank;
pub mod reports;
pub mod search;
pub mod series;
pub mod session;
pub mod settings;
pub mod table;
pub mod types;
pub mod util;
pub mod views;

pub use aggregate::{aggregate, AggregateBucket, GroupKey, Grouping};
pub use error::AppError;
pub use normalize::{normalize, NormalizedRecord, Period};
pub use rank::{rank, Metric};
pub use series::{build_series, ChartSeries, SeriesSpec};
pub use types::RawRecord;
