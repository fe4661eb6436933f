//! barlens runner: everything around the pure core.
//!
//! - Configuration from TOML
//! - Bar sources (CSV files, synthetic walks) behind a Parquet cache
//! - Canonicalization of raw bars into a `BarSeries`
//! - The analysis pipeline and its parallel multi-symbol form
//! - Performance metrics and JSON / CSV / Markdown export

pub mod config;
pub mod data;
pub mod export;
pub mod metrics;
pub mod pipeline;

pub use config::{AnalysisConfig, ConfigError};
pub use data::{BarSource, DataError, DataOrigin, FetchRequest, Interval, Period};
pub use metrics::PerformanceMetrics;
pub use pipeline::{analyze, analyze_many, load_series, AnalysisReport, RunError, SCHEMA_VERSION};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn report_types_are_send_sync() {
        assert_send::<AnalysisReport>();
        assert_sync::<AnalysisReport>();
        assert_send::<PerformanceMetrics>();
        assert_sync::<PerformanceMetrics>();
        assert_send::<AnalysisConfig>();
        assert_sync::<AnalysisConfig>();
    }

    #[test]
    fn errors_are_send_sync() {
        assert_send::<RunError>();
        assert_sync::<RunError>();
        assert_send::<DataError>();
        assert_sync::<DataError>();
    }

    #[test]
    fn sources_are_send_sync() {
        assert_send::<data::CsvSource>();
        assert_sync::<data::CsvSource>();
        assert_send::<data::CachedSource<data::SyntheticSource>>();
        assert_sync::<data::CachedSource<data::SyntheticSource>>();
    }
}
