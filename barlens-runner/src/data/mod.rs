//! Data collaborators: bar sources, canonicalization and the Parquet cache.

pub mod cache;
pub mod canonicalize;
pub mod csv_source;
mod frame;
pub mod provider;
pub mod synthetic;

pub use cache::{CacheEntry, CachedSource, ParquetCache};
pub use canonicalize::{canonicalize, CanonicalStats};
pub use csv_source::CsvSource;
pub use provider::{BarSource, DataError, DataOrigin, FetchRequest, Interval, Period};
pub use synthetic::{synthetic_bars, SyntheticSource};
