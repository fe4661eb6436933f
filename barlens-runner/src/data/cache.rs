//! Parquet cache with a freshness window.
//!
//! Layout: `{cache_dir}/{SYMBOL}_{interval}_{period}.parquet`
//!
//! - Atomic writes (write to .tmp, rename into place)
//! - Freshness by file modification time
//! - Integrity validation on load (schema check, row count > 0)
//! - Quarantine for corrupt files (`{filename}.quarantined`)

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use barlens_core::domain::Bar;
use polars::prelude::*;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::frame::{bars_to_frame, frame_to_bars};
use super::provider::{BarSource, DataError, DataOrigin, FetchRequest};

pub const DEFAULT_MAX_AGE_HOURS: u64 = 24;

/// The Parquet cache.
#[derive(Debug, Clone)]
pub struct ParquetCache {
    cache_dir: PathBuf,
    max_age: Duration,
}

impl ParquetCache {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self::with_max_age_hours(cache_dir, DEFAULT_MAX_AGE_HOURS)
    }

    pub fn with_max_age_hours(cache_dir: impl Into<PathBuf>, hours: u64) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            max_age: Duration::from_secs(hours * 3600),
        }
    }

    /// Root directory of the cache.
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    pub fn max_age(&self) -> Duration {
        self.max_age
    }

    /// `{cache_dir}/{SYMBOL}_{interval}_{period}.parquet`
    pub fn path_for(&self, request: &FetchRequest) -> PathBuf {
        self.cache_dir.join(format!(
            "{}_{}_{}.parquet",
            request.symbol.to_ascii_uppercase(),
            request.interval,
            request.period
        ))
    }

    /// True when the file exists and is younger than the freshness window.
    pub fn is_fresh(&self, request: &FetchRequest) -> bool {
        file_age(&self.path_for(request)).is_some_and(|age| age < self.max_age)
    }

    /// Write bars for a request. Atomic: write to .tmp then rename.
    pub fn write(&self, request: &FetchRequest, bars: &[Bar]) -> Result<PathBuf, DataError> {
        if bars.is_empty() {
            return Err(DataError::NoData {
                symbol: request.symbol.clone(),
            });
        }
        fs::create_dir_all(&self.cache_dir)?;

        let mut df = bars_to_frame(bars)?;
        let path = self.path_for(request);
        let tmp_path = path.with_extension("parquet.tmp");
        write_parquet(&mut df, &tmp_path)?;

        fs::rename(&tmp_path, &path).map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            DataError::Io(e)
        })?;
        debug!(path = %path.display(), bars = bars.len(), "cache write");
        Ok(path)
    }

    /// Load cached bars regardless of age.
    ///
    /// A file that fails validation is renamed to `.quarantined` and reported
    /// as a miss.
    pub fn load(&self, request: &FetchRequest) -> Result<Vec<Bar>, DataError> {
        let path = self.path_for(request);
        if !path.exists() {
            return Err(DataError::NoData {
                symbol: request.symbol.clone(),
            });
        }
        match load_and_validate_parquet(&path) {
            Ok(bars) => Ok(bars),
            Err(e) => {
                let quarantine = path.with_extension("parquet.quarantined");
                warn!(path = %path.display(), error = %e, "quarantining corrupt cache file");
                let _ = fs::rename(&path, &quarantine);
                Err(DataError::NoData {
                    symbol: request.symbol.clone(),
                })
            }
        }
    }

    /// Load only if the entry is inside the freshness window.
    pub fn load_fresh(&self, request: &FetchRequest) -> Option<Vec<Bar>> {
        if !self.is_fresh(request) {
            return None;
        }
        self.load(request).ok()
    }

    /// Every cache file, newest first.
    pub fn status(&self) -> Result<Vec<CacheEntry>, DataError> {
        if !self.cache_dir.exists() {
            return Ok(Vec::new());
        }
        let mut entries = Vec::new();
        for entry in fs::read_dir(&self.cache_dir)? {
            let path = entry?.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let quarantined = name.ends_with(".quarantined");
            if !(name.ends_with(".parquet") || quarantined) {
                continue;
            }
            let metadata = fs::metadata(&path)?;
            let age = file_age(&path);
            entries.push(CacheEntry {
                file_name: name.to_string(),
                size_bytes: metadata.len(),
                age_hours: age.map(|a| a.as_secs_f64() / 3600.0),
                fresh: !quarantined && age.is_some_and(|a| a < self.max_age),
                quarantined,
            });
        }
        entries.sort_by(|a, b| {
            a.age_hours
                .unwrap_or(f64::MAX)
                .total_cmp(&b.age_hours.unwrap_or(f64::MAX))
        });
        Ok(entries)
    }

    /// Delete stale and quarantined files (or every cache file with `all`).
    /// Returns the number of files removed.
    pub fn clean(&self, all: bool) -> Result<usize, DataError> {
        let mut removed = 0;
        for entry in self.status()? {
            if all || !entry.fresh {
                fs::remove_file(self.cache_dir.join(&entry.file_name))?;
                removed += 1;
            }
        }
        info!(removed, all, "cache cleaned");
        Ok(removed)
    }
}

/// One file in the cache directory.
#[derive(Debug, Clone, Serialize)]
pub struct CacheEntry {
    pub file_name: String,
    pub size_bytes: u64,
    pub age_hours: Option<f64>,
    pub fresh: bool,
    pub quarantined: bool,
}

/// A `BarSource` behind the Parquet cache.
///
/// Fresh hits never touch the inner source. Misses fetch, write through, and
/// return the fetched bars. Fetch errors pass through unchanged.
pub struct CachedSource<S> {
    inner: S,
    cache: ParquetCache,
}

impl<S: BarSource> CachedSource<S> {
    pub fn new(inner: S, cache: ParquetCache) -> Self {
        Self { inner, cache }
    }

    pub fn cache(&self) -> &ParquetCache {
        &self.cache
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

impl<S: BarSource> BarSource for CachedSource<S> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn origin(&self) -> DataOrigin {
        self.inner.origin()
    }

    fn fetch(&self, request: &FetchRequest) -> Result<Vec<Bar>, DataError> {
        self.fetch_with_origin(request).map(|(bars, _)| bars)
    }

    /// Fresh hits report `DataOrigin::Cache`; misses report the inner origin.
    fn fetch_with_origin(
        &self,
        request: &FetchRequest,
    ) -> Result<(Vec<Bar>, DataOrigin), DataError> {
        request.validate()?;
        if let Some(bars) = self.cache.load_fresh(request) {
            info!(symbol = %request.symbol, "loading cached data");
            return Ok((bars, DataOrigin::Cache));
        }

        let bars = self.inner.fetch(request)?;
        if bars.is_empty() {
            return Err(DataError::NoData {
                symbol: request.symbol.clone(),
            });
        }
        self.cache.write(request, &bars)?;
        info!(symbol = %request.symbol, source = self.inner.name(), bars = bars.len(), "fetched");
        Ok((bars, self.inner.origin()))
    }
}

// ── Parquet I/O helpers ─────────────────────────────────────────────

fn file_age(path: &Path) -> Option<Duration> {
    let modified = fs::metadata(path).ok()?.modified().ok()?;
    Some(
        SystemTime::now()
            .duration_since(modified)
            .unwrap_or(Duration::ZERO),
    )
}

fn write_parquet(df: &mut DataFrame, path: &Path) -> Result<(), DataError> {
    let file = fs::File::create(path)?;
    ParquetWriter::new(file)
        .finish(df)
        .map_err(|e| DataError::Parquet(format!("write parquet: {e}")))?;
    Ok(())
}

fn load_and_validate_parquet(path: &Path) -> Result<Vec<Bar>, DataError> {
    let file = fs::File::open(path)?;
    let df = ParquetReader::new(file)
        .finish()
        .map_err(|e| DataError::Parquet(format!("read: {e}")))?;
    if df.height() == 0 {
        return Err(DataError::Parquet("empty parquet file".into()));
    }
    frame_to_bars(&df)
}
