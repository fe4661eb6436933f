//! CSV bar source: one `{SYMBOL}.csv` file per symbol in a directory.

use std::fs;
use std::path::{Path, PathBuf};

use barlens_core::domain::Bar;
use chrono::{DateTime, NaiveDate, NaiveDateTime};

use super::provider::{filter_period, BarSource, DataError, DataOrigin, FetchRequest};

/// Column positions resolved from a header row.
#[derive(Debug, Clone, Copy)]
struct Columns {
    timestamp: usize,
    open: usize,
    high: usize,
    low: usize,
    close: usize,
    volume: usize,
}

impl Columns {
    /// Header names are matched case-insensitively; the time column may be
    /// called `timestamp`, `date` or `datetime`.
    fn resolve(headers: &csv::StringRecord, source_name: &str) -> Result<Self, DataError> {
        let find = |names: &[&str]| -> Result<usize, DataError> {
            headers
                .iter()
                .position(|h| names.iter().any(|n| h.trim().eq_ignore_ascii_case(n)))
                .ok_or_else(|| DataError::MissingColumn {
                    column: names[0].to_string(),
                    source_name: source_name.to_string(),
                })
        };
        Ok(Self {
            timestamp: find(&["timestamp", "date", "datetime"])?,
            open: find(&["open"])?,
            high: find(&["high"])?,
            low: find(&["low"])?,
            close: find(&["close"])?,
            volume: find(&["volume"])?,
        })
    }
}

/// Reads `{dir}/{SYMBOL}.csv`.
///
/// Empty price cells become NaN and are filled later by `canonicalize`;
/// an empty volume cell reads as zero.
#[derive(Debug, Clone)]
pub struct CsvSource {
    dir: PathBuf,
}

impl CsvSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, symbol: &str) -> PathBuf {
        self.dir.join(format!("{}.csv", symbol.to_ascii_uppercase()))
    }
}

impl BarSource for CsvSource {
    fn name(&self) -> &str {
        "csv"
    }

    fn origin(&self) -> DataOrigin {
        DataOrigin::Csv
    }

    fn fetch(&self, request: &FetchRequest) -> Result<Vec<Bar>, DataError> {
        request.validate()?;
        let path = self.path_for(&request.symbol);
        if !path.exists() {
            return Err(DataError::NoData {
                symbol: request.symbol.clone(),
            });
        }
        let bars = read_bars(&path)?;
        Ok(filter_period(bars, request.period))
    }
}

/// Parse every row of a bar CSV. Row order is preserved.
pub fn read_bars(path: &Path) -> Result<Vec<Bar>, DataError> {
    let file = fs::File::open(path)?;
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(file);
    let source_name = path.display().to_string();
    let cols = Columns::resolve(reader.headers()?, &source_name)?;

    let mut bars = Vec::new();
    for (row, record) in reader.records().enumerate() {
        let record = record?;
        let field = |idx: usize| record.get(idx).unwrap_or("");
        let timestamp = parse_timestamp(field(cols.timestamp)).ok_or_else(|| {
            DataError::InvalidParameter(format!(
                "{source_name} row {}: unparseable timestamp '{}'",
                row + 1,
                field(cols.timestamp)
            ))
        })?;
        let price = |idx: usize| parse_number(field(idx), &source_name, row, f64::NAN);
        bars.push(Bar {
            timestamp,
            open: price(cols.open)?,
            high: price(cols.high)?,
            low: price(cols.low)?,
            close: price(cols.close)?,
            volume: parse_number(field(cols.volume), &source_name, row, 0.0)?,
        });
    }
    Ok(bars)
}

/// Write bars in the same layout `read_bars` accepts.
pub fn write_bars(path: &Path, bars: &[Bar]) -> Result<(), DataError> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(["timestamp", "open", "high", "low", "close", "volume"])?;
    for bar in bars {
        writer.write_record([
            bar.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
            bar.open.to_string(),
            bar.high.to_string(),
            bar.low.to_string(),
            bar.close.to_string(),
            bar.volume.to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

/// Accepts plain dates, naive date-times, and offset date-times (kept as
/// exchange-local wall time).
fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    const NAIVE_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_local());
    }
    if let Ok(dt) = DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%:z") {
        return Some(dt.naive_local());
    }
    for fmt in NAIVE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Integers and floats both parse; an empty cell yields `missing`.
fn parse_number(raw: &str, source_name: &str, row: usize, missing: f64) -> Result<f64, DataError> {
    if raw.is_empty() {
        return Ok(missing);
    }
    raw.parse::<f64>().map_err(|_| {
        DataError::InvalidParameter(format!(
            "{source_name} row {}: '{raw}' is not a number",
            row + 1
        ))
    })
}
