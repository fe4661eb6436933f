//! Report export: JSON, CSV and Markdown.
//!
//! - **JSON**: the full `AnalysisReport`, schema-versioned, the input for
//!   chart rendering
//! - **CSV**: trade ledger and equity curve
//! - **Markdown**: a human-readable summary
//!
//! Unknown (newer) schema versions are rejected on load.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use barlens_core::domain::TradeRecord;
use barlens_core::signals::SignalBundle;

use crate::pipeline::{AnalysisReport, RunError, SCHEMA_VERSION};

// ─── JSON ───────────────────────────────────────────────────────────

pub fn export_json(report: &AnalysisReport) -> Result<String> {
    serde_json::to_string_pretty(report).context("failed to serialize AnalysisReport to JSON")
}

pub fn import_json(json: &str) -> Result<AnalysisReport> {
    let report: AnalysisReport =
        serde_json::from_str(json).context("failed to deserialize AnalysisReport from JSON")?;
    if report.schema_version > SCHEMA_VERSION {
        return Err(RunError::SchemaVersion {
            found: report.schema_version,
            supported: SCHEMA_VERSION,
        }
        .into());
    }
    Ok(report)
}

// ─── CSV ────────────────────────────────────────────────────────────

pub fn export_trades_csv(trades: &[TradeRecord]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "entry_index",
        "entry_date",
        "entry_price",
        "exit_index",
        "exit_date",
        "exit_price",
        "shares",
        "returns_pct",
        "pnl",
        "bars_held",
        "exit_reason",
    ])?;
    for t in trades {
        wtr.write_record([
            t.entry_index.to_string(),
            t.entry_date.to_string(),
            format!("{:.6}", t.entry_price),
            t.exit_index.to_string(),
            t.exit_date.to_string(),
            format!("{:.6}", t.exit_price),
            format!("{:.6}", t.shares),
            format!("{:.4}", t.returns_pct),
            format!("{:.2}", t.pnl()),
            t.bars_held().to_string(),
            serde_json::to_value(t.exit_reason)?
                .as_str()
                .unwrap_or_default()
                .to_string(),
        ])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

pub fn export_equity_csv(equity_curve: &[f64]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["bar_index", "equity"])?;
    for (i, eq) in equity_curve.iter().enumerate() {
        wtr.write_record([i.to_string(), format!("{eq:.2}")])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Read an externally computed prediction series: the `prediction` column
/// if present, otherwise the last column. Empty cells become NaN.
pub fn load_predictions(path: &Path) -> Result<Vec<f64>> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    let headers = rdr.headers()?.clone();
    let Some(last) = headers.len().checked_sub(1) else {
        bail!("{} has no columns", path.display());
    };
    let col = headers
        .iter()
        .position(|h| h.eq_ignore_ascii_case("prediction"))
        .unwrap_or(last);

    let mut out = Vec::new();
    for (row, record) in rdr.records().enumerate() {
        let record = record?;
        let cell = record.get(col).unwrap_or("");
        if cell.is_empty() {
            out.push(f64::NAN);
        } else {
            out.push(cell.parse().with_context(|| {
                format!("{} row {}: '{cell}' is not a number", path.display(), row + 1)
            })?);
        }
    }
    Ok(out)
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Write `{output_dir}/{symbol}_{timestamp}/` containing `report.json`,
/// `summary.md`, and when a backtest ran, `trades.csv` and `equity.csv`.
pub fn save_artifacts(report: &AnalysisReport, output_dir: &Path) -> Result<PathBuf> {
    let dirname = format!(
        "{}_{}",
        report.symbol,
        chrono::Local::now().format("%Y%m%d_%H%M%S")
    );
    let run_dir = output_dir.join(dirname);
    fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create artifact dir: {}", run_dir.display()))?;

    fs::write(run_dir.join("report.json"), export_json(report)?)?;
    fs::write(run_dir.join("summary.md"), generate_summary(report))?;
    if let Some(bt) = &report.backtest {
        fs::write(run_dir.join("trades.csv"), export_trades_csv(&bt.trades)?)?;
        fs::write(run_dir.join("equity.csv"), export_equity_csv(&bt.equity_curve)?)?;
    }
    Ok(run_dir)
}

pub fn load_artifacts(dir: &Path) -> Result<AnalysisReport> {
    let path = dir.join("report.json");
    let json =
        fs::read_to_string(&path).with_context(|| format!("failed to read {}", path.display()))?;
    import_json(&json)
}

// ─── Markdown ───────────────────────────────────────────────────────

fn opt<T: std::fmt::Display>(value: Option<T>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}

pub fn generate_summary(report: &AnalysisReport) -> String {
    let mut md = String::with_capacity(2048);
    md.push_str(&format!("# {} Analysis\n\n", report.symbol));

    md.push_str("| Field | Value |\n| --- | --- |\n");
    if let (Some(first), Some(last)) = (report.bars.first(), report.bars.last()) {
        md.push_str(&format!(
            "| Range | {} to {} |\n",
            first.timestamp, last.timestamp
        ));
        md.push_str(&format!("| Last Close | {:.2} |\n", last.close));
    }
    md.push_str(&format!("| Bars | {} |\n", report.bars.len()));
    md.push_str(&format!("| Strategy | {} |\n", report.strategy));
    md.push_str(&format!("| Dataset Hash | {} |\n", report.dataset_hash));
    if let Some(origin) = report.origin {
        let label = serde_json::to_value(origin)
            .ok()
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_default();
        md.push_str(&format!("| Data | {label} |\n"));
    }
    md.push('\n');

    let p = &report.patterns;
    md.push_str("## Patterns\n\n| Detector | Reading |\n| --- | --- |\n");
    md.push_str(&format!("| Trend | {} |\n", opt(p.trend)));
    md.push_str(&format!("| Breakout | {} |\n", opt(p.breakout)));
    md.push_str(&format!("| Consolidating | {} |\n", opt(p.consolidating)));
    md.push_str(&format!("| Triangle | {} |\n", opt(p.triangle)));
    md.push_str(&format!("| MA Crossover | {} |\n", opt(p.crossover)));
    let charts: Vec<String> = p.chart_patterns.iter().map(ToString::to_string).collect();
    md.push_str(&format!(
        "| Chart Patterns | {} |\n",
        if charts.is_empty() { "-".to_string() } else { charts.join(", ") }
    ));
    if let Some(levels) = &p.support_resistance {
        md.push_str(&format!(
            "| Support / Resistance | {:.2} / {:.2} |\n",
            levels.support, levels.resistance
        ));
    }
    md.push('\n');

    md.push_str("## Signals\n\n");
    match &report.signals {
        None => md.push_str("Not enough history for signals.\n\n"),
        Some(SignalBundle::Conservative(frame)) => {
            let last = frame.len().saturating_sub(1);
            md.push_str(&format!(
                "Entries: {}, exits: {}, stops: {}.\n",
                frame.entry_count(),
                frame.exit_count(),
                frame.stop_count()
            ));
            if !frame.is_empty() {
                md.push_str(&format!(
                    "Last bar: entry={} exit={} stop={}\n",
                    frame.entry[last], frame.exit[last], frame.stop_loss[last]
                ));
            }
            md.push('\n');
        }
        Some(SignalBundle::Directional(rec)) => {
            md.push_str("| Field | Value |\n| --- | --- |\n");
            md.push_str(&format!("| Entry | {} |\n", opt(rec.entry)));
            md.push_str(&format!("| Exit | {} |\n", opt(rec.exit)));
            md.push_str(&format!("| Price | {:.2} |\n", rec.price));
            md.push_str(&format!("| Initial Stop | {:.2} |\n", rec.stop_loss.initial_stop));
            md.push_str(&format!("| Trailing Stop | {:.2} |\n", rec.stop_loss.trailing_stop));
            md.push_str(&format!("| Take Profit | {:.2} |\n", rec.take_profit));
            md.push_str(&format!("| Position Size | {} |\n", rec.position_size));
            md.push('\n');
        }
    }

    if let (Some(bt), Some(m)) = (&report.backtest, &report.metrics) {
        md.push_str("## Backtest\n\n| Metric | Value |\n| --- | --- |\n");
        md.push_str(&format!("| Initial Capital | {:.2} |\n", bt.initial_capital));
        md.push_str(&format!("| Final Balance | {:.2} |\n", bt.summary.final_balance));
        md.push_str(&format!("| Total Return | {:.2}% |\n", bt.summary.total_return));
        md.push_str(&format!("| Trades | {} |\n", bt.summary.total_trades));
        md.push_str(&format!("| Win Rate | {:.1}% |\n", m.win_rate * 100.0));
        md.push_str(&format!("| Avg Return | {:.2}% |\n", bt.summary.avg_return));
        md.push_str(&format!("| Sharpe | {:.3} |\n", m.sharpe));
        md.push_str(&format!("| Max Drawdown | {:.2}% |\n", m.max_drawdown * 100.0));
        md.push_str(&format!("| Profit Factor | {:.2} |\n", m.profit_factor));
        if let Some(open) = &bt.open_position {
            md.push_str(&format!(
                "| Open Position | {:.4} shares @ {:.2} ({:+.2}% unrealized) |\n",
                open.shares,
                open.entry_price,
                open.unrealized_pct()
            ));
        }
        md.push('\n');

        if !bt.trades.is_empty() {
            md.push_str("### Trades\n\n");
            md.push_str("| Entry | Exit | Entry Price | Exit Price | Return |\n");
            md.push_str("| --- | --- | --- | --- | --- |\n");
            for t in &bt.trades {
                md.push_str(&format!(
                    "| {} | {} | {:.2} | {:.2} | {:+.2}% |\n",
                    t.entry_date, t.exit_date, t.entry_price, t.exit_price, t.returns_pct
                ));
            }
            md.push('\n');
        }
    }

    if report.predictions.is_some() {
        md.push_str("Predictions attached.\n");
    }
    md
}
