//! barlens CLI: analysis, backtest and cache management commands.
//!
//! Commands:
//! - `analyze`: indicators, patterns and signals for one or more symbols
//! - `backtest`: replay the conservative signal frame and print metrics
//! - `cache status`: list cached Parquet files and their freshness
//! - `cache clean`: remove stale or quarantined cache files

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use barlens_core::signals::{SignalBundle, StrategyKind};
use barlens_runner::data::{
    BarSource, CachedSource, CsvSource, Interval, ParquetCache, Period, SyntheticSource,
};
use barlens_runner::config::SourceKind;
use barlens_runner::export::{generate_summary, load_predictions, save_artifacts};
use barlens_runner::{
    analyze, analyze_many, load_series, AnalysisConfig, AnalysisReport, FetchRequest,
};
use clap::{Args, Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "barlens", about = "barlens: technical analysis over OHLCV bars")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Options shared by `analyze` and `backtest`.
#[derive(Args)]
struct DataArgs {
    /// Path to a TOML config file. Flags below override it.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Lookback: 1d 5d 1mo 3mo 6mo 1y 2y 5y 10y ytd max.
    #[arg(long)]
    period: Option<Period>,

    /// Bar size: 1m 2m 5m 15m 30m 60m 90m 1h 1d 5d 1wk 1mo 3mo.
    #[arg(long)]
    interval: Option<Interval>,

    /// Directory with {SYMBOL}.csv files.
    #[arg(long)]
    csv_dir: Option<PathBuf>,

    /// Parquet cache directory.
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// Generate synthetic bars instead of reading CSV files.
    #[arg(long, default_value_t = false)]
    synthetic: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute indicators, patterns and signals.
    Analyze {
        /// Symbols to analyze (e.g., SPY QQQ AAPL).
        #[arg(required = true)]
        symbols: Vec<String>,

        #[command(flatten)]
        data: DataArgs,

        /// conservative or directional.
        #[arg(long)]
        strategy: Option<StrategyKind>,

        /// CSV with an externally computed forecast to attach (single symbol only).
        #[arg(long)]
        predictions: Option<PathBuf>,

        /// Write report.json, summary.md and ledger CSVs under this directory.
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Print the full JSON report to stdout instead of the summary.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Backtest the conservative rule set on one symbol.
    Backtest {
        symbol: String,

        #[command(flatten)]
        data: DataArgs,

        /// Starting capital (overrides [backtest] initial_capital).
        #[arg(long)]
        capital: Option<f64>,

        /// Write report.json, summary.md and ledger CSVs under this directory.
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
    /// Cache management commands.
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// List cached files with age and freshness.
    Status {
        #[arg(long, default_value = "data/cache")]
        cache_dir: PathBuf,

        /// Freshness window in hours.
        #[arg(long, default_value_t = 24)]
        max_age_hours: u64,
    },
    /// Remove stale and quarantined files.
    Clean {
        #[arg(long, default_value = "data/cache")]
        cache_dir: PathBuf,

        #[arg(long, default_value_t = 24)]
        max_age_hours: u64,

        /// Remove every cache file, fresh or not.
        #[arg(long, default_value_t = false)]
        all: bool,

        /// Actually delete (without this flag, only previews what would be removed).
        #[arg(long, default_value_t = false)]
        confirm: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("barlens=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Analyze {
            symbols,
            data,
            strategy,
            predictions,
            output_dir,
            json,
        } => run_analyze(symbols, data, strategy, predictions, output_dir, json),
        Commands::Backtest {
            symbol,
            data,
            capital,
            output_dir,
        } => run_backtest_cmd(symbol, data, capital, output_dir),
        Commands::Cache { action } => match action {
            CacheAction::Status {
                cache_dir,
                max_age_hours,
            } => run_cache_status(&cache_dir, max_age_hours),
            CacheAction::Clean {
                cache_dir,
                max_age_hours,
                all,
                confirm,
            } => run_cache_clean(&cache_dir, max_age_hours, all, confirm),
        },
    }
}

/// Load the config file (or defaults) and apply command-line overrides.
fn resolve_config(data: &DataArgs) -> Result<AnalysisConfig> {
    let mut config = match &data.config {
        Some(path) => AnalysisConfig::load(path)?,
        None => AnalysisConfig::default(),
    };
    if let Some(period) = data.period {
        config.data.period = period;
    }
    if let Some(interval) = data.interval {
        config.data.interval = interval;
    }
    if let Some(dir) = &data.csv_dir {
        config.data.csv_dir = dir.clone();
    }
    if let Some(dir) = &data.cache_dir {
        config.data.cache_dir = dir.clone();
    }
    if data.synthetic {
        config.data.source = SourceKind::Synthetic;
    }
    Ok(config)
}

fn build_source(config: &AnalysisConfig) -> Box<dyn BarSource> {
    let d = &config.data;
    match d.source {
        SourceKind::Csv => Box::new(CachedSource::new(
            CsvSource::new(&d.csv_dir),
            ParquetCache::with_max_age_hours(&d.cache_dir, d.max_cache_age_hours),
        )),
        SourceKind::Synthetic => Box::new(SyntheticSource::new(d.synthetic_seed, d.synthetic_bars)),
    }
}

fn run_analyze(
    symbols: Vec<String>,
    data: DataArgs,
    strategy: Option<StrategyKind>,
    predictions: Option<PathBuf>,
    output_dir: Option<PathBuf>,
    json: bool,
) -> Result<()> {
    let mut config = resolve_config(&data)?;
    if let Some(kind) = strategy {
        config.strategy.kind = kind;
    }
    if predictions.is_some() && symbols.len() != 1 {
        bail!("--predictions takes exactly one symbol");
    }

    let source = build_source(&config);
    let mut inputs = Vec::with_capacity(symbols.len());
    for symbol in &symbols {
        let request = FetchRequest::new(symbol, config.data.period, config.data.interval);
        let (series, origin) = load_series(source.as_ref(), &request)
            .with_context(|| format!("failed to load {symbol}"))?;
        inputs.push((series, Some(origin)));
    }

    let reports: Vec<AnalysisReport> = match predictions {
        Some(path) => {
            let preds = load_predictions(&path)?;
            let (series, origin) = &inputs[0];
            vec![analyze(series, &config, *origin, Some(preds))?]
        }
        None => analyze_many(&inputs, &config)
            .into_iter()
            .collect::<Result<_, _>>()?,
    };

    for report in &reports {
        if json {
            println!("{}", serde_json::to_string_pretty(report)?);
        } else {
            print!("{}", generate_summary(report));
            println!();
        }
        save_if_requested(report, output_dir.as_deref())?;
    }
    Ok(())
}

fn run_backtest_cmd(
    symbol: String,
    data: DataArgs,
    capital: Option<f64>,
    output_dir: Option<PathBuf>,
) -> Result<()> {
    let mut config = resolve_config(&data)?;
    if let Some(capital) = capital {
        config.backtest.initial_capital = capital;
    }
    config.strategy.kind = StrategyKind::Conservative;
    config.validate()?;

    let source = build_source(&config);
    let request = FetchRequest::new(&symbol, config.data.period, config.data.interval);
    let (series, origin) = load_series(source.as_ref(), &request)?;
    let report = analyze(&series, &config, Some(origin), None)?;

    print_backtest(&report)?;
    save_if_requested(&report, output_dir.as_deref())
}

fn save_if_requested(report: &AnalysisReport, output_dir: Option<&Path>) -> Result<()> {
    if let Some(dir) = output_dir {
        let run_dir = save_artifacts(report, dir)?;
        info!(path = %run_dir.display(), "artifacts saved");
    }
    Ok(())
}

fn print_backtest(report: &AnalysisReport) -> Result<()> {
    let (Some(bt), Some(m)) = (&report.backtest, &report.metrics) else {
        bail!(
            "not enough history to backtest {} ({} bars)",
            report.symbol,
            report.bars.len()
        );
    };
    let entries = match &report.signals {
        Some(SignalBundle::Conservative(frame)) => frame.entry_count(),
        _ => 0,
    };

    println!();
    println!("=== Backtest Result ===");
    println!("Symbol:         {}", report.symbol);
    if let (Some(first), Some(last)) = (report.bars.first(), report.bars.last()) {
        println!("Period:         {} to {}", first.timestamp, last.timestamp);
    }
    println!("Bars:           {}", report.bars.len());
    println!("Entry signals:  {entries}");
    println!("Trades:         {}", bt.summary.total_trades);
    println!();
    println!("--- Performance ---");
    println!("Initial:        {:.2}", bt.initial_capital);
    println!("Final Balance:  {:.2}", bt.summary.final_balance);
    println!("Total Return:   {:.2}%", bt.summary.total_return);
    println!("Avg Return:     {:.2}%", bt.summary.avg_return);
    println!("Best / Worst:   {:.2}% / {:.2}%", bt.summary.max_return, bt.summary.min_return);
    println!("Win Rate:       {:.1}%", bt.summary.win_rate() * 100.0);
    println!("CAGR:           {:.2}%", m.cagr * 100.0);
    println!("Sharpe:         {:.3}", m.sharpe);
    println!("Sortino:        {:.3}", m.sortino);
    println!("Max Drawdown:   {:.2}%", m.max_drawdown * 100.0);
    println!("Profit Factor:  {:.2}", m.profit_factor);
    println!("Exposure:       {:.1}%", m.exposure * 100.0);
    if let Some(open) = &bt.open_position {
        println!(
            "Open position:  {:.4} shares @ {:.2} ({:+.2}% unrealized, not in balance)",
            open.shares,
            open.entry_price,
            open.unrealized_pct()
        );
    }
    if report.origin == Some(barlens_runner::DataOrigin::Synthetic) {
        println!();
        println!("WARNING: Results based on SYNTHETIC data");
    }
    println!();
    Ok(())
}

fn run_cache_status(cache_dir: &Path, max_age_hours: u64) -> Result<()> {
    let cache = ParquetCache::with_max_age_hours(cache_dir, max_age_hours);
    let entries = cache.status()?;
    if entries.is_empty() {
        println!("Cache is empty: {}", cache_dir.display());
        return Ok(());
    }

    let total: u64 = entries.iter().map(|e| e.size_bytes).sum();
    println!("Cache: {}", cache_dir.display());
    println!("Files: {}", entries.len());
    println!("Total size: {}", format_size(total));
    println!();
    println!("{:<32} {:>10} {:>10} {:<8}", "File", "Age (h)", "Size", "State");
    println!("{}", "-".repeat(64));
    for e in &entries {
        let state = if e.quarantined {
            "corrupt"
        } else if e.fresh {
            "fresh"
        } else {
            "stale"
        };
        let age = e
            .age_hours
            .map_or_else(|| "-".to_string(), |h| format!("{h:.1}"));
        println!(
            "{:<32} {:>10} {:>10} {:<8}",
            e.file_name,
            age,
            format_size(e.size_bytes),
            state
        );
    }
    Ok(())
}

fn run_cache_clean(cache_dir: &Path, max_age_hours: u64, all: bool, confirm: bool) -> Result<()> {
    let cache = ParquetCache::with_max_age_hours(cache_dir, max_age_hours);
    let doomed: Vec<_> = cache
        .status()?
        .into_iter()
        .filter(|e| all || !e.fresh)
        .collect();

    if doomed.is_empty() {
        println!("Nothing to remove.");
        return Ok(());
    }
    println!("Found {} file(s) to remove:", doomed.len());
    for e in &doomed {
        println!("  {} ({})", e.file_name, format_size(e.size_bytes));
    }
    if !confirm {
        println!();
        println!("Dry run. Pass --confirm to actually delete.");
        return Ok(());
    }

    let removed = cache.clean(all)?;
    if removed != doomed.len() {
        warn!(expected = doomed.len(), removed, "cache changed during clean");
    }
    println!("Done. Removed {removed} file(s).");
    Ok(())
}

fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
