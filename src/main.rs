use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use analytics::PerformanceReport;
use anyhow::{Context, bail};
use backtester::{Backtester, DataSource, InMemorySource, IndicatifReporter, JsonFileSource};
use chrono::{DateTime, NaiveDate, NaiveTime, TimeDelta, Utc};
use clap::{Args, Parser, Subcommand};
use comfy_table::{Table, presets::UTF8_FULL};
use configuration::{Config, RiskOverrides, load_config, telemetry::init_tracing};
use core_types::{Candle, Series, StrategyId, Trade};
use events::TracingSink;
use patterns::{PatternOrchestrator, scan_windows};
use risk::SimpleRiskManager;
use strategies::create_strategy;

/// The main entry point for the Chartist backtesting tool.
fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = load_config(cli.config.as_deref()).context("Failed to load configuration")?;
    let _guard = init_tracing(&config.logging).context("Failed to initialise logging")?;

    match cli.command {
        Commands::Backtest(args) => handle_backtest(args, config),
        Commands::Scan(args) => handle_scan(args, &config),
        Commands::Strategies => {
            list_strategies();
            Ok(())
        }
    }
}

// ==============================================================================
// CLI Structure
// ==============================================================================

/// Chart-pattern detection and bar-by-bar strategy backtesting.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to a TOML configuration file. Defaults to ./config.toml when present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single-asset backtest of one strategy.
    Backtest(BacktestArgs),
    /// Detect chart patterns over every trailing window of a series.
    Scan(ScanArgs),
    /// List the available strategies.
    Strategies,
}

#[derive(Args)]
struct DataArgs {
    /// A JSON file holding an array of candles.
    #[arg(long, conflicts_with = "data_dir", required_unless_present = "data_dir")]
    data: Option<PathBuf>,

    /// A directory of `<SYMBOL>_<interval>.json` files; symbol and interval come from the config.
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// First day to include (format: YYYY-MM-DD).
    #[arg(long)]
    from: Option<NaiveDate>,

    /// Last day to include (format: YYYY-MM-DD).
    #[arg(long)]
    to: Option<NaiveDate>,
}

#[derive(Args)]
struct BacktestArgs {
    #[command(flatten)]
    data: DataArgs,

    /// The strategy to run (see `chartist strategies`).
    #[arg(long)]
    strategy: StrategyId,

    /// Close open positions at the last close when the run completes.
    #[arg(long)]
    liquidate: bool,

    /// Write the report, trades and equity curve to this JSON file.
    #[arg(long)]
    report: Option<PathBuf>,

    /// Hide the progress bar.
    #[arg(long)]
    quiet: bool,

    #[command(flatten)]
    risk: RiskOverrides,
}

#[derive(Args)]
struct ScanArgs {
    #[command(flatten)]
    data: DataArgs,

    /// Number of candles in each scanned window.
    #[arg(long, default_value_t = 100)]
    window: usize,

    /// Distance in bars between consecutive window ends.
    #[arg(long, default_value_t = 1)]
    step: usize,

    /// Patterns below this confidence are dropped.
    #[arg(long, default_value_t = 0.6)]
    min_confidence: f64,
}

// ==============================================================================
// Data Loading
// ==============================================================================

impl DataArgs {
    fn range(&self) -> (DateTime<Utc>, DateTime<Utc>) {
        let start = self
            .from
            .map(|day| day.and_time(NaiveTime::MIN).and_utc())
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        let end = self
            .to
            .map(|day| day.and_time(NaiveTime::MIN).and_utc() + TimeDelta::days(1) - TimeDelta::nanoseconds(1))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        (start, end)
    }

    fn load(&self, config: &Config) -> anyhow::Result<Series> {
        let (start, end) = self.range();
        let symbol = &config.backtest.symbol;
        let interval = &config.backtest.interval;

        let series = match (&self.data, &self.data_dir) {
            (Some(path), _) => {
                let candles = JsonFileSource::read_candles(path)
                    .with_context(|| format!("Failed to read {}", path.display()))?;
                InMemorySource::new(candles).get_data(symbol, interval, start, end)?
            }
            (None, Some(dir)) => JsonFileSource::new(dir).get_data(symbol, interval, start, end)?,
            (None, None) => bail!("either --data or --data-dir is required"),
        };

        if series.is_empty() {
            bail!("No market data for {symbol} {interval} in the requested range");
        }
        tracing::info!(%symbol, %interval, candles = series.len(), "Market data loaded");
        Ok(series)
    }
}

// ==============================================================================
// Backtest Command Logic
// ==============================================================================

fn handle_backtest(args: BacktestArgs, mut config: Config) -> anyhow::Result<()> {
    args.risk.apply(&mut config);
    if args.liquidate {
        config.backtest.liquidate_on_finish = true;
    }
    config.validate().context("Invalid command-line overrides")?;

    let series = args.data.load(&config)?;
    let log = Arc::new(TracingSink);
    let strategy = create_strategy(args.strategy, &config, log.clone())?;
    let risk_manager = SimpleRiskManager::new(config.risk_management.clone())?;
    let reporter = if args.quiet {
        IndicatifReporter::hidden()
    } else {
        IndicatifReporter::new(series.len())?
    };

    let symbol = config.backtest.symbol.clone();
    let mut engine = Backtester::new(
        symbol.clone(),
        &config.backtest,
        series.into_inner(),
        strategy,
        Box::new(risk_manager),
        log,
    )?
    .with_progress(Arc::new(reporter));

    let report = match engine.run() {
        Ok(report) => report,
        Err(error) => {
            tracing::error!(
                trades = engine.get_results().len(),
                "Backtest aborted; trades closed before the failure are kept"
            );
            return Err(error).context("Backtest failed");
        }
    };

    println!(
        "\n{} on {} ({} bars, {} positions still open)",
        args.strategy,
        symbol,
        engine.bars_processed(),
        engine.account().positions().len()
    );
    println!("{}", summary_table(&report));
    if !engine.get_results().is_empty() {
        println!("{}", trades_table(engine.get_results()));
    }

    if let Some(path) = &args.report {
        let document = serde_json::json!({
            "strategy": args.strategy,
            "symbol": symbol,
            "report": report,
            "trades": engine.get_results(),
            "equity_curve": engine.equity_curve(),
        });
        std::fs::write(path, serde_json::to_string_pretty(&document)?)
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
        tracing::info!(path = %path.display(), "Report written");
    }

    Ok(())
}

fn summary_table(report: &PerformanceReport) -> Table {
    let optional = |value: Option<rust_decimal::Decimal>| {
        value.map_or_else(|| "n/a".to_string(), |v| format!("{v:.2}"))
    };

    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec!["Metric", "Value"]);
    let rows = [
        ("Net profit", format!("{:.2}", report.total_net_profit)),
        ("Total return %", format!("{:.2}", report.total_return_pct)),
        ("Trades", report.total_trades.to_string()),
        ("Win rate", format!("{:.2}%", report.win_rate * rust_decimal::Decimal::ONE_HUNDRED)),
        ("Profit factor", report.profit_factor.to_string()),
        ("Expectancy", format!("{:.2}", report.expectancy)),
        ("Payoff ratio", optional(report.payoff_ratio)),
        ("Max drawdown", format!("{:.2}%", report.max_drawdown * rust_decimal::Decimal::ONE_HUNDRED)),
        ("Sharpe ratio", format!("{:.2}", report.sharpe_ratio)),
        ("Calmar ratio", optional(report.calmar_ratio)),
        ("Largest win", format!("{:.2}", report.largest_win)),
        ("Largest loss", format!("{:.2}", report.largest_loss)),
        (
            "Max consecutive wins / losses",
            format!("{} / {}", report.max_consecutive_wins, report.max_consecutive_losses),
        ),
        (
            "Average holding period",
            format!("{}s", report.average_holding_period.as_secs()),
        ),
    ];
    for (name, value) in rows {
        table.add_row(vec![name.to_string(), value]);
    }
    table
}

fn trades_table(trades: &[Trade]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header(vec!["Side", "Entry", "Exit", "Size", "Entry price", "Exit price", "PnL", "Pattern"]);
    for trade in trades {
        table.add_row(vec![
            trade.side.to_string(),
            trade.entry_time.format("%Y-%m-%d %H:%M").to_string(),
            trade.exit_time.format("%Y-%m-%d %H:%M").to_string(),
            trade.size.to_string(),
            trade.entry_price.to_string(),
            trade.exit_price.to_string(),
            format!("{:.2}", trade.pnl),
            trade.pattern.clone().unwrap_or_default(),
        ]);
    }
    table
}

// ==============================================================================
// Scan Command Logic
// ==============================================================================

fn handle_scan(args: ScanArgs, config: &Config) -> anyhow::Result<()> {
    let series = args.data.load(config)?;
    let orchestrator = PatternOrchestrator::new(config.patterns.clone())?;
    let scans = scan_windows(
        &orchestrator,
        series.candles(),
        args.window,
        args.step,
        args.min_confidence,
    )?;

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header(vec!["Pattern", "Direction", "Confidence", "Start", "End", "Seen at"]);

    // Overlapping windows report the same formation repeatedly; keep its first sighting.
    let mut seen = HashSet::new();
    for scan in &scans {
        for pattern in &scan.patterns {
            if !seen.insert((pattern.kind, pattern.start_index, pattern.end_index)) {
                continue;
            }
            let seen_at = series
                .get(scan.end_index)
                .map(|c: &Candle| c.timestamp.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_default();
            table.add_row(vec![
                pattern.kind.to_string(),
                pattern.direction.to_string(),
                format!("{:.2}", pattern.confidence),
                pattern.start_time.format("%Y-%m-%d %H:%M").to_string(),
                pattern.end_time.format("%Y-%m-%d %H:%M").to_string(),
                seen_at,
            ]);
        }
    }

    println!("{} distinct patterns in {} windows", seen.len(), scans.len());
    if !seen.is_empty() {
        println!("{table}");
    }
    Ok(())
}

fn list_strategies() {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec!["Id", "Entry rule"]);
    for id in StrategyId::ALL {
        let rule = match id {
            StrategyId::Patterns => "Fresh chart patterns from the orchestrator",
            StrategyId::EmaTrend => "EMA 21/55/80/100 alignment with slope agreement",
            StrategyId::Rsi => "RSI beyond the oversold/overbought levels",
            StrategyId::Macd => "MACD/signal crossover with a histogram floor",
            StrategyId::Obv => "OBV/price divergence confirmed by volume",
            StrategyId::Volatility => "Bollinger breakouts and squeeze fades",
            StrategyId::TrendAnalysis => "EMA 20/50/200 trend classification",
            StrategyId::DoubleBottomRsi => "Double bottom with bullish RSI divergence",
        };
        table.add_row(vec![id.to_string(), rule.to_string()]);
    }
    println!("{table}");
}
