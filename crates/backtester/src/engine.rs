use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use analytics::{AnalyticsEngine, PerformanceReport};
use chrono::{DateTime, Utc};
use configuration::Backtest;
use core_types::{Candle, Order, Series, Signal, Trade, to_decimal};
use events::{LogSink, NoopReporter, ProgressReporter, ProgressUpdate};
use executor::{Account, ExecutorError};
use patterns::PatternInstance;
use risk::RiskManager;
use rust_decimal::Decimal;
use strategies::Strategy;

use crate::error::BacktestError;

const SOURCE: &str = "engine";

/// Lifecycle of a `Backtester`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Running,
    Completed,
    /// A bar failed. Trades closed before it remain available.
    Failed,
}

/// Everything that happened on one bar.
#[derive(Debug, Clone, PartialEq)]
pub struct StepResult {
    pub index: usize,
    pub timestamp: DateTime<Utc>,
    pub signals: Vec<Signal>,
    pub patterns: Vec<PatternInstance>,
    /// Trades closed on this bar, by exits and by reversals.
    pub closed_trades: Vec<Trade>,
    pub equity: Decimal,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    Bar(StepResult),
    Done,
}

/// The bar-by-bar backtesting engine.
///
/// The caller drives the run with `step()` or lets `run()` drain it. At bar
/// `i` the strategy only ever sees `candles[..=i]`.
pub struct Backtester {
    // --- Context ---
    symbol: String,
    series: Series,
    liquidate_on_finish: bool,
    // --- Components ---
    account: Account,
    strategy: Box<dyn Strategy>,
    risk_manager: Box<dyn RiskManager>,
    analytics_engine: AnalyticsEngine,
    log: Arc<dyn LogSink>,
    progress: Arc<dyn ProgressReporter>,
    stop: Arc<AtomicBool>,
    // --- Run state ---
    state: RunState,
    cursor: usize,
    equity_curve: Vec<(DateTime<Utc>, Decimal)>,
}

impl Backtester {
    /// Validates `candles` and builds an idle engine.
    ///
    /// Malformed market data is rejected here with `BacktestError::Data`,
    /// before a single bar is processed.
    pub fn new(
        symbol: impl Into<String>,
        settings: &Backtest,
        candles: Vec<Candle>,
        strategy: Box<dyn Strategy>,
        risk_manager: Box<dyn RiskManager>,
        log: Arc<dyn LogSink>,
    ) -> Result<Self, BacktestError> {
        let series = Series::new(candles)?;
        Ok(Self {
            symbol: symbol.into(),
            series,
            liquidate_on_finish: settings.liquidate_on_finish,
            account: Account::new(settings.initial_balance),
            strategy,
            risk_manager,
            analytics_engine: AnalyticsEngine::new(
                settings.annualization_factor,
                settings.sharpe_basis,
            ),
            log,
            progress: Arc::new(NoopReporter),
            stop: Arc::new(AtomicBool::new(false)),
            state: RunState::Idle,
            cursor: 0,
            equity_curve: Vec::new(),
        })
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressReporter>) -> Self {
        self.progress = progress;
        self
    }

    /// Shares `stop` with the caller. Setting it ends the run before the next bar.
    pub fn with_stop_flag(mut self, stop: Arc<AtomicBool>) -> Self {
        self.stop = stop;
        self
    }

    pub fn with_liquidation(mut self, liquidate_on_finish: bool) -> Self {
        self.liquidate_on_finish = liquidate_on_finish;
        self
    }

    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn account(&self) -> &Account {
        &self.account
    }

    pub fn series(&self) -> &Series {
        &self.series
    }

    /// Number of bars processed so far.
    pub fn bars_processed(&self) -> usize {
        self.cursor
    }

    /// Per-bar `(timestamp, equity)` after each processed bar.
    pub fn equity_curve(&self) -> &[(DateTime<Utc>, Decimal)] {
        &self.equity_curve
    }

    /// Closed trades, including those closed before a failure.
    pub fn get_results(&self) -> &[Trade] {
        self.account.trades()
    }

    /// The performance report over the trades closed so far.
    pub fn get_metrics(&self) -> Result<PerformanceReport, BacktestError> {
        Ok(self.analytics_engine.calculate(
            self.account.trades(),
            &self.equity_curve,
            self.account.initial_balance(),
        )?)
    }

    /// Processes the next bar.
    ///
    /// Returns `Done` once every bar has been processed, the stop flag was
    /// raised or the run has already ended. A bar failure moves the engine to
    /// `Failed` and returns `BarFailed`; later calls return `Done`.
    pub fn step(&mut self) -> Result<StepOutcome, BacktestError> {
        match self.state {
            RunState::Completed | RunState::Failed => return Ok(StepOutcome::Done),
            RunState::Idle => {
                self.state = RunState::Running;
                self.log.info(
                    SOURCE,
                    &format!(
                        "Backtest started: {} strategy on {} ({} bars)",
                        self.strategy.id(),
                        self.symbol,
                        self.series.len()
                    ),
                );
            }
            RunState::Running => {}
        }

        if self.stop.load(Ordering::Relaxed) {
            self.log.warn(
                SOURCE,
                &format!("Backtest stopped on request after {} bars", self.cursor),
            );
            self.finish()?;
            return Ok(StepOutcome::Done);
        }

        let index = self.cursor;
        let Some(bar) = self.series.get(index).copied() else {
            self.finish()?;
            return Ok(StepOutcome::Done);
        };

        match self.process_bar(index, &bar) {
            Ok(result) => {
                self.cursor += 1;
                Ok(StepOutcome::Bar(result))
            }
            Err(error) => {
                self.state = RunState::Failed;
                self.progress.finish();
                self.log.error(
                    SOURCE,
                    &format!("Backtest failed at bar {index} ({}): {error}", bar.timestamp),
                );
                Err(BacktestError::BarFailed {
                    index,
                    timestamp: bar.timestamp,
                    source: Box::new(error),
                })
            }
        }
    }

    /// Drains the run and reports on it.
    ///
    /// On a completed engine this only recomputes the report; `reset()` first
    /// to run again.
    pub fn run(&mut self) -> Result<PerformanceReport, BacktestError> {
        while let StepOutcome::Bar(_) = self.step()? {}
        self.get_metrics()
    }

    /// Force-closes every open position at the close of the last processed bar.
    pub fn liquidate(&mut self) -> Result<Vec<Trade>, BacktestError> {
        let Some(bar) = self
            .cursor
            .checked_sub(1)
            .and_then(|last| self.series.get(last))
            .copied()
        else {
            return Ok(Vec::new());
        };
        let trades = self
            .account
            .close_all(to_decimal(bar.close)?, bar.timestamp);
        if !trades.is_empty() {
            self.log.info(
                SOURCE,
                &format!("Liquidated {} open positions at {}", trades.len(), bar.close),
            );
        }
        Ok(trades)
    }

    /// Back to `Idle` with a fresh account. The stop flag is lowered.
    pub fn reset(&mut self) {
        self.account.reset();
        self.cursor = 0;
        self.equity_curve.clear();
        self.stop.store(false, Ordering::Relaxed);
        self.state = RunState::Idle;
    }

    fn finish(&mut self) -> Result<(), BacktestError> {
        if self.liquidate_on_finish {
            self.liquidate()?;
        }
        self.state = RunState::Completed;
        self.progress.finish();
        self.log.info(
            SOURCE,
            &format!(
                "Backtest completed: {} trades, {} positions open, equity {}",
                self.account.trades().len(),
                self.account.positions().len(),
                self.account.equity()
            ),
        );
        Ok(())
    }

    fn process_bar(&mut self, index: usize, bar: &Candle) -> Result<StepResult, BacktestError> {
        let window = self.series.window(index);
        let price = to_decimal(bar.close)?;
        let trades_before = self.account.trades().len();

        // --- 1. EXITS ---
        let open: Vec<_> = self.account.positions().to_vec();
        for position in &open {
            if self.strategy.should_exit(window, index, position)? {
                let trade = self
                    .account
                    .close_position(position.position_id, price, bar.timestamp)?;
                tracing::debug!(index, pnl = %trade.pnl, "Position exited");
            }
        }
        self.account.mark_to_market(price, bar.timestamp);

        // --- 2. SIGNALS ---
        let analysis = self.strategy.analyze(window)?;

        // --- 3. RISK AND EXECUTION ---
        let fractions: Vec<f64> = analysis
            .signals
            .iter()
            .map(|signal| self.strategy.calculate_position_size(window, signal))
            .collect();
        for (signal, fraction) in analysis.signals.iter().zip(fractions) {
            self.handle_signal(signal, fraction)?;
        }

        // --- 4. RECORD EQUITY ---
        let equity = self.account.equity();
        self.equity_curve.push((bar.timestamp, equity));

        let total_bars = self.series.len();
        self.progress.report(&ProgressUpdate {
            percent: (index + 1) as f64 / total_bars as f64 * 100.0,
            timestamp: bar.timestamp,
            bar_index: index,
            total_bars,
            equity,
            trades: self.account.trades().len(),
            open_positions: self.account.positions().len(),
        });

        Ok(StepResult {
            index,
            timestamp: bar.timestamp,
            signals: analysis.signals,
            patterns: analysis.patterns,
            closed_trades: self.account.trades()[trades_before..].to_vec(),
            equity,
        })
    }

    /// Sizes and executes one signal; `fraction` is the strategy's share of
    /// equity. Risk rejections and per-order execution rejections are logged
    /// and skipped.
    fn handle_signal(&mut self, signal: &Signal, fraction: f64) -> Result<(), BacktestError> {
        let state = self.account.state(signal.timestamp);
        if !self.risk_manager.check_limits(&state, signal) {
            self.log.info(
                SOURCE,
                &format!(
                    "Signal rejected by risk limits: {} at {} (confidence {:.2})",
                    signal.side, signal.price, signal.confidence
                ),
            );
            return Ok(());
        }

        let entry = to_decimal(signal.price)?;
        let fraction = to_decimal(fraction)?;
        let equity = self.account.equity();
        if entry <= Decimal::ZERO {
            return Ok(());
        }
        let size = self
            .risk_manager
            .adjust_position_size(fraction * equity / entry, entry, equity);
        if size.is_zero() {
            self.log.info(
                SOURCE,
                &format!("Signal skipped: position size below minimum at {}", signal.price),
            );
            return Ok(());
        }

        let (stop_loss, take_profit) = match (signal.stop_loss, signal.take_profit) {
            (Some(stop_loss), Some(take_profit)) => (to_decimal(stop_loss)?, to_decimal(take_profit)?),
            _ => self.risk_manager.default_stops(signal.side, entry),
        };

        let order = Order {
            side: signal.side,
            size,
            price: entry,
            time: signal.timestamp,
            stop_loss,
            take_profit,
            confidence: signal.confidence,
            pattern: signal.pattern.clone(),
        };
        match self.account.execute_order(order) {
            Ok(position) => {
                self.log.info(
                    SOURCE,
                    &format!(
                        "Opened {} {} @ {} (sl {}, tp {})",
                        position.side, position.size, position.entry_price, stop_loss, take_profit
                    ),
                );
                Ok(())
            }
            Err(error @ (ExecutorError::InsufficientMargin { .. } | ExecutorError::InvalidOrder(_))) => {
                self.log.warn(SOURCE, &format!("Order rejected: {error}"));
                Ok(())
            }
            Err(error) => Err(error.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use core_types::{Position, Side, StrategyId};
    use events::{LogLevel, MemorySink};
    use risk::SimpleRiskManager;
    use rust_decimal_macros::dec;
    use strategies::StrategyError;

    /// Goes long on a chosen bar and exits on another.
    struct Scripted {
        entry_at: usize,
        exit_at: usize,
    }

    impl Strategy for Scripted {
        fn id(&self) -> StrategyId {
            StrategyId::Rsi
        }

        fn generate_signals(&self, window: &[Candle]) -> Result<Vec<Signal>, StrategyError> {
            let Some(bar) = window.last() else {
                return Ok(Vec::new());
            };
            if window.len() - 1 == self.entry_at {
                Ok(vec![Signal::new(bar.timestamp, Side::Long, bar.close, 0.9)])
            } else {
                Ok(Vec::new())
            }
        }

        fn should_exit(
            &self,
            _window: &[Candle],
            current_index: usize,
            _position: &Position,
        ) -> Result<bool, StrategyError> {
            Ok(current_index == self.exit_at)
        }

        fn calculate_position_size(&self, _window: &[Candle], _signal: &Signal) -> f64 {
            1.0
        }
    }

    fn candles(closes: &[f64]) -> Vec<Candle> {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        closes
            .iter()
            .enumerate()
            .map(|(i, &c)| Candle::new(start + Duration::hours(i as i64), c, c + 1.0, c - 1.0, c, 10.0))
            .collect()
    }

    fn backtester(closes: &[f64], entry_at: usize, exit_at: usize) -> (Backtester, Arc<MemorySink>) {
        let log = Arc::new(MemorySink::new());
        let settings = Backtest {
            initial_balance: dec!(1000),
            ..Backtest::default()
        };
        let risk = SimpleRiskManager::new(configuration::RiskManagement {
            risk_per_trade_pct: dec!(0.1),
            min_position_size: dec!(0.01),
            ..configuration::RiskManagement::default()
        })
        .unwrap();
        let engine = Backtester::new(
            "TEST",
            &settings,
            candles(closes),
            Box::new(Scripted { entry_at, exit_at }),
            Box::new(risk),
            log.clone(),
        )
        .unwrap();
        (engine, log)
    }

    #[test]
    fn step_walks_bars_then_reports_done() {
        let (mut engine, _) = backtester(&[100.0, 101.0, 102.0], 10, 10);
        assert_eq!(engine.state(), RunState::Idle);

        for expected in 0..3 {
            match engine.step().unwrap() {
                StepOutcome::Bar(result) => assert_eq!(result.index, expected),
                StepOutcome::Done => panic!("finished early"),
            }
            assert_eq!(engine.state(), RunState::Running);
        }
        assert_eq!(engine.step().unwrap(), StepOutcome::Done);
        assert_eq!(engine.state(), RunState::Completed);
        assert_eq!(engine.step().unwrap(), StepOutcome::Done);
        assert_eq!(engine.equity_curve().len(), 3);
    }

    #[test]
    fn entry_and_exit_realize_pnl() {
        // 10% of 1000 at 100 caps the size at 1 unit.
        let (mut engine, _) = backtester(&[100.0, 105.0, 110.0, 108.0], 0, 2);
        engine.run().unwrap();

        let trades = engine.get_results();
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].size, dec!(1));
        assert_eq!(trades[0].pnl, dec!(10));
        assert_eq!(engine.account().balance(), dec!(1010));
        assert!(engine.account().positions().is_empty());
    }

    #[test]
    fn open_positions_survive_completion_unless_liquidated() {
        let (mut engine, _) = backtester(&[100.0, 105.0, 110.0], 0, 99);
        engine.run().unwrap();
        assert_eq!(engine.account().positions().len(), 1);
        assert!(engine.get_results().is_empty());

        let trades = engine.liquidate().unwrap();
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].exit_price, dec!(110));

        let (engine, _) = backtester(&[100.0, 105.0, 110.0], 0, 99);
        let mut engine = engine.with_liquidation(true);
        engine.run().unwrap();
        assert!(engine.account().positions().is_empty());
        assert_eq!(engine.get_results().len(), 1);
    }

    #[test]
    fn reset_returns_to_idle_with_fresh_account() {
        let (mut engine, _) = backtester(&[100.0, 110.0, 120.0], 0, 1);
        engine.run().unwrap();
        assert_eq!(engine.get_results().len(), 1);

        engine.reset();
        assert_eq!(engine.state(), RunState::Idle);
        assert!(engine.get_results().is_empty());
        assert!(engine.equity_curve().is_empty());
        assert_eq!(engine.account().balance(), dec!(1000));

        engine.run().unwrap();
        assert_eq!(engine.get_results().len(), 1);
    }

    #[test]
    fn stop_flag_ends_run_early() {
        let (engine, log) = backtester(&[100.0, 101.0, 102.0, 103.0], 10, 10);
        let mut engine = engine;
        let stop = engine.stop_flag();

        assert!(matches!(engine.step().unwrap(), StepOutcome::Bar(_)));
        stop.store(true, Ordering::Relaxed);
        assert_eq!(engine.step().unwrap(), StepOutcome::Done);
        assert_eq!(engine.state(), RunState::Completed);
        assert_eq!(engine.bars_processed(), 1);
        assert!(log.contains(LogLevel::Warn, "stopped"));
    }
}
