use std::path::PathBuf;

use core_types::PatternKind;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;

use crate::error::ConfigError;

/// The root configuration structure for the entire application.
///
/// Every section falls back to its defaults, so an empty `config.toml` is a
/// valid configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub backtest: Backtest,
    pub risk_management: RiskManagement,
    pub patterns: PatternParams,
    pub strategies: Strategies,
    pub logging: Logging,
}

impl Config {
    /// Checks every section, returning the first violation found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.backtest.validate()?;
        self.risk_management.validate()?;
        self.patterns.validate()?;
        self.strategies.validate()?;
        // Extrema never land within `extremum_order` bars of the window end, so
        // a shorter age limit would reject every pattern.
        if self.strategies.patterns.max_pattern_age < self.patterns.extremum_order {
            return invalid(&format!(
                "strategies.patterns.max_pattern_age ({}) must be at least patterns.extremum_order ({})",
                self.strategies.patterns.max_pattern_age, self.patterns.extremum_order
            ));
        }
        Ok(())
    }
}

/// How per-trade or per-bar returns feed the Sharpe ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SharpeBasis {
    #[default]
    PerTrade,
    PerPeriod,
}

/// Contains parameters for a single backtest run.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Backtest {
    /// The symbol used when reading from a data source (e.g., "BTCUSDT").
    pub symbol: String,
    /// The timeframe interval (e.g., "1h").
    pub interval: String,
    /// The starting cash balance of the account.
    pub initial_balance: Decimal,
    /// Force-close every open position at the last close when the run completes.
    pub liquidate_on_finish: bool,
    /// Multiplier applied (as its square root) to the raw Sharpe ratio. 252 for daily bars.
    pub annualization_factor: f64,
    pub sharpe_basis: SharpeBasis,
}

impl Default for Backtest {
    fn default() -> Self {
        Self {
            symbol: "BTCUSDT".to_string(),
            interval: "1h".to_string(),
            initial_balance: dec!(10000),
            liquidate_on_finish: false,
            annualization_factor: 252.0,
            sharpe_basis: SharpeBasis::PerTrade,
        }
    }
}

impl Backtest {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.initial_balance <= Decimal::ZERO {
            return invalid("backtest.initial_balance must be positive");
        }
        if !(self.annualization_factor > 0.0) {
            return invalid("backtest.annualization_factor must be positive");
        }
        Ok(())
    }
}

/// Contains parameters for trade-level risk management.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RiskManagement {
    /// The fraction of total equity a single position may commit (e.g., 0.02 for 2%).
    pub risk_per_trade_pct: Decimal,
    /// Maximum number of simultaneously open positions.
    pub max_positions: usize,
    /// Signals are rejected once equity falls below this floor.
    pub min_equity: Decimal,
    /// Signals below this confidence are rejected.
    pub min_confidence: f64,
    /// Sized orders below this many units are dropped, never rounded up.
    pub min_position_size: Decimal,
    /// Distance from entry to the default stop-loss when a signal carries none.
    pub stop_loss_pct: Decimal,
    /// Reward-to-risk multiple used for the default take-profit.
    pub risk_reward: Decimal,
}

impl Default for RiskManagement {
    fn default() -> Self {
        Self {
            risk_per_trade_pct: dec!(0.02),
            max_positions: 1,
            min_equity: dec!(1000),
            min_confidence: 0.5,
            min_position_size: dec!(0.01),
            stop_loss_pct: dec!(0.02),
            risk_reward: dec!(2.0),
        }
    }
}

impl RiskManagement {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.risk_per_trade_pct <= Decimal::ZERO || self.risk_per_trade_pct > Decimal::ONE {
            return invalid("risk_management.risk_per_trade_pct must be in (0, 1]");
        }
        if self.max_positions == 0 {
            return invalid("risk_management.max_positions must be greater than zero");
        }
        if self.min_equity < Decimal::ZERO {
            return invalid("risk_management.min_equity cannot be negative");
        }
        check_unit("risk_management.min_confidence", self.min_confidence)?;
        if self.min_position_size <= Decimal::ZERO {
            return invalid("risk_management.min_position_size must be positive");
        }
        if self.stop_loss_pct <= Decimal::ZERO || self.stop_loss_pct >= Decimal::ONE {
            return invalid("risk_management.stop_loss_pct must be in (0, 1)");
        }
        if self.risk_reward <= Decimal::ZERO {
            return invalid("risk_management.risk_reward must be positive");
        }
        Ok(())
    }
}

/// Thresholds shared by the extremum finder and every pattern detector.
///
/// The slope thresholds are empirically tuned and are kept overridable. Slopes
/// are measured as relative price change per window length (price divided by
/// the window's mean close, index divided by the window length).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PatternParams {
    /// Which detectors the orchestrator runs.
    pub enabled: Vec<PatternKind>,
    /// Half-width of the neighbourhood an extremum must dominate.
    pub extremum_order: usize,
    /// Minimum relative height of a peak (or depth of a trough) above its surroundings.
    pub min_relative_change: f64,
    /// Windows shorter than this never produce a pattern.
    pub min_points: usize,

    /// Maximum relative price difference between the two shoulders.
    pub shoulder_tolerance: f64,
    /// Maximum relative deviation of each level point from the level's mean.
    pub level_tolerance: f64,
    /// Minimum number of bars between the two tops (or bottoms).
    pub min_separation: usize,
    /// Relative depth that earns a full depth score.
    pub depth_reference: f64,

    /// A trend line whose normalized slope magnitude is below this counts as flat.
    pub flat_slope_threshold: f64,
    /// A trend line must move by more than this to count as rising or falling.
    pub trend_slope_threshold: f64,
    /// Minimum ratio between the smaller and larger slope magnitude of a symmetrical triangle.
    pub symmetry_ratio: f64,
    /// Normalized slope that earns a full trend-strength score.
    pub trend_reference: f64,
    /// Relative pattern height that earns a full height score for triangles.
    pub height_reference: f64,

    /// Minimum relative move of a flag pole.
    pub min_pole_move: f64,
    /// How many bars after the pole the consolidation may extend.
    pub max_flag_bars: usize,
    /// Relative per-point slope at which a flag is considered fully loose.
    pub flag_slope_reference: f64,

    /// Difference between the two wedge slopes that earns a full convergence score.
    pub wedge_convergence_reference: f64,
    /// Relative wedge height that earns a full height score.
    pub wedge_height_reference: f64,
}

impl Default for PatternParams {
    fn default() -> Self {
        Self {
            enabled: PatternKind::ALL.to_vec(),
            extremum_order: 5,
            min_relative_change: 0.015,
            min_points: 5,
            shoulder_tolerance: 0.10,
            level_tolerance: 0.01,
            min_separation: 3,
            depth_reference: 0.05,
            flat_slope_threshold: 0.01,
            trend_slope_threshold: 0.005,
            symmetry_ratio: 0.6,
            trend_reference: 0.05,
            height_reference: 0.05,
            min_pole_move: 0.02,
            max_flag_bars: 20,
            flag_slope_reference: 0.01,
            wedge_convergence_reference: 0.05,
            wedge_height_reference: 0.08,
        }
    }
}

impl PatternParams {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.extremum_order == 0 {
            return invalid("patterns.extremum_order must be at least 1");
        }
        if self.min_relative_change < 0.0 {
            return invalid("patterns.min_relative_change cannot be negative");
        }
        if self.max_flag_bars < 2 {
            return invalid("patterns.max_flag_bars must be at least 2");
        }
        for (name, value) in [
            ("shoulder_tolerance", self.shoulder_tolerance),
            ("level_tolerance", self.level_tolerance),
            ("symmetry_ratio", self.symmetry_ratio),
        ] {
            check_unit(&format!("patterns.{name}"), value)?;
        }
        for (name, value) in [
            ("depth_reference", self.depth_reference),
            ("flat_slope_threshold", self.flat_slope_threshold),
            ("trend_slope_threshold", self.trend_slope_threshold),
            ("trend_reference", self.trend_reference),
            ("height_reference", self.height_reference),
            ("min_pole_move", self.min_pole_move),
            ("flag_slope_reference", self.flag_slope_reference),
            ("wedge_convergence_reference", self.wedge_convergence_reference),
            ("wedge_height_reference", self.wedge_height_reference),
        ] {
            if !(value > 0.0) {
                return invalid(&format!("patterns.{name} must be positive"));
            }
        }
        Ok(())
    }
}

/// Contains the parameter sets for all available strategies.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Strategies {
    pub patterns: PatternStrategyParams,
    pub ema_trend: EmaTrendParams,
    pub rsi: RsiParams,
    pub macd: MacdParams,
    pub obv: ObvParams,
    pub volatility: VolatilityParams,
    pub trend_analysis: TrendAnalysisParams,
    pub double_bottom_rsi: DoubleBottomRsiParams,
}

impl Strategies {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.patterns.validate()?;
        self.ema_trend.validate()?;
        self.rsi.validate()?;
        self.macd.validate()?;
        self.obv.validate()?;
        self.volatility.validate()?;
        self.trend_analysis.validate()?;
        self.double_bottom_rsi.validate()?;
        Ok(())
    }
}

/// Parameters for the orchestrated chart-pattern strategy.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PatternStrategyParams {
    /// Number of trailing bars handed to the detectors.
    pub lookback: usize,
    pub min_confidence: f64,
    /// Patterns that ended more than this many bars ago no longer trigger entries.
    pub max_pattern_age: usize,
    pub risk_reward: f64,
    /// Fallback stop distance when the geometric stop lands on the wrong side of entry.
    pub stop_loss_pct: f64,
}

impl Default for PatternStrategyParams {
    fn default() -> Self {
        Self {
            lookback: 100,
            min_confidence: 0.7,
            max_pattern_age: 5,
            risk_reward: 2.0,
            stop_loss_pct: 0.02,
        }
    }
}

impl PatternStrategyParams {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_period("strategies.patterns.lookback", self.lookback)?;
        check_unit("strategies.patterns.min_confidence", self.min_confidence)?;
        check_positive("strategies.patterns.risk_reward", self.risk_reward)?;
        check_fraction("strategies.patterns.stop_loss_pct", self.stop_loss_pct)
    }
}

/// Parameters for the four-EMA trend strategy.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EmaTrendParams {
    pub fast_period: usize,
    pub medium_period: usize,
    pub slow_period: usize,
    pub baseline_period: usize,
    /// Bars used for the EMA slope regressions.
    pub slope_window: usize,
    /// Bars used for the rolling percentile of the EMA spread.
    pub percentile_window: usize,
    pub lower_quantile: f64,
    pub upper_quantile: f64,
    pub threshold: f64,
    /// The long stop sits this far below the baseline EMA (mirrored for shorts).
    pub baseline_buffer: f64,
}

impl Default for EmaTrendParams {
    fn default() -> Self {
        Self {
            fast_period: 21,
            medium_period: 55,
            slow_period: 80,
            baseline_period: 100,
            slope_window: 10,
            percentile_window: 100,
            lower_quantile: 0.10,
            upper_quantile: 0.90,
            threshold: 0.5,
            baseline_buffer: 0.02,
        }
    }
}

impl EmaTrendParams {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_period("strategies.ema_trend.fast_period", self.fast_period)?;
        check_period("strategies.ema_trend.slope_window", self.slope_window)?;
        check_period("strategies.ema_trend.percentile_window", self.percentile_window)?;
        if !(self.fast_period < self.medium_period
            && self.medium_period < self.slow_period
            && self.slow_period < self.baseline_period)
        {
            return invalid("strategies.ema_trend periods must be strictly increasing");
        }
        check_unit("strategies.ema_trend.lower_quantile", self.lower_quantile)?;
        check_unit("strategies.ema_trend.upper_quantile", self.upper_quantile)?;
        if self.lower_quantile >= self.upper_quantile {
            return invalid("strategies.ema_trend.lower_quantile must be below upper_quantile");
        }
        check_unit("strategies.ema_trend.threshold", self.threshold)?;
        check_fraction("strategies.ema_trend.baseline_buffer", self.baseline_buffer)
    }
}

/// Parameters for the RSI threshold strategy.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RsiParams {
    pub period: usize,
    pub overbought: f64,
    pub oversold: f64,
    pub threshold: f64,
    pub stop_loss_pct: f64,
    pub risk_reward: f64,
}

impl Default for RsiParams {
    fn default() -> Self {
        Self {
            period: 14,
            overbought: 70.0,
            oversold: 30.0,
            threshold: 0.5,
            stop_loss_pct: 0.02,
            risk_reward: 2.0,
        }
    }
}

impl RsiParams {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_period("strategies.rsi.period", self.period)?;
        if !(0.0 < self.oversold && self.oversold < self.overbought && self.overbought < 100.0) {
            return invalid("strategies.rsi requires 0 < oversold < overbought < 100");
        }
        check_unit("strategies.rsi.threshold", self.threshold)?;
        check_fraction("strategies.rsi.stop_loss_pct", self.stop_loss_pct)?;
        check_positive("strategies.rsi.risk_reward", self.risk_reward)
    }
}

/// Parameters for the MACD crossover strategy.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MacdParams {
    pub fast_period: usize,
    pub slow_period: usize,
    pub signal_period: usize,
    /// Crossovers whose histogram magnitude is below this are ignored.
    pub min_histogram: f64,
    pub threshold: f64,
    pub stop_loss_pct: f64,
    pub risk_reward: f64,
}

impl Default for MacdParams {
    fn default() -> Self {
        Self {
            fast_period: 12,
            slow_period: 26,
            signal_period: 9,
            min_histogram: 0.0,
            threshold: 0.6,
            stop_loss_pct: 0.02,
            risk_reward: 2.0,
        }
    }
}

impl MacdParams {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_period("strategies.macd.fast_period", self.fast_period)?;
        check_period("strategies.macd.signal_period", self.signal_period)?;
        if self.fast_period >= self.slow_period {
            return invalid("strategies.macd.fast_period must be less than slow_period");
        }
        if self.min_histogram < 0.0 {
            return invalid("strategies.macd.min_histogram cannot be negative");
        }
        check_unit("strategies.macd.threshold", self.threshold)?;
        check_fraction("strategies.macd.stop_loss_pct", self.stop_loss_pct)?;
        check_positive("strategies.macd.risk_reward", self.risk_reward)
    }
}

/// Parameters for the on-balance-volume divergence strategy.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ObvParams {
    pub ma_period: usize,
    pub obv_ma_period: usize,
    pub slope_period: usize,
    /// Slopes closer than this are not considered divergent.
    pub divergence_threshold: f64,
    /// Volume ratio (to its average) that counts as high volume.
    pub volume_threshold: f64,
    /// Bars inspected by the volume analysis.
    pub volume_lookback: usize,
    pub threshold: f64,
    pub stop_loss_pct: f64,
    pub risk_reward: f64,
}

impl Default for ObvParams {
    fn default() -> Self {
        Self {
            ma_period: 20,
            obv_ma_period: 20,
            slope_period: 5,
            divergence_threshold: 0.1,
            volume_threshold: 1.5,
            volume_lookback: 10,
            threshold: 0.6,
            stop_loss_pct: 0.02,
            risk_reward: 2.0,
        }
    }
}

impl ObvParams {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_period("strategies.obv.ma_period", self.ma_period)?;
        check_period("strategies.obv.obv_ma_period", self.obv_ma_period)?;
        if self.slope_period < 2 {
            return invalid("strategies.obv.slope_period must be at least 2");
        }
        check_period("strategies.obv.volume_lookback", self.volume_lookback)?;
        if self.divergence_threshold < 0.0 {
            return invalid("strategies.obv.divergence_threshold cannot be negative");
        }
        check_positive("strategies.obv.volume_threshold", self.volume_threshold)?;
        check_unit("strategies.obv.threshold", self.threshold)?;
        check_fraction("strategies.obv.stop_loss_pct", self.stop_loss_pct)?;
        check_positive("strategies.obv.risk_reward", self.risk_reward)
    }
}

/// Parameters for the volatility breakout / mean-reversion strategy.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct VolatilityParams {
    pub atr_period: usize,
    pub bb_period: usize,
    pub bb_std_dev: f64,
    /// Bars in the short volatility sample; the long sample is three times longer.
    pub vol_lookback: usize,
    /// Volatility ratio above which the market counts as high-volatility.
    pub vol_threshold: f64,
    /// Range ratio above which a breakout bar counts as wide.
    pub range_threshold: f64,
    /// Band-width ratio below which the bands count as squeezed.
    pub squeeze_threshold: f64,
    /// Volatility ratio below which open positions are closed.
    pub exit_vol_ratio: f64,
    pub threshold: f64,
    pub stop_loss_pct: f64,
    pub risk_reward: f64,
}

impl Default for VolatilityParams {
    fn default() -> Self {
        Self {
            atr_period: 14,
            bb_period: 20,
            bb_std_dev: 2.0,
            vol_lookback: 20,
            vol_threshold: 1.5,
            range_threshold: 0.8,
            squeeze_threshold: 0.8,
            exit_vol_ratio: 0.7,
            threshold: 0.6,
            stop_loss_pct: 0.02,
            risk_reward: 2.0,
        }
    }
}

impl VolatilityParams {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_period("strategies.volatility.atr_period", self.atr_period)?;
        check_period("strategies.volatility.bb_period", self.bb_period)?;
        if self.vol_lookback < 2 {
            return invalid("strategies.volatility.vol_lookback must be at least 2");
        }
        check_positive("strategies.volatility.bb_std_dev", self.bb_std_dev)?;
        check_positive("strategies.volatility.vol_threshold", self.vol_threshold)?;
        check_positive("strategies.volatility.range_threshold", self.range_threshold)?;
        check_positive("strategies.volatility.squeeze_threshold", self.squeeze_threshold)?;
        check_positive("strategies.volatility.exit_vol_ratio", self.exit_vol_ratio)?;
        check_unit("strategies.volatility.threshold", self.threshold)?;
        check_fraction("strategies.volatility.stop_loss_pct", self.stop_loss_pct)?;
        check_positive("strategies.volatility.risk_reward", self.risk_reward)
    }
}

/// Parameters for the multi-EMA trend classification strategy.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TrendAnalysisParams {
    /// Fast, medium and slow EMA periods, in that order.
    pub ema_periods: [usize; 3],
    pub slope_period: usize,
    /// Bars used to measure momentum.
    pub lookback: usize,
    /// Momentum above this marks the market as trending.
    pub momentum_threshold: f64,
    pub threshold: f64,
    pub stop_loss_pct: f64,
    pub risk_reward: f64,
}

impl Default for TrendAnalysisParams {
    fn default() -> Self {
        Self {
            ema_periods: [20, 50, 200],
            slope_period: 5,
            lookback: 20,
            momentum_threshold: 0.05,
            threshold: 0.6,
            stop_loss_pct: 0.02,
            risk_reward: 2.0,
        }
    }
}

impl TrendAnalysisParams {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let [fast, medium, slow] = self.ema_periods;
        check_period("strategies.trend_analysis.ema_periods", fast)?;
        if !(fast < medium && medium < slow) {
            return invalid("strategies.trend_analysis.ema_periods must be strictly increasing");
        }
        if self.slope_period < 2 {
            return invalid("strategies.trend_analysis.slope_period must be at least 2");
        }
        check_period("strategies.trend_analysis.lookback", self.lookback)?;
        check_positive(
            "strategies.trend_analysis.momentum_threshold",
            self.momentum_threshold,
        )?;
        check_unit("strategies.trend_analysis.threshold", self.threshold)?;
        check_fraction("strategies.trend_analysis.stop_loss_pct", self.stop_loss_pct)?;
        check_positive("strategies.trend_analysis.risk_reward", self.risk_reward)
    }
}

/// Parameters for the double-bottom with RSI divergence strategy.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DoubleBottomRsiParams {
    pub rsi_period: usize,
    /// Both bottoms must print an RSI inside this band.
    pub rsi_floor: f64,
    pub rsi_ceiling: f64,
    pub min_separation: usize,
    /// Trailing bars searched for the two bottoms.
    pub pattern_lookback: usize,
    /// Maximum relative price difference between the bottoms.
    pub price_tolerance: f64,
    /// Minimum second-bottom volume as a fraction of the first.
    pub volume_ratio: f64,
    /// Breakout volume above this multiple of the average keeps full strength.
    pub breakout_volume_ratio: f64,
    pub threshold: f64,
    pub stop_loss_pct: f64,
    pub risk_reward: f64,
    pub downtrend_stop_loss_pct: f64,
    pub downtrend_risk_reward: f64,
    /// When set, replaces `risk_reward` and derives the downtrend value from
    /// `downtrend_rr_multiplier`.
    pub risk_reward_override: Option<f64>,
    pub downtrend_rr_multiplier: f64,
}

impl Default for DoubleBottomRsiParams {
    fn default() -> Self {
        Self {
            rsi_period: 14,
            rsi_floor: 25.0,
            rsi_ceiling: 50.0,
            min_separation: 3,
            pattern_lookback: 30,
            price_tolerance: 0.08,
            volume_ratio: 0.6,
            breakout_volume_ratio: 1.2,
            threshold: 0.1,
            stop_loss_pct: 0.02,
            risk_reward: 1.5,
            downtrend_stop_loss_pct: 0.03,
            downtrend_risk_reward: 6.0,
            risk_reward_override: None,
            downtrend_rr_multiplier: 4.0,
        }
    }
}

impl DoubleBottomRsiParams {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_period("strategies.double_bottom_rsi.rsi_period", self.rsi_period)?;
        if !(0.0 <= self.rsi_floor && self.rsi_floor < self.rsi_ceiling && self.rsi_ceiling <= 100.0)
        {
            return invalid("strategies.double_bottom_rsi requires 0 <= rsi_floor < rsi_ceiling <= 100");
        }
        check_period(
            "strategies.double_bottom_rsi.min_separation",
            self.min_separation,
        )?;
        if self.pattern_lookback <= self.min_separation {
            return invalid("strategies.double_bottom_rsi.pattern_lookback must exceed min_separation");
        }
        check_unit("strategies.double_bottom_rsi.price_tolerance", self.price_tolerance)?;
        check_positive("strategies.double_bottom_rsi.volume_ratio", self.volume_ratio)?;
        check_positive(
            "strategies.double_bottom_rsi.breakout_volume_ratio",
            self.breakout_volume_ratio,
        )?;
        check_unit("strategies.double_bottom_rsi.threshold", self.threshold)?;
        check_fraction("strategies.double_bottom_rsi.stop_loss_pct", self.stop_loss_pct)?;
        check_fraction(
            "strategies.double_bottom_rsi.downtrend_stop_loss_pct",
            self.downtrend_stop_loss_pct,
        )?;
        check_positive("strategies.double_bottom_rsi.risk_reward", self.risk_reward)?;
        check_positive(
            "strategies.double_bottom_rsi.downtrend_risk_reward",
            self.downtrend_risk_reward,
        )?;
        check_positive(
            "strategies.double_bottom_rsi.downtrend_rr_multiplier",
            self.downtrend_rr_multiplier,
        )?;
        if let Some(rr) = self.risk_reward_override {
            check_positive("strategies.double_bottom_rsi.risk_reward_override", rr)?;
        }
        Ok(())
    }

    /// Risk-reward for a normal market and for a downtrend, in that order.
    pub fn effective_risk_reward(&self) -> (f64, f64) {
        match self.risk_reward_override {
            Some(rr) => (rr, rr * self.downtrend_rr_multiplier),
            None => (self.risk_reward, self.downtrend_risk_reward),
        }
    }
}

/// Where and how verbosely the binary logs.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Logging {
    /// An `EnvFilter` directive such as "info" or "backtester=debug". `RUST_LOG` wins when set.
    pub level: String,
    /// When set, logs are also written to a daily-rolling file in this directory.
    pub directory: Option<PathBuf>,
    pub file_prefix: String,
    pub ansi: bool,
}

impl Default for Logging {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            directory: None,
            file_prefix: "chartist.log".to_string(),
            ansi: true,
        }
    }
}

fn invalid(message: &str) -> Result<(), ConfigError> {
    Err(ConfigError::ValidationError(message.to_string()))
}

fn check_period(name: &str, value: usize) -> Result<(), ConfigError> {
    if value == 0 {
        return invalid(&format!("{name} must be greater than zero"));
    }
    Ok(())
}

fn check_unit(name: &str, value: f64) -> Result<(), ConfigError> {
    if !(0.0..=1.0).contains(&value) {
        return invalid(&format!("{name} must be within [0, 1], got {value}"));
    }
    Ok(())
}

fn check_fraction(name: &str, value: f64) -> Result<(), ConfigError> {
    if !(value > 0.0 && value < 1.0) {
        return invalid(&format!("{name} must be within (0, 1), got {value}"));
    }
    Ok(())
}

fn check_positive(name: &str, value: f64) -> Result<(), ConfigError> {
    if !(value > 0.0) {
        return invalid(&format!("{name} must be positive, got {value}"));
    }
    Ok(())
}
