use std::sync::Arc;

use configuration::Config;
use core_types::StrategyId;
use events::LogSink;

use crate::double_bottom_rsi::DoubleBottomRsi;
use crate::ema_trend::EmaTrend;
use crate::error::StrategyError;
use crate::macd::MacdStrategy;
use crate::obv::ObvStrategy;
use crate::pattern_strategy::PatternStrategy;
use crate::rsi::RsiStrategy;
use crate::trend_analysis::TrendAnalysis;
use crate::volatility::VolatilityStrategy;
use crate::Strategy;

/// Creates a strategy instance from its ID and the loaded configuration.
///
/// Parameters are validated on construction, so a bad section of the config
/// surfaces here as `StrategyError::InvalidParameters`.
pub fn create_strategy(
    id: StrategyId,
    config: &Config,
    log: Arc<dyn LogSink>,
) -> Result<Box<dyn Strategy>, StrategyError> {
    // The match is exhaustive: a new StrategyId without an arm fails to compile.
    let strategies = &config.strategies;
    let strategy: Box<dyn Strategy> = match id {
        StrategyId::Patterns => Box::new(PatternStrategy::new(
            strategies.patterns.clone(),
            config.patterns.clone(),
            log,
        )?),
        StrategyId::EmaTrend => Box::new(EmaTrend::new(strategies.ema_trend.clone(), log)?),
        StrategyId::Rsi => Box::new(RsiStrategy::new(strategies.rsi.clone(), log)?),
        StrategyId::Macd => Box::new(MacdStrategy::new(strategies.macd.clone(), log)?),
        StrategyId::Obv => Box::new(ObvStrategy::new(strategies.obv.clone(), log)?),
        StrategyId::Volatility => {
            Box::new(VolatilityStrategy::new(strategies.volatility.clone(), log)?)
        }
        StrategyId::TrendAnalysis => {
            Box::new(TrendAnalysis::new(strategies.trend_analysis.clone(), log)?)
        }
        StrategyId::DoubleBottomRsi => Box::new(DoubleBottomRsi::new(
            strategies.double_bottom_rsi.clone(),
            strategies.trend_analysis.clone(),
            log,
        )?),
    };
    tracing::debug!(strategy = %id, "Strategy constructed");
    Ok(strategy)
}

#[cfg(test)]
mod tests {
    use super::*;
    use events::MemorySink;

    #[test]
    fn every_id_builds_from_defaults() {
        let config = Config::default();
        for id in StrategyId::ALL {
            let strategy = create_strategy(id, &config, Arc::new(MemorySink::new())).unwrap();
            assert_eq!(strategy.id(), id);
        }
    }

    #[test]
    fn invalid_section_is_reported() {
        let mut config = Config::default();
        config.strategies.rsi.period = 0;
        assert!(matches!(
            create_strategy(StrategyId::Rsi, &config, Arc::new(MemorySink::new())),
            Err(StrategyError::InvalidParameters(_))
        ));
    }
}
