use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};
use configuration::Config;
use core_types::{Candle, Position, Side, StrategyId, to_decimal};
use events::MemorySink;
use proptest::prelude::*;
use strategies::create_strategy;
use uuid::Uuid;

fn series(returns: &[f64], volumes: &[f64]) -> Vec<Candle> {
    let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let mut close = 100.0;
    returns
        .iter()
        .zip(volumes)
        .enumerate()
        .map(|(i, (r, v))| {
            let open = close;
            close *= 1.0 + r;
            let high = open.max(close) * 1.004;
            let low = open.min(close) * 0.996;
            Candle::new(start + Duration::hours(i as i64), open, high, low, close, *v)
        })
        .collect()
}

fn config() -> Config {
    let mut config = Config::default();
    config.strategies.trend_analysis.ema_periods = [10, 20, 40];
    config
}

fn position(side: Side, entry: f64) -> Position {
    let (stop, take) = match side {
        Side::Long => (entry * 0.5, entry * 2.0),
        Side::Short => (entry * 2.0, entry * 0.5),
    };
    Position {
        position_id: Uuid::new_v4(),
        side,
        size: to_decimal(1.0).unwrap(),
        entry_price: to_decimal(entry).unwrap(),
        entry_time: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        stop_loss: to_decimal(stop).unwrap(),
        take_profit: to_decimal(take).unwrap(),
        unrealized_pnl: to_decimal(0.0).unwrap(),
        pattern: None,
    }
}

fn market() -> impl Strategy<Value = (Vec<f64>, Vec<f64>)> {
    (80usize..140).prop_flat_map(|len| {
        (
            prop::collection::vec(-0.03f64..0.03, len),
            prop::collection::vec(200.0f64..5_000.0, len),
        )
    })
}

#[test]
fn factory_covers_every_strategy() {
    let config = Config::default();
    for id in StrategyId::ALL {
        let strategy = create_strategy(id, &config, Arc::new(MemorySink::new())).unwrap();
        assert_eq!(strategy.id(), id);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(12))]

    /// Decisions at bar `i` depend only on bars `0..=i`: rewriting every later
    /// bar changes neither the signals nor the exit decisions.
    #[test]
    fn decisions_ignore_future_bars(
        (returns, volumes) in market(),
        shock in -0.2f64..0.2,
    ) {
        let original = series(&returns, &volumes);
        let config = config();

        for id in StrategyId::ALL {
            let strategy = create_strategy(id, &config, Arc::new(MemorySink::new())).unwrap();
            for i in (30..original.len() - 1).step_by(7) {
                let mut future: Vec<f64> = returns.clone();
                for r in &mut future[i + 1..] {
                    *r = -*r + shock / 10.0;
                }
                let altered = series(&future, &volumes);
                prop_assert_eq!(&original[..=i], &altered[..=i]);

                let expected = strategy.generate_signals(&original[..=i]).unwrap();
                let actual = strategy.generate_signals(&altered[..=i]).unwrap();
                prop_assert_eq!(expected, actual);

                for side in [Side::Long, Side::Short] {
                    let open = position(side, original[i].close);
                    prop_assert_eq!(
                        strategy.should_exit(&original, i, &open).unwrap(),
                        strategy.should_exit(&altered, i, &open).unwrap(),
                        "{} exit at {} looked ahead", id, i
                    );
                }
            }
        }
    }

    /// Every emitted signal belongs to the last bar, carries a unit confidence,
    /// has stops on the correct side and sizes into `(0, 1]`.
    #[test]
    fn signals_are_well_formed((returns, volumes) in market()) {
        let data = series(&returns, &volumes);
        let config = config();

        for id in StrategyId::ALL {
            let strategy = create_strategy(id, &config, Arc::new(MemorySink::new())).unwrap();
            for end in (20..=data.len()).step_by(5) {
                let window = &data[..end];
                let current = &window[end - 1];
                for signal in strategy.generate_signals(window).unwrap() {
                    prop_assert_eq!(signal.timestamp, current.timestamp);
                    prop_assert!((0.0..=1.0).contains(&signal.confidence));
                    if let (Some(stop), Some(take)) = (signal.stop_loss, signal.take_profit) {
                        match signal.side {
                            Side::Long => prop_assert!(stop < signal.price && signal.price < take),
                            Side::Short => prop_assert!(take < signal.price && signal.price < stop),
                        }
                    }
                    let size = strategy.calculate_position_size(window, &signal);
                    prop_assert!(size > 0.0 && size <= 1.0, "{} sized {}", id, size);
                }
            }
        }
    }
}
