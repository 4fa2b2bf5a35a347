use chrono::{DateTime, Duration, TimeZone, Utc};
use core_types::{Order, Side, Trade};
use executor::{Account, ExecutorError};
use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

#[derive(Debug, Clone)]
enum Op {
    Open { long: bool, size: u32, price: u32 },
    Mark { price: u32 },
    CloseFirst { price: u32 },
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (any::<bool>(), 1u32..20, 50u32..150)
            .prop_map(|(long, size, price)| Op::Open { long, size, price }),
        (50u32..150).prop_map(|price| Op::Mark { price }),
        (50u32..150).prop_map(|price| Op::CloseFirst { price }),
    ]
}

fn at(step: usize) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::hours(step as i64)
}

fn order(long: bool, size: u32, price: u32, time: DateTime<Utc>) -> Order {
    let price = Decimal::from(price);
    let (side, stop_loss, take_profit) = if long {
        (Side::Long, price * dec!(0.5), price * dec!(2))
    } else {
        (Side::Short, price * dec!(2), price * dec!(0.5))
    };
    Order {
        side,
        size: Decimal::from(size),
        price,
        time,
        stop_loss,
        take_profit,
        confidence: 0.7,
        pattern: Some("test".to_string()),
    }
}

/// Scenario: a long opened at 100 and closed at 110 books exactly +10.
#[test]
fn closing_a_winning_long_credits_the_balance() {
    let mut account = Account::new(dec!(10000));
    let position = account.execute_order(order(true, 1, 100, at(0))).unwrap();
    let trade: Trade = account.close_position(position.position_id, dec!(110), at(5)).unwrap();

    assert_eq!(trade.side, Side::Long);
    assert_eq!(trade.pnl, dec!(10));
    assert!(account.positions().is_empty());
    assert_eq!(account.balance(), dec!(10010));
}

proptest! {
    /// Equity always equals balance plus unrealized pnl, balance always equals
    /// the initial balance plus realized pnl, and the account never holds both
    /// sides at once.
    #[test]
    fn ledger_is_conserved(ops in prop::collection::vec(op(), 1..60)) {
        let initial = dec!(2000);
        let mut account = Account::new(initial);

        for (step, op) in ops.into_iter().enumerate() {
            match op {
                Op::Open { long, size, price } => {
                    let before = (account.balance(), account.positions().len(), account.trades().len());
                    match account.execute_order(order(long, size, price, at(step))) {
                        Ok(position) => prop_assert!(account.position(position.position_id).is_some()),
                        Err(ExecutorError::InsufficientMargin { required, available }) => {
                            prop_assert!(required > available);
                            let after = (account.balance(), account.positions().len(), account.trades().len());
                            prop_assert_eq!(before, after);
                        }
                        Err(other) => prop_assert!(false, "unexpected error {other}"),
                    }
                }
                Op::Mark { price } => {
                    account.mark_to_market(Decimal::from(price), at(step));
                }
                Op::CloseFirst { price } => {
                    if let Some(id) = account.positions().first().map(|p| p.position_id) {
                        account.close_position(id, Decimal::from(price), at(step)).unwrap();
                        prop_assert!(account.close_position(id, Decimal::from(price), at(step)).is_err());
                    }
                }
            }

            let unrealized: Decimal = account.positions().iter().map(|p| p.unrealized_pnl).sum();
            prop_assert_eq!(account.equity(), account.balance() + unrealized);

            let realized: Decimal = account.trades().iter().map(|t| t.pnl).sum();
            prop_assert_eq!(account.balance(), initial + realized);

            let sides: Vec<Side> = account.positions().iter().map(|p| p.side).collect();
            prop_assert!(sides.windows(2).all(|w| w[0] == w[1]));
        }
    }
}
