use chrono::{DateTime, Utc};
use core_types::{Order, Position, Side, Trade};
use events::PortfolioState;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ExecutorError;

/// One point of the account's balance/equity history.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub timestamp: DateTime<Utc>,
    pub balance: Decimal,
    pub equity: Decimal,
}

/// The single-instrument trading account.
///
/// `balance` is realized cash: the initial balance plus the pnl of every closed
/// position. `equity` is the balance plus the unrealized pnl of the open
/// positions. Opening a position does not move cash; instead its entry notional
/// is reserved as margin until it closes.
#[derive(Debug, Clone)]
pub struct Account {
    initial_balance: Decimal,
    balance: Decimal,
    equity: Decimal,
    positions: Vec<Position>,
    trades: Vec<Trade>,
    history: Vec<Snapshot>,
}

impl Account {
    pub fn new(initial_balance: Decimal) -> Self {
        Self {
            initial_balance,
            balance: initial_balance,
            equity: initial_balance,
            positions: Vec::new(),
            trades: Vec::new(),
            history: Vec::new(),
        }
    }

    pub fn initial_balance(&self) -> Decimal {
        self.initial_balance
    }

    pub fn balance(&self) -> Decimal {
        self.balance
    }

    pub fn equity(&self) -> Decimal {
        self.equity
    }

    pub fn positions(&self) -> &[Position] {
        &self.positions
    }

    pub fn position(&self, id: Uuid) -> Option<&Position> {
        self.positions.iter().find(|p| p.position_id == id)
    }

    /// Every closed position, in closing order.
    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }

    pub fn history(&self) -> &[Snapshot] {
        &self.history
    }

    /// Balance not reserved by open positions.
    pub fn available_margin(&self) -> Decimal {
        self.balance - self.reserved(None)
    }

    fn reserved(&self, side: Option<Side>) -> Decimal {
        self.positions
            .iter()
            .filter(|p| side.is_none_or(|s| p.side == s))
            .map(Position::notional)
            .sum()
    }

    /// Opens a position for `order`.
    ///
    /// Open positions on the other side are closed at the order price first, so
    /// the account never holds a long and a short at once. The margin check
    /// accounts for that netting and runs before anything is mutated: a
    /// rejected order leaves the account untouched.
    pub fn execute_order(&mut self, order: Order) -> Result<Position, ExecutorError> {
        validate(&order)?;

        let opposite = order.side.opposite();
        let released: Decimal = self
            .positions
            .iter()
            .filter(|p| p.side == opposite)
            .map(|p| p.pnl_at(order.price))
            .sum();
        let available = self.balance + released - self.reserved(Some(order.side));
        let required = order.notional();
        if required > available {
            tracing::debug!(%required, %available, side = %order.side, "Order rejected for margin");
            return Err(ExecutorError::InsufficientMargin {
                required,
                available,
            });
        }

        let to_close: Vec<Uuid> = self
            .positions
            .iter()
            .filter(|p| p.side == opposite)
            .map(|p| p.position_id)
            .collect();
        for id in to_close {
            self.close_position(id, order.price, order.time)?;
        }

        let position = Position {
            position_id: Uuid::new_v4(),
            side: order.side,
            size: order.size,
            entry_price: order.price,
            entry_time: order.time,
            stop_loss: order.stop_loss,
            take_profit: order.take_profit,
            unrealized_pnl: Decimal::ZERO,
            pattern: order.pattern,
        };
        self.positions.push(position.clone());
        self.recompute_equity();

        tracing::debug!(
            id = %position.position_id,
            side = %position.side,
            size = %position.size,
            price = %position.entry_price,
            "Position opened"
        );
        Ok(position)
    }

    /// Closes the position `id` at `price`, realizing its pnl into the balance.
    ///
    /// A position can be closed only once; closing it again returns
    /// `PositionNotFound` and books nothing.
    pub fn close_position(
        &mut self,
        id: Uuid,
        price: Decimal,
        time: DateTime<Utc>,
    ) -> Result<Trade, ExecutorError> {
        let index = self
            .positions
            .iter()
            .position(|p| p.position_id == id)
            .ok_or(ExecutorError::PositionNotFound(id))?;
        let position = self.positions.remove(index);

        let trade = Trade::from_position(&position, price, time);
        self.balance += trade.pnl;
        self.recompute_equity();
        self.trades.push(trade.clone());

        tracing::debug!(id = %id, pnl = %trade.pnl, balance = %self.balance, "Position closed");
        Ok(trade)
    }

    /// Closes every open position at `price`.
    pub fn close_all(&mut self, price: Decimal, time: DateTime<Utc>) -> Vec<Trade> {
        let positions = std::mem::take(&mut self.positions);
        let trades: Vec<Trade> = positions
            .iter()
            .map(|p| Trade::from_position(p, price, time))
            .collect();
        self.balance += trades.iter().map(|t| t.pnl).sum::<Decimal>();
        self.recompute_equity();
        self.trades.extend(trades.iter().cloned());
        trades
    }

    /// Revalues every open position at `price` and records a history snapshot.
    pub fn mark_to_market(&mut self, price: Decimal, time: DateTime<Utc>) -> Decimal {
        for position in &mut self.positions {
            position.unrealized_pnl = position.pnl_at(price);
        }
        self.recompute_equity();
        self.history.push(Snapshot {
            timestamp: time,
            balance: self.balance,
            equity: self.equity,
        });
        self.equity
    }

    pub fn state(&self, timestamp: DateTime<Utc>) -> PortfolioState {
        PortfolioState {
            timestamp,
            balance: self.balance,
            equity: self.equity,
            positions: self.positions.clone(),
        }
    }

    /// Back to the initial balance with no positions, trades or history.
    pub fn reset(&mut self) {
        *self = Self::new(self.initial_balance);
    }

    fn recompute_equity(&mut self) {
        self.equity = self.balance
            + self
                .positions
                .iter()
                .map(|p| p.unrealized_pnl)
                .sum::<Decimal>();
    }
}

fn validate(order: &Order) -> Result<(), ExecutorError> {
    if order.size <= Decimal::ZERO {
        return Err(ExecutorError::InvalidOrder(format!(
            "size must be positive, got {}",
            order.size
        )));
    }
    if order.price <= Decimal::ZERO {
        return Err(ExecutorError::InvalidOrder(format!(
            "price must be positive, got {}",
            order.price
        )));
    }
    if !(0.0..=1.0).contains(&order.confidence) {
        return Err(ExecutorError::InvalidOrder(format!(
            "confidence must be within [0, 1], got {}",
            order.confidence
        )));
    }
    let ordered = match order.side {
        Side::Long => order.stop_loss < order.price && order.price < order.take_profit,
        Side::Short => order.take_profit < order.price && order.price < order.stop_loss,
    };
    if !ordered {
        return Err(ExecutorError::InvalidOrder(format!(
            "{} stops out of order: stop {} / entry {} / target {}",
            order.side, order.stop_loss, order.price, order.take_profit
        )));
    }
    Ok(())
}
