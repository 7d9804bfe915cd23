//! Portfolio state and equity tracking.

use chrono::NaiveDate;

use super::position::{Position, Trade};

#[derive(Debug, Clone, PartialEq)]
pub struct EquityPoint {
    pub date: NaiveDate,
    pub equity: f64,
}

/// Simulator state. Positions are kept in the order they were opened so
/// exits on the same day are recorded deterministically.
#[derive(Debug, Clone, PartialEq)]
pub struct Portfolio {
    pub equity: f64,
    pub initial_equity: f64,
    pub capacity: usize,
    pub positions: Vec<Position>,
    pub trades: Vec<Trade>,
    pub equity_curve: Vec<EquityPoint>,
}

impl Portfolio {
    pub fn new(initial_equity: f64, capacity: usize) -> Self {
        Portfolio {
            equity: initial_equity,
            initial_equity,
            capacity,
            positions: Vec::new(),
            trades: Vec::new(),
            equity_curve: Vec::new(),
        }
    }

    pub fn position_count(&self) -> usize {
        self.positions.len()
    }

    pub fn available_slots(&self) -> usize {
        self.capacity.saturating_sub(self.positions.len())
    }

    /// Adds a position if a slot is free. Returns `false` when full.
    pub fn add_position(&mut self, position: Position) -> bool {
        if self.available_slots() == 0 {
            return false;
        }
        self.positions.push(position);
        true
    }

    /// Realizes a trade: books its pnl into equity and appends it to the log.
    pub fn record_trade(&mut self, trade: Trade) {
        self.equity += trade.pnl;
        self.trades.push(trade);
    }

    pub fn record_equity(&mut self, date: NaiveDate) {
        self.equity_curve.push(EquityPoint {
            date,
            equity: self.equity,
        });
    }

    /// Sum of realized pnl; differs from `equity - initial_equity` only by
    /// floating point rounding.
    pub fn realized_pnl(&self) -> f64 {
        self.trades.iter().map(|t| t.pnl).sum()
    }
}
