//! Open positions and closed trades.

use chrono::NaiveDate;
use std::fmt;

use super::universe::CandidateEntry;

#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub asset: String,
    pub entry_date: NaiveDate,
    pub entry_price: f64,
    pub stop_price: f64,
    pub atr: f64,
    pub vol_mult: f64,
    pub quantity: f64,
    pub bars_held: u32,
}

impl Position {
    pub fn open(entry: &CandidateEntry, date: NaiveDate, quantity: f64) -> Self {
        Position {
            asset: entry.asset.clone(),
            entry_date: date,
            entry_price: entry.entry_price,
            stop_price: entry.stop_price,
            atr: entry.atr,
            vol_mult: entry.vol_mult,
            quantity,
            bars_held: 0,
        }
    }

    pub fn should_stop_out(&self, price: f64) -> bool {
        price <= self.stop_price
    }

    pub fn hold_expired(&self, max_hold_days: u32) -> bool {
        self.bars_held >= max_hold_days
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExitReason {
    Time,
    Stop,
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitReason::Time => write!(f, "time"),
            ExitReason::Stop => write!(f, "stop"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Trade {
    pub asset: String,
    pub entry_date: NaiveDate,
    pub exit_date: NaiveDate,
    pub entry_price: f64,
    pub quantity: f64,
    pub pnl: f64,
    pub reason: ExitReason,
}

impl Trade {
    pub fn close(position: &Position, exit_date: NaiveDate, pnl: f64, reason: ExitReason) -> Self {
        Trade {
            asset: position.asset.clone(),
            entry_date: position.entry_date,
            exit_date,
            entry_price: position.entry_price,
            quantity: position.quantity,
            pnl,
            reason,
        }
    }
}
