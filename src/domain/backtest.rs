//! Day-stepped portfolio simulator.
//!
//! [`run_backtest`] walks every calendar day of the configured window once,
//! in order. Each day it admits that day's candidates (highest volume
//! multiple first, up to the free slots), ages every open position by one
//! bar, closes whatever hit its exit rule, and records the post-exit equity.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use tracing::debug;

use super::execution::{size_position, stop_exit_pnl, time_exit_pnl, Sizing};
use super::portfolio::Portfolio;
use super::position::{ExitReason, Position, Trade};
use super::series::DerivedSeries;
use super::strategy::DateWindow;
use super::universe::CandidateEntry;

/// Whether the carried stop price is checked against the daily close.
///
/// With `Disabled`, positions only leave on the holding-period timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StopPolicy {
    #[default]
    Disabled,
    Enabled,
}

impl FromStr for StopPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "disabled" | "off" | "false" => Ok(StopPolicy::Disabled),
            "enabled" | "on" | "true" => Ok(StopPolicy::Enabled),
            other => Err(format!("unknown stop policy '{other}', expected enabled|disabled")),
        }
    }
}

impl fmt::Display for StopPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopPolicy::Disabled => write!(f, "disabled"),
            StopPolicy::Enabled => write!(f, "enabled"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub initial_equity: f64,
    pub risk_pct: f64,
    pub max_concurrent: usize,
    pub max_hold_days: u32,
    pub payoff_multiple: f64,
    pub stop_policy: StopPolicy,
}

impl BacktestConfig {
    pub fn window(&self) -> DateWindow {
        DateWindow::new(self.start_date, self.end_date)
    }
}

/// Daily closes by asset, consulted only when stops are enabled.
#[derive(Debug, Clone, Default)]
pub struct PriceBook {
    closes: HashMap<String, HashMap<NaiveDate, f64>>,
}

impl PriceBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_series(&mut self, series: &DerivedSeries) {
        let entry = self.closes.entry(series.asset.clone()).or_default();
        entry.extend(series.bars.iter().map(|b| (b.date, b.close)));
    }

    pub fn close(&self, asset: &str, date: NaiveDate) -> Option<f64> {
        self.closes.get(asset)?.get(&date).copied()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestResult {
    /// Final state; `positions` holds whatever was still open on the last day.
    pub portfolio: Portfolio,
    pub entries_admitted: usize,
    pub entries_skipped: usize,
    pub peak_open_positions: usize,
}

impl BacktestResult {
    pub fn final_equity(&self) -> f64 {
        self.portfolio.equity
    }

    pub fn open_positions(&self) -> &[Position] {
        &self.portfolio.positions
    }
}

/// Groups candidates by entry date, keeping arrival order within a day.
fn entries_by_date(entries: &[CandidateEntry]) -> BTreeMap<NaiveDate, Vec<&CandidateEntry>> {
    let mut by_date: BTreeMap<NaiveDate, Vec<&CandidateEntry>> = BTreeMap::new();
    for entry in entries {
        by_date.entry(entry.date).or_default().push(entry);
    }
    by_date
}

/// Highest volume multiple first; the sort is stable so ties keep arrival order.
pub fn rank_candidates(candidates: &mut [&CandidateEntry]) {
    candidates.sort_by(|a, b| b.vol_mult.total_cmp(&a.vol_mult));
}

fn exit_decision(
    position: &Position,
    date: NaiveDate,
    prices: &PriceBook,
    config: &BacktestConfig,
) -> Option<(ExitReason, f64)> {
    if config.stop_policy == StopPolicy::Enabled {
        if let Some(close) = prices.close(&position.asset, date) {
            if position.should_stop_out(close) {
                let pnl = stop_exit_pnl(position.entry_price, position.stop_price, position.quantity);
                return Some((ExitReason::Stop, pnl));
            }
        }
    }

    if position.hold_expired(config.max_hold_days) {
        let pnl = time_exit_pnl(position.entry_price, config.payoff_multiple, position.quantity);
        return Some((ExitReason::Time, pnl));
    }

    None
}

pub fn run_backtest(
    entries: &[CandidateEntry],
    prices: &PriceBook,
    config: &BacktestConfig,
) -> BacktestResult {
    let mut portfolio = Portfolio::new(config.initial_equity, config.max_concurrent);
    let mut by_date = entries_by_date(entries);
    let mut entries_admitted = 0usize;
    let mut entries_skipped = 0usize;
    let mut peak_open_positions = 0usize;

    for day in config.window().days() {
        // Admit today's candidates, sized on equity before today's exits.
        if let Some(mut todays) = by_date.remove(&day) {
            rank_candidates(&mut todays);
            let slots = portfolio.available_slots();
            for entry in todays.into_iter().take(slots) {
                match size_position(
                    portfolio.equity,
                    config.risk_pct,
                    entry.entry_price,
                    entry.stop_price,
                ) {
                    Sizing::Sized { quantity, .. } => {
                        debug!(asset = %entry.asset, %day, quantity, "opening position");
                        portfolio.add_position(Position::open(entry, day, quantity));
                        entries_admitted += 1;
                    }
                    Sizing::NonPositiveRisk | Sizing::NonPositiveQuantity => {
                        debug!(asset = %entry.asset, %day, "skipping candidate with unusable sizing");
                        entries_skipped += 1;
                    }
                }
            }
        }
        peak_open_positions = peak_open_positions.max(portfolio.position_count());

        // Age positions and apply exits in the order they were opened.
        let mut still_open = Vec::with_capacity(portfolio.positions.len());
        for mut position in std::mem::take(&mut portfolio.positions) {
            position.bars_held += 1;
            match exit_decision(&position, day, prices, config) {
                Some((reason, pnl)) => {
                    debug!(asset = %position.asset, %day, %reason, pnl, "closing position");
                    portfolio.record_trade(Trade::close(&position, day, pnl, reason));
                }
                None => still_open.push(position),
            }
        }
        portfolio.positions = still_open;

        portfolio.record_equity(day);
    }

    BacktestResult {
        portfolio,
        entries_admitted,
        entries_skipped,
        peak_open_positions,
    }
}
