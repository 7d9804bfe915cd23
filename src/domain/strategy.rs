//! Signal, confirmation and universe parameters of the exploders strategy.

use chrono::NaiveDate;

#[derive(Debug, Clone, PartialEq)]
pub struct StrategyParams {
    /// Minimum `close[i] / close[i-1]` to count as a breakout.
    pub one_day_pump: f64,
    /// Minimum `close[i] / close[i-2]` to count as a breakout.
    pub two_day_pump: f64,
    pub vol_mult_min: f64,
    /// Number of rows after a signal searched for a confirmation.
    pub confirm_window: usize,
    pub atr_len: usize,
    pub vol_ma_len: usize,
    /// Extra valid days required beyond `atr_len`.
    pub min_history_extra: usize,
    pub mcap_min: f64,
    pub mcap_max: f64,
    pub fee_per_side: f64,
    pub atr_mult_stop: f64,
    /// Minimum stop distance as a fraction of the entry price.
    pub stop_floor_pct: f64,
}

impl Default for StrategyParams {
    fn default() -> Self {
        StrategyParams {
            one_day_pump: 2.0,
            two_day_pump: 2.0,
            vol_mult_min: 2.0,
            confirm_window: 5,
            atr_len: 14,
            vol_ma_len: 10,
            min_history_extra: 5,
            mcap_min: 2_000_000.0,
            mcap_max: 100_000_000.0,
            fee_per_side: 0.005,
            atr_mult_stop: 3.0,
            stop_floor_pct: 0.25,
        }
    }
}

impl StrategyParams {
    pub fn min_valid_days(&self) -> usize {
        self.atr_len + self.min_history_extra
    }
}

/// Closed calendar window `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        DateWindow { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    /// Every calendar day of the window in order; empty when `start > end`.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> + use<> {
        let end = self.end;
        self.start.iter_days().take_while(move |d| *d <= end)
    }

    pub fn day_count(&self) -> usize {
        if self.start > self.end {
            0
        } else {
            (self.end - self.start).num_days() as usize + 1
        }
    }
}
