//! Universe admission: market-cap band, window and stop invariants.
//!
//! Also parses asset lists from configuration and records which assets were
//! skipped before scanning.

use crate::domain::execution::{entry_price_with_fee, is_valid_stop, stop_price};
use crate::domain::series::DerivedSeries;
use crate::domain::strategy::{DateWindow, StrategyParams};
use chrono::NaiveDate;
use std::collections::HashSet;
use std::fmt;

/// A confirmed breakout ready for the portfolio simulator.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateEntry {
    pub asset: String,
    pub signal_date: NaiveDate,
    pub date: NaiveDate,
    pub entry_price: f64,
    pub stop_price: f64,
    pub atr: f64,
    pub vol_mult: f64,
    pub market_cap: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RejectReason {
    MarketCapOutOfBand,
    OutsideWindow,
    NoAtr,
    InvalidStop,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RejectReason::MarketCapOutOfBand => "market_cap_out_of_band",
            RejectReason::OutsideWindow => "outside_window",
            RejectReason::NoAtr => "no_atr",
            RejectReason::InvalidStop => "invalid_stop",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone)]
pub struct UniverseFilter {
    pub mcap_min: f64,
    pub mcap_max: f64,
    pub window: DateWindow,
    pub fee_per_side: f64,
    pub atr_mult_stop: f64,
    pub stop_floor_pct: f64,
}

impl UniverseFilter {
    pub fn new(params: &StrategyParams, window: DateWindow) -> Self {
        UniverseFilter {
            mcap_min: params.mcap_min,
            mcap_max: params.mcap_max,
            window,
            fee_per_side: params.fee_per_side,
            atr_mult_stop: params.atr_mult_stop,
            stop_floor_pct: params.stop_floor_pct,
        }
    }

    /// Market cap at the signal row lies in the inclusive band.
    pub fn market_cap_in_band(&self, series: &DerivedSeries, signal_idx: usize) -> bool {
        series.bars[signal_idx]
            .market_cap
            .is_some_and(|cap| cap >= self.mcap_min && cap <= self.mcap_max)
    }

    /// Builds the candidate for a confirmed signal or says why it was dropped.
    pub fn admit(
        &self,
        series: &DerivedSeries,
        signal_idx: usize,
        confirm_idx: usize,
    ) -> Result<CandidateEntry, RejectReason> {
        if !self.market_cap_in_band(series, signal_idx) {
            return Err(RejectReason::MarketCapOutOfBand);
        }

        let date = series.date(confirm_idx);
        if !self.window.contains(date) {
            return Err(RejectReason::OutsideWindow);
        }

        let atr = match series.atr[confirm_idx] {
            Some(a) if a != 0.0 && a.is_finite() => a,
            _ => return Err(RejectReason::NoAtr),
        };

        let entry_price = entry_price_with_fee(series.close(confirm_idx), self.fee_per_side);
        let stop = stop_price(entry_price, atr, self.atr_mult_stop, self.stop_floor_pct);
        if !is_valid_stop(entry_price, stop) {
            return Err(RejectReason::InvalidStop);
        }

        Ok(CandidateEntry {
            asset: series.asset.clone(),
            signal_date: series.date(signal_idx),
            date,
            entry_price,
            stop_price: stop,
            atr,
            vol_mult: series.volume_multiple(confirm_idx).unwrap_or(0.0),
            market_cap: series.bars[signal_idx].market_cap.unwrap_or_default(),
        })
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum UniverseError {
    #[error("empty token in asset list")]
    EmptyToken,

    #[error("duplicate asset: {0}")]
    DuplicateAsset(String),
}

/// Parses a comma-separated asset list. Ids are trimmed and lowercased.
pub fn parse_assets(input: &str) -> Result<Vec<String>, UniverseError> {
    let mut assets = Vec::new();
    let mut seen = HashSet::new();

    for token in input.split(',') {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return Err(UniverseError::EmptyToken);
        }
        let asset = trimmed.to_lowercase();
        if !seen.insert(asset.clone()) {
            return Err(UniverseError::DuplicateAsset(asset));
        }
        assets.push(asset);
    }

    Ok(assets)
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkippedAsset {
    pub asset: String,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    Unavailable,
    InsufficientDays { days: usize },
    Malformed,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Unavailable => write!(f, "unavailable"),
            SkipReason::InsufficientDays { days } => write!(f, "only {} days", days),
            SkipReason::Malformed => write!(f, "malformed"),
        }
    }
}
