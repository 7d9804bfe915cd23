#![allow(dead_code)]

use chrono::NaiveDate;
use exploders::domain::backtest::{BacktestConfig, StopPolicy};
use exploders::domain::error::ExplodersError;
use exploders::domain::market_chart::{day_start_ms, RawSeries};
use exploders::domain::strategy::StrategyParams;
use exploders::ports::data_port::DataPort;
use std::collections::HashMap;
use std::path::Path;
use std::process::ExitCode;

pub enum MockFailure {
    Unavailable(String),
    Malformed(String),
}

pub struct MockDataPort {
    pub data: HashMap<String, RawSeries>,
    pub errors: HashMap<String, MockFailure>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_series(mut self, asset: &str, series: RawSeries) -> Self {
        self.data.insert(asset.to_string(), series);
        self
    }

    pub fn with_error(mut self, asset: &str, reason: &str) -> Self {
        self.errors
            .insert(asset.to_string(), MockFailure::Unavailable(reason.to_string()));
        self
    }

    pub fn with_malformed(mut self, asset: &str, reason: &str) -> Self {
        self.errors
            .insert(asset.to_string(), MockFailure::Malformed(reason.to_string()));
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_series(
        &self,
        asset: &str,
        _start_date: NaiveDate,
        _end_date: NaiveDate,
    ) -> Result<RawSeries, ExplodersError> {
        match self.errors.get(asset) {
            Some(MockFailure::Unavailable(reason)) => {
                return Err(ExplodersError::Unavailable {
                    asset: asset.to_string(),
                    reason: reason.clone(),
                });
            }
            Some(MockFailure::Malformed(reason)) => {
                return Err(ExplodersError::DataFormat {
                    reason: reason.clone(),
                });
            }
            None => {}
        }
        Ok(self.data.get(asset).cloned().unwrap_or_default())
    }

    fn list_assets(&self) -> Result<Vec<String>, ExplodersError> {
        let mut assets: Vec<String> = self.data.keys().cloned().collect();
        assets.sort();
        Ok(assets)
    }

    fn name(&self) -> &str {
        "mock"
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn day_offset(start: NaiveDate, days: usize) -> NaiveDate {
    start + chrono::Duration::days(days as i64)
}

/// One sample per day at midnight UTC for every channel.
pub fn daily_series(start: NaiveDate, closes: &[f64], volumes: &[f64], market_cap: f64) -> RawSeries {
    let mut raw = RawSeries::default();
    for (i, (&close, &volume)) in closes.iter().zip(volumes).enumerate() {
        let ts = day_start_ms(day_offset(start, i));
        raw.prices.push((ts, close));
        raw.market_caps.push((ts, market_cap));
        raw.volumes.push((ts, volume));
    }
    raw
}

/// Day of the pump in [`exploder`] series, relative to their start.
pub const PUMP_DAY: usize = 20;
/// Day the pump is confirmed and the candidate enters.
pub const CONFIRM_DAY: usize = PUMP_DAY + 1;

/// Twenty flat days at 1.0 and a pump to 2.2, confirmed the next day at 2.3
/// on `confirm_volume` against a baseline volume of 100. `after` lists the
/// closes following the confirmation day.
pub fn exploder(start: NaiveDate, confirm_volume: f64, after: &[f64]) -> RawSeries {
    let mut closes = vec![1.0; PUMP_DAY];
    closes.push(2.2);
    closes.push(2.3);
    closes.extend_from_slice(after);

    let mut volumes = vec![100.0; closes.len()];
    volumes[CONFIRM_DAY] = confirm_volume;

    daily_series(start, &closes, &volumes, 5_000_000.0)
}

/// Slow drift upwards after confirmation, never touching a 25% stop.
pub fn drift_after(days: usize) -> Vec<f64> {
    (1..=days).map(|i| 2.3 + i as f64 * 0.01).collect()
}

pub fn flat_series(start: NaiveDate, days: usize) -> RawSeries {
    daily_series(start, &vec![1.0; days], &vec![100.0; days], 5_000_000.0)
}

pub fn sample_config(start: NaiveDate, end: NaiveDate) -> BacktestConfig {
    BacktestConfig {
        start_date: start,
        end_date: end,
        initial_equity: 100.0,
        risk_pct: 0.02,
        max_concurrent: 5,
        max_hold_days: 10,
        payoff_multiple: 0.1,
        stop_policy: StopPolicy::Disabled,
    }
}

pub fn default_params() -> StrategyParams {
    StrategyParams::default()
}

/// Writes `series` as `<dir>/<asset>.csv` in the market-chart CSV layout.
pub fn write_chart_csv(dir: &Path, asset: &str, series: &RawSeries) {
    let caps: HashMap<i64, f64> = series.market_caps.iter().copied().collect();
    let vols: HashMap<i64, f64> = series.volumes.iter().copied().collect();

    let mut out = String::from("timestamp_ms,price,market_cap,volume\n");
    for &(ts, price) in &series.prices {
        let cap = caps.get(&ts).map(|v| v.to_string()).unwrap_or_default();
        let vol = vols.get(&ts).map(|v| v.to_string()).unwrap_or_default();
        out.push_str(&format!("{ts},{price},{cap},{vol}\n"));
    }
    std::fs::write(dir.join(format!("{asset}.csv")), out).unwrap();
}

pub fn is_exit(code: ExitCode, expected: ExitCode) -> bool {
    format!("{code:?}") == format!("{expected:?}")
}
