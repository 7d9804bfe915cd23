//! Raw market chart samples and daily bars.
//!
//! A [`RawSeries`] is what a data provider hands over: three independent
//! channels of `(timestamp_ms, value)` samples. A [`DailyBar`] is one
//! normalized calendar day of that series.

use chrono::{DateTime, NaiveDate};

pub type Sample = (i64, f64);

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawSeries {
    pub prices: Vec<Sample>,
    pub market_caps: Vec<Sample>,
    pub volumes: Vec<Sample>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DailyBar {
    pub date: NaiveDate,
    pub close: f64,
    pub market_cap: Option<f64>,
    pub volume: Option<f64>,
}

/// UTC calendar day of a millisecond timestamp.
pub fn utc_day(timestamp_ms: i64) -> Option<NaiveDate> {
    DateTime::from_timestamp_millis(timestamp_ms).map(|dt| dt.date_naive())
}

/// Milliseconds since the epoch at midnight UTC of `date`.
pub fn day_start_ms(date: NaiveDate) -> i64 {
    date.and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc().timestamp_millis())
        .unwrap_or_default()
}
