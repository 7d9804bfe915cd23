//! Daily normalized series with derived indicator columns.
//!
//! [`build_derived_series`] turns a provider's [`RawSeries`] into one row per
//! UTC calendar day and computes the columns the signal and confirmation
//! stages read.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::domain::error::ExplodersError;
use crate::domain::indicator::{abs_change, pct_change, rolling_mean};
use crate::domain::market_chart::{utc_day, DailyBar, RawSeries, Sample};
use crate::domain::strategy::{DateWindow, StrategyParams};

#[derive(Debug, Clone)]
pub struct DerivedSeries {
    pub asset: String,
    pub bars: Vec<DailyBar>,
    pub ret1: Vec<Option<f64>>,
    pub ret2: Vec<Option<f64>>,
    pub true_range: Vec<Option<f64>>,
    pub atr: Vec<Option<f64>>,
    pub vol_ma: Vec<Option<f64>>,
}

impl DerivedSeries {
    /// Computes every derived column from already-normalized bars.
    pub fn from_bars(asset: String, bars: Vec<DailyBar>, params: &StrategyParams) -> Self {
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        let volumes: Vec<Option<f64>> = bars.iter().map(|b| b.volume).collect();

        let true_range = abs_change(&closes);
        let atr = rolling_mean(&true_range, params.atr_len);

        DerivedSeries {
            asset,
            ret1: pct_change(&closes, 1),
            ret2: pct_change(&closes, 2),
            true_range,
            atr,
            vol_ma: rolling_mean(&volumes, params.vol_ma_len),
            bars,
        }
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn close(&self, i: usize) -> f64 {
        self.bars[i].close
    }

    pub fn date(&self, i: usize) -> NaiveDate {
        self.bars[i].date
    }

    /// `volume[i] / vol_ma[i]`, undefined when either side is missing or the
    /// average is zero.
    pub fn volume_multiple(&self, i: usize) -> Option<f64> {
        let ma = self.vol_ma.get(i).copied().flatten()?;
        if ma == 0.0 {
            return None;
        }
        self.bars[i].volume.map(|v| v / ma)
    }
}

/// Last finite sample per UTC day, in input order.
fn last_per_day(samples: &[Sample]) -> BTreeMap<NaiveDate, f64> {
    let mut by_day = BTreeMap::new();
    for &(ts, value) in samples {
        if !value.is_finite() {
            continue;
        }
        if let Some(day) = utc_day(ts) {
            by_day.insert(day, value);
        }
    }
    by_day
}

/// Normalizes a raw series into daily bars restricted to `window`.
pub fn normalize_daily(raw: &RawSeries, window: DateWindow) -> Vec<DailyBar> {
    let closes = last_per_day(&raw.prices);
    let caps = last_per_day(&raw.market_caps);
    let volumes = last_per_day(&raw.volumes);

    closes
        .range(window.start..=window.end)
        .map(|(&date, &close)| DailyBar {
            date,
            close,
            market_cap: caps.get(&date).copied(),
            volume: volumes.get(&date).copied(),
        })
        .collect()
}

/// Builds the derived series for one asset, or `InsufficientData` when fewer
/// than `atr_len + min_history_extra` days survive normalization.
pub fn build_derived_series(
    asset: &str,
    raw: &RawSeries,
    window: DateWindow,
    params: &StrategyParams,
) -> Result<DerivedSeries, ExplodersError> {
    let minimum = params.min_valid_days();
    if window.start > window.end {
        return Err(ExplodersError::InsufficientData {
            asset: asset.to_string(),
            days: 0,
            minimum,
        });
    }

    let bars = normalize_daily(raw, window);
    if bars.len() < minimum {
        return Err(ExplodersError::InsufficientData {
            asset: asset.to_string(),
            days: bars.len(),
            minimum,
        });
    }

    Ok(DerivedSeries::from_bars(asset.to_string(), bars, params))
}
