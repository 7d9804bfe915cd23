//! Per-asset scanning and the parallel universe scan.
//!
//! [`scan_asset`] runs the series builder, signal detector, confirmation
//! search and universe filter over one asset. [`scan_universe`] fetches every
//! asset through a [`DataPort`] and scans them on a bounded rayon pool.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::domain::backtest::{PriceBook, StopPolicy};
use crate::domain::error::ExplodersError;
use crate::domain::market_chart::RawSeries;
use crate::domain::series::{DerivedSeries, build_derived_series};
use crate::domain::signal::{detect_signals, first_confirmation};
use crate::domain::strategy::{DateWindow, StrategyParams};
use crate::domain::universe::{
    CandidateEntry, RejectReason, SkipReason, SkippedAsset, UniverseFilter,
};
use crate::ports::data_port::DataPort;

/// Everything one asset contributed to the run.
#[derive(Debug, Clone)]
pub struct AssetScan {
    pub series: DerivedSeries,
    pub entries: Vec<CandidateEntry>,
    pub signals: usize,
    pub unconfirmed: usize,
    pub rejections: BTreeMap<RejectReason, usize>,
}

/// Scans one asset's raw series.
///
/// The market-cap band is checked at the signal row before the confirmation
/// search runs. Every signal is considered on its own, so two signals may
/// confirm on the same row and produce two candidates.
pub fn scan_asset(
    asset: &str,
    raw: &RawSeries,
    params: &StrategyParams,
    window: DateWindow,
) -> Result<AssetScan, ExplodersError> {
    let series = build_derived_series(asset, raw, window, params)?;
    let filter = UniverseFilter::new(params, window);

    let mut entries = Vec::new();
    let mut signals = 0usize;
    let mut unconfirmed = 0usize;
    let mut rejections: BTreeMap<RejectReason, usize> = BTreeMap::new();

    for signal_idx in detect_signals(&series, params) {
        signals += 1;

        if !filter.market_cap_in_band(&series, signal_idx) {
            *rejections.entry(RejectReason::MarketCapOutOfBand).or_default() += 1;
            continue;
        }

        let Some(confirm_idx) = first_confirmation(&series, signal_idx, params) else {
            unconfirmed += 1;
            continue;
        };

        match filter.admit(&series, signal_idx, confirm_idx) {
            Ok(entry) => entries.push(entry),
            Err(reason) => {
                debug!(asset, signal = %series.date(signal_idx), %reason, "candidate rejected");
                *rejections.entry(reason).or_default() += 1;
            }
        }
    }

    Ok(AssetScan {
        series,
        entries,
        signals,
        unconfirmed,
        rejections,
    })
}

/// Combined output of a universe scan.
#[derive(Debug, Clone, Default)]
pub struct ScanOutcome {
    /// Candidates in asset input order, then signal order within an asset.
    pub entries: Vec<CandidateEntry>,
    pub prices: PriceBook,
    pub skipped: Vec<SkippedAsset>,
    pub rejections: BTreeMap<RejectReason, usize>,
    pub scanned: usize,
    pub signals: usize,
    pub unconfirmed: usize,
}

impl ScanOutcome {
    pub fn rejected(&self) -> usize {
        self.rejections.values().sum()
    }
}

fn skip_reason(err: &ExplodersError) -> SkipReason {
    match err {
        ExplodersError::InsufficientData { days, .. } => SkipReason::InsufficientDays { days: *days },
        ExplodersError::DataFormat { .. } => SkipReason::Malformed,
        _ => SkipReason::Unavailable,
    }
}

fn fetch_and_scan(
    port: &(dyn DataPort + Sync),
    asset: &str,
    params: &StrategyParams,
    window: DateWindow,
) -> Result<AssetScan, ExplodersError> {
    let raw = port.fetch_series(asset, window.start, window.end)?;
    scan_asset(asset, &raw, params, window)
}

/// Assets finished between two progress lines.
const PROGRESS_EVERY: usize = 25;

/// Completion counter shared by the scan workers.
struct ScanProgress {
    done: AtomicUsize,
    total: usize,
    every: usize,
}

impl ScanProgress {
    fn new(total: usize, every: usize) -> Self {
        Self {
            done: AtomicUsize::new(0),
            total,
            every: every.max(1),
        }
    }

    /// Marks one asset finished. Returns the running count on every
    /// `every`-th asset and on the last one.
    fn tick(&self) -> Option<usize> {
        let done = self.done.fetch_add(1, Ordering::Relaxed) + 1;
        (done % self.every == 0 || done == self.total).then_some(done)
    }
}

/// Fetches and scans every asset on a pool of `workers` threads.
///
/// Results are merged in the order of `assets`, so the candidate list does
/// not depend on scheduling. Per-asset failures become [`SkippedAsset`]s;
/// only a failure to build the pool is returned as an error. Closes go into
/// the outcome's [`PriceBook`] only when `stop_policy` is enabled.
pub fn scan_universe(
    port: &(dyn DataPort + Sync),
    assets: &[String],
    params: &StrategyParams,
    window: DateWindow,
    workers: usize,
    stop_policy: StopPolicy,
) -> Result<ScanOutcome, ExplodersError> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers.max(1))
        .build()
        .map_err(|e| ExplodersError::Io(std::io::Error::other(e)))?;

    info!(
        assets = assets.len(),
        workers,
        provider = port.name(),
        "scanning universe"
    );

    let progress = ScanProgress::new(assets.len(), PROGRESS_EVERY);
    let results: Vec<Result<AssetScan, ExplodersError>> = pool.install(|| {
        assets
            .par_iter()
            .map(|asset| {
                let result = fetch_and_scan(port, asset, params, window);
                if let Some(done) = progress.tick() {
                    info!(done, total = progress.total, "scan progress");
                }
                result
            })
            .collect()
    });

    let mut outcome = ScanOutcome::default();
    for (asset, result) in assets.iter().zip(results) {
        match result {
            Ok(scan) => {
                debug!(
                    asset = %asset,
                    bars = scan.series.len(),
                    signals = scan.signals,
                    candidates = scan.entries.len(),
                    "asset scanned"
                );
                outcome.scanned += 1;
                outcome.signals += scan.signals;
                outcome.unconfirmed += scan.unconfirmed;
                for (reason, count) in scan.rejections {
                    *outcome.rejections.entry(reason).or_default() += count;
                }
                if stop_policy == StopPolicy::Enabled {
                    outcome.prices.insert_series(&scan.series);
                }
                outcome.entries.extend(scan.entries);
            }
            Err(err) => {
                let reason = skip_reason(&err);
                warn!(asset = %asset, %reason, error = %err, "skipping asset");
                outcome.skipped.push(SkippedAsset {
                    asset: asset.clone(),
                    reason,
                });
            }
        }
    }

    info!(
        scanned = outcome.scanned,
        skipped = outcome.skipped.len(),
        candidates = outcome.entries.len(),
        rejected = outcome.rejected(),
        "universe scan complete"
    );

    Ok(outcome)
}
