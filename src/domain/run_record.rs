//! A record of one completed pipeline run.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use super::backtest::BacktestResult;
use super::metrics::Summary;
use super::scan::ScanOutcome;
use super::universe::{RejectReason, SkippedAsset};

/// When a run happened and what went into it. Returned from the pipeline
/// and written next to the results instead of being kept as process state.
#[derive(Debug, Clone, PartialEq)]
pub struct RunRecord {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub assets_requested: usize,
    pub assets_scanned: usize,
    pub skipped: Vec<SkippedAsset>,
    pub candidates: usize,
    pub rejections: BTreeMap<RejectReason, usize>,
    pub summary: Summary,
}

impl RunRecord {
    /// Builds the record, stamping `finished_at` with the current time.
    pub fn new(
        started_at: DateTime<Utc>,
        assets_requested: usize,
        scan: &ScanOutcome,
        result: &BacktestResult,
    ) -> Self {
        Self::with_finish(started_at, Utc::now(), assets_requested, scan, result)
    }

    pub fn with_finish(
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
        assets_requested: usize,
        scan: &ScanOutcome,
        result: &BacktestResult,
    ) -> Self {
        RunRecord {
            started_at,
            finished_at,
            assets_requested,
            assets_scanned: scan.scanned,
            skipped: scan.skipped.clone(),
            candidates: scan.entries.len(),
            rejections: scan.rejections.clone(),
            summary: Summary::compute(result),
        }
    }

    pub fn elapsed_ms(&self) -> i64 {
        (self.finished_at - self.started_at).num_milliseconds()
    }

    pub fn rejected(&self) -> usize {
        self.rejections.values().sum()
    }
}
