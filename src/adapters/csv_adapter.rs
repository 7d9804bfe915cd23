//! CSV file market-chart adapter.
//!
//! Each asset lives in `<dir>/<asset>.csv` with the header
//! `timestamp_ms,price,market_cap,volume`. Market cap and volume cells may be
//! empty; such rows contribute only to the channels that are present.

use crate::domain::error::ExplodersError;
use crate::domain::market_chart::{day_start_ms, RawSeries};
use crate::ports::data_port::DataPort;
use chrono::{Days, NaiveDate};
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use tracing::debug;

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, asset: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", asset))
    }
}

fn format_error(path: &std::path::Path, line: u64, reason: impl std::fmt::Display) -> ExplodersError {
    ExplodersError::DataFormat {
        reason: format!("{}:{}: {}", path.display(), line, reason),
    }
}

fn parse_optional(cell: Option<&str>) -> Result<Option<f64>, std::num::ParseFloatError> {
    match cell.map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => s.parse().map(Some),
    }
}

impl DataPort for CsvAdapter {
    fn fetch_series(
        &self,
        asset: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<RawSeries, ExplodersError> {
        let path = self.csv_path(asset);
        let content = fs::read_to_string(&path).map_err(|e| {
            let reason = if e.kind() == ErrorKind::NotFound {
                format!("no file at {}", path.display())
            } else {
                format!("failed to read {}: {}", path.display(), e)
            };
            ExplodersError::Unavailable {
                asset: asset.to_string(),
                reason,
            }
        })?;

        let from_ms = day_start_ms(start_date);
        let until_ms = end_date
            .checked_add_days(Days::new(1))
            .map(day_start_ms)
            .unwrap_or(i64::MAX);

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let mut series = RawSeries::default();

        for (i, result) in rdr.records().enumerate() {
            // header is line 1
            let line = i as u64 + 2;
            let record = result.map_err(|e| format_error(&path, line, e))?;

            let ts: i64 = record
                .get(0)
                .ok_or_else(|| format_error(&path, line, "missing timestamp_ms column"))?
                .trim()
                .parse()
                .map_err(|e| format_error(&path, line, format!("invalid timestamp_ms: {e}")))?;

            if ts < from_ms || ts >= until_ms {
                continue;
            }

            let price: f64 = record
                .get(1)
                .ok_or_else(|| format_error(&path, line, "missing price column"))?
                .trim()
                .parse()
                .map_err(|e| format_error(&path, line, format!("invalid price: {e}")))?;
            let market_cap = parse_optional(record.get(2))
                .map_err(|e| format_error(&path, line, format!("invalid market_cap: {e}")))?;
            let volume = parse_optional(record.get(3))
                .map_err(|e| format_error(&path, line, format!("invalid volume: {e}")))?;

            series.prices.push((ts, price));
            if let Some(cap) = market_cap {
                series.market_caps.push((ts, cap));
            }
            if let Some(vol) = volume {
                series.volumes.push((ts, vol));
            }
        }

        debug!(asset, samples = series.prices.len(), "read csv market chart");
        Ok(series)
    }

    fn list_assets(&self) -> Result<Vec<String>, ExplodersError> {
        let entries = fs::read_dir(&self.base_path)?;

        let mut assets = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "csv") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    assets.push(stem.to_string());
                }
            }
        }

        assets.sort();
        Ok(assets)
    }

    fn name(&self) -> &str {
        "csv"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::market_chart::utc_day;
    use tempfile::TempDir;

    const DAY_MS: i64 = 86_400_000;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn setup_test_data() -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().to_path_buf();

        let base = day_start_ms(date(2025, 1, 15));
        let csv_content = format!(
            "timestamp_ms,price,market_cap,volume\n\
             {},1.0,5000000,100\n\
             {},1.1,,\n\
             {},1.2,5200000,120\n",
            base,
            base + DAY_MS,
            base + 2 * DAY_MS,
        );

        fs::write(path.join("pepe.csv"), csv_content).unwrap();
        fs::write(path.join("bonk.csv"), "timestamp_ms,price,market_cap,volume\n").unwrap();
        fs::write(path.join("notes.txt"), "ignore me").unwrap();

        (dir, path)
    }

    #[test]
    fn fetch_series_reads_all_channels() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);

        let raw = adapter
            .fetch_series("pepe", date(2025, 1, 15), date(2025, 1, 17))
            .unwrap();

        assert_eq!(raw.prices.len(), 3);
        assert_eq!(raw.market_caps.len(), 2);
        assert_eq!(raw.volumes.len(), 2);
        assert_eq!(raw.prices[1].1, 1.1);
        assert_eq!(raw.market_caps[1].1, 5_200_000.0);
    }

    #[test]
    fn fetch_series_filters_by_date() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);

        let raw = adapter
            .fetch_series("pepe", date(2025, 1, 16), date(2025, 1, 16))
            .unwrap();

        assert_eq!(raw.prices.len(), 1);
        assert_eq!(utc_day(raw.prices[0].0), Some(date(2025, 1, 16)));
    }

    #[test]
    fn missing_file_is_unavailable() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);

        let result = adapter.fetch_series("ghost", date(2025, 1, 1), date(2025, 1, 31));
        assert!(matches!(result, Err(ExplodersError::Unavailable { asset, .. }) if asset == "ghost"));
    }

    #[test]
    fn malformed_price_is_data_format() {
        let dir = TempDir::new().unwrap();
        let ts = day_start_ms(date(2025, 1, 15));
        fs::write(
            dir.path().join("bad.csv"),
            format!("timestamp_ms,price,market_cap,volume\n{ts},abc,1,1\n"),
        )
        .unwrap();
        let adapter = CsvAdapter::new(dir.path().to_path_buf());

        let result = adapter.fetch_series("bad", date(2025, 1, 1), date(2025, 1, 31));
        assert!(matches!(result, Err(ExplodersError::DataFormat { .. })));
    }

    #[test]
    fn empty_file_yields_empty_series() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);
        let raw = adapter
            .fetch_series("bonk", date(2025, 1, 1), date(2025, 1, 31))
            .unwrap();
        assert!(raw.prices.is_empty());
    }

    #[test]
    fn list_assets_returns_sorted_stems() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);
        assert_eq!(adapter.list_assets().unwrap(), vec!["bonk", "pepe"]);
    }

    #[test]
    fn list_assets_missing_dir_is_io_error() {
        let adapter = CsvAdapter::new(PathBuf::from("/nonexistent/exploders/data"));
        assert!(matches!(adapter.list_assets(), Err(ExplodersError::Io(_))));
    }
}
