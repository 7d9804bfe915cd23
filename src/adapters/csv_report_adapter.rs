//! CSV result writer implementing [`ReportPort`].
//!
//! Writes four files into the output directory:
//! - `equity_curve.csv`: one `date,equity` row per simulated day
//! - `trades.csv`: closed trades in exit order
//! - `open_positions.csv`: positions still open when the window ended
//! - `run_record.csv`: `key,value` rows describing the run and its summary

use std::fs;
use std::path::Path;

use tracing::info;

use crate::domain::backtest::BacktestResult;
use crate::domain::error::ExplodersError;
use crate::domain::portfolio::EquityPoint;
use crate::domain::position::{Position, Trade};
use crate::domain::run_record::RunRecord;
use crate::ports::report_port::ReportPort;

pub const EQUITY_FILE: &str = "equity_curve.csv";
pub const TRADES_FILE: &str = "trades.csv";
pub const OPEN_POSITIONS_FILE: &str = "open_positions.csv";
pub const RUN_RECORD_FILE: &str = "run_record.csv";

fn finish(wtr: csv::Writer<Vec<u8>>) -> Result<String, ExplodersError> {
    let data = wtr
        .into_inner()
        .map_err(|e| ExplodersError::Io(std::io::Error::other(e.to_string())))?;
    String::from_utf8(data).map_err(|e| ExplodersError::Io(std::io::Error::other(e)))
}

pub fn equity_curve_csv(curve: &[EquityPoint]) -> Result<String, ExplodersError> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["date", "equity"]).map_err(std::io::Error::from)?;
    for point in curve {
        wtr.write_record([&point.date.to_string(), &format!("{:.6}", point.equity)])
            .map_err(std::io::Error::from)?;
    }
    finish(wtr)
}

pub fn trades_csv(trades: &[Trade]) -> Result<String, ExplodersError> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "asset",
        "entry_date",
        "exit_date",
        "entry_price",
        "quantity",
        "pnl",
        "reason",
    ])
    .map_err(std::io::Error::from)?;

    for t in trades {
        wtr.write_record([
            &t.asset,
            &t.entry_date.to_string(),
            &t.exit_date.to_string(),
            &format!("{:.8}", t.entry_price),
            &format!("{:.8}", t.quantity),
            &format!("{:.6}", t.pnl),
            &t.reason.to_string(),
        ])
        .map_err(std::io::Error::from)?;
    }
    finish(wtr)
}

pub fn open_positions_csv(positions: &[Position]) -> Result<String, ExplodersError> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "asset",
        "entry_date",
        "entry_price",
        "stop_price",
        "quantity",
        "bars_held",
    ])
    .map_err(std::io::Error::from)?;

    for p in positions {
        wtr.write_record([
            &p.asset,
            &p.entry_date.to_string(),
            &format!("{:.8}", p.entry_price),
            &format!("{:.8}", p.stop_price),
            &format!("{:.8}", p.quantity),
            &p.bars_held.to_string(),
        ])
        .map_err(std::io::Error::from)?;
    }
    finish(wtr)
}

fn optional_date(date: Option<chrono::NaiveDate>) -> String {
    date.map(|d| d.to_string()).unwrap_or_default()
}

pub fn run_record_csv(record: &RunRecord) -> Result<String, ExplodersError> {
    let s = &record.summary;
    let mut rows: Vec<(String, String)> = vec![
        ("started_at".into(), record.started_at.to_rfc3339()),
        ("finished_at".into(), record.finished_at.to_rfc3339()),
        ("elapsed_ms".into(), record.elapsed_ms().to_string()),
        ("assets_requested".into(), record.assets_requested.to_string()),
        ("assets_scanned".into(), record.assets_scanned.to_string()),
        ("assets_skipped".into(), record.skipped.len().to_string()),
        ("candidates".into(), record.candidates.to_string()),
        ("rejected".into(), record.rejected().to_string()),
        ("initial_equity".into(), format!("{:.6}", s.initial_equity)),
        ("final_equity".into(), format!("{:.6}", s.final_equity)),
        ("total_return".into(), format!("{:.6}", s.total_return)),
        ("total_trades".into(), s.total_trades.to_string()),
        ("wins".into(), s.wins.to_string()),
        ("losses".into(), s.losses.to_string()),
        ("win_rate".into(), format!("{:.6}", s.win_rate)),
        ("total_pnl".into(), format!("{:.6}", s.total_pnl)),
        ("max_drawdown".into(), format!("{:.6}", s.max_drawdown)),
        ("open_positions_at_end".into(), s.open_positions_at_end.to_string()),
        ("first_trade_date".into(), optional_date(s.first_trade_date)),
        ("last_trade_date".into(), optional_date(s.last_trade_date)),
    ];
    for (reason, count) in &record.rejections {
        rows.push((format!("rejected_{reason}"), count.to_string()));
    }
    for skipped in &record.skipped {
        rows.push((format!("skipped_{}", skipped.asset), skipped.reason.to_string()));
    }

    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["key", "value"]).map_err(std::io::Error::from)?;
    for (key, value) in &rows {
        wtr.write_record([key, value]).map_err(std::io::Error::from)?;
    }
    finish(wtr)
}

pub struct CsvReportAdapter;

impl ReportPort for CsvReportAdapter {
    fn write(
        &self,
        result: &BacktestResult,
        record: &RunRecord,
        output_dir: &Path,
    ) -> Result<(), ExplodersError> {
        fs::create_dir_all(output_dir)?;

        fs::write(
            output_dir.join(EQUITY_FILE),
            equity_curve_csv(&result.portfolio.equity_curve)?,
        )?;
        fs::write(
            output_dir.join(TRADES_FILE),
            trades_csv(&result.portfolio.trades)?,
        )?;
        fs::write(
            output_dir.join(OPEN_POSITIONS_FILE),
            open_positions_csv(result.open_positions())?,
        )?;
        fs::write(output_dir.join(RUN_RECORD_FILE), run_record_csv(record)?)?;

        info!(dir = %output_dir.display(), "results written");
        Ok(())
    }
}
