//! CLI definition and dispatch.

use chrono::Utc;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;
use tracing::{info, warn};

use crate::adapters::combined_adapter::{CombinedDataPort, SharedDataPort};
use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::csv_report_adapter::CsvReportAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::retry_adapter::RetryingDataPort;
use crate::domain::backtest::{run_backtest, BacktestConfig, BacktestResult, StopPolicy};
use crate::domain::config_validation::{
    read_date, read_double, read_int, validate_backtest_config, validate_data_config,
    validate_strategy_config,
};
use crate::domain::error::ExplodersError;
use crate::domain::run_record::RunRecord;
use crate::domain::scan::scan_universe;
use crate::domain::strategy::StrategyParams;
use crate::domain::universe::parse_assets;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(
    name = "exploders",
    about = "Momentum-continuation backtester for crypto market charts"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a backtest
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        /// Directory of `<asset>.csv` market charts, replacing [data] dir
        #[arg(long)]
        data_dir: Option<PathBuf>,
        /// Comma-separated asset ids, overriding [data] assets
        #[arg(long)]
        assets: Option<String>,
        /// Output directory for result CSVs
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long)]
        dry_run: bool,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// List the assets the data directory offers
    ListAssets {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },
}

/// `[data]` section after defaults are applied.
#[derive(Debug, Clone, PartialEq)]
pub struct DataConfig {
    /// CSV directories in priority order.
    pub dirs: Vec<PathBuf>,
    pub assets: Option<Vec<String>>,
    pub workers: usize,
    pub max_attempts: u32,
    pub retry_base: Duration,
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Backtest {
            config,
            data_dir,
            assets,
            output,
            dry_run,
        } => {
            if dry_run {
                run_dry_run(&config, data_dir.as_deref(), assets.as_deref())
            } else {
                run_backtest_command(
                    &config,
                    data_dir.as_deref(),
                    assets.as_deref(),
                    output.as_deref(),
                )
            }
        }
        Command::Validate { config } => run_validate(&config),
        Command::ListAssets { config, data_dir } => run_list_assets(&config, data_dir.as_deref()),
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| {
        let err = ExplodersError::ConfigParse {
            file: path.display().to_string(),
            reason: e.to_string(),
        };
        eprintln!("error: {err}");
        ExitCode::from(&err)
    })
}

pub fn validate_all(config: &dyn ConfigPort) -> Result<(), ExplodersError> {
    validate_backtest_config(config)?;
    validate_strategy_config(config)?;
    validate_data_config(config)?;
    Ok(())
}

pub fn build_backtest_config(config: &dyn ConfigPort) -> Result<BacktestConfig, ExplodersError> {
    let start_date = read_date(config, "backtest", "start_date")?;
    let end_date = read_date(config, "backtest", "end_date")?;

    let stop_policy = match config.get_string("backtest", "stop_triggering") {
        Some(raw) => raw
            .parse::<StopPolicy>()
            .map_err(|reason| ExplodersError::ConfigInvalid {
                section: "backtest".into(),
                key: "stop_triggering".into(),
                reason,
            })?,
        None => StopPolicy::default(),
    };

    Ok(BacktestConfig {
        start_date,
        end_date,
        initial_equity: read_double(config, "backtest", "initial_equity", 100.0)?,
        risk_pct: read_double(config, "backtest", "risk_pct", 0.02)?,
        max_concurrent: read_int(config, "backtest", "max_concurrent", 5)?.max(0) as usize,
        max_hold_days: read_int(config, "backtest", "max_hold_days", 10)?.max(0) as u32,
        payoff_multiple: read_double(config, "backtest", "payoff_multiple", 0.1)?,
        stop_policy,
    })
}

pub fn build_strategy_params(config: &dyn ConfigPort) -> Result<StrategyParams, ExplodersError> {
    let d = StrategyParams::default();
    let count = |key: &str, default: usize| -> Result<usize, ExplodersError> {
        Ok(read_int(config, "strategy", key, default as i64)?.max(0) as usize)
    };

    Ok(StrategyParams {
        one_day_pump: read_double(config, "strategy", "one_day_pump", d.one_day_pump)?,
        two_day_pump: read_double(config, "strategy", "two_day_pump", d.two_day_pump)?,
        vol_mult_min: read_double(config, "strategy", "vol_mult_min", d.vol_mult_min)?,
        confirm_window: count("confirm_window", d.confirm_window)?,
        atr_len: count("atr_len", d.atr_len)?,
        vol_ma_len: count("vol_ma_len", d.vol_ma_len)?,
        min_history_extra: count("min_history_extra", d.min_history_extra)?,
        mcap_min: read_double(config, "strategy", "mcap_min", d.mcap_min)?,
        mcap_max: read_double(config, "strategy", "mcap_max", d.mcap_max)?,
        fee_per_side: read_double(config, "strategy", "fee_per_side", d.fee_per_side)?,
        atr_mult_stop: read_double(config, "strategy", "atr_mult_stop", d.atr_mult_stop)?,
        stop_floor_pct: read_double(config, "strategy", "stop_floor_pct", d.stop_floor_pct)?,
    })
}

pub fn build_data_config(
    config: &dyn ConfigPort,
    data_dir_override: Option<&Path>,
) -> Result<DataConfig, ExplodersError> {
    let dirs = match data_dir_override {
        Some(d) => vec![d.to_path_buf()],
        None => {
            let raw = config
                .get_string("data", "dir")
                .unwrap_or_else(|| "data".to_string());
            raw.split(',')
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(PathBuf::from)
                .collect()
        }
    };

    let assets = match config.get_string("data", "assets") {
        Some(raw) if !raw.trim().is_empty() => {
            Some(parse_assets(&raw).map_err(|e| ExplodersError::ConfigInvalid {
                section: "data".into(),
                key: "assets".into(),
                reason: e.to_string(),
            })?)
        }
        _ => None,
    };

    Ok(DataConfig {
        dirs,
        assets,
        workers: read_int(config, "data", "workers", 10)?.max(1) as usize,
        max_attempts: read_int(config, "data", "max_attempts", 6)?.clamp(1, u32::MAX as i64) as u32,
        retry_base: Duration::from_millis(read_int(config, "data", "retry_base_ms", 0)?.max(0) as u64),
    })
}

/// Picks the asset universe: the CLI override, then `[data] assets`, then
/// everything the data port lists.
pub fn resolve_assets(
    assets_override: Option<&str>,
    data: &DataConfig,
    port: &dyn DataPort,
) -> Result<Vec<String>, ExplodersError> {
    if let Some(raw) = assets_override {
        return parse_assets(raw).map_err(|e| ExplodersError::ConfigInvalid {
            section: "data".into(),
            key: "assets".into(),
            reason: e.to_string(),
        });
    }

    if let Some(assets) = &data.assets {
        return Ok(assets.clone());
    }

    port.list_assets()
}

/// Scans the universe, simulates the portfolio and returns the result with
/// its run record.
pub fn run_pipeline(
    port: &(dyn DataPort + Sync),
    assets: &[String],
    params: &StrategyParams,
    bt_config: &BacktestConfig,
    workers: usize,
) -> Result<(BacktestResult, RunRecord), ExplodersError> {
    let started_at = Utc::now();
    let window = bt_config.window();

    let scan = scan_universe(port, assets, params, window, workers, bt_config.stop_policy)?;
    if scan.scanned == 0 && !assets.is_empty() {
        warn!("no asset produced usable data; the equity curve will be flat");
    }

    info!(
        candidates = scan.entries.len(),
        start = %bt_config.start_date,
        end = %bt_config.end_date,
        "running portfolio simulation"
    );
    let result = run_backtest(&scan.entries, &scan.prices, bt_config);
    let record = RunRecord::new(started_at, assets.len(), &scan, &result);

    Ok((result, record))
}

/// One retrying CSV provider per configured directory, merged in order.
pub fn data_port_for(data: &DataConfig) -> CombinedDataPort {
    let providers = data
        .dirs
        .iter()
        .map(|dir| {
            Box::new(RetryingDataPort::new(
                CsvAdapter::new(dir.clone()),
                data.max_attempts,
                data.retry_base,
            )) as SharedDataPort
        })
        .collect();
    CombinedDataPort::new(providers)
}

impl DataConfig {
    fn dirs_display(&self) -> String {
        self.dirs
            .iter()
            .map(|d| d.display().to_string())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

struct Setup {
    bt_config: BacktestConfig,
    params: StrategyParams,
    data: DataConfig,
    adapter: FileConfigAdapter,
}

fn prepare(config_path: &Path, data_dir: Option<&Path>) -> Result<Setup, ExitCode> {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = load_config(config_path)?;

    let built = validate_all(&adapter).and_then(|()| {
        Ok((
            build_backtest_config(&adapter)?,
            build_strategy_params(&adapter)?,
            build_data_config(&adapter, data_dir)?,
        ))
    });

    match built {
        Ok((bt_config, params, data)) => Ok(Setup {
            bt_config,
            params,
            data,
            adapter,
        }),
        Err(e) => {
            eprintln!("error: {e}");
            Err((&e).into())
        }
    }
}

fn run_backtest_command(
    config_path: &Path,
    data_dir: Option<&Path>,
    assets_override: Option<&str>,
    output: Option<&Path>,
) -> ExitCode {
    let setup = match prepare(config_path, data_dir) {
        Ok(s) => s,
        Err(code) => return code,
    };

    let port = data_port_for(&setup.data);
    let assets = match resolve_assets(assets_override, &setup.data, &port) {
        Ok(a) => a,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    if assets.is_empty() {
        eprintln!("error: no assets configured or found in {}", setup.data.dirs_display());
        return ExitCode::from(2);
    }

    eprintln!(
        "Running backtest: {} assets, {} to {}",
        assets.len(),
        setup.bt_config.start_date,
        setup.bt_config.end_date,
    );

    let (result, record) = match run_pipeline(
        &port,
        &assets,
        &setup.params,
        &setup.bt_config,
        setup.data.workers,
    ) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    print_summary(&record);

    let output_dir = output.map(Path::to_path_buf).unwrap_or_else(|| {
        PathBuf::from(
            setup
                .adapter
                .get_string("report", "output_dir")
                .unwrap_or_else(|| "results".to_string()),
        )
    });

    match CsvReportAdapter.write(&result, &record, &output_dir) {
        Ok(()) => {
            eprintln!("\nResults written to: {}", output_dir.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: failed to write results: {e}");
            (&e).into()
        }
    }
}

pub fn print_summary(record: &RunRecord) {
    let s = &record.summary;

    eprintln!("\n=== Universe ===");
    eprintln!("Assets requested: {}", record.assets_requested);
    eprintln!("Assets scanned:   {}", record.assets_scanned);
    eprintln!("Assets skipped:   {}", record.skipped.len());
    eprintln!("Candidates:       {}", record.candidates);
    eprintln!("Rejected:         {}", record.rejected());
    for (reason, count) in &record.rejections {
        eprintln!("  rejected {reason}: {count}");
    }

    eprintln!("\n=== Aggregate Results ===");
    eprintln!("Initial Equity:   {:.2}", s.initial_equity);
    eprintln!("Final Equity:     {:.2}", s.final_equity);
    eprintln!("Total Return:     {:.2}%", s.total_return * 100.0);
    eprintln!("Max Drawdown:     -{:.1}%", s.max_drawdown * 100.0);
    eprintln!("Total Trades:     {}", s.total_trades);
    eprintln!("Win Rate:         {:.1}%", s.win_rate * 100.0);
    eprintln!("Total PnL:        {:.2}", s.total_pnl);
    eprintln!("Open at End:      {}", s.open_positions_at_end);
    if let (Some(first), Some(last)) = (s.first_trade_date, s.last_trade_date) {
        eprintln!("Trading Span:     {} to {}", first, last);
    }
    eprintln!("Elapsed:          {} ms", record.elapsed_ms());
}

pub fn run_dry_run(
    config_path: &Path,
    data_dir: Option<&Path>,
    assets_override: Option<&str>,
) -> ExitCode {
    let setup = match prepare(config_path, data_dir) {
        Ok(s) => s,
        Err(code) => return code,
    };
    eprintln!("Config validated successfully");

    let bt = &setup.bt_config;
    let p = &setup.params;
    eprintln!("\nBacktest:");
    eprintln!("  window:          {} to {} ({} days)", bt.start_date, bt.end_date, bt.window().day_count());
    eprintln!("  initial equity:  {:.2}", bt.initial_equity);
    eprintln!("  risk per trade:  {:.2}%", bt.risk_pct * 100.0);
    eprintln!("  max concurrent:  {}", bt.max_concurrent);
    eprintln!("  max hold days:   {}", bt.max_hold_days);
    eprintln!("  payoff multiple: {}", bt.payoff_multiple);
    eprintln!("  stops:           {}", bt.stop_policy);

    eprintln!("\nStrategy:");
    eprintln!("  pumps:           1d {} / 2d {}", p.one_day_pump, p.two_day_pump);
    eprintln!("  confirmation:    {} days, volume x{}", p.confirm_window, p.vol_mult_min);
    eprintln!("  market cap band: {} to {}", p.mcap_min, p.mcap_max);
    eprintln!("  stop:            {} x ATR({}), floor {}%", p.atr_mult_stop, p.atr_len, p.stop_floor_pct * 100.0);
    eprintln!("  min history:     {} days", p.min_valid_days());

    let port = data_port_for(&setup.data);
    eprintln!("\nUniverse:");
    eprintln!("  data dirs: {}", setup.data.dirs_display());
    match resolve_assets(assets_override, &setup.data, &port) {
        Ok(assets) => eprintln!("  assets:    {}", assets.join(", ")),
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    }

    eprintln!("\nDry run complete: configuration is valid");
    ExitCode::SUCCESS
}

fn run_validate(config_path: &Path) -> ExitCode {
    eprintln!("Validating config: {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    match validate_all(&adapter) {
        Ok(()) => {
            eprintln!("Configuration is valid.");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

fn run_list_assets(config_path: &Path, data_dir: Option<&Path>) -> ExitCode {
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    let data = match build_data_config(&adapter, data_dir) {
        Ok(d) => d,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    let assets = match data_port_for(&data).list_assets() {
        Ok(a) => a,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    if assets.is_empty() {
        eprintln!("No assets found in {}", data.dirs_display());
    } else {
        for asset in &assets {
            println!("{}", asset);
        }
        eprintln!("{} assets found", assets.len());
    }
    ExitCode::SUCCESS
}
