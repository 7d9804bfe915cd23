//! Configuration validation.
//!
//! Validates every `[backtest]`, `[strategy]` and `[data]` key before a run.
//! Present-but-unparseable numbers are reported as invalid rather than
//! silently replaced by their defaults.

use crate::domain::backtest::StopPolicy;
use crate::domain::error::ExplodersError;
use crate::domain::universe::parse_assets;
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;

pub fn validate_backtest_config(config: &dyn ConfigPort) -> Result<(), ExplodersError> {
    validate_dates(config)?;
    validate_initial_equity(config)?;
    validate_risk_pct(config)?;
    require_int_at_least(config, "backtest", "max_concurrent", 5, 1)?;
    require_int_at_least(config, "backtest", "max_hold_days", 10, 1)?;
    validate_payoff_multiple(config)?;
    validate_stop_triggering(config)?;
    Ok(())
}

pub fn validate_strategy_config(config: &dyn ConfigPort) -> Result<(), ExplodersError> {
    require_positive(config, "strategy", "one_day_pump", 2.0)?;
    require_positive(config, "strategy", "two_day_pump", 2.0)?;
    require_non_negative(config, "strategy", "vol_mult_min", 2.0)?;
    require_int_at_least(config, "strategy", "confirm_window", 5, 1)?;
    require_int_at_least(config, "strategy", "atr_len", 14, 1)?;
    require_int_at_least(config, "strategy", "vol_ma_len", 10, 1)?;
    require_int_at_least(config, "strategy", "min_history_extra", 5, 0)?;
    validate_market_cap_band(config)?;
    require_fraction(config, "strategy", "fee_per_side", 0.005)?;
    require_non_negative(config, "strategy", "atr_mult_stop", 3.0)?;
    require_fraction(config, "strategy", "stop_floor_pct", 0.25)?;
    Ok(())
}

pub fn validate_data_config(config: &dyn ConfigPort) -> Result<(), ExplodersError> {
    require_int_at_least(config, "data", "workers", 10, 1)?;
    require_int_at_least(config, "data", "max_attempts", 6, 1)?;
    require_int_at_least(config, "data", "retry_base_ms", 0, 0)?;
    validate_data_dirs(config)?;
    validate_assets(config)?;
    Ok(())
}

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> ExplodersError {
    ExplodersError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

/// Reads a float, falling back to `default` when the key is absent.
pub fn read_double(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: f64,
) -> Result<f64, ExplodersError> {
    match config.get_string(section, key) {
        None => Ok(default),
        Some(raw) => match raw.trim().parse::<f64>() {
            Ok(v) if v.is_finite() => Ok(v),
            _ => Err(invalid(section, key, format!("'{raw}' is not a number"))),
        },
    }
}

/// Reads an integer, falling back to `default` when the key is absent.
pub fn read_int(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: i64,
) -> Result<i64, ExplodersError> {
    match config.get_string(section, key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse::<i64>()
            .map_err(|_| invalid(section, key, format!("'{raw}' is not an integer"))),
    }
}

/// Parses a required `YYYY-MM-DD` date.
pub fn read_date(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<NaiveDate, ExplodersError> {
    match config.get_string(section, key) {
        None => Err(ExplodersError::ConfigMissing {
            section: section.to_string(),
            key: key.to_string(),
        }),
        Some(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(|_| {
            invalid(section, key, format!("invalid {key} format, expected YYYY-MM-DD"))
        }),
    }
}

fn validate_dates(config: &dyn ConfigPort) -> Result<(), ExplodersError> {
    let start_date = read_date(config, "backtest", "start_date")?;
    let end_date = read_date(config, "backtest", "end_date")?;

    if start_date > end_date {
        return Err(invalid(
            "backtest",
            "start_date",
            "start_date must not be after end_date",
        ));
    }
    Ok(())
}

fn validate_initial_equity(config: &dyn ConfigPort) -> Result<(), ExplodersError> {
    let value = read_double(config, "backtest", "initial_equity", 100.0)?;
    if value <= 0.0 {
        return Err(invalid(
            "backtest",
            "initial_equity",
            "initial_equity must be positive",
        ));
    }
    Ok(())
}

fn validate_risk_pct(config: &dyn ConfigPort) -> Result<(), ExplodersError> {
    let value = read_double(config, "backtest", "risk_pct", 0.02)?;
    if value <= 0.0 || value > 1.0 {
        return Err(invalid(
            "backtest",
            "risk_pct",
            "risk_pct must be in (0, 1]",
        ));
    }
    Ok(())
}

fn validate_payoff_multiple(config: &dyn ConfigPort) -> Result<(), ExplodersError> {
    let value = read_double(config, "backtest", "payoff_multiple", 0.1)?;
    if value <= -1.0 {
        return Err(invalid(
            "backtest",
            "payoff_multiple",
            "payoff_multiple must be greater than -1",
        ));
    }
    Ok(())
}

fn validate_stop_triggering(config: &dyn ConfigPort) -> Result<(), ExplodersError> {
    if let Some(raw) = config.get_string("backtest", "stop_triggering") {
        raw.parse::<StopPolicy>()
            .map_err(|reason| invalid("backtest", "stop_triggering", reason))?;
    }
    Ok(())
}

fn validate_market_cap_band(config: &dyn ConfigPort) -> Result<(), ExplodersError> {
    let min = require_non_negative(config, "strategy", "mcap_min", 2_000_000.0)?;
    let max = read_double(config, "strategy", "mcap_max", 100_000_000.0)?;
    if max < min {
        return Err(invalid(
            "strategy",
            "mcap_max",
            "mcap_max must not be below mcap_min",
        ));
    }
    Ok(())
}

fn validate_data_dirs(config: &dyn ConfigPort) -> Result<(), ExplodersError> {
    if let Some(raw) = config.get_string("data", "dir") {
        if raw.split(',').all(|d| d.trim().is_empty()) {
            return Err(invalid("data", "dir", "dir must name at least one directory"));
        }
    }
    Ok(())
}

fn validate_assets(config: &dyn ConfigPort) -> Result<(), ExplodersError> {
    if let Some(raw) = config.get_string("data", "assets") {
        if !raw.trim().is_empty() {
            parse_assets(&raw).map_err(|e| invalid("data", "assets", e.to_string()))?;
        }
    }
    Ok(())
}

fn require_positive(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: f64,
) -> Result<f64, ExplodersError> {
    let value = read_double(config, section, key, default)?;
    if value <= 0.0 {
        return Err(invalid(section, key, format!("{key} must be positive")));
    }
    Ok(value)
}

fn require_non_negative(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: f64,
) -> Result<f64, ExplodersError> {
    let value = read_double(config, section, key, default)?;
    if value < 0.0 {
        return Err(invalid(section, key, format!("{key} must be non-negative")));
    }
    Ok(value)
}

fn require_fraction(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: f64,
) -> Result<f64, ExplodersError> {
    let value = read_double(config, section, key, default)?;
    if !(0.0..1.0).contains(&value) {
        return Err(invalid(section, key, format!("{key} must be in [0, 1)")));
    }
    Ok(value)
}

fn require_int_at_least(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: i64,
    min: i64,
) -> Result<i64, ExplodersError> {
    let value = read_int(config, section, key, default)?;
    if value < min {
        return Err(invalid(section, key, format!("{key} must be at least {min}")));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::file_config_adapter::FileConfigAdapter;

    fn make_config(content: &str) -> FileConfigAdapter {
        FileConfigAdapter::from_string(content).unwrap()
    }

    const DATES: &str = "[backtest]\nstart_date = 2025-03-16\nend_date = 2025-09-15\n";

    fn backtest_with(extra: &str) -> FileConfigAdapter {
        make_config(&format!("{DATES}{extra}"))
    }

    #[test]
    fn valid_backtest_config_passes() {
        let config = make_config(
            r#"
[backtest]
start_date = 2025-03-16
end_date = 2025-09-15
initial_equity = 100.0
risk_pct = 0.02
max_concurrent = 5
max_hold_days = 10
payoff_multiple = 0.1
stop_triggering = disabled
"#,
        );
        assert!(validate_backtest_config(&config).is_ok());
    }

    #[test]
    fn dates_only_uses_defaults() {
        assert!(validate_backtest_config(&backtest_with("")).is_ok());
    }

    #[test]
    fn single_day_window_is_allowed() {
        let config = make_config("[backtest]\nstart_date = 2025-03-16\nend_date = 2025-03-16\n");
        assert!(validate_backtest_config(&config).is_ok());
    }

    #[test]
    fn missing_start_date_fails() {
        let config = make_config("[backtest]\nend_date = 2025-09-15\n");
        let err = validate_backtest_config(&config).unwrap_err();
        assert!(matches!(err, ExplodersError::ConfigMissing { key, .. } if key == "start_date"));
    }

    #[test]
    fn invalid_end_date_format_fails() {
        let config = make_config("[backtest]\nstart_date = 2025-03-16\nend_date = 15/09/2025\n");
        let err = validate_backtest_config(&config).unwrap_err();
        assert!(matches!(err, ExplodersError::ConfigInvalid { key, .. } if key == "end_date"));
    }

    #[test]
    fn start_after_end_fails() {
        let config = make_config("[backtest]\nstart_date = 2025-09-16\nend_date = 2025-09-15\n");
        let err = validate_backtest_config(&config).unwrap_err();
        assert!(matches!(err, ExplodersError::ConfigInvalid { key, .. } if key == "start_date"));
    }

    #[test]
    fn initial_equity_must_be_positive() {
        let err = validate_backtest_config(&backtest_with("initial_equity = 0\n")).unwrap_err();
        assert!(matches!(err, ExplodersError::ConfigInvalid { key, .. } if key == "initial_equity"));
    }

    #[test]
    fn non_numeric_value_is_invalid() {
        let err =
            validate_backtest_config(&backtest_with("initial_equity = lots\n")).unwrap_err();
        assert!(matches!(err, ExplodersError::ConfigInvalid { key, .. } if key == "initial_equity"));
    }

    #[test]
    fn risk_pct_bounds() {
        for bad in ["0", "-0.1", "1.5"] {
            let err = validate_backtest_config(&backtest_with(&format!("risk_pct = {bad}\n")))
                .unwrap_err();
            assert!(matches!(err, ExplodersError::ConfigInvalid { key, .. } if key == "risk_pct"));
        }
        assert!(validate_backtest_config(&backtest_with("risk_pct = 1.0\n")).is_ok());
    }

    #[test]
    fn max_concurrent_zero_fails() {
        let err = validate_backtest_config(&backtest_with("max_concurrent = 0\n")).unwrap_err();
        assert!(matches!(err, ExplodersError::ConfigInvalid { key, .. } if key == "max_concurrent"));
    }

    #[test]
    fn max_hold_days_zero_fails() {
        let err = validate_backtest_config(&backtest_with("max_hold_days = 0\n")).unwrap_err();
        assert!(matches!(err, ExplodersError::ConfigInvalid { key, .. } if key == "max_hold_days"));
    }

    #[test]
    fn unknown_stop_policy_fails() {
        let err =
            validate_backtest_config(&backtest_with("stop_triggering = sometimes\n")).unwrap_err();
        assert!(
            matches!(err, ExplodersError::ConfigInvalid { key, .. } if key == "stop_triggering")
        );
        assert!(validate_backtest_config(&backtest_with("stop_triggering = enabled\n")).is_ok());
    }

    #[test]
    fn empty_strategy_section_uses_defaults() {
        assert!(validate_strategy_config(&make_config("[strategy]\n")).is_ok());
    }

    #[test]
    fn full_strategy_config_passes() {
        let config = make_config(
            r#"
[strategy]
one_day_pump = 2.0
two_day_pump = 2.0
vol_mult_min = 2.0
confirm_window = 5
atr_len = 14
vol_ma_len = 10
min_history_extra = 5
mcap_min = 2000000
mcap_max = 100000000
fee_per_side = 0.005
atr_mult_stop = 3.0
stop_floor_pct = 0.25
"#,
        );
        assert!(validate_strategy_config(&config).is_ok());
    }

    #[test]
    fn pump_must_be_positive() {
        let err = validate_strategy_config(&make_config("[strategy]\none_day_pump = 0\n"))
            .unwrap_err();
        assert!(matches!(err, ExplodersError::ConfigInvalid { key, .. } if key == "one_day_pump"));
    }

    #[test]
    fn atr_len_zero_fails() {
        let err =
            validate_strategy_config(&make_config("[strategy]\natr_len = 0\n")).unwrap_err();
        assert!(matches!(err, ExplodersError::ConfigInvalid { key, .. } if key == "atr_len"));
    }

    #[test]
    fn inverted_market_cap_band_fails() {
        let err = validate_strategy_config(&make_config(
            "[strategy]\nmcap_min = 5000000\nmcap_max = 1000000\n",
        ))
        .unwrap_err();
        assert!(matches!(err, ExplodersError::ConfigInvalid { key, .. } if key == "mcap_max"));
    }

    #[test]
    fn fee_must_be_fraction() {
        let err =
            validate_strategy_config(&make_config("[strategy]\nfee_per_side = 1.0\n")).unwrap_err();
        assert!(matches!(err, ExplodersError::ConfigInvalid { key, .. } if key == "fee_per_side"));
    }

    #[test]
    fn data_defaults_pass() {
        assert!(validate_data_config(&make_config("[data]\n")).is_ok());
    }

    #[test]
    fn workers_zero_fails() {
        let err = validate_data_config(&make_config("[data]\nworkers = 0\n")).unwrap_err();
        assert!(matches!(err, ExplodersError::ConfigInvalid { key, .. } if key == "workers"));
    }

    #[test]
    fn duplicate_assets_fail() {
        let err =
            validate_data_config(&make_config("[data]\nassets = pepe,bonk,Pepe\n")).unwrap_err();
        assert!(matches!(err, ExplodersError::ConfigInvalid { key, .. } if key == "assets"));
    }

    #[test]
    fn dir_list_of_only_separators_fails() {
        let err = validate_data_config(&make_config("[data]\ndir = , ,\n")).unwrap_err();
        assert!(matches!(err, ExplodersError::ConfigInvalid { key, .. } if key == "dir"));
        assert!(validate_data_config(&make_config("[data]\ndir = a, b\n")).is_ok());
    }

    #[test]
    fn read_helpers_default_when_absent() {
        let config = make_config("[data]\n");
        assert_eq!(read_int(&config, "data", "workers", 10).unwrap(), 10);
        assert_eq!(read_double(&config, "data", "x", 1.5).unwrap(), 1.5);
    }
}
