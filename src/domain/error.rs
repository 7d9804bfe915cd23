//! Domain error types.

/// Top-level error type for exploders.
#[derive(Debug, thiserror::Error)]
pub enum ExplodersError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("data unavailable for {asset}: {reason}")]
    Unavailable { asset: String, reason: String },

    #[error("malformed data: {reason}")]
    DataFormat { reason: String },

    #[error("insufficient data for {asset}: have {days} days, need {minimum}")]
    InsufficientData {
        asset: String,
        days: usize,
        minimum: usize,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&ExplodersError> for std::process::ExitCode {
    fn from(err: &ExplodersError) -> Self {
        let code: u8 = match err {
            ExplodersError::Io(_) => 1,
            ExplodersError::ConfigParse { .. }
            | ExplodersError::ConfigMissing { .. }
            | ExplodersError::ConfigInvalid { .. } => 2,
            ExplodersError::Unavailable { .. } | ExplodersError::DataFormat { .. } => 3,
            ExplodersError::InsufficientData { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_insufficient_data() {
        let err = ExplodersError::InsufficientData {
            asset: "pepe".into(),
            days: 7,
            minimum: 19,
        };
        assert_eq!(
            err.to_string(),
            "insufficient data for pepe: have 7 days, need 19"
        );
    }

    #[test]
    fn display_config_invalid() {
        let err = ExplodersError::ConfigInvalid {
            section: "backtest".into(),
            key: "risk_pct".into(),
            reason: "risk_pct must be between 0 and 1".into(),
        };
        assert_eq!(
            err.to_string(),
            "invalid config value [backtest] risk_pct: risk_pct must be between 0 and 1"
        );
    }

    #[test]
    fn io_error_converts() {
        let io = std::io::Error::other("disk full");
        let err: ExplodersError = io.into();
        assert!(matches!(err, ExplodersError::Io(_)));
    }
}
