//! Result persistence port trait.

use std::path::Path;

use crate::domain::backtest::BacktestResult;
use crate::domain::error::ExplodersError;
use crate::domain::run_record::RunRecord;

/// Port for handing a finished run to the persistence/serving side.
pub trait ReportPort {
    fn write(
        &self,
        result: &BacktestResult,
        record: &RunRecord,
        output_dir: &Path,
    ) -> Result<(), ExplodersError>;
}
