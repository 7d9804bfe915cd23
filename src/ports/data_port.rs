//! Market data access port.

use crate::domain::error::ExplodersError;
use crate::domain::market_chart::RawSeries;
use chrono::NaiveDate;

/// A source of raw per-asset market charts.
///
/// Implementations resolve their own transport failures. A provider that
/// cannot deliver an asset returns [`ExplodersError::Unavailable`]; callers
/// treat that as the asset being absent, never as a fatal error.
pub trait DataPort {
    fn fetch_series(
        &self,
        asset: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<RawSeries, ExplodersError>;

    fn list_assets(&self) -> Result<Vec<String>, ExplodersError>;

    /// Short provider name used in logs.
    fn name(&self) -> &str {
        "data"
    }
}
