//! Capped retry with exponential backoff around another [`DataPort`].

use std::time::Duration;

use chrono::NaiveDate;
use tracing::{debug, warn};

use crate::domain::error::ExplodersError;
use crate::domain::market_chart::RawSeries;
use crate::ports::data_port::DataPort;

/// Retries `Unavailable` fetches up to `max_attempts` calls in total,
/// sleeping `base_delay * 2^attempt` after each failed attempt. Any other
/// error is returned immediately.
pub struct RetryingDataPort<P> {
    inner: P,
    max_attempts: u32,
    base_delay: Duration,
}

impl<P: DataPort> RetryingDataPort<P> {
    pub fn new(inner: P, max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            inner,
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    fn backoff(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(2u32.saturating_pow(attempt))
    }
}

impl<P: DataPort> DataPort for RetryingDataPort<P> {
    fn fetch_series(
        &self,
        asset: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<RawSeries, ExplodersError> {
        let mut last_reason = String::new();

        for attempt in 0..self.max_attempts {
            match self.inner.fetch_series(asset, start_date, end_date) {
                Ok(series) => return Ok(series),
                Err(ExplodersError::Unavailable { reason, .. }) => {
                    debug!(asset, attempt, %reason, "fetch failed");
                    last_reason = reason;
                    if attempt + 1 < self.max_attempts {
                        std::thread::sleep(self.backoff(attempt));
                    }
                }
                Err(other) => return Err(other),
            }
        }

        warn!(asset, attempts = self.max_attempts, "max retries reached");
        Err(ExplodersError::Unavailable {
            asset: asset.to_string(),
            reason: format!(
                "gave up after {} attempts: {}",
                self.max_attempts, last_reason
            ),
        })
    }

    fn list_assets(&self) -> Result<Vec<String>, ExplodersError> {
        self.inner.list_assets()
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}
