//! Breakout detection and continuation confirmation.

use crate::domain::series::DerivedSeries;
use crate::domain::strategy::StrategyParams;

/// First row at which a two-day return exists.
pub const FIRST_SIGNAL_INDEX: usize = 2;

/// Yields every row where the close at least reached the pump multiple over
/// one or two rows. Rows are visited in order and only data up to the
/// yielded row is read.
pub fn detect_signals<'a>(
    series: &'a DerivedSeries,
    params: &'a StrategyParams,
) -> impl Iterator<Item = usize> + 'a {
    (FIRST_SIGNAL_INDEX..series.len()).filter(move |&i| is_breakout(series, i, params))
}

fn is_breakout(series: &DerivedSeries, i: usize, params: &StrategyParams) -> bool {
    let one_day = series.ret1[i].is_some_and(|r| 1.0 + r >= params.one_day_pump);
    let two_day = series.ret2[i].is_some_and(|r| 1.0 + r >= params.two_day_pump);
    one_day || two_day
}

/// First row in `(signal_idx, signal_idx + confirm_window]` with a higher
/// close than the previous row and a volume multiple of at least
/// `vol_mult_min`.
pub fn first_confirmation(
    series: &DerivedSeries,
    signal_idx: usize,
    params: &StrategyParams,
) -> Option<usize> {
    if series.is_empty() {
        return None;
    }
    let last = (signal_idx + params.confirm_window).min(series.len() - 1);

    (signal_idx + 1..=last).find(|&j| {
        if series.close(j) <= series.close(j - 1) {
            return false;
        }
        series
            .volume_multiple(j)
            .is_some_and(|mult| mult >= params.vol_mult_min)
    })
}
