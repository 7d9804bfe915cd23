//! End-of-run summary statistics.

use super::backtest::BacktestResult;
use super::portfolio::EquityPoint;
use chrono::NaiveDate;

#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub initial_equity: f64,
    pub final_equity: f64,
    pub total_return: f64,
    pub total_trades: usize,
    pub wins: usize,
    pub losses: usize,
    pub win_rate: f64,
    pub total_pnl: f64,
    pub avg_win: f64,
    pub avg_loss: f64,
    pub max_drawdown: f64,
    pub max_drawdown_duration: i64,
    pub avg_hold_days: f64,
    pub open_positions_at_end: usize,
    pub first_trade_date: Option<NaiveDate>,
    pub last_trade_date: Option<NaiveDate>,
}

impl Summary {
    pub fn compute(result: &BacktestResult) -> Self {
        let portfolio = &result.portfolio;
        let trades = &portfolio.trades;
        let initial_equity = portfolio.initial_equity;

        let final_equity = portfolio
            .equity_curve
            .last()
            .map(|p| p.equity)
            .unwrap_or(initial_equity);

        let total_return = if initial_equity > 0.0 {
            (final_equity - initial_equity) / initial_equity
        } else {
            0.0
        };

        let (max_drawdown, max_drawdown_duration) = compute_drawdown(&portfolio.equity_curve);

        let mut wins = 0usize;
        let mut losses = 0usize;
        let mut total_wins = 0.0_f64;
        let mut total_losses = 0.0_f64;
        let mut total_hold_days = 0i64;

        for trade in trades {
            if trade.pnl > 0.0 {
                wins += 1;
                total_wins += trade.pnl;
            } else if trade.pnl < 0.0 {
                losses += 1;
                total_losses += trade.pnl.abs();
            }
            total_hold_days += (trade.exit_date - trade.entry_date).num_days();
        }

        let total_trades = trades.len();
        let win_rate = if total_trades > 0 {
            wins as f64 / total_trades as f64
        } else {
            0.0
        };

        let avg_win = if wins > 0 { total_wins / wins as f64 } else { 0.0 };
        let avg_loss = if losses > 0 {
            total_losses / losses as f64
        } else {
            0.0
        };
        let avg_hold_days = if total_trades > 0 {
            total_hold_days as f64 / total_trades as f64
        } else {
            0.0
        };

        Summary {
            initial_equity,
            final_equity,
            total_return,
            total_trades,
            wins,
            losses,
            win_rate,
            total_pnl: portfolio.realized_pnl(),
            avg_win,
            avg_loss,
            max_drawdown,
            max_drawdown_duration,
            avg_hold_days,
            open_positions_at_end: portfolio.positions.len(),
            first_trade_date: trades.iter().map(|t| t.entry_date).min(),
            last_trade_date: trades.iter().map(|t| t.exit_date).max(),
        }
    }
}

/// Largest peak-to-trough decline as a fraction of the peak, and the longest
/// run of days spent below a peak.
pub fn compute_drawdown(equity_curve: &[EquityPoint]) -> (f64, i64) {
    let Some(first) = equity_curve.first() else {
        return (0.0, 0);
    };

    let mut peak = first.equity;
    let mut max_dd = 0.0_f64;
    let mut max_dd_duration = 0i64;
    let mut current_dd_duration = 0i64;

    for point in equity_curve {
        if point.equity >= peak {
            peak = point.equity;
            current_dd_duration = 0;
        } else if peak > 0.0 {
            let dd = (peak - point.equity) / peak;
            max_dd = max_dd.max(dd);
            current_dd_duration += 1;
            max_dd_duration = max_dd_duration.max(current_dd_duration);
        }
    }

    (max_dd, max_dd_duration)
}
