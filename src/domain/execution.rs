//! Entry pricing, stop placement, risk sizing and exit payoff.
//!
//! All prices are per unit of the asset; quantities are fractional.

/// Close price inflated by the per-side fee.
pub fn entry_price_with_fee(close: f64, fee_per_side: f64) -> f64 {
    close * (1.0 + fee_per_side)
}

/// Volatility stop widened by a minimum percentage floor:
/// `entry - max(atr_mult * atr, floor_pct * entry)`.
pub fn stop_price(entry_price: f64, atr: f64, atr_mult: f64, floor_pct: f64) -> f64 {
    entry_price - (atr_mult * atr).max(floor_pct * entry_price)
}

/// `true` when the stop is strictly positive and strictly below entry.
pub fn is_valid_stop(entry_price: f64, stop: f64) -> bool {
    stop > 0.0 && stop < entry_price && stop.is_finite() && entry_price.is_finite()
}

/// Result of a sizing attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum Sizing {
    Sized { risk_per_unit: f64, quantity: f64 },
    NonPositiveRisk,
    NonPositiveQuantity,
}

/// Risk a fixed fraction of current equity over the distance to the stop.
///
/// `quantity = equity * risk_pct / (entry - stop)`
pub fn size_position(equity: f64, risk_pct: f64, entry_price: f64, stop: f64) -> Sizing {
    let risk_per_unit = entry_price - stop;
    if risk_per_unit.is_nan() || risk_per_unit <= 0.0 {
        return Sizing::NonPositiveRisk;
    }

    let quantity = equity * risk_pct / risk_per_unit;
    if !quantity.is_finite() || quantity <= 0.0 {
        return Sizing::NonPositiveQuantity;
    }

    Sizing::Sized {
        risk_per_unit,
        quantity,
    }
}

/// Fixed payoff on a holding-period exit: `entry * payoff_multiple * quantity`.
///
/// The live price at exit is not consulted.
pub fn time_exit_pnl(entry_price: f64, payoff_multiple: f64, quantity: f64) -> f64 {
    entry_price * payoff_multiple * quantity
}

/// Loss realized when a position is stopped out at its stop price.
pub fn stop_exit_pnl(entry_price: f64, stop: f64, quantity: f64) -> f64 {
    (stop - entry_price) * quantity
}
