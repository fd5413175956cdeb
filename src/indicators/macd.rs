// =============================================================================
// Moving Average Convergence Divergence (MACD)
// =============================================================================
//
// MACD line  = EMA(fast) - EMA(slow)
// Signal     = EMA(signal_period) of the MACD line
// Histogram  = MACD line - Signal
//
// Recomputed over the buffered close series on every update (window-based,
// unlike the carried EMA output fields). Needs `slow + signal_period - 1`
// closes before all three values are defined.

use super::ema::calculate_ema;

/// Trailing MACD values `(macd, signal, histogram)`.
///
/// Returns `None` until the buffer holds enough closes for the slow EMA and
/// the signal EMA on top of it, or when `fast >= slow`.
pub fn trailing_macd(
    closes: &[f64],
    fast: usize,
    slow: usize,
    signal_period: usize,
) -> Option<(f64, f64, f64)> {
    if fast == 0 || signal_period == 0 || fast >= slow {
        return None;
    }

    let fast_series = calculate_ema(closes, fast);
    let slow_series = calculate_ema(closes, slow);
    if slow_series.is_empty() {
        return None;
    }

    // Align the two series on their tails: slow starts `slow - fast` elements
    // later than fast.
    let offset = slow - fast;
    let macd_series: Vec<f64> = slow_series
        .iter()
        .enumerate()
        .map(|(i, &s)| fast_series[i + offset] - s)
        .collect();

    let signal_series = calculate_ema(&macd_series, signal_period);
    let signal = *signal_series.last()?;
    let macd = *macd_series.last()?;
    Some((macd, signal, macd - signal))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn macd_warm_up_is_none() {
        // 26 + 9 - 1 = 34 closes required for the standard parameters.
        let closes: Vec<f64> = (1..=33).map(|x| x as f64).collect();
        assert!(trailing_macd(&closes, 12, 26, 9).is_none());
        let closes: Vec<f64> = (1..=34).map(|x| x as f64).collect();
        assert!(trailing_macd(&closes, 12, 26, 9).is_some());
    }

    #[test]
    fn macd_rejects_degenerate_periods() {
        let closes: Vec<f64> = (1..=100).map(|x| x as f64).collect();
        assert!(trailing_macd(&closes, 26, 12, 9).is_none());
        assert!(trailing_macd(&closes, 12, 12, 9).is_none());
        assert!(trailing_macd(&closes, 0, 26, 9).is_none());
        assert!(trailing_macd(&closes, 12, 26, 0).is_none());
    }

    #[test]
    fn macd_positive_in_uptrend() {
        // In a steady uptrend the fast EMA sits above the slow EMA.
        let closes: Vec<f64> = (1..=100).map(|x| x as f64).collect();
        let (macd, signal, hist) = trailing_macd(&closes, 12, 26, 9).unwrap();
        assert!(macd > 0.0);
        assert!(signal > 0.0);
        assert!((hist - (macd - signal)).abs() < 1e-12);
    }

    #[test]
    fn macd_zero_on_flat_series() {
        let closes = vec![50.0; 100];
        let (macd, signal, hist) = trailing_macd(&closes, 12, 26, 9).unwrap();
        assert!(macd.abs() < 1e-10);
        assert!(signal.abs() < 1e-10);
        assert!(hist.abs() < 1e-10);
    }
}
