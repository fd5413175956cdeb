// =============================================================================
// Simple Moving Average (SMA)
// =============================================================================
//
// Arithmetic mean of the most recent `period` closes. The trailing value is
// aligned to the last element of the series; anything older than `period`
// closes has no effect.

/// Trailing SMA over the last `period` values of `closes`.
///
/// Returns `None` when `period` is zero or fewer than `period` values are
/// buffered (warm-up).
pub fn trailing_sma(closes: &[f64], period: usize) -> Option<f64> {
    if period == 0 || closes.len() < period {
        return None;
    }
    let window = &closes[closes.len() - period..];
    let mean = window.iter().sum::<f64>() / period as f64;
    mean.is_finite().then_some(mean)
}
