// =============================================================================
// Exponential Moving Average (EMA)
// =============================================================================
//
// EMA gives more weight to recent prices, making it more responsive to new
// information than the Simple Moving Average.
//
// Formula:
//   multiplier = 2 / (period + 1)
//   EMA_t      = close_t * multiplier + EMA_{t-1} * (1 - multiplier)
//
// The very first EMA value is seeded with the SMA of the first `period`
// closes. The batch series here is what MACD recomputes over the bounded
// buffer; the per-period EMA output fields instead use the incremental carry
// in engine.rs, which stays exact across buffer evictions.

/// The standard EMA smoothing factor for a look-back `period`.
pub fn multiplier(period: usize) -> f64 {
    2.0 / (period + 1) as f64
}

/// Compute the EMA series for `closes` and look-back `period`.
///
/// Returns an empty `Vec` when the input is too short or the period is zero.
/// Each output element corresponds to a close starting at index `period - 1`.
pub fn calculate_ema(closes: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || closes.len() < period {
        return Vec::new();
    }

    let mult = multiplier(period);

    // Seed: SMA of the first `period` values.
    let sma: f64 = closes[..period].iter().sum::<f64>() / period as f64;
    if !sma.is_finite() {
        return Vec::new();
    }

    let mut result = Vec::with_capacity(closes.len() - period + 1);
    result.push(sma);

    let mut prev = sma;
    for &close in &closes[period..] {
        let ema = close * mult + prev * (1.0 - mult);
        if !ema.is_finite() {
            // A broken series must not keep producing values.
            break;
        }
        result.push(ema);
        prev = ema;
    }

    result
}
