// =============================================================================
// On-Balance Volume (OBV)
// =============================================================================
//
// Cumulative volume-flow indicator driven by the sign of successive close
// deltas: add the candle's volume when the close rises, subtract it when the
// close falls, carry the value unchanged on a tie. The first candle
// contributes 0.
//
// OBV is cumulative, not windowed, so the batch form below is left-truncated
// once the rolling buffer starts evicting; the exact-across-evictions value
// lives in the incremental carry in engine.rs.

/// One OBV step: the new cumulative value given the previous close.
pub fn step(prev_obv: f64, prev_close: f64, close: f64, volume: f64) -> f64 {
    if close > prev_close {
        prev_obv + volume
    } else if close < prev_close {
        prev_obv - volume
    } else {
        prev_obv
    }
}

/// Full OBV trajectory over parallel `closes` / `volumes` series, starting
/// at 0. Returns an empty `Vec` on empty or mismatched input.
pub fn obv_series(closes: &[f64], volumes: &[f64]) -> Vec<f64> {
    if closes.is_empty() || closes.len() != volumes.len() {
        return Vec::new();
    }

    let mut result = Vec::with_capacity(closes.len());
    result.push(0.0);
    for i in 1..closes.len() {
        let prev = result[i - 1];
        result.push(step(prev, closes[i - 1], closes[i], volumes[i]));
    }
    result
}
