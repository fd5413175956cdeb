// =============================================================================
// Relative Strength Index (RSI)
// =============================================================================
//
// RSI measures the speed and magnitude of recent price changes on a 0–100
// scale. The trailing value uses the plain average of gains and losses over
// the last `period` close-to-close deltas:
//
//   RS  = avg_gain / avg_loss
//   RSI = 100 - 100 / (1 + RS)
//
// Conventions for degenerate averages: no movement at all => 50 (neutral),
// all gains and no losses => 100, all losses and no gains => 0.

/// Trailing RSI over the last `period` deltas of `closes`.
///
/// Needs at least `period + 1` closes (the deltas are pairwise); returns
/// `None` during warm-up or when the result is non-finite.
pub fn trailing_rsi(closes: &[f64], period: usize) -> Option<f64> {
    if period == 0 || closes.len() < period + 1 {
        return None;
    }

    let tail = &closes[closes.len() - (period + 1)..];
    let (sum_gain, sum_loss) = tail
        .windows(2)
        .map(|w| w[1] - w[0])
        .fold((0.0_f64, 0.0_f64), |(g, l), d| {
            if d > 0.0 {
                (g + d, l)
            } else {
                (g, l + d.abs())
            }
        });

    let period_f = period as f64;
    rsi_from_averages(sum_gain / period_f, sum_loss / period_f)
}

/// Convert average gain / average loss into an RSI value in [0, 100].
fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> Option<f64> {
    let rsi = if avg_loss == 0.0 && avg_gain == 0.0 {
        50.0 // No movement at all — neutral.
    } else if avg_loss == 0.0 {
        100.0 // All gains, no losses.
    } else {
        let rs = avg_gain / avg_loss;
        100.0 - 100.0 / (1.0 + rs)
    };

    rsi.is_finite().then_some(rsi)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rsi_warm_up_is_none() {
        assert!(trailing_rsi(&[], 14).is_none());
        // period deltas need period+1 closes.
        let closes: Vec<f64> = (1..=14).map(|x| x as f64).collect();
        assert!(trailing_rsi(&closes, 14).is_none());
        assert!(trailing_rsi(&[1.0, 2.0, 3.0], 0).is_none());
    }

    #[test]
    fn rsi_all_gains_is_100() {
        let closes: Vec<f64> = (1..=30).map(|x| x as f64).collect();
        let rsi = trailing_rsi(&closes, 14).unwrap();
        assert!((rsi - 100.0).abs() < 1e-10);
    }

    #[test]
    fn rsi_all_losses_is_0() {
        let closes: Vec<f64> = (1..=30).rev().map(|x| x as f64).collect();
        let rsi = trailing_rsi(&closes, 14).unwrap();
        assert!(rsi.abs() < 1e-10);
    }

    #[test]
    fn rsi_flat_market_is_50() {
        let closes = vec![100.0; 30];
        let rsi = trailing_rsi(&closes, 14).unwrap();
        assert!((rsi - 50.0).abs() < 1e-10);
    }

    #[test]
    fn rsi_balanced_moves_is_50() {
        // Equal total gain and loss over the window.
        let closes = vec![100.0, 102.0, 100.0, 102.0, 100.0];
        let rsi = trailing_rsi(&closes, 4).unwrap();
        assert!((rsi - 50.0).abs() < 1e-10);
    }

    #[test]
    fn rsi_range_check() {
        let closes = vec![
            44.34, 44.09, 44.15, 43.61, 44.33, 44.83, 45.10, 45.42, 45.84, 46.08, 45.89, 46.03,
            44.18, 44.22, 44.57, 43.42, 42.66, 43.13,
        ];
        let rsi = trailing_rsi(&closes, 14).unwrap();
        assert!((0.0..=100.0).contains(&rsi), "RSI {rsi} out of range");
    }

    #[test]
    fn rsi_uses_only_last_period_deltas() {
        // A huge early spike outside the look-back window must not matter.
        let mut closes = vec![1.0, 1000.0];
        closes.extend([10.0, 11.0, 12.0, 13.0, 14.0]);
        let rsi = trailing_rsi(&closes, 4).unwrap();
        assert!((rsi - 100.0).abs() < 1e-10);
    }
}
