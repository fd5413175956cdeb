// =============================================================================
// Candle Aggregator — per-window OHLCV accumulators for one symbol
// =============================================================================
//
// Folds incoming trades into a mutable accumulator per tumbling window and
// returns the touched window's candle after every fold, giving downstream
// consumers a continuously updated "current candle" stream. There is no
// window-close event and no watermark: a new window simply supersedes the
// previous one.
//
// Accumulator retention matches the rolling buffer (same capacity, same FIFO
// eviction), so a late trade for an evicted window has nowhere to land and is
// dropped as a stale-window anomaly.

use std::collections::BTreeMap;

use crate::error::PipelineError;
use crate::types::{Candle, Trade};
use crate::window;

/// Result of folding one trade.
#[derive(Debug, Clone, PartialEq)]
pub enum FoldOutcome {
    /// The trade landed in the symbol's most recent window (creating it if
    /// this was the window's first trade). Carries the updated candle.
    Current(Candle),
    /// The trade landed in a retained older window; the candle is an
    /// amendment of an already-superseded window.
    Amended(Candle),
    /// The trade's window is older than anything still retained. Dropped.
    Stale,
}

/// OHLCV accumulators for a single symbol, keyed by `window_start_ms`.
#[derive(Debug)]
pub struct CandleAggregator {
    windows: BTreeMap<i64, Candle>,
    capacity: usize,
    duration_s: u64,
}

impl CandleAggregator {
    pub fn new(duration_s: u64, capacity: usize) -> Self {
        Self {
            windows: BTreeMap::new(),
            capacity,
            duration_s,
        }
    }

    /// Fold one trade into its window's accumulator.
    ///
    /// `open` is the price of the first trade *observed* for the window —
    /// arrival order, not event time. The transport delivers per-symbol in
    /// order but not strictly event-time-ordered, and the core does not
    /// reorder.
    pub fn fold(&mut self, trade: &Trade) -> Result<FoldOutcome, PipelineError> {
        let (start, end) = window::assign(trade.timestamp_ms, self.duration_s)?;

        if let Some(candle) = self.windows.get_mut(&start) {
            candle.apply(trade);
            let candle = candle.clone();
            return Ok(if self.is_newest(start) {
                FoldOutcome::Current(candle)
            } else {
                FoldOutcome::Amended(candle)
            });
        }

        // No accumulator for this window. Only a window newer than everything
        // retained opens a fresh accumulator; anything older was evicted (or
        // skipped) and is dropped.
        if let Some((&newest, _)) = self.windows.last_key_value() {
            if start < newest {
                return Ok(FoldOutcome::Stale);
            }
        }

        let candle = Candle::from_first_trade(trade, start, end, self.duration_s);
        self.windows.insert(start, candle.clone());
        if self.windows.len() > self.capacity {
            self.windows.pop_first();
        }
        Ok(FoldOutcome::Current(candle))
    }

    fn is_newest(&self, window_start_ms: i64) -> bool {
        self.windows
            .last_key_value()
            .map(|(&k, _)| k == window_start_ms)
            .unwrap_or(false)
    }

    /// Number of retained window accumulators.
    pub fn retained(&self) -> usize {
        self.windows.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trade(price: f64, qty: f64, ts_ms: i64) -> Trade {
        Trade {
            symbol: "BTC/USD".into(),
            price,
            quantity: qty,
            timestamp: String::new(),
            timestamp_ms: ts_ms,
        }
    }

    fn unwrap_candle(outcome: FoldOutcome) -> Candle {
        match outcome {
            FoldOutcome::Current(c) | FoldOutcome::Amended(c) => c,
            FoldOutcome::Stale => panic!("unexpected stale fold"),
        }
    }

    #[test]
    fn ohlcv_properties_within_one_window() {
        let mut agg = CandleAggregator::new(60, 10);
        let prices = [100.0, 95.0, 110.0, 105.0];
        let qtys = [1.0, 2.0, 0.5, 1.5];

        let mut last = None;
        for (i, (&p, &q)) in prices.iter().zip(qtys.iter()).enumerate() {
            last = Some(unwrap_candle(agg.fold(&trade(p, q, i as i64 * 1000)).unwrap()));
        }

        let c = last.unwrap();
        assert_eq!(c.open, 100.0); // first trade folded
        assert_eq!(c.close, 105.0); // last trade folded
        assert_eq!(c.high, 110.0);
        assert_eq!(c.low, 95.0);
        assert!((c.volume - 5.0).abs() < 1e-12);
        assert_eq!((c.window_start_ms, c.window_end_ms), (0, 60_000));
    }

    #[test]
    fn new_window_supersedes_previous() {
        let mut agg = CandleAggregator::new(60, 10);
        agg.fold(&trade(100.0, 1.0, 0)).unwrap();
        let c = unwrap_candle(agg.fold(&trade(200.0, 1.0, 60_000)).unwrap());
        assert_eq!(c.window_start_ms, 60_000);
        assert_eq!(c.open, 200.0);
        assert_eq!(agg.retained(), 2);
    }

    #[test]
    fn late_trade_amends_retained_window() {
        let mut agg = CandleAggregator::new(60, 10);
        agg.fold(&trade(100.0, 1.0, 0)).unwrap();
        agg.fold(&trade(200.0, 1.0, 60_000)).unwrap();

        // Late trade for the first window, still retained.
        let outcome = agg.fold(&trade(90.0, 1.0, 30_000)).unwrap();
        let c = match outcome {
            FoldOutcome::Amended(c) => c,
            other => panic!("expected amended fold, got {other:?}"),
        };
        assert_eq!(c.window_start_ms, 0);
        assert_eq!(c.low, 90.0);
        assert_eq!(c.close, 90.0);
        assert!((c.volume - 2.0).abs() < 1e-12);
    }

    #[test]
    fn evicted_window_is_stale() {
        let mut agg = CandleAggregator::new(60, 2);
        agg.fold(&trade(1.0, 1.0, 0)).unwrap();
        agg.fold(&trade(2.0, 1.0, 60_000)).unwrap();
        agg.fold(&trade(3.0, 1.0, 120_000)).unwrap(); // evicts window 0
        assert_eq!(agg.retained(), 2);

        let outcome = agg.fold(&trade(9.0, 1.0, 10)).unwrap();
        assert_eq!(outcome, FoldOutcome::Stale);
        assert_eq!(agg.retained(), 2);
    }

    #[test]
    fn open_is_first_observed_not_earliest_event_time() {
        let mut agg = CandleAggregator::new(60, 10);
        // Out-of-event-time arrival within one window: the later event time
        // arrives first and wins the open.
        agg.fold(&trade(105.0, 1.0, 40_000)).unwrap();
        let c = unwrap_candle(agg.fold(&trade(100.0, 1.0, 10_000)).unwrap());
        assert_eq!(c.open, 105.0);
        assert_eq!(c.close, 100.0);
    }

    #[test]
    fn rejects_invalid_trade_time() {
        let mut agg = CandleAggregator::new(60, 10);
        assert!(agg.fold(&trade(1.0, 1.0, -1)).is_err());
    }
}
