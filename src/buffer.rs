// =============================================================================
// Rolling History Buffer — bounded per-symbol candle history
// =============================================================================
//
// Ordered, capacity-bounded sequence of the most recent candles for one
// symbol. The current (most recent) window is updated in place on every
// fold; a new window appends and evicts the oldest entry once the buffer
// is at capacity.
//
// Invariants after every push:
//   - len() <= capacity
//   - window_start_ms strictly increasing across entries

use std::collections::VecDeque;

use crate::types::Candle;

/// Result of a [`RollingBuffer::push`].
#[derive(Debug, Clone, PartialEq)]
pub enum PushOutcome {
    /// The candle targeted the same window as the last entry and replaced it.
    ReplacedCurrent,
    /// The candle opened a new window and was appended. `evicted` holds the
    /// oldest entry when the append overflowed capacity.
    Appended { evicted: Option<Candle> },
    /// The candle targeted a retained older window and replaced that entry
    /// in place (a late trade amended a superseded window).
    Amended,
    /// The candle targeted a window older than anything retained; the buffer
    /// is unchanged. The caller counts this as a stale-window anomaly.
    Stale,
}

/// Fixed-capacity rolling candle history for a single symbol.
#[derive(Debug)]
pub struct RollingBuffer {
    ring: VecDeque<Candle>,
    capacity: usize,
}

impl RollingBuffer {
    /// Capacity is fixed at construction; there is no shrink or delete.
    pub fn new(capacity: usize) -> Self {
        Self {
            ring: VecDeque::with_capacity(capacity + 1),
            capacity,
        }
    }

    /// Insert or replace `candle` per its window position.
    ///
    /// * Same window as the last entry — replace the last entry in place.
    /// * Newer window — append, then evict index 0 on overflow (exactly one
    ///   eviction, since an append grows the buffer by exactly one).
    /// * Retained older window — replace that entry in place.
    /// * Older than everything retained — reject as stale.
    pub fn push(&mut self, candle: Candle) -> PushOutcome {
        enum Position {
            Empty,
            SameAsLast,
            Newer,
            Older,
        }

        let position = match self.ring.back() {
            None => Position::Empty,
            Some(last) if last.is_same_window(&candle) => Position::SameAsLast,
            Some(last) if candle.window_start_ms > last.window_start_ms => Position::Newer,
            Some(_) => Position::Older,
        };

        match position {
            Position::Empty => {
                self.ring.push_back(candle);
                PushOutcome::Appended { evicted: None }
            }
            Position::SameAsLast => {
                if let Some(last) = self.ring.back_mut() {
                    *last = candle;
                }
                PushOutcome::ReplacedCurrent
            }
            Position::Newer => {
                self.ring.push_back(candle);
                let evicted = if self.ring.len() > self.capacity {
                    self.ring.pop_front()
                } else {
                    None
                };
                PushOutcome::Appended { evicted }
            }
            Position::Older => {
                // Late update to an already-superseded window.
                match self
                    .ring
                    .iter_mut()
                    .find(|c| c.window_start_ms == candle.window_start_ms)
                {
                    Some(slot) => {
                        *slot = candle;
                        PushOutcome::Amended
                    }
                    None => PushOutcome::Stale,
                }
            }
        }
    }

    pub fn len(&self) -> usize {
        self.ring.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    /// Oldest-first iterator over the buffered candles.
    pub fn iter(&self) -> impl Iterator<Item = &Candle> {
        self.ring.iter()
    }

    /// The current (most recent) candle, if any.
    pub fn last(&self) -> Option<&Candle> {
        self.ring.back()
    }

    /// `window_start_ms` of the oldest retained candle, if any.
    pub fn oldest_window_start(&self) -> Option<i64> {
        self.ring.front().map(|c| c.window_start_ms)
    }

    /// Ordered close prices, oldest first.
    pub fn closes(&self) -> Vec<f64> {
        self.ring.iter().map(|c| c.close).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Candle;

    fn candle(window_start: i64, close: f64) -> Candle {
        Candle {
            symbol: "BTC/USD".into(),
            window_start_ms: window_start,
            window_end_ms: window_start + 60_000,
            open: close,
            high: close,
            low: close,
            close,
            volume: 1.0,
            candle_duration: 60,
        }
    }

    fn assert_invariants(buf: &RollingBuffer, capacity: usize) {
        assert!(buf.len() <= capacity);
        let starts: Vec<i64> = buf.iter().map(|c| c.window_start_ms).collect();
        for w in starts.windows(2) {
            assert!(w[0] < w[1], "window starts not strictly increasing: {starts:?}");
        }
    }

    #[test]
    fn seeds_from_empty() {
        let mut buf = RollingBuffer::new(3);
        assert!(buf.is_empty());
        let outcome = buf.push(candle(0, 100.0));
        assert_eq!(outcome, PushOutcome::Appended { evicted: None });
        assert_eq!(buf.len(), 1);
    }

    #[test]
    fn same_window_replaces_in_place() {
        let mut buf = RollingBuffer::new(3);
        buf.push(candle(0, 100.0));
        let outcome = buf.push(candle(0, 101.5));
        assert_eq!(outcome, PushOutcome::ReplacedCurrent);
        assert_eq!(buf.len(), 1);
        assert_eq!(buf.last().unwrap().close, 101.5);
    }

    #[test]
    fn fifo_eviction_keeps_last_capacity_entries() {
        let capacity = 3;
        let mut buf = RollingBuffer::new(capacity);
        for i in 0..(capacity as i64 + 1) {
            buf.push(candle(i * 60_000, 100.0 + i as f64));
            assert_invariants(&buf, capacity);
        }
        assert_eq!(buf.len(), capacity);
        // Oldest (window 0) evicted first.
        assert_eq!(buf.oldest_window_start(), Some(60_000));
        assert_eq!(buf.closes(), vec![101.0, 102.0, 103.0]);
    }

    #[test]
    fn eviction_is_exactly_one_per_overflow() {
        let mut buf = RollingBuffer::new(2);
        buf.push(candle(0, 1.0));
        buf.push(candle(60_000, 2.0));
        let outcome = buf.push(candle(120_000, 3.0));
        match outcome {
            PushOutcome::Appended { evicted: Some(e) } => assert_eq!(e.window_start_ms, 0),
            other => panic!("expected eviction, got {other:?}"),
        }
        assert_eq!(buf.len(), 2);
    }

    #[test]
    fn amends_retained_older_window() {
        let mut buf = RollingBuffer::new(5);
        buf.push(candle(0, 1.0));
        buf.push(candle(60_000, 2.0));
        buf.push(candle(120_000, 3.0));

        let outcome = buf.push(candle(60_000, 2.5));
        assert_eq!(outcome, PushOutcome::Amended);
        assert_eq!(buf.len(), 3);
        assert_eq!(buf.closes(), vec![1.0, 2.5, 3.0]);
        assert_invariants(&buf, 5);
    }

    #[test]
    fn rejects_evicted_window_as_stale() {
        let mut buf = RollingBuffer::new(2);
        buf.push(candle(0, 1.0));
        buf.push(candle(60_000, 2.0));
        buf.push(candle(120_000, 3.0)); // evicts window 0

        let outcome = buf.push(candle(0, 9.9));
        assert_eq!(outcome, PushOutcome::Stale);
        assert_eq!(buf.closes(), vec![2.0, 3.0]);
    }
}
