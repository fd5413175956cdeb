// =============================================================================
// Trade Pipeline — keyed per-symbol aggregation state
// =============================================================================
//
// The explicit keyed state store: one `SymbolState` (accumulators, rolling
// buffer, carried indicator state) per symbol, created lazily on the symbol's
// first trade. Processing is key-partitioned — a trade is folded to
// completion, indicator recomputation included, under the store's write lock,
// so a symbol's state never sees overlapping mutation and no error on one
// symbol touches another's state.
//
// At-least-once redelivery is tolerated but not idempotent: a true duplicate
// trade double-counts volume. That is a documented limitation of the design,
// not silently corrected here.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::aggregator::{CandleAggregator, FoldOutcome};
use crate::buffer::{PushOutcome, RollingBuffer};
use crate::engine::{CarriedState, IndicatorEngine, IndicatorLayout};
use crate::error::PipelineError;
use crate::types::{IndicatorSnapshot, Trade};

/// All mutable state for one symbol. Owned exclusively by the store entry.
struct SymbolState {
    aggregator: CandleAggregator,
    buffer: RollingBuffer,
    carried: CarriedState,
}

impl SymbolState {
    fn new(duration_s: u64, max_candles: usize, layout: &IndicatorLayout) -> Self {
        Self {
            aggregator: CandleAggregator::new(duration_s, max_candles),
            buffer: RollingBuffer::new(max_candles),
            carried: CarriedState::new(layout),
        }
    }
}

/// The stateful aggregation pipeline: trades in, indicator snapshots out.
pub struct TradePipeline {
    duration_s: u64,
    max_candles: usize,
    engine: IndicatorEngine,
    state: RwLock<HashMap<String, SymbolState>>,
    stale_drops: AtomicU64,
}

impl TradePipeline {
    pub fn new(
        duration_s: u64,
        max_candles: usize,
        layout: IndicatorLayout,
    ) -> Result<Self, PipelineError> {
        if duration_s == 0 {
            return Err(PipelineError::invalid("candle duration must be positive"));
        }
        if max_candles == 0 {
            return Err(PipelineError::invalid("buffer capacity must be positive"));
        }
        Ok(Self {
            duration_s,
            max_candles,
            engine: IndicatorEngine::new(layout),
            state: RwLock::new(HashMap::new()),
            stale_drops: AtomicU64::new(0),
        })
    }

    /// Process one trade end to end: validate, fold into its window's candle,
    /// push into the rolling buffer, recompute indicators.
    ///
    /// Returns `Ok(None)` when the trade mapped to an already-evicted window
    /// (counted, logged, never escalated). Malformed trades are rejected
    /// before any state is touched.
    pub fn process_trade(
        &self,
        trade: &Trade,
    ) -> Result<Option<IndicatorSnapshot>, PipelineError> {
        trade.validate()?;

        let mut map = self.state.write();
        let state = map.entry(trade.symbol.clone()).or_insert_with(|| {
            SymbolState::new(self.duration_s, self.max_candles, self.engine.layout())
        });

        let candle = match state.aggregator.fold(trade)? {
            FoldOutcome::Current(c) | FoldOutcome::Amended(c) => c,
            FoldOutcome::Stale => {
                self.stale_drops.fetch_add(1, Ordering::Relaxed);
                warn!(
                    symbol = %trade.symbol,
                    timestamp_ms = trade.timestamp_ms,
                    "trade maps to an evicted window, dropped"
                );
                return Ok(None);
            }
        };

        // The superseded window's final candle feeds the EMA/OBV carries.
        let prev_current = state.buffer.last().cloned();
        match state.buffer.push(candle.clone()) {
            PushOutcome::Appended { .. } => {
                if let Some(prev) = prev_current {
                    state.carried.commit(&prev);
                }
            }
            PushOutcome::ReplacedCurrent => {}
            PushOutcome::Amended => {
                // A committed close changed; rebuild from what the buffer
                // still holds.
                state.carried = CarriedState::rebuild(self.engine.layout(), &state.buffer);
            }
            PushOutcome::Stale => {
                // Unreachable when fed by the aggregator, which drops stale
                // windows first; counted anyway rather than trusted.
                self.stale_drops.fetch_add(1, Ordering::Relaxed);
                return Ok(None);
            }
        }

        let indicators = self.engine.compute(&state.buffer, &state.carried);
        debug!(
            symbol = %candle.symbol,
            window_start_ms = candle.window_start_ms,
            close = candle.close,
            buffered = state.buffer.len(),
            "snapshot"
        );

        Ok(Some(IndicatorSnapshot { candle, indicators }))
    }

    /// Number of trades dropped because their window was already evicted.
    pub fn stale_drops(&self) -> u64 {
        self.stale_drops.load(Ordering::Relaxed)
    }

    /// Buffered candle count for one symbol (0 when the symbol is unknown).
    pub fn buffered(&self, symbol: &str) -> usize {
        self.state.read().get(symbol).map_or(0, |s| s.buffer.len())
    }
}
