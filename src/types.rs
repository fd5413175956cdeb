// =============================================================================
// Shared types used across the candleflow pipeline
// =============================================================================

use std::collections::BTreeMap;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

// =============================================================================
// Trade
// =============================================================================

/// A single trade event as delivered by the exchange, keyed by instrument
/// symbol. Immutable once constructed; consumed exactly once per fold.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trade {
    pub symbol: String,
    pub price: f64,
    pub quantity: f64,
    /// ISO-8601 timestamp string, as carried on the wire.
    pub timestamp: String,
    /// Event time in milliseconds since the UNIX epoch.
    pub timestamp_ms: i64,
}

impl Trade {
    /// Build a trade from the Kraken WebSocket v2 trade payload, which
    /// carries an RFC-3339 timestamp string.
    pub fn from_websocket(
        symbol: impl Into<String>,
        price: f64,
        quantity: f64,
        timestamp: &str,
    ) -> Result<Self, PipelineError> {
        let parsed: DateTime<Utc> = timestamp
            .parse()
            .map_err(|e| PipelineError::invalid(format!("bad trade timestamp {timestamp}: {e}")))?;
        Ok(Self {
            symbol: symbol.into(),
            price,
            quantity,
            timestamp: timestamp.to_string(),
            timestamp_ms: parsed.timestamp_millis(),
        })
    }

    /// Build a trade from the Kraken REST trades endpoint, which carries
    /// timestamps as fractional UNIX seconds.
    pub fn from_rest(
        symbol: impl Into<String>,
        price: f64,
        quantity: f64,
        timestamp_sec: f64,
    ) -> Self {
        let timestamp_ms = (timestamp_sec * 1000.0) as i64;
        let timestamp = Utc
            .timestamp_millis_opt(timestamp_ms)
            .single()
            .map(|dt| dt.to_rfc3339())
            .unwrap_or_default();
        Self {
            symbol: symbol.into(),
            price,
            quantity,
            timestamp,
            timestamp_ms,
        }
    }

    /// Reject malformed trades at the boundary, before any state mutation.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.symbol.is_empty() {
            return Err(PipelineError::invalid("trade has empty symbol"));
        }
        if !(self.price > 0.0) || !self.price.is_finite() {
            return Err(PipelineError::invalid(format!(
                "trade price must be positive and finite, got {}",
                self.price
            )));
        }
        if !(self.quantity > 0.0) || !self.quantity.is_finite() {
            return Err(PipelineError::invalid(format!(
                "trade quantity must be positive and finite, got {}",
                self.quantity
            )));
        }
        if self.timestamp_ms < 0 {
            return Err(PipelineError::invalid(format!(
                "trade timestamp must be non-negative, got {}",
                self.timestamp_ms
            )));
        }
        Ok(())
    }
}

// =============================================================================
// Candle
// =============================================================================

/// An OHLCV candle for one symbol over one tumbling window.
///
/// Mutable accumulator while its window is the symbol's most recent; logically
/// immutable once superseded by a later window. Serialized with the wire
/// field names used by downstream consumers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub symbol: String,
    pub window_start_ms: i64,
    pub window_end_ms: i64,
    #[serde(rename = "opening_price")]
    pub open: f64,
    #[serde(rename = "high_price")]
    pub high: f64,
    #[serde(rename = "low_price")]
    pub low: f64,
    #[serde(rename = "closing_price")]
    pub close: f64,
    pub volume: f64,
    /// Window duration in seconds; downstream consumers filter on it when
    /// several candle resolutions share a transport.
    pub candle_duration: u64,
}

impl Candle {
    /// Initialize a candle from the first trade observed for its window.
    pub fn from_first_trade(
        trade: &Trade,
        window_start_ms: i64,
        window_end_ms: i64,
        candle_duration: u64,
    ) -> Self {
        Self {
            symbol: trade.symbol.clone(),
            window_start_ms,
            window_end_ms,
            open: trade.price,
            high: trade.price,
            low: trade.price,
            close: trade.price,
            volume: trade.quantity,
            candle_duration,
        }
    }

    /// Fold one more trade into the accumulator.
    pub fn apply(&mut self, trade: &Trade) {
        self.close = trade.price;
        self.high = self.high.max(trade.price);
        self.low = self.low.min(trade.price);
        self.volume += trade.quantity;
    }

    /// Whether `other` targets the same (symbol, window) pair.
    pub fn is_same_window(&self, other: &Candle) -> bool {
        self.symbol == other.symbol
            && self.window_start_ms == other.window_start_ms
            && self.window_end_ms == other.window_end_ms
    }
}

// =============================================================================
// IndicatorSnapshot
// =============================================================================

/// One emitted record: the current candle's fields merged with the trailing
/// indicator values. Indicators still in warm-up are `None` and serialize as
/// `null`. Produced fresh on every buffer update; never persisted here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndicatorSnapshot {
    #[serde(flatten)]
    pub candle: Candle,
    #[serde(flatten)]
    pub indicators: BTreeMap<String, Option<f64>>,
}
