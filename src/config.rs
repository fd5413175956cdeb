// =============================================================================
// Static startup configuration for candleflow
// =============================================================================
//
// Loaded once at startup from a JSON file plus CANDLEFLOW_* environment
// overrides; never reloaded mid-run. Every field carries a serde default so
// that an older config file missing new fields still deserializes.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::engine::IndicatorLayout;
use crate::error::PipelineError;

// =============================================================================
// Default-value helpers (required by serde `default = "..."` attribute)
// =============================================================================

fn default_symbols() -> Vec<String> {
    vec![
        "BTC/EUR".to_string(),
        "BTC/USD".to_string(),
        "ETH/EUR".to_string(),
        "ETH/USD".to_string(),
        "SOL/EUR".to_string(),
        "SOL/USD".to_string(),
        "XRP/EUR".to_string(),
        "XRP/USD".to_string(),
    ]
}

fn default_candle_duration_secs() -> u64 {
    60
}

fn default_max_candles() -> usize {
    120
}

fn default_lookback_periods() -> Vec<usize> {
    vec![7, 14, 21, 60]
}

fn default_macd_fast() -> usize {
    12
}

fn default_macd_slow() -> usize {
    26
}

fn default_macd_signal() -> usize {
    9
}

fn default_kraken_ws_url() -> String {
    "wss://ws.kraken.com/v2".to_string()
}

fn default_kraken_rest_url() -> String {
    "https://api.kraken.com/0/public/Trades".to_string()
}

fn default_since_days() -> u32 {
    30
}

// =============================================================================
// Settings
// =============================================================================

/// Top-level configuration: which symbols to ingest, the candle duration,
/// the rolling-buffer capacity, and the indicator look-back set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Symbols to subscribe to on the trade stream.
    #[serde(default = "default_symbols")]
    pub symbols: Vec<String>,

    /// Tumbling-window candle duration in seconds.
    #[serde(default = "default_candle_duration_secs")]
    pub candle_duration_secs: u64,

    /// Rolling-buffer capacity per symbol.
    #[serde(default = "default_max_candles")]
    pub max_candles: usize,

    /// Look-back periods: each gets sma_k / ema_k / rsi_k output fields.
    #[serde(default = "default_lookback_periods")]
    pub lookback_periods: Vec<usize>,

    #[serde(default = "default_macd_fast")]
    pub macd_fast: usize,

    #[serde(default = "default_macd_slow")]
    pub macd_slow: usize,

    #[serde(default = "default_macd_signal")]
    pub macd_signal: usize,

    /// Kraken WebSocket v2 endpoint for the live trade stream.
    #[serde(default = "default_kraken_ws_url")]
    pub kraken_ws_url: String,

    /// Kraken public REST endpoint for historical backfill.
    #[serde(default = "default_kraken_rest_url")]
    pub kraken_rest_url: String,

    /// Backfill trades from the REST API before going live.
    #[serde(default)]
    pub historical_data: bool,

    /// How far back the backfill reaches.
    #[serde(default = "default_since_days")]
    pub since_days: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            symbols: default_symbols(),
            candle_duration_secs: default_candle_duration_secs(),
            max_candles: default_max_candles(),
            lookback_periods: default_lookback_periods(),
            macd_fast: default_macd_fast(),
            macd_slow: default_macd_slow(),
            macd_signal: default_macd_signal(),
            kraken_ws_url: default_kraken_ws_url(),
            kraken_rest_url: default_kraken_rest_url(),
            historical_data: false,
            since_days: default_since_days(),
        }
    }
}

impl Settings {
    /// Load settings from a JSON file, falling back to defaults when the file
    /// does not exist. Environment overrides are applied afterwards.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut settings = if path.exists() {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config file {}", path.display()))?;
            let parsed: Settings = serde_json::from_str(&raw)
                .with_context(|| format!("failed to parse config file {}", path.display()))?;
            info!(path = %path.display(), "loaded configuration");
            parsed
        } else {
            info!(path = %path.display(), "config file not found, using defaults");
            Settings::default()
        };
        settings.apply_env();
        Ok(settings)
    }

    /// Override selected fields from CANDLEFLOW_* environment variables.
    fn apply_env(&mut self) {
        if let Ok(syms) = std::env::var("CANDLEFLOW_SYMBOLS") {
            let parsed: Vec<String> = syms
                .split(',')
                .map(|s| s.trim().to_uppercase())
                .filter(|s| !s.is_empty())
                .collect();
            if !parsed.is_empty() {
                self.symbols = parsed;
            }
        }
        if let Ok(v) = std::env::var("CANDLEFLOW_CANDLE_DURATION_SECS") {
            if let Ok(secs) = v.parse() {
                self.candle_duration_secs = secs;
            }
        }
        if let Ok(v) = std::env::var("CANDLEFLOW_MAX_CANDLES") {
            if let Ok(cap) = v.parse() {
                self.max_candles = cap;
            }
        }
        if let Ok(v) = std::env::var("CANDLEFLOW_HISTORICAL_DATA") {
            self.historical_data = v == "1" || v.eq_ignore_ascii_case("true");
        }
    }

    /// Reject configurations the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.symbols.is_empty() {
            return Err(PipelineError::invalid("symbol list is empty"));
        }
        if self.candle_duration_secs == 0 {
            return Err(PipelineError::invalid("candle duration must be positive"));
        }
        if self.max_candles == 0 {
            return Err(PipelineError::invalid("max_candles must be positive"));
        }
        // Layout construction validates the look-back and MACD parameters.
        self.layout().map(|_| ())
    }

    /// Resolve the indicator output layout once, at startup.
    pub fn layout(&self) -> Result<IndicatorLayout, PipelineError> {
        IndicatorLayout::new(
            self.lookback_periods.clone(),
            self.macd_fast,
            self.macd_slow,
            self.macd_signal,
        )
    }
}
