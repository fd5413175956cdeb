// =============================================================================
// candleflow — trades in, OHLCV candles and technical indicators out
// =============================================================================
//
// Wiring: Kraken trade stream (live WebSocket, optional REST backfill)
//   → TradePipeline (per-symbol candle aggregation + rolling history
//     + incremental indicators)
//   → NDJSON snapshot sink.

mod aggregator;
mod buffer;
mod config;
mod engine;
mod error;
mod indicators;
mod kraken;
mod pipeline;
mod sink;
mod types;
mod window;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::Settings;
use crate::kraken::KrakenRestClient;
use crate::pipeline::TradePipeline;
use crate::types::Trade;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let settings = Settings::load("candleflow.json")?;
    settings.validate()?;
    info!(
        symbols = ?settings.symbols,
        candle_duration_secs = settings.candle_duration_secs,
        max_candles = settings.max_candles,
        lookback_periods = ?settings.lookback_periods,
        "candleflow starting"
    );

    let pipeline = Arc::new(TradePipeline::new(
        settings.candle_duration_secs,
        settings.max_candles,
        settings.layout()?,
    )?);

    let (trade_tx, mut trade_rx) = mpsc::channel::<Trade>(1024);
    let (snapshot_tx, snapshot_rx) = mpsc::channel(1024);

    // Snapshot sink.
    let sink_task = tokio::spawn(async move {
        if let Err(e) = sink::run_sink(snapshot_rx).await {
            error!(error = %e, "snapshot sink failed");
        }
    });

    // Optional historical backfill, sequential per symbol so each symbol's
    // trades arrive in order.
    if settings.historical_data {
        let rest = KrakenRestClient::new(&settings.kraken_rest_url);
        let symbols = settings.symbols.clone();
        let since_days = settings.since_days;
        let tx = trade_tx.clone();
        tokio::spawn(async move {
            for symbol in symbols {
                if let Err(e) = rest.backfill(&symbol, since_days, &tx).await {
                    error!(symbol = %symbol, error = %e, "historical backfill failed");
                }
            }
        });
    }

    // Live trade stream with reconnection.
    {
        let url = settings.kraken_ws_url.clone();
        let symbols = settings.symbols.clone();
        let tx = trade_tx.clone();
        tokio::spawn(async move {
            loop {
                if let Err(e) = kraken::run_trade_stream(&url, &symbols, &tx).await {
                    error!(error = %e, "trade stream error — reconnecting in 5s");
                }
                tokio::time::sleep(Duration::from_secs(5)).await;
            }
        });
    }
    drop(trade_tx);

    // Consumer loop: one trade folded to completion at a time.
    while let Some(trade) = trade_rx.recv().await {
        match pipeline.process_trade(&trade) {
            Ok(Some(snapshot)) => {
                if snapshot_tx.send(snapshot).await.is_err() {
                    warn!("snapshot sink closed, stopping");
                    break;
                }
            }
            Ok(None) => {
                // Stale window; already counted and logged by the pipeline.
            }
            Err(e) => {
                warn!(symbol = %trade.symbol, error = %e, "trade rejected");
            }
        }
    }

    info!(stale_drops = pipeline.stale_drops(), "trade stream closed, shutting down");
    drop(snapshot_tx);
    let _ = sink_task.await;
    Ok(())
}
