// =============================================================================
// Kraken WebSocket v2 trade stream
// =============================================================================
//
// Subscribes to the `trade` channel for the configured symbols and forwards
// parsed trades over an mpsc channel. Runs until the stream disconnects or an
// error occurs, then returns so that the caller (main.rs) can reconnect.

use anyhow::{Context, Result};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};

use crate::types::Trade;

/// Build the v2 subscribe request for the trade channel. `snapshot: false` —
/// only live trades, no replay of the book.
fn subscribe_message(symbols: &[String]) -> String {
    serde_json::json!({
        "method": "subscribe",
        "params": {
            "channel": "trade",
            "symbol": symbols,
            "snapshot": false,
        },
    })
    .to_string()
}

/// Parse one WebSocket frame into zero or more trades.
///
/// Trade updates look like:
/// ```json
/// {"channel":"trade","type":"update","data":[
///   {"symbol":"BTC/USD","price":37000.1,"qty":0.05,
///    "timestamp":"2023-11-14T22:13:20.123456Z", ...}]}
/// ```
/// Heartbeats, status messages, and subscribe acks yield an empty vec.
fn parse_trade_message(text: &str) -> Result<Vec<Trade>> {
    let root: serde_json::Value =
        serde_json::from_str(text).context("failed to parse trade JSON")?;

    if root["channel"].as_str() != Some("trade") {
        return Ok(Vec::new());
    }

    let data = root["data"]
        .as_array()
        .context("trade message missing data array")?;

    let mut trades = Vec::with_capacity(data.len());
    for entry in data {
        let symbol = entry["symbol"]
            .as_str()
            .context("trade entry missing symbol")?;
        let price = entry["price"]
            .as_f64()
            .context("trade entry missing price")?;
        let qty = entry["qty"].as_f64().context("trade entry missing qty")?;
        let timestamp = entry["timestamp"]
            .as_str()
            .context("trade entry missing timestamp")?;

        let trade = Trade::from_websocket(symbol, price, qty, timestamp)
            .map_err(|e| anyhow::anyhow!("bad trade payload: {e}"))?;
        trades.push(trade);
    }
    Ok(trades)
}

/// Connect to the Kraken WebSocket, subscribe, and feed trades into `tx`.
pub async fn run_trade_stream(
    url: &str,
    symbols: &[String],
    tx: &mpsc::Sender<Trade>,
) -> Result<()> {
    info!(url = %url, symbols = ?symbols, "connecting to trade WebSocket");

    let (ws_stream, _response) = connect_async(url)
        .await
        .context("failed to connect to trade WebSocket")?;
    info!("trade WebSocket connected");

    let (mut write, mut read) = ws_stream.split();
    write
        .send(Message::Text(subscribe_message(symbols)))
        .await
        .context("failed to send trade subscription")?;

    loop {
        match read.next().await {
            Some(Ok(Message::Text(text))) => match parse_trade_message(&text) {
                Ok(trades) => {
                    for trade in trades {
                        debug!(symbol = %trade.symbol, price = trade.price, "trade received");
                        if tx.send(trade).await.is_err() {
                            // Receiver dropped — the pipeline is shutting down.
                            return Ok(());
                        }
                    }
                }
                Err(e) => {
                    warn!(error = %e, "failed to parse trade message");
                }
            },
            Some(Ok(_)) => {
                // Ping / Pong / Binary / Close frames — tungstenite answers
                // pings itself.
            }
            Some(Err(e)) => {
                error!(error = %e, "trade WebSocket read error");
                return Err(e.into());
            }
            None => {
                warn!("trade WebSocket stream ended");
                return Ok(());
            }
        }
    }
}
