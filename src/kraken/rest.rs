// =============================================================================
// Kraken REST trades client — historical backfill
// =============================================================================
//
// Pages through the public Trades endpoint from `since_days` ago until the
// cursor is within one second of now, feeding each page's trades into the
// pipeline channel. The endpoint returns trades as
// `[price, volume, time, side, ord_type, misc, trade_id]` tuples with price
// and volume as strings, and a nanosecond `last` cursor for pagination.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::types::Trade;

/// Client for the Kraken public Trades endpoint.
#[derive(Clone)]
pub struct KrakenRestClient {
    base_url: String,
    client: reqwest::Client,
}

impl KrakenRestClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .expect("failed to build reqwest client");
        Self {
            base_url: base_url.into(),
            client,
        }
    }

    /// Current UNIX timestamp in nanoseconds (the cursor unit Kraken uses).
    fn now_ns() -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system clock before UNIX epoch")
            .as_nanos() as i64
    }

    /// Fetch one page of trades at the given nanosecond cursor.
    ///
    /// Returns the page's trades plus the next cursor.
    pub async fn fetch_page(&self, symbol: &str, since_ns: i64) -> Result<(Vec<Trade>, i64)> {
        let url = format!("{}?pair={}&since={}", self.base_url, symbol, since_ns);
        let resp = self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .await
            .context("GET public Trades request failed")?;

        let body: serde_json::Value = resp
            .json()
            .await
            .context("failed to decode Trades response body")?;

        if let Some(errors) = body["error"].as_array() {
            if !errors.is_empty() {
                anyhow::bail!("Kraken Trades endpoint returned errors: {errors:?}");
            }
        }

        parse_trades_page(symbol, &body)
    }

    /// Backfill `symbol` from `since_days` ago up to (roughly) now, sending
    /// every trade into `tx` in order. Returns the number of trades sent.
    pub async fn backfill(
        &self,
        symbol: &str,
        since_days: u32,
        tx: &mpsc::Sender<Trade>,
    ) -> Result<u64> {
        let day_ns: i64 = 24 * 60 * 60 * 1_000_000_000;
        let mut cursor = Self::now_ns() - since_days as i64 * day_ns;
        let mut sent: u64 = 0;

        info!(symbol = %symbol, since_days, "starting historical backfill");
        loop {
            let (trades, next_cursor) = match self.fetch_page(symbol, cursor).await {
                Ok(page) => page,
                Err(e) => {
                    warn!(symbol = %symbol, error = %e, "backfill page failed, retrying in 10s");
                    tokio::time::sleep(Duration::from_secs(10)).await;
                    continue;
                }
            };

            for trade in trades {
                if tx.send(trade).await.is_err() {
                    return Ok(sent);
                }
                sent += 1;
            }

            cursor = next_cursor;
            // Caught up to within one second of now.
            if cursor > Self::now_ns() - 1_000_000_000 {
                break;
            }
            // Public endpoint rate limit.
            tokio::time::sleep(Duration::from_secs(1)).await;
        }

        info!(symbol = %symbol, trades = sent, "historical backfill complete");
        Ok(sent)
    }
}

/// Extract the trades array and pagination cursor from one response body.
fn parse_trades_page(symbol: &str, body: &serde_json::Value) -> Result<(Vec<Trade>, i64)> {
    let result = &body["result"];
    let rows = result[symbol]
        .as_array()
        .with_context(|| format!("Trades response missing result.{symbol}"))?;

    let mut trades = Vec::with_capacity(rows.len());
    for row in rows {
        let price: f64 = row[0]
            .as_str()
            .context("trade row missing price")?
            .parse()
            .context("trade price is not an f64")?;
        let volume: f64 = row[1]
            .as_str()
            .context("trade row missing volume")?
            .parse()
            .context("trade volume is not an f64")?;
        let time_sec = row[2].as_f64().context("trade row missing time")?;
        trades.push(Trade::from_rest(symbol, price, volume, time_sec));
    }

    let last: i64 = result["last"]
        .as_str()
        .context("Trades response missing last cursor")?
        .parse()
        .context("last cursor is not an integer")?;

    Ok((trades, last))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_trades_page() {
        let body: serde_json::Value = serde_json::from_str(
            r#"{
                "error": [],
                "result": {
                    "BTC/USD": [
                        ["37000.10000", "0.05000000", 1700000000.1234, "b", "m", "", 123],
                        ["36999.90000", "0.10000000", 1700000001.5678, "s", "l", "", 124]
                    ],
                    "last": "1700000001567800000"
                }
            }"#,
        )
        .unwrap();

        let (trades, last) = parse_trades_page("BTC/USD", &body).unwrap();
        assert_eq!(trades.len(), 2);
        assert!((trades[0].price - 37000.1).abs() < 1e-9);
        assert!((trades[1].quantity - 0.1).abs() < 1e-9);
        assert_eq!(trades[0].timestamp_ms, 1_700_000_000_123);
        assert_eq!(last, 1_700_000_001_567_800_000);
    }

    #[test]
    fn missing_symbol_key_is_an_error() {
        let body: serde_json::Value =
            serde_json::from_str(r#"{"error": [], "result": {"last": "0"}}"#).unwrap();
        assert!(parse_trades_page("BTC/USD", &body).is_err());
    }
}
