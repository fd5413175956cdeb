// =============================================================================
// Snapshot sink — NDJSON writer for emitted indicator records
// =============================================================================
//
// The core produces in-memory records only; this sink is the stand-in for the
// downstream transport, writing one JSON object per line on stdout. Storage
// and querying of the stream stay external.

use anyhow::{Context, Result};
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tracing::debug;

use crate::types::IndicatorSnapshot;

/// Drain `rx`, writing each snapshot as one NDJSON line. Returns when the
/// sender side closes.
pub async fn run_sink(mut rx: mpsc::Receiver<IndicatorSnapshot>) -> Result<()> {
    let mut out = tokio::io::stdout();

    while let Some(snapshot) = rx.recv().await {
        let mut line =
            serde_json::to_string(&snapshot).context("failed to serialize snapshot")?;
        line.push('\n');
        out.write_all(line.as_bytes())
            .await
            .context("failed to write snapshot")?;
        debug!(
            symbol = %snapshot.candle.symbol,
            window_start_ms = snapshot.candle.window_start_ms,
            "snapshot emitted"
        );
    }

    out.flush().await.context("failed to flush sink")?;
    Ok(())
}
