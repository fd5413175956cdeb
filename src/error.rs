// =============================================================================
// Error taxonomy for the candleflow pipeline
// =============================================================================
//
// Only genuinely invalid input is an error. A trade landing in an
// already-evicted window is a counted anomaly (see pipeline.rs), and an
// indicator with insufficient history simply yields `None` — neither ever
// surfaces as a `PipelineError`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// Malformed trade or invalid configuration. Fatal to the call that
    /// supplied it, never to the process; per-symbol state is untouched.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl PipelineError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }
}
