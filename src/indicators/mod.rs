// =============================================================================
// Technical Indicators Module
// =============================================================================
//
// Pure, side-effect-free indicator math over ordered close-price / volume
// series (oldest first). Every trailing-value function returns `Option<f64>`
// so callers are forced to handle the warm-up case: insufficient history is
// `None`, never an error.

pub mod ema;
pub mod macd;
pub mod obv;
pub mod rsi;
pub mod sma;
