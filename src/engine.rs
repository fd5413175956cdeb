// =============================================================================
// Indicator Engine — trailing indicator values over the rolling buffer
// =============================================================================
//
// Recomputes the configured indicator set on every buffer update and aligns
// each value to the last element of the series ("as of now"). Window-based
// indicators (SMA, RSI, MACD) are recomputed from the bounded buffer.
//
// EMA and OBV are classically defined over unbounded history, which a bounded
// buffer truncates. They are therefore carried incrementally instead: one
// close per superseded window is committed into a small carry
// (`EmaCarry` / `ObvCarry`), and the in-progress window's close is applied
// transiently on each compute. The carries stay exact across buffer
// evictions.
//
// The output-field set is resolved once at startup (`IndicatorLayout`) from
// the configured look-back periods; it never changes mid-run.

use std::collections::BTreeMap;

use crate::buffer::RollingBuffer;
use crate::error::PipelineError;
use crate::indicators::{ema, macd, obv, rsi, sma};
use crate::types::Candle;

// =============================================================================
// IndicatorLayout
// =============================================================================

/// The fixed indicator configuration: which look-back periods are computed
/// and which MACD parameters apply. Resolved once at startup.
#[derive(Debug, Clone)]
pub struct IndicatorLayout {
    pub periods: Vec<usize>,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
}

impl IndicatorLayout {
    pub fn new(
        periods: Vec<usize>,
        macd_fast: usize,
        macd_slow: usize,
        macd_signal: usize,
    ) -> Result<Self, PipelineError> {
        if periods.is_empty() {
            return Err(PipelineError::invalid("look-back period set is empty"));
        }
        if periods.contains(&0) {
            return Err(PipelineError::invalid("look-back periods must be positive"));
        }
        if macd_fast == 0 || macd_signal == 0 || macd_fast >= macd_slow {
            return Err(PipelineError::invalid(format!(
                "invalid MACD parameters: fast={macd_fast} slow={macd_slow} signal={macd_signal}"
            )));
        }
        Ok(Self {
            periods,
            macd_fast,
            macd_slow,
            macd_signal,
        })
    }

    /// All output field names, in emission order.
    pub fn field_names(&self) -> Vec<String> {
        let mut names = Vec::with_capacity(self.periods.len() * 3 + 4);
        for &k in &self.periods {
            names.push(format!("sma_{k}"));
            names.push(format!("ema_{k}"));
            names.push(format!("rsi_{k}"));
        }
        names.push("macd".to_string());
        names.push("macd_signal".to_string());
        names.push("macd_histogram".to_string());
        names.push("obv".to_string());
        names
    }
}

// =============================================================================
// Carried incremental state
// =============================================================================

/// Incremental EMA accumulator for one look-back period.
///
/// Seeds with the SMA of the first `period` committed closes, then applies
/// the standard recursion. `project` computes the value as if `close` were
/// committed next, without mutating the carry — the in-progress window is
/// folded in transiently on every compute and only committed once superseded.
#[derive(Debug, Clone)]
pub struct EmaCarry {
    period: usize,
    seed: Vec<f64>,
    value: Option<f64>,
}

impl EmaCarry {
    pub fn new(period: usize) -> Self {
        Self {
            period,
            seed: Vec::with_capacity(period),
            value: None,
        }
    }

    /// Commit a superseded window's close.
    pub fn commit(&mut self, close: f64) {
        match self.value {
            Some(prev) => {
                let mult = ema::multiplier(self.period);
                self.value = Some(close * mult + prev * (1.0 - mult));
            }
            None => {
                self.seed.push(close);
                if self.seed.len() == self.period {
                    self.value = Some(self.seed.iter().sum::<f64>() / self.period as f64);
                }
            }
        }
    }

    /// Value with `close` applied on top of the committed state, or `None`
    /// while still warming up.
    pub fn project(&self, close: f64) -> Option<f64> {
        match self.value {
            Some(prev) => {
                let mult = ema::multiplier(self.period);
                Some(close * mult + prev * (1.0 - mult))
            }
            None if self.seed.len() + 1 == self.period => {
                Some((self.seed.iter().sum::<f64>() + close) / self.period as f64)
            }
            None => None,
        }
    }
}

/// Incremental OBV accumulator: cumulative value plus the previous committed
/// close needed to sign the next delta.
#[derive(Debug, Clone, Default)]
pub struct ObvCarry {
    value: f64,
    last_close: Option<f64>,
}

impl ObvCarry {
    /// Commit a superseded window's close and volume.
    pub fn commit(&mut self, close: f64, volume: f64) {
        if let Some(prev_close) = self.last_close {
            self.value = obv::step(self.value, prev_close, close, volume);
        }
        self.last_close = Some(close);
    }

    /// Value with the in-progress candle applied transiently. The very first
    /// candle contributes 0.
    pub fn project(&self, close: f64, volume: f64) -> f64 {
        match self.last_close {
            Some(prev_close) => obv::step(self.value, prev_close, close, volume),
            None => 0.0,
        }
    }
}

/// Per-symbol carried indicator state, decoupled from the fixed-size buffer.
#[derive(Debug)]
pub struct CarriedState {
    emas: Vec<EmaCarry>,
    obv: ObvCarry,
}

impl CarriedState {
    pub fn new(layout: &IndicatorLayout) -> Self {
        Self {
            emas: layout.periods.iter().map(|&k| EmaCarry::new(k)).collect(),
            obv: ObvCarry::default(),
        }
    }

    /// Commit a superseded window's final candle.
    pub fn commit(&mut self, candle: &Candle) {
        for carry in &mut self.emas {
            carry.commit(candle.close);
        }
        self.obv.commit(candle.close, candle.volume);
    }

    /// Rebuild the carries from the buffer's superseded candles (all but the
    /// last entry). Used after a late trade amends a retained older window,
    /// which invalidates already-committed closes. History evicted from the
    /// buffer is lost to the rebuilt carry; amendments are rare enough that
    /// this truncation is accepted.
    pub fn rebuild(layout: &IndicatorLayout, buffer: &RollingBuffer) -> Self {
        let mut state = Self::new(layout);
        let len = buffer.len();
        for candle in buffer.iter().take(len.saturating_sub(1)) {
            state.commit(candle);
        }
        state
    }
}

// =============================================================================
// IndicatorEngine
// =============================================================================

/// Stateless computation of the configured indicator set over one symbol's
/// buffer and carried state.
#[derive(Debug, Clone)]
pub struct IndicatorEngine {
    layout: IndicatorLayout,
}

impl IndicatorEngine {
    pub fn new(layout: IndicatorLayout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &IndicatorLayout {
        &self.layout
    }

    /// Compute every configured indicator "as of" the buffer's last entry.
    /// An empty buffer yields every field as `None`.
    pub fn compute(
        &self,
        buffer: &RollingBuffer,
        carried: &CarriedState,
    ) -> BTreeMap<String, Option<f64>> {
        let closes = buffer.closes();
        let current = buffer.last();

        let mut out = BTreeMap::new();
        for (&k, carry) in self.layout.periods.iter().zip(&carried.emas) {
            out.insert(format!("sma_{k}"), sma::trailing_sma(&closes, k));
            out.insert(
                format!("ema_{k}"),
                current.and_then(|c| carry.project(c.close)),
            );
            out.insert(format!("rsi_{k}"), rsi::trailing_rsi(&closes, k));
        }

        let macd_values = macd::trailing_macd(
            &closes,
            self.layout.macd_fast,
            self.layout.macd_slow,
            self.layout.macd_signal,
        );
        out.insert("macd".into(), macd_values.map(|(m, _, _)| m));
        out.insert("macd_signal".into(), macd_values.map(|(_, s, _)| s));
        out.insert("macd_histogram".into(), macd_values.map(|(_, _, h)| h));

        out.insert(
            "obv".into(),
            current.map(|c| carried.obv.project(c.close, c.volume)),
        );

        out
    }
}
