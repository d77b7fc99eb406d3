//! Symbol timing and rectangular pulse shaping.

use num_complex::Complex64;
use tracing::debug;

use crate::error::{LinkError, LinkResult};
use crate::utils::consts::MAX_SAMPLES_PER_SYMBOL;

/// Symbol timing realized on an integer sample grid
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SymbolTiming {
    pub sampling_rate: f64,
    /// Integer upsample factor, always >= 1
    pub samples_per_symbol: usize,
    /// `sampling_rate / samples_per_symbol`. Differs from the requested
    /// `link_bw / (1 + roll_off)` unless that ratio is already integral.
    pub symbol_rate: f64,
}

impl SymbolTiming {
    /// Derive the timing for a link of bandwidth `link_bw` with roll-off `roll_off`
    /// sampled at `sampling_rate`.
    pub fn derive(sampling_rate: f64, link_bw: f64, roll_off: f64) -> LinkResult<Self> {
        if !(sampling_rate.is_finite() && sampling_rate > 0.0) {
            return Err(LinkError::invalid(format!(
                "sampling rate must be positive, got {sampling_rate}"
            )));
        }
        if !(link_bw.is_finite() && link_bw > 0.0) {
            return Err(LinkError::invalid(format!(
                "link bandwidth must be positive, got {link_bw}"
            )));
        }
        if !(roll_off.is_finite() && roll_off >= 0.0) {
            return Err(LinkError::invalid(format!(
                "roll-off must be a non-negative number, got {roll_off}"
            )));
        }

        let requested_rate = link_bw / (1.0 + roll_off);
        if !(requested_rate.is_finite() && requested_rate > 0.0) {
            return Err(LinkError::invalid(format!(
                "roll-off {roll_off} gives a degenerate symbol rate {requested_rate}"
            )));
        }

        let ratio = (sampling_rate / requested_rate).ceil();
        if !(ratio <= MAX_SAMPLES_PER_SYMBOL as f64) {
            return Err(LinkError::invalid(format!(
                "{sampling_rate} Hz over a {requested_rate} Bd symbol rate needs {ratio} samples per symbol, limit is {MAX_SAMPLES_PER_SYMBOL}"
            )));
        }
        let samples_per_symbol = (ratio as usize).max(1);
        let symbol_rate = sampling_rate / samples_per_symbol as f64;

        debug!(
            "timing: requested {:.3} Bd, sps={}, realized {:.3} Bd",
            requested_rate, samples_per_symbol, symbol_rate
        );

        Ok(Self {
            sampling_rate,
            samples_per_symbol,
            symbol_rate,
        })
    }

    pub fn bit_rate(&self, bits_per_symbol: usize) -> f64 {
        self.symbol_rate * bits_per_symbol as f64
    }

    /// Matched-filter processing gain, 10*log10(sps)
    pub fn processing_gain_db(&self) -> f64 {
        10.0 * (self.samples_per_symbol as f64).log10()
    }
}

/// Hold each symbol for `samples_per_symbol` samples
pub fn upsample(symbols: &[Complex64], samples_per_symbol: usize) -> LinkResult<Vec<Complex64>> {
    let total = symbols.len().checked_mul(samples_per_symbol).ok_or_else(|| {
        LinkError::invalid(format!(
            "{} symbols x {} sps overflows the sample count",
            symbols.len(),
            samples_per_symbol
        ))
    })?;
    let mut samples = Vec::with_capacity(total);
    for &symbol in symbols {
        samples.extend(std::iter::repeat_n(symbol, samples_per_symbol));
    }
    Ok(samples)
}
