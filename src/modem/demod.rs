//! Coherent demodulation: downconvert, matched filter, sample at symbol
//! centers, slice.

use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::channel::carrier_phase;
use super::info::{ModulationInfo, SampleStream};
use super::scheme::Scheme;
use crate::error::LinkResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DemodOptions {
    /// Estimate and remove a common carrier phase rotation before slicing
    pub phase_correction: bool,
}

pub struct Demodulator {
    scheme: Scheme,
    options: DemodOptions,
}

impl Demodulator {
    pub fn new(scheme: Scheme, options: DemodOptions) -> Self {
        Self { scheme, options }
    }

    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    /// Recover at most `info.n_bits` bits from `stream`.
    ///
    /// An empty stream yields no bits. A stream shorter or longer than `info`
    /// describes is truncated to whichever is shorter.
    pub fn demodulate(&self, stream: &SampleStream, info: &ModulationInfo) -> LinkResult<Vec<u8>> {
        let symbols = self.recover_symbols(stream, info)?;
        Ok(self.slice_bits(&symbols, info.n_bits))
    }

    /// Slice filtered symbols and keep the first `n_bits` bits
    pub fn slice_bits(&self, symbols: &[Complex64], n_bits: usize) -> Vec<u8> {
        let mut bits = self.scheme.slice(symbols);
        bits.truncate(n_bits);
        bits
    }

    /// Filtered, phase-corrected symbols at the decision instants, before slicing
    pub fn recover_symbols(
        &self,
        stream: &SampleStream,
        info: &ModulationInfo,
    ) -> LinkResult<Vec<Complex64>> {
        info.validate()?;
        if stream.is_empty() {
            return Ok(Vec::new());
        }

        let sps = info.samples_per_symbol;
        let (baseband, needs_doubling) = downconvert(stream, info.carrier_freq, info.sampling_rate);

        let mut filtered = matched_filter(&baseband, sps);
        // mixing a real signal down keeps only half of its envelope
        if needs_doubling {
            for sample in filtered.iter_mut() {
                *sample *= 2.0;
            }
        }

        let mut symbols: Vec<Complex64> = symbol_centers(filtered.len(), sps)
            .map(|index| filtered[index])
            .collect();

        let expected = self.scheme.symbol_count(info.n_bits);
        if symbols.len() != expected {
            warn!(
                "{}: stream carries {} symbols, info expects {}; using {}",
                self.scheme,
                symbols.len(),
                expected,
                symbols.len().min(expected)
            );
        }
        symbols.truncate(expected);

        if self.options.phase_correction {
            let phi = estimate_phase(self.scheme, &symbols);
            debug!("{}: removing {:.4} rad common phase", self.scheme, phi);
            let rotation = Complex64::from_polar(1.0, -phi);
            for symbol in symbols.iter_mut() {
                *symbol *= rotation;
            }
        }
        Ok(symbols)
    }
}

/// Error vector magnitude against the nearest ideal points, in percent.
/// Zero for no symbols or an all-zero decision set.
pub fn evm_percent(scheme: Scheme, symbols: &[Complex64]) -> f64 {
    let (err, sig) = symbols.iter().fold((0.0, 0.0), |(err, sig), &rx| {
        let ideal = scheme.nearest_point(rx);
        (err + (rx - ideal).norm_sqr(), sig + ideal.norm_sqr())
    });
    if sig > 0.0 { (err / sig).sqrt() * 100.0 } else { 0.0 }
}

/// Bring a stream to complex baseband.
///
/// Complex input is used as is. Real input is multiplied by exp(-j*2*pi*fc*t);
/// the returned flag is set in that case because the result carries half the
/// original envelope.
pub fn downconvert(stream: &SampleStream, carrier_freq: f64, sampling_rate: f64) -> (Vec<Complex64>, bool) {
    match stream {
        SampleStream::Complex(samples) => (samples.clone(), false),
        SampleStream::Real(samples) => {
            let baseband = samples
                .iter()
                .enumerate()
                .map(|(n, &x)| {
                    let lo = Complex64::from_polar(1.0, -carrier_phase(carrier_freq, sampling_rate, n));
                    lo * x
                })
                .collect();
            (baseband, true)
        }
    }
}

/// Boxcar filter of length `taps` with unit DC gain. Output has the input's
/// length; window `n` covers `[n - taps/2, n + (taps-1)/2]`, clipped at the edges.
pub fn matched_filter(samples: &[Complex64], taps: usize) -> Vec<Complex64> {
    let len = samples.len();
    if taps <= 1 {
        return samples.to_vec();
    }
    let gain = 1.0 / taps as f64;
    let back = taps / 2;
    let ahead = (taps - 1) / 2;

    (0..len)
        .map(|n| {
            let lo = n.saturating_sub(back);
            let hi = (n + ahead).min(len - 1);
            samples[lo..=hi]
                .iter()
                .sum::<Complex64>()
                * gain
        })
        .collect()
}

/// Indices of symbol centers: `sps/2`, then every `sps` samples
pub fn symbol_centers(len: usize, samples_per_symbol: usize) -> impl Iterator<Item = usize> {
    (samples_per_symbol / 2..len).step_by(samples_per_symbol.max(1))
}

/// Blind estimate of a common phase rotation.
///
/// Uses the 2nd-power moment for BPSK and the 4th-power moment for QPSK and
/// 16-QAM, both referenced so that an unrotated constellation gives 0.
pub fn estimate_phase(scheme: Scheme, symbols: &[Complex64]) -> f64 {
    if symbols.is_empty() {
        return 0.0;
    }
    let n = symbols.len() as f64;
    match scheme {
        Scheme::Bpsk => {
            let m2 = symbols.iter().map(|s| s * s).sum::<Complex64>() / n;
            m2.arg() / 2.0
        }
        Scheme::Qpsk | Scheme::Qam16 => {
            // square constellations put their 4th moment on the negative real axis
            let m4 = symbols.iter().map(|s| s.powi(4)).sum::<Complex64>() / n;
            (-m4).arg() / 4.0
        }
    }
}
