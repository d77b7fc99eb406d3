use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::error::{LinkError, LinkResult};

/// Metadata produced by one modulate call and required, unchanged, by the
/// matching demodulate or quantize call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModulationInfo {
    /// Source bits before padding
    pub n_bits: usize,
    pub bit_rate: f64,
    pub samples_per_symbol: usize,
    pub total_samples: usize,
    /// 0.0 for complex baseband output
    pub carrier_freq: f64,
    pub snr_db: f64,
    /// Noise standard deviation of each real component
    pub noise_std: f64,
    pub sampling_rate: f64,
}

impl ModulationInfo {
    pub fn is_baseband(&self) -> bool {
        self.carrier_freq == 0.0
    }

    /// Fail fast on metadata no modulate call could have produced
    pub fn validate(&self) -> LinkResult<()> {
        if self.samples_per_symbol == 0 {
            return Err(LinkError::invalid("samples_per_symbol must be at least 1"));
        }
        if !(self.sampling_rate.is_finite() && self.sampling_rate > 0.0) {
            return Err(LinkError::invalid(format!(
                "sampling rate must be positive, got {}",
                self.sampling_rate
            )));
        }
        if !self.carrier_freq.is_finite() {
            return Err(LinkError::invalid("carrier frequency must be finite"));
        }
        Ok(())
    }
}

/// Transmitted samples. Real passband when a carrier was requested,
/// complex baseband otherwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "samples", rename_all = "lowercase")]
pub enum SampleStream {
    Real(Vec<f64>),
    Complex(Vec<Complex64>),
}

impl SampleStream {
    pub fn len(&self) -> usize {
        match self {
            SampleStream::Real(samples) => samples.len(),
            SampleStream::Complex(samples) => samples.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_complex(&self) -> bool {
        matches!(self, SampleStream::Complex(_))
    }

    pub fn as_real(&self) -> Option<&[f64]> {
        match self {
            SampleStream::Real(samples) => Some(samples),
            SampleStream::Complex(_) => None,
        }
    }

    pub fn as_complex(&self) -> Option<&[Complex64]> {
        match self {
            SampleStream::Complex(samples) => Some(samples),
            SampleStream::Real(_) => None,
        }
    }
}

/// Output of one modulate call
#[derive(Debug, Clone)]
pub struct Modulated {
    pub stream: SampleStream,
    /// Noisy complex baseband before carrier mixing
    pub baseband: Vec<Complex64>,
    pub info: ModulationInfo,
}
