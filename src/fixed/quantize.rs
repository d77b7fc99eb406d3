//! Fixed-point quantization of sample streams.
//!
//! The scale depends only on the word width and the reference amplitude, never
//! on the data, so independently generated streams share one format and I/Q
//! keep their relative phase.

use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{LinkError, LinkResult};
use crate::modem::{ModulationInfo, SampleStream};
use crate::utils::consts::{DEFAULT_MAX_AMP, MAX_SIGNAL_RESOLUTION, QUANT_HEADROOM};

/// How words map back to samples
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamLayout {
    /// One word per real sample
    Real,
    /// I0, Q0, I1, Q1, ...
    InterleavedIq,
}

/// Metadata emitted next to the words. Field set and order are fixed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StreamMeta {
    pub sampling_rate: u32,
    pub signal_resolution: u32,
    pub carrier_freq: f64,
    pub samples_per_symbol: f64,
    /// Number of words, so twice the sample count for interleaved I/Q
    pub n_samples: usize,
    pub scale: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuantizedStream {
    pub layout: StreamLayout,
    pub words: Vec<u32>,
    pub meta: StreamMeta,
}

impl QuantizedStream {
    /// Recover float samples using the stream's own resolution and scale
    pub fn dequantize(&self) -> LinkResult<SampleStream> {
        let quantizer = Quantizer::new(self.meta.signal_resolution, DEFAULT_MAX_AMP)?;
        let scale = self.meta.scale;
        if !(scale.is_finite() && scale > 0.0) {
            return Err(LinkError::invalid(format!("cannot invert scale {scale}")));
        }
        let half = quantizer.half() as f64;
        let restore = |word: u32| (word as f64 - half) / scale;

        match self.layout {
            StreamLayout::Real => Ok(SampleStream::Real(
                self.words.iter().map(|&w| restore(w)).collect(),
            )),
            StreamLayout::InterleavedIq => {
                if self.words.len() % 2 != 0 {
                    return Err(LinkError::invalid(format!(
                        "interleaved stream has odd word count {}",
                        self.words.len()
                    )));
                }
                Ok(SampleStream::Complex(
                    self.words
                        .chunks_exact(2)
                        .map(|pair| Complex64::new(restore(pair[0]), restore(pair[1])))
                        .collect(),
                ))
            }
        }
    }
}

/// Maps floats onto `[0, 2^resolution - 1]` around mid-scale
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quantizer {
    resolution: u32,
    max_amp: f64,
}

impl Quantizer {
    pub fn new(resolution: u32, max_amp: f64) -> LinkResult<Self> {
        if resolution == 0 || resolution > MAX_SIGNAL_RESOLUTION {
            return Err(LinkError::invalid(format!(
                "resolution must be 1..={MAX_SIGNAL_RESOLUTION} bits, got {resolution}"
            )));
        }
        if !(max_amp.is_finite() && max_amp >= 0.0) {
            return Err(LinkError::invalid(format!(
                "max_amp must be a non-negative number, got {max_amp}"
            )));
        }
        if resolution % 8 != 0 {
            warn!("resolution {} is not a whole number of bytes", resolution);
        }
        Ok(Self {
            resolution,
            max_amp,
        })
    }

    pub fn with_resolution(resolution: u32) -> LinkResult<Self> {
        Self::new(resolution, DEFAULT_MAX_AMP)
    }

    pub fn resolution(&self) -> u32 {
        self.resolution
    }

    pub fn max_amp(&self) -> f64 {
        self.max_amp
    }

    pub fn max_uint(&self) -> u32 {
        ((1u64 << self.resolution) - 1) as u32
    }

    pub fn half(&self) -> u32 {
        self.max_uint() / 2
    }

    /// `half * 0.95 / max_amp`, or 1.0 when `max_amp` is 0
    pub fn scale(&self) -> f64 {
        if self.max_amp == 0.0 {
            1.0
        } else {
            self.half() as f64 * QUANT_HEADROOM / self.max_amp
        }
    }

    /// Quantize one sample. The flag is set when the value had to be clamped.
    /// Ties round to even; NaN maps to 0.
    pub fn quantize_sample(&self, x: f64) -> (u32, bool) {
        let max = self.max_uint() as f64;
        let mapped = (self.half() as f64 + x * self.scale()).round_ties_even();
        let clamped = mapped.clamp(0.0, max);
        (clamped as u32, mapped < 0.0 || mapped > max)
    }

    pub fn quantize_real(&self, samples: &[f64]) -> Vec<u32> {
        let mut clipped = 0usize;
        let words = samples
            .iter()
            .map(|&x| {
                let (word, hit) = self.quantize_sample(x);
                clipped += usize::from(hit);
                word
            })
            .collect();
        self.report_clipping(clipped, samples.len());
        words
    }

    /// Quantize I and Q with the same scale and interleave them, I first
    pub fn quantize_iq(&self, samples: &[Complex64]) -> Vec<u32> {
        let mut clipped = 0usize;
        let mut words = Vec::with_capacity(samples.len() * 2);
        for sample in samples {
            for x in [sample.re, sample.im] {
                let (word, hit) = self.quantize_sample(x);
                clipped += usize::from(hit);
                words.push(word);
            }
        }
        self.report_clipping(clipped, words.len());
        words
    }

    /// Quantize a modulated stream and attach its metadata
    pub fn quantize(&self, stream: &SampleStream, info: &ModulationInfo) -> LinkResult<QuantizedStream> {
        let sampling_rate = sampling_rate_u32(info.sampling_rate)?;
        let (layout, words) = match stream {
            SampleStream::Real(samples) => (StreamLayout::Real, self.quantize_real(samples)),
            SampleStream::Complex(samples) => (StreamLayout::InterleavedIq, self.quantize_iq(samples)),
        };
        let meta = StreamMeta {
            sampling_rate,
            signal_resolution: self.resolution,
            carrier_freq: info.carrier_freq,
            samples_per_symbol: info.samples_per_symbol as f64,
            n_samples: words.len(),
            scale: self.scale(),
        };
        debug!(
            "quantized {} words ({:?}) at {} bits, scale {}",
            meta.n_samples, layout, self.resolution, meta.scale
        );
        Ok(QuantizedStream { layout, words, meta })
    }

    fn report_clipping(&self, clipped: usize, total: usize) {
        if clipped > 0 {
            warn!(
                "{} of {} values clamped to the {}-bit range (max_amp {})",
                clipped, total, self.resolution, self.max_amp
            );
        }
    }
}

/// Storage width of one word of `resolution` bits: 8, 16 or 32
pub fn storage_bits(resolution: u32) -> u32 {
    match resolution {
        0..=8 => 8,
        9..=16 => 16,
        _ => 32,
    }
}

/// Sampling rate as the `uint32_t` carried in stream metadata
pub fn sampling_rate_u32(sampling_rate: f64) -> LinkResult<u32> {
    let rounded = sampling_rate.round();
    if rounded >= 1.0 && rounded <= u32::MAX as f64 {
        Ok(rounded as u32)
    } else {
        Err(LinkError::invalid(format!(
            "sampling rate {sampling_rate} Hz does not fit a 32-bit metadata field"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_scale_and_values() {
        let q = Quantizer::new(16, 1.5).unwrap();
        assert_eq!(q.max_uint(), 65535);
        assert_eq!(q.half(), 32767);
        assert!((q.scale() - 20752.433333).abs() < 1e-3);
        assert_eq!(q.quantize_real(&[0.0, 1.5, -1.5]), vec![32767, 63896, 1638]);
    }

    #[test]
    fn test_clamp_path() {
        let q = Quantizer::new(16, 1.5).unwrap();
        assert_eq!(q.quantize_sample(2.0), (65535, true));
        assert_eq!(q.quantize_sample(-3.0), (0, true));
        assert_eq!(q.quantize_sample(1.0), (53519, false));
    }

    #[test]
    fn test_all_zero_input_is_mid_scale() {
        for resolution in [8, 12, 16, 24, 32] {
            let q = Quantizer::with_resolution(resolution).unwrap();
            let words = q.quantize_real(&[0.0; 10]);
            assert!(words.iter().all(|&w| w == q.half()));
        }
    }

    #[test]
    fn test_outputs_stay_in_range() {
        let inputs: Vec<f64> = (-50..=50).map(|k| k as f64 * 0.173).collect();
        for resolution in [1, 4, 8, 16, 32] {
            let q = Quantizer::new(resolution, 1.5).unwrap();
            let max = q.max_uint();
            assert!(q.quantize_real(&inputs).iter().all(|&w| w <= max));
        }
    }

    #[test]
    fn test_zero_max_amp_uses_unit_scale() {
        let q = Quantizer::new(8, 0.0).unwrap();
        assert_eq!(q.scale(), 1.0);
        assert_eq!(q.quantize_real(&[0.0, 3.0, -200.0]), vec![127, 130, 0]);
    }

    #[test]
    fn test_iq_share_scale_and_interleave() {
        let q = Quantizer::new(16, 1.5).unwrap();
        let samples = [Complex64::new(0.5, 0.5), Complex64::new(-1.0, 0.25)];
        let words = q.quantize_iq(&samples);
        assert_eq!(words.len(), 4);
        // equal I and Q values give equal words
        assert_eq!(words[0], words[1]);
        assert_eq!(words[2], q.quantize_sample(-1.0).0);
        assert_eq!(words[3], q.quantize_sample(0.25).0);
    }

    #[test]
    fn test_invalid_parameters() {
        assert!(Quantizer::new(0, 1.5).is_err());
        assert!(Quantizer::new(33, 1.5).is_err());
        assert!(Quantizer::new(16, -1.0).is_err());
        assert!(Quantizer::new(16, f64::NAN).is_err());
    }

    #[test]
    fn test_storage_bits() {
        assert_eq!(storage_bits(1), 8);
        assert_eq!(storage_bits(8), 8);
        assert_eq!(storage_bits(12), 16);
        assert_eq!(storage_bits(24), 32);
        assert_eq!(storage_bits(32), 32);
    }

    #[test]
    fn test_sampling_rate_must_fit_metadata() {
        assert_eq!(sampling_rate_u32(20e6).unwrap(), 20_000_000);
        assert_eq!(sampling_rate_u32(u32::MAX as f64).unwrap(), u32::MAX);
        assert!(sampling_rate_u32(5e9).is_err());
        assert!(sampling_rate_u32(0.2).is_err());
        assert!(sampling_rate_u32(f64::NAN).is_err());

        let q = Quantizer::new(16, 1.5).unwrap();
        let info = ModulationInfo {
            n_bits: 1,
            bit_rate: 1.0,
            samples_per_symbol: 1,
            total_samples: 1,
            carrier_freq: 0.0,
            snr_db: 40.0,
            noise_std: 0.0,
            sampling_rate: 5e9,
        };
        let stream = SampleStream::Complex(vec![Complex64::new(1.0, 0.0)]);
        assert!(q.quantize(&stream, &info).is_err());
    }

    #[test]
    fn test_dequantize_restores_samples() {
        let q = Quantizer::new(16, 1.5).unwrap();
        let info = ModulationInfo {
            n_bits: 2,
            bit_rate: 1.0,
            samples_per_symbol: 1,
            total_samples: 2,
            carrier_freq: 0.0,
            snr_db: 40.0,
            noise_std: 0.0,
            sampling_rate: 8.0,
        };
        let stream = SampleStream::Complex(vec![Complex64::new(0.7, -0.7), Complex64::new(-1.0, 0.1)]);
        let quantized = q.quantize(&stream, &info).unwrap();
        assert_eq!(quantized.layout, StreamLayout::InterleavedIq);
        assert_eq!(quantized.meta.n_samples, 4);

        let restored = quantized.dequantize().unwrap();
        let restored = restored.as_complex().unwrap();
        let step = 1.0 / q.scale();
        for (a, b) in restored.iter().zip(stream.as_complex().unwrap()) {
            assert!((a - b).norm() <= step);
        }
    }

    #[test]
    fn test_dequantize_rejects_odd_interleaved() {
        let quantized = QuantizedStream {
            layout: StreamLayout::InterleavedIq,
            words: vec![1, 2, 3],
            meta: StreamMeta {
                sampling_rate: 1,
                signal_resolution: 16,
                carrier_freq: 0.0,
                samples_per_symbol: 1.0,
                n_samples: 3,
                scale: 100.0,
            },
        };
        assert!(quantized.dequantize().is_err());
    }
}
