pub mod bits;
pub mod channel;
pub mod config;
pub mod demod;
pub mod info;
pub mod scheme;
pub mod shaping;

pub use bits::{BitOrder, bits_to_bytes, bytes_to_bits, count_bit_errors};
pub use config::{LinkConfig, LinkSummary};
pub use demod::{DemodOptions, Demodulator, evm_percent};
pub use info::{ModulationInfo, Modulated, SampleStream};
pub use scheme::Scheme;
pub use shaping::SymbolTiming;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{LinkError, LinkResult};
use crate::utils::consts::DEFAULT_SNR_DB;
use channel::{NoiseCalibration, add_awgn, channel_rng, mix_to_carrier};

/// Per-call channel options
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModulateOptions {
    pub snr_db: f64,
    pub amplitude: f64,
    /// `None` uses a quarter of the link bandwidth, `Some(0.0)` gives complex baseband
    pub carrier_freq: Option<f64>,
    pub seed: Option<u64>,
}

impl Default for ModulateOptions {
    fn default() -> Self {
        Self {
            snr_db: DEFAULT_SNR_DB,
            amplitude: 1.0,
            carrier_freq: None,
            seed: None,
        }
    }
}

/// Single-carrier modem for one scheme on one link
#[derive(Debug, Clone)]
pub struct Modem {
    scheme: Scheme,
    link_bw: f64,
    roll_off: f64,
    timing: SymbolTiming,
}

impl Modem {
    pub fn new(scheme: Scheme, sampling_rate: f64, link_bw: f64, roll_off: f64) -> LinkResult<Self> {
        let timing = SymbolTiming::derive(sampling_rate, link_bw, roll_off)?;
        Ok(Self {
            scheme,
            link_bw,
            roll_off,
            timing,
        })
    }

    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    pub fn timing(&self) -> SymbolTiming {
        self.timing
    }

    pub fn link_bw(&self) -> f64 {
        self.link_bw
    }

    pub fn roll_off(&self) -> f64 {
        self.roll_off
    }

    pub fn sampling_rate(&self) -> f64 {
        self.timing.sampling_rate
    }

    pub fn bit_rate(&self) -> f64 {
        self.timing.bit_rate(self.scheme.bits_per_symbol())
    }

    pub fn default_carrier(&self) -> f64 {
        self.link_bw / 4.0
    }

    /// Modulate `bits` through a fresh channel realization seeded from `options.seed`
    pub fn modulate(&self, bits: &[u8], options: &ModulateOptions) -> LinkResult<Modulated> {
        let mut rng = channel_rng(options.seed);
        self.modulate_with_rng(bits, options, &mut rng)
    }

    pub fn modulate_bytes(
        &self,
        bytes: &[u8],
        order: BitOrder,
        options: &ModulateOptions,
    ) -> LinkResult<Modulated> {
        self.modulate(&bytes_to_bits(bytes, order), options)
    }

    /// Modulate drawing channel noise from `rng`. `options.seed` is ignored.
    pub fn modulate_with_rng<R: Rng + ?Sized>(
        &self,
        bits: &[u8],
        options: &ModulateOptions,
        rng: &mut R,
    ) -> LinkResult<Modulated> {
        if options.snr_db.is_nan() || options.snr_db == f64::NEG_INFINITY {
            return Err(LinkError::invalid(format!("invalid SNR {} dB", options.snr_db)));
        }
        if !options.amplitude.is_finite() {
            return Err(LinkError::invalid(format!(
                "amplitude must be finite, got {}",
                options.amplitude
            )));
        }
        let carrier_freq = options
            .carrier_freq
            .unwrap_or_else(|| self.default_carrier());
        if !carrier_freq.is_finite() {
            return Err(LinkError::invalid(format!(
                "carrier frequency must be finite, got {carrier_freq}"
            )));
        }

        let sps = self.timing.samples_per_symbol;
        let symbols = self.scheme.map_bits(bits);
        let mut baseband = shaping::upsample(&symbols, sps)?;
        for sample in baseband.iter_mut() {
            *sample *= options.amplitude;
        }

        let noise = NoiseCalibration::for_snr(&baseband, options.snr_db);
        add_awgn(&mut baseband, noise.sigma, rng);

        debug!(
            "{}: {} bits -> {} symbols x {} sps, signal power {:.4}, sigma {:.6}",
            self.scheme,
            bits.len(),
            symbols.len(),
            sps,
            noise.signal_power,
            noise.sigma
        );

        let stream = if carrier_freq == 0.0 {
            SampleStream::Complex(baseband.clone())
        } else {
            SampleStream::Real(mix_to_carrier(&baseband, carrier_freq, self.sampling_rate()))
        };

        let info = ModulationInfo {
            n_bits: bits.len(),
            bit_rate: self.bit_rate(),
            samples_per_symbol: sps,
            total_samples: baseband.len(),
            carrier_freq,
            snr_db: options.snr_db,
            noise_std: noise.sigma,
            sampling_rate: self.sampling_rate(),
        };

        Ok(Modulated {
            stream,
            baseband,
            info,
        })
    }

    pub fn demodulate(&self, stream: &SampleStream, info: &ModulationInfo) -> LinkResult<Vec<u8>> {
        self.demodulate_with(stream, info, DemodOptions::default())
    }

    pub fn demodulate_with(
        &self,
        stream: &SampleStream,
        info: &ModulationInfo,
        options: DemodOptions,
    ) -> LinkResult<Vec<u8>> {
        Demodulator::new(self.scheme, options).demodulate(stream, info)
    }

    pub fn demodulate_bytes(
        &self,
        stream: &SampleStream,
        info: &ModulationInfo,
        order: BitOrder,
    ) -> LinkResult<Vec<u8>> {
        Ok(bits_to_bytes(&self.demodulate(stream, info)?, order))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference(scheme: Scheme) -> Modem {
        Modem::new(scheme, 40e6, 10e6, 0.25).unwrap()
    }

    #[test]
    fn test_info_fields() {
        let modem = reference(Scheme::Qam16);
        let options = ModulateOptions {
            snr_db: 20.0,
            carrier_freq: Some(0.0),
            seed: Some(1),
            ..Default::default()
        };
        let out = modem.modulate(&[1, 0, 1, 1, 0, 1], &options).unwrap();
        assert_eq!(out.info.n_bits, 6);
        assert_eq!(out.info.samples_per_symbol, 5);
        assert_eq!(out.info.total_samples, 10);
        assert_eq!(out.info.bit_rate, 32e6);
        assert_eq!(out.info.sampling_rate, 40e6);
        assert!(out.stream.is_complex());
        assert_eq!(out.stream.len(), 10);
    }

    #[test]
    fn test_default_carrier_gives_passband() {
        let modem = reference(Scheme::Bpsk);
        let out = modem
            .modulate(&[0, 1], &ModulateOptions::default())
            .unwrap();
        assert_eq!(out.info.carrier_freq, 2.5e6);
        assert!(!out.stream.is_complex());
        assert_eq!(out.stream.len(), 10);
    }

    #[test]
    fn test_amplitude_scales_baseband() {
        let modem = reference(Scheme::Bpsk);
        let options = ModulateOptions {
            snr_db: f64::INFINITY,
            amplitude: 0.5,
            carrier_freq: Some(0.0),
            seed: Some(3),
        };
        let out = modem.modulate(&[1], &options).unwrap();
        assert_eq!(out.info.noise_std, 0.0);
        for sample in &out.baseband {
            assert_eq!(sample.re, -0.5);
        }
    }

    #[test]
    fn test_empty_input() {
        let modem = reference(Scheme::Qpsk);
        let out = modem
            .modulate(&[], &ModulateOptions { seed: Some(9), ..Default::default() })
            .unwrap();
        assert!(out.stream.is_empty());
        assert_eq!(out.info.noise_std, 0.0);
        assert!(modem.demodulate(&out.stream, &out.info).unwrap().is_empty());
    }

    #[test]
    fn test_rejects_nan_snr() {
        let modem = reference(Scheme::Qpsk);
        let options = ModulateOptions {
            snr_db: f64::NAN,
            ..Default::default()
        };
        assert!(modem.modulate(&[0, 1], &options).is_err());
    }
}
