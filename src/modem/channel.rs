//! AWGN channel and carrier mixing.
//!
//! Noise is drawn from a caller-supplied RNG so a fixed seed reproduces the
//! exact noise sequence.

use num_complex::Complex64;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, StandardNormal};
use std::f64::consts::PI;

/// Noise level calibrated against a block of clean baseband
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoiseCalibration {
    /// Mean of I^2 + Q^2 over the block
    pub signal_power: f64,
    /// Total complex noise power
    pub noise_power: f64,
    /// Standard deviation of each real component
    pub sigma: f64,
}

impl NoiseCalibration {
    /// Calibrate noise so that `signal_power / noise_power` equals `snr_db`.
    /// A zero-power block gets zero noise.
    pub fn for_snr(baseband: &[Complex64], snr_db: f64) -> Self {
        let signal_power = if baseband.is_empty() {
            0.0
        } else {
            baseband
                .iter()
                .map(|s| s.norm_sqr())
                .sum::<f64>()
                / baseband.len() as f64
        };

        let snr_linear = 10f64.powf(snr_db / 10.0);
        let noise_power = if signal_power > 0.0 {
            signal_power / snr_linear
        } else {
            0.0
        };
        let sigma = if noise_power > 0.0 {
            (noise_power / 2.0).sqrt()
        } else {
            0.0
        };

        Self {
            signal_power,
            noise_power,
            sigma,
        }
    }
}

/// RNG for one channel realization: seeded when `seed` is given, OS entropy otherwise
pub fn channel_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    }
}

/// Add independent N(0, sigma) noise to I and Q.
///
/// All I draws are taken before all Q draws.
pub fn add_awgn<R: Rng + ?Sized>(baseband: &mut [Complex64], sigma: f64, rng: &mut R) {
    if sigma <= 0.0 {
        return;
    }
    for sample in baseband.iter_mut() {
        let z: f64 = StandardNormal.sample(rng);
        sample.re += sigma * z;
    }
    for sample in baseband.iter_mut() {
        let z: f64 = StandardNormal.sample(rng);
        sample.im += sigma * z;
    }
}

/// Phase of a carrier at sample `n`
#[inline]
pub fn carrier_phase(carrier_freq: f64, sampling_rate: f64, n: usize) -> f64 {
    2.0 * PI * carrier_freq * (n as f64 / sampling_rate)
}

/// Real passband: s[n] = I[n]cos(wn) - Q[n]sin(wn)
pub fn mix_to_carrier(baseband: &[Complex64], carrier_freq: f64, sampling_rate: f64) -> Vec<f64> {
    baseband
        .iter()
        .enumerate()
        .map(|(n, s)| {
            let phase = carrier_phase(carrier_freq, sampling_rate, n);
            s.re * phase.cos() - s.im * phase.sin()
        })
        .collect()
}
