use serde::{Deserialize, Serialize};
use std::path::Path;

use super::demod::DemodOptions;
use super::scheme::Scheme;
use super::{Modem, ModulateOptions};
use crate::error::LinkResult;
use crate::fixed::Quantizer;
use crate::utils::consts::*;

/// Link parameters for one simulated run, loadable from JSON
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    pub scheme: Scheme,
    pub sampling_rate: f64,
    pub link_bw: f64,
    pub roll_off: f64,
    /// Omit for a quarter of `link_bw`, 0 for complex baseband
    pub carrier_freq: Option<f64>,
    pub snr_db: f64,
    pub amplitude: f64,
    pub seed: Option<u64>,
    pub signal_resolution: u32,
    pub max_amp: f64,
    pub demod: DemodOptions,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            scheme: Scheme::Bpsk,
            sampling_rate: DEFAULT_SAMPLING_RATE,
            link_bw: DEFAULT_LINK_BW,
            roll_off: DEFAULT_ROLL_OFF,
            carrier_freq: None,
            snr_db: DEFAULT_SNR_DB,
            amplitude: 1.0,
            seed: None,
            signal_resolution: DEFAULT_SIGNAL_RESOLUTION,
            max_amp: DEFAULT_MAX_AMP,
            demod: DemodOptions::default(),
        }
    }
}

/// Rates derived from a config
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LinkSummary {
    pub symbol_rate: f64,
    pub samples_per_symbol: usize,
    pub bits_per_symbol: usize,
    pub bit_rate: f64,
    pub expected_processing_gain_db: f64,
}

impl LinkConfig {
    /// 10 MHz link sampled at 20 MHz, 16-bit words
    pub fn preset_10mhz(scheme: Scheme) -> Self {
        Self {
            scheme,
            sampling_rate: PRESET_SAMPLING_RATE,
            link_bw: PRESET_LINK_BW,
            roll_off: 0.25,
            signal_resolution: 16,
            ..Default::default()
        }
    }

    pub fn from_json_str(text: &str) -> LinkResult<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_json_file(path: &Path) -> LinkResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn to_json(&self) -> LinkResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn modem(&self) -> LinkResult<Modem> {
        Modem::new(self.scheme, self.sampling_rate, self.link_bw, self.roll_off)
    }

    pub fn quantizer(&self) -> LinkResult<Quantizer> {
        Quantizer::new(self.signal_resolution, self.max_amp)
    }

    pub fn modulate_options(&self) -> ModulateOptions {
        ModulateOptions {
            snr_db: self.snr_db,
            amplitude: self.amplitude,
            carrier_freq: self.carrier_freq,
            seed: self.seed,
        }
    }

    pub fn summary(&self) -> LinkResult<LinkSummary> {
        let modem = self.modem()?;
        let timing = modem.timing();
        Ok(LinkSummary {
            symbol_rate: timing.symbol_rate,
            samples_per_symbol: timing.samples_per_symbol,
            bits_per_symbol: self.scheme.bits_per_symbol(),
            bit_rate: modem.bit_rate(),
            expected_processing_gain_db: timing.processing_gain_db(),
        })
    }
}
