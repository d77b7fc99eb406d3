//! Constellations of the supported schemes.
//!
//! Every scheme is Gray coded and normalized to unit average symbol energy.

use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::f64::consts::FRAC_1_SQRT_2;
use std::fmt;
use std::str::FromStr;

use crate::error::LinkError;

/// Per-axis QPSK amplitude, 1/sqrt(2)
pub const QPSK_NORM: f64 = FRAC_1_SQRT_2;

/// 16-QAM level unit, 1/sqrt(10)
pub const QAM16_NORM: f64 = 0.316_227_766_016_837_94;

/// PAM-4 levels of one 16-QAM axis, in units of `QAM16_NORM`
const PAM4_LEVELS: [f64; 4] = [-3.0, -1.0, 1.0, 3.0];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
    #[default]
    Bpsk,
    Qpsk,
    Qam16,
}

impl Scheme {
    pub const ALL: [Scheme; 3] = [Scheme::Bpsk, Scheme::Qpsk, Scheme::Qam16];

    pub fn bits_per_symbol(self) -> usize {
        match self {
            Scheme::Bpsk => 1,
            Scheme::Qpsk => 2,
            Scheme::Qam16 => 4,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Scheme::Bpsk => "BPSK",
            Scheme::Qpsk => "QPSK",
            Scheme::Qam16 => "16QAM",
        }
    }

    /// Lowercase identifier, as used in config files and generated array names
    pub fn key(self) -> &'static str {
        match self {
            Scheme::Bpsk => "bpsk",
            Scheme::Qpsk => "qpsk",
            Scheme::Qam16 => "qam16",
        }
    }

    /// Number of zero bits appended so `n_bits` fills whole symbols
    pub fn pad_bits(self, n_bits: usize) -> usize {
        let bps = self.bits_per_symbol();
        (bps - n_bits % bps) % bps
    }

    /// Number of symbols carrying `n_bits` after padding
    pub fn symbol_count(self, n_bits: usize) -> usize {
        n_bits.div_ceil(self.bits_per_symbol())
    }

    /// Map one group of `bits_per_symbol` bits to its constellation point
    pub fn map_group(self, group: &[u8]) -> Complex64 {
        let bit = |i: usize| group.get(i).copied().unwrap_or(0) != 0;
        match self {
            Scheme::Bpsk => {
                if bit(0) {
                    Complex64::new(-1.0, 0.0)
                } else {
                    Complex64::new(1.0, 0.0)
                }
            }
            // 00 -> (+,+), 01 -> (-,+), 11 -> (-,-), 10 -> (+,-)
            Scheme::Qpsk => {
                let i = if bit(1) { -QPSK_NORM } else { QPSK_NORM };
                let q = if bit(0) { -QPSK_NORM } else { QPSK_NORM };
                Complex64::new(i, q)
            }
            Scheme::Qam16 => Complex64::new(
                pam4_level(bit(0), bit(1)) * QAM16_NORM,
                pam4_level(bit(2), bit(3)) * QAM16_NORM,
            ),
        }
    }

    /// Map a bit sequence to symbols, zero-padding the last group
    pub fn map_bits(self, bits: &[u8]) -> Vec<Complex64> {
        bits.chunks(self.bits_per_symbol())
            .map(|group| self.map_group(group))
            .collect()
    }

    /// Hard decision for one received symbol, appending its bits to `out`
    pub fn slice_symbol(self, symbol: Complex64, out: &mut Vec<u8>) {
        match self {
            Scheme::Bpsk => out.push(u8::from(symbol.re < 0.0)),
            Scheme::Qpsk => {
                let i_neg = symbol.re < 0.0;
                let q_neg = symbol.im < 0.0;
                // quadrant -> Gray dibit
                let dibit = match (i_neg, q_neg) {
                    (false, false) => [0, 0],
                    (true, false) => [0, 1],
                    (true, true) => [1, 1],
                    (false, true) => [1, 0],
                };
                out.extend_from_slice(&dibit);
            }
            Scheme::Qam16 => {
                out.extend_from_slice(&pam4_bits(nearest_pam4(symbol.re)));
                out.extend_from_slice(&pam4_bits(nearest_pam4(symbol.im)));
            }
        }
    }

    /// Hard decisions for a run of symbols
    pub fn slice(self, symbols: &[Complex64]) -> Vec<u8> {
        let mut bits = Vec::with_capacity(symbols.len() * self.bits_per_symbol());
        for &symbol in symbols {
            self.slice_symbol(symbol, &mut bits);
        }
        bits
    }

    /// Snap a received sample to the nearest ideal constellation point
    pub fn nearest_point(self, rx: Complex64) -> Complex64 {
        match self {
            Scheme::Bpsk => Complex64::new(if rx.re >= 0.0 { 1.0 } else { -1.0 }, 0.0),
            Scheme::Qpsk => Complex64::new(
                if rx.re >= 0.0 { QPSK_NORM } else { -QPSK_NORM },
                if rx.im >= 0.0 { QPSK_NORM } else { -QPSK_NORM },
            ),
            Scheme::Qam16 => Complex64::new(slice_pam4(rx.re), slice_pam4(rx.im)),
        }
    }

    /// All ideal points, indexed by the bit group read MSB first
    pub fn points(self) -> Vec<Complex64> {
        let bps = self.bits_per_symbol();
        (0..1usize << bps)
            .map(|index| {
                let group: Vec<u8> = (0..bps)
                    .map(|k| ((index >> (bps - 1 - k)) & 1) as u8)
                    .collect();
                self.map_group(&group)
            })
            .collect()
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Scheme {
    type Err = LinkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace(['-', '_'], "").as_str() {
            "bpsk" => Ok(Scheme::Bpsk),
            "qpsk" => Ok(Scheme::Qpsk),
            "qam16" | "16qam" => Ok(Scheme::Qam16),
            other => Err(LinkError::invalid(format!("unknown modulation scheme '{other}'"))),
        }
    }
}

// Gray mapping of one 16-QAM axis: 00 -> -3, 01 -> -1, 11 -> +1, 10 -> +3
fn pam4_level(b0: bool, b1: bool) -> f64 {
    match (b0, b1) {
        (false, false) => -3.0,
        (false, true) => -1.0,
        (true, true) => 1.0,
        (true, false) => 3.0,
    }
}

fn pam4_bits(level: f64) -> [u8; 2] {
    if level <= -2.0 {
        [0, 0]
    } else if level < 0.0 {
        [0, 1]
    } else if level < 2.0 {
        [1, 1]
    } else {
        [1, 0]
    }
}

/// Nearest PAM-4 level to a normalized axis value. Ties go to the lower level.
fn nearest_pam4(x: f64) -> f64 {
    let v = (x / QAM16_NORM).clamp(-3.0, 3.0);
    let mut best = PAM4_LEVELS[0];
    let mut best_dist = f64::INFINITY;
    for level in PAM4_LEVELS {
        let dist = (level - v).abs();
        if dist < best_dist {
            best_dist = dist;
            best = level;
        }
    }
    best
}

fn slice_pam4(x: f64) -> f64 {
    let threshold = 2.0 * QAM16_NORM;
    if x >= threshold {
        3.0 * QAM16_NORM
    } else if x >= 0.0 {
        QAM16_NORM
    } else if x >= -threshold {
        -QAM16_NORM
    } else {
        -3.0 * QAM16_NORM
    }
}
