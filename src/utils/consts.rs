/// Log level (can be overridden by RUST_LOG)
pub const LOG_LEVEL: &str = "info";

// ============================================================================
// Reference link
// ============================================================================

/// Link bandwidth (Hz)
pub const DEFAULT_LINK_BW: f64 = 10e6;

/// Sampling rate (Hz), 4x the link bandwidth
pub const DEFAULT_SAMPLING_RATE: f64 = 4.0 * DEFAULT_LINK_BW;

/// Raised cosine roll-off used to derive the symbol rate
pub const DEFAULT_ROLL_OFF: f64 = 0.25;

/// Channel SNR (dB)
pub const DEFAULT_SNR_DB: f64 = 30.0;

/// Largest upsample factor a link may derive
pub const MAX_SAMPLES_PER_SYMBOL: usize = 1 << 24;

/// Message used when the CLI is not given one
pub const DEFAULT_MESSAGE: &str = "Hello IQ Stream";

// ============================================================================
// Fixed-point format
// ============================================================================

/// Output word width in bits
pub const DEFAULT_SIGNAL_RESOLUTION: u32 = 16;

/// Widest supported output word
pub const MAX_SIGNAL_RESOLUTION: u32 = 32;

/// Reference amplitude mapped to 95% of half-scale. Leaves headroom above a
/// unit-energy constellation plus noise.
pub const DEFAULT_MAX_AMP: f64 = 1.5;

/// Fraction of half-scale reached by `max_amp`
pub const QUANT_HEADROOM: f64 = 0.95;

/// Array elements per line in emitted headers
pub const HEADER_ELEMENTS_PER_LINE: usize = 12;

// ============================================================================
// Presets
// ============================================================================

pub const PRESET_LINK_BW: f64 = 10e6;

/// 2x oversampling of the preset link
pub const PRESET_SAMPLING_RATE: f64 = 20e6;
