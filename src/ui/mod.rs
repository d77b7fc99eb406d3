pub mod progress;

use crate::modem::{LinkConfig, LinkSummary};

pub fn print_banner() {
    eprintln!("iqstream-rs {}", env!("CARGO_PKG_VERSION"));
}

/// Human-readable link report for the `info` command
pub fn format_summary(config: &LinkConfig, summary: &LinkSummary) -> String {
    let carrier = match config.carrier_freq {
        Some(fc) if fc == 0.0 => "baseband (complex I/Q)".to_string(),
        Some(fc) => format!("{:.3} MHz", fc / 1e6),
        None => format!("{:.3} MHz (link_bw / 4)", config.link_bw / 4e6),
    };
    let seed = config
        .seed
        .map(|s| s.to_string())
        .unwrap_or_else(|| "none".into());
    let lines = [
        format!("scheme              {}", config.scheme),
        format!("sampling rate       {:.3} MHz", config.sampling_rate / 1e6),
        format!("link bandwidth      {:.3} MHz", config.link_bw / 1e6),
        format!("roll-off            {}", config.roll_off),
        format!("carrier             {carrier}"),
        format!("symbol rate         {:.3} Msym/s", summary.symbol_rate / 1e6),
        format!("samples per symbol  {}", summary.samples_per_symbol),
        format!("bits per symbol     {}", summary.bits_per_symbol),
        format!("bit rate            {:.3} Mbit/s", summary.bit_rate / 1e6),
        format!(
            "processing gain     {:.2} dB",
            summary.expected_processing_gain_db
        ),
        format!("snr                 {} dB", config.snr_db),
        format!("seed                {seed}"),
        format!(
            "quantizer           {}-bit, max_amp {}",
            config.signal_resolution, config.max_amp
        ),
    ];
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modem::Scheme;

    #[test]
    fn test_summary_mentions_rates() {
        let config = LinkConfig::preset_10mhz(Scheme::Qpsk);
        let text = format_summary(&config, &config.summary().unwrap());
        assert!(text.contains("scheme              QPSK"));
        assert!(text.contains("samples per symbol  3"));
        assert!(text.contains("2.500 MHz (link_bw / 4)"));
        assert!(text.contains("seed                none"));
    }
}
