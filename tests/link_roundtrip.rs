use iqstream_rs::fixed::{Quantizer, render_header};
use iqstream_rs::modem::{
    BitOrder, LinkConfig, ModulateOptions, Modem, SampleStream, Scheme, bits_to_bytes,
    bytes_to_bits,
};

const MESSAGE: &[u8] = b"Rust makes IQ links fun! \x00\xff\x5a\xa5";

fn reference(scheme: Scheme) -> Modem {
    Modem::new(scheme, 40e6, 10e6, 0.25).unwrap()
}

fn options(carrier: f64, seed: u64) -> ModulateOptions {
    ModulateOptions {
        snr_db: 40.0,
        carrier_freq: Some(carrier),
        seed: Some(seed),
        ..Default::default()
    }
}

#[test]
fn baseband_round_trip_all_schemes() {
    for scheme in Scheme::ALL {
        let modem = reference(scheme);
        let tx = modem
            .modulate_bytes(MESSAGE, BitOrder::Msb, &options(0.0, 42))
            .unwrap();
        assert!(tx.stream.is_complex());
        let rx = modem
            .demodulate_bytes(&tx.stream, &tx.info, BitOrder::Msb)
            .unwrap();
        assert_eq!(rx, MESSAGE, "{scheme}");
    }
}

#[test]
fn passband_round_trip_all_schemes() {
    // 8 MHz carrier at 40 Msps: the 2fc image sums to zero over each 5-sample symbol
    for scheme in Scheme::ALL {
        let modem = reference(scheme);
        let tx = modem
            .modulate_bytes(MESSAGE, BitOrder::Msb, &options(8e6, 7))
            .unwrap();
        assert!(!tx.stream.is_complex());
        assert_eq!(tx.stream.len(), tx.info.total_samples);
        let rx = modem
            .demodulate_bytes(&tx.stream, &tx.info, BitOrder::Msb)
            .unwrap();
        assert_eq!(rx, MESSAGE, "{scheme}");
    }
}

#[test]
fn hi_bpsk_scenario() {
    let modem = reference(Scheme::Bpsk);
    assert_eq!(modem.timing().samples_per_symbol, 5);
    let tx = modem
        .modulate_bytes(b"HI", BitOrder::Msb, &options(0.0, 333))
        .unwrap();
    assert_eq!(tx.info.n_bits, 16);
    assert_eq!(tx.info.total_samples, 80);
    let rx = modem
        .demodulate_bytes(&tx.stream, &tx.info, BitOrder::Msb)
        .unwrap();
    assert_eq!(rx, b"HI");
}

#[test]
fn odd_bit_counts_are_padded_and_truncated() {
    let bits = vec![1, 0, 1, 1, 0];
    for scheme in Scheme::ALL {
        let modem = reference(scheme);
        let tx = modem.modulate(&bits, &options(0.0, 1)).unwrap();
        assert_eq!(tx.info.n_bits, 5);
        assert_eq!(
            tx.info.total_samples,
            scheme.symbol_count(5) * tx.info.samples_per_symbol
        );
        assert_eq!(modem.demodulate(&tx.stream, &tx.info).unwrap(), bits);
    }
}

#[test]
fn seeded_runs_are_bit_identical() {
    let modem = reference(Scheme::Qam16);
    let a = modem
        .modulate_bytes(MESSAGE, BitOrder::Msb, &options(2.5e6, 99))
        .unwrap();
    let b = modem
        .modulate_bytes(MESSAGE, BitOrder::Msb, &options(2.5e6, 99))
        .unwrap();
    assert_eq!(a.stream, b.stream);
    assert_eq!(a.info, b.info);
}

#[test]
fn unseeded_runs_differ_only_in_noise() {
    let modem = reference(Scheme::Qpsk);
    let unseeded = ModulateOptions {
        snr_db: 10.0,
        carrier_freq: Some(0.0),
        ..Default::default()
    };
    let a = modem.modulate_bytes(MESSAGE, BitOrder::Msb, &unseeded).unwrap();
    let b = modem.modulate_bytes(MESSAGE, BitOrder::Msb, &unseeded).unwrap();
    assert_eq!(a.stream.len(), b.stream.len());
    assert_eq!(a.info.total_samples, b.info.total_samples);
    assert_eq!(a.info.bit_rate, b.info.bit_rate);
    assert_ne!(a.stream, b.stream);

    let quantizer = Quantizer::new(16, 1.5).unwrap();
    let qa = quantizer.quantize(&a.stream, &a.info).unwrap();
    let qb = quantizer.quantize(&b.stream, &b.info).unwrap();
    assert_eq!(qa.meta, qb.meta);
}

#[test]
fn quantized_stream_still_decodes() {
    for (scheme, carrier) in [
        (Scheme::Bpsk, 0.0),
        (Scheme::Qpsk, 8e6),
        (Scheme::Qam16, 0.0),
        (Scheme::Qam16, 8e6),
    ] {
        let config = LinkConfig {
            scheme,
            carrier_freq: Some(carrier),
            snr_db: 40.0,
            seed: Some(5),
            ..Default::default()
        };
        let modem = config.modem().unwrap();
        let bits = bytes_to_bits(MESSAGE, BitOrder::Msb);
        let tx = modem.modulate(&bits, &config.modulate_options()).unwrap();

        let quantized = config.quantizer().unwrap().quantize(&tx.stream, &tx.info).unwrap();
        let expected_words = (if carrier == 0.0 { 2 } else { 1 }) * tx.info.total_samples;
        assert_eq!(quantized.words.len(), expected_words);
        assert!(quantized.words.iter().all(|&w| w <= u16::MAX as u32));

        let restored = quantized.dequantize().unwrap();
        assert_eq!(restored.is_complex(), carrier == 0.0);
        let decoded = modem.demodulate(&restored, &tx.info).unwrap();
        assert_eq!(bits_to_bytes(&decoded, BitOrder::Msb), MESSAGE, "{scheme} @ {carrier}");
    }
}

#[test]
fn header_artifact_for_preset_link() {
    let config = LinkConfig {
        carrier_freq: Some(0.0),
        seed: Some(333),
        ..LinkConfig::preset_10mhz(Scheme::Qpsk)
    };
    let modem = config.modem().unwrap();
    let tx = modem
        .modulate_bytes(b"HI", BitOrder::Msb, &config.modulate_options())
        .unwrap();
    let quantized = config.quantizer().unwrap().quantize(&tx.stream, &tx.info).unwrap();
    let SampleStream::Complex(samples) = &tx.stream else {
        panic!("baseband stream expected");
    };
    assert_eq!(quantized.meta.n_samples, 2 * samples.len());

    let text = render_header(&quantized, "qpsk_hi").unwrap();
    assert!(text.contains("typedef uint16_t stream_data_t;"));
    assert!(text.contains(".sampling_rate = 20000000,"));
    assert!(text.contains(".signal_resolution = 16,"));
    assert!(text.contains(".carrier_freq = 0.0,"));
    assert!(text.contains(".samples_per_symbol = 3.0,"));
    assert!(text.contains(&format!(".n_samples = {},", quantized.words.len())));

    let body = text
        .split("static const stream_data_t qpsk_hi[] = {")
        .nth(1)
        .and_then(|rest| rest.split("};").next())
        .unwrap();
    let words: Vec<u32> = body
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse().unwrap())
        .collect();
    assert_eq!(words, quantized.words);
    assert_eq!(words[0], Quantizer::new(16, 1.5).unwrap().quantize_sample(samples[0].re).0);
    assert_eq!(words[1], Quantizer::new(16, 1.5).unwrap().quantize_sample(samples[0].im).0);
}

#[test]
fn extreme_rates_fail_instead_of_panicking() {
    assert!(Modem::new(Scheme::Bpsk, 1e30, 1.0, 0.0).is_err());

    // 5 Gsps is a valid link but cannot be described by a uint32_t header field
    let modem = Modem::new(Scheme::Bpsk, 5e9, 1e9, 0.25).unwrap();
    let tx = modem.modulate(&[1, 0, 1], &options(0.0, 3)).unwrap();
    assert_eq!(tx.info.sampling_rate, 5e9);
    let quantizer = Quantizer::new(16, 1.5).unwrap();
    assert!(quantizer.quantize(&tx.stream, &tx.info).is_err());
}
