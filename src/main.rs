use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::{error, info};

use iqstream_rs::LinkResult;
use iqstream_rs::batch::{BatchPlan, run_batch};
use iqstream_rs::fixed::io::{write_header, write_json, write_raw, write_wav};
use iqstream_rs::fixed::{QuantizedStream, sampling_rate_u32};
use iqstream_rs::modem::{
    BitOrder, DemodOptions, LinkConfig, Scheme, bits_to_bytes, bytes_to_bits, count_bit_errors,
};
use iqstream_rs::ui::{format_summary, print_banner};
use iqstream_rs::utils::consts::DEFAULT_MESSAGE;
use iqstream_rs::utils::logging::{init_logging_with, level_for_verbosity};

#[derive(Parser)]
#[command(author, version, about = "BPSK/QPSK/16-QAM IQ stream generator", long_about = None)]
struct Cli {
    /// -v for debug, -vv for trace
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
    #[command(flatten)]
    link: LinkArgs,
    #[command(subcommand)]
    command: Commands,
}

/// Link config file plus per-field overrides
#[derive(Args)]
struct LinkArgs {
    /// JSON link config; missing fields take the reference defaults
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    /// Use the 10 MHz / 20 Msps preset instead of the reference link
    #[arg(long, global = true)]
    preset_10mhz: bool,
    #[arg(short, long, global = true)]
    scheme: Option<Scheme>,
    #[arg(long, global = true)]
    sampling_rate: Option<f64>,
    #[arg(long, global = true)]
    link_bw: Option<f64>,
    #[arg(long, global = true)]
    roll_off: Option<f64>,
    /// Carrier in Hz, 0 for complex baseband
    #[arg(long, global = true)]
    carrier: Option<f64>,
    #[arg(long, global = true, allow_negative_numbers = true)]
    snr: Option<f64>,
    #[arg(long, global = true)]
    amplitude: Option<f64>,
    #[arg(long, global = true)]
    seed: Option<u64>,
    #[arg(long, global = true)]
    resolution: Option<u32>,
    #[arg(long, global = true)]
    max_amp: Option<f64>,
    #[arg(long, global = true)]
    phase_correction: bool,
}

impl LinkArgs {
    fn resolve(&self) -> LinkResult<LinkConfig> {
        let mut config = match &self.config {
            Some(path) => LinkConfig::from_json_file(path)?,
            None if self.preset_10mhz => LinkConfig::preset_10mhz(Scheme::default()),
            None => LinkConfig::default(),
        };
        if let Some(scheme) = self.scheme {
            config.scheme = scheme;
        }
        if let Some(fs) = self.sampling_rate {
            config.sampling_rate = fs;
        }
        if let Some(bw) = self.link_bw {
            config.link_bw = bw;
        }
        if let Some(alpha) = self.roll_off {
            config.roll_off = alpha;
        }
        if let Some(fc) = self.carrier {
            config.carrier_freq = Some(fc);
        }
        if let Some(snr) = self.snr {
            config.snr_db = snr;
        }
        if let Some(amplitude) = self.amplitude {
            config.amplitude = amplitude;
        }
        if let Some(seed) = self.seed {
            config.seed = Some(seed);
        }
        if let Some(resolution) = self.resolution {
            config.signal_resolution = resolution;
        }
        if let Some(max_amp) = self.max_amp {
            config.max_amp = max_amp;
        }
        if self.phase_correction {
            config.demod = DemodOptions {
                phase_correction: true,
            };
        }
        Ok(config)
    }
}

#[derive(Args)]
struct Payload {
    /// Text to transmit
    #[arg(short, long, default_value = DEFAULT_MESSAGE)]
    message: String,
    /// Read the payload bytes from a file instead of --message
    #[arg(short, long)]
    input: Option<PathBuf>,
}

impl Payload {
    fn bytes(&self) -> LinkResult<Vec<u8>> {
        match &self.input {
            Some(path) => Ok(std::fs::read(path)?),
            None => Ok(self.message.as_bytes().to_vec()),
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum ExportFormat {
    Header,
    Raw,
    Json,
    Wav,
}

#[derive(Subcommand)]
enum Commands {
    /// Modulate, quantize and demodulate a payload, reporting bit errors
    Roundtrip {
        #[command(flatten)]
        payload: Payload,
    },
    /// Write one modulated stream to disk
    Export {
        #[command(flatten)]
        payload: Payload,
        #[arg(short, long, value_enum, default_value_t = ExportFormat::Header)]
        format: ExportFormat,
        #[arg(short, long)]
        output: PathBuf,
        /// C array name, defaults to the scheme key
        #[arg(long)]
        name: Option<String>,
    },
    /// Generate every scheme x SNR variant
    Batch {
        #[command(flatten)]
        payload: Payload,
        #[arg(long, value_delimiter = ',', default_value = "bpsk,qpsk,qam16")]
        schemes: Vec<Scheme>,
        #[arg(long, value_delimiter = ',', allow_negative_numbers = true, default_value = "0,5,10,15,20")]
        snrs: Vec<f64>,
        /// Write one header per variant into this directory
        #[arg(long)]
        out_dir: Option<PathBuf>,
        #[arg(long, default_value_t = 0)]
        workers: usize,
    },
    /// Print the derived link parameters
    Info {
        /// Print the resolved config as JSON instead
        #[arg(long)]
        json: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging_with(level_for_verbosity(cli.verbose));
    print_banner();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> LinkResult<()> {
    let config = cli.link.resolve()?;
    match cli.command {
        Commands::Roundtrip { payload } => roundtrip(&config, &payload.bytes()?),
        Commands::Export {
            payload,
            format,
            output,
            name,
        } => export(&config, &payload.bytes()?, format, &output, name),
        Commands::Batch {
            payload,
            schemes,
            snrs,
            out_dir,
            workers,
        } => {
            let mut plan = BatchPlan::new(config, schemes, snrs);
            plan.message = payload.bytes()?;
            plan.workers = workers;
            batch(&plan, out_dir.as_deref())
        }
        Commands::Info { json } => {
            if json {
                println!("{}", config.to_json()?);
            } else {
                println!("{}", format_summary(&config, &config.summary()?));
            }
            Ok(())
        }
    }
}

fn roundtrip(config: &LinkConfig, payload: &[u8]) -> LinkResult<()> {
    let modem = config.modem()?;
    let quantizer = config.quantizer()?;

    let bits = bytes_to_bits(payload, BitOrder::Msb);
    let modulated = modem.modulate(&bits, &config.modulate_options())?;
    let quantized = quantizer.quantize(&modulated.stream, &modulated.info)?;
    let received = quantized.dequantize()?;
    let decoded = modem.demodulate_with(&received, &modulated.info, config.demod)?;

    let bit_errors = count_bit_errors(&bits, &decoded);
    info!(
        "{}: {} samples, {} words, scale {:.4}",
        config.scheme,
        modulated.info.total_samples,
        quantized.words.len(),
        quantized.meta.scale
    );
    println!("bit errors: {} / {}", bit_errors, bits.len());
    println!(
        "decoded:    {}",
        String::from_utf8_lossy(&bits_to_bytes(&decoded, BitOrder::Msb))
    );
    Ok(())
}

fn export(
    config: &LinkConfig,
    payload: &[u8],
    format: ExportFormat,
    output: &Path,
    name: Option<String>,
) -> LinkResult<()> {
    let modem = config.modem()?;
    let modulated = modem.modulate_bytes(payload, BitOrder::Msb, &config.modulate_options())?;
    let quantize = || -> LinkResult<QuantizedStream> {
        config.quantizer()?.quantize(&modulated.stream, &modulated.info)
    };
    match format {
        ExportFormat::Header => {
            let name = name.unwrap_or_else(|| config.scheme.key().to_string());
            write_header(&quantize()?, &name, output)
        }
        ExportFormat::Raw => write_raw(&quantize()?, output),
        ExportFormat::Json => write_json(&quantize()?, output),
        ExportFormat::Wav => write_wav(
            &modulated.stream,
            sampling_rate_u32(modulated.info.sampling_rate)?,
            output,
        ),
    }
}

fn batch(plan: &BatchPlan, out_dir: Option<&Path>) -> LinkResult<()> {
    let results = run_batch(plan)?;
    for result in &results {
        println!(
            "{:>6} {:>7.2} dB  BER {:.3e}  ({} / {})",
            result.job.scheme.name(),
            result.job.snr_db,
            result.ber(),
            result.bit_errors,
            result.n_bits
        );
    }
    if let Some(dir) = out_dir {
        for result in &results {
            let name = result.job.array_name();
            write_header(&result.stream, &name, &dir.join(format!("{name}.h")))?;
        }
    }
    Ok(())
}
