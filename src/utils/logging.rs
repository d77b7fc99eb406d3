use tracing_subscriber::{EnvFilter, fmt};

use super::consts::LOG_LEVEL;

/// Log level for a `-v` count: 0 keeps `LOG_LEVEL`, 1 is debug, more is trace
pub fn level_for_verbosity(verbose: u8) -> &'static str {
    match verbose {
        0 => LOG_LEVEL,
        1 => "debug",
        _ => "trace",
    }
}

/// Installs a compact stderr subscriber. `RUST_LOG` takes precedence over
/// `default_level`. Returns false when a global subscriber already exists.
pub fn init_logging_with(default_level: &str) -> bool {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_level(true)
        .compact()
        .with_writer(std::io::stderr)
        .try_init()
        .is_ok()
}
