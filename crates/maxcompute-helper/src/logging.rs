use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

/// Installs the stderr subscriber. stdout is reserved for NDJSON output.
pub fn init(config: &LoggingConfig) {
    // RUST_LOG wins over the configured level.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(config.ansi)
        .try_init();
}
