use tracing_subscriber::EnvFilter;

/// Diagnostics go to stderr so stdout stays clean for command output.
/// RUST_LOG, when set, wins over the --log-level flag.
pub fn init(log_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
