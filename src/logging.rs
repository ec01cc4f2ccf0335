use tracing_subscriber::{EnvFilter, fmt};

/// Diagnostics go to stderr so stdout stays the command's output.
/// `RUST_LOG` takes precedence over the verbosity flag.
pub fn init_logging(verbose: bool) {
    let default = if verbose { "fireprox=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let _ = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
