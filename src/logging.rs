//! Diagnostic logging.
//!
//! User-facing output goes through [`crate::output`]; this module only sets
//! up the `tracing` subscriber for diagnostics on stderr.
//!
//! Level priority: `RUST_LOG` > `--debug` > config `[logging] level` > `warn`.

use tracing_subscriber::EnvFilter;

/// Level used when nothing else is configured.
pub const DEFAULT_LOG_LEVEL: &str = "warn";

/// Initialise the logging subsystem.
///
/// Safe to call more than once; later calls are ignored.
pub fn init(debug_flag: bool, config_level: Option<&str>) {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if debug_flag {
        EnvFilter::new("debug")
    } else if let Some(level) = config_level {
        EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_LEVEL))
    } else {
        EnvFilter::new(DEFAULT_LOG_LEVEL)
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .try_init();

    tracing::debug!(
        app = env!("CARGO_PKG_NAME"),
        version = env!("CARGO_PKG_VERSION"),
        "Logging initialised"
    );
}
