use tracing_subscriber::EnvFilter;

/// Environment variable taking a full `tracing` filter directive.
pub const LOG_FILTER_ENV: &str = "COLCON_LOG";

/// Install the stderr subscriber. `level` applies unless `COLCON_LOG` holds a
/// filter of its own. Calling this twice is harmless.
pub fn init(level: &str) {
    let filter = EnvFilter::try_from_env(LOG_FILTER_ENV).unwrap_or_else(|_| filter_for(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn filter_for(level: &str) -> EnvFilter {
    match level.to_ascii_lowercase().as_str() {
        "error" | "warn" | "info" | "debug" | "trace" | "off" => {
            EnvFilter::new(level.to_ascii_lowercase())
        }
        _ => EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("warn")),
    }
}
