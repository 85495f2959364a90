use tracing_subscriber::{fmt, EnvFilter};

/// Installs a global `tracing` subscriber. Defaults to `info` level filtered
/// by `RUST_LOG` when set; `--json-logs` switches the output formatter to
/// newline-delimited JSON for machine consumption, same filter either way.
pub fn init(json_logs: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if json_logs {
        fmt().with_env_filter(filter).json().with_target(true).init();
    } else {
        fmt().with_env_filter(filter).with_target(true).init();
    }
}
