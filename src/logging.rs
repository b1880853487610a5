use tracing_subscriber::{fmt, EnvFilter};

/// Installs the tracing subscriber for hosts that embed the registry.
///
/// Filtering defaults to `info` for this crate and can be overridden with
/// the `KANISA_LOG` environment variable. Safe to call more than once; later
/// calls are no-ops.
pub fn init() {
    let filter = EnvFilter::try_from_env("KANISA_LOG")
        .unwrap_or_else(|_| EnvFilter::new("kanisa=info"));

    let _ = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}
