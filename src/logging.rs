use tracing_subscriber::{EnvFilter, fmt};

/// Install the global subscriber.
///
/// Filter comes from `RUST_LOG`, then `LOAN_GATE_LOG`, else `default_level`.
/// Events go to stderr so stdout only carries reports and JSON.
pub fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_env("RUST_LOG")
        .or_else(|_| EnvFilter::try_from_env("LOAN_GATE_LOG"))
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    // A second call (tests, embedding) keeps the first subscriber.
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
