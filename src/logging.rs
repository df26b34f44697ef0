//! Tracing subscriber setup for the binary. Library code only emits events.

use tracing_subscriber::EnvFilter;

/// Install a stderr subscriber; stdout stays free for summaries and CSV.
///
/// `RUST_LOG` wins when set. Otherwise release builds only show warnings,
/// debug builds show progress, and `verbose` turns on per-command detail.
pub fn init(verbose: bool) {
    let fallback = if verbose {
        "debug"
    } else if cfg!(debug_assertions) {
        "info"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    // A second init (e.g. from tests) keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_thread_names(true)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
