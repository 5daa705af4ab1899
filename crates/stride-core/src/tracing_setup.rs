use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize tracing for embedders that do not bring their own subscriber.
///
/// Filtering follows `RUST_LOG` (default `info`). Safe to call once per
/// process; a second call is a no-op rather than a panic so tests that
/// share a process do not fight over the global subscriber.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .try_init();
}
