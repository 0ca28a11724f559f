//! Local logging setup for the CLI binary.
//!
//! The library itself never installs a global subscriber — only the binary
//! does, the same split the teacher draws between its library crates (which
//! only emit `tracing` events) and `telemetry.rs`, which owns the process-wide
//! subscriber registration.

#[cfg(feature = "cli")]
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Installs a `fmt` subscriber filtered by `RUST_LOG`, defaulting to `info`.
#[cfg(feature = "cli")]
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
