//! Tracing subscriber setup for binaries embedding the crate.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};

/// Installs a global subscriber with an `EnvFilter` from `RUST_LOG`
/// (default `info`) and a fmt layer.
///
/// # Errors
///
/// Fails if a global subscriber is already installed.
pub fn init() -> Result<(), TryInitError> {
    init_with_default("info")
}

/// Like [`init`] but with a caller-chosen default directive.
pub fn init_with_default(directive: &str) -> Result<(), TryInitError> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| directive.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init()
}
