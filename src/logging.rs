//! Tracing subscriber setup for binaries and tests that embed the engine.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when neither `AIRSHED_LOG` nor `RUST_LOG` is set.
pub const DEFAULT_FILTER: &str = "airshed=info";

/// Install a global fmt subscriber filtered by `AIRSHED_LOG`, then `RUST_LOG`.
/// Returns `false` if a global subscriber was already installed.
pub fn init_logging() -> bool {
    let filter = EnvFilter::try_from_env("AIRSHED_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .try_init()
        .is_ok()
}
