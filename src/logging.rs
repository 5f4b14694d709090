//! Tracing subscriber setup for host applications.
//!
//! The crate itself only emits `tracing` events; embedding applications call
//! [`init`] once at startup to get formatted output with an env-filter
//! override (`RUST_LOG`).

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the global tracing subscriber.
///
/// `default_level` applies to this crate's events when `RUST_LOG` is unset.
/// Calling this more than once is an error from `tracing`; hosts that manage
/// their own subscriber should skip it.
pub fn init(default_level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("counsel={},info", default_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
