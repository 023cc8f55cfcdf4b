//! Logging setup
//!
//! The engine only emits `tracing` events. Applications that do not already
//! install a subscriber can call [`init`] once at startup.

use tracing::Subscriber;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize structured logging
///
/// Sets up:
/// - JSON formatting (release builds) or pretty formatting (debug builds)
/// - Environment-based log level filtering via `RUST_LOG`
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed.
///
/// # Example
///
/// ```rust,no_run
/// use upload_guard::observability;
///
/// # fn main() -> anyhow::Result<()> {
/// observability::init()?;
/// tracing::info!("Upload service started");
/// # Ok(())
/// # }
/// ```
pub fn init() -> anyhow::Result<()> {
    subscriber(env_filter()).try_init()?;
    Ok(())
}

/// `RUST_LOG` when set, otherwise a build-dependent default
fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cfg!(debug_assertions) {
            EnvFilter::new("debug,upload_guard=trace")
        } else {
            EnvFilter::new("info")
        }
    })
}

#[cfg(debug_assertions)]
fn subscriber(filter: EnvFilter) -> impl Subscriber + Send + Sync + 'static {
    // Pretty formatting for development
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().pretty())
}

#[cfg(not(debug_assertions))]
fn subscriber(filter: EnvFilter) -> impl Subscriber + Send + Sync + 'static {
    // JSON formatting for production
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().json())
}
