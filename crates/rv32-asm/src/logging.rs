//! `tracing` subscriber setup shared by the command-line front end.

use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::EnvFilter;

/// Filter directive used when `RUST_LOG` is unset.
#[must_use]
pub const fn default_directive(verbose: bool) -> &'static str {
    if verbose {
        "debug"
    } else {
        "warn"
    }
}

/// Installs a stderr `fmt` subscriber filtered by `RUST_LOG`, falling back to
/// [`default_directive`].
///
/// # Errors
///
/// Returns [`TryInitError`] when a global subscriber is already installed.
pub fn init(verbose: bool) -> Result<(), TryInitError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish()
        .try_init()
}
