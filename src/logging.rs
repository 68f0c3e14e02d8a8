//! Tracing setup for hosts embedding the workbench (CLIs, services, tests).

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Install the global subscriber once. `RUST_LOG` overrides the default
/// filter; repeated calls are no-ops so test binaries can call freely.
pub fn init() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,defi_workbench=debug"));

    let _ = tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .try_init();
}
