//! Logging utilities
//!
//! The library logs through the [`log`] facade; this shim wires up
//! `env_logger` for applications that have no logger of their own.

pub use log::{debug, error, info, trace, warn};

/// Initialize the logging system from the environment
///
/// Safe to call more than once; later calls are no-ops.
pub fn init() {
    let _ = env_logger::Builder::from_default_env().try_init();
}
