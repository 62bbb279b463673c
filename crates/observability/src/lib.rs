//! Tracing and logging setup shared by every stockmaster process.

/// Initialize process-wide tracing from the environment.
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init();
}

/// Subscriber configuration and installation.
pub mod tracing;

pub use tracing::{LogFormat, ObservabilityConfig, init_with};
