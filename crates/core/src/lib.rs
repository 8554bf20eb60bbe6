//! Core ICN module
//!
//! Fundamental components shared by the General Assembly crates: key/value
//! storage, time helpers and tracing setup.

pub mod storage;
pub mod utils;

pub use storage::{FileStorage, JsonStorage, MemoryStorage, Storage, StorageError, StorageResult};

/// Initialize tracing for ICN binaries.
///
/// `RUST_LOG` wins when set; otherwise `default_level` is used as the filter.
/// Output goes to stderr so command output on stdout stays machine readable.
pub fn init_tracing(default_level: &str) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init()
}
