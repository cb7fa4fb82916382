//! Tracing setup shared by the workforce binaries.

/// Initialize process-wide tracing (JSON, `RUST_LOG`, default `info`).
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init(LogFormat::Json, "info");
}

/// Tracing configuration (filters, layers).
pub mod tracing;

pub use self::tracing::LogFormat;
