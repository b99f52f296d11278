//! Observability infrastructure.
//!
//! Provides:
//! - Structured tracing to stderr, filtered by `RUST_LOG` or the configured level

pub mod tracing;
