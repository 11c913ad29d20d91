//! Low-level primitives shared by the storage engine.

/// Concurrency primitives and synchronization.
///
/// Per-identifier lock registry and cancellation tokens.
pub mod concurrency;
