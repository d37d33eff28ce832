//! Tracing helpers for plugin lifecycle execution.
//!
//! The crate emits through `tracing` only and never installs a subscriber;
//! hosts decide where lifecycle spans and log lines go.

mod spans;

pub use spans::LifecycleSpan;
