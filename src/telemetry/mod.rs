//! Telemetry Sink
//!
//! Holds the latest rover snapshot and a short, bounded log for the
//! presentation layer.

mod sink;

pub use sink::{LogEntry, TelemetrySink};
