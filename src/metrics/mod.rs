//! Metrics sinks for training diagnostics.
//!
//! - [`ConsoleLogger`]: aligned-column console output
//! - [`CsvLogger`]: CSV file logging for analysis
//! - [`JsonlLogger`]: JSON-lines records
//! - [`MultiLogger`]: fan-out to several sinks

pub mod logger;

pub use logger::{ConsoleLogger, CsvLogger, JsonlLogger, MultiLogger, UpdateLogger};
