//! Metrics sinks for per-batch update diagnostics.
//!
//! The update loop reports to the root worker through a plain string
//! callback; these loggers are the structured sinks such a callback (or
//! the outer loop itself) typically writes to.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::Instant;

use serde::Serialize;

use crate::runners::UpdateStats;

/// Logger over per-batch update diagnostics.
pub trait UpdateLogger: Send {
    /// Record the stats for one minibatch update.
    fn log(&mut self, batch: usize, stats: &UpdateStats);

    /// Flush any buffered output.
    fn flush(&mut self);
}

/// Console logger with aligned columns.
pub struct ConsoleLogger {
    log_interval: usize,
    next_log_batch: usize,
    show_header: bool,
}

impl ConsoleLogger {
    /// Create a console logger that prints every `log_interval` batches.
    pub fn new(log_interval: usize) -> Self {
        Self {
            log_interval: log_interval.max(1),
            next_log_batch: 0,
            show_header: true,
        }
    }

    fn print_header(&self) {
        println!(
            "{:>8} {:>12} {:>12} {:>10} {:>8}",
            "Batch", "Actor", "Explained", "Entropy", "Clipped"
        );
        println!("{}", "-".repeat(54));
    }
}

impl UpdateLogger for ConsoleLogger {
    fn log(&mut self, batch: usize, stats: &UpdateStats) {
        if batch < self.next_log_batch {
            return;
        }

        if self.show_header {
            self.print_header();
            self.show_header = false;
        }

        println!(
            "{:>8} {:>12.6} {:>12.6} {:>10.4} {:>8.0}",
            batch, stats.actor_loss, stats.explained_variance, stats.entropy, stats.clipped
        );

        self.next_log_batch = batch + self.log_interval;
    }

    fn flush(&mut self) {
        // stdout is line-buffered, nothing to do
    }
}

/// CSV file logger for offline analysis.
pub struct CsvLogger {
    writer: BufWriter<File>,
    start_time: Instant,
}

impl CsvLogger {
    /// Create a CSV logger writing to `path`.
    pub fn new(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        writeln!(
            writer,
            "batch,actor_loss,explained_variance,entropy,clipped,elapsed_secs"
        )?;
        Ok(Self {
            writer,
            start_time: Instant::now(),
        })
    }
}

impl UpdateLogger for CsvLogger {
    fn log(&mut self, batch: usize, stats: &UpdateStats) {
        let elapsed = self.start_time.elapsed().as_secs_f32();
        let _ = writeln!(
            self.writer,
            "{},{:.6},{:.6},{:.6},{:.1},{:.2}",
            batch,
            stats.actor_loss,
            stats.explained_variance,
            stats.entropy,
            stats.clipped,
            elapsed
        );
    }

    fn flush(&mut self) {
        let _ = self.writer.flush();
    }
}

impl Drop for CsvLogger {
    fn drop(&mut self) {
        self.flush();
    }
}

#[derive(Serialize)]
struct UpdateRecord<'a> {
    batch: usize,
    #[serde(flatten)]
    stats: &'a UpdateStats,
}

/// JSON-lines file logger, one record per batch.
pub struct JsonlLogger {
    writer: BufWriter<File>,
}

impl JsonlLogger {
    /// Create a JSONL logger writing to `path`.
    pub fn new(path: impl AsRef<Path>) -> std::io::Result<Self> {
        Ok(Self {
            writer: BufWriter::new(File::create(path)?),
        })
    }
}

impl UpdateLogger for JsonlLogger {
    fn log(&mut self, batch: usize, stats: &UpdateStats) {
        let record = UpdateRecord { batch, stats };
        if let Ok(line) = serde_json::to_string(&record) {
            let _ = writeln!(self.writer, "{}", line);
        }
    }

    fn flush(&mut self) {
        let _ = self.writer.flush();
    }
}

impl Drop for JsonlLogger {
    fn drop(&mut self) {
        self.flush();
    }
}

/// Fan-out to multiple loggers.
#[derive(Default)]
pub struct MultiLogger {
    loggers: Vec<Box<dyn UpdateLogger>>,
}

impl MultiLogger {
    /// Create an empty multi-logger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a logger.
    pub fn add<L: UpdateLogger + 'static>(mut self, logger: L) -> Self {
        self.loggers.push(Box::new(logger));
        self
    }
}

impl UpdateLogger for MultiLogger {
    fn log(&mut self, batch: usize, stats: &UpdateStats) {
        for logger in &mut self.loggers {
            logger.log(batch, stats);
        }
    }

    fn flush(&mut self) {
        for logger in &mut self.loggers {
            logger.flush();
        }
    }
}
