use log::{LevelFilter, Log, Metadata, Record, SetLoggerError};
use std::env;

/// Writes `[LEVEL] target: message` lines to stderr.
pub struct StderrLogger;

static LOGGER: StderrLogger = StderrLogger;

impl StderrLogger {
    /// Install the logger with the level named in `PIMEM_LOG` (default `info`).
    pub fn init() -> Result<(), SetLoggerError> {
        let level = env::var("PIMEM_LOG")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(LevelFilter::Info);
        log::set_logger(&LOGGER)?;
        log::set_max_level(level);
        Ok(())
    }
}

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        eprintln!("[{}] {}: {}", record.level(), record.target(), record.args());
    }

    fn flush(&self) {}
}
