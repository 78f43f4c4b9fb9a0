use std::sync::OnceLock;
use std::time::Instant;

use log::{LevelFilter, Log, Metadata, Record, SetLoggerError};

/// Console backend for the `log` facade.
///
/// Lines look like `[  12.345s] [INFO] message`, timed from `init`.
pub struct ConsoleLogger {
    start: OnceLock<Instant>,
}

static LOGGER: ConsoleLogger = ConsoleLogger {
    start: OnceLock::new(),
};

pub fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
    LOGGER.start.get_or_init(Instant::now);
    log::set_logger(&LOGGER)?;
    log::set_max_level(level);
    Ok(())
}

impl Log for ConsoleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let elapsed = self.start.get_or_init(Instant::now).elapsed().as_secs_f64();
        println!(
            "[{:>9}] [{}] {}",
            format!("{elapsed:.3}s"),
            record.level(),
            record.args()
        );
    }

    fn flush(&self) {}
}
