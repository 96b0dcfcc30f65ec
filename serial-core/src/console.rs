//! Kernel console on top of a UART.
//!
//! A console is a synchronous, polled output path: it must work from any
//! context, with interrupts off and before the tty layer is up.

use crate::UartResult;
use alloc::{format, sync::Arc};
use log::{Level, LevelFilter, Log, Metadata, Record};

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ConsoleFlags: u16 {
        /// Replay the log buffer when the console is registered.
        const PRINTBUFFER = 1;
        const CONSDEV = 2;
        const ENABLED = 4;
        const BOOT = 8;
    }
}

pub trait Console: Send + Sync {
    fn name(&self) -> &str;

    /// Line this console writes to.
    fn index(&self) -> usize;

    fn flags(&self) -> ConsoleFlags;

    /// Parses the console options given on the command line.
    fn setup(&self, _options: Option<&str>) -> UartResult<()> {
        Ok(())
    }

    /// Writes `bytes` synchronously. Output may be dropped if the device
    /// does not respond.
    fn write(&self, bytes: &[u8]);
}

/// Emits `s` one byte at a time, with a carriage return before each line feed.
pub fn console_write_bytes<E, F>(s: &[u8], mut putchar: F) -> Result<(), E>
where
    F: FnMut(u8) -> Result<(), E>,
{
    for &byte in s {
        if byte == b'\n' {
            putchar(b'\r')?;
        }
        putchar(byte)?;
    }
    Ok(())
}

/// `log` backend that prints records to a console.
///
/// Each record reaches the console in a single `write`, so it is never split
/// by other output on the same device.
pub struct ConsoleLogger {
    console: Arc<dyn Console>,
    level: LevelFilter,
}

impl ConsoleLogger {
    #[must_use]
    pub fn new(console: Arc<dyn Console>, level: LevelFilter) -> Self {
        Self { console, level }
    }

    #[must_use]
    #[inline]
    pub const fn level(&self) -> LevelFilter {
        self.level
    }
}

const fn severity(level: Level) -> &'static str {
    match level {
        Level::Error => "ERROR",
        Level::Warn => "WARN ",
        Level::Info => "INFO ",
        Level::Debug => "DEBUG",
        Level::Trace => "TRACE",
    }
}

impl Log for ConsoleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = format!("[{}] {}\n", severity(record.level()), record.args());
        self.console.write(line.as_bytes());
    }

    fn flush(&self) {}
}
