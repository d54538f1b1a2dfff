//! Boot Logging
//!
//! A `log` backend that writes to whatever output the board registers,
//! usually a polled UART. Until [`install`] is called, records are discarded
//! by the `log` crate itself, so every crate in the workspace can log from
//! the first instruction.
//!
//! Each record is formatted into a fixed stack buffer and written as one
//! line:
//!
//! ```text
//! [DEBUG] lark_boot::sequencer: boot: hardware enable
//! ```
//!
//! Messages longer than the buffer are truncated.

use core::fmt::{self, Write};

use log::{Level, LevelFilter, Log, Metadata, Record};
use spin::Mutex;

/// Longest line written per record, excluding the newline.
pub const MESSAGE_CAPACITY: usize = 160;

/// Output the logger writes to.
pub type Sink = &'static mut (dyn Write + Send);

/// Stack buffer for formatting one record
struct MessageBuffer {
    data: [u8; MESSAGE_CAPACITY],
    len: usize,
}

impl MessageBuffer {
    const fn new() -> Self {
        Self {
            data: [0u8; MESSAGE_CAPACITY],
            len: 0,
        }
    }

    fn as_str(&self) -> &str {
        core::str::from_utf8(&self.data[..self.len]).unwrap_or("<invalid>")
    }
}

impl Write for MessageBuffer {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let remaining = MESSAGE_CAPACITY - self.len;
        let mut to_copy = s.len().min(remaining);
        while !s.is_char_boundary(to_copy) {
            to_copy -= 1;
        }
        self.data[self.len..self.len + to_copy].copy_from_slice(&s.as_bytes()[..to_copy]);
        self.len += to_copy;
        Ok(())
    }
}

fn level_str(level: Level) -> &'static str {
    match level {
        Level::Error => "[ERROR]",
        Level::Warn => "[WARN ]",
        Level::Info => "[INFO ]",
        Level::Debug => "[DEBUG]",
        Level::Trace => "[TRACE]",
    }
}

/// Logger writing formatted records to a registered sink.
pub struct BootLogger {
    sink: Mutex<Option<Sink>>,
}

impl BootLogger {
    pub const fn new() -> Self {
        Self { sink: Mutex::new(None) }
    }

    /// Register `sink`, returning the one it replaces.
    pub fn attach(&self, sink: Sink) -> Option<Sink> {
        self.sink.lock().replace(sink)
    }

    /// Stop writing, handing the sink back.
    pub fn detach(&self) -> Option<Sink> {
        self.sink.lock().take()
    }

    fn emit(&self, record: &Record) {
        let mut line = MessageBuffer::new();
        let _ = write!(line, "{} {}: {}", level_str(record.level()), record.target(), record.args());

        // A record raised while the sink is busy (from an interrupt handler,
        // or from the sink itself) is dropped rather than deadlocking.
        if let Some(mut guard) = self.sink.try_lock() {
            if let Some(sink) = &mut *guard {
                let _ = sink.write_str(line.as_str());
                let _ = sink.write_char('\n');
            }
        }
    }
}

impl Default for BootLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl Log for BootLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            self.emit(record);
        }
    }

    fn flush(&self) {}
}

/// Global logger instance
static LOGGER: BootLogger = BootLogger::new();

/// Errors from installing the global logger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoggerError {
    /// A global logger is already set
    AlreadyInstalled,
}

impl fmt::Display for LoggerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoggerError::AlreadyInstalled => write!(f, "a global logger is already installed"),
        }
    }
}

/// Install the boot logger as the global logger, writing to `sink`.
///
/// Usually called from the reset hook once the console is usable.
pub fn install(sink: Sink, level: LevelFilter) -> Result<(), LoggerError> {
    log::set_logger(&LOGGER)
        .map(|()| log::set_max_level(level))
        .map_err(|_| LoggerError::AlreadyInstalled)?;
    LOGGER.attach(sink);
    Ok(())
}

/// Stop the global logger writing, handing its sink back.
///
/// Records logged afterwards are discarded.
pub fn detach() -> Option<Sink> {
    LOGGER.detach()
}
