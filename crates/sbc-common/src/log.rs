// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Diagnostic logging for the boot stages
//!
//! Boot code reports through a [`LogSink`] passed into every operation; no
//! operation logs through global state. [`LogBuffer`] is a fixed-capacity
//! ring that keeps the most recent lines for later inspection, and
//! [`NullSink`] discards everything.
//!
//! The numeric value of a [`LogLevel`] grows with verbosity, so a console
//! threshold stored as a raw byte can be compared directly.

use core::fmt::{self, Write};
use heapless::String;

/// Maximum log message length
pub const MAX_LOG_MESSAGE_LEN: usize = 128;

/// Log buffer size (number of entries)
pub const LOG_BUFFER_SIZE: usize = 32;

/// Log level enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum LogLevel {
    /// Errors that require immediate attention
    Error = 0,
    /// Warnings about potential issues
    Warn = 1,
    /// Informational messages, including the boot record notice
    Info = 2,
    /// Debug messages
    Debug = 3,
    /// Trace messages (very verbose)
    Trace = 4,
}

impl LogLevel {
    /// Decode a raw level byte, `None` when out of range
    #[must_use]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Error),
            1 => Some(Self::Warn),
            2 => Some(Self::Info),
            3 => Some(Self::Debug),
            4 => Some(Self::Trace),
            _ => None,
        }
    }

    /// Get the log level name
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Error => "ERROR",
            Self::Warn => "WARN",
            Self::Info => "INFO",
            Self::Debug => "DEBUG",
            Self::Trace => "TRACE",
        }
    }

    /// Get a short prefix for the log level
    #[must_use]
    pub const fn prefix(&self) -> char {
        match self {
            Self::Error => 'E',
            Self::Warn => 'W',
            Self::Info => 'I',
            Self::Debug => 'D',
            Self::Trace => 'T',
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Fire-and-forget diagnostic sink
///
/// Implementations must not fail; a line that cannot be stored is dropped.
pub trait LogSink {
    /// Emit one line at `level` on behalf of `module`
    fn log(&mut self, level: LogLevel, module: &'static str, args: fmt::Arguments<'_>);
}

impl<S: LogSink + ?Sized> LogSink for &mut S {
    fn log(&mut self, level: LogLevel, module: &'static str, args: fmt::Arguments<'_>) {
        (**self).log(level, module, args);
    }
}

/// Sink that discards every line
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl LogSink for NullSink {
    fn log(&mut self, _level: LogLevel, _module: &'static str, _args: fmt::Arguments<'_>) {}
}

/// Log entry structure
#[derive(Clone)]
pub struct LogEntry {
    /// Log level
    pub level: LogLevel,
    /// Sequence number of the line within the buffer's lifetime
    pub sequence: u32,
    /// Module/component name
    pub module: &'static str,
    /// Log message, truncated to [`MAX_LOG_MESSAGE_LEN`]
    pub message: String<MAX_LOG_MESSAGE_LEN>,
}

impl fmt::Debug for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{:08X}] {} [{}] {}",
            self.sequence,
            self.level.prefix(),
            self.module,
            self.message
        )
    }
}

/// Writer that silently truncates at capacity
struct Truncating<'a>(&'a mut String<MAX_LOG_MESSAGE_LEN>);

impl Write for Truncating<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for c in s.chars() {
            if self.0.push(c).is_err() {
                break;
            }
        }
        Ok(())
    }
}

/// Circular log buffer
pub struct LogBuffer {
    entries: [Option<LogEntry>; LOG_BUFFER_SIZE],
    write_index: usize,
    count: usize,
    sequence: u32,
    min_level: LogLevel,
}

impl LogBuffer {
    /// Create a new empty log buffer recording up to `Info`
    #[must_use]
    pub const fn new() -> Self {
        const NONE: Option<LogEntry> = None;
        Self {
            entries: [NONE; LOG_BUFFER_SIZE],
            write_index: 0,
            count: 0,
            sequence: 0,
            min_level: LogLevel::Info,
        }
    }

    /// Set the most verbose level that is still recorded
    pub fn set_min_level(&mut self, level: LogLevel) {
        self.min_level = level;
    }

    /// Get the most verbose level that is still recorded
    #[must_use]
    pub const fn min_level(&self) -> LogLevel {
        self.min_level
    }

    /// Check if a log level should be recorded
    #[must_use]
    pub const fn should_log(&self, level: LogLevel) -> bool {
        (level as u8) <= (self.min_level as u8)
    }

    fn push(&mut self, entry: LogEntry) {
        self.entries[self.write_index] = Some(entry);
        self.write_index = (self.write_index + 1) % LOG_BUFFER_SIZE;
        if self.count < LOG_BUFFER_SIZE {
            self.count += 1;
        }
    }

    /// Get the number of entries
    #[must_use]
    pub const fn len(&self) -> usize {
        self.count
    }

    /// Check if buffer is empty
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Clear all entries
    pub fn clear(&mut self) {
        for entry in &mut self.entries {
            *entry = None;
        }
        self.write_index = 0;
        self.count = 0;
    }

    /// Whether any retained line at `level` contains `needle`
    #[must_use]
    pub fn contains(&self, level: LogLevel, needle: &str) -> bool {
        self.iter()
            .any(|e| e.level == level && e.message.as_str().contains(needle))
    }

    /// Iterate over entries (oldest first)
    pub fn iter(&self) -> LogBufferIter<'_> {
        LogBufferIter {
            buffer: self,
            index: 0,
            remaining: self.count,
        }
    }
}

impl Default for LogBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl LogSink for LogBuffer {
    fn log(&mut self, level: LogLevel, module: &'static str, args: fmt::Arguments<'_>) {
        if !self.should_log(level) {
            return;
        }

        let mut message = String::<MAX_LOG_MESSAGE_LEN>::new();
        let _ = Truncating(&mut message).write_fmt(args);

        let sequence = self.sequence;
        self.sequence = self.sequence.wrapping_add(1);
        self.push(LogEntry {
            level,
            sequence,
            module,
            message,
        });
    }
}

/// Iterator over log buffer entries
pub struct LogBufferIter<'a> {
    buffer: &'a LogBuffer,
    index: usize,
    remaining: usize,
}

impl<'a> Iterator for LogBufferIter<'a> {
    type Item = &'a LogEntry;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }

        let start_index = if self.buffer.count < LOG_BUFFER_SIZE {
            0
        } else {
            self.buffer.write_index
        };

        let actual_index = (start_index + self.index) % LOG_BUFFER_SIZE;
        self.index += 1;
        self.remaining -= 1;

        self.buffer.entries[actual_index].as_ref()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

/// Log an error message
///
/// The sink argument is any `&mut impl LogSink`.
#[macro_export]
macro_rules! log_error {
    ($sink:expr, $module:expr, $($arg:tt)*) => {
        $crate::log::LogSink::log(&mut *$sink, $crate::log::LogLevel::Error, $module, format_args!($($arg)*))
    };
}

/// Log a warning message
#[macro_export]
macro_rules! log_warn {
    ($sink:expr, $module:expr, $($arg:tt)*) => {
        $crate::log::LogSink::log(&mut *$sink, $crate::log::LogLevel::Warn, $module, format_args!($($arg)*))
    };
}

/// Log an informational message
#[macro_export]
macro_rules! log_info {
    ($sink:expr, $module:expr, $($arg:tt)*) => {
        $crate::log::LogSink::log(&mut *$sink, $crate::log::LogLevel::Info, $module, format_args!($($arg)*))
    };
}

/// Log a debug message
#[macro_export]
macro_rules! log_debug {
    ($sink:expr, $module:expr, $($arg:tt)*) => {
        $crate::log::LogSink::log(&mut *$sink, $crate::log::LogLevel::Debug, $module, format_args!($($arg)*))
    };
}

/// Log a trace-level message
#[macro_export]
macro_rules! log_trace {
    ($sink:expr, $module:expr, $($arg:tt)*) => {
        $crate::log::LogSink::log(&mut *$sink, $crate::log::LogLevel::Trace, $module, format_args!($($arg)*))
    };
}
