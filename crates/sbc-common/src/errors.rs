// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Error types for the boot firmware
//!
//! One error enum covers every failure the boot-attempt, integrity and boot
//! log paths can report. Errors are `Copy`, carry a stable 16-bit code and
//! map onto an [`ErrorClass`] that decides how loudly the failure is logged
//! and whether the boot continues.

use core::fmt;

use crate::log::LogLevel;

/// Result type alias for boot firmware operations
pub type Result<T> = core::result::Result<T, Error>;

/// Unified error type for the boot firmware
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    // =========================================================================
    // Configuration Errors (0x01xx)
    // =========================================================================
    /// Named flash region is not present in the image
    RegionNotFound,
    /// Region size is not a usable multiple of the erase page size
    RegionSizeInvalid,
    /// Erase page size cannot hold the fixed record layout
    EraseSizeMismatch,
    /// Board configuration is inconsistent
    InvalidBootConfig,

    // =========================================================================
    // Transient I/O Errors (0x02xx)
    // =========================================================================
    /// Flash read failed
    FlashReadFailed,
    /// Flash program failed
    FlashWriteFailed,
    /// Flash erase failed
    FlashEraseFailed,
    /// Real-time clock could not be read
    ClockReadFailed,
    /// Persistent register access failed
    RegisterAccessFailed,
    /// Board sensor read failed
    SensorReadFailed,

    // =========================================================================
    // Integrity Errors (0x03xx)
    // =========================================================================
    /// Computed firmware digest does not match the stored digest
    DigestMismatch,
    /// Digest could not be computed or the stored digest could not be read
    DigestUnavailable,

    // =========================================================================
    // Persistent State Errors (0x04xx)
    // =========================================================================
    /// Persistent register holds a value outside the valid range
    InvalidPersistentState,

    // =========================================================================
    // General Errors (0xFFxx)
    // =========================================================================
    /// Invalid parameter provided
    InvalidParameter,
}

/// How a failure is handled by the boot path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// Build or flash-layout defect; abort the operation, keep booting
    Configuration,
    /// Hardware hiccup; abort for this boot cycle, the next boot retries
    Transient,
    /// Firmware integrity cannot be established; fail over
    Integrity,
    /// Corrupted persistent state; normalize to the safe default
    InvalidState,
    /// Programming error
    Internal,
}

impl ErrorClass {
    /// Severity used when a failure of this class is logged
    #[must_use]
    pub const fn log_level(&self) -> LogLevel {
        match self {
            Self::Configuration | Self::Integrity | Self::Internal => LogLevel::Error,
            Self::Transient | Self::InvalidState => LogLevel::Warn,
        }
    }
}

impl Error {
    /// Get the error code for this error
    ///
    /// Error codes are organized by category:
    /// - 0x01xx: Configuration errors
    /// - 0x02xx: Transient I/O errors
    /// - 0x03xx: Integrity errors
    /// - 0x04xx: Persistent state errors
    /// - 0xFFxx: General errors
    #[must_use]
    pub const fn code(&self) -> u16 {
        match self {
            Self::RegionNotFound => 0x0101,
            Self::RegionSizeInvalid => 0x0102,
            Self::EraseSizeMismatch => 0x0103,
            Self::InvalidBootConfig => 0x0104,

            Self::FlashReadFailed => 0x0201,
            Self::FlashWriteFailed => 0x0202,
            Self::FlashEraseFailed => 0x0203,
            Self::ClockReadFailed => 0x0204,
            Self::RegisterAccessFailed => 0x0205,
            Self::SensorReadFailed => 0x0206,

            Self::DigestMismatch => 0x0301,
            Self::DigestUnavailable => 0x0302,

            Self::InvalidPersistentState => 0x0401,

            Self::InvalidParameter => 0xFF02,
        }
    }

    /// Get the handling class of this error
    #[must_use]
    pub const fn class(&self) -> ErrorClass {
        match self {
            Self::RegionNotFound
            | Self::RegionSizeInvalid
            | Self::EraseSizeMismatch
            | Self::InvalidBootConfig => ErrorClass::Configuration,
            Self::FlashReadFailed
            | Self::FlashWriteFailed
            | Self::FlashEraseFailed
            | Self::ClockReadFailed
            | Self::RegisterAccessFailed
            | Self::SensorReadFailed => ErrorClass::Transient,
            Self::DigestMismatch | Self::DigestUnavailable => ErrorClass::Integrity,
            Self::InvalidPersistentState => ErrorClass::InvalidState,
            Self::InvalidParameter => ErrorClass::Internal,
        }
    }

    /// Get a short description of the error
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::RegionNotFound => "flash region not found",
            Self::RegionSizeInvalid => "flash region size invalid",
            Self::EraseSizeMismatch => "erase size mismatch",
            Self::InvalidBootConfig => "invalid boot config",
            Self::FlashReadFailed => "flash read failed",
            Self::FlashWriteFailed => "flash write failed",
            Self::FlashEraseFailed => "flash erase failed",
            Self::ClockReadFailed => "clock read failed",
            Self::RegisterAccessFailed => "register access failed",
            Self::SensorReadFailed => "sensor read failed",
            Self::DigestMismatch => "firmware digest mismatch",
            Self::DigestUnavailable => "firmware digest unavailable",
            Self::InvalidPersistentState => "invalid persistent state",
            Self::InvalidParameter => "invalid parameter",
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[0x{:04X}] {}", self.code(), self.description())
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Error {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "[0x{:04X}] {}", self.code(), self.description());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::format;

    #[test]
    fn test_codes_grouped_by_class() {
        assert_eq!(Error::RegionNotFound.code() >> 8, 0x01);
        assert_eq!(Error::ClockReadFailed.code() >> 8, 0x02);
        assert_eq!(Error::DigestMismatch.code() >> 8, 0x03);
        assert_eq!(Error::InvalidPersistentState.code() >> 8, 0x04);
    }

    #[test]
    fn test_class_log_levels() {
        assert_eq!(Error::RegionSizeInvalid.class().log_level(), LogLevel::Error);
        assert_eq!(Error::FlashWriteFailed.class().log_level(), LogLevel::Warn);
        assert_eq!(Error::InvalidPersistentState.class().log_level(), LogLevel::Warn);
    }

    #[test]
    fn test_integrity_errors_logged_at_error() {
        assert_eq!(Error::DigestMismatch.class(), ErrorClass::Integrity);
        assert_eq!(Error::DigestUnavailable.class().log_level(), LogLevel::Error);
    }

    #[test]
    fn test_display() {
        let s = format!("{}", Error::RegionNotFound);
        assert_eq!(s, "[0x0101] flash region not found");
    }
}
