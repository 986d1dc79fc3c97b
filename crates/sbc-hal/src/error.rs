// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! HAL error types

use core::fmt;

/// HAL error type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HalError {
    /// Named flash region is not present in the flash map
    RegionNotFound,
    /// Flash address out of bounds
    FlashOutOfBounds,
    /// Flash read failed
    FlashReadFailed,
    /// Flash erase failed
    FlashEraseFailed,
    /// Flash write failed
    FlashWriteFailed,
    /// Erase request not aligned to the sector size
    FlashMisaligned,
    /// FPGA register access failed
    RegisterFault,
    /// Register offset outside the scratch window
    RegisterOutOfRange,
    /// Real-time clock error
    RtcError,
    /// Temperature sensor error
    SensorError,
    /// Digest engine failed
    DigestFailed,
    /// Invalid parameter
    InvalidParameter,
}

impl HalError {
    /// Get error code
    #[must_use]
    pub const fn code(&self) -> u16 {
        match self {
            Self::RegionNotFound => 0x0810,
            Self::FlashOutOfBounds => 0x0811,
            Self::FlashReadFailed => 0x0812,
            Self::FlashEraseFailed => 0x0813,
            Self::FlashWriteFailed => 0x0814,
            Self::FlashMisaligned => 0x0815,
            Self::RegisterFault => 0x0820,
            Self::RegisterOutOfRange => 0x0821,
            Self::RtcError => 0x0830,
            Self::SensorError => 0x0840,
            Self::DigestFailed => 0x08C0,
            Self::InvalidParameter => 0x08F0,
        }
    }

    /// Get error description
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::RegionNotFound => "flash region not found",
            Self::FlashOutOfBounds => "flash address out of bounds",
            Self::FlashReadFailed => "flash read failed",
            Self::FlashEraseFailed => "flash erase failed",
            Self::FlashWriteFailed => "flash write failed",
            Self::FlashMisaligned => "flash erase not sector aligned",
            Self::RegisterFault => "FPGA register fault",
            Self::RegisterOutOfRange => "FPGA register out of range",
            Self::RtcError => "RTC error",
            Self::SensorError => "sensor error",
            Self::DigestFailed => "digest engine failed",
            Self::InvalidParameter => "invalid parameter",
        }
    }
}

impl fmt::Display for HalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[0x{:04X}] {}", self.code(), self.description())
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for HalError {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "[0x{:04X}] {}", self.code(), self.description());
    }
}

impl From<HalError> for sbc_common::Error {
    fn from(e: HalError) -> Self {
        match e {
            HalError::RegionNotFound => Self::RegionNotFound,
            HalError::FlashOutOfBounds | HalError::FlashMisaligned => Self::RegionSizeInvalid,
            HalError::FlashReadFailed => Self::FlashReadFailed,
            HalError::FlashEraseFailed => Self::FlashEraseFailed,
            HalError::FlashWriteFailed => Self::FlashWriteFailed,
            HalError::RegisterFault | HalError::RegisterOutOfRange => Self::RegisterAccessFailed,
            HalError::RtcError => Self::ClockReadFailed,
            HalError::SensorError => Self::SensorReadFailed,
            HalError::DigestFailed => Self::DigestUnavailable,
            HalError::InvalidParameter => Self::InvalidParameter,
        }
    }
}

/// HAL Result type
pub type HalResult<T> = Result<T, HalError>;
