// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! HAL trait definitions
//!
//! The boot core reaches every piece of board hardware through these
//! traits. Implementations are synchronous; any busy-wait polling happens
//! inside the implementation and always terminates with a result.

use core::fmt;

use sbc_common::constants::FIRMWARE_DIGEST_SIZE;
use sbc_common::RtcTime;

use crate::error::HalResult;

/// FPGA scratch registers that survive warm reset and power loss
///
/// A register that cannot be read on real hardware usually reads as
/// all-ones; implementations may report that as a value or as an error.
pub trait PersistentRegisters {
    /// Read one byte register
    fn read_u8(&self, offset: u16) -> HalResult<u8>;

    /// Write one byte register
    fn write_u8(&mut self, offset: u16, value: u8) -> HalResult<()>;

    /// Read a 16-bit register pair (little-endian, `offset` holds the low byte)
    fn read_u16(&self, offset: u16) -> HalResult<u16>;

    /// Write a 16-bit register pair in a single bus cycle
    fn write_u16(&mut self, offset: u16, value: u16) -> HalResult<()>;
}

/// A named area of the flash map
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlashRegion {
    /// Absolute flash offset of the first byte
    pub offset: u32,
    /// Size in bytes
    pub size: u32,
}

impl FlashRegion {
    /// Absolute offset one past the last byte
    #[must_use]
    pub const fn end(&self) -> u32 {
        self.offset.saturating_add(self.size)
    }
}

/// Boot SPI flash
///
/// Offsets are absolute flash offsets. Programming can only clear bits;
/// an erase sets a whole sector back to `0xFF`.
pub trait SpiFlash {
    /// Erase sector size in bytes
    fn sector_size(&self) -> u32;

    /// Look up a region of the flash map by name
    fn map_region(&self, name: &str) -> HalResult<FlashRegion>;

    /// Read data from flash
    fn read(&self, offset: u32, buffer: &mut [u8]) -> HalResult<()>;

    /// Program data into previously erased flash
    fn write(&mut self, offset: u32, data: &[u8]) -> HalResult<()>;

    /// Erase the sector starting at `offset` (must be sector aligned)
    fn erase(&mut self, offset: u32) -> HalResult<()>;

    /// Erase every sector in `offset..offset + len`
    fn erase_range(&mut self, offset: u32, len: u32) -> HalResult<()> {
        let sector = self.sector_size();
        let end = offset.saturating_add(len);
        let mut addr = offset;
        while addr < end {
            self.erase(addr)?;
            addr = addr.saturating_add(sector);
        }
        Ok(())
    }
}

/// Battery-backed real-time clock
pub trait RealTimeClock {
    /// Read the current date and time
    fn read_time(&mut self) -> HalResult<RtcTime>;
}

/// Digest primitive used by the integrity gate
pub trait ImageDigest {
    /// Compute the 160-bit digest of `data`
    fn digest(&mut self, data: &[u8]) -> HalResult<[u8; FIRMWARE_DIGEST_SIZE]>;
}

/// Board reset control
///
/// None of these return. A cold reset re-reads the flash descriptor and so
/// switches to whichever redundant copy the next-boot flag selects.
pub trait ResetControl {
    /// Full cold reset
    fn cold_reset(&mut self) -> !;

    /// Warm reset, scratch registers and descriptor are preserved
    fn warm_reset(&mut self) -> !;

    /// Stop executing without resetting
    fn halt(&mut self) -> !;
}

/// Temperature sensors sampled for the boot record
///
/// Readings are in the sensor's raw one-byte encoding.
pub trait BoardSensors {
    /// CPU core temperature
    fn core_temperature(&mut self) -> HalResult<u8>;

    /// Board (external sensor) temperature
    fn external_temperature(&mut self) -> HalResult<u8>;
}

/// Reset cause reported by the FPGA
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ResetCause {
    /// Power applied
    ColdBoot = 0,
    /// Watchdog expired
    Watchdog = 1,
    /// Backplane requested sleep
    BackplaneSleep = 2,
    /// Supply dropped out
    PowerFailure = 3,
    /// Software requested reset
    Software = 4,
    /// Reset button pressed
    Button = 5,
    /// Boot supervisor timeout
    Timeout = 6,
    /// Cause field holds no valid code
    Invalid = 7,
}

impl ResetCause {
    /// Mask of the cause field within the reset cause register
    pub const MASK: u8 = 0x07;

    /// Decode the cause field of a raw register value
    #[must_use]
    pub const fn from_register(value: u8) -> Self {
        match value & Self::MASK {
            0 => Self::ColdBoot,
            1 => Self::Watchdog,
            2 => Self::BackplaneSleep,
            3 => Self::PowerFailure,
            4 => Self::Software,
            5 => Self::Button,
            6 => Self::Timeout,
            _ => Self::Invalid,
        }
    }

    /// Human-readable cause
    #[must_use]
    pub const fn text(&self) -> &'static str {
        match self {
            Self::ColdBoot => "Cold Boot",
            Self::Watchdog => "Watchdog Reset",
            Self::BackplaneSleep => "Backplane Sleep",
            Self::PowerFailure => "Power Failure",
            Self::Software => "Software Reset",
            Self::Button => "Button",
            Self::Timeout => "Timeout",
            Self::Invalid => "Invalid",
        }
    }
}

impl fmt::Display for ResetCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", *self as u8, self.text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_cause_decodes_low_bits() {
        assert_eq!(ResetCause::from_register(0x00), ResetCause::ColdBoot);
        assert_eq!(ResetCause::from_register(0x14), ResetCause::Software);
        assert_eq!(ResetCause::from_register(0xFF), ResetCause::Invalid);
    }

    #[test]
    fn test_region_bounds() {
        let region = FlashRegion { offset: 0x1000, size: 0x100 };
        assert_eq!(region.end(), 0x1100);
        let top = FlashRegion { offset: u32::MAX - 4, size: 0x100 };
        assert_eq!(top.end(), u32::MAX);
    }
}
