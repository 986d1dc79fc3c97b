// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! In-memory board simulation
//!
//! Host-side stand-ins for every HAL trait so the boot algorithms can run
//! under `cargo test`. Each back-end can be told to fail, and the register
//! file and flash keep a journal of what was written or erased.
//!
//! [`SimReset`] panics instead of resetting; tests catch the unwind and
//! inspect the message.

use sbc_common::constants::{FIRMWARE_DIGEST_SIZE, FLASH_ERASED_BYTE};
use sbc_common::RtcTime;

use crate::error::{HalError, HalResult};
use crate::traits::{
    BoardSensors, FlashRegion, ImageDigest, PersistentRegisters, RealTimeClock, ResetControl,
    SpiFlash,
};

/// Number of scratch register bytes
pub const SIM_REGISTER_COUNT: usize = 256;

/// Capacity of the write and erase journals
pub const SIM_JOURNAL_LEN: usize = 64;

/// Maximum number of named flash regions
pub const SIM_MAX_REGIONS: usize = 8;

/// One recorded register write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterWrite {
    /// Register offset
    pub offset: u16,
    /// Value written (zero-extended for byte writes)
    pub value: u16,
    /// Access width in bytes (1 or 2)
    pub width: u8,
}

/// FPGA scratch register file
///
/// Powers up with every register at zero.
#[derive(Debug, Clone)]
pub struct SimRegisters {
    bytes: [u8; SIM_REGISTER_COUNT],
    journal: [RegisterWrite; SIM_JOURNAL_LEN],
    journal_len: usize,
    /// Make every read fail
    pub fail_reads: bool,
    /// Make every write fail
    pub fail_writes: bool,
}

impl SimRegisters {
    /// Create a zeroed register file
    #[must_use]
    pub const fn new() -> Self {
        const EMPTY: RegisterWrite = RegisterWrite {
            offset: 0,
            value: 0,
            width: 0,
        };
        Self {
            bytes: [0; SIM_REGISTER_COUNT],
            journal: [EMPTY; SIM_JOURNAL_LEN],
            journal_len: 0,
            fail_reads: false,
            fail_writes: false,
        }
    }

    /// Set a register directly without journaling
    pub fn preset_u8(&mut self, offset: u16, value: u8) {
        self.bytes[usize::from(offset) % SIM_REGISTER_COUNT] = value;
    }

    /// Set a register pair directly without journaling
    pub fn preset_u16(&mut self, offset: u16, value: u16) {
        let [lo, hi] = value.to_le_bytes();
        self.preset_u8(offset, lo);
        self.preset_u8(offset.wrapping_add(1), hi);
    }

    /// Current value of a register
    #[must_use]
    pub fn peek_u8(&self, offset: u16) -> u8 {
        self.bytes[usize::from(offset) % SIM_REGISTER_COUNT]
    }

    /// Current value of a register pair
    #[must_use]
    pub fn peek_u16(&self, offset: u16) -> u16 {
        u16::from_le_bytes([self.peek_u8(offset), self.peek_u8(offset.wrapping_add(1))])
    }

    /// Writes recorded since creation or the last [`Self::clear_journal`]
    #[must_use]
    pub fn writes(&self) -> &[RegisterWrite] {
        &self.journal[..self.journal_len]
    }

    /// Writes recorded to one offset
    pub fn writes_to(&self, offset: u16) -> impl Iterator<Item = &RegisterWrite> + '_ {
        self.writes().iter().filter(move |w| w.offset == offset)
    }

    /// Forget recorded writes
    pub fn clear_journal(&mut self) {
        self.journal_len = 0;
    }

    fn index(offset: u16, width: usize) -> HalResult<usize> {
        let index = usize::from(offset);
        if index + width > SIM_REGISTER_COUNT {
            return Err(HalError::RegisterOutOfRange);
        }
        Ok(index)
    }

    fn record(&mut self, offset: u16, value: u16, width: u8) {
        if self.journal_len < SIM_JOURNAL_LEN {
            self.journal[self.journal_len] = RegisterWrite {
                offset,
                value,
                width,
            };
            self.journal_len += 1;
        }
    }
}

impl Default for SimRegisters {
    fn default() -> Self {
        Self::new()
    }
}

impl PersistentRegisters for SimRegisters {
    fn read_u8(&self, offset: u16) -> HalResult<u8> {
        if self.fail_reads {
            return Err(HalError::RegisterFault);
        }
        let i = Self::index(offset, 1)?;
        Ok(self.bytes[i])
    }

    fn write_u8(&mut self, offset: u16, value: u8) -> HalResult<()> {
        if self.fail_writes {
            return Err(HalError::RegisterFault);
        }
        let i = Self::index(offset, 1)?;
        self.bytes[i] = value;
        self.record(offset, u16::from(value), 1);
        Ok(())
    }

    fn read_u16(&self, offset: u16) -> HalResult<u16> {
        if self.fail_reads {
            return Err(HalError::RegisterFault);
        }
        let i = Self::index(offset, 2)?;
        Ok(u16::from_le_bytes([self.bytes[i], self.bytes[i + 1]]))
    }

    fn write_u16(&mut self, offset: u16, value: u16) -> HalResult<()> {
        if self.fail_writes {
            return Err(HalError::RegisterFault);
        }
        let i = Self::index(offset, 2)?;
        let [lo, hi] = value.to_le_bytes();
        self.bytes[i] = lo;
        self.bytes[i + 1] = hi;
        self.record(offset, value, 2);
        Ok(())
    }
}

/// NOR flash of `N` bytes with a named region map
///
/// Starts fully erased. Writes AND into existing contents.
#[derive(Debug, Clone)]
pub struct SimFlash<const N: usize> {
    data: [u8; N],
    sector_size: u32,
    regions: [Option<(&'static str, FlashRegion)>; SIM_MAX_REGIONS],
    erases: [u32; SIM_JOURNAL_LEN],
    erase_count: usize,
    write_count: usize,
    /// Make every read fail
    pub fail_reads: bool,
    /// Make every program operation fail
    pub fail_writes: bool,
    /// Make every erase fail
    pub fail_erases: bool,
}

impl<const N: usize> SimFlash<N> {
    /// Create an erased flash with the given sector size
    #[must_use]
    pub const fn new(sector_size: u32) -> Self {
        Self {
            data: [FLASH_ERASED_BYTE; N],
            sector_size,
            regions: [None; SIM_MAX_REGIONS],
            erases: [0; SIM_JOURNAL_LEN],
            erase_count: 0,
            write_count: 0,
            fail_reads: false,
            fail_writes: false,
            fail_erases: false,
        }
    }

    /// Add a named region to the flash map
    ///
    /// # Errors
    ///
    /// Fails if the region does not fit in the flash or the map is full.
    pub fn add_region(&mut self, name: &'static str, offset: u32, size: u32) -> HalResult<()> {
        let region = FlashRegion { offset, size };
        if region.end() as usize > N {
            return Err(HalError::FlashOutOfBounds);
        }
        let slot = self
            .regions
            .iter_mut()
            .find(|r| r.is_none())
            .ok_or(HalError::InvalidParameter)?;
        *slot = Some((name, region));
        Ok(())
    }

    /// Overwrite contents directly, ignoring program semantics
    ///
    /// # Panics
    ///
    /// Panics if the range is outside the flash.
    pub fn load(&mut self, offset: u32, bytes: &[u8]) {
        let start = offset as usize;
        self.data[start..start + bytes.len()].copy_from_slice(bytes);
    }

    /// Raw flash contents
    #[must_use]
    pub fn contents(&self) -> &[u8] {
        &self.data
    }

    /// Offsets passed to [`SpiFlash::erase`], oldest first
    #[must_use]
    pub fn erases(&self) -> &[u32] {
        &self.erases[..self.erase_count.min(SIM_JOURNAL_LEN)]
    }

    /// Number of successful program operations
    #[must_use]
    pub const fn write_count(&self) -> usize {
        self.write_count
    }

    /// Forget recorded erases and writes
    pub fn clear_journal(&mut self) {
        self.erase_count = 0;
        self.write_count = 0;
    }

    fn range(offset: u32, len: usize) -> HalResult<core::ops::Range<usize>> {
        let start = offset as usize;
        let end = start.checked_add(len).ok_or(HalError::FlashOutOfBounds)?;
        if end > N {
            return Err(HalError::FlashOutOfBounds);
        }
        Ok(start..end)
    }
}

impl<const N: usize> SpiFlash for SimFlash<N> {
    fn sector_size(&self) -> u32 {
        self.sector_size
    }

    fn map_region(&self, name: &str) -> HalResult<FlashRegion> {
        self.regions
            .iter()
            .flatten()
            .find(|(n, _)| *n == name)
            .map(|(_, r)| *r)
            .ok_or(HalError::RegionNotFound)
    }

    fn read(&self, offset: u32, buffer: &mut [u8]) -> HalResult<()> {
        if self.fail_reads {
            return Err(HalError::FlashReadFailed);
        }
        let range = Self::range(offset, buffer.len())?;
        buffer.copy_from_slice(&self.data[range]);
        Ok(())
    }

    fn write(&mut self, offset: u32, data: &[u8]) -> HalResult<()> {
        if self.fail_writes {
            return Err(HalError::FlashWriteFailed);
        }
        let range = Self::range(offset, data.len())?;
        for (dst, src) in self.data[range].iter_mut().zip(data) {
            *dst &= *src;
        }
        self.write_count += 1;
        Ok(())
    }

    fn erase(&mut self, offset: u32) -> HalResult<()> {
        if self.fail_erases {
            return Err(HalError::FlashEraseFailed);
        }
        if self.sector_size == 0 || offset % self.sector_size != 0 {
            return Err(HalError::FlashMisaligned);
        }
        let range = Self::range(offset, self.sector_size as usize)?;
        self.data[range].fill(FLASH_ERASED_BYTE);
        if self.erase_count < SIM_JOURNAL_LEN {
            self.erases[self.erase_count] = offset;
        }
        self.erase_count += 1;
        Ok(())
    }
}

/// Real-time clock returning a fixed time
#[derive(Debug, Clone, Copy, Default)]
pub struct SimClock {
    /// Time returned by every read
    pub time: RtcTime,
    /// Make every read fail
    pub fail: bool,
}

impl SimClock {
    /// Create a clock stopped at `time`
    #[must_use]
    pub const fn new(time: RtcTime) -> Self {
        Self { time, fail: false }
    }
}

impl RealTimeClock for SimClock {
    fn read_time(&mut self) -> HalResult<RtcTime> {
        if self.fail {
            return Err(HalError::RtcError);
        }
        Ok(self.time)
    }
}

/// Temperature sensors with fixed readings
#[derive(Debug, Clone, Copy, Default)]
pub struct SimSensors {
    /// Core temperature reading
    pub core: u8,
    /// External temperature reading
    pub external: u8,
    /// Make every read fail
    pub fail: bool,
}

impl BoardSensors for SimSensors {
    fn core_temperature(&mut self) -> HalResult<u8> {
        if self.fail {
            return Err(HalError::SensorError);
        }
        Ok(self.core)
    }

    fn external_temperature(&mut self) -> HalResult<u8> {
        if self.fail {
            return Err(HalError::SensorError);
        }
        Ok(self.external)
    }
}

/// Digest engine that returns a preset value regardless of input
#[derive(Debug, Clone, Copy)]
pub struct FixedDigest {
    /// Value returned by every call
    pub value: [u8; FIRMWARE_DIGEST_SIZE],
    /// Make every call fail
    pub fail: bool,
    /// Length of the data passed to the last call
    pub last_len: usize,
}

impl FixedDigest {
    /// Create an engine that always yields `value`
    #[must_use]
    pub const fn new(value: [u8; FIRMWARE_DIGEST_SIZE]) -> Self {
        Self {
            value,
            fail: false,
            last_len: 0,
        }
    }
}

impl ImageDigest for FixedDigest {
    fn digest(&mut self, data: &[u8]) -> HalResult<[u8; FIRMWARE_DIGEST_SIZE]> {
        if self.fail {
            return Err(HalError::DigestFailed);
        }
        self.last_len = data.len();
        Ok(self.value)
    }
}

/// Panic message of [`SimReset::cold_reset`]
pub const COLD_RESET_MSG: &str = "sim: cold reset";
/// Panic message of [`SimReset::warm_reset`]
pub const WARM_RESET_MSG: &str = "sim: warm reset";
/// Panic message of [`SimReset::halt`]
pub const HALT_MSG: &str = "sim: halt";

/// Reset control that unwinds instead of resetting
#[derive(Debug, Default, Clone, Copy)]
pub struct SimReset;

impl ResetControl for SimReset {
    fn cold_reset(&mut self) -> ! {
        panic!("{}", COLD_RESET_MSG)
    }

    fn warm_reset(&mut self) -> ! {
        panic!("{}", WARM_RESET_MSG)
    }

    fn halt(&mut self) -> ! {
        panic!("{}", HALT_MSG)
    }
}
