// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Circular Boot Log
//!
//! One fixed-size record per boot, appended to a flash region that is used
//! as a ring of erase pages.
//!
//! # Record Format (32 bytes, little-endian)
//!
//! ```text
//! Offset  Size  Field
//! 0x00    2     year (0xFFFF = blank slot)
//! 0x02    1     month
//! 0x03    1     day
//! 0x04    1     hour
//! 0x05    1     minute
//! 0x06    1     second
//! 0x07    1     reason (reset cause)
//! 0x08    4     number (sequence, wraps)
//! 0x0C    1     temp_core
//! 0x0D    1     temp_ext
//! 0x0E    1     fpga_slot_id (bit 7 = booted copy)
//! 0x0F    1     fpga_options
//! 0x10    16    reserved (left erased)
//! ```
//!
//! # Ring Discipline
//!
//! Pages fill front to back. The last slot of a page is only blank while
//! the page still has room, so the writer inspects the first and last slot
//! of each page to find the page being filled. Writing the second-to-last
//! slot of a page erases the following page, so the writer never has to
//! erase and program in the same append. A page holds at least three
//! records, so the previous record always survives that erase.

use core::cell::Cell;

use sbc_common::config::BootLogConfig;
use sbc_common::constants::{
    BOOT_LOG_BLANK_YEAR, BOOT_LOG_MIN_PAGES, BOOT_LOG_MIN_RECORDS_PER_PAGE, BOOT_LOG_RECORD_SIZE,
    FLASH_ERASED_BYTE,
};
use sbc_common::{log_info, log_warn, Error, LogSink, Result, RtcTime};
use sbc_hal::{FlashRegion, RealTimeClock, SpiFlash};

use crate::report;

const MODULE: &str = "boot_log";

// ============================================================================
// Record
// ============================================================================

/// One boot log record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BootLogRecord {
    /// Time of the boot
    pub time: RtcTime,
    /// Reset cause code
    pub reason: u8,
    /// Sequence number
    pub number: u32,
    /// Encoded CPU core temperature
    pub temp_core: u8,
    /// Encoded board temperature
    pub temp_ext: u8,
    /// Slot id, booted copy in bit 7
    pub fpga_slot_id: u8,
    /// FPGA option straps
    pub fpga_options: u8,
}

impl BootLogRecord {
    /// A record with the caller-supplied fields set
    ///
    /// Time and sequence number are filled in by [`BootLog::append`].
    #[must_use]
    pub const fn new(
        reason: u8,
        temp_core: u8,
        temp_ext: u8,
        fpga_slot_id: u8,
        fpga_options: u8,
    ) -> Self {
        Self {
            time: RtcTime::new(0, 0, 0, 0, 0, 0),
            reason,
            number: 0,
            temp_core,
            temp_ext,
            fpga_slot_id,
            fpga_options,
        }
    }

    /// Serialize to the on-flash layout
    #[must_use]
    pub fn to_bytes(&self) -> [u8; BOOT_LOG_RECORD_SIZE] {
        let mut out = [FLASH_ERASED_BYTE; BOOT_LOG_RECORD_SIZE];
        out[0..2].copy_from_slice(&self.time.year.to_le_bytes());
        out[2] = self.time.month;
        out[3] = self.time.day;
        out[4] = self.time.hour;
        out[5] = self.time.minute;
        out[6] = self.time.second;
        out[7] = self.reason;
        out[8..12].copy_from_slice(&self.number.to_le_bytes());
        out[12] = self.temp_core;
        out[13] = self.temp_ext;
        out[14] = self.fpga_slot_id;
        out[15] = self.fpga_options;
        out
    }

    /// Parse the on-flash layout
    #[must_use]
    pub fn from_bytes(bytes: &[u8; BOOT_LOG_RECORD_SIZE]) -> Self {
        Self {
            time: RtcTime {
                year: u16::from_le_bytes([bytes[0], bytes[1]]),
                month: bytes[2],
                day: bytes[3],
                hour: bytes[4],
                minute: bytes[5],
                second: bytes[6],
            },
            reason: bytes[7],
            number: u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]),
            temp_core: bytes[12],
            temp_ext: bytes[13],
            fpga_slot_id: bytes[14],
            fpga_options: bytes[15],
        }
    }

    /// Whether the slot has never been written
    #[must_use]
    pub const fn is_blank(&self) -> bool {
        self.time.year == BOOT_LOG_BLANK_YEAR
    }
}

// ============================================================================
// Geometry
// ============================================================================

/// Page layout of the log region
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    /// Erase page size in bytes
    pub page_size: u32,
    /// Number of erase pages
    pub page_count: usize,
    /// Records per erase page
    pub records_per_page: usize,
}

impl Geometry {
    /// Validate a region against the erase page size
    ///
    /// # Errors
    ///
    /// [`Error::EraseSizeMismatch`] if a page cannot hold at least three
    /// whole records, [`Error::RegionSizeInvalid`] if the region is not a whole
    /// number of at least two pages.
    pub fn new(region_size: u32, page_size: u32) -> Result<Self> {
        let record = BOOT_LOG_RECORD_SIZE as u32;
        if page_size == 0 || page_size % record != 0 {
            return Err(Error::EraseSizeMismatch);
        }
        let records_per_page = (page_size / record) as usize;
        if records_per_page < BOOT_LOG_MIN_RECORDS_PER_PAGE {
            return Err(Error::EraseSizeMismatch);
        }
        if region_size % page_size != 0 {
            return Err(Error::RegionSizeInvalid);
        }
        let page_count = (region_size / page_size) as usize;
        if page_count < BOOT_LOG_MIN_PAGES {
            return Err(Error::RegionSizeInvalid);
        }
        Ok(Self {
            page_size,
            page_count,
            records_per_page,
        })
    }

    /// Total number of record slots
    #[must_use]
    pub const fn record_count(&self) -> usize {
        self.page_count * self.records_per_page
    }

    /// Page holding a record
    #[must_use]
    pub const fn page_of(&self, index: usize) -> usize {
        index / self.records_per_page
    }

    /// Ring predecessor of a record
    #[must_use]
    pub const fn previous(&self, index: usize) -> usize {
        if index == 0 {
            self.record_count() - 1
        } else {
            index - 1
        }
    }

    /// Whether writing this record must erase the following page
    #[must_use]
    pub const fn triggers_pre_erase(&self, index: usize) -> bool {
        index % self.records_per_page == self.records_per_page - 2
    }
}

// ============================================================================
// Search
// ============================================================================

/// Find the page currently being filled
///
/// `is_blank(page, slot)` reports whether a slot within a page is blank.
/// Only pages whose last slot is blank have room. Among those, a page that
/// already holds records wins, then a page whose ring predecessor is full,
/// then the lowest-numbered page.
pub fn find_candidate_page(
    page_count: usize,
    records_per_page: usize,
    mut is_blank: impl FnMut(usize, usize) -> bool,
) -> Option<usize> {
    if records_per_page == 0 {
        return None;
    }
    let last = records_per_page - 1;
    let mut first = None;
    let mut after_full = None;
    for page in 0..page_count {
        if !is_blank(page, last) {
            continue;
        }
        if !is_blank(page, 0) {
            return Some(page);
        }
        first.get_or_insert(page);
        let prev = if page == 0 { page_count - 1 } else { page - 1 };
        if after_full.is_none() && !is_blank(prev, last) {
            after_full = Some(page);
        }
    }
    after_full.or(first)
}

/// Find the first blank slot of a page
pub fn find_first_blank(
    records_per_page: usize,
    is_blank: impl FnMut(usize) -> bool,
) -> Option<usize> {
    (0..records_per_page).position(is_blank)
}

// ============================================================================
// Log
// ============================================================================

/// Where the next record goes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NextSlot {
    /// Absolute flash offset
    pub offset: u32,
    /// Record index within the region
    pub index: usize,
    /// Number of the preceding record, all-ones if it is blank
    pub previous_number: u32,
}

/// A record as written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppendedRecord {
    /// Slot that was written
    pub slot: NextSlot,
    /// Record contents
    pub record: BootLogRecord,
}

/// Open boot log region
pub struct BootLog<'f, F: SpiFlash> {
    flash: &'f mut F,
    region: FlashRegion,
    geometry: Geometry,
}

impl<'f, F: SpiFlash> BootLog<'f, F> {
    /// Map and validate the log region
    ///
    /// # Errors
    ///
    /// Configuration errors when the region is missing or its size does
    /// not fit the erase page size. Failures are also logged.
    pub fn open<L: LogSink>(
        flash: &'f mut F,
        config: &BootLogConfig,
        log: &mut L,
    ) -> Result<Self> {
        let opened = flash
            .map_region(config.region)
            .map_err(Error::from)
            .and_then(|region| {
                Geometry::new(region.size, flash.sector_size()).map(|g| (region, g))
            });
        match opened {
            Ok((region, geometry)) => Ok(Self {
                flash,
                region,
                geometry,
            }),
            Err(e) => {
                report(log, MODULE, config.region, e);
                Err(e)
            }
        }
    }

    /// Region geometry
    #[must_use]
    pub const fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    fn record_offset(&self, index: usize) -> u32 {
        self.region.offset + (index * BOOT_LOG_RECORD_SIZE) as u32
    }

    fn page_offset(&self, page: usize) -> u32 {
        self.region.offset + page as u32 * self.geometry.page_size
    }

    /// Read one record
    ///
    /// # Errors
    ///
    /// [`Error::InvalidParameter`] for an index past the region, transient
    /// errors if the read fails.
    pub fn read_record(&self, index: usize) -> Result<BootLogRecord> {
        if index >= self.geometry.record_count() {
            return Err(Error::InvalidParameter);
        }
        let mut bytes = [0u8; BOOT_LOG_RECORD_SIZE];
        self.flash.read(self.record_offset(index), &mut bytes)?;
        Ok(BootLogRecord::from_bytes(&bytes))
    }

    fn slot_is_blank(&self, index: usize, failure: &Cell<Option<Error>>) -> bool {
        match self.read_record(index) {
            Ok(record) => record.is_blank(),
            Err(e) => {
                failure.set(failure.get().or(Some(e)));
                false
            }
        }
    }

    /// Index of the first blank slot in the page being filled
    ///
    /// `None` when no page has room. Reads only.
    fn locate(&self) -> Result<Option<usize>> {
        let rpp = self.geometry.records_per_page;
        let failure = Cell::new(None);
        let blank = |page: usize, slot: usize| self.slot_is_blank(page * rpp + slot, &failure);

        let target = find_candidate_page(self.geometry.page_count, rpp, blank).and_then(|p| {
            find_first_blank(rpp, |slot| blank(p, slot)).map(|slot| p * rpp + slot)
        });

        match failure.get() {
            Some(e) => Err(e),
            None => Ok(target),
        }
    }

    /// Locate the next free slot, erasing as the ring requires
    ///
    /// # Errors
    ///
    /// Transient errors when a read or erase fails.
    pub fn find_next_slot<L: LogSink>(&mut self, log: &mut L) -> Result<NextSlot> {
        let index = if let Some(index) = self.locate()? {
            index
        } else {
            log_warn!(log, MODULE, "log full, erasing page 0");
            let page = self.page_offset(0);
            self.flash.erase_range(page, self.geometry.page_size)?;
            0
        };

        let prev = self.read_record(self.geometry.previous(index))?;
        let previous_number = if prev.is_blank() { u32::MAX } else { prev.number };

        if self.geometry.triggers_pre_erase(index) {
            let next_page = (self.geometry.page_of(index) + 1) % self.geometry.page_count;
            let page = self.page_offset(next_page);
            self.flash.erase_range(page, self.geometry.page_size)?;
        }

        Ok(NextSlot {
            offset: self.record_offset(index),
            index,
            previous_number,
        })
    }

    fn try_append<C: RealTimeClock, L: LogSink>(
        &mut self,
        mut record: BootLogRecord,
        clock: &mut C,
        log: &mut L,
    ) -> Result<AppendedRecord> {
        let slot = self.find_next_slot(log)?;
        record.time = clock.read_time()?;
        record.number = slot.previous_number.wrapping_add(1);
        self.flash.write(slot.offset, &record.to_bytes())?;
        Ok(AppendedRecord { slot, record })
    }

    /// Append a record for this boot
    ///
    /// Time and sequence number are filled in here. Any failure is logged
    /// and the append is skipped.
    pub fn append<C: RealTimeClock, L: LogSink>(
        &mut self,
        record: BootLogRecord,
        clock: &mut C,
        log: &mut L,
    ) -> Option<AppendedRecord> {
        match self.try_append(record, clock, log) {
            Ok(appended) => {
                let r = &appended.record;
                log_info!(
                    log,
                    MODULE,
                    "#{} {} reason {} core {} ext {} slot 0x{:02X} opt 0x{:02X} @0x{:X}",
                    r.number,
                    r.time,
                    r.reason,
                    r.temp_core,
                    r.temp_ext,
                    r.fpga_slot_id,
                    r.fpga_options,
                    appended.slot.offset
                );
                Some(appended)
            }
            Err(e) => {
                report(log, MODULE, "append skipped", e);
                None
            }
        }
    }

    /// Most recently written record
    ///
    /// # Errors
    ///
    /// Transient errors when a read fails.
    pub fn latest(&self) -> Result<Option<BootLogRecord>> {
        let next = self.locate()?.unwrap_or(0);
        let record = self.read_record(self.geometry.previous(next))?;
        Ok((!record.is_blank()).then_some(record))
    }

    /// Visit every written record, oldest first
    ///
    /// # Errors
    ///
    /// Transient errors when a read fails; records already visited stay
    /// visited.
    pub fn for_each_record(&self, mut f: impl FnMut(usize, &BootLogRecord)) -> Result<()> {
        let total = self.geometry.record_count();
        let start = self.locate()?.unwrap_or(0);
        for step in 0..total {
            let index = (start + step) % total;
            let record = self.read_record(index)?;
            if !record.is_blank() {
                f(index, &record);
            }
        }
        Ok(())
    }
}

/// Open the configured region and append one record
///
/// Never fails; every problem is logged and skips the append.
pub fn append_to_region<F, C, L>(
    flash: &mut F,
    config: &BootLogConfig,
    record: BootLogRecord,
    clock: &mut C,
    log: &mut L,
) -> Option<AppendedRecord>
where
    F: SpiFlash,
    C: RealTimeClock,
    L: LogSink,
{
    let mut boot_log = BootLog::open(flash, config, log).ok()?;
    boot_log.append(record, clock, log)
}
