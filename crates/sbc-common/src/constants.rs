// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Board-wide constants
//!
//! Fixed sizes of the persisted layouts. Anything that depends on the flash
//! image layout or the FPGA register map lives in [`crate::config`] instead.

// =============================================================================
// Boot Log Constants
// =============================================================================

/// Size of one boot log record in bytes
pub const BOOT_LOG_RECORD_SIZE: usize = 32;

/// Number of record bytes that carry fields; the remainder is reserved
pub const BOOT_LOG_RECORD_USED: usize = 16;

/// Year value of a record slot that has never been written
pub const BOOT_LOG_BLANK_YEAR: u16 = 0xFFFF;

/// Value of an erased flash byte
pub const FLASH_ERASED_BYTE: u8 = 0xFF;

/// Minimum number of erase pages in the boot log region
pub const BOOT_LOG_MIN_PAGES: usize = 2;

/// Minimum number of records per erase page
///
/// The pre-erase slot (second to last) must not be the first slot of its
/// page, or the erased page would hold the previous record.
pub const BOOT_LOG_MIN_RECORDS_PER_PAGE: usize = 3;

// =============================================================================
// Firmware Integrity Constants
// =============================================================================

/// Firmware digest size in bytes (160-bit digest)
pub const FIRMWARE_DIGEST_SIZE: usize = 20;

/// Length of the trailing image window covered by the digest
pub const FIRMWARE_DIGEST_WINDOW: usize = 256;

/// Largest window the integrity gate can buffer on the stack
pub const MAX_DIGEST_WINDOW: usize = 4096;

// =============================================================================
// Boot-Attempt Register Constants
// =============================================================================

/// Largest value the 4-bit test count field can hold
pub const MAX_TEST_COUNT: u8 = 0x0F;

/// Mask applied to the reset cause register to form the record reason code
pub const RESET_REASON_MASK: u8 = 0x0F;

/// Mask applied to the FPGA slot id before the boot copy is merged in
pub const SLOT_ID_MASK: u8 = 0x7F;

/// Bit position of the booted copy within the record slot id byte
pub const SLOT_ID_BOOT_SHIFT: u32 = 7;
