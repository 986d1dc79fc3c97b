// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Boot-Attempt State Machine
//!
//! Two FPGA scratch registers carry the boot-attempt bookkeeping across
//! resets and power loss:
//!
//! ```text
//! test state word (16 bit)
//!   bits 15..12  test mode code
//!   bits 11..8   remaining test count
//!   bits  7..0   boot count (wraps)
//!
//! BIOS boot flags (8 bit)
//!   bit 0  BOOT    copy the hardware booted from
//!   bit 1  NEXT    copy to boot next
//!   bit 2  FAILED  previous boot was marked failed by the supervisor
//!   bit 3  ALIVE   this boot reached the bootblock checkpoint
//!   bit 4  HAPPY   this boot passed the integrity gate
//! ```
//!
//! [`BootAttempt::begin_boot`] runs once in the bootblock. It derives the
//! complete new state from the entry state and writes each register exactly
//! once, state word first.

use bitflags::bitflags;

use sbc_common::config::RegisterMap;
use sbc_common::constants::MAX_TEST_COUNT;
use sbc_common::{log_info, log_warn, Error, LogSink, Result};
use sbc_hal::PersistentRegisters;

use crate::report;

const MODULE: &str = "boot_state";

// ============================================================================
// Test Mode
// ============================================================================

/// First code of the result range
pub const RES_BOUNDARY: u8 = 0x0C;

/// Test being exercised across reboots, or the result of the last one
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(u8)]
pub enum TestMode {
    /// No test active
    #[default]
    None = 0x0,
    /// Withhold the alive flag and reboot
    AliveReboot = 0x1,
    /// Withhold the alive flag and hang
    AliveHang = 0x2,
    /// Force the integrity gate to fail
    HashFail = 0x3,
    /// Result: register held an unknown code
    ResInvalid = 0xC,
    /// Result: test count ran out or boot counter wrapped
    ResOverflow = 0xD,
    /// Result: supervisor reported a failed boot
    ResFailover = 0xE,
}

impl TestMode {
    /// Decode a 4-bit mode code
    #[must_use]
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            0x0 => Some(Self::None),
            0x1 => Some(Self::AliveReboot),
            0x2 => Some(Self::AliveHang),
            0x3 => Some(Self::HashFail),
            0xC => Some(Self::ResInvalid),
            0xD => Some(Self::ResOverflow),
            0xE => Some(Self::ResFailover),
            _ => None,
        }
    }

    /// The 4-bit mode code
    #[must_use]
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Whether this is a result rather than a test
    #[must_use]
    pub const fn is_result(self) -> bool {
        self.code() >= RES_BOUNDARY
    }

    /// Whether a test is being exercised
    #[must_use]
    pub const fn is_test(self) -> bool {
        !matches!(self, Self::None) && !self.is_result()
    }

    /// Tests that must not set the alive flag
    #[must_use]
    pub const fn keeps_alive_dark(self) -> bool {
        matches!(self, Self::AliveReboot | Self::AliveHang)
    }

    /// What the boot stages do about this mode
    #[must_use]
    pub const fn action(self) -> TestAction {
        match self {
            Self::AliveReboot => TestAction::Reboot,
            Self::AliveHang => TestAction::Hang,
            Self::HashFail => TestAction::CorruptDigest,
            _ => TestAction::Continue,
        }
    }
}

/// Stage behaviour requested by the active test
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestAction {
    /// Boot normally
    Continue,
    /// Warm reset after the bootblock
    Reboot,
    /// Halt after the bootblock
    Hang,
    /// Make the integrity gate see a digest mismatch
    CorruptDigest,
}

// ============================================================================
// Flags
// ============================================================================

bitflags! {
    /// BIOS boot flags register
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BiosBootFlags: u8 {
        /// Copy the hardware booted from (hardware-owned)
        const BOOT = 1 << 0;
        /// Copy to use on the next cold boot
        const NEXT = 1 << 1;
        /// Previous boot was marked failed
        const FAILED = 1 << 2;
        /// Bootblock checkpoint reached
        const ALIVE = 1 << 3;
        /// Integrity gate passed
        const HAPPY = 1 << 4;
    }
}

impl Default for BiosBootFlags {
    fn default() -> Self {
        Self::empty()
    }
}

impl BiosBootFlags {
    /// Flags describing a single boot attempt, cleared by `begin_boot`
    pub const PER_BOOT: Self = Self::FAILED.union(Self::ALIVE).union(Self::HAPPY);
}

// ============================================================================
// State Word
// ============================================================================

/// Decoded boot-attempt register
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BootAttemptState {
    /// Active test or last result
    pub test_mode: TestMode,
    /// Remaining test iterations (0..=15)
    pub test_count: u8,
    /// Rolling boot counter
    pub boot_count: u8,
}

/// Result of decoding a raw state word
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decoded {
    /// Decoded state; an unknown mode decodes as [`TestMode::None`]
    pub state: BootAttemptState,
    /// Raw mode code when it was out of range
    pub invalid_code: Option<u8>,
}

impl BootAttemptState {
    /// Pack into the register word
    #[must_use]
    pub const fn encode(&self) -> u16 {
        ((self.test_mode.code() as u16) << 12)
            | (((self.test_count & MAX_TEST_COUNT) as u16) << 8)
            | self.boot_count as u16
    }

    /// Unpack a register word
    #[must_use]
    pub const fn decode(word: u16) -> Decoded {
        let code = (word >> 12) as u8;
        let test_count = ((word >> 8) as u8) & MAX_TEST_COUNT;
        let boot_count = word as u8;
        let (test_mode, invalid_code) = match TestMode::from_code(code) {
            Some(mode) => (mode, None),
            None => (TestMode::None, Some(code)),
        };
        Decoded {
            state: Self {
                test_mode,
                test_count,
                boot_count,
            },
            invalid_code,
        }
    }
}

/// Why `begin_boot` overrode the entry state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootDiagnostic {
    /// Supervisor reported a failed boot; test cancelled
    Failover,
    /// Entry mode code was out of range
    InvalidMode(u8),
    /// Boot counter wrapped while a test was running
    CounterWrapped,
    /// Test count reached zero
    TestExpired,
}

/// Compute the post-boot state from the entry state
///
/// The rules are applied in priority order; the first that matches wins.
#[must_use]
pub fn next_state(
    entry: &Decoded,
    flags: BiosBootFlags,
) -> (BootAttemptState, Option<BootDiagnostic>) {
    let boot_count = entry.state.boot_count.wrapping_add(1);
    let ended = |test_mode: TestMode| BootAttemptState {
        test_mode,
        test_count: 0,
        boot_count,
    };

    if flags.contains(BiosBootFlags::FAILED) {
        return (ended(TestMode::ResFailover), Some(BootDiagnostic::Failover));
    }
    if let Some(code) = entry.invalid_code {
        return (ended(TestMode::ResInvalid), Some(BootDiagnostic::InvalidMode(code)));
    }

    let mode = entry.state.test_mode;
    // Strict range on purpose: ResInvalid is promoted, ResFailover is not.
    if boot_count == 0 && TestMode::None < mode && mode < TestMode::ResOverflow {
        return (ended(TestMode::ResOverflow), Some(BootDiagnostic::CounterWrapped));
    }
    if mode.is_result() {
        return (ended(TestMode::None), None);
    }
    if mode.is_test() {
        if entry.state.test_count == 0 {
            return (ended(TestMode::ResOverflow), Some(BootDiagnostic::TestExpired));
        }
        return (
            BootAttemptState {
                test_mode: mode,
                test_count: entry.state.test_count - 1,
                boot_count,
            },
            None,
        );
    }
    (ended(TestMode::None), None)
}

/// Compute the post-boot flags for the resulting test mode
#[must_use]
pub fn next_flags(flags: BiosBootFlags, mode: TestMode) -> BiosBootFlags {
    let mut next = flags.difference(BiosBootFlags::PER_BOOT);
    if !mode.keeps_alive_dark() {
        next.insert(BiosBootFlags::ALIVE);
    }
    next
}

// ============================================================================
// Register Access
// ============================================================================

/// What `begin_boot` found and wrote
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BootOutcome {
    /// State on entry (default if unreadable)
    pub previous: BootAttemptState,
    /// State written back
    pub state: BootAttemptState,
    /// Flags written back (or that would have been)
    pub flags: BiosBootFlags,
    /// Override applied to the entry state
    pub diagnostic: Option<BootDiagnostic>,
    /// Whether the alive flag was set
    pub alive_set: bool,
    /// Whether a register could not be read
    pub degraded: bool,
}

/// Boot-attempt register access for one boot phase
pub struct BootAttempt<'a, R: PersistentRegisters> {
    regs: &'a mut R,
    map: RegisterMap,
}

impl<'a, R: PersistentRegisters> BootAttempt<'a, R> {
    /// Bind to the register file
    pub fn new(regs: &'a mut R, map: RegisterMap) -> Self {
        Self { regs, map }
    }

    /// Read and decode the state word
    ///
    /// # Errors
    ///
    /// Returns [`Error::RegisterAccessFailed`] if the register cannot be read.
    pub fn read_state(&self) -> Result<Decoded> {
        let word = self.regs.read_u16(self.map.test_state)?;
        Ok(BootAttemptState::decode(word))
    }

    /// Write the complete state word
    ///
    /// # Errors
    ///
    /// Returns [`Error::RegisterAccessFailed`] if the write fails.
    pub fn write_state(&mut self, state: &BootAttemptState) -> Result<()> {
        self.regs
            .write_u16(self.map.test_state, state.encode())
            .map_err(Error::from)
    }

    /// Read the BIOS boot flags, keeping unknown bits
    ///
    /// # Errors
    ///
    /// Returns [`Error::RegisterAccessFailed`] if the register cannot be read.
    pub fn read_flags(&self) -> Result<BiosBootFlags> {
        let raw = self.regs.read_u8(self.map.bios_boot)?;
        Ok(BiosBootFlags::from_bits_retain(raw))
    }

    /// Write the BIOS boot flags
    ///
    /// # Errors
    ///
    /// Returns [`Error::RegisterAccessFailed`] if the write fails.
    pub fn write_flags(&mut self, flags: BiosBootFlags) -> Result<()> {
        self.regs
            .write_u8(self.map.bios_boot, flags.bits())
            .map_err(Error::from)
    }

    /// Currently active test mode, `None` when unreadable or invalid
    pub fn active_test(&self) -> TestMode {
        match self.read_state() {
            Ok(decoded) if decoded.invalid_code.is_none() => decoded.state.test_mode,
            _ => TestMode::None,
        }
    }

    /// Advance the boot-attempt state for this boot
    ///
    /// Never fails: unreadable registers degrade to the default state and
    /// write failures are logged.
    pub fn begin_boot<L: LogSink>(&mut self, log: &mut L) -> BootOutcome {
        let mut degraded = false;

        let entry = match self.read_state() {
            Ok(decoded) => decoded,
            Err(e) => {
                report(log, MODULE, "state read", e);
                degraded = true;
                BootAttemptState::decode(BootAttemptState::default().encode())
            }
        };
        let flags = match self.read_flags() {
            Ok(flags) => Some(flags),
            Err(e) => {
                report(log, MODULE, "flags read", e);
                degraded = true;
                None
            }
        };

        let (state, diagnostic) = next_state(&entry, flags.unwrap_or_default());
        match diagnostic {
            Some(BootDiagnostic::InvalidMode(code)) => {
                let e = Error::InvalidPersistentState;
                log.log(
                    e.class().log_level(),
                    MODULE,
                    format_args!("invalid test mode 0x{:X}, normalized: {}", code, e),
                );
            }
            Some(BootDiagnostic::Failover) => {
                log_warn!(log, MODULE, "previous boot failed, test cancelled");
            }
            Some(d) => log_info!(log, MODULE, "test ended: {:?}", d),
            None => {}
        }

        if let Err(e) = self.write_state(&state) {
            report(log, MODULE, "state write", e);
        }

        let new_flags = next_flags(flags.unwrap_or_default(), state.test_mode);
        // Without the old value a write would clobber BOOT and NEXT.
        match flags {
            Some(_) => {
                if let Err(e) = self.write_flags(new_flags) {
                    report(log, MODULE, "flags write", e);
                }
            }
            None => log_warn!(log, MODULE, "flags unknown, not updated"),
        }
        let alive_set = flags.is_some() && new_flags.contains(BiosBootFlags::ALIVE);

        log_info!(
            log,
            MODULE,
            "boot {} test {:?} count {} flags 0x{:02X}",
            state.boot_count,
            state.test_mode,
            state.test_count,
            new_flags.bits()
        );

        BootOutcome {
            previous: entry.state,
            state,
            flags: new_flags,
            diagnostic,
            alive_set,
            degraded,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(test_mode: TestMode, test_count: u8, boot_count: u8) -> Decoded {
        Decoded {
            state: BootAttemptState {
                test_mode,
                test_count,
                boot_count,
            },
            invalid_code: None,
        }
    }

    #[test]
    fn test_encode_decode_all_valid_modes() {
        for mode in [
            TestMode::None,
            TestMode::AliveReboot,
            TestMode::AliveHang,
            TestMode::HashFail,
            TestMode::ResInvalid,
            TestMode::ResOverflow,
            TestMode::ResFailover,
        ] {
            let state = BootAttemptState {
                test_mode: mode,
                test_count: 9,
                boot_count: 200,
            };
            let decoded = BootAttemptState::decode(state.encode());
            assert_eq!(decoded.state, state);
            assert_eq!(decoded.invalid_code, None);
        }
    }

    #[test]
    fn test_word_layout() {
        let state = BootAttemptState {
            test_mode: TestMode::HashFail,
            test_count: 0xA,
            boot_count: 0x42,
        };
        assert_eq!(state.encode(), 0x3A42);
    }

    #[test]
    fn test_all_ones_is_invalid() {
        let decoded = BootAttemptState::decode(0xFFFF);
        assert_eq!(decoded.invalid_code, Some(0xF));
        assert_eq!(decoded.state.test_mode, TestMode::None);
    }

    #[test]
    fn test_failed_flag_wins() {
        let (s, d) = next_state(&entry(TestMode::AliveHang, 5, 3), BiosBootFlags::FAILED);
        assert_eq!(s.test_mode, TestMode::ResFailover);
        assert_eq!(s.test_count, 0);
        assert_eq!(s.boot_count, 4);
        assert_eq!(d, Some(BootDiagnostic::Failover));
    }

    #[test]
    fn test_invalid_code_normalized() {
        let decoded = BootAttemptState::decode(0x7512);
        let (s, d) = next_state(&decoded, BiosBootFlags::empty());
        assert_eq!(s.test_mode, TestMode::ResInvalid);
        assert_eq!(s.test_count, 0);
        assert_eq!(d, Some(BootDiagnostic::InvalidMode(0x7)));
    }

    #[test]
    fn test_counter_wrap_promotion_range() {
        for mode in [TestMode::AliveReboot, TestMode::HashFail, TestMode::ResInvalid] {
            let (s, d) = next_state(&entry(mode, 4, 0xFF), BiosBootFlags::empty());
            assert_eq!(s.test_mode, TestMode::ResOverflow, "{mode:?}");
            assert_eq!(s.boot_count, 0);
            assert_eq!(d, Some(BootDiagnostic::CounterWrapped));
        }
        // outside the strict range
        let (s, _) = next_state(&entry(TestMode::ResFailover, 0, 0xFF), BiosBootFlags::empty());
        assert_eq!(s.test_mode, TestMode::None);
        let (s, _) = next_state(&entry(TestMode::None, 0, 0xFF), BiosBootFlags::empty());
        assert_eq!(s.test_mode, TestMode::None);
    }

    #[test]
    fn test_result_consumed() {
        let (s, d) = next_state(&entry(TestMode::ResOverflow, 0, 10), BiosBootFlags::empty());
        assert_eq!(s.test_mode, TestMode::None);
        assert_eq!(d, None);
    }

    #[test]
    fn test_test_count_decrements_then_expires() {
        let (s, _) = next_state(&entry(TestMode::AliveReboot, 2, 10), BiosBootFlags::empty());
        assert_eq!((s.test_mode, s.test_count), (TestMode::AliveReboot, 1));

        let (s, d) = next_state(&entry(TestMode::AliveReboot, 0, 10), BiosBootFlags::empty());
        assert_eq!((s.test_mode, s.test_count), (TestMode::ResOverflow, 0));
        assert_eq!(d, Some(BootDiagnostic::TestExpired));
    }

    #[test]
    fn test_next_flags_alive_rule() {
        let start = BiosBootFlags::BOOT | BiosBootFlags::NEXT | BiosBootFlags::HAPPY;
        let f = next_flags(start, TestMode::None);
        assert_eq!(f, BiosBootFlags::BOOT | BiosBootFlags::NEXT | BiosBootFlags::ALIVE);

        let f = next_flags(start | BiosBootFlags::ALIVE, TestMode::AliveHang);
        assert!(!f.contains(BiosBootFlags::ALIVE));
        assert!(f.contains(BiosBootFlags::NEXT));
    }

    #[test]
    fn test_actions() {
        assert_eq!(TestMode::AliveReboot.action(), TestAction::Reboot);
        assert_eq!(TestMode::AliveHang.action(), TestAction::Hang);
        assert_eq!(TestMode::HashFail.action(), TestAction::CorruptDigest);
        assert_eq!(TestMode::ResFailover.action(), TestAction::Continue);
    }
}
