// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Firmware Integrity Gate
//!
//! Runs in romstage. The digest of the last `window_len` bytes of the
//! firmware region is compared with the 20-byte digest stored in its own
//! flash region.
//!
//! # Outcome
//!
//! - Match: `HAPPY` is set and boot continues.
//! - Mismatch, or either digest unobtainable: `NEXT` is set to the
//!   opposite of `BOOT` and the board is cold reset so the descriptor of
//!   the other copy is read. Unverified firmware never keeps running.

use subtle::ConstantTimeEq;

use sbc_common::config::{RegisterMap, VerifyConfig};
use sbc_common::constants::{FIRMWARE_DIGEST_SIZE, MAX_DIGEST_WINDOW};
use sbc_common::{log_error, log_info, log_warn, Error, LogSink, Result};
use sbc_hal::{ImageDigest, PersistentRegisters, ResetControl, SpiFlash};

use crate::boot_state::{BiosBootFlags, BootAttempt, TestAction};
use crate::report;

const MODULE: &str = "verify";

/// Why the gate rejected the running copy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailoverReason {
    /// Digests differ
    Mismatch,
    /// Hash-fail test forced a mismatch
    Forced,
    /// A digest could not be obtained
    Unavailable(Error),
}

impl FailoverReason {
    /// Error reported for this failover
    #[must_use]
    pub const fn error(&self) -> Error {
        match self {
            Self::Mismatch | Self::Forced => Error::DigestMismatch,
            Self::Unavailable(e) => *e,
        }
    }
}

/// Decision of the integrity gate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateVerdict {
    /// Digest matched; `HAPPY` set
    Verified,
    /// Copy rejected; `NEXT` persisted as `next_copy`
    Failover {
        /// Value written to the `NEXT` flag
        next_copy: bool,
        /// Why the copy was rejected
        reason: FailoverReason,
    },
}

/// Firmware integrity gate
#[derive(Debug, Clone, Copy)]
pub struct IntegrityGate {
    config: VerifyConfig,
    registers: RegisterMap,
}

impl IntegrityGate {
    /// Create a gate for the given layout
    #[must_use]
    pub const fn new(config: VerifyConfig, registers: RegisterMap) -> Self {
        Self { config, registers }
    }

    /// Compare the computed digest with the stored one
    ///
    /// Returns `Ok(true)` on a match.
    ///
    /// # Errors
    ///
    /// Configuration errors for missing or undersized regions, transient
    /// errors for failed reads, [`Error::DigestUnavailable`] when the digest
    /// engine fails.
    pub fn measure<F: SpiFlash, D: ImageDigest>(
        &self,
        flash: &F,
        digest: &mut D,
        corrupt: bool,
    ) -> Result<bool> {
        let window_len = self.config.window_len;
        if window_len == 0 || window_len > MAX_DIGEST_WINDOW {
            return Err(Error::InvalidBootConfig);
        }
        let window = u32::try_from(window_len).map_err(|_| Error::InvalidBootConfig)?;

        let image = flash.map_region(self.config.image_region)?;
        if image.size < window {
            return Err(Error::RegionSizeInvalid);
        }
        let stored = flash.map_region(self.config.digest_region)?;
        if (stored.size as usize) < FIRMWARE_DIGEST_SIZE {
            return Err(Error::RegionSizeInvalid);
        }

        let mut buffer = [0u8; MAX_DIGEST_WINDOW];
        let data = &mut buffer[..window_len];
        flash.read(image.end() - window, data)?;
        let mut computed = digest.digest(data)?;

        let mut expected = [0u8; FIRMWARE_DIGEST_SIZE];
        flash.read(stored.offset, &mut expected)?;

        if corrupt {
            computed[0] ^= 0xFF;
        }

        Ok(bool::from(computed[..].ct_eq(&expected[..])))
    }

    /// Run the gate and persist its decision
    ///
    /// # Errors
    ///
    /// Returns [`Error::RegisterAccessFailed`] when a failover was decided
    /// but `NEXT` could not be persisted. The running copy must still not
    /// continue.
    pub fn check<F, D, R, L>(
        &self,
        flash: &F,
        digest: &mut D,
        regs: &mut R,
        log: &mut L,
    ) -> Result<GateVerdict>
    where
        F: SpiFlash,
        D: ImageDigest,
        R: PersistentRegisters,
        L: LogSink,
    {
        let mut attempt = BootAttempt::new(regs, self.registers);
        let forced = attempt.active_test().action() == TestAction::CorruptDigest;
        if forced {
            log_warn!(log, MODULE, "hash-fail test active, forcing mismatch");
        }

        let reason = match self.measure(flash, digest, forced) {
            Ok(true) => {
                match attempt.read_flags() {
                    Ok(flags) => {
                        if let Err(e) = attempt.write_flags(flags | BiosBootFlags::HAPPY) {
                            report(log, MODULE, "happy flag write", e);
                        }
                    }
                    Err(e) => report(log, MODULE, "happy flag read", e),
                }
                log_info!(log, MODULE, "firmware digest verified");
                return Ok(GateVerdict::Verified);
            }
            Ok(false) if forced => FailoverReason::Forced,
            Ok(false) => FailoverReason::Mismatch,
            Err(e) => {
                report(log, MODULE, "digest", e);
                FailoverReason::Unavailable(e)
            }
        };

        let mut flags = attempt.read_flags()?;
        let next_copy = !flags.contains(BiosBootFlags::BOOT);
        flags.set(BiosBootFlags::NEXT, next_copy);
        attempt.write_flags(flags)?;

        Ok(GateVerdict::Failover { next_copy, reason })
    }

    /// Run the gate and cold reset on failover
    ///
    /// Returns only when the firmware verified.
    pub fn verify_and_gate<F, D, R, X, L>(
        &self,
        flash: &F,
        digest: &mut D,
        regs: &mut R,
        reset: &mut X,
        log: &mut L,
    ) where
        F: SpiFlash,
        D: ImageDigest,
        R: PersistentRegisters,
        X: ResetControl,
        L: LogSink,
    {
        match self.check(flash, digest, regs, log) {
            Ok(GateVerdict::Verified) => {}
            Ok(GateVerdict::Failover { next_copy, reason }) => {
                log_error!(
                    log,
                    MODULE,
                    "integrity failure ({:?}): {}, next copy {}, cold reset",
                    reason,
                    reason.error(),
                    u8::from(next_copy)
                );
                reset.cold_reset();
            }
            Err(e) => {
                log_error!(log, MODULE, "integrity failure, next copy not saved: {}", e);
                reset.cold_reset();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sbc_common::config::BoardConfig;
    use sbc_common::log::NullSink;
    use sbc_common::ErrorClass;
    use sbc_hal::sim::{FixedDigest, SimFlash, SimRegisters};

    const GOOD: [u8; 20] = [0x5A; 20];

    fn board() -> (SimFlash<1024>, IntegrityGate) {
        let mut flash = SimFlash::<1024>::new(256);
        flash.add_region("firmware", 0, 768).unwrap();
        flash.add_region("firmware.sha1", 768, 256).unwrap();
        flash.load(768, &GOOD);
        let config = BoardConfig::DEFAULT;
        (flash, IntegrityGate::new(config.verify, config.registers))
    }

    #[test]
    fn test_failover_reason_errors() {
        assert_eq!(FailoverReason::Mismatch.error(), Error::DigestMismatch);
        assert_eq!(FailoverReason::Forced.error(), Error::DigestMismatch);
        assert_eq!(
            FailoverReason::Unavailable(Error::FlashReadFailed).error(),
            Error::FlashReadFailed
        );
        assert_eq!(FailoverReason::Mismatch.error().class(), ErrorClass::Integrity);
    }

    #[test]
    fn test_measure_reads_trailing_window() {
        let (flash, gate) = board();
        let mut digest = FixedDigest::new(GOOD);
        assert_eq!(gate.measure(&flash, &mut digest, false), Ok(true));
        assert_eq!(digest.last_len, 256);
        assert_eq!(gate.measure(&flash, &mut digest, true), Ok(false));
    }

    #[test]
    fn test_missing_digest_region() {
        let mut flash = SimFlash::<1024>::new(256);
        flash.add_region("firmware", 0, 768).unwrap();
        let config = BoardConfig::DEFAULT;
        let gate = IntegrityGate::new(config.verify, config.registers);
        let mut digest = FixedDigest::new(GOOD);
        assert_eq!(
            gate.measure(&flash, &mut digest, false),
            Err(Error::RegionNotFound)
        );
    }

    #[test]
    fn test_match_sets_happy() {
        let (flash, gate) = board();
        let mut regs = SimRegisters::new();
        let map = BoardConfig::DEFAULT.registers;
        regs.preset_u8(map.bios_boot, BiosBootFlags::ALIVE.bits());
        let verdict = gate
            .check(&flash, &mut FixedDigest::new(GOOD), &mut regs, &mut NullSink)
            .unwrap();
        assert_eq!(verdict, GateVerdict::Verified);
        assert_eq!(
            regs.peek_u8(map.bios_boot),
            (BiosBootFlags::ALIVE | BiosBootFlags::HAPPY).bits()
        );
    }

    #[test]
    fn test_digest_failure_fails_closed() {
        let (flash, gate) = board();
        let mut regs = SimRegisters::new();
        let mut digest = FixedDigest::new(GOOD);
        digest.fail = true;
        let verdict = gate
            .check(&flash, &mut digest, &mut regs, &mut NullSink)
            .unwrap();
        assert_eq!(
            verdict,
            GateVerdict::Failover {
                next_copy: true,
                reason: FailoverReason::Unavailable(Error::DigestUnavailable),
            }
        );
    }
}
