// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Persisted console log level
//!
//! The console threshold lives in an FPGA scratch register so a level
//! raised for debugging survives warm resets. A cold boot, or a stored
//! level that is unusable or quieter than the default, restores the
//! default.

use sbc_common::{log_debug, LogLevel, LogSink};
use sbc_hal::{PersistentRegisters, ResetCause};

use crate::report;

const MODULE: &str = "console";

/// Whether a stored raw level must be replaced by `default`
#[must_use]
pub fn needs_reset(stored: u8, cause: ResetCause, default: LogLevel) -> bool {
    match LogLevel::from_u8(stored) {
        Some(level) => level < default || cause == ResetCause::ColdBoot,
        None => true,
    }
}

/// Determine the console level for this boot
///
/// The register is rewritten only when the default is restored. Register
/// failures are logged and fall back to the default.
pub fn resolve_console_level<R, L>(
    regs: &mut R,
    offset: u16,
    cause: ResetCause,
    default: LogLevel,
    log: &mut L,
) -> LogLevel
where
    R: PersistentRegisters,
    L: LogSink,
{
    let stored = match regs.read_u8(offset) {
        Ok(raw) => raw,
        Err(e) => {
            report(log, MODULE, "level read", e.into());
            return default;
        }
    };

    if !needs_reset(stored, cause, default) {
        if let Some(level) = LogLevel::from_u8(stored) {
            log_debug!(log, MODULE, "keeping level {}", level);
            return level;
        }
    }

    if let Err(e) = regs.write_u8(offset, default as u8) {
        report(log, MODULE, "level write", e.into());
    }
    default
}
