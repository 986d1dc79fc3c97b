// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Board configuration
//!
//! All configuration is fixed when the firmware image is built. The
//! defaults describe the reference board: FPGA scratch registers at their
//! production offsets and the standard flash region names.

use crate::constants::{FIRMWARE_DIGEST_WINDOW, MAX_DIGEST_WINDOW};
use crate::errors::{Error, Result};
use crate::log::LogLevel;

/// Board-wide configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoardConfig {
    /// FPGA scratch register offsets
    pub registers: RegisterMap,
    /// Boot log configuration
    pub boot_log: BootLogConfig,
    /// Integrity gate configuration
    pub verify: VerifyConfig,
    /// Console configuration
    pub console: ConsoleConfig,
}

impl BoardConfig {
    /// Default configuration for the reference board
    pub const DEFAULT: Self = Self {
        registers: RegisterMap::DEFAULT,
        boot_log: BootLogConfig::DEFAULT,
        verify: VerifyConfig::DEFAULT,
        console: ConsoleConfig::DEFAULT,
    };

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidBootConfig`] when a region name is empty, the
    /// digest window is empty or too large to buffer, or two registers
    /// overlap.
    pub fn validate(&self) -> Result<()> {
        self.boot_log.validate()?;
        self.verify.validate()?;
        self.registers.validate()
    }
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Offsets of the FPGA scratch registers
///
/// Every register is one byte wide except `test_state`, which is a 16-bit
/// word occupying `test_state` and `test_state + 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterMap {
    /// Boot stage progress marker
    pub boot_stage: u16,
    /// Packed boot-attempt word (test mode, test count, boot count)
    pub test_state: u16,
    /// BIOS boot flags (boot, next, failed, alive, happy)
    pub bios_boot: u16,
    /// Reset cause reported by the FPGA
    pub reset_cause: u16,
    /// Persisted console log level
    pub log_level: u16,
    /// Backplane slot id
    pub slot_id: u16,
    /// FPGA option straps
    pub fpga_options: u16,
}

impl RegisterMap {
    /// Production register offsets
    pub const DEFAULT: Self = Self {
        boot_stage: 0x20,
        test_state: 0x22,
        bios_boot: 0x24,
        reset_cause: 0x25,
        log_level: 0x26,
        slot_id: 0x27,
        fpga_options: 0x28,
    };

    fn validate(&self) -> Result<()> {
        let bytes = [
            self.boot_stage,
            self.test_state,
            self.test_state.wrapping_add(1),
            self.bios_boot,
            self.reset_cause,
            self.log_level,
            self.slot_id,
            self.fpga_options,
        ];
        for (i, a) in bytes.iter().enumerate() {
            if bytes[i + 1..].contains(a) {
                return Err(Error::InvalidBootConfig);
            }
        }
        Ok(())
    }
}

impl Default for RegisterMap {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Boot log configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BootLogConfig {
    /// Name of the flash region holding the log
    pub region: &'static str,
}

impl BootLogConfig {
    /// Default boot log configuration
    pub const DEFAULT: Self = Self {
        region: "boot_log.bin",
    };

    fn validate(&self) -> Result<()> {
        if self.region.is_empty() {
            return Err(Error::InvalidBootConfig);
        }
        Ok(())
    }
}

impl Default for BootLogConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Integrity gate configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerifyConfig {
    /// Region holding the firmware image
    pub image_region: &'static str,
    /// Region holding the expected digest
    pub digest_region: &'static str,
    /// Number of trailing image bytes covered by the digest
    pub window_len: usize,
}

impl VerifyConfig {
    /// Default integrity gate configuration
    pub const DEFAULT: Self = Self {
        image_region: "firmware",
        digest_region: "firmware.sha1",
        window_len: FIRMWARE_DIGEST_WINDOW,
    };

    fn validate(&self) -> Result<()> {
        if self.image_region.is_empty() || self.digest_region.is_empty() {
            return Err(Error::InvalidBootConfig);
        }
        if self.window_len == 0 || self.window_len > MAX_DIGEST_WINDOW {
            return Err(Error::InvalidBootConfig);
        }
        Ok(())
    }
}

impl Default for VerifyConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Console configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsoleConfig {
    /// Level restored on cold boot or when the stored level is unusable
    pub default_level: LogLevel,
}

impl ConsoleConfig {
    /// Default console configuration
    pub const DEFAULT: Self = Self {
        default_level: LogLevel::Info,
    };
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}
