// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Boot-stage driver
//!
//! [`BoardContext`] owns the collaborators for one boot phase and runs the
//! board hooks of each stage:
//!
//! ```text
//! bootblock  stage mark, console level, begin_boot, test action
//! romstage   stage mark, reset cause, integrity gate
//! ramstage   stage mark, boot log record
//! payload    stage mark
//! ```

use sbc_common::config::BoardConfig;
use sbc_common::constants::{RESET_REASON_MASK, SLOT_ID_BOOT_SHIFT, SLOT_ID_MASK};
use sbc_common::{log_info, log_warn, Error, LogLevel, LogSink};
use sbc_hal::{
    BoardSensors, ImageDigest, PersistentRegisters, RealTimeClock, ResetCause, ResetControl,
    SpiFlash,
};

use crate::boot_log::{append_to_region, AppendedRecord, BootLogRecord};
use crate::boot_state::{BiosBootFlags, BootAttempt, BootOutcome, TestAction};
use crate::console::resolve_console_level;
use crate::report;
use crate::verify::IntegrityGate;

const MODULE: &str = "stages";

/// Value substituted for a sensor or register that cannot be read
pub const UNREADABLE: u8 = 0xFF;

/// Boot progress marker written to the boot stage register
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum BootStage {
    /// Bootblock entered
    Bootblock = 0x10,
    /// Romstage entered
    Romstage = 0x20,
    /// Ramstage entered
    Ramstage = 0x30,
    /// Payload about to start
    Payload = 0x40,
}

/// What the bootblock decided
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BootblockSummary {
    /// Boot-attempt bookkeeping result
    pub outcome: BootOutcome,
    /// Console level for this boot
    pub console_level: LogLevel,
    /// Reset cause reported by the FPGA
    pub reset_cause: ResetCause,
}

/// Collaborators and configuration for one boot phase
pub struct BoardContext<'a, R, F, C, D, X> {
    config: &'a BoardConfig,
    regs: &'a mut R,
    flash: &'a mut F,
    clock: &'a mut C,
    digest: &'a mut D,
    reset: &'a mut X,
}

impl<'a, R, F, C, D, X> BoardContext<'a, R, F, C, D, X>
where
    R: PersistentRegisters,
    F: SpiFlash,
    C: RealTimeClock,
    D: ImageDigest,
    X: ResetControl,
{
    /// Assemble the context for a phase
    ///
    /// # Errors
    ///
    /// [`Error::InvalidBootConfig`] when [`BoardConfig::validate`] rejects
    /// the configuration. No register is touched in that case.
    pub fn new(
        config: &'a BoardConfig,
        regs: &'a mut R,
        flash: &'a mut F,
        clock: &'a mut C,
        digest: &'a mut D,
        reset: &'a mut X,
    ) -> sbc_common::Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            regs,
            flash,
            clock,
            digest,
            reset,
        })
    }

    /// Board configuration
    #[must_use]
    pub fn config(&self) -> &BoardConfig {
        self.config
    }

    /// Record boot progress
    pub fn mark_stage<L: LogSink>(&mut self, stage: BootStage, log: &mut L) {
        if let Err(e) = self
            .regs
            .write_u8(self.config.registers.boot_stage, stage as u8)
        {
            report(log, MODULE, "stage mark", e.into());
        }
    }

    /// Reset cause reported by the FPGA, `Invalid` if unreadable
    pub fn reset_cause<L: LogSink>(&mut self, log: &mut L) -> ResetCause {
        match self.regs.read_u8(self.config.registers.reset_cause) {
            Ok(raw) => ResetCause::from_register(raw),
            Err(e) => {
                report(log, MODULE, "reset cause", e.into());
                ResetCause::Invalid
            }
        }
    }

    /// Earliest stage: boot-attempt bookkeeping
    ///
    /// Does not return when the active test asks for a reboot or a hang.
    pub fn bootblock<L: LogSink>(&mut self, log: &mut L) -> BootblockSummary {
        self.mark_stage(BootStage::Bootblock, log);

        let reset_cause = self.reset_cause(log);
        let console_level = resolve_console_level(
            self.regs,
            self.config.registers.log_level,
            reset_cause,
            self.config.console.default_level,
            log,
        );

        let outcome = BootAttempt::new(self.regs, self.config.registers).begin_boot(log);

        match outcome.state.test_mode.action() {
            TestAction::Reboot => {
                log_warn!(log, MODULE, "alive-reboot test, {} left", outcome.state.test_count);
                self.reset.warm_reset();
            }
            TestAction::Hang => {
                log_warn!(log, MODULE, "alive-hang test, {} left", outcome.state.test_count);
                self.reset.halt();
            }
            TestAction::CorruptDigest | TestAction::Continue => {}
        }

        BootblockSummary {
            outcome,
            console_level,
            reset_cause,
        }
    }

    /// Romstage: integrity gate
    ///
    /// Does not return if the firmware fails verification.
    pub fn romstage<L: LogSink>(&mut self, log: &mut L) {
        self.mark_stage(BootStage::Romstage, log);

        let cause = self.reset_cause(log);
        log_info!(log, MODULE, "reset cause {}", cause);

        IntegrityGate::new(self.config.verify, self.config.registers).verify_and_gate(
            self.flash,
            self.digest,
            self.regs,
            self.reset,
            log,
        );
    }

    fn read_register<L: LogSink>(&self, offset: u16, what: &str, log: &mut L) -> u8 {
        self.regs.read_u8(offset).unwrap_or_else(|e| {
            report(log, MODULE, what, e.into());
            UNREADABLE
        })
    }

    /// Build this boot's log record from the board state
    pub fn compose_record<S: BoardSensors, L: LogSink>(
        &mut self,
        sensors: &mut S,
        log: &mut L,
    ) -> BootLogRecord {
        let map = self.config.registers;

        let reason = self.read_register(map.reset_cause, "reset cause", log) & RESET_REASON_MASK;
        let slot = self.read_register(map.slot_id, "slot id", log) & SLOT_ID_MASK;
        let boot_copy = match self.regs.read_u8(map.bios_boot) {
            Ok(raw) => u8::from(BiosBootFlags::from_bits_retain(raw).contains(BiosBootFlags::BOOT)),
            Err(e) => {
                report(log, MODULE, "boot flags", e.into());
                0
            }
        };
        let options = self.read_register(map.fpga_options, "fpga options", log);

        let mut temperature = |r: Result<u8, sbc_hal::HalError>, what: &str| {
            r.unwrap_or_else(|e| {
                report(log, MODULE, what, Error::from(e));
                UNREADABLE
            })
        };
        let temp_core = temperature(sensors.core_temperature(), "core temperature");
        let temp_ext = temperature(sensors.external_temperature(), "external temperature");

        BootLogRecord::new(
            reason,
            temp_core,
            temp_ext,
            slot | (boot_copy << SLOT_ID_BOOT_SHIFT),
            options,
        )
    }

    /// Ramstage: append this boot's record to the boot log
    pub fn ramstage<S: BoardSensors, L: LogSink>(
        &mut self,
        sensors: &mut S,
        log: &mut L,
    ) -> Option<AppendedRecord> {
        self.mark_stage(BootStage::Ramstage, log);
        let record = self.compose_record(sensors, log);
        append_to_region(self.flash, &self.config.boot_log, record, self.clock, log)
    }

    /// Payload handoff
    pub fn payload<L: LogSink>(&mut self, log: &mut L) {
        self.mark_stage(BootStage::Payload, log);
    }
}
