// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! SBC Boot Core
//!
//! Boot-attempt bookkeeping and boot history for an FPGA-assisted board:
//!
//! - **Boot State**: test/failover state machine in FPGA scratch registers
//! - **Verify**: firmware digest gate with cold failover reset
//! - **Boot Log**: circular per-boot record log in erase-paged flash
//! - **Console**: console level persisted across warm resets
//! - **Stages**: per-stage board hooks tying the above together
//!
//! Every operation takes its collaborators and a [`LogSink`] explicitly;
//! there is no global state.

#![no_std]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod boot_state;
pub mod verify;
pub mod boot_log;
pub mod console;
pub mod stages;

pub use boot_state::{BiosBootFlags, BootAttempt, BootAttemptState, BootOutcome, TestMode};
pub use verify::{GateVerdict, IntegrityGate};
pub use boot_log::{append_to_region, BootLog, BootLogRecord, NextSlot};
pub use console::resolve_console_level;
pub use stages::{BoardContext, BootStage, BootblockSummary};

use sbc_common::{Error, LogSink};

/// Log a failure at the severity of its error class
pub(crate) fn report<L: LogSink>(log: &mut L, module: &'static str, what: &str, e: Error) {
    log.log(
        e.class().log_level(),
        module,
        format_args!("{}: {}", what, e),
    );
}
