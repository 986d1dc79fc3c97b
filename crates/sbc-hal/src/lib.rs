// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Hardware Abstraction Layer for the SBC boot firmware
//!
//! The boot core never touches hardware directly. Everything it needs is
//! reached through the traits in [`traits`]:
//!
//! - **`PersistentRegisters`**: FPGA scratch registers that survive reset
//! - **`SpiFlash`**: boot flash with a named region map
//! - **`RealTimeClock`**, **`BoardSensors`**: data for the boot record
//! - **`ImageDigest`**: digest primitive for the integrity gate
//! - **`ResetControl`**: cold/warm reset and halt
//!
//! # Features
//!
//! - `sha1` (default): software SHA-1 [`digest::Sha1Digest`]
//! - `sim`: in-memory back-ends in [`sim`] for host-side testing
//! - `defmt`: defmt formatting of [`HalError`]

#![no_std]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod traits;
pub mod error;

#[cfg(feature = "sha1")]
pub mod digest;

#[cfg(any(test, feature = "sim"))]
pub mod sim;

// Re-export main traits
pub use traits::*;
pub use error::{HalError, HalResult};
