// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! SBC Boot Firmware Common Library
//!
//! Types shared by the HAL and the boot-stage logic:
//!
//! - **Errors**: unified error type with category codes and error classes
//! - **Log**: diagnostic sink trait, fixed-capacity log ring and macros
//! - **Config**: compile-time board configuration (register map, regions)
//! - **Time**: calendar time as read from the board RTC
//!
//! # Features
//!
//! - `std`: Enable standard library support (disabled by default)
//! - `defmt`: Enable defmt formatting of errors
//!
//! Nothing in this crate allocates; strings use `heapless`.

#![no_std]
#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

#[cfg(any(test, feature = "std"))]
extern crate std;

pub mod errors;
pub mod config;
pub mod log;
pub mod constants;
pub mod time;

pub use errors::{Error, ErrorClass, Result};
pub use config::BoardConfig;
pub use log::{LogLevel, LogSink};
pub use time::RtcTime;
