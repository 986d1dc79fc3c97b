// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Calendar time as reported by the board real-time clock

use core::fmt;

/// Wall-clock date and time
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct RtcTime {
    /// Full year (e.g. 2026)
    pub year: u16,
    /// Month, 1..=12
    pub month: u8,
    /// Day of month, 1..=31
    pub day: u8,
    /// Hour, 0..=23
    pub hour: u8,
    /// Minute, 0..=59
    pub minute: u8,
    /// Second, 0..=59
    pub second: u8,
}

impl RtcTime {
    /// Create a new time value
    #[must_use]
    pub const fn new(year: u16, month: u8, day: u8, hour: u8, minute: u8, second: u8) -> Self {
        Self {
            year,
            month,
            day,
            hour,
            minute,
            second,
        }
    }

    /// Check that every field is within its calendar range
    ///
    /// Days are not checked against the length of the month.
    #[must_use]
    pub const fn is_plausible(&self) -> bool {
        self.month >= 1
            && self.month <= 12
            && self.day >= 1
            && self.day <= 31
            && self.hour < 24
            && self.minute < 60
            && self.second < 60
    }
}

impl fmt::Display for RtcTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
            self.year, self.month, self.day, self.hour, self.minute, self.second
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::format;

    #[test]
    fn test_display() {
        let t = RtcTime::new(2026, 3, 7, 9, 5, 0);
        assert_eq!(format!("{t}"), "2026-03-07 09:05:00");
    }

    #[test]
    fn test_plausibility() {
        assert!(RtcTime::new(2026, 12, 31, 23, 59, 59).is_plausible());
        assert!(!RtcTime::new(2026, 13, 1, 0, 0, 0).is_plausible());
        assert!(!RtcTime::default().is_plausible());
    }
}
