// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Integration tests for sbc-hal
//!
//! Tests for error handling, error conversion, reset causes and the trait
//! surface. Tests that need the simulation back-ends are compiled with the
//! `sim` feature only.

mod error_tests {
    use sbc_hal::HalError;

    #[test]
    fn test_error_codes_in_hal_range() {
        for e in [
            HalError::RegionNotFound,
            HalError::FlashOutOfBounds,
            HalError::FlashWriteFailed,
            HalError::FlashMisaligned,
            HalError::RegisterFault,
            HalError::RegisterOutOfRange,
            HalError::RtcError,
            HalError::SensorError,
            HalError::DigestFailed,
            HalError::InvalidParameter,
        ] {
            assert_eq!(e.code() >> 8, 0x08);
        }
    }

    #[test]
    fn test_display_includes_code() {
        let s = HalError::FlashEraseFailed.to_string();
        assert_eq!(s, "[0x0813] flash erase failed");
    }
}

mod error_conversion_tests {
    use sbc_common::{Error, ErrorClass};
    use sbc_hal::HalError;

    #[test]
    fn test_missing_region_is_configuration_error() {
        let e: Error = HalError::RegionNotFound.into();
        assert_eq!(e, Error::RegionNotFound);
        assert_eq!(e.class(), ErrorClass::Configuration);
    }

    #[test]
    fn test_io_failures_are_transient() {
        for hal in [
            HalError::FlashWriteFailed,
            HalError::FlashEraseFailed,
            HalError::RtcError,
            HalError::RegisterFault,
            HalError::SensorError,
        ] {
            let e: Error = hal.into();
            assert_eq!(e.class(), ErrorClass::Transient, "{hal}");
        }
    }

    #[test]
    fn test_digest_failure_is_integrity_error() {
        let e: Error = HalError::DigestFailed.into();
        assert_eq!(e.class(), ErrorClass::Integrity);
    }
}

mod reset_cause_tests {
    use sbc_hal::ResetCause;

    #[test]
    fn test_every_code_has_text() {
        let expected = [
            "Cold Boot",
            "Watchdog Reset",
            "Backplane Sleep",
            "Power Failure",
            "Software Reset",
            "Button",
            "Timeout",
            "Invalid",
        ];
        for (code, text) in expected.iter().enumerate() {
            let cause = ResetCause::from_register(code as u8);
            assert_eq!(cause as u8, code as u8);
            assert_eq!(cause.text(), *text);
        }
    }

    #[test]
    fn test_display_format() {
        assert_eq!(ResetCause::Watchdog.to_string(), "[1] Watchdog Reset");
    }
}

mod trait_object_safety_tests {
    //! Compile-time checks that the collaborator traits can be implemented
    //! by a minimal board and used behind `dyn`.

    use sbc_common::constants::FIRMWARE_DIGEST_SIZE;
    use sbc_common::RtcTime;
    use sbc_hal::{
        BoardSensors, FlashRegion, HalResult, ImageDigest, PersistentRegisters, RealTimeClock,
        SpiFlash,
    };

    struct MockRegisters;

    impl PersistentRegisters for MockRegisters {
        fn read_u8(&self, _offset: u16) -> HalResult<u8> { Ok(0xFF) }
        fn write_u8(&mut self, _offset: u16, _value: u8) -> HalResult<()> { Ok(()) }
        fn read_u16(&self, _offset: u16) -> HalResult<u16> { Ok(0xFFFF) }
        fn write_u16(&mut self, _offset: u16, _value: u16) -> HalResult<()> { Ok(()) }
    }

    struct MockFlash {
        erased: u32,
    }

    impl SpiFlash for MockFlash {
        fn sector_size(&self) -> u32 { 4096 }
        fn map_region(&self, _name: &str) -> HalResult<FlashRegion> {
            Ok(FlashRegion { offset: 0, size: 8192 })
        }
        fn read(&self, _offset: u32, buffer: &mut [u8]) -> HalResult<()> {
            buffer.fill(0xFF);
            Ok(())
        }
        fn write(&mut self, _offset: u32, _data: &[u8]) -> HalResult<()> { Ok(()) }
        fn erase(&mut self, _offset: u32) -> HalResult<()> {
            self.erased += 1;
            Ok(())
        }
    }

    struct MockClock;

    impl RealTimeClock for MockClock {
        fn read_time(&mut self) -> HalResult<RtcTime> {
            Ok(RtcTime::new(2026, 1, 1, 0, 0, 0))
        }
    }

    struct MockDigest;

    impl ImageDigest for MockDigest {
        fn digest(&mut self, _data: &[u8]) -> HalResult<[u8; FIRMWARE_DIGEST_SIZE]> {
            Ok([0; FIRMWARE_DIGEST_SIZE])
        }
    }

    struct MockSensors;

    impl BoardSensors for MockSensors {
        fn core_temperature(&mut self) -> HalResult<u8> { Ok(40) }
        fn external_temperature(&mut self) -> HalResult<u8> { Ok(30) }
    }

    #[test]
    fn test_traits_usable_as_objects() {
        let regs: &dyn PersistentRegisters = &MockRegisters;
        assert_eq!(regs.read_u16(0).unwrap(), 0xFFFF);

        let mut flash = MockFlash { erased: 0 };
        let dyn_flash: &mut dyn SpiFlash = &mut flash;
        dyn_flash.erase_range(0, 8192).unwrap();
        assert_eq!(flash.erased, 2);

        let clock: &mut dyn RealTimeClock = &mut MockClock;
        assert_eq!(clock.read_time().unwrap().year, 2026);

        let digest: &mut dyn ImageDigest = &mut MockDigest;
        assert_eq!(digest.digest(&[]).unwrap(), [0; FIRMWARE_DIGEST_SIZE]);

        let sensors: &mut dyn BoardSensors = &mut MockSensors;
        assert_eq!(sensors.core_temperature().unwrap(), 40);
    }
}

#[cfg(feature = "sha1")]
mod digest_tests {
    use sbc_hal::digest::Sha1Digest;
    use sbc_hal::ImageDigest;

    #[test]
    fn test_empty_input() {
        // SHA-1("")
        let expected = [
            0xda, 0x39, 0xa3, 0xee, 0x5e, 0x6b, 0x4b, 0x0d, 0x32, 0x55, 0xbf, 0xef, 0x95, 0x60,
            0x18, 0x90, 0xaf, 0xd8, 0x07, 0x09,
        ];
        assert_eq!(Sha1Digest::new().digest(&[]).unwrap(), expected);
    }

    #[test]
    fn test_window_sized_input_differs_by_content() {
        let mut engine = Sha1Digest::new();
        let a = engine.digest(&[0xFF; 256]).unwrap();
        let b = engine.digest(&[0x00; 256]).unwrap();
        assert_ne!(a, b);
    }
}

#[cfg(feature = "sim")]
mod sim_tests {
    use sbc_common::RtcTime;
    use sbc_hal::sim::{FixedDigest, SimClock, SimFlash, SimReset, SimSensors, COLD_RESET_MSG};
    use sbc_hal::{BoardSensors, HalError, ImageDigest, RealTimeClock, ResetControl, SpiFlash};
    use std::panic::{catch_unwind, AssertUnwindSafe};

    #[test]
    fn test_clock_failure_injection() {
        let mut clock = SimClock::new(RtcTime::new(2026, 10, 16, 12, 0, 0));
        assert_eq!(clock.read_time().unwrap().month, 10);
        clock.fail = true;
        assert_eq!(clock.read_time(), Err(HalError::RtcError));
    }

    #[test]
    fn test_sensors_and_digest() {
        let mut sensors = SimSensors { core: 55, external: 31, fail: false };
        assert_eq!(sensors.external_temperature().unwrap(), 31);

        let mut digest = FixedDigest::new([7; 20]);
        assert_eq!(digest.digest(&[0; 256]).unwrap(), [7; 20]);
        assert_eq!(digest.last_len, 256);
    }

    #[test]
    fn test_flash_write_failure() {
        let mut flash = SimFlash::<256>::new(128);
        flash.fail_writes = true;
        assert_eq!(flash.write(0, &[0]), Err(HalError::FlashWriteFailed));
        assert_eq!(flash.write_count(), 0);
    }

    #[test]
    fn test_reset_unwinds_with_message() {
        let result = catch_unwind(AssertUnwindSafe(|| {
            let mut reset = SimReset;
            reset.cold_reset();
        }));
        let payload = result.unwrap_err();
        let msg = payload
            .downcast_ref::<String>()
            .map(String::as_str)
            .or_else(|| payload.downcast_ref::<&str>().copied())
            .unwrap();
        assert_eq!(msg, COLD_RESET_MSG);
    }
}
