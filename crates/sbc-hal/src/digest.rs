// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Software SHA-1 engine for the firmware integrity gate

use sha1::{Digest, Sha1};

use sbc_common::constants::FIRMWARE_DIGEST_SIZE;

use crate::error::HalResult;
use crate::traits::ImageDigest;

/// SHA-1 computed in software
#[derive(Debug, Default, Clone, Copy)]
pub struct Sha1Digest;

impl Sha1Digest {
    /// Create the engine
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl ImageDigest for Sha1Digest {
    fn digest(&mut self, data: &[u8]) -> HalResult<[u8; FIRMWARE_DIGEST_SIZE]> {
        let hash = Sha1::digest(data);
        let mut out = [0u8; FIRMWARE_DIGEST_SIZE];
        out.copy_from_slice(&hash);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_vector() {
        // FIPS 180 "abc"
        let expected = [
            0xa9, 0x99, 0x3e, 0x36, 0x47, 0x06, 0x81, 0x6a, 0xba, 0x3e, 0x25, 0x71, 0x78, 0x50,
            0xc2, 0x6c, 0x9c, 0xd0, 0xd8, 0x9d,
        ];
        assert_eq!(Sha1Digest::new().digest(b"abc").unwrap(), expected);
    }
}
