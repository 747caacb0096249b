// SPDX-License-Identifier: GPL-3.0-or-later
//
// minft
// Copyright (C) 2025  minft contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

use bech32::{Bech32m, Hrp};
use bech32::primitives::decode::CheckedHrpstring;

use super::bytes32::Bytes32;

/// Address prefix of the ledger's main network.
pub const MAINNET_PREFIX: &str = "xch";

/// Address prefix of the ledger's test network.
pub const TESTNET_PREFIX: &str = "txch";

#[derive(Debug, thiserror::Error)]
pub enum AddressError {
    #[error("invalid address prefix: {0}")]
    InvalidPrefix(String),

    #[error("address has unexpected prefix: expected {expected}, got {got}")]
    PrefixMismatch {
        expected: String,
        got: String
    },

    #[error("failed to decode address: {0}")]
    Decode(String),

    #[error("failed to encode address: {0}")]
    Encode(String),

    #[error("address must encode 32 bytes, got {0}")]
    InvalidLength(usize)
}

/// Human-readable bech32m form of a puzzle hash.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Address {
    prefix: String,
    puzzle_hash: Bytes32
}

impl Address {
    #[inline]
    pub fn new(prefix: impl ToString, puzzle_hash: impl Into<Bytes32>) -> Self {
        Self {
            prefix: prefix.to_string(),
            puzzle_hash: puzzle_hash.into()
        }
    }

    /// Decode bech32m address string.
    pub fn decode(address: impl AsRef<str>) -> Result<Self, AddressError> {
        let checked = CheckedHrpstring::new::<Bech32m>(address.as_ref().trim())
            .map_err(|err| AddressError::Decode(err.to_string()))?;

        let bytes = checked.byte_iter().collect::<Vec<u8>>();

        let puzzle_hash = Bytes32::try_from(bytes.as_slice())
            .map_err(|_| AddressError::InvalidLength(bytes.len()))?;

        Ok(Self {
            prefix: checked.hrp().to_lowercase(),
            puzzle_hash
        })
    }

    /// Decode address string and verify that it belongs to the network with
    /// the given prefix.
    pub fn decode_with_prefix(
        address: impl AsRef<str>,
        prefix: impl AsRef<str>
    ) -> Result<Self, AddressError> {
        let address = Self::decode(address)?;
        let prefix = prefix.as_ref();

        if address.prefix != prefix {
            return Err(AddressError::PrefixMismatch {
                expected: prefix.to_string(),
                got: address.prefix
            });
        }

        Ok(address)
    }

    /// Encode address into the bech32m string.
    pub fn encode(&self) -> Result<String, AddressError> {
        let hrp = Hrp::parse(&self.prefix)
            .map_err(|_| AddressError::InvalidPrefix(self.prefix.clone()))?;

        bech32::encode::<Bech32m>(hrp, self.puzzle_hash.as_bytes())
            .map_err(|err| AddressError::Encode(err.to_string()))
    }

    #[inline(always)]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    #[inline(always)]
    pub const fn puzzle_hash(&self) -> &Bytes32 {
        &self.puzzle_hash
    }
}

#[test]
fn test_decode() -> Result<(), Box<dyn std::error::Error>> {
    let address = Address::decode("xch16dnl4tzef59ahmum8cm65es8kxslpgacey2prxdwh44ha6dj6lnsazm4ne")?;

    assert_eq!(address.prefix(), MAINNET_PREFIX);
    assert_eq!(
        address.puzzle_hash().to_hex(),
        "d367faac594d0bdbef9b3e37aa6607b1a1f0a3b8c9141199aebd6b7ee9b2d7e7"
    );

    let address = Address::new(
        MAINNET_PREFIX,
        Bytes32::from_hex("04c26caa2ab8eafbfdf643a93d2c10fb484d1d6dfe3c2498c73f5d1e09ead3bf")?
    );

    assert_eq!(
        address.encode()?,
        "xch1qnpxe232hr40hl0kgw5n6tqsldyy68tdlc7zfxx88aw3uz026wlsjk9xs2"
    );

    assert!(matches!(
        Address::decode_with_prefix(
            "xch1qnpxe232hr40hl0kgw5n6tqsldyy68tdlc7zfxx88aw3uz026wlsjk9xs2",
            TESTNET_PREFIX
        ),
        Err(AddressError::PrefixMismatch { .. })
    ));

    // Flipped last checksum character.
    assert!(Address::decode("xch1qnpxe232hr40hl0kgw5n6tqsldyy68tdlc7zfxx88aw3uz026wlsjk9xs3").is_err());

    Ok(())
}
