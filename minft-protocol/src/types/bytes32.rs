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

use serde::{Serialize, Deserialize, Serializer, Deserializer};

#[derive(Debug, thiserror::Error)]
pub enum Bytes32Error {
    #[error("failed to decode hex string: {0}")]
    Hex(#[from] hex::FromHexError),

    #[error("expected 32 bytes, got {0}")]
    InvalidLength(usize)
}

/// Fixed 32 bytes value used by the ledger for coin ids and puzzle hashes.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Bytes32(pub [u8; 32]);

impl Bytes32 {
    /// Decode value from a hex string. The `0x` prefix is optional.
    pub fn from_hex(value: impl AsRef<str>) -> Result<Self, Bytes32Error> {
        let value = value.as_ref().trim();

        let value = value.strip_prefix("0x")
            .or_else(|| value.strip_prefix("0X"))
            .unwrap_or(value);

        let bytes = hex::decode(value)?;

        Self::try_from(bytes.as_slice())
    }

    /// Encode value as a lowercase hex string without prefix.
    #[inline]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    #[inline(always)]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl From<[u8; 32]> for Bytes32 {
    #[inline(always)]
    fn from(value: [u8; 32]) -> Self {
        Self(value)
    }
}

impl TryFrom<&[u8]> for Bytes32 {
    type Error = Bytes32Error;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        let bytes = <[u8; 32]>::try_from(value)
            .map_err(|_| Bytes32Error::InvalidLength(value.len()))?;

        Ok(Self(bytes))
    }
}

impl AsRef<[u8]> for Bytes32 {
    #[inline(always)]
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl std::fmt::Display for Bytes32 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl std::str::FromStr for Bytes32 {
    type Err = Bytes32Error;

    #[inline]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

// RPC endpoints exchange these values as `0x`-prefixed strings.
impl Serialize for Bytes32 {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("0x{}", self.to_hex()))
    }
}

impl<'de> Deserialize<'de> for Bytes32 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;

        Self::from_hex(value).map_err(serde::de::Error::custom)
    }
}

#[test]
fn test_hex() -> Result<(), Bytes32Error> {
    let value = Bytes32::from_hex("0x".to_string() + &"ab".repeat(32))?;

    assert_eq!(value, Bytes32([0xab; 32]));
    assert_eq!(value.to_hex(), "ab".repeat(32));
    assert_eq!(Bytes32::from_hex("ab".repeat(32))?, value);

    assert!(matches!(
        Bytes32::from_hex("abcd"),
        Err(Bytes32Error::InvalidLength(2))
    ));

    assert!(matches!(
        Bytes32::from_hex("zz".repeat(32)),
        Err(Bytes32Error::Hex(_))
    ));

    let json = serde_json::to_string(&value).unwrap();

    assert_eq!(json, format!("\"0x{}\"", "ab".repeat(32)));
    assert_eq!(serde_json::from_str::<Bytes32>(&json).unwrap(), value);

    Ok(())
}
