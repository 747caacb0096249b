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

use sha2::{Sha256, Digest};

/// SHA-256 digest of the published content.
///
/// Committed on-chain next to the content URL, so it is always computed
/// locally from the raw bytes and never taken from the storage service.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ContentHash(pub [u8; 32]);

impl ContentHash {
    pub fn digest(bytes: impl AsRef<[u8]>) -> Self {
        Self(Sha256::digest(bytes.as_ref()).into())
    }

    #[inline]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(value: impl AsRef<str>) -> Option<Self> {
        let bytes = hex::decode(value.as_ref().trim()).ok()?;

        <[u8; 32]>::try_from(bytes).ok().map(Self)
    }
}

impl std::fmt::Display for ContentHash {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

#[test]
fn test() {
    let hash = ContentHash::digest(b"hello, minft");

    assert_eq!(hash.to_hex(), "f84e21e9e3a8093cae00cf1c4cd96cfb163161c7cdad98ce070bcc18228b29cd");
    assert_eq!(hash, ContentHash::digest(b"hello, minft".to_vec()));
    assert_eq!(ContentHash::from_hex(hash.to_hex()), Some(hash));

    assert_ne!(hash, ContentHash::digest(b"hello, minft!"));
    assert_eq!(ContentHash::from_hex("abcd"), None);
}
