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

use serde::{Serialize, Deserialize};
use sha2::{Sha256, Digest};

use super::bytes32::Bytes32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Coin {
    /// Id of the coin which created this one.
    pub parent_coin_info: Bytes32,

    /// Hash of the puzzle locking this coin.
    pub puzzle_hash: Bytes32,

    /// Value of the coin in mojos.
    pub amount: u64
}

impl Coin {
    /// Calculate id of the coin: `sha256(parent || puzzle_hash || amount)`
    /// where amount uses the ledger's minimal signed big-endian encoding.
    pub fn id(&self) -> Bytes32 {
        let mut hasher = Sha256::new();

        hasher.update(self.parent_coin_info.as_bytes());
        hasher.update(self.puzzle_hash.as_bytes());
        hasher.update(encode_amount(self.amount));

        Bytes32(hasher.finalize().into())
    }
}

/// Encode amount the same way the ledger serializes integers: big-endian
/// without leading zero bytes, with an extra zero byte if the highest bit is
/// set (so the value stays positive). Zero encodes to an empty slice.
pub fn encode_amount(amount: u64) -> Vec<u8> {
    if amount == 0 {
        return vec![];
    }

    let bytes = amount.to_be_bytes();

    let skip = bytes.iter()
        .take_while(|byte| **byte == 0)
        .count();

    let mut encoded = Vec::with_capacity(9);

    if bytes[skip] & 0x80 != 0 {
        encoded.push(0);
    }

    encoded.extend_from_slice(&bytes[skip..]);

    encoded
}

/// Coin as it's reported by the ledger query interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CoinRecord {
    pub coin: Coin,

    #[serde(default)]
    pub coinbase: bool,

    pub confirmed_block_index: u32,

    #[serde(default)]
    pub spent: bool,

    #[serde(default)]
    pub spent_block_index: u32,

    /// Unix timestamp of the block which confirmed this coin.
    #[serde(default)]
    pub timestamp: u64
}

impl CoinRecord {
    #[inline(always)]
    pub fn id(&self) -> Bytes32 {
        self.coin.id()
    }

    #[inline(always)]
    pub const fn amount(&self) -> u64 {
        self.coin.amount
    }
}

#[test]
fn test_encode_amount() {
    assert!(encode_amount(0).is_empty());

    assert_eq!(encode_amount(1), [1]);
    assert_eq!(encode_amount(127), [127]);
    assert_eq!(encode_amount(128), [0, 128]);
    assert_eq!(encode_amount(1000), [3, 232]);
    assert_eq!(encode_amount(u64::MAX), [0, 255, 255, 255, 255, 255, 255, 255, 255]);
}

#[test]
fn test_coin_id() {
    let coin = |amount| Coin {
        parent_coin_info: Bytes32([0x11; 32]),
        puzzle_hash: Bytes32([0x22; 32]),
        amount
    };

    assert_eq!(coin(1000).id().to_hex(), "c3480b359a9a066e963fbca942591839c073d08cf84d882db37209fc5ac9b31c");
    assert_eq!(coin(128).id().to_hex(), "d254c74c04ffcffe39ebc936fddba7a203723dcc083ef3004fc3f70477d6a7d4");
    assert_eq!(coin(0).id().to_hex(), "5189c77d29fe5d546a045ec46986852785fea5c13ac7da9c115ff5fb6edf817c");
}

#[test]
fn test_record_json() {
    let record = serde_json::from_str::<CoinRecord>(&format!(r#"{{
        "coin": {{
            "amount": 1000,
            "parent_coin_info": "0x{}",
            "puzzle_hash": "0x{}"
        }},
        "coinbase": false,
        "confirmed_block_index": 2500000,
        "spent": false,
        "spent_block_index": 0,
        "timestamp": 1650000000
    }}"#, "11".repeat(32), "22".repeat(32))).unwrap();

    assert_eq!(record.amount(), 1000);
    assert_eq!(record.coin.parent_coin_info, Bytes32([0x11; 32]));
    assert_eq!(record.confirmed_block_index, 2500000);
    assert!(!record.spent);
}
