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

use crate::hash::ContentHash;

/// Static, task-independent settings of the minted collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionConfig {
    /// Id of the NFT wallet used for minting.
    pub nft_wallet_id: u32,

    /// Address receiving royalties from secondary sales.
    pub royalty_address: String,

    /// Royalty percentage in basis points (`500` is 5%).
    pub royalty_percentage: u16,

    /// Transaction fee in mojos.
    pub fee: u64,

    /// Hash of the license document.
    pub license_hash: String,

    /// URL of the license document.
    pub license_url: String,

    /// Identifier of the collection's controlling identity (DID).
    pub did_id: String
}

/// Task-specific part of a mint request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MintRequest {
    pub to_address: String,

    pub image_hash: ContentHash,
    pub image_url: String,

    pub metadata_hash: ContentHash,
    pub metadata_url: String,

    /// 1-based edition number.
    pub edition_number: u64,
    pub edition_total: u64
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintResult {
    /// Id of the minted NFT, if reported by the wallet.
    pub nft_id: Option<String>
}

/// Balance of a wallet in mojos.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Balance {
    pub spendable: u64,
    pub confirmed: u64
}

impl Balance {
    /// Funds are settled when there's no pending activity: spendable
    /// balance equals confirmed total and is positive.
    #[inline]
    pub const fn is_settled(&self) -> bool {
        self.spendable > 0 && self.spendable == self.confirmed
    }
}

#[test]
fn test_settled_balance() {
    assert!(Balance { spendable: 10, confirmed: 10 }.is_settled());

    assert!(!Balance { spendable: 5, confirmed: 10 }.is_settled());
    assert!(!Balance { spendable: 0, confirmed: 0 }.is_settled());
    assert!(!Balance { spendable: 10, confirmed: 5 }.is_settled());
}
