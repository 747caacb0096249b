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
use serde_json::json;

use minft_protocol::prelude::*;

use super::http::RpcClient;
use super::{Wallet, RpcError};

/// Body of the wallet's `nft_mint_nft` request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MintNftRequest {
    pub wallet_id: u32,
    pub royalty_address: String,
    pub target_address: String,

    /// Hash of the artifact.
    pub hash: String,
    pub uris: Vec<String>,

    /// Hash of the metadata document.
    pub meta_hash: String,
    pub meta_uris: Vec<String>,

    pub license_hash: String,
    pub license_uris: Vec<String>,

    /// Royalty in basis points.
    pub royalty_percentage: u16,

    /// Fee in mojos.
    pub fee: u64,

    pub did_id: String,

    pub edition_number: u64,
    pub edition_total: u64
}

/// Wallet RPC client.
#[derive(Debug, Clone)]
pub struct WalletClient(RpcClient);

impl WalletClient {
    #[inline(always)]
    pub const fn new(client: RpcClient) -> Self {
        Self(client)
    }
}

#[derive(Deserialize)]
struct WalletBalanceResponse {
    wallet_balance: WalletBalance
}

#[derive(Deserialize)]
struct WalletBalance {
    spendable_balance: u64,
    confirmed_wallet_balance: u64
}

impl Wallet for WalletClient {
    async fn balance(&self, wallet_id: u32) -> Result<Balance, RpcError> {
        let response = self.0.call::<WalletBalanceResponse>("get_wallet_balance", json!({
            "wallet_id": wallet_id
        })).await?;

        Ok(Balance {
            spendable: response.wallet_balance.spendable_balance,
            confirmed: response.wallet_balance.confirmed_wallet_balance
        })
    }

    async fn mint_nft(&self, request: &MintNftRequest) -> Result<MintResult, RpcError> {
        let body = serde_json::to_value(request)
            .map_err(|err| RpcError::rejected("nft_mint_nft", err))?;

        self.0.call::<MintResult>("nft_mint_nft", body).await
    }
}
