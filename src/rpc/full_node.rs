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

use serde::Deserialize;
use serde_json::json;

use minft_protocol::prelude::*;

use super::http::RpcClient;
use super::{Ledger, RpcError};

/// Ledger node RPC client.
#[derive(Debug, Clone)]
pub struct FullNodeClient(RpcClient);

impl FullNodeClient {
    #[inline(always)]
    pub const fn new(client: RpcClient) -> Self {
        Self(client)
    }
}

#[derive(Deserialize)]
struct CoinRecordsResponse {
    coin_records: Vec<CoinRecord>
}

#[derive(Deserialize)]
struct CoinRecordResponse {
    coin_record: Option<CoinRecord>
}

impl Ledger for FullNodeClient {
    async fn coin_records_by_puzzle_hash(
        &self,
        puzzle_hash: &Bytes32,
        include_spent: bool
    ) -> Result<Vec<CoinRecord>, RpcError> {
        let response = self.0.call::<CoinRecordsResponse>("get_coin_records_by_puzzle_hash", json!({
            "puzzle_hash": puzzle_hash,
            "include_spent_coins": include_spent
        })).await?;

        Ok(response.coin_records)
    }

    async fn coin_record_by_name(
        &self,
        name: &Bytes32
    ) -> Result<Option<CoinRecord>, RpcError> {
        let response = self.0.call::<CoinRecordResponse>("get_coin_record_by_name", json!({
            "name": name
        })).await;

        match response {
            Ok(response) => Ok(response.coin_record),

            // The node reports unknown coins as failed requests.
            Err(RpcError::Rejected { message, .. }) if message.contains("not found") => Ok(None),

            Err(err) => Err(err)
        }
    }
}
