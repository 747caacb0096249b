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

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use minft_protocol::prelude::*;

use super::*;

/// In-memory ledger.
#[derive(Debug, Default)]
pub struct MockLedger {
    records: Mutex<Vec<CoinRecord>>,
    coins: Mutex<HashMap<Bytes32, CoinRecord>>,

    /// Coins whose lookup always returns a malformed response.
    broken: Mutex<HashSet<Bytes32>>,

    /// Amount of the following calls which will fail with a transient error.
    pub failures: AtomicUsize
}

impl MockLedger {
    /// Add deposit of the given amount sent to `receive_puzzle_hash` by a
    /// coin locked with `sender_puzzle_hash`. Return the parent coin id.
    pub fn deposit(
        &self,
        sender_puzzle_hash: Bytes32,
        receive_puzzle_hash: Bytes32,
        amount: u64
    ) -> Bytes32 {
        let mut coins = self.coins.lock().unwrap();

        let parent = CoinRecord {
            coin: Coin {
                parent_coin_info: Bytes32([coins.len() as u8; 32]),
                puzzle_hash: sender_puzzle_hash,
                amount: amount + 1_000_000
            },
            coinbase: false,
            confirmed_block_index: 100,
            spent: true,
            spent_block_index: 101,
            timestamp: 1_700_000_000
        };

        let parent_id = parent.id();

        coins.insert(parent_id, parent);

        self.records.lock().unwrap().push(CoinRecord {
            coin: Coin {
                parent_coin_info: parent_id,
                puzzle_hash: receive_puzzle_hash,
                amount
            },
            coinbase: false,
            confirmed_block_index: 101,
            spent: false,
            spent_block_index: 0,
            timestamp: 1_700_000_100
        });

        parent_id
    }

    /// Add coin record without registering its parent.
    pub fn orphan(&self, record: CoinRecord) {
        self.records.lock().unwrap().push(record);
    }

    /// Make lookups of the coin fail permanently.
    pub fn break_coin(&self, coin_id: Bytes32) {
        self.broken.lock().unwrap().insert(coin_id);
    }

    pub fn repair_coin(&self, coin_id: &Bytes32) {
        self.broken.lock().unwrap().remove(coin_id);
    }

    /// Mark the first unspent deposit as spent. Return its id.
    pub fn spend_first(&self) -> Bytes32 {
        let mut records = self.records.lock().unwrap();

        let record = records.iter_mut()
            .find(|record| !record.spent)
            .expect("no unspent deposits");

        record.spent = true;

        record.id()
    }

    fn fail(&self, endpoint: &str) -> Result<(), RpcError> {
        let failed = self.failures.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |failures| {
            failures.checked_sub(1)
        });

        match failed {
            Ok(_) => Err(RpcError::transient(endpoint, "connection refused")),
            Err(_) => Ok(())
        }
    }
}

impl Ledger for MockLedger {
    async fn coin_records_by_puzzle_hash(
        &self,
        puzzle_hash: &Bytes32,
        include_spent: bool
    ) -> Result<Vec<CoinRecord>, RpcError> {
        self.fail("get_coin_records_by_puzzle_hash")?;

        let records = self.records.lock().unwrap()
            .iter()
            .filter(|record| &record.coin.puzzle_hash == puzzle_hash)
            .filter(|record| include_spent || !record.spent)
            .copied()
            .collect();

        Ok(records)
    }

    async fn coin_record_by_name(
        &self,
        name: &Bytes32
    ) -> Result<Option<CoinRecord>, RpcError> {
        self.fail("get_coin_record_by_name")?;

        if self.broken.lock().unwrap().contains(name) {
            return Err(RpcError::invalid_response("get_coin_record_by_name", "malformed record"));
        }

        Ok(self.coins.lock().unwrap().get(name).copied())
    }
}

/// In-memory wallet.
#[derive(Debug, Default)]
pub struct MockWallet {
    pub balance: Mutex<Balance>,
    pub mints: Mutex<Vec<MintNftRequest>>,

    /// Reject all the mint requests.
    pub reject_mints: AtomicBool,

    /// Amount of the following balance requests which will fail.
    pub balance_failures: AtomicUsize
}

impl MockWallet {
    pub fn with_balance(spendable: u64, confirmed: u64) -> Self {
        Self {
            balance: Mutex::new(Balance { spendable, confirmed }),
            ..Self::default()
        }
    }

    pub fn minted(&self) -> Vec<MintNftRequest> {
        self.mints.lock().unwrap().clone()
    }
}

impl Wallet for MockWallet {
    async fn balance(&self, _wallet_id: u32) -> Result<Balance, RpcError> {
        let failed = self.balance_failures.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |failures| {
            failures.checked_sub(1)
        });

        if failed.is_ok() {
            return Err(RpcError::transient("get_wallet_balance", "timed out"));
        }

        Ok(*self.balance.lock().unwrap())
    }

    async fn mint_nft(&self, request: &MintNftRequest) -> Result<MintResult, RpcError> {
        if self.reject_mints.load(Ordering::SeqCst) {
            return Err(RpcError::rejected("nft_mint_nft", "insufficient funds"));
        }

        let mut mints = self.mints.lock().unwrap();

        mints.push(request.clone());

        Ok(MintResult {
            nft_id: Some(format!("nft1mock{}", mints.len()))
        })
    }
}

/// In-memory pinning service. Content ids are hex hashes of the content.
#[derive(Debug, Default)]
pub struct MockPinning {
    pub stored: Mutex<Vec<Vec<u8>>>,

    /// Fail all the uploads.
    pub reject: AtomicBool,

    /// Amount of upload calls, including failed ones.
    pub attempts: AtomicUsize
}

impl MockPinning {
    /// Amount of successful uploads.
    pub fn uploads(&self) -> usize {
        self.stored.lock().unwrap().len()
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl Pinning for MockPinning {
    async fn store(&self, bytes: Vec<u8>) -> Result<String, RpcError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);

        if self.reject.load(Ordering::SeqCst) {
            return Err(RpcError::transient("upload", "service unavailable"));
        }

        let cid = format!("bafy{}", &ContentHash::digest(&bytes).to_hex()[..16]);

        self.stored.lock().unwrap().push(bytes);

        Ok(cid)
    }
}
