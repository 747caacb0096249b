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

use std::collections::HashSet;
use std::time::Duration;

use spin::Mutex;
use tokio::sync::watch;

use minft_protocol::prelude::*;

use crate::backoff::Backoff;
use crate::database::Database;
use crate::database::task::{MintTaskRecord, CreateError};
use crate::rpc::{Ledger, RpcError};
use crate::utils::sleep_or_shutdown;

#[derive(Debug, thiserror::Error)]
pub enum WatcherError {
    #[error(transparent)]
    Ledger(#[from] RpcError),

    #[error(transparent)]
    Database(#[from] rusqlite::Error)
}

#[derive(Debug, Clone)]
pub struct DepositWatcherConfig {
    /// Address receiving payments.
    pub receive_address: Address,

    /// Minimal accepted deposit in mojos.
    pub price: u64,

    /// Prefix used to encode delivery addresses.
    pub address_prefix: String,

    pub poll_interval: Duration,
    pub backoff: Backoff
}

/// Result of a single ledger poll.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollReport {
    /// Amount of unspent coins at the receive address.
    pub seen: usize,

    /// Amount of created mint tasks.
    pub created: usize,

    /// Amount of deposits which already have a task.
    pub known: usize,

    /// Amount of deposits below the price.
    pub below_price: usize,

    /// Amount of deposits whose parent coin couldn't be resolved.
    pub unresolved: usize,

    /// Amount of deposits skipped because of a failed parent lookup. They
    /// are processed again by the next poll.
    pub failed: usize
}

/// Polls the ledger and turns qualifying deposits into mint tasks.
#[derive(Debug)]
pub struct DepositWatcher<L> {
    ledger: L,
    database: Database,
    config: DepositWatcherConfig,

    /// Underpaid coins already reported to the operator.
    reported: Mutex<HashSet<Bytes32>>
}

impl<L: Ledger> DepositWatcher<L> {
    pub fn new(
        ledger: L,
        database: Database,
        config: DepositWatcherConfig
    ) -> Self {
        Self {
            ledger,
            database,
            config,
            reported: Mutex::new(HashSet::new())
        }
    }

    /// Query the ledger once and create tasks for new qualifying deposits.
    pub async fn poll(&self) -> Result<PollReport, WatcherError> {
        let records = self.ledger.coin_records_by_puzzle_hash(
            self.config.receive_address.puzzle_hash(),
            false
        ).await?;

        let mut report = PollReport {
            seen: records.len(),
            ..PollReport::default()
        };

        tracing::debug!(coins = records.len(), "polled receive address");

        // Forget underpaid coins which are not listed anymore.
        let listed = records.iter()
            .map(CoinRecord::id)
            .collect::<HashSet<_>>();

        self.reported.lock().retain(|coin_id| listed.contains(coin_id));

        for record in records {
            let coin_id = record.id();
            let parent_id = record.coin.parent_coin_info;

            // Underpaid deposits are never retried and need operator review.
            if record.amount() < self.config.price {
                report.below_price += 1;

                if self.reported.lock().insert(coin_id) {
                    tracing::warn!(
                        coin_id = %coin_id,
                        parent_id = %parent_id,
                        amount = record.amount(),
                        price = self.config.price,
                        "deposit is below the price, ignoring it"
                    );
                }

                continue;
            }

            if MintTaskRecord::find(self.database.clone(), parent_id.to_hex())?.is_some() {
                report.known += 1;

                continue;
            }

            // A broken record must not block the following deposits.
            let parent = match self.ledger.coin_record_by_name(&parent_id).await {
                Ok(parent) => parent,

                Err(err) => {
                    report.failed += 1;

                    tracing::warn!(
                        coin_id = %coin_id,
                        parent_id = %parent_id,
                        transient = err.is_transient(),
                        error = %err,
                        "failed to query parent coin of the deposit"
                    );

                    continue;
                }
            };

            // The returned parent must be the coin which created the deposit.
            let parent = match parent {
                Some(parent) if parent.id() == parent_id => parent,

                _ => {
                    report.unresolved += 1;

                    tracing::error!(
                        coin_id = %coin_id,
                        parent_id = %parent_id,
                        "failed to resolve parent coin of the deposit"
                    );

                    continue;
                }
            };

            let to_address = match Address::new(&self.config.address_prefix, parent.coin.puzzle_hash).encode() {
                Ok(to_address) => to_address,

                Err(err) => {
                    report.failed += 1;

                    tracing::error!(
                        coin_id = %coin_id,
                        parent_id = %parent_id,
                        error = %err,
                        "failed to encode delivery address"
                    );

                    continue;
                }
            };

            match MintTaskRecord::create_if_absent(self.database.clone(), parent_id.to_hex(), &to_address) {
                Ok(task) => {
                    let mint_id = task.mint_id()?;

                    report.created += 1;

                    tracing::info!(
                        parent_id = %parent_id,
                        mint_id,
                        amount = record.amount(),
                        to_address = %to_address,
                        "created mint task"
                    );
                }

                // Another poll created the task first.
                Err(CreateError::Duplicate(_)) => report.known += 1,

                Err(CreateError::Database(err)) => return Err(err.into())
            }
        }

        Ok(report)
    }

    /// Poll the ledger until shutdown is requested.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut backoff = self.config.backoff;

        tracing::info!(
            receive_address = ?self.config.receive_address.encode().ok(),
            price = self.config.price,
            "starting deposit watcher"
        );

        loop {
            let delay = match self.poll().await {
                Ok(report) => {
                    backoff.reset();

                    if report.created > 0 {
                        tracing::info!(?report, "deposits processed");
                    }

                    self.config.poll_interval
                }

                Err(err) => {
                    let delay = backoff.next_delay();

                    tracing::warn!(
                        error = %err,
                        failures = backoff.failures(),
                        retry_in = ?delay,
                        "failed to poll deposits"
                    );

                    delay
                }
            };

            if sleep_or_shutdown(&mut shutdown, delay).await {
                break;
            }
        }

        tracing::info!("deposit watcher stopped");
    }
}

#[cfg(test)]
fn test_watcher(
    ledger: std::sync::Arc<crate::rpc::mock::MockLedger>,
    database: Database,
    price: u64
) -> DepositWatcher<std::sync::Arc<crate::rpc::mock::MockLedger>> {
    DepositWatcher::new(ledger, database, DepositWatcherConfig {
        receive_address: Address::new("xch", Bytes32([0xee; 32])),
        price,
        address_prefix: String::from("xch"),
        poll_interval: Duration::from_millis(10),
        backoff: Backoff::new(Duration::from_millis(1), Duration::from_millis(10))
    })
}

#[tokio::test]
async fn test_deposit_at_price() -> anyhow::Result<()> {
    use std::sync::Arc;

    use crate::rpc::mock::MockLedger;

    let ledger = Arc::new(MockLedger::default());
    let database = Database::open_in_memory()?;

    let watcher = test_watcher(ledger.clone(), database.clone(), 1000);

    let parent_id = ledger.deposit(Bytes32([0x01; 32]), Bytes32([0xee; 32]), 1000);

    let report = watcher.poll().await?;

    assert_eq!(report.seen, 1);
    assert_eq!(report.created, 1);

    let task = MintTaskRecord::find(database.clone(), parent_id.to_hex())?
        .expect("task must be created")
        .info()?;

    assert_eq!(task.mint_id, 0);
    assert_eq!(task.status, MintTaskStatus::Pending);
    assert_eq!(task.to_address, Address::new("xch", Bytes32([0x01; 32])).encode()?);

    Ok(())
}

#[tokio::test]
async fn test_deposit_below_price() -> anyhow::Result<()> {
    use std::sync::Arc;

    use crate::rpc::mock::MockLedger;

    let ledger = Arc::new(MockLedger::default());
    let database = Database::open_in_memory()?;

    let watcher = test_watcher(ledger.clone(), database.clone(), 1000);

    ledger.deposit(Bytes32([0x02; 32]), Bytes32([0xee; 32]), 999);

    for _ in 0..3 {
        let report = watcher.poll().await?;

        assert_eq!(report.below_price, 1);
        assert_eq!(report.created, 0);
    }

    assert!(MintTaskRecord::all(database)?.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_repeated_observation() -> anyhow::Result<()> {
    use std::sync::Arc;

    use crate::rpc::mock::MockLedger;

    let ledger = Arc::new(MockLedger::default());
    let database = Database::open_in_memory()?;

    let watcher = test_watcher(ledger.clone(), database.clone(), 1000);

    let first = ledger.deposit(Bytes32([0x01; 32]), Bytes32([0xee; 32]), 1000);

    assert_eq!(watcher.poll().await?.created, 1);

    let second = ledger.deposit(Bytes32([0x03; 32]), Bytes32([0xee; 32]), 5000);

    let report = watcher.poll().await?;

    assert_eq!(report.created, 1);
    assert_eq!(report.known, 1);

    // Second watcher sharing the same store.
    let other = test_watcher(ledger.clone(), database.clone(), 1000);

    assert_eq!(other.poll().await?.created, 0);

    let tasks = MintTaskRecord::all(database.clone())?
        .into_iter()
        .map(|task| task.info())
        .collect::<rusqlite::Result<Vec<_>>>()?;

    assert_eq!(tasks.len(), 2);
    assert_eq!(tasks[0].parent_id, first.to_hex());
    assert_eq!(tasks[0].mint_id, 0);
    assert_eq!(tasks[1].parent_id, second.to_hex());
    assert_eq!(tasks[1].mint_id, 1);

    Ok(())
}

#[tokio::test]
async fn test_unresolved_parent() -> anyhow::Result<()> {
    use std::sync::Arc;

    use crate::rpc::mock::MockLedger;

    let ledger = Arc::new(MockLedger::default());
    let database = Database::open_in_memory()?;

    let watcher = test_watcher(ledger.clone(), database.clone(), 1000);

    ledger.orphan(CoinRecord {
        coin: Coin {
            parent_coin_info: Bytes32([0xaa; 32]),
            puzzle_hash: Bytes32([0xee; 32]),
            amount: 1000
        },
        coinbase: false,
        confirmed_block_index: 10,
        spent: false,
        spent_block_index: 0,
        timestamp: 0
    });

    let report = watcher.poll().await?;

    assert_eq!(report.unresolved, 1);
    assert!(MintTaskRecord::all(database)?.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_run_survives_failures() -> anyhow::Result<()> {
    use std::sync::Arc;
    use std::sync::atomic::Ordering;

    use crate::rpc::mock::MockLedger;
    use crate::utils::shutdown_channel;

    let ledger = Arc::new(MockLedger::default());
    let database = Database::open_in_memory()?;

    let parent_id = ledger.deposit(Bytes32([0x01; 32]), Bytes32([0xee; 32]), 1000);

    ledger.failures.store(3, Ordering::SeqCst);

    let watcher = Arc::new(test_watcher(ledger.clone(), database.clone(), 1000));

    let (sender, receiver) = shutdown_channel();

    let task = tokio::spawn({
        let watcher = watcher.clone();

        async move {
            watcher.run(receiver).await;
        }
    });

    let mut created = false;

    for _ in 0..200 {
        if MintTaskRecord::find(database.clone(), parent_id.to_hex())?.is_some() {
            created = true;

            break;
        }

        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    sender.send(true)?;

    task.await?;

    assert!(created);
    assert_eq!(ledger.failures.load(Ordering::SeqCst), 0);

    Ok(())
}

#[tokio::test]
async fn test_broken_parent_doesnt_block_others() -> anyhow::Result<()> {
    use std::sync::Arc;

    use crate::rpc::mock::MockLedger;

    let ledger = Arc::new(MockLedger::default());
    let database = Database::open_in_memory()?;

    let watcher = test_watcher(ledger.clone(), database.clone(), 1000);

    let broken = ledger.deposit(Bytes32([0x01; 32]), Bytes32([0xee; 32]), 1000);
    let healthy = ledger.deposit(Bytes32([0x02; 32]), Bytes32([0xee; 32]), 1000);

    ledger.break_coin(broken);

    for _ in 0..3 {
        let report = watcher.poll().await?;

        assert_eq!(report.failed, 1);
    }

    assert!(MintTaskRecord::find(database.clone(), broken.to_hex())?.is_none());

    let task = MintTaskRecord::find(database.clone(), healthy.to_hex())?
        .expect("task must be created")
        .info()?;

    assert_eq!(task.mint_id, 0);

    // Repaired record is picked up by the next poll.
    ledger.repair_coin(&broken);

    let report = watcher.poll().await?;

    assert_eq!(report.failed, 0);
    assert_eq!(report.created, 1);
    assert_eq!(report.known, 1);

    Ok(())
}

#[tokio::test]
async fn test_reported_coins_are_forgotten() -> anyhow::Result<()> {
    use std::sync::Arc;

    use crate::rpc::mock::MockLedger;

    let ledger = Arc::new(MockLedger::default());
    let database = Database::open_in_memory()?;

    let watcher = test_watcher(ledger.clone(), database.clone(), 1000);

    ledger.deposit(Bytes32([0x01; 32]), Bytes32([0xee; 32]), 10);
    ledger.deposit(Bytes32([0x02; 32]), Bytes32([0xee; 32]), 20);

    assert_eq!(watcher.poll().await?.below_price, 2);
    assert_eq!(watcher.reported.lock().len(), 2);

    let spent = ledger.spend_first();

    assert_eq!(watcher.poll().await?.below_price, 1);

    let reported = watcher.reported.lock();

    assert_eq!(reported.len(), 1);
    assert!(!reported.contains(&spent));

    Ok(())
}
