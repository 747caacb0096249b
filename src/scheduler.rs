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

use std::path::PathBuf;
use std::time::Duration;

use tokio::sync::watch;

use minft_protocol::prelude::*;

use crate::backoff::Backoff;
use crate::config::CollectionSettings;
use crate::database::Database;
use crate::database::task::{MintTaskRecord, MintTaskInfo};
use crate::invoker::{MintInvoker, MintError};
use crate::publisher::{ContentPublisher, PublishError};
use crate::rpc::{Wallet, Pinning, RpcError};
use crate::utils::sleep_or_shutdown;

#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("failed to query wallet balance: {0}")]
    Wallet(#[from] RpcError),

    #[error(transparent)]
    Database(#[from] rusqlite::Error),

    #[error("task {mint_id} is stuck in minting status and requires manual reconciliation")]
    Consistency {
        mint_id: u64
    }
}

/// Artifact of the task can't be minted.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("artifact {0:?} doesn't exist")]
    MissingImage(PathBuf),

    #[error("artifact {path:?} is too small: {size} bytes, expected at least {min_size}")]
    ImageTooSmall {
        path: PathBuf,
        size: u64,
        min_size: u64
    },

    #[error("failed to read artifact {path:?}: {source}")]
    Io {
        path: PathBuf,

        #[source]
        source: std::io::Error
    }
}

/// Failure of a started mint attempt. Always moves the task to failed.
#[derive(Debug, thiserror::Error)]
pub enum AttemptError {
    #[error("failed to publish artifact: {0}")]
    Image(#[source] PublishError),

    #[error("failed to read metadata document {path:?}: {source}")]
    MetadataRead {
        path: PathBuf,

        #[source]
        source: std::io::Error
    },

    #[error("failed to build metadata document: {0}")]
    MetadataBuild(#[from] serde_json::Error),

    #[error("failed to publish metadata document: {0}")]
    Metadata(#[source] PublishError),

    #[error(transparent)]
    Mint(#[from] MintError),

    #[error("failed to record published content: {0}")]
    Database(#[from] rusqlite::Error)
}

impl AttemptError {
    /// Name of the step where the attempt failed.
    pub const fn stage(&self) -> &'static str {
        match self {
            Self::Image(_) => "publish_image",

            Self::MetadataRead { .. }
            | Self::MetadataBuild(_) => "build_metadata",

            Self::Metadata(_) => "publish_metadata",
            Self::Mint(_) => "mint",
            Self::Database(_) => "record_content"
        }
    }

    /// Check if the attempt failed because of a temporary service outage.
    pub const fn is_transient(&self) -> bool {
        match self {
            Self::Image(err) | Self::Metadata(err) => err.is_transient(),
            Self::Mint(MintError::Wallet(err)) => err.is_transient(),

            _ => false
        }
    }
}

/// What happened during a single scheduler tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// Collection is fully minted, nothing will be dispatched anymore.
    SoldOut,

    /// Wallet has pending activity or no funds.
    Unsettled(Balance),

    /// No pending tasks.
    Idle,

    /// Artifact of the oldest pending task is invalid. The task stays
    /// pending.
    Invalid {
        mint_id: u64
    },

    /// Task was claimed by another scheduler sharing the database.
    Contended {
        mint_id: u64
    },

    Minted {
        mint_id: u64,
        nft_id: Option<String>
    },

    Failed {
        mint_id: u64
    }
}

#[derive(Debug, Clone)]
pub struct PayoutSchedulerConfig {
    /// Id of the wallet which must be settled before minting.
    pub standard_wallet_id: u32,

    pub collection: CollectionSettings,

    pub poll_interval: Duration,
    pub backoff: Backoff
}

/// Dispatches pending mint tasks one at a time, in mint id order.
pub struct PayoutScheduler<W, P> {
    database: Database,
    publisher: ContentPublisher<P>,
    invoker: MintInvoker<W>,
    config: PayoutSchedulerConfig,

    /// Terminal status of the last attempt which failed to be written.
    /// Nothing is dispatched until it's recorded.
    unrecorded: Option<(MintTaskRecord, MintTaskStatus)>
}

impl<W: Wallet, P: Pinning> PayoutScheduler<W, P> {
    pub fn new(
        database: Database,
        publisher: ContentPublisher<P>,
        invoker: MintInvoker<W>,
        config: PayoutSchedulerConfig
    ) -> Self {
        Self {
            database,
            publisher,
            invoker,
            config,
            unrecorded: None
        }
    }

    /// Mark tasks left in minting status by a previous run as failed.
    /// Return their mint ids.
    pub fn reconcile(&self) -> rusqlite::Result<Vec<u64>> {
        let stranded = MintTaskRecord::fail_stranded(self.database.clone())?;

        let mut mint_ids = Vec::with_capacity(stranded.len());

        for task in stranded {
            let info = task.info()?;

            tracing::error!(
                mint_id = info.mint_id,
                parent_id = %info.parent_id,
                to_address = %info.to_address,
                stage = "reconcile",
                "task was left in minting status, marked as failed; check the wallet before retrying it"
            );

            mint_ids.push(info.mint_id);
        }

        Ok(mint_ids)
    }

    /// Path to the artifact of the task.
    pub fn image_path(&self, info: &MintTaskInfo) -> PathBuf {
        match info.mint_image_url.as_deref() {
            Some(path) if !path.trim().is_empty() => PathBuf::from(path),

            _ => self.config.collection.images_folder.join(format!(
                "{}.{}",
                info.mint_id,
                self.config.collection.image_extension
            ))
        }
    }

    async fn load_image(&self, info: &MintTaskInfo) -> Result<Vec<u8>, ValidationError> {
        let path = self.image_path(info);

        let image = match tokio::fs::read(&path).await {
            Ok(image) => image,

            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(ValidationError::MissingImage(path));
            }

            Err(source) => return Err(ValidationError::Io { path, source })
        };

        let size = image.len() as u64;

        if size < self.config.collection.min_image_size {
            return Err(ValidationError::ImageTooSmall {
                path,
                size,
                min_size: self.config.collection.min_image_size
            });
        }

        Ok(image)
    }

    async fn load_metadata(&self, info: &MintTaskInfo) -> Result<Vec<u8>, AttemptError> {
        if let Some(folder) = &self.config.collection.metadata_folder {
            let path = folder.join(format!("{}.json", info.mint_id));

            match tokio::fs::read(&path).await {
                Ok(metadata) => return Ok(metadata),
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => (),
                Err(source) => return Err(AttemptError::MetadataRead { path, source })
            }
        }

        let metadata = Chip0007Metadata::new(
            self.config.collection.info(),
            &self.config.collection.description,
            info.mint_id,
            self.config.collection.size
        );

        Ok(metadata.to_bytes()?)
    }

    /// Publish content and mint the asset. Content published by previous
    /// attempts is reused if its hash still matches.
    async fn attempt(
        &self,
        task: &mut MintTaskRecord,
        info: &MintTaskInfo,
        image: Vec<u8>
    ) -> Result<MintResult, AttemptError> {
        let image_hash = ContentHash::digest(&image);

        let image = match &info.image {
            Some(published) if published.hash == image_hash => {
                tracing::debug!(mint_id = info.mint_id, cid = %published.cid, "reusing published artifact");

                published.clone()
            }

            _ => {
                let published = self.publisher.store(image).await
                    .map_err(AttemptError::Image)?;

                task.record_image(&published)?;

                tracing::info!(mint_id = info.mint_id, cid = %published.cid, "artifact published");

                published
            }
        };

        let metadata = self.load_metadata(info).await?;
        let metadata_hash = ContentHash::digest(&metadata);

        let metadata = match &info.metadata {
            Some(published) if published.hash == metadata_hash => {
                tracing::debug!(mint_id = info.mint_id, cid = %published.cid, "reusing published metadata");

                published.clone()
            }

            _ => {
                let published = self.publisher.store(metadata).await
                    .map_err(AttemptError::Metadata)?;

                task.record_metadata(&published)?;

                tracing::info!(mint_id = info.mint_id, cid = %published.cid, "metadata published");

                published
            }
        };

        let result = self.invoker.mint(&MintRequest {
            to_address: info.to_address.clone(),
            image_hash: image.hash,
            image_url: image.url,
            metadata_hash: metadata.hash,
            metadata_url: metadata.url,
            edition_number: info.mint_id + 1,
            edition_total: self.config.collection.size
        }).await?;

        Ok(result)
    }

    fn record_unrecorded(&mut self) -> rusqlite::Result<()> {
        if let Some((mut task, status)) = self.unrecorded.take() {
            if let Err(err) = task.update_status(status).map(|_| ()) {
                self.unrecorded = Some((task, status));

                return Err(err);
            }

            tracing::info!(task_id = task.id(), %status, "recorded delayed task status");
        }

        Ok(())
    }

    /// Dispatch at most one pending task.
    pub async fn tick(&mut self) -> Result<TickOutcome, SchedulerError> {
        self.record_unrecorded()?;

        if self.database.is_sold_out()? {
            return Ok(TickOutcome::SoldOut);
        }

        // Never start a new attempt while another one is not resolved.
        let minting = MintTaskRecord::by_status(self.database.clone(), MintTaskStatus::Minting)?;

        if let Some(task) = minting.first() {
            return Err(SchedulerError::Consistency {
                mint_id: task.mint_id()?
            });
        }

        let balance = self.invoker.wallet()
            .balance(self.config.standard_wallet_id)
            .await?;

        if !balance.is_settled() {
            tracing::debug!(
                spendable = balance.spendable,
                confirmed = balance.confirmed,
                "wallet balance is not settled, skipping tick"
            );

            return Ok(TickOutcome::Unsettled(balance));
        }

        let pending = MintTaskRecord::pending(self.database.clone())?;
        let queued = pending.len();

        let Some(mut task) = pending.into_iter().next() else {
            return Ok(TickOutcome::Idle);
        };

        let info = task.info()?;
        let mint_id = info.mint_id;

        if mint_id + 1 >= self.config.collection.size {
            self.database.mark_sold_out(mint_id)?;

            tracing::warn!(
                mint_id,
                parent_id = %info.parent_id,
                collection_size = self.config.collection.size,
                "collection is fully minted, minting is disabled"
            );

            return Ok(TickOutcome::SoldOut);
        }

        let image = match self.load_image(&info).await {
            Ok(image) => image,

            Err(err) => {
                tracing::error!(
                    mint_id,
                    parent_id = %info.parent_id,
                    stage = "validation",
                    error = %err,
                    "invalid artifact, task stays pending"
                );

                return Ok(TickOutcome::Invalid { mint_id });
            }
        };

        tracing::info!(
            mint_id,
            parent_id = %info.parent_id,
            to_address = %info.to_address,
            queued,
            "dispatching mint task"
        );

        if !task.claim()? {
            tracing::warn!(
                mint_id,
                parent_id = %info.parent_id,
                "task was claimed by another scheduler, skipping tick"
            );

            return Ok(TickOutcome::Contended { mint_id });
        }

        let (status, outcome) = match self.attempt(&mut task, &info, image).await {
            Ok(result) => {
                tracing::info!(
                    mint_id,
                    parent_id = %info.parent_id,
                    nft_id = ?result.nft_id,
                    "task minted"
                );

                (MintTaskStatus::Minted, TickOutcome::Minted {
                    mint_id,
                    nft_id: result.nft_id
                })
            }

            Err(err) => {
                tracing::error!(
                    mint_id,
                    parent_id = %info.parent_id,
                    stage = err.stage(),
                    transient = err.is_transient(),
                    error = %err,
                    "mint attempt failed, task requires retry"
                );

                (MintTaskStatus::Failed, TickOutcome::Failed { mint_id })
            }
        };

        if let Err(err) = task.update_status(status).map(|_| ()) {
            tracing::error!(
                mint_id,
                parent_id = %info.parent_id,
                %status,
                error = %err,
                "failed to record task status"
            );

            self.unrecorded = Some((task, status));

            return Err(err.into());
        }

        Ok(outcome)
    }

    /// Dispatch tasks until shutdown is requested.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) {
        if let Err(err) = self.reconcile() {
            tracing::error!(error = %err, "failed to reconcile stranded tasks");
        }

        let mut backoff = self.config.backoff;
        let mut sold_out_reported = false;

        tracing::info!(
            collection_size = self.config.collection.size,
            "starting payout scheduler"
        );

        loop {
            let delay = match self.tick().await {
                Ok(outcome) => {
                    backoff.reset();

                    if outcome == TickOutcome::SoldOut && !sold_out_reported {
                        sold_out_reported = true;

                        tracing::info!(
                            sold_out_at = ?self.database.sold_out_at().ok().flatten(),
                            "collection is sold out, no tasks will be dispatched"
                        );
                    }

                    self.config.poll_interval
                }

                Err(err) => {
                    let delay = backoff.next_delay();

                    tracing::warn!(
                        error = %err,
                        failures = backoff.failures(),
                        retry_in = ?delay,
                        "payout tick failed"
                    );

                    delay
                }
            };

            if sleep_or_shutdown(&mut shutdown, delay).await {
                break;
            }
        }

        tracing::info!("payout scheduler stopped");
    }
}

#[cfg(test)]
type TestScheduler = PayoutScheduler<
    std::sync::Arc<crate::rpc::mock::MockWallet>,
    std::sync::Arc<crate::rpc::mock::MockPinning>
>;

#[cfg(test)]
struct TestEnv {
    database: Database,
    wallet: std::sync::Arc<crate::rpc::mock::MockWallet>,
    pinning: std::sync::Arc<crate::rpc::mock::MockPinning>,
    images: tempfile::TempDir,
    size: u64
}

#[cfg(test)]
impl TestEnv {
    fn new(size: u64) -> anyhow::Result<Self> {
        Self::with_database(size, Database::open_in_memory()?)
    }

    fn with_database(size: u64, database: Database) -> anyhow::Result<Self> {
        use crate::rpc::mock::{MockWallet, MockPinning};

        Ok(Self {
            database,
            wallet: std::sync::Arc::new(MockWallet::with_balance(10, 10)),
            pinning: std::sync::Arc::new(MockPinning::default()),
            images: tempfile::tempdir()?,
            size
        })
    }

    fn scheduler(&self) -> TestScheduler {
        self.scheduler_on(self.database.clone())
    }

    fn scheduler_on(&self, database: Database) -> TestScheduler {
        let collection = CollectionSettings {
            id: String::from("f5dd5a9c-7a3c-4f8a-9d0c-3b8d1c2a4e6f"),
            name: String::from("Flowers"),
            description: String::from("Hand drawn flowers"),
            size: self.size,
            images_folder: self.images.path().to_path_buf(),
            image_extension: String::from("png"),
            metadata_folder: None,
            min_image_size: 10_000
        };

        let mint = CollectionConfig {
            nft_wallet_id: 3,
            royalty_address: Address::new("xch", Bytes32([0xaa; 32])).encode().unwrap(),
            royalty_percentage: 500,
            fee: 0,
            license_hash: String::new(),
            license_url: String::new(),
            did_id: String::new()
        };

        PayoutScheduler::new(
            database,
            ContentPublisher::new(self.pinning.clone(), "https://{cid}.ipfs.nftstorage.link/"),
            MintInvoker::new(self.wallet.clone(), mint),
            PayoutSchedulerConfig {
                standard_wallet_id: 1,
                collection,
                poll_interval: Duration::from_millis(10),
                backoff: Backoff::new(Duration::from_millis(1), Duration::from_millis(10))
            }
        )
    }

    /// Create pending task with a valid artifact.
    fn add_task(&self, parent_id: &str) -> anyhow::Result<MintTaskRecord> {
        let task = MintTaskRecord::create_if_absent(
            self.database.clone(),
            parent_id,
            Address::new("xch", Bytes32([0x01; 32])).encode()?
        )?;

        let mint_id = task.mint_id()?;

        std::fs::write(
            self.images.path().join(format!("{mint_id}.png")),
            vec![mint_id as u8; 12_000]
        )?;

        Ok(task)
    }
}

#[tokio::test]
async fn test_unsettled_balance() -> anyhow::Result<()> {
    let env = TestEnv::new(10)?;
    let mut scheduler = env.scheduler();

    let task = env.add_task("p0")?;

    *env.wallet.balance.lock().unwrap() = Balance { spendable: 5, confirmed: 10 };

    assert_eq!(scheduler.tick().await?, TickOutcome::Unsettled(Balance {
        spendable: 5,
        confirmed: 10
    }));

    assert_eq!(task.status()?, MintTaskStatus::Pending);
    assert_eq!(env.pinning.uploads(), 0);
    assert!(env.wallet.minted().is_empty());

    Ok(())
}

#[tokio::test]
async fn test_idle() -> anyhow::Result<()> {
    let env = TestEnv::new(10)?;

    assert_eq!(env.scheduler().tick().await?, TickOutcome::Idle);

    Ok(())
}

#[tokio::test]
async fn test_mint_success() -> anyhow::Result<()> {
    let env = TestEnv::new(10)?;
    let mut scheduler = env.scheduler();

    let task = env.add_task("p0")?;

    assert_eq!(scheduler.tick().await?, TickOutcome::Minted {
        mint_id: 0,
        nft_id: Some(String::from("nft1mock1"))
    });

    let info = task.info()?;

    assert_eq!(info.status, MintTaskStatus::Minted);
    assert_eq!(env.pinning.uploads(), 2);

    let image = info.image.expect("artifact must be recorded");
    let metadata = info.metadata.expect("metadata must be recorded");

    assert_eq!(image.hash, ContentHash::digest(vec![0u8; 12_000]));
    assert_eq!(image.url, format!("https://{}.ipfs.nftstorage.link/", image.cid));

    let minted = env.wallet.minted();

    assert_eq!(minted.len(), 1);
    assert_eq!(minted[0].target_address, info.to_address);
    assert_eq!(minted[0].hash, image.hash.to_hex());
    assert_eq!(minted[0].uris, vec![image.url]);
    assert_eq!(minted[0].meta_hash, metadata.hash.to_hex());
    assert_eq!(minted[0].edition_number, 1);
    assert_eq!(minted[0].edition_total, 10);

    let document: serde_json::Value = serde_json::from_slice(&env.pinning.stored.lock().unwrap()[1])?;

    assert_eq!(document["name"], "Flowers #1");
    assert_eq!(document["series_number"], 1);
    assert_eq!(document["series_total"], 10);

    // Nothing left to do.
    assert_eq!(scheduler.tick().await?, TickOutcome::Idle);

    Ok(())
}

#[tokio::test]
async fn test_image_upload_failure() -> anyhow::Result<()> {
    use std::sync::atomic::Ordering;

    let env = TestEnv::new(10)?;
    let mut scheduler = env.scheduler();

    let task = env.add_task("p0")?;

    env.pinning.reject.store(true, Ordering::SeqCst);

    assert_eq!(scheduler.tick().await?, TickOutcome::Failed { mint_id: 0 });

    let info = task.info()?;

    assert_eq!(info.status, MintTaskStatus::Failed);
    assert_eq!(info.image, None);
    assert_eq!(info.metadata, None);
    assert_eq!(env.pinning.uploads(), 0);
    assert!(env.wallet.minted().is_empty());

    // Metadata upload is never attempted after the artifact upload failed.
    assert_eq!(env.pinning.attempts(), 1);

    // Failed tasks are not picked up again without retry.
    env.pinning.reject.store(false, Ordering::SeqCst);

    assert_eq!(scheduler.tick().await?, TickOutcome::Idle);

    Ok(())
}

#[tokio::test]
async fn test_mint_failure_keeps_content() -> anyhow::Result<()> {
    use std::sync::atomic::Ordering;

    let env = TestEnv::new(10)?;
    let mut scheduler = env.scheduler();

    let mut task = env.add_task("p0")?;

    env.wallet.reject_mints.store(true, Ordering::SeqCst);

    assert_eq!(scheduler.tick().await?, TickOutcome::Failed { mint_id: 0 });

    let failed = task.info()?;

    assert_eq!(failed.status, MintTaskStatus::Failed);
    assert!(failed.image.is_some());
    assert!(failed.metadata.is_some());
    assert_eq!(env.pinning.uploads(), 2);

    env.wallet.reject_mints.store(false, Ordering::SeqCst);

    assert!(task.retry()?);

    assert!(matches!(scheduler.tick().await?, TickOutcome::Minted { mint_id: 0, .. }));

    let minted = task.info()?;

    assert_eq!(minted.status, MintTaskStatus::Minted);
    assert_eq!(minted.image, failed.image);
    assert_eq!(minted.metadata, failed.metadata);

    // Published content was reused.
    assert_eq!(env.pinning.uploads(), 2);
    assert_eq!(env.pinning.attempts(), 2);

    Ok(())
}

#[tokio::test]
async fn test_invalid_image() -> anyhow::Result<()> {
    let env = TestEnv::new(10)?;
    let mut scheduler = env.scheduler();

    let task = env.add_task("p0")?;

    std::fs::write(env.images.path().join("0.png"), [0u8; 100])?;

    assert_eq!(scheduler.tick().await?, TickOutcome::Invalid { mint_id: 0 });
    assert_eq!(task.status()?, MintTaskStatus::Pending);

    std::fs::remove_file(env.images.path().join("0.png"))?;

    assert_eq!(scheduler.tick().await?, TickOutcome::Invalid { mint_id: 0 });
    assert_eq!(task.status()?, MintTaskStatus::Pending);

    assert_eq!(env.pinning.uploads(), 0);
    assert!(env.wallet.minted().is_empty());

    Ok(())
}

#[tokio::test]
async fn test_image_override() -> anyhow::Result<()> {
    let env = TestEnv::new(10)?;
    let mut scheduler = env.scheduler();

    let mut task = env.add_task("p0")?;

    let path = env.images.path().join("custom.png");

    std::fs::write(&path, vec![0xffu8; 20_000])?;

    assert!(task.set_mint_image_url(path.to_str())?);

    assert!(matches!(scheduler.tick().await?, TickOutcome::Minted { mint_id: 0, .. }));

    assert_eq!(env.wallet.minted()[0].hash, ContentHash::digest(vec![0xffu8; 20_000]).to_hex());

    Ok(())
}

#[tokio::test]
async fn test_sold_out() -> anyhow::Result<()> {
    let env = TestEnv::new(10)?;
    let mut scheduler = env.scheduler();

    for i in 0..10 {
        let mut task = env.add_task(&format!("p{i}"))?;

        if i < 9 {
            task.update_status(MintTaskStatus::Minted)?;
        }
    }

    assert_eq!(scheduler.tick().await?, TickOutcome::SoldOut);

    assert!(env.database.is_sold_out()?);
    assert_eq!(env.database.sold_out_at()?, Some(9));

    // Late deposits are still recorded but never dispatched.
    env.add_task("p10")?;

    assert_eq!(scheduler.tick().await?, TickOutcome::SoldOut);

    // The flag survives restart.
    let mut scheduler = env.scheduler();

    assert_eq!(scheduler.tick().await?, TickOutcome::SoldOut);

    assert!(env.wallet.minted().is_empty());
    assert_eq!(env.pinning.uploads(), 0);

    let pending = MintTaskRecord::pending(env.database.clone())?;

    assert_eq!(pending.len(), 2);

    Ok(())
}

#[tokio::test]
async fn test_sequential_order() -> anyhow::Result<()> {
    let env = TestEnv::new(10)?;
    let mut scheduler = env.scheduler();

    for i in 0..3 {
        env.add_task(&format!("p{i}"))?;
    }

    for mint_id in 0..3 {
        assert!(matches!(
            scheduler.tick().await?,
            TickOutcome::Minted { mint_id: minted, .. } if minted == mint_id
        ));

        // Exactly one task per tick.
        assert_eq!(MintTaskRecord::pending(env.database.clone())?.len() as u64, 2 - mint_id);
    }

    let editions = env.wallet.minted()
        .into_iter()
        .map(|request| request.edition_number)
        .collect::<Vec<_>>();

    assert_eq!(editions, [1, 2, 3]);

    Ok(())
}

#[tokio::test]
async fn test_stranded_task() -> anyhow::Result<()> {
    let env = TestEnv::new(10)?;
    let mut scheduler = env.scheduler();

    let mut stranded = env.add_task("p0")?;
    let next = env.add_task("p1")?;

    stranded.update_status(MintTaskStatus::Minting)?;

    // Nothing is dispatched while a task is in flight.
    assert!(matches!(
        scheduler.tick().await,
        Err(SchedulerError::Consistency { mint_id: 0 })
    ));

    assert_eq!(next.status()?, MintTaskStatus::Pending);
    assert!(env.wallet.minted().is_empty());

    assert_eq!(scheduler.reconcile()?, vec![0]);
    assert_eq!(stranded.status()?, MintTaskStatus::Failed);

    assert!(matches!(scheduler.tick().await?, TickOutcome::Minted { mint_id: 1, .. }));

    Ok(())
}

#[tokio::test]
async fn test_run_until_shutdown() -> anyhow::Result<()> {
    let env = TestEnv::new(10)?;
    let mut scheduler = env.scheduler();

    let task = env.add_task("p0")?;

    env.wallet.balance_failures.store(3, std::sync::atomic::Ordering::SeqCst);

    let (sender, receiver) = crate::utils::shutdown_channel();

    let handle = tokio::spawn(async move {
        scheduler.run(receiver).await;
    });

    for _ in 0..200 {
        if task.status()? == MintTaskStatus::Minted {
            break;
        }

        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    sender.send(true)?;
    handle.await?;

    assert_eq!(task.status()?, MintTaskStatus::Minted);

    Ok(())
}

#[tokio::test]
async fn test_shared_database() -> anyhow::Result<()> {
    let folder = tempfile::tempdir()?;
    let path = folder.path().join("minft.db");

    let env = TestEnv::with_database(10, Database::open(&path)?)?;

    let mut first = env.scheduler();
    let mut second = env.scheduler_on(Database::open(&path)?);

    let mut stranded = env.add_task("p0")?;

    env.add_task("p1")?;

    // Task claimed through one connection blocks the other scheduler.
    assert!(stranded.claim()?);

    assert!(matches!(
        second.tick().await,
        Err(SchedulerError::Consistency { mint_id: 0 })
    ));

    stranded.update_status(MintTaskStatus::Failed)?;

    assert!(matches!(first.tick().await?, TickOutcome::Minted { mint_id: 1, .. }));
    assert_eq!(second.tick().await?, TickOutcome::Idle);

    let editions = env.wallet.minted()
        .into_iter()
        .map(|request| request.edition_number)
        .collect::<Vec<_>>();

    assert_eq!(editions, [2]);

    Ok(())
}
