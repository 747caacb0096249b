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
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use minft_protocol::prelude::*;

pub mod consts;
pub mod utils;
pub mod backoff;
pub mod config;
pub mod database;
pub mod rpc;
pub mod publisher;
pub mod invoker;
pub mod watcher;
pub mod scheduler;

use config::Config;
use database::Database;
use database::task::{MintTaskRecord, MintTaskInfo};

#[derive(Parser)]
#[command(version)]
struct Cli {
    /// Path to the config file. Defaults to `config.json` in the data
    /// folder.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command
}

#[derive(Subcommand)]
enum Command {
    /// Watch deposits and mint assets until interrupted.
    Run,

    /// Config file management.
    Config {
        #[command(subcommand)]
        command: ConfigCommand
    },

    /// Inspect and repair mint tasks.
    Task {
        #[command(subcommand)]
        command: TaskCommand
    },

    /// Address conversion tools.
    Address {
        #[command(subcommand)]
        command: AddressCommand
    }
}

impl Command {
    pub async fn run(self, config_path: PathBuf) -> anyhow::Result<()> {
        match self {
            Self::Run => run(config_path).await,
            Self::Config { command } => command.run(config_path),
            Self::Task { command } => command.run(),
            Self::Address { command } => command.run()
        }
    }
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Write config template.
    Init {
        /// Overwrite existing config file.
        #[arg(long)]
        force: bool
    },

    /// Load and validate config file.
    Check
}

impl ConfigCommand {
    pub fn run(self, path: PathBuf) -> anyhow::Result<()> {
        match self {
            Self::Init { force } => {
                if path.exists() && !force {
                    anyhow::bail!("config file {path:?} already exists, use --force to overwrite it");
                }

                Config::example(consts::DATA_FOLDER.as_path()).save(&path)
                    .with_context(|| format!("failed to write config file {path:?}"))?;

                println!("config template written to {path:?}");
            }

            Self::Check => {
                let config = Config::load(&path)?;

                println!("config file {path:?} is valid");
                println!("collection: {} ({} editions)", config.collection.name, config.collection.size);
                println!("receive address: {}", config.deposits.receive_address);
                println!("price: {} mojos", config.deposits.price);
            }
        }

        Ok(())
    }
}

#[derive(Subcommand)]
enum TaskCommand {
    /// List mint tasks in mint id order.
    List {
        /// Show only tasks with this status.
        #[arg(long)]
        status: Option<MintTaskStatus>
    },

    /// Show details of a task.
    Show {
        mint_id: u64
    },

    /// Move failed task back to the pending queue.
    ///
    /// Check the wallet first: a task failed during reconciliation may
    /// have been minted anyway.
    Retry {
        mint_id: u64
    },

    /// Override the artifact of a task. Resets the override when path is
    /// not specified.
    SetImage {
        mint_id: u64,
        path: Option<PathBuf>
    }
}

fn open_database() -> anyhow::Result<Database> {
    Database::open(consts::DATABASE_PATH.as_path())
        .context("failed to open minft database")
}

fn find_task(database: &Database, mint_id: u64) -> anyhow::Result<MintTaskRecord> {
    MintTaskRecord::find_by_mint_id(database.clone(), mint_id)?
        .ok_or_else(|| anyhow::anyhow!("task with mint id {mint_id} doesn't exist"))
}

fn print_task(info: &MintTaskInfo) {
    println!("mint id:    {}", info.mint_id);
    println!("status:     {}", info.status);
    println!("parent id:  {}", info.parent_id);
    println!("to address: {}", info.to_address);
    println!("created at: {}", info.created_at);
    println!("updated at: {}", info.updated_at);

    if let Some(path) = &info.mint_image_url {
        println!("artifact:   {path}");
    }

    if let Some(image) = &info.image {
        println!("image:      {} ({})", image.url, image.hash);
    }

    if let Some(metadata) = &info.metadata {
        println!("metadata:   {} ({})", metadata.url, metadata.hash);
    }
}

impl TaskCommand {
    pub fn run(self) -> anyhow::Result<()> {
        let database = open_database()?;

        match self {
            Self::List { status } => {
                let tasks = match status {
                    Some(status) => MintTaskRecord::by_status(database.clone(), status)?,
                    None => MintTaskRecord::all(database.clone())?
                };

                if let Some(mint_id) = database.sold_out_at()? {
                    println!("collection sold out at mint id {mint_id}");
                }

                for task in tasks {
                    let info = task.info()?;

                    println!(
                        "{:>6}  {:<8}  {}  {}",
                        info.mint_id,
                        info.status,
                        info.parent_id,
                        info.to_address
                    );
                }
            }

            Self::Show { mint_id } => print_task(&find_task(&database, mint_id)?.info()?),

            Self::Retry { mint_id } => {
                let mut task = find_task(&database, mint_id)?;

                if !task.retry()? {
                    let status = task.status()?;

                    if status.is_terminal() {
                        anyhow::bail!("task {mint_id} is already minted");
                    }

                    anyhow::bail!("task {mint_id} is {status}, only failed tasks can be retried");
                }

                tracing::info!(mint_id, "task moved back to pending queue");
            }

            Self::SetImage { mint_id, path } => {
                let mut task = find_task(&database, mint_id)?;

                let path = match path {
                    Some(path) => {
                        let path = std::fs::canonicalize(&path)
                            .with_context(|| format!("failed to resolve artifact path {path:?}"))?;

                        Some(path.to_string_lossy().to_string())
                    }

                    None => None
                };

                if !task.status()?.is_retry_eligible() || !task.set_mint_image_url(path.as_deref())? {
                    anyhow::bail!("task {mint_id} is {}, only pending or failed tasks can be changed", task.status()?);
                }

                tracing::info!(mint_id, path = ?path, "task artifact updated");
            }
        }

        Ok(())
    }
}

#[derive(Subcommand)]
enum AddressCommand {
    /// Print puzzle hash of the address.
    Decode {
        address: String
    },

    /// Encode puzzle hash as an address.
    Encode {
        puzzle_hash: Bytes32,

        #[arg(long, default_value = minft_protocol::types::address::MAINNET_PREFIX)]
        prefix: String
    }
}

impl AddressCommand {
    pub fn run(self) -> anyhow::Result<()> {
        match self {
            Self::Decode { address } => {
                let address = Address::decode(&address)?;

                println!("0x{}", address.puzzle_hash().to_hex());
            }

            Self::Encode { puzzle_hash, prefix } => {
                println!("{}", Address::new(prefix, puzzle_hash).encode()?);
            }
        }

        Ok(())
    }
}

async fn run(config_path: PathBuf) -> anyhow::Result<()> {
    let config = Config::load(&config_path)?;

    let database = open_database()?;

    let rpc_client = |url: &str| rpc::http::RpcClient::new(
        url,
        &config.rpc.certificate,
        &config.rpc.private_key,
        config.rpc.timeout()
    );

    let full_node = rpc::full_node::FullNodeClient::new(rpc_client(&config.rpc.full_node_url)?);
    let wallet = rpc::wallet::WalletClient::new(rpc_client(&config.rpc.wallet_url)?);

    let storage = rpc::nft_storage::NftStorageClient::new(
        &config.storage.api_url,
        &config.storage.api_key,
        config.storage.timeout()
    )?;

    let receive_address = Address::decode_with_prefix(
        &config.deposits.receive_address,
        &config.deposits.address_prefix
    )?;

    let watcher = watcher::DepositWatcher::new(
        Arc::new(full_node),
        database.clone(),
        watcher::DepositWatcherConfig {
            receive_address,
            price: config.deposits.price,
            address_prefix: config.deposits.address_prefix.clone(),
            poll_interval: config.deposits.poll_interval(),
            backoff: config.backoff.build()
        }
    );

    let mut scheduler = scheduler::PayoutScheduler::new(
        database,
        publisher::ContentPublisher::new(storage, &config.storage.gateway_url),
        invoker::MintInvoker::new(wallet, config.mint.clone()),
        scheduler::PayoutSchedulerConfig {
            standard_wallet_id: config.payouts.standard_wallet_id,
            collection: config.collection.clone(),
            poll_interval: config.payouts.poll_interval(),
            backoff: config.backoff.build()
        }
    );

    let (shutdown_sender, shutdown) = utils::shutdown_channel();

    tracing::info!(
        config = ?config_path,
        collection = %config.collection.name,
        "starting minft"
    );

    tokio::join!(
        watcher.run(shutdown.clone()),
        scheduler.run(shutdown),
        async move {
            if let Err(err) = utils::wait_termination_signal().await {
                tracing::error!(error = %err, "failed to listen for termination signals");

                return std::future::pending::<()>().await;
            }

            tracing::info!("finishing current iterations");

            let _ = shutdown_sender.send(true);
        }
    );

    Ok(())
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info"))
        )
        .init();

    std::fs::create_dir_all(consts::DATA_FOLDER.as_path())
        .map_err(|err| {
            anyhow::anyhow!(err)
                .context("failed to create minft data folder")
        })?;

    let cli = Cli::parse();

    let config_path = cli.config
        .unwrap_or_else(|| consts::CONFIG_PATH.clone());

    cli.command.run(config_path).await
}
