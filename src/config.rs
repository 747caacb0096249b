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

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::{Serialize, Deserialize};

use minft_protocol::prelude::*;
use minft_protocol::types::address::MAINNET_PREFIX;

use crate::backoff::BackoffConfig;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub deposits: DepositsConfig,
    pub payouts: PayoutsConfig,
    pub collection: CollectionSettings,

    /// Settings passed to the wallet with every mint request.
    pub mint: CollectionConfig,

    pub rpc: RpcConfig,
    pub storage: StorageConfig,

    #[serde(default)]
    pub backoff: BackoffConfig
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositsConfig {
    /// Address which receives payments for mints.
    pub receive_address: String,

    /// Minimal accepted deposit amount in mojos.
    pub price: u64,

    /// Prefix used to encode delivery addresses.
    #[serde(default = "DepositsConfig::default_address_prefix")]
    pub address_prefix: String,

    /// Ledger polling interval in seconds.
    #[serde(default = "DepositsConfig::default_poll_interval")]
    pub poll_interval: u64
}

impl DepositsConfig {
    fn default_address_prefix() -> String {
        MAINNET_PREFIX.to_string()
    }

    const fn default_poll_interval() -> u64 {
        30
    }

    #[inline]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayoutsConfig {
    /// Id of the standard wallet paying the minting fees.
    #[serde(default = "PayoutsConfig::default_standard_wallet_id")]
    pub standard_wallet_id: u32,

    /// Wallet polling interval in seconds.
    #[serde(default = "PayoutsConfig::default_poll_interval")]
    pub poll_interval: u64
}

impl PayoutsConfig {
    const fn default_standard_wallet_id() -> u32 {
        1
    }

    const fn default_poll_interval() -> u64 {
        10
    }

    #[inline]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionSettings {
    /// Unique identifier of the collection.
    pub id: String,

    pub name: String,

    #[serde(default)]
    pub description: String,

    /// Total amount of editions in the collection.
    pub size: u64,

    /// Folder with artifacts named `<mint_id>.<image_extension>`.
    pub images_folder: PathBuf,

    #[serde(default = "CollectionSettings::default_image_extension")]
    pub image_extension: String,

    /// Optional folder with prepared `<mint_id>.json` metadata documents.
    /// Documents are generated when unset or when the file is missing.
    #[serde(default)]
    pub metadata_folder: Option<PathBuf>,

    /// Artifacts smaller than this amount of bytes are rejected.
    #[serde(default = "CollectionSettings::default_min_image_size")]
    pub min_image_size: u64
}

impl CollectionSettings {
    fn default_image_extension() -> String {
        String::from("png")
    }

    const fn default_min_image_size() -> u64 {
        10_000
    }

    #[inline]
    pub fn info(&self) -> CollectionInfo {
        CollectionInfo {
            id: self.id.clone(),
            name: self.name.clone(),
            attributes: vec![]
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcConfig {
    #[serde(default = "RpcConfig::default_full_node_url")]
    pub full_node_url: String,

    #[serde(default = "RpcConfig::default_wallet_url")]
    pub wallet_url: String,

    /// Path to the private daemon TLS certificate (PEM).
    pub certificate: PathBuf,

    /// Path to the private daemon TLS key (PEM).
    pub private_key: PathBuf,

    /// Timeout of a single request in seconds.
    #[serde(default = "RpcConfig::default_timeout")]
    pub timeout: u64
}

impl RpcConfig {
    fn default_full_node_url() -> String {
        String::from("https://localhost:8555")
    }

    fn default_wallet_url() -> String {
        String::from("https://localhost:9256")
    }

    const fn default_timeout() -> u64 {
        60
    }

    #[inline]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "StorageConfig::default_api_url")]
    pub api_url: String,

    /// Retrieval URL template. `{cid}` is replaced by the content id.
    #[serde(default = "StorageConfig::default_gateway_url")]
    pub gateway_url: String,

    pub api_key: String,

    /// Timeout of a single upload in seconds.
    #[serde(default = "StorageConfig::default_timeout")]
    pub timeout: u64
}

impl StorageConfig {
    fn default_api_url() -> String {
        String::from("https://api.nft.storage")
    }

    fn default_gateway_url() -> String {
        String::from("https://{cid}.ipfs.nftstorage.link/")
    }

    const fn default_timeout() -> u64 {
        120
    }

    #[inline]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }
}

impl Config {
    /// Read config file from the given path and validate it.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();

        let config = std::fs::read(path)
            .with_context(|| format!("failed to read config file {path:?}"))?;

        let config = serde_json::from_slice::<Self>(&config)
            .with_context(|| format!("failed to parse config file {path:?}"))?;

        config.validate()?;

        Ok(config)
    }

    /// Write config file to the given path.
    pub fn save(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        std::fs::write(path, serde_json::to_vec_pretty(self)?)?;

        Ok(())
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        Address::decode_with_prefix(
            &self.deposits.receive_address,
            &self.deposits.address_prefix
        ).context("invalid receive address")?;

        Address::decode_with_prefix(
            &self.mint.royalty_address,
            &self.deposits.address_prefix
        ).context("invalid royalty address")?;

        if self.deposits.price == 0 {
            anyhow::bail!("deposit price must be positive");
        }

        if self.collection.size == 0 {
            anyhow::bail!("collection size must be positive");
        }

        if self.mint.royalty_percentage > 10_000 {
            anyhow::bail!("royalty percentage is set in basis points and cannot exceed 10000");
        }

        if !self.storage.gateway_url.contains("{cid}") {
            anyhow::bail!("storage gateway url must contain {{cid}} placeholder");
        }

        Ok(())
    }

    /// Config template written by `minft config init`.
    pub fn example(data_folder: impl AsRef<Path>) -> Self {
        let data_folder = data_folder.as_ref();

        Self {
            deposits: DepositsConfig {
                receive_address: String::from("xch1qnpxe232hr40hl0kgw5n6tqsldyy68tdlc7zfxx88aw3uz026wlsjk9xs2"),
                price: 1_000_000_000,
                address_prefix: DepositsConfig::default_address_prefix(),
                poll_interval: DepositsConfig::default_poll_interval()
            },

            payouts: PayoutsConfig {
                standard_wallet_id: PayoutsConfig::default_standard_wallet_id(),
                poll_interval: PayoutsConfig::default_poll_interval()
            },

            collection: CollectionSettings {
                id: String::new(),
                name: String::from("My collection"),
                description: String::new(),
                size: 100,
                images_folder: data_folder.join("images"),
                image_extension: CollectionSettings::default_image_extension(),
                metadata_folder: None,
                min_image_size: CollectionSettings::default_min_image_size()
            },

            mint: CollectionConfig {
                nft_wallet_id: 2,
                royalty_address: String::from("xch16dnl4tzef59ahmum8cm65es8kxslpgacey2prxdwh44ha6dj6lnsazm4ne"),
                royalty_percentage: 500,
                fee: 10_000_000,
                license_hash: String::new(),
                license_url: String::new(),
                did_id: String::new()
            },

            rpc: RpcConfig {
                full_node_url: RpcConfig::default_full_node_url(),
                wallet_url: RpcConfig::default_wallet_url(),
                certificate: data_folder.join("private_daemon.crt"),
                private_key: data_folder.join("private_daemon.key"),
                timeout: RpcConfig::default_timeout()
            },

            storage: StorageConfig {
                api_url: StorageConfig::default_api_url(),
                gateway_url: StorageConfig::default_gateway_url(),
                api_key: String::new(),
                timeout: StorageConfig::default_timeout()
            },

            backoff: BackoffConfig::default()
        }
    }
}

#[test]
fn test_defaults() -> anyhow::Result<()> {
    let config = serde_json::from_value::<Config>(serde_json::json!({
        "deposits": {
            "receive_address": "xch1qnpxe232hr40hl0kgw5n6tqsldyy68tdlc7zfxx88aw3uz026wlsjk9xs2",
            "price": 100
        },
        "payouts": {},
        "collection": {
            "id": "flowers",
            "name": "Flowers",
            "size": 10,
            "images_folder": "/tmp/images"
        },
        "mint": {
            "nft_wallet_id": 2,
            "royalty_address": "xch16dnl4tzef59ahmum8cm65es8kxslpgacey2prxdwh44ha6dj6lnsazm4ne",
            "royalty_percentage": 500,
            "fee": 1,
            "license_hash": "",
            "license_url": "",
            "did_id": ""
        },
        "rpc": {
            "certificate": "daemon.crt",
            "private_key": "daemon.key"
        },
        "storage": {
            "api_key": "secret"
        }
    }))?;

    config.validate()?;

    assert_eq!(config.deposits.poll_interval(), Duration::from_secs(30));
    assert_eq!(config.deposits.address_prefix, "xch");
    assert_eq!(config.payouts.standard_wallet_id, 1);
    assert_eq!(config.payouts.poll_interval(), Duration::from_secs(10));
    assert_eq!(config.collection.min_image_size, 10_000);
    assert_eq!(config.collection.image_extension, "png");
    assert_eq!(config.storage.gateway_url, "https://{cid}.ipfs.nftstorage.link/");
    assert_eq!(config.backoff, BackoffConfig::default());

    Ok(())
}

#[test]
fn test_validate() {
    let mut config = Config::example("/tmp/minft");

    assert!(config.validate().is_ok());

    config.deposits.address_prefix = String::from("txch");

    assert!(config.validate().is_err());

    let mut config = Config::example("/tmp/minft");

    config.collection.size = 0;

    assert!(config.validate().is_err());

    let mut config = Config::example("/tmp/minft");

    config.storage.gateway_url = String::from("https://ipfs.io/ipfs/");

    assert!(config.validate().is_err());
}
