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

use minft_protocol::prelude::*;

use crate::rpc::{Wallet, MintNftRequest, RpcError};

#[derive(Debug, thiserror::Error)]
pub enum MintError {
    #[error("wallet failed to mint: {0}")]
    Wallet(#[from] RpcError)
}

/// Submits mint requests to the wallet. Doesn't persist anything: callers
/// must reflect the result into the task store.
#[derive(Debug, Clone)]
pub struct MintInvoker<W> {
    wallet: W,
    collection: CollectionConfig
}

impl<W: Wallet> MintInvoker<W> {
    #[inline]
    pub fn new(wallet: W, collection: CollectionConfig) -> Self {
        Self {
            wallet,
            collection
        }
    }

    #[inline(always)]
    pub const fn wallet(&self) -> &W {
        &self.wallet
    }

    /// Build wallet request from the collection settings and the task
    /// specific values.
    pub fn build_request(&self, request: &MintRequest) -> MintNftRequest {
        let license_uris = if self.collection.license_url.is_empty() {
            vec![]
        } else {
            vec![self.collection.license_url.clone()]
        };

        MintNftRequest {
            wallet_id: self.collection.nft_wallet_id,
            royalty_address: self.collection.royalty_address.clone(),
            target_address: request.to_address.clone(),
            hash: request.image_hash.to_hex(),
            uris: vec![request.image_url.clone()],
            meta_hash: request.metadata_hash.to_hex(),
            meta_uris: vec![request.metadata_url.clone()],
            license_hash: self.collection.license_hash.clone(),
            license_uris,
            royalty_percentage: self.collection.royalty_percentage,
            fee: self.collection.fee,
            did_id: self.collection.did_id.clone(),
            edition_number: request.edition_number,
            edition_total: request.edition_total
        }
    }

    pub async fn mint(&self, request: &MintRequest) -> Result<MintResult, MintError> {
        let request = self.build_request(request);

        tracing::debug!(?request, "submitting mint request");

        Ok(self.wallet.mint_nft(&request).await?)
    }
}

#[tokio::test]
async fn test_mint() -> anyhow::Result<()> {
    use std::sync::Arc;

    use crate::rpc::mock::MockWallet;

    let wallet = Arc::new(MockWallet::default());

    let invoker = MintInvoker::new(wallet.clone(), CollectionConfig {
        nft_wallet_id: 3,
        royalty_address: String::from("xch1royalty"),
        royalty_percentage: 500,
        fee: 100,
        license_hash: String::from("55632a16"),
        license_url: String::from("https://license"),
        did_id: String::from("did:chia:1abc")
    });

    let result = invoker.mint(&MintRequest {
        to_address: String::from("xch1buyer"),
        image_hash: ContentHash::digest(b"image"),
        image_url: String::from("https://image"),
        metadata_hash: ContentHash::digest(b"metadata"),
        metadata_url: String::from("https://metadata"),
        edition_number: 1,
        edition_total: 10
    }).await?;

    assert!(result.nft_id.is_some());

    let minted = wallet.minted();

    assert_eq!(minted.len(), 1);
    assert_eq!(minted[0].wallet_id, 3);
    assert_eq!(minted[0].target_address, "xch1buyer");
    assert_eq!(minted[0].hash, ContentHash::digest(b"image").to_hex());
    assert_eq!(minted[0].uris, ["https://image"]);
    assert_eq!(minted[0].license_uris, ["https://license"]);
    assert_eq!(minted[0].royalty_percentage, 500);

    wallet.reject_mints.store(true, std::sync::atomic::Ordering::SeqCst);

    assert!(invoker.mint(&MintRequest {
        to_address: String::from("xch1buyer"),
        image_hash: ContentHash::digest(b"image"),
        image_url: String::from("https://image"),
        metadata_hash: ContentHash::digest(b"metadata"),
        metadata_url: String::from("https://metadata"),
        edition_number: 2,
        edition_total: 10
    }).await.is_err());

    Ok(())
}
