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

use crate::rpc::{Pinning, RpcError};

#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("failed to upload content: {0}")]
    Upload(#[from] RpcError),

    #[error("storage service returned empty content id")]
    EmptyContentId
}

impl PublishError {
    #[inline]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Upload(err) if err.is_transient())
    }
}

/// Uploads content to the content-addressable storage service.
#[derive(Debug, Clone)]
pub struct ContentPublisher<P> {
    pinning: P,

    /// Retrieval URL template with `{cid}` placeholder.
    gateway_url: String
}

impl<P: Pinning> ContentPublisher<P> {
    #[inline]
    pub fn new(pinning: P, gateway_url: impl ToString) -> Self {
        Self {
            pinning,
            gateway_url: gateway_url.to_string()
        }
    }

    /// Build public retrieval URL of the content.
    #[inline]
    pub fn content_url(&self, cid: impl AsRef<str>) -> String {
        self.gateway_url.replace("{cid}", cid.as_ref())
    }

    /// Upload bytes and describe the published content.
    pub async fn store(&self, bytes: Vec<u8>) -> Result<PublishedContent, PublishError> {
        let hash = ContentHash::digest(&bytes);

        let cid = self.pinning.store(bytes).await?;

        if cid.trim().is_empty() {
            return Err(PublishError::EmptyContentId);
        }

        Ok(PublishedContent {
            url: self.content_url(&cid),
            cid,
            hash
        })
    }
}

#[tokio::test]
async fn test_store() -> anyhow::Result<()> {
    use std::sync::Arc;

    use crate::rpc::mock::MockPinning;

    let pinning = Arc::new(MockPinning::default());

    let publisher = ContentPublisher::new(
        pinning.clone(),
        "https://{cid}.ipfs.nftstorage.link/"
    );

    let content = publisher.store(b"hello, minft".to_vec()).await?;

    assert_eq!(content.url, format!("https://{}.ipfs.nftstorage.link/", content.cid));
    assert_eq!(content.hash, ContentHash::digest(b"hello, minft"));
    assert_eq!(pinning.uploads(), 1);

    // The hash doesn't depend on the upload result.
    pinning.reject.store(true, std::sync::atomic::Ordering::SeqCst);

    let err = publisher.store(b"hello, minft".to_vec()).await.unwrap_err();

    assert!(err.is_transient());
    assert_eq!(ContentHash::digest(b"hello, minft"), content.hash);

    Ok(())
}
