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

//! Contracts of the external services consumed by the minter, and their
//! HTTP implementations.

use std::future::Future;
use std::sync::Arc;

use minft_protocol::prelude::*;

pub mod http;
pub mod full_node;
pub mod wallet;
pub mod nft_storage;

#[cfg(test)]
pub mod mock;

pub use wallet::MintNftRequest;

#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    /// Timeout, connection failure or temporary server error. Caller should
    /// retry later.
    #[error("request to {endpoint} failed: {message}")]
    Transient {
        endpoint: String,
        message: String
    },

    /// Service processed the request and refused it.
    #[error("{endpoint} rejected request: {message}")]
    Rejected {
        endpoint: String,
        message: String
    },

    #[error("invalid response from {endpoint}: {message}")]
    InvalidResponse {
        endpoint: String,
        message: String
    }
}

impl RpcError {
    pub fn transient(endpoint: impl ToString, message: impl ToString) -> Self {
        Self::Transient {
            endpoint: endpoint.to_string(),
            message: message.to_string()
        }
    }

    pub fn rejected(endpoint: impl ToString, message: impl ToString) -> Self {
        Self::Rejected {
            endpoint: endpoint.to_string(),
            message: message.to_string()
        }
    }

    pub fn invalid_response(endpoint: impl ToString, message: impl ToString) -> Self {
        Self::InvalidResponse {
            endpoint: endpoint.to_string(),
            message: message.to_string()
        }
    }

    /// Map transport error of the HTTP client.
    pub fn from_reqwest(endpoint: impl ToString, err: reqwest::Error) -> Self {
        if err.is_builder() {
            Self::rejected(endpoint, err)
        } else if err.is_decode() {
            Self::invalid_response(endpoint, err)
        } else {
            Self::transient(endpoint, err)
        }
    }

    /// Map unsuccessful HTTP status.
    pub fn from_status(
        endpoint: impl ToString,
        status: reqwest::StatusCode,
        message: impl std::fmt::Display
    ) -> Self {
        let message = format!("{status}: {message}");

        if status.is_server_error()
            || status == reqwest::StatusCode::TOO_MANY_REQUESTS
            || status == reqwest::StatusCode::REQUEST_TIMEOUT
        {
            Self::transient(endpoint, message)
        } else {
            Self::rejected(endpoint, message)
        }
    }

    #[inline]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }
}

/// Ledger query interface.
pub trait Ledger: Send + Sync {
    /// Get coin records locked by the given puzzle hash.
    fn coin_records_by_puzzle_hash(
        &self,
        puzzle_hash: &Bytes32,
        include_spent: bool
    ) -> impl Future<Output = Result<Vec<CoinRecord>, RpcError>> + Send;

    /// Get coin record by its id. Return `None` if the coin is unknown.
    fn coin_record_by_name(
        &self,
        name: &Bytes32
    ) -> impl Future<Output = Result<Option<CoinRecord>, RpcError>> + Send;
}

/// Wallet transaction interface.
pub trait Wallet: Send + Sync {
    fn balance(
        &self,
        wallet_id: u32
    ) -> impl Future<Output = Result<Balance, RpcError>> + Send;

    fn mint_nft(
        &self,
        request: &MintNftRequest
    ) -> impl Future<Output = Result<MintResult, RpcError>> + Send;
}

/// Content-pinning interface.
pub trait Pinning: Send + Sync {
    /// Upload bytes and return their content identifier.
    fn store(
        &self,
        bytes: Vec<u8>
    ) -> impl Future<Output = Result<String, RpcError>> + Send;
}

impl<T: Ledger> Ledger for Arc<T> {
    #[inline]
    fn coin_records_by_puzzle_hash(
        &self,
        puzzle_hash: &Bytes32,
        include_spent: bool
    ) -> impl Future<Output = Result<Vec<CoinRecord>, RpcError>> + Send {
        self.as_ref().coin_records_by_puzzle_hash(puzzle_hash, include_spent)
    }

    #[inline]
    fn coin_record_by_name(
        &self,
        name: &Bytes32
    ) -> impl Future<Output = Result<Option<CoinRecord>, RpcError>> + Send {
        self.as_ref().coin_record_by_name(name)
    }
}

impl<T: Wallet> Wallet for Arc<T> {
    #[inline]
    fn balance(
        &self,
        wallet_id: u32
    ) -> impl Future<Output = Result<Balance, RpcError>> + Send {
        self.as_ref().balance(wallet_id)
    }

    #[inline]
    fn mint_nft(
        &self,
        request: &MintNftRequest
    ) -> impl Future<Output = Result<MintResult, RpcError>> + Send {
        self.as_ref().mint_nft(request)
    }
}

impl<T: Pinning> Pinning for Arc<T> {
    #[inline]
    fn store(
        &self,
        bytes: Vec<u8>
    ) -> impl Future<Output = Result<String, RpcError>> + Send {
        self.as_ref().store(bytes)
    }
}

#[test]
fn test_status_mapping() {
    use reqwest::StatusCode;

    assert!(RpcError::from_status("upload", StatusCode::BAD_GATEWAY, "").is_transient());
    assert!(RpcError::from_status("upload", StatusCode::TOO_MANY_REQUESTS, "").is_transient());

    assert!(!RpcError::from_status("upload", StatusCode::UNAUTHORIZED, "").is_transient());
    assert!(!RpcError::from_status("upload", StatusCode::BAD_REQUEST, "").is_transient());
}
