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

use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use serde::de::DeserializeOwned;
use serde_json::Value as Json;

use super::RpcError;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// JSON-over-HTTPS client of the ledger node and wallet RPC servers.
///
/// Every response carries a `success` flag; `false` is reported as
/// `RpcError::Rejected` with the server's `error` message.
#[derive(Debug, Clone)]
pub struct RpcClient {
    client: reqwest::Client,
    url: String
}

impl RpcClient {
    /// Build client authenticated with the private TLS certificate of the
    /// node.
    pub fn new(
        url: impl ToString,
        certificate: impl AsRef<Path>,
        private_key: impl AsRef<Path>,
        timeout: Duration
    ) -> anyhow::Result<Self> {
        let certificate = certificate.as_ref();
        let private_key = private_key.as_ref();

        let mut pem = std::fs::read(certificate)
            .with_context(|| format!("failed to read rpc certificate {certificate:?}"))?;

        pem.push(b'\n');

        pem.extend(std::fs::read(private_key)
            .with_context(|| format!("failed to read rpc private key {private_key:?}"))?);

        let identity = reqwest::Identity::from_pem(&pem)
            .context("failed to parse rpc certificate")?;

        let client = reqwest::Client::builder()
            .identity(identity)
            // Node certificates are signed by its own private CA.
            .danger_accept_invalid_certs(true)
            .connect_timeout(CONNECT_TIMEOUT.min(timeout))
            .timeout(timeout)
            .build()
            .context("failed to build rpc client")?;

        Ok(Self::from_client(client, url))
    }

    #[inline]
    pub fn from_client(client: reqwest::Client, url: impl ToString) -> Self {
        Self {
            client,
            url: url.to_string()
                .trim_end_matches('/')
                .to_string()
        }
    }

    /// Call RPC endpoint with the given JSON body.
    pub async fn call<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        body: Json
    ) -> Result<T, RpcError> {
        tracing::trace!(url = %self.url, endpoint, %body, "rpc request");

        let response = self.client.post(format!("{}/{endpoint}", self.url))
            .json(&body)
            .send()
            .await
            .map_err(|err| RpcError::from_reqwest(endpoint, err))?;

        let status = response.status();

        let body = response.bytes()
            .await
            .map_err(|err| RpcError::from_reqwest(endpoint, err))?;

        parse_response(endpoint, status, &body)
    }
}

fn parse_response<T: DeserializeOwned>(
    endpoint: &str,
    status: reqwest::StatusCode,
    body: &[u8]
) -> Result<T, RpcError> {
    let json = serde_json::from_slice::<Json>(body);

    let error_message = |json: &Json| {
        json.get("error")
            .and_then(Json::as_str)
            .map(String::from)
            .unwrap_or_else(|| String::from("unknown error"))
    };

    if !status.is_success() {
        let message = match &json {
            Ok(json) => error_message(json),
            Err(_) => String::from_utf8_lossy(body).to_string()
        };

        return Err(RpcError::from_status(endpoint, status, message));
    }

    let json = json.map_err(|err| RpcError::invalid_response(endpoint, err))?;

    if json.get("success").and_then(Json::as_bool) != Some(true) {
        return Err(RpcError::rejected(endpoint, error_message(&json)));
    }

    serde_json::from_value(json)
        .map_err(|err| RpcError::invalid_response(endpoint, err))
}

#[test]
fn test_parse_response() {
    use reqwest::StatusCode;

    #[derive(Debug, serde::Deserialize)]
    struct Height {
        height: u32
    }

    let height = parse_response::<Height>(
        "get_height",
        StatusCode::OK,
        br#"{"success": true, "height": 42}"#
    ).unwrap();

    assert_eq!(height.height, 42);

    let err = parse_response::<Height>(
        "get_height",
        StatusCode::OK,
        br#"{"success": false, "error": "node is syncing"}"#
    ).unwrap_err();

    assert!(matches!(&err, RpcError::Rejected { message, .. } if message == "node is syncing"));

    let err = parse_response::<Height>(
        "get_height",
        StatusCode::SERVICE_UNAVAILABLE,
        b"unavailable"
    ).unwrap_err();

    assert!(err.is_transient());

    let err = parse_response::<Height>(
        "get_height",
        StatusCode::OK,
        br#"{"success": true}"#
    ).unwrap_err();

    assert!(matches!(err, RpcError::InvalidResponse { .. }));
}
