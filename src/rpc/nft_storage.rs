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

use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;

use super::{Pinning, RpcError};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Client of the nft.storage pinning service.
#[derive(Debug, Clone)]
pub struct NftStorageClient {
    client: reqwest::Client,
    api_url: String,
    api_key: String
}

#[derive(Deserialize)]
struct UploadResponse {
    ok: bool,

    #[serde(default)]
    value: Option<UploadValue>,

    #[serde(default)]
    error: Option<UploadError>
}

#[derive(Deserialize)]
struct UploadValue {
    cid: String
}

#[derive(Deserialize)]
struct UploadError {
    #[serde(default)]
    message: String
}

impl NftStorageClient {
    pub fn new(
        api_url: impl ToString,
        api_key: impl ToString,
        timeout: Duration
    ) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT.min(timeout))
            .timeout(timeout)
            .build()
            .context("failed to build storage client")?;

        Ok(Self {
            client,
            api_url: api_url.to_string()
                .trim_end_matches('/')
                .to_string(),
            api_key: api_key.to_string()
        })
    }
}

fn parse_upload(status: reqwest::StatusCode, body: &[u8]) -> Result<String, RpcError> {
    let response = serde_json::from_slice::<UploadResponse>(body);

    let response = match response {
        Ok(response) => response,

        Err(_) if !status.is_success() => {
            return Err(RpcError::from_status("upload", status, String::from_utf8_lossy(body)));
        }

        Err(err) => return Err(RpcError::invalid_response("upload", err))
    };

    if !status.is_success() || !response.ok {
        let message = response.error
            .map(|error| error.message)
            .unwrap_or_else(|| String::from("unknown error"));

        return Err(RpcError::from_status("upload", status, message));
    }

    match response.value {
        Some(value) if !value.cid.trim().is_empty() => Ok(value.cid),

        _ => Err(RpcError::invalid_response("upload", "content id is missing"))
    }
}

impl Pinning for NftStorageClient {
    async fn store(&self, bytes: Vec<u8>) -> Result<String, RpcError> {
        let size = bytes.len();

        let response = self.client.post(format!("{}/upload", self.api_url))
            .bearer_auth(&self.api_key)
            .body(bytes)
            .send()
            .await
            .map_err(|err| RpcError::from_reqwest("upload", err))?;

        let status = response.status();

        let body = response.bytes()
            .await
            .map_err(|err| RpcError::from_reqwest("upload", err))?;

        let cid = parse_upload(status, &body)?;

        tracing::debug!(cid = %cid, size, "content uploaded");

        Ok(cid)
    }
}

#[test]
fn test_parse_upload() {
    use reqwest::StatusCode;

    let cid = parse_upload(
        StatusCode::OK,
        br#"{"ok": true, "value": {"cid": "bafkreibnqu7h4dkzuuhyptneo3fhw2trretgfpuscf4dc6uwgnxy556e54"}}"#
    ).unwrap();

    assert_eq!(cid, "bafkreibnqu7h4dkzuuhyptneo3fhw2trretgfpuscf4dc6uwgnxy556e54");

    let err = parse_upload(
        StatusCode::UNAUTHORIZED,
        br#"{"ok": false, "error": {"name": "HTTPError", "message": "invalid token"}}"#
    ).unwrap_err();

    assert!(matches!(&err, RpcError::Rejected { message, .. } if message.contains("invalid token")));

    assert!(parse_upload(StatusCode::BAD_GATEWAY, b"<html>bad gateway</html>").unwrap_err().is_transient());

    assert!(matches!(
        parse_upload(StatusCode::OK, br#"{"ok": true, "value": {"cid": ""}}"#),
        Err(RpcError::InvalidResponse { .. })
    ));
}
