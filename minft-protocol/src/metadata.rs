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

use serde::{Serialize, Deserialize};

pub const CHIP_0007_FORMAT: &str = "CHIP-0007";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    pub trait_type: String,
    pub value: String
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionInfo {
    /// Unique identifier of the collection (UUID recommended).
    pub id: String,

    pub name: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<Attribute>
}

/// Off-chain NFT metadata document in the CHIP-0007 format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chip0007Metadata {
    pub format: String,
    pub name: String,
    pub description: String,
    pub minting_tool: String,
    pub sensitive_content: bool,

    /// 1-based number of the NFT in the series.
    pub series_number: u64,
    pub series_total: u64,

    #[serde(default)]
    pub attributes: Vec<Attribute>,

    pub collection: CollectionInfo
}

impl Chip0007Metadata {
    /// Build metadata document for the edition with given 0-based index.
    pub fn new(
        collection: CollectionInfo,
        description: impl ToString,
        edition_index: u64,
        edition_total: u64
    ) -> Self {
        Self {
            format: CHIP_0007_FORMAT.to_string(),
            name: format!("{} #{}", collection.name, edition_index + 1),
            description: description.to_string(),
            minting_tool: String::from("minft"),
            sensitive_content: false,
            series_number: edition_index + 1,
            series_total: edition_total,
            attributes: vec![],
            collection
        }
    }

    /// Serialize document into pretty-printed JSON bytes.
    pub fn to_bytes(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec_pretty(self)
    }
}

#[test]
fn test() -> serde_json::Result<()> {
    let metadata = Chip0007Metadata::new(CollectionInfo {
        id: String::from("5ad5f5b3-8bd4-4d6c-8b3b-8f1fa2a2c1d1"),
        name: String::from("Flowers"),
        attributes: vec![]
    }, "Hand-drawn flowers", 4, 100);

    assert_eq!(metadata.name, "Flowers #5");
    assert_eq!(metadata.series_number, 5);
    assert_eq!(metadata.series_total, 100);

    let json = serde_json::from_slice::<serde_json::Value>(&metadata.to_bytes()?)?;

    assert_eq!(json["format"], "CHIP-0007");
    assert_eq!(json["collection"]["name"], "Flowers");
    assert!(json["collection"].get("attributes").is_none());

    // Serialization must be stable for the locally computed hash.
    assert_eq!(metadata.to_bytes()?, metadata.clone().to_bytes()?);

    Ok(())
}
