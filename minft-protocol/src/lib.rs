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

pub mod types;
pub mod hash;
pub mod metadata;
pub mod mint;
pub mod content;

pub mod prelude {
    pub use super::types::prelude::*;

    pub use super::hash::ContentHash;
    pub use super::content::PublishedContent;
    pub use super::metadata::{Chip0007Metadata, CollectionInfo};

    pub use super::mint::{
        Balance,
        CollectionConfig,
        MintRequest,
        MintResult
    };
}
