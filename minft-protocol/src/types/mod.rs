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

pub mod bytes32;
pub mod address;
pub mod coin;
pub mod task_status;

pub mod prelude {
    pub use super::bytes32::{Bytes32, Bytes32Error};
    pub use super::address::{Address, AddressError};
    pub use super::coin::{Coin, CoinRecord};
    pub use super::task_status::MintTaskStatus;
}
