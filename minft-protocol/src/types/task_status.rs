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

/// Status of a single mint task.
///
/// ```text
/// Pending --dispatch--> Minting --success--> Minted
///                          \----failure----> Failed --retry--> Pending
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MintTaskStatus {
    /// Task is waiting for the payout scheduler.
    Pending,

    /// Publish or mint is in progress.
    Minting,

    /// Asset was successfully minted. Terminal state.
    Minted,

    /// Publish or mint failed. Can be moved back to pending by an operator.
    Failed
}

impl MintTaskStatus {
    pub const PENDING: i64 = 0;
    pub const MINTING: i64 = 1;
    pub const MINTED: i64  = 2;
    pub const FAILED: i64  = 3;

    #[inline]
    pub const fn to_i64(&self) -> i64 {
        match self {
            Self::Pending => Self::PENDING,
            Self::Minting => Self::MINTING,
            Self::Minted  => Self::MINTED,
            Self::Failed  => Self::FAILED
        }
    }

    #[inline]
    pub const fn from_i64(value: i64) -> Option<Self> {
        match value {
            Self::PENDING => Some(Self::Pending),
            Self::MINTING => Some(Self::Minting),
            Self::MINTED  => Some(Self::Minted),
            Self::FAILED  => Some(Self::Failed),

            _ => None
        }
    }

    #[inline]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Minting => "minting",
            Self::Minted  => "minted",
            Self::Failed  => "failed"
        }
    }

    /// Whether the task can still be dispatched (directly or after retry).
    #[inline]
    pub const fn is_retry_eligible(&self) -> bool {
        matches!(self, Self::Pending | Self::Failed)
    }

    #[inline]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Minted)
    }
}

impl std::fmt::Display for MintTaskStatus {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for MintTaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "minting" => Ok(Self::Minting),
            "minted"  => Ok(Self::Minted),
            "failed"  => Ok(Self::Failed),

            _ => Err(format!("unknown task status: {s}"))
        }
    }
}

#[test]
fn test() {
    for status in [
        MintTaskStatus::Pending,
        MintTaskStatus::Minting,
        MintTaskStatus::Minted,
        MintTaskStatus::Failed
    ] {
        assert_eq!(MintTaskStatus::from_i64(status.to_i64()), Some(status));
        assert_eq!(status.as_str().parse::<MintTaskStatus>(), Ok(status));
    }

    assert_eq!(MintTaskStatus::from_i64(4), None);
    assert!("done".parse::<MintTaskStatus>().is_err());

    assert!(MintTaskStatus::Failed.is_retry_eligible());
    assert!(!MintTaskStatus::Minting.is_retry_eligible());
    assert!(MintTaskStatus::Minted.is_terminal());
}
