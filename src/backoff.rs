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

use serde::{Serialize, Deserialize};

/// Exponential backoff used by the polling loops after failed iterations.
///
/// The delay doubles with every consecutive failure, starting from
/// `initial_delay` and never exceeding `max_delay`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    initial_delay: Duration,
    max_delay: Duration,
    failures: u32
}

impl Backoff {
    pub fn new(initial_delay: Duration, max_delay: Duration) -> Self {
        Self {
            initial_delay,
            max_delay: max_delay.max(initial_delay),
            failures: 0
        }
    }

    /// Register a failure and get the delay before the next attempt.
    pub fn next_delay(&mut self) -> Duration {
        let multiplier = 1u32.checked_shl(self.failures).unwrap_or(u32::MAX);

        let delay = self.initial_delay
            .checked_mul(multiplier)
            .unwrap_or(self.max_delay)
            .min(self.max_delay);

        self.failures = self.failures.saturating_add(1);

        delay
    }

    /// Forget all the registered failures.
    #[inline]
    pub fn reset(&mut self) {
        self.failures = 0;
    }

    /// Amount of consecutive failures.
    #[inline(always)]
    pub const fn failures(&self) -> u32 {
        self.failures
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackoffConfig {
    /// Delay after the first failure, in seconds.
    #[serde(default = "BackoffConfig::default_initial_delay")]
    pub initial_delay: u64,

    /// Maximal delay between attempts, in seconds.
    #[serde(default = "BackoffConfig::default_max_delay")]
    pub max_delay: u64
}

impl BackoffConfig {
    #[inline(always)]
    const fn default_initial_delay() -> u64 {
        5
    }

    #[inline(always)]
    const fn default_max_delay() -> u64 {
        300
    }

    #[inline]
    pub fn build(&self) -> Backoff {
        Backoff::new(
            Duration::from_secs(self.initial_delay),
            Duration::from_secs(self.max_delay)
        )
    }
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_delay: Self::default_initial_delay(),
            max_delay: Self::default_max_delay()
        }
    }
}

#[test]
fn test_backoff() {
    let mut backoff = Backoff::new(Duration::from_secs(5), Duration::from_secs(60));

    assert_eq!(backoff.next_delay(), Duration::from_secs(5));
    assert_eq!(backoff.next_delay(), Duration::from_secs(10));
    assert_eq!(backoff.next_delay(), Duration::from_secs(20));
    assert_eq!(backoff.next_delay(), Duration::from_secs(40));
    assert_eq!(backoff.next_delay(), Duration::from_secs(60));
    assert_eq!(backoff.next_delay(), Duration::from_secs(60));
    assert_eq!(backoff.failures(), 6);

    backoff.reset();

    assert_eq!(backoff.next_delay(), Duration::from_secs(5));

    // Huge amount of failures must not overflow.
    for _ in 0..100 {
        assert!(backoff.next_delay() <= Duration::from_secs(60));
    }
}
