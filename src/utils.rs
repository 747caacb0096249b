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

use tokio::sync::watch;

/// Create new shutdown channel. The process is stopped when `true` is sent.
#[inline]
pub fn shutdown_channel() -> (watch::Sender<bool>, watch::Receiver<bool>) {
    watch::channel(false)
}

/// Sleep for the given duration or until shutdown is requested.
///
/// Return `true` if the caller must stop.
pub async fn sleep_or_shutdown(
    shutdown: &mut watch::Receiver<bool>,
    duration: Duration
) -> bool {
    if *shutdown.borrow() {
        return true;
    }

    tokio::select! {
        result = shutdown.changed() => {
            // Dropped sender means nobody can stop us anymore, which
            // is treated the same way as the shutdown request.
            result.is_err() || *shutdown.borrow()
        }

        _ = tokio::time::sleep(duration) => false
    }
}

/// Wait for SIGINT or SIGTERM.
#[cfg(unix)]
pub async fn wait_termination_signal() -> std::io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate())?;

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result?;

            tracing::info!("received SIGINT, shutting down");
        }

        _ = sigterm.recv() => {
            tracing::info!("received SIGTERM, shutting down");
        }
    }

    Ok(())
}

/// Wait for Ctrl-C.
#[cfg(not(unix))]
pub async fn wait_termination_signal() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await?;

    tracing::info!("received Ctrl-C, shutting down");

    Ok(())
}

#[tokio::test]
async fn test_sleep_or_shutdown() {
    let (sender, mut receiver) = shutdown_channel();

    assert!(!sleep_or_shutdown(&mut receiver, Duration::from_millis(10)).await);

    let task = tokio::spawn(async move {
        sleep_or_shutdown(&mut receiver, Duration::from_secs(3600)).await
    });

    sender.send(true).unwrap();

    assert!(task.await.unwrap());
}
