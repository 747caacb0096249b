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
use std::sync::Arc;
use std::time::Duration;

use spin::{Mutex, MutexGuard};
use rusqlite::Connection;

pub mod task;

/// How long to wait for other processes holding the database lock.
const BUSY_TIMEOUT: Duration = Duration::from_secs(10);

const SOLD_OUT_KEY: &str = "sold_out";

#[derive(Debug, Clone)]
pub struct Database(Arc<Mutex<Connection>>);

impl Database {
    pub fn open(path: impl AsRef<Path>) -> rusqlite::Result<Self> {
        Self::init(Connection::open(path)?)
    }

    /// Open temporary database stored in RAM.
    pub fn open_in_memory() -> rusqlite::Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(connection: Connection) -> rusqlite::Result<Self> {
        connection.busy_timeout(BUSY_TIMEOUT)?;

        connection.execute_batch(r#"
            CREATE TABLE IF NOT EXISTS mint_tasks (
                id             INTEGER NOT NULL UNIQUE,
                parent_id      TEXT    NOT NULL,
                to_address     TEXT    NOT NULL,
                mint_id        INTEGER NOT NULL,
                status         INTEGER NOT NULL DEFAULT 0,
                mint_image_url TEXT             DEFAULT NULL,

                image_cid     TEXT DEFAULT NULL,
                image_url     TEXT DEFAULT NULL,
                image_hash    TEXT DEFAULT NULL,
                metadata_cid  TEXT DEFAULT NULL,
                metadata_url  TEXT DEFAULT NULL,
                metadata_hash TEXT DEFAULT NULL,

                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL,

                UNIQUE (parent_id),
                UNIQUE (mint_id),
                CHECK (mint_id >= 0),
                CHECK (status IN (0, 1, 2, 3)),

                PRIMARY KEY (id)
            );

            CREATE INDEX IF NOT EXISTS mint_tasks_status_idx ON mint_tasks (
                status,
                mint_id
            );

            CREATE TABLE IF NOT EXISTS process_state (
                key   TEXT NOT NULL UNIQUE,
                value TEXT NOT NULL,

                PRIMARY KEY (key)
            );
        "#)?;

        Ok(Self(Arc::new(Mutex::new(connection))))
    }

    #[inline]
    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.0.lock()
    }

    /// Read process state value.
    pub fn state(&self, key: impl AsRef<str>) -> rusqlite::Result<Option<String>> {
        let lock = self.lock();

        let mut query = lock.prepare_cached("
            SELECT value FROM process_state WHERE key = ?1
        ")?;

        let value = query.query_row([key.as_ref()], |row| row.get("value"));

        match value {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(err) => Err(err)
        }
    }

    /// Write process state value.
    pub fn set_state(
        &self,
        key: impl AsRef<str>,
        value: impl AsRef<str>
    ) -> rusqlite::Result<()> {
        self.lock()
            .prepare_cached("
                INSERT OR REPLACE INTO process_state (key, value)
                VALUES (?1, ?2)
            ")?
            .execute((key.as_ref(), value.as_ref()))?;

        Ok(())
    }

    /// Check if the collection is marked as sold out. Once set, no mint tasks
    /// can be dispatched anymore.
    pub fn is_sold_out(&self) -> rusqlite::Result<bool> {
        Ok(self.state(SOLD_OUT_KEY)?.is_some())
    }

    /// Get the mint id which caused the collection to be sold out.
    pub fn sold_out_at(&self) -> rusqlite::Result<Option<u64>> {
        Ok(self.state(SOLD_OUT_KEY)?.and_then(|value| value.parse().ok()))
    }

    /// Durably mark the collection as sold out.
    pub fn mark_sold_out(&self, mint_id: u64) -> rusqlite::Result<()> {
        self.set_state(SOLD_OUT_KEY, mint_id.to_string())
    }
}

#[test]
fn test_sold_out() -> rusqlite::Result<()> {
    let database = Database::open_in_memory()?;

    assert!(!database.is_sold_out()?);
    assert_eq!(database.sold_out_at()?, None);

    database.mark_sold_out(9)?;

    assert!(database.is_sold_out()?);
    assert_eq!(database.sold_out_at()?, Some(9));

    Ok(())
}

#[test]
fn test_sold_out_survives_reopen() -> anyhow::Result<()> {
    let folder = tempfile::tempdir()?;
    let path = folder.path().join("minft.db");

    Database::open(&path)?.mark_sold_out(9)?;

    assert!(Database::open(&path)?.is_sold_out()?);

    Ok(())
}
