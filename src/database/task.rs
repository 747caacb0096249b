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

use rusqlite::types::Type;
use time::UtcDateTime;

use minft_protocol::prelude::*;

use super::Database;

#[derive(Debug, thiserror::Error)]
pub enum CreateError {
    /// Task for this deposit already exists. Callers should treat it as a
    /// no-op rather than a failure.
    #[error("mint task for parent {0} already exists")]
    Duplicate(String),

    #[error(transparent)]
    Database(#[from] rusqlite::Error)
}

/// Snapshot of the mint task row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MintTaskInfo {
    /// Internal ID of the task.
    pub id: i64,

    /// Hex id of the deposit's parent coin. Unique across all tasks.
    pub parent_id: String,

    /// Address which will receive the minted asset.
    pub to_address: String,

    /// Edition index of the asset, assigned sequentially from 0.
    pub mint_id: u64,

    pub status: MintTaskStatus,

    /// Path to the artifact overriding the default one.
    pub mint_image_url: Option<String>,

    /// Artifact published during previous attempts.
    pub image: Option<PublishedContent>,

    /// Metadata document published during previous attempts.
    pub metadata: Option<PublishedContent>,

    pub created_at: UtcDateTime,
    pub updated_at: UtcDateTime
}

fn conversion_error(column: &str, message: impl std::fmt::Display) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        0,
        Type::Text,
        format!("invalid '{column}' value: {message}").into()
    )
}

fn timestamp(row: &rusqlite::Row<'_>, column: &str) -> rusqlite::Result<UtcDateTime> {
    let timestamp = row.get::<_, i64>(column)?;

    UtcDateTime::from_unix_timestamp(timestamp)
        .map_err(|err| conversion_error(column, err))
}

fn published(
    row: &rusqlite::Row<'_>,
    prefix: &str
) -> rusqlite::Result<Option<PublishedContent>> {
    let cid = row.get::<_, Option<String>>(format!("{prefix}_cid").as_str())?;
    let url = row.get::<_, Option<String>>(format!("{prefix}_url").as_str())?;
    let hash = row.get::<_, Option<String>>(format!("{prefix}_hash").as_str())?;

    let (Some(cid), Some(url), Some(hash)) = (cid, url, hash) else {
        return Ok(None);
    };

    let hash = ContentHash::from_hex(&hash)
        .ok_or_else(|| conversion_error(&format!("{prefix}_hash"), hash))?;

    Ok(Some(PublishedContent {
        cid,
        url,
        hash
    }))
}

impl MintTaskInfo {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        let status = row.get::<_, i64>("status")?;

        Ok(Self {
            id: row.get("id")?,
            parent_id: row.get("parent_id")?,
            to_address: row.get("to_address")?,
            mint_id: row.get::<_, i64>("mint_id")? as u64,

            status: MintTaskStatus::from_i64(status)
                .ok_or_else(|| conversion_error("status", status))?,

            mint_image_url: row.get("mint_image_url")?,
            image: published(row, "image")?,
            metadata: published(row, "metadata")?,
            created_at: timestamp(row, "created_at")?,
            updated_at: timestamp(row, "updated_at")?
        })
    }
}

#[derive(Debug, Clone)]
pub struct MintTaskRecord(Database, i64);

impl MintTaskRecord {
    /// Create new pending mint task for the given deposit parent.
    ///
    /// The next `mint_id` is assigned within the same statement, so the
    /// database serializes concurrent creations: ids never collide and never
    /// skip values. Return `CreateError::Duplicate` if a task with the same
    /// `parent_id` already exists.
    pub fn create_if_absent(
        database: Database,
        parent_id: impl AsRef<str>,
        to_address: impl AsRef<str>
    ) -> Result<Self, CreateError> {
        let parent_id = parent_id.as_ref();

        let lock = database.lock();

        let mut query = lock.prepare_cached("
            INSERT INTO mint_tasks (
                parent_id,
                to_address,
                mint_id,
                status,
                created_at,
                updated_at
            )
            SELECT ?1, ?2, COALESCE(MAX(mint_id) + 1, 0), ?3, ?4, ?4
            FROM mint_tasks
        ")?;

        let result = query.insert((
            parent_id,
            to_address.as_ref(),
            MintTaskStatus::PENDING,
            UtcDateTime::now().unix_timestamp()
        ));

        drop(query);
        drop(lock);

        match result {
            Ok(id) => Ok(Self(database, id)),

            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Err(CreateError::Duplicate(parent_id.to_string()))
            }

            Err(err) => Err(err.into())
        }
    }

    /// Find task by the parent id of its deposit. Return `None` if such
    /// task doesn't exist.
    pub fn find(
        database: Database,
        parent_id: impl AsRef<str>
    ) -> rusqlite::Result<Option<Self>> {
        let lock = database.lock();

        let mut query = lock.prepare_cached("
            SELECT id FROM mint_tasks WHERE parent_id = ?1
        ")?;

        let id = query.query_row([parent_id.as_ref()], |row| row.get("id"));

        drop(query);
        drop(lock);

        match id {
            Ok(id) => Ok(Some(Self(database, id))),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(err) => Err(err)
        }
    }

    /// Find task by its mint id.
    pub fn find_by_mint_id(
        database: Database,
        mint_id: u64
    ) -> rusqlite::Result<Option<Self>> {
        let lock = database.lock();

        let mut query = lock.prepare_cached("
            SELECT id FROM mint_tasks WHERE mint_id = ?1
        ")?;

        let id = query.query_row([mint_id as i64], |row| row.get("id"));

        drop(query);
        drop(lock);

        match id {
            Ok(id) => Ok(Some(Self(database, id))),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(err) => Err(err)
        }
    }

    fn query(
        database: Database,
        query: &str,
        params: impl rusqlite::Params
    ) -> rusqlite::Result<Vec<Self>> {
        let lock = database.lock();

        let mut query = lock.prepare_cached(query)?;

        let ids = query.query_map(params, |row| row.get::<_, i64>("id"))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        drop(query);
        drop(lock);

        let tasks = ids.into_iter()
            .map(|id| Self(database.clone(), id))
            .collect();

        Ok(tasks)
    }

    /// List pending tasks ordered by their mint id.
    #[inline]
    pub fn pending(database: Database) -> rusqlite::Result<Vec<Self>> {
        Self::by_status(database, MintTaskStatus::Pending)
    }

    /// List tasks with given status ordered by their mint id.
    pub fn by_status(
        database: Database,
        status: MintTaskStatus
    ) -> rusqlite::Result<Vec<Self>> {
        Self::query(database, "
            SELECT id FROM mint_tasks WHERE status = ?1 ORDER BY mint_id ASC
        ", [status.to_i64()])
    }

    /// List all the stored tasks ordered by their mint id.
    pub fn all(database: Database) -> rusqlite::Result<Vec<Self>> {
        Self::query(database, "SELECT id FROM mint_tasks ORDER BY mint_id ASC", [])
    }

    /// Move all the tasks stuck in the minting status to failed and return
    /// them.
    ///
    /// A task can only be observed in minting state if the process was
    /// stopped before its attempt result was recorded. Such tasks require
    /// manual reconciliation since the mint could have been submitted.
    pub fn fail_stranded(database: Database) -> rusqlite::Result<Vec<Self>> {
        let mut lock = database.lock();

        let transaction = lock.transaction()?;

        let ids = transaction.prepare_cached("
            SELECT id FROM mint_tasks WHERE status = ?1 ORDER BY mint_id ASC
        ")?
            .query_map([MintTaskStatus::MINTING], |row| row.get::<_, i64>("id"))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        transaction.prepare_cached("
            UPDATE mint_tasks SET status = ?2, updated_at = ?3 WHERE status = ?1
        ")?
            .execute((
                MintTaskStatus::MINTING,
                MintTaskStatus::FAILED,
                UtcDateTime::now().unix_timestamp()
            ))?;

        transaction.commit()?;

        drop(lock);

        let tasks = ids.into_iter()
            .map(|id| Self(database.clone(), id))
            .collect();

        Ok(tasks)
    }

    /// Internal ID of the task.
    #[inline(always)]
    pub const fn id(&self) -> i64 {
        self.1
    }

    /// Read all the task's fields.
    pub fn info(&self) -> rusqlite::Result<MintTaskInfo> {
        self.0.lock()
            .prepare_cached("SELECT * FROM mint_tasks WHERE id = ?1")?
            .query_row([self.1], MintTaskInfo::from_row)
    }

    /// Edition index of the asset.
    pub fn mint_id(&self) -> rusqlite::Result<u64> {
        self.0.lock()
            .prepare_cached("SELECT mint_id FROM mint_tasks WHERE id = ?1")?
            .query_row([self.1], |row| row.get::<_, i64>("mint_id"))
            .map(|mint_id| mint_id as u64)
    }

    pub fn status(&self) -> rusqlite::Result<MintTaskStatus> {
        let status = self.0.lock()
            .prepare_cached("SELECT status FROM mint_tasks WHERE id = ?1")?
            .query_row([self.1], |row| row.get::<_, i64>("status"))?;

        MintTaskStatus::from_i64(status)
            .ok_or_else(|| conversion_error("status", status))
    }

    /// Update status of the task.
    pub fn update_status(
        &mut self,
        status: MintTaskStatus
    ) -> rusqlite::Result<&mut Self> {
        self.0.lock()
            .prepare_cached("
                UPDATE mint_tasks SET status = ?2, updated_at = ?3 WHERE id = ?1
            ")?
            .execute((
                self.1,
                status.to_i64(),
                UtcDateTime::now().unix_timestamp()
            ))?;

        Ok(self)
    }

    /// Move pending task to the minting status. Return `false` if the task
    /// is not pending anymore or another task is already being minted.
    ///
    /// Status check and update happen in one statement, so concurrent
    /// schedulers sharing the database can't claim tasks at the same time.
    pub fn claim(&mut self) -> rusqlite::Result<bool> {
        let updated = self.0.lock()
            .prepare_cached("
                UPDATE mint_tasks SET status = ?3, updated_at = ?4
                WHERE id = ?1 AND status = ?2 AND NOT EXISTS (
                    SELECT 1 FROM mint_tasks WHERE status = ?3
                )
            ")?
            .execute((
                self.1,
                MintTaskStatus::PENDING,
                MintTaskStatus::MINTING,
                UtcDateTime::now().unix_timestamp()
            ))?;

        Ok(updated > 0)
    }

    /// Move failed task back to the pending queue. Return `false` if the
    /// task is not failed.
    pub fn retry(&mut self) -> rusqlite::Result<bool> {
        let updated = self.0.lock()
            .prepare_cached("
                UPDATE mint_tasks SET status = ?3, updated_at = ?4
                WHERE id = ?1 AND status = ?2
            ")?
            .execute((
                self.1,
                MintTaskStatus::FAILED,
                MintTaskStatus::PENDING,
                UtcDateTime::now().unix_timestamp()
            ))?;

        Ok(updated > 0)
    }

    /// Remember the published artifact so the next attempt can reuse it.
    pub fn record_image(
        &mut self,
        content: &PublishedContent
    ) -> rusqlite::Result<&mut Self> {
        self.0.lock()
            .prepare_cached("
                UPDATE mint_tasks
                SET image_cid = ?2, image_url = ?3, image_hash = ?4
                WHERE id = ?1
            ")?
            .execute((
                self.1,
                content.cid.as_str(),
                content.url.as_str(),
                content.hash.to_hex()
            ))?;

        Ok(self)
    }

    /// Remember the published metadata document so the next attempt can
    /// reuse it.
    pub fn record_metadata(
        &mut self,
        content: &PublishedContent
    ) -> rusqlite::Result<&mut Self> {
        self.0.lock()
            .prepare_cached("
                UPDATE mint_tasks
                SET metadata_cid = ?2, metadata_url = ?3, metadata_hash = ?4
                WHERE id = ?1
            ")?
            .execute((
                self.1,
                content.cid.as_str(),
                content.url.as_str(),
                content.hash.to_hex()
            ))?;

        Ok(self)
    }

    /// Override the artifact of this task. Previously published artifact is
    /// forgotten. Return `false` if the task is being minted or already
    /// minted.
    pub fn set_mint_image_url(
        &mut self,
        url: Option<&str>
    ) -> rusqlite::Result<bool> {
        let updated = self.0.lock()
            .prepare_cached("
                UPDATE mint_tasks
                SET mint_image_url = ?2,
                    image_cid = NULL,
                    image_url = NULL,
                    image_hash = NULL
                WHERE id = ?1 AND status IN (?3, ?4)
            ")?
            .execute((
                self.1,
                url,
                MintTaskStatus::PENDING,
                MintTaskStatus::FAILED
            ))?;

        Ok(updated > 0)
    }
}

#[test]
fn test_create_if_absent() -> anyhow::Result<()> {
    let database = Database::open_in_memory()?;

    let task = MintTaskRecord::create_if_absent(database.clone(), "p1", "xch1a")?;

    let info = task.info()?;

    assert_eq!(info.parent_id, "p1");
    assert_eq!(info.to_address, "xch1a");
    assert_eq!(info.mint_id, 0);
    assert_eq!(info.status, MintTaskStatus::Pending);
    assert_eq!(info.mint_image_url, None);
    assert_eq!(info.image, None);

    // The same deposit observed again.
    assert!(matches!(
        MintTaskRecord::create_if_absent(database.clone(), "p1", "xch1a"),
        Err(CreateError::Duplicate(parent_id)) if parent_id == "p1"
    ));

    // Failed insertion must not consume a mint id.
    let task = MintTaskRecord::create_if_absent(database.clone(), "p2", "xch1b")?;

    assert_eq!(task.mint_id()?, 1);
    assert_eq!(MintTaskRecord::all(database.clone())?.len(), 2);

    let found = MintTaskRecord::find(database.clone(), "p2")?
        .map(|task| task.id());

    assert_eq!(found, Some(task.id()));
    assert!(MintTaskRecord::find(database.clone(), "p3")?.is_none());

    let found = MintTaskRecord::find_by_mint_id(database.clone(), 1)?
        .map(|task| task.id());

    assert_eq!(found, Some(task.id()));

    Ok(())
}

#[test]
fn test_pending_order() -> anyhow::Result<()> {
    let database = Database::open_in_memory()?;

    for i in 0..5 {
        MintTaskRecord::create_if_absent(database.clone(), format!("p{i}"), "xch1a")?;
    }

    MintTaskRecord::find_by_mint_id(database.clone(), 1)?
        .unwrap()
        .update_status(MintTaskStatus::Minted)?;

    MintTaskRecord::find_by_mint_id(database.clone(), 3)?
        .unwrap()
        .update_status(MintTaskStatus::Failed)?;

    let pending = MintTaskRecord::pending(database.clone())?
        .into_iter()
        .map(|task| task.mint_id())
        .collect::<rusqlite::Result<Vec<_>>>()?;

    assert_eq!(pending, [0, 2, 4]);

    let failed = MintTaskRecord::by_status(database.clone(), MintTaskStatus::Failed)?;

    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].mint_id()?, 3);

    Ok(())
}

#[test]
fn test_concurrent_create() -> anyhow::Result<()> {
    let database = Database::open_in_memory()?;

    // Every thread observes the same deposits in a different order.
    let threads = (0..8)
        .map(|thread| {
            let database = database.clone();

            std::thread::spawn(move || {
                let mut created = 0;

                for i in 0..50 {
                    let parent_id = format!("p{}", (i + thread * 7) % 50);

                    match MintTaskRecord::create_if_absent(database.clone(), parent_id, "xch1a") {
                        Ok(_) => created += 1,
                        Err(CreateError::Duplicate(_)) => (),
                        Err(err) => panic!("{err}")
                    }
                }

                created
            })
        })
        .collect::<Vec<_>>();

    let created = threads.into_iter()
        .map(|thread| thread.join().unwrap())
        .sum::<usize>();

    assert_eq!(created, 50);

    let mint_ids = MintTaskRecord::all(database.clone())?
        .into_iter()
        .map(|task| task.mint_id())
        .collect::<rusqlite::Result<Vec<_>>>()?;

    assert_eq!(mint_ids, (0..50).collect::<Vec<u64>>());

    Ok(())
}

#[test]
fn test_concurrent_connections() -> anyhow::Result<()> {
    let folder = tempfile::tempdir()?;
    let path = folder.path().join("minft.db");

    // Make sure the schema exists before both watchers start.
    Database::open(&path)?;

    let threads = (0..2)
        .map(|_| {
            let path = path.clone();

            std::thread::spawn(move || -> anyhow::Result<()> {
                let database = Database::open(path)?;

                for i in 0..20 {
                    match MintTaskRecord::create_if_absent(database.clone(), format!("p{i}"), "xch1a") {
                        Ok(_) | Err(CreateError::Duplicate(_)) => (),
                        Err(err) => return Err(err.into())
                    }
                }

                Ok(())
            })
        })
        .collect::<Vec<_>>();

    for thread in threads {
        thread.join().unwrap()?;
    }

    let database = Database::open(&path)?;

    let mint_ids = MintTaskRecord::all(database)?
        .into_iter()
        .map(|task| task.mint_id())
        .collect::<rusqlite::Result<Vec<_>>>()?;

    assert_eq!(mint_ids, (0..20).collect::<Vec<u64>>());

    Ok(())
}

#[test]
fn test_fail_stranded_and_retry() -> anyhow::Result<()> {
    let database = Database::open_in_memory()?;

    let mut task = MintTaskRecord::create_if_absent(database.clone(), "p1", "xch1a")?;

    MintTaskRecord::create_if_absent(database.clone(), "p2", "xch1b")?;

    task.update_status(MintTaskStatus::Minting)?;

    // Only failed tasks can be retried.
    assert!(!task.retry()?);

    let stranded = MintTaskRecord::fail_stranded(database.clone())?;

    assert_eq!(stranded.len(), 1);
    assert_eq!(stranded[0].id(), task.id());
    assert_eq!(task.status()?, MintTaskStatus::Failed);

    assert!(MintTaskRecord::fail_stranded(database.clone())?.is_empty());

    assert!(task.retry()?);
    assert_eq!(task.status()?, MintTaskStatus::Pending);

    Ok(())
}

#[test]
fn test_published_content() -> anyhow::Result<()> {
    let database = Database::open_in_memory()?;

    let mut task = MintTaskRecord::create_if_absent(database.clone(), "p1", "xch1a")?;

    let image = PublishedContent {
        cid: String::from("bafyimage"),
        url: String::from("https://bafyimage.ipfs.nftstorage.link/"),
        hash: ContentHash::digest(b"image")
    };

    let metadata = PublishedContent {
        cid: String::from("bafymeta"),
        url: String::from("https://bafymeta.ipfs.nftstorage.link/"),
        hash: ContentHash::digest(b"metadata")
    };

    task.record_image(&image)?
        .record_metadata(&metadata)?;

    let info = task.info()?;

    assert_eq!(info.image.as_ref(), Some(&image));
    assert_eq!(info.metadata.as_ref(), Some(&metadata));

    assert!(task.set_mint_image_url(Some("/tmp/override.png"))?);

    let info = task.info()?;

    assert_eq!(info.mint_image_url.as_deref(), Some("/tmp/override.png"));
    assert_eq!(info.image, None);
    assert_eq!(info.metadata, Some(metadata));

    Ok(())
}

#[test]
fn test_override_minted_task() -> anyhow::Result<()> {
    let database = Database::open_in_memory()?;

    let mut task = MintTaskRecord::create_if_absent(database.clone(), "p1", "xch1a")?;

    let image = PublishedContent {
        cid: String::from("bafyimage"),
        url: String::from("https://bafyimage.ipfs.nftstorage.link/"),
        hash: ContentHash::digest(b"image")
    };

    task.record_image(&image)?
        .update_status(MintTaskStatus::Minted)?;

    assert!(!task.set_mint_image_url(Some("/tmp/override.png"))?);

    let info = task.info()?;

    assert_eq!(info.mint_image_url, None);
    assert_eq!(info.image, Some(image));

    task.update_status(MintTaskStatus::Minting)?;

    assert!(!task.set_mint_image_url(None)?);

    // Failed tasks can be repaired before retry.
    task.update_status(MintTaskStatus::Failed)?;

    assert!(task.set_mint_image_url(Some("/tmp/override.png"))?);

    Ok(())
}

#[test]
fn test_claim() -> anyhow::Result<()> {
    let folder = tempfile::tempdir()?;
    let path = folder.path().join("minft.db");

    // Two processes sharing the same data folder.
    let first = Database::open(&path)?;
    let second = Database::open(&path)?;

    MintTaskRecord::create_if_absent(first.clone(), "p1", "xch1a")?;
    MintTaskRecord::create_if_absent(first.clone(), "p2", "xch1b")?;

    let mut first_task = MintTaskRecord::find_by_mint_id(first.clone(), 0)?
        .expect("task must exist");

    let mut second_task = MintTaskRecord::find_by_mint_id(second.clone(), 0)?
        .expect("task must exist");

    let mut next_task = MintTaskRecord::find_by_mint_id(second.clone(), 1)?
        .expect("task must exist");

    assert!(first_task.claim()?);

    // Same task can't be claimed twice.
    assert!(!second_task.claim()?);

    // Nothing else can be claimed while a task is being minted.
    assert!(!next_task.claim()?);

    assert_eq!(next_task.status()?, MintTaskStatus::Pending);

    first_task.update_status(MintTaskStatus::Minted)?;

    assert!(!second_task.claim()?);
    assert!(next_task.claim()?);

    assert_eq!(first_task.status()?, MintTaskStatus::Minted);
    assert_eq!(next_task.status()?, MintTaskStatus::Minting);

    Ok(())
}
