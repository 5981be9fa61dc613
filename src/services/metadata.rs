//! Metadata port: the record store the file manager keeps in sync with the
//! buckets.
//!
//! Integrators implement [`MetadataPort`] over whatever database they use.
//! [`InMemoryMetadataStore`] is an explicit, injectable arena for tests and
//! development; [`SqliteMetadataStore`](super::sqlite_metadata::SqliteMetadataStore)
//! is a durable implementation.

use async_trait::async_trait;
use chrono::Utc;
use std::{collections::BTreeMap, sync::Arc};
use tokio::sync::Mutex;

use crate::{
    errors::{StrataError, StrataResult},
    models::{
        physical_file::{FileId, FileUpdate, NewPhysicalFile, PhysicalFile},
        tier::StorageTier,
    },
};

/// CRUD access to file records plus the two queries the engine relies on.
#[async_trait]
pub trait MetadataPort: Send + Sync {
    /// Insert a record; the backend assigns `id` and the timestamps.
    async fn create(&self, file: NewPhysicalFile) -> StrataResult<PhysicalFile>;

    async fn find_by_id(&self, id: &FileId) -> StrataResult<Option<PhysicalFile>>;

    /// Apply a partial update. Fails with `NotFound` if the record is gone.
    async fn update(&self, id: &FileId, update: FileUpdate) -> StrataResult<PhysicalFile>;

    async fn delete(&self, id: &FileId) -> StrataResult<()>;

    /// Every HOT record whose `hot_until` is at or before now.
    async fn find_expired_hot_files(&self) -> StrataResult<Vec<PhysicalFile>>;

    async fn find_all(&self) -> StrataResult<Vec<PhysicalFile>>;
}

#[derive(Debug, Default)]
struct Arena {
    records: BTreeMap<i64, PhysicalFile>,
    next_id: i64,
    fail_creates_for: Vec<String>,
}

/// Records keyed by a monotonically increasing integer id.
///
/// Clones share the same arena.
#[derive(Clone, Debug, Default)]
pub struct InMemoryMetadataStore {
    arena: Arc<Mutex<Arena>>,
}

impl InMemoryMetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.arena.lock().await.records.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Make `create` fail for records whose path is `path`.
    pub async fn fail_create_for(&self, path: impl Into<String>) {
        self.arena.lock().await.fail_creates_for.push(path.into());
    }

    /// Overwrite a stored record as-is, bypassing the port (for seeding
    /// states such as past `hot_until` values).
    pub async fn put_raw(&self, file: PhysicalFile) -> StrataResult<()> {
        let FileId::Int(id) = file.id else {
            return Err(StrataError::Metadata(format!(
                "in-memory store only holds integer ids, got `{}`",
                file.id
            )));
        };
        let mut arena = self.arena.lock().await;
        arena.next_id = arena.next_id.max(id);
        arena.records.insert(id, file);
        Ok(())
    }
}

fn int_id(id: &FileId) -> Option<i64> {
    match id {
        FileId::Int(id) => Some(*id),
        FileId::Text(raw) => raw.parse().ok(),
    }
}

#[async_trait]
impl MetadataPort for InMemoryMetadataStore {
    async fn create(&self, file: NewPhysicalFile) -> StrataResult<PhysicalFile> {
        let mut arena = self.arena.lock().await;
        if arena.fail_creates_for.iter().any(|p| *p == file.path) {
            return Err(StrataError::Metadata(format!(
                "simulated create failure for `{}`",
                file.path
            )));
        }
        if arena.records.values().any(|r| r.path == file.path) {
            return Err(StrataError::Metadata(format!(
                "a record for path `{}` already exists",
                file.path
            )));
        }

        arena.next_id += 1;
        let id = arena.next_id;
        let now = Utc::now();
        let record = PhysicalFile {
            id: FileId::Int(id),
            storage_tier: file.storage_tier,
            filename: file.filename,
            path: file.path,
            hot_until: file.hot_until,
            created_at: Some(now),
            updated_at: Some(now),
        };
        arena.records.insert(id, record.clone());
        Ok(record)
    }

    async fn find_by_id(&self, id: &FileId) -> StrataResult<Option<PhysicalFile>> {
        let arena = self.arena.lock().await;
        Ok(int_id(id).and_then(|id| arena.records.get(&id).cloned()))
    }

    async fn update(&self, id: &FileId, update: FileUpdate) -> StrataResult<PhysicalFile> {
        let mut arena = self.arena.lock().await;
        let record = int_id(id)
            .and_then(|key| arena.records.get_mut(&key))
            .ok_or_else(|| StrataError::not_found(format!("file record {id}")))?;
        update.apply_to(record);
        record.updated_at = Some(Utc::now());
        Ok(record.clone())
    }

    async fn delete(&self, id: &FileId) -> StrataResult<()> {
        let mut arena = self.arena.lock().await;
        int_id(id)
            .and_then(|key| arena.records.remove(&key))
            .map(|_| ())
            .ok_or_else(|| StrataError::not_found(format!("file record {id}")))
    }

    async fn find_expired_hot_files(&self) -> StrataResult<Vec<PhysicalFile>> {
        let now = Utc::now();
        let arena = self.arena.lock().await;
        Ok(arena
            .records
            .values()
            .filter(|r| r.storage_tier == StorageTier::Hot && r.is_hot_expired(now))
            .cloned()
            .collect())
    }

    async fn find_all(&self) -> StrataResult<Vec<PhysicalFile>> {
        let arena = self.arena.lock().await;
        Ok(arena.records.values().cloned().collect())
    }
}
