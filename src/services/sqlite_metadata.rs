//! src/services/sqlite_metadata.rs
//!
//! SqliteMetadataStore: durable [`MetadataPort`] backed by a single
//! `physical_files` table. Tier values are stored as `HOT`/`COLD` text and
//! normalized back into [`StorageTier`](crate::models::tier::StorageTier) when rows are read.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, QueryBuilder, SqlitePool, sqlite::Sqlite};
use std::sync::Arc;
use tracing::debug;

use crate::{
    errors::{StrataError, StrataResult},
    models::physical_file::{FileId, FileUpdate, NewPhysicalFile, PhysicalFile},
    services::metadata::MetadataPort,
};

const INIT_SQL: &str = include_str!("../../migrations/0001_init.sql");

const COLUMNS: &str = "id, storage_tier, filename, path, hot_until, created_at, updated_at";

#[derive(FromRow, Debug)]
struct FileRow {
    id: i64,
    storage_tier: String,
    filename: String,
    path: String,
    hot_until: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<FileRow> for PhysicalFile {
    type Error = StrataError;

    fn try_from(row: FileRow) -> Result<Self, Self::Error> {
        Ok(PhysicalFile {
            id: FileId::Int(row.id),
            storage_tier: row.storage_tier.parse()?,
            filename: row.filename,
            path: row.path,
            hot_until: row.hot_until,
            created_at: Some(row.created_at),
            updated_at: Some(row.updated_at),
        })
    }
}

#[derive(Clone, Debug)]
pub struct SqliteMetadataStore {
    /// Shared SQLite connection pool.
    pub db: Arc<SqlitePool>,
}

impl SqliteMetadataStore {
    pub fn new(db: Arc<SqlitePool>) -> Self {
        Self { db }
    }

    /// Create the schema if it is missing. Safe to run repeatedly.
    pub async fn migrate(&self) -> StrataResult<()> {
        let statements = INIT_SQL
            .split(';')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>();

        debug!("Running {} migration statements", statements.len());
        for stmt in statements {
            sqlx::query(stmt).execute(&*self.db).await?;
        }
        Ok(())
    }

    fn row_id(id: &FileId) -> StrataResult<i64> {
        match id {
            FileId::Int(id) => Ok(*id),
            FileId::Text(raw) => raw.parse().map_err(|_| StrataError::InvalidValue {
                kind: "file id",
                value: raw.clone(),
            }),
        }
    }

    async fn fetch_rows(&self, sql: &str, now: Option<DateTime<Utc>>) -> StrataResult<Vec<PhysicalFile>> {
        let mut query = sqlx::query_as::<_, FileRow>(sql);
        if let Some(now) = now {
            query = query.bind(now);
        }
        query
            .fetch_all(&*self.db)
            .await?
            .into_iter()
            .map(PhysicalFile::try_from)
            .collect()
    }
}

#[async_trait]
impl MetadataPort for SqliteMetadataStore {
    async fn create(&self, file: NewPhysicalFile) -> StrataResult<PhysicalFile> {
        let now = Utc::now();
        let row = sqlx::query_as::<_, FileRow>(&format!(
            "INSERT INTO physical_files (storage_tier, filename, path, hot_until, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?)
             RETURNING {COLUMNS}"
        ))
        .bind(file.storage_tier.as_str())
        .bind(&file.filename)
        .bind(&file.path)
        .bind(file.hot_until)
        .bind(now)
        .bind(now)
        .fetch_one(&*self.db)
        .await
        .map_err(|err| {
            if is_unique_violation(&err) {
                StrataError::Metadata(format!("a record for path `{}` already exists", file.path))
            } else {
                StrataError::Sqlx(err)
            }
        })?;

        row.try_into()
    }

    async fn find_by_id(&self, id: &FileId) -> StrataResult<Option<PhysicalFile>> {
        let Ok(row_id) = Self::row_id(id) else {
            return Ok(None);
        };
        sqlx::query_as::<_, FileRow>(&format!(
            "SELECT {COLUMNS} FROM physical_files WHERE id = ?"
        ))
        .bind(row_id)
        .fetch_optional(&*self.db)
        .await?
        .map(PhysicalFile::try_from)
        .transpose()
    }

    async fn update(&self, id: &FileId, update: FileUpdate) -> StrataResult<PhysicalFile> {
        let row_id = Self::row_id(id)?;

        let mut builder = QueryBuilder::<Sqlite>::new("UPDATE physical_files SET updated_at = ");
        builder.push_bind(Utc::now());
        if let Some(tier) = update.storage_tier {
            builder.push(", storage_tier = ");
            builder.push_bind(tier.as_str());
        }
        if let Some(path) = update.path {
            builder.push(", path = ");
            builder.push_bind(path);
        }
        if let Some(hot_until) = update.hot_until {
            builder.push(", hot_until = ");
            builder.push_bind(hot_until);
        }
        builder.push(" WHERE id = ");
        builder.push_bind(row_id);
        builder.push(format!(" RETURNING {COLUMNS}"));

        builder
            .build_query_as::<FileRow>()
            .fetch_optional(&*self.db)
            .await?
            .ok_or_else(|| StrataError::not_found(format!("file record {id}")))?
            .try_into()
    }

    async fn delete(&self, id: &FileId) -> StrataResult<()> {
        let result = sqlx::query("DELETE FROM physical_files WHERE id = ?")
            .bind(Self::row_id(id)?)
            .execute(&*self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StrataError::not_found(format!("file record {id}")));
        }
        Ok(())
    }

    async fn find_expired_hot_files(&self) -> StrataResult<Vec<PhysicalFile>> {
        self.fetch_rows(
            &format!(
                "SELECT {COLUMNS} FROM physical_files
                 WHERE storage_tier = 'HOT'
                   AND hot_until IS NOT NULL
                   AND julianday(hot_until) <= julianday(?)
                 ORDER BY id ASC"
            ),
            Some(Utc::now()),
        )
        .await
    }

    async fn find_all(&self) -> StrataResult<Vec<PhysicalFile>> {
        self.fetch_rows(
            &format!("SELECT {COLUMNS} FROM physical_files ORDER BY id ASC"),
            None,
        )
        .await
    }
}

/// Return true if SQLx error indicates a unique constraint violation.
fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Database(db_err) if db_err.message().to_ascii_lowercase().contains("unique")
    )
}
