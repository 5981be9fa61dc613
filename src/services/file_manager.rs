//! src/services/file_manager.rs
//!
//! FileManager orchestrates the object store and the metadata port. Every
//! file lives at `(storage_tier, path)`, where the first path segment is its
//! visibility. Tier and visibility changes are copy, delete, then metadata
//! update: three steps that can fail independently. The source object is
//! only deleted after the destination write succeeded, so a failure leaves a
//! duplicate that a retry of the same move cleans up, and never loses data.

use bytes::Bytes;
use chrono::{DateTime, TimeDelta, Utc};
use std::{collections::HashSet, sync::Arc, time::Duration};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    errors::{StrataError, StrataResult},
    models::{
        object::{AllBucketObjects, BucketObjects, ObjectDescriptor, OrphanObject},
        options::{
            AdoptOrphanOptions, AdoptOrphanResult, ArchiveResult, BatchItemError,
            DeleteOrphanOptions, DeleteOrphanResult, SetTierOptions, SetVisibilityOptions,
            UploadOptions,
        },
        physical_file::{FileId, FileUpdate, NewPhysicalFile, PhysicalFile},
        tier::{FileVisibility, StorageTier},
    },
    services::{
        metadata::MetadataPort,
        object_store::{ObjectBackend, ObjectStoreService},
        path_codec::PathCodec,
        tier_config::{AdvancedOptions, StrataConfig, TierConfig},
    },
};

#[derive(Clone)]
pub struct FileManager {
    advanced: AdvancedOptions,
    metadata: Arc<dyn MetadataPort>,
    store: ObjectStoreService,
    paths: PathCodec,
}

impl FileManager {
    /// Resolve both tiers from `config` and build one backend per tier.
    ///
    /// Fails with `Configuration` if either tier cannot be resolved.
    pub fn new<F>(
        config: &StrataConfig,
        metadata: Arc<dyn MetadataPort>,
        make_backend: F,
    ) -> StrataResult<Self>
    where
        F: FnMut(&TierConfig) -> Arc<dyn ObjectBackend>,
    {
        let store = ObjectStoreService::from_config(config, make_backend)?;
        Ok(Self::with_store(config.advanced.clone(), metadata, store))
    }

    pub fn with_store(
        advanced: AdvancedOptions,
        metadata: Arc<dyn MetadataPort>,
        store: ObjectStoreService,
    ) -> Self {
        let paths = PathCodec::new(
            store.tier_config(StorageTier::Hot),
            store.tier_config(StorageTier::Cold),
        );
        Self {
            advanced,
            metadata,
            store,
            paths,
        }
    }

    pub fn object_store(&self) -> &ObjectStoreService {
        &self.store
    }

    pub fn advanced(&self) -> &AdvancedOptions {
        &self.advanced
    }

    /// Visibility of `file`, read from its path.
    pub fn visibility_of(&self, file: &PhysicalFile) -> StrataResult<FileVisibility> {
        self.paths.visibility_of(file.storage_tier, &file.path)
    }

    /// Store `data` and create its record.
    ///
    /// Missing options fall back to the configured defaults; the filename
    /// defaults to a fresh UUID and the suffix to `{uuid}-{filename}`.
    /// `hot_duration` only applies to HOT uploads.
    pub async fn upload(&self, data: Bytes, options: UploadOptions) -> StrataResult<PhysicalFile> {
        let size = data.len() as u64;
        if let Some(max) = self.advanced.max_file_size.filter(|max| size > *max) {
            return Err(StrataError::PayloadTooLarge { size, max });
        }

        let tier = options.tier.unwrap_or(self.advanced.default_storage_tier);
        let visibility = options
            .visibility
            .unwrap_or(self.advanced.default_visibility);
        let filename = options
            .filename
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let suffix = options
            .path_suffix
            .unwrap_or_else(|| format!("{}-{}", Uuid::new_v4(), filename));
        let path = self.paths.build_path(tier, visibility, &suffix);

        let hot_until = match (tier, options.hot_duration) {
            (StorageTier::Hot, Some(seconds)) => Some(hot_deadline(seconds)?),
            _ => None,
        };

        self.store.upload(tier, &path, data).await?;

        let file = self
            .metadata
            .create(NewPhysicalFile {
                storage_tier: tier,
                filename,
                path,
                hot_until,
            })
            .await
            .inspect_err(|err| {
                warn!(%tier, error = %err, "record creation failed after upload; object left untracked");
            })?;

        info!(
            file_id = %file.id,
            %tier,
            %visibility,
            path = %file.path,
            size,
            "uploaded file"
        );
        Ok(file)
    }

    /// Direct URL for PUBLIC files, presigned URL for PRIVATE ones.
    pub async fn get_url(
        &self,
        file: &PhysicalFile,
        expires_in: Option<Duration>,
    ) -> StrataResult<String> {
        match self.visibility_of(file)? {
            FileVisibility::Public => self.store.get_public_url(file.storage_tier, &file.path),
            FileVisibility::Private => {
                let expires_in = expires_in.unwrap_or(Duration::from_secs(
                    self.advanced.default_presigned_url_expiration,
                ));
                self.store
                    .get_presigned_url(file.storage_tier, &file.path, expires_in)
                    .await
            }
        }
    }

    /// Move `file` between the public and private prefix of its tier.
    ///
    /// Returns `file` untouched, without any store call, when it already has
    /// the requested visibility.
    pub async fn set_visibility(
        &self,
        file: &PhysicalFile,
        options: SetVisibilityOptions,
    ) -> StrataResult<PhysicalFile> {
        let tier = file.storage_tier;
        let (current, suffix) = self.paths.split(tier, &file.path)?;
        if current == options.visibility {
            return Ok(file.clone());
        }

        let new_path = self.paths.build_path(tier, options.visibility, suffix);
        if options.move_file {
            self.store
                .move_object(tier, &file.path, tier, &new_path)
                .await?;
        }

        let updated = self
            .metadata
            .update(
                &file.id,
                FileUpdate {
                    path: Some(new_path),
                    ..FileUpdate::default()
                },
            )
            .await?;

        info!(
            file_id = %file.id,
            %tier,
            from = %current,
            to = %options.visibility,
            path = %updated.path,
            "changed visibility"
        );
        Ok(updated)
    }

    /// Move `file` to another tier.
    ///
    /// Going COLD always clears `hot_until`. Going HOT sets it only when
    /// `hot_duration` is given. A path with a visibility prefix keeps its
    /// visibility and suffix but takes the destination tier's prefix; any
    /// other path moves unchanged.
    pub async fn set_tier(
        &self,
        file: &PhysicalFile,
        options: SetTierOptions,
    ) -> StrataResult<PhysicalFile> {
        let current = file.storage_tier;
        let target = options.tier;
        if current == target {
            return Ok(file.clone());
        }

        let new_path = self.paths.rebase(current, target, &file.path);

        let hot_until = match (target, options.hot_duration) {
            (StorageTier::Cold, _) => Some(None),
            (StorageTier::Hot, Some(seconds)) => Some(Some(hot_deadline(seconds)?)),
            (StorageTier::Hot, None) => None,
        };

        if options.move_file {
            self.store
                .move_object(current, &file.path, target, &new_path)
                .await?;
        }

        let update = FileUpdate {
            storage_tier: Some(target),
            path: (new_path != file.path).then_some(new_path),
            hot_until,
        };
        let updated = self.metadata.update(&file.id, update).await?;

        info!(
            file_id = %file.id,
            from = %current,
            to = %target,
            path = %updated.path,
            moved = options.move_file,
            "changed storage tier"
        );
        Ok(updated)
    }

    /// Set how long a HOT file stays HOT, counted from now.
    ///
    /// `None` keeps it HOT permanently and `Some(0)` makes it eligible for
    /// archival right away. COLD files are rejected.
    pub async fn set_hot_duration(
        &self,
        file: &PhysicalFile,
        duration: Option<u64>,
    ) -> StrataResult<PhysicalFile> {
        if file.storage_tier != StorageTier::Hot {
            return Err(StrataError::InvalidOperation(format!(
                "hot duration can only be set on HOT files; file {} is {}",
                file.id, file.storage_tier
            )));
        }

        let hot_until = duration.map(hot_deadline).transpose()?;
        let updated = self
            .metadata
            .update(
                &file.id,
                FileUpdate {
                    hot_until: Some(hot_until),
                    ..FileUpdate::default()
                },
            )
            .await?;

        debug!(file_id = %file.id, hot_until = ?updated.hot_until, "set hot duration");
        Ok(updated)
    }

    /// Delete the object, then the record.
    pub async fn delete(&self, file: &PhysicalFile) -> StrataResult<()> {
        self.store.delete(file.storage_tier, &file.path).await?;
        self.metadata.delete(&file.id).await?;
        info!(file_id = %file.id, tier = %file.storage_tier, path = %file.path, "deleted file");
        Ok(())
    }

    /// Whether the object behind `file` is present in its tier.
    pub async fn exists(&self, file: &PhysicalFile) -> bool {
        self.store.exists(file.storage_tier, &file.path).await
    }

    pub async fn get_by_id(&self, id: &FileId) -> StrataResult<Option<PhysicalFile>> {
        self.metadata.find_by_id(id).await
    }

    pub async fn download(&self, file: &PhysicalFile) -> StrataResult<Bytes> {
        self.store.download(file.storage_tier, &file.path).await
    }

    /// Move every expired HOT file to COLD; returns how many moved.
    ///
    /// Individual failures are logged and skipped.
    pub async fn archive_expired_hot_files(&self) -> StrataResult<usize> {
        let result = self
            .archive_expired_hot_files_until(&CancellationToken::new())
            .await?;
        Ok(result.archived)
    }

    /// Housekeeping sweep with per-item failure isolation. `cancel` is
    /// checked before each file; files already moved stay moved.
    pub async fn archive_expired_hot_files_until(
        &self,
        cancel: &CancellationToken,
    ) -> StrataResult<ArchiveResult> {
        let expired = self.metadata.find_expired_hot_files().await?;
        let mut result = ArchiveResult::default();

        for file in &expired {
            if cancel.is_cancelled() {
                result.cancelled = true;
                break;
            }
            match self
                .set_tier(file, SetTierOptions::new(StorageTier::Cold))
                .await
            {
                Ok(_) => result.archived += 1,
                Err(err) => {
                    warn!(file_id = %file.id, path = %file.path, error = %err, "failed to archive file");
                    result.failed += 1;
                    result.errors.push(BatchItemError {
                        path: file.path.clone(),
                        error: err.to_string(),
                    });
                }
            }
        }

        info!(
            candidates = expired.len(),
            archived = result.archived,
            failed = result.failed,
            cancelled = result.cancelled,
            "housekeeping sweep finished"
        );
        Ok(result)
    }

    pub async fn list_files(&self) -> StrataResult<Vec<PhysicalFile>> {
        self.metadata.find_all().await
    }

    /// Both buckets' contents under `prefix`, listed concurrently.
    pub async fn list_all_objects(&self, prefix: Option<&str>) -> StrataResult<AllBucketObjects> {
        let (hot, cold) = futures::try_join!(
            self.store.list_objects(StorageTier::Hot, prefix),
            self.store.list_objects(StorageTier::Cold, prefix),
        )?;

        let hot = self.bucket_objects(StorageTier::Hot, hot);
        let cold = self.bucket_objects(StorageTier::Cold, cold);
        Ok(AllBucketObjects {
            total_count: hot.count + cold.count,
            hot,
            cold,
            collected_at: Utc::now(),
        })
    }

    fn bucket_objects(&self, tier: StorageTier, objects: Vec<ObjectDescriptor>) -> BucketObjects {
        BucketObjects {
            tier,
            bucket: self.store.bucket(tier).to_string(),
            count: objects.len(),
            objects,
        }
    }

    /// Objects in either bucket whose key matches no record's path, HOT
    /// orphans first.
    pub async fn list_orphan_objects(&self, prefix: Option<&str>) -> StrataResult<Vec<OrphanObject>> {
        let (hot, cold, records) = futures::try_join!(
            self.store.list_objects(StorageTier::Hot, prefix),
            self.store.list_objects(StorageTier::Cold, prefix),
            self.metadata.find_all(),
        )?;

        let known: HashSet<&str> = records.iter().map(|r| r.path.as_str()).collect();
        let mut orphans = Vec::new();
        for (tier, objects) in [(StorageTier::Hot, hot), (StorageTier::Cold, cold)] {
            let bucket = self.store.bucket(tier);
            orphans.extend(
                objects
                    .into_iter()
                    .filter(|obj| !known.contains(obj.key.as_str()))
                    .map(|object| OrphanObject {
                        object,
                        tier,
                        bucket: bucket.to_string(),
                    }),
            );
        }

        debug!(
            orphans = orphans.len(),
            records = records.len(),
            prefix = prefix.unwrap_or(""),
            "listed orphan objects"
        );
        Ok(orphans)
    }

    async fn matching_orphans(
        &self,
        prefix: Option<&str>,
        tier: Option<StorageTier>,
    ) -> StrataResult<Vec<OrphanObject>> {
        let mut orphans = self.list_orphan_objects(prefix).await?;
        if let Some(tier) = tier {
            orphans.retain(|orphan| orphan.tier == tier);
        }
        Ok(orphans)
    }

    /// Remove untracked objects from the store. With `dry_run` nothing is
    /// deleted but the would-be deletions are reported.
    pub async fn delete_orphan_objects(
        &self,
        options: DeleteOrphanOptions,
    ) -> StrataResult<DeleteOrphanResult> {
        let orphans = self
            .matching_orphans(options.prefix.as_deref(), options.tier)
            .await?;
        let mut result = DeleteOrphanResult {
            dry_run: options.dry_run,
            ..DeleteOrphanResult::default()
        };

        for orphan in orphans {
            let outcome = if options.dry_run {
                Ok(())
            } else {
                self.store.delete(orphan.tier, orphan.key()).await
            };
            match outcome {
                Ok(()) => {
                    result.deleted += 1;
                    result.deleted_paths.push(orphan.object.key);
                }
                Err(err) => {
                    warn!(tier = %orphan.tier, path = %orphan.key(), error = %err, "failed to delete orphan");
                    result.failed += 1;
                    result.errors.push(BatchItemError {
                        path: orphan.object.key,
                        error: err.to_string(),
                    });
                }
            }
        }

        info!(
            deleted = result.deleted,
            failed = result.failed,
            dry_run = result.dry_run,
            "orphan deletion finished"
        );
        Ok(result)
    }

    /// Create records for untracked objects, pointing at their existing keys.
    pub async fn adopt_orphan_objects(
        &self,
        options: AdoptOrphanOptions,
    ) -> StrataResult<AdoptOrphanResult> {
        let orphans = self
            .matching_orphans(options.prefix.as_deref(), options.tier)
            .await?;
        let mut result = AdoptOrphanResult::default();

        for orphan in orphans {
            match self.adopt_one(&orphan, &options).await {
                Ok(file) => {
                    result.adopted += 1;
                    result.adopted_file_ids.push(file.id);
                }
                Err(err) => {
                    warn!(tier = %orphan.tier, path = %orphan.key(), error = %err, "failed to adopt orphan");
                    result.failed += 1;
                    result.errors.push(BatchItemError {
                        path: orphan.object.key,
                        error: err.to_string(),
                    });
                }
            }
        }

        info!(
            adopted = result.adopted,
            failed = result.failed,
            "orphan adoption finished"
        );
        Ok(result)
    }

    async fn adopt_one(
        &self,
        orphan: &OrphanObject,
        options: &AdoptOrphanOptions,
    ) -> StrataResult<PhysicalFile> {
        let key = orphan.key();
        let filename = match &options.extract_filename {
            Some(extract) => extract(key),
            None => last_segment(key).to_string(),
        };

        let hot_until = match (orphan.tier, options.set_hot_until, options.hot_duration) {
            (StorageTier::Hot, true, Some(seconds)) => Some(hot_deadline(seconds)?),
            _ => None,
        };

        self.metadata
            .create(NewPhysicalFile {
                storage_tier: orphan.tier,
                filename,
                path: key.to_string(),
                hot_until,
            })
            .await
    }
}

fn last_segment(key: &str) -> &str {
    key.rsplit('/').next().unwrap_or(key)
}

/// `now + seconds`, rejecting durations past the representable range.
fn hot_deadline(seconds: u64) -> StrataResult<DateTime<Utc>> {
    i64::try_from(seconds)
        .ok()
        .and_then(TimeDelta::try_seconds)
        .and_then(|delta| Utc::now().checked_add_signed(delta))
        .ok_or_else(|| StrataError::InvalidValue {
            kind: "hot duration",
            value: seconds.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{
        memory_backend::{BackendOp, MemoryBackend},
        metadata::InMemoryMetadataStore,
    };

    struct Fixture {
        manager: FileManager,
        backend: MemoryBackend,
        records: InMemoryMetadataStore,
    }

    fn fixture(advanced: AdvancedOptions) -> Fixture {
        let backend = MemoryBackend::new();
        let records = InMemoryMetadataStore::new();
        let config = StrataConfig::shared("s3.example.com", "key", "secret", "hot", "cold")
            .with_advanced(advanced);
        let shared = backend.clone();
        let manager = FileManager::new(&config, Arc::new(records.clone()), move |_| {
            Arc::new(shared.clone()) as Arc<dyn ObjectBackend>
        })
        .unwrap();
        Fixture {
            manager,
            backend,
            records,
        }
    }

    fn upload_opts(tier: StorageTier, visibility: FileVisibility) -> UploadOptions {
        UploadOptions {
            tier: Some(tier),
            visibility: Some(visibility),
            filename: Some("report.pdf".into()),
            ..UploadOptions::default()
        }
    }

    #[tokio::test]
    async fn upload_uses_defaults_and_generates_names() {
        let fx = fixture(AdvancedOptions::default());
        let file = fx
            .manager
            .upload(Bytes::from_static(b"abc"), UploadOptions::default())
            .await
            .unwrap();

        assert_eq!(file.storage_tier, StorageTier::Hot);
        assert!(file.path.starts_with("private/"));
        assert!(file.path.ends_with(&format!("-{}", file.filename)));
        assert_eq!(file.hot_until, None);
        assert_eq!(
            fx.backend.object("hot", &file.path).await,
            Some(Bytes::from_static(b"abc"))
        );
    }

    #[tokio::test]
    async fn upload_respects_explicit_suffix_and_size_limit() {
        let fx = fixture(AdvancedOptions {
            max_file_size: Some(4),
            ..AdvancedOptions::default()
        });
        let file = fx
            .manager
            .upload(
                Bytes::from_static(b"1234"),
                UploadOptions {
                    visibility: Some(FileVisibility::Public),
                    path_suffix: Some("docs/a.txt".into()),
                    ..UploadOptions::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(file.path, "public/docs/a.txt");

        let err = fx
            .manager
            .upload(Bytes::from_static(b"12345"), UploadOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, StrataError::PayloadTooLarge { size: 5, max: 4 }));
        assert_eq!(fx.records.len().await, 1);
    }

    #[tokio::test]
    async fn hot_duration_ignored_for_cold_uploads() {
        let fx = fixture(AdvancedOptions::default());
        let mut opts = upload_opts(StorageTier::Cold, FileVisibility::Private);
        opts.hot_duration = Some(60);
        let file = fx.manager.upload(Bytes::new(), opts).await.unwrap();
        assert_eq!(file.hot_until, None);

        let mut opts = upload_opts(StorageTier::Hot, FileVisibility::Private);
        opts.hot_duration = Some(60);
        let file = fx.manager.upload(Bytes::new(), opts).await.unwrap();
        assert!(file.hot_until.unwrap() > Utc::now());
    }

    #[tokio::test]
    async fn urls_follow_visibility() {
        let fx = fixture(AdvancedOptions::default());
        let public = fx
            .manager
            .upload(Bytes::new(), upload_opts(StorageTier::Hot, FileVisibility::Public))
            .await
            .unwrap();
        let private = fx
            .manager
            .upload(Bytes::new(), upload_opts(StorageTier::Hot, FileVisibility::Private))
            .await
            .unwrap();

        let url = fx.manager.get_url(&public, None).await.unwrap();
        assert_eq!(url, format!("https://s3.example.com/hot/{}", public.path));

        let url = fx.manager.get_url(&private, None).await.unwrap();
        assert!(url.contains("X-Amz-Expires=14400"));
        let url = fx
            .manager
            .get_url(&private, Some(Duration::from_secs(30)))
            .await
            .unwrap();
        assert!(url.contains("X-Amz-Expires=30"));
    }

    #[tokio::test]
    async fn visibility_change_moves_object_and_updates_path() {
        let fx = fixture(AdvancedOptions::default());
        let file = fx
            .manager
            .upload(
                Bytes::from_static(b"x"),
                upload_opts(StorageTier::Hot, FileVisibility::Private),
            )
            .await
            .unwrap();

        let public = fx
            .manager
            .set_visibility(&file, SetVisibilityOptions::new(FileVisibility::Public))
            .await
            .unwrap();
        assert_eq!(public.path, file.path.replacen("private/", "public/", 1));
        assert!(fx.backend.object("hot", &file.path).await.is_none());
        assert!(fx.backend.object("hot", &public.path).await.is_some());

        let back = fx
            .manager
            .set_visibility(&public, SetVisibilityOptions::new(FileVisibility::Private))
            .await
            .unwrap();
        assert_eq!(back.path, file.path);
    }

    #[tokio::test]
    async fn unchanged_visibility_touches_nothing() {
        let fx = fixture(AdvancedOptions::default());
        let file = fx
            .manager
            .upload(Bytes::new(), upload_opts(StorageTier::Hot, FileVisibility::Public))
            .await
            .unwrap();
        fx.backend.fail_next(BackendOp::Get).await;
        fx.backend.fail_next(BackendOp::Put).await;

        let same = fx
            .manager
            .set_visibility(&file, SetVisibilityOptions::new(FileVisibility::Public))
            .await
            .unwrap();
        assert_eq!(same, file);
        // The armed faults are still pending, so no store call happened.
        assert!(fx.backend.put("hot", "probe", Bytes::new()).await.is_err());
    }

    #[tokio::test]
    async fn visibility_without_move_only_rewrites_record() {
        let fx = fixture(AdvancedOptions::default());
        let file = fx
            .manager
            .upload(Bytes::new(), upload_opts(StorageTier::Hot, FileVisibility::Private))
            .await
            .unwrap();
        let updated = fx
            .manager
            .set_visibility(
                &file,
                SetVisibilityOptions {
                    visibility: FileVisibility::Public,
                    move_file: false,
                },
            )
            .await
            .unwrap();
        assert!(updated.path.starts_with("public/"));
        assert!(fx.backend.object("hot", &file.path).await.is_some());
        assert!(!fx.manager.exists(&updated).await);
    }

    #[tokio::test]
    async fn tier_changes_manage_hot_until() {
        let fx = fixture(AdvancedOptions::default());
        let mut opts = upload_opts(StorageTier::Hot, FileVisibility::Private);
        opts.hot_duration = Some(3600);
        let file = fx.manager.upload(Bytes::from_static(b"d"), opts).await.unwrap();

        let cold = fx
            .manager
            .set_tier(&file, SetTierOptions::new(StorageTier::Cold))
            .await
            .unwrap();
        assert_eq!(cold.storage_tier, StorageTier::Cold);
        assert_eq!(cold.hot_until, None);
        assert_eq!(cold.path, file.path);
        assert!(fx.backend.object("cold", &file.path).await.is_some());
        assert!(fx.backend.object("hot", &file.path).await.is_none());

        let hot = fx
            .manager
            .set_tier(&cold, SetTierOptions::new(StorageTier::Hot))
            .await
            .unwrap();
        assert_eq!(hot.hot_until, None);

        let cold = fx
            .manager
            .set_tier(&hot, SetTierOptions::new(StorageTier::Cold))
            .await
            .unwrap();
        let mut to_hot = SetTierOptions::new(StorageTier::Hot);
        to_hot.hot_duration = Some(120);
        let hot = fx.manager.set_tier(&cold, to_hot).await.unwrap();
        assert!(hot.hot_until.unwrap() > Utc::now());
    }

    #[tokio::test]
    async fn failed_tier_move_keeps_record_and_source() {
        let fx = fixture(AdvancedOptions::default());
        let file = fx
            .manager
            .upload(Bytes::from_static(b"d"), upload_opts(StorageTier::Hot, FileVisibility::Public))
            .await
            .unwrap();
        fx.backend.fail_next(BackendOp::Put).await;

        assert!(
            fx.manager
                .set_tier(&file, SetTierOptions::new(StorageTier::Cold))
                .await
                .is_err()
        );
        let stored = fx.manager.get_by_id(&file.id).await.unwrap().unwrap();
        assert_eq!(stored.storage_tier, StorageTier::Hot);
        assert!(fx.manager.exists(&stored).await);
    }

    #[tokio::test]
    async fn hot_duration_semantics() {
        let fx = fixture(AdvancedOptions::default());
        let file = fx
            .manager
            .upload(Bytes::new(), upload_opts(StorageTier::Hot, FileVisibility::Private))
            .await
            .unwrap();

        let now = fx.manager.set_hot_duration(&file, Some(0)).await.unwrap();
        assert!(now.hot_until.unwrap() <= Utc::now());

        let later = fx.manager.set_hot_duration(&file, Some(600)).await.unwrap();
        let delta = later.hot_until.unwrap() - Utc::now();
        assert!(delta > TimeDelta::seconds(590) && delta <= TimeDelta::seconds(600));

        let forever = fx.manager.set_hot_duration(&file, None).await.unwrap();
        assert_eq!(forever.hot_until, None);

        let cold = fx
            .manager
            .set_tier(&file, SetTierOptions::new(StorageTier::Cold))
            .await
            .unwrap();
        assert!(matches!(
            fx.manager.set_hot_duration(&cold, Some(10)).await,
            Err(StrataError::InvalidOperation(_))
        ));
    }

    #[tokio::test]
    async fn delete_removes_object_then_record() {
        let fx = fixture(AdvancedOptions::default());
        let file = fx
            .manager
            .upload(Bytes::from_static(b"z"), UploadOptions::default())
            .await
            .unwrap();

        fx.backend.fail_next(BackendOp::Delete).await;
        assert!(fx.manager.delete(&file).await.is_err());
        assert!(fx.manager.get_by_id(&file.id).await.unwrap().is_some());

        fx.manager.delete(&file).await.unwrap();
        assert!(!fx.manager.exists(&file).await);
        assert_eq!(fx.manager.get_by_id(&file.id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn sweep_stops_when_cancelled() {
        let fx = fixture(AdvancedOptions::default());
        for _ in 0..3 {
            let mut opts = upload_opts(StorageTier::Hot, FileVisibility::Private);
            opts.hot_duration = Some(0);
            fx.manager.upload(Bytes::new(), opts).await.unwrap();
        }

        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = fx
            .manager
            .archive_expired_hot_files_until(&cancel)
            .await
            .unwrap();
        assert!(result.cancelled);
        assert_eq!(result.archived, 0);

        assert_eq!(fx.manager.archive_expired_hot_files().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn sweep_isolates_failures() {
        let fx = fixture(AdvancedOptions::default());
        let mut paths = Vec::new();
        for name in ["a", "b"] {
            let mut opts = upload_opts(StorageTier::Hot, FileVisibility::Private);
            opts.path_suffix = Some(name.into());
            opts.hot_duration = Some(0);
            paths.push(fx.manager.upload(Bytes::new(), opts).await.unwrap().path);
        }
        fx.backend.fail_key(BackendOp::Get, paths[0].clone()).await;

        let result = fx
            .manager
            .archive_expired_hot_files_until(&CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(result.archived, 1);
        assert_eq!(result.failed, 1);
        assert_eq!(result.errors[0].path, paths[0]);
    }

    #[tokio::test]
    async fn orphans_are_listed_per_tier() {
        let fx = fixture(AdvancedOptions::default());
        let tracked = fx
            .manager
            .upload(Bytes::new(), upload_opts(StorageTier::Hot, FileVisibility::Public))
            .await
            .unwrap();
        fx.backend.insert_raw("hot", "public/stray.png", "s").await;
        fx.backend.insert_raw("cold", "private/old.bin", "o").await;

        let orphans = fx.manager.list_orphan_objects(None).await.unwrap();
        let found: Vec<(StorageTier, &str, &str)> = orphans
            .iter()
            .map(|o| (o.tier, o.bucket.as_str(), o.key()))
            .collect();
        assert_eq!(
            found,
            vec![
                (StorageTier::Hot, "hot", "public/stray.png"),
                (StorageTier::Cold, "cold", "private/old.bin"),
            ]
        );
        assert!(orphans.iter().all(|o| o.key() != tracked.path));

        let all = fx.manager.list_all_objects(Some("public/")).await.unwrap();
        assert_eq!(all.hot.count, 2);
        assert_eq!(all.cold.count, 0);
        assert_eq!(all.total_count, 2);
    }

    #[tokio::test]
    async fn dry_run_deletes_nothing() {
        let fx = fixture(AdvancedOptions::default());
        fx.backend.insert_raw("hot", "public/stray", "s").await;

        let result = fx
            .manager
            .delete_orphan_objects(DeleteOrphanOptions {
                dry_run: true,
                ..DeleteOrphanOptions::default()
            })
            .await
            .unwrap();
        assert!(result.dry_run);
        assert_eq!(result.deleted_paths, vec!["public/stray"]);
        assert_eq!(fx.backend.object_count("hot").await, 1);
    }

    #[tokio::test]
    async fn adoption_creates_records_with_optional_expiry() {
        let fx = fixture(AdvancedOptions::default());
        fx.backend.insert_raw("hot", "public/img/cat.png", "c").await;
        fx.backend.insert_raw("cold", "private/dog.png", "d").await;

        let result = fx
            .manager
            .adopt_orphan_objects(AdoptOrphanOptions {
                set_hot_until: true,
                hot_duration: Some(60),
                ..AdoptOrphanOptions::default()
            })
            .await
            .unwrap();
        assert_eq!(result.adopted, 2);
        assert_eq!(result.failed, 0);

        let files = fx.manager.list_files().await.unwrap();
        let cat = files.iter().find(|f| f.filename == "cat.png").unwrap();
        let dog = files.iter().find(|f| f.filename == "dog.png").unwrap();
        assert_eq!(cat.storage_tier, StorageTier::Hot);
        assert!(cat.hot_until.is_some());
        assert_eq!(dog.storage_tier, StorageTier::Cold);
        assert_eq!(dog.hot_until, None);

        assert!(fx.manager.list_orphan_objects(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn adoption_honours_tier_filter_and_extractor() {
        let fx = fixture(AdvancedOptions::default());
        fx.backend.insert_raw("hot", "public/a.txt", "a").await;
        fx.backend.insert_raw("cold", "public/b.txt", "b").await;

        let result = fx
            .manager
            .adopt_orphan_objects(AdoptOrphanOptions {
                tier: Some(StorageTier::Cold),
                extract_filename: Some(Arc::new(|key: &str| key.to_uppercase())),
                ..AdoptOrphanOptions::default()
            })
            .await
            .unwrap();
        assert_eq!(result.adopted, 1);

        let files = fx.manager.list_files().await.unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].filename, "PUBLIC/B.TXT");
    }

    #[test]
    fn deadline_rejects_overflow() {
        assert!(hot_deadline(u64::MAX).is_err());
        assert!(hot_deadline(10).unwrap() > Utc::now());
    }
}
