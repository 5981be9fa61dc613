//! src/services/object_store.rs
//!
//! ObjectStoreService: per-tier façade over a remote object store. Each tier
//! has its own resolved [`TierConfig`] and its own [`ObjectBackend`] client,
//! created once and reused for every call.
//!
//! Cross-tier transfer is client-side: `copy` downloads and re-uploads, so
//! it works between unrelated endpoints and providers. `move` is `copy`
//! followed by deleting the source and is not atomic.

use async_trait::async_trait;
use bytes::Bytes;
use std::{sync::Arc, time::Duration};
use tracing::debug;
use url::Url;

use crate::{
    errors::{StrataError, StrataResult},
    models::{object::ObjectDescriptor, tier::StorageTier},
    services::tier_config::{StrataConfig, TierConfig, resolve_tier_config},
};

/// Primitives the engine needs from a remote object-store client.
#[async_trait]
pub trait ObjectBackend: Send + Sync {
    /// Write `data` at `key`, replacing any existing object.
    async fn put(&self, bucket: &str, key: &str, data: Bytes) -> StrataResult<()>;

    /// Read the object at `key`. Fails with `NotFound` when absent.
    async fn get(&self, bucket: &str, key: &str) -> StrataResult<Bytes>;

    /// Remove the object at `key`. Removing an absent key succeeds.
    async fn delete(&self, bucket: &str, key: &str) -> StrataResult<()>;

    /// Whether an object exists at `key`.
    async fn head(&self, bucket: &str, key: &str) -> StrataResult<bool>;

    /// Every object under `prefix`, following pagination to the end.
    async fn list(&self, bucket: &str, prefix: Option<&str>)
    -> StrataResult<Vec<ObjectDescriptor>>;

    /// Time-limited signed GET URL for `key`.
    async fn presign_get(&self, bucket: &str, key: &str, expires_in: Duration)
    -> StrataResult<String>;
}

/// One tier: its settings and the client talking to its endpoint.
#[derive(Clone)]
pub struct TierStore {
    pub config: TierConfig,
    backend: Arc<dyn ObjectBackend>,
}

impl TierStore {
    pub fn new(config: TierConfig, backend: Arc<dyn ObjectBackend>) -> Self {
        Self { config, backend }
    }
}

/// Dual-bucket object store used by the file manager.
#[derive(Clone)]
pub struct ObjectStoreService {
    hot: TierStore,
    cold: TierStore,
}

impl ObjectStoreService {
    pub fn new(hot: TierStore, cold: TierStore) -> Self {
        Self { hot, cold }
    }

    /// Resolve both tiers from `config` and build one backend per tier with
    /// `make_backend`.
    pub fn from_config<F>(config: &StrataConfig, mut make_backend: F) -> StrataResult<Self>
    where
        F: FnMut(&TierConfig) -> Arc<dyn ObjectBackend>,
    {
        let hot_config = resolve_tier_config(config, StorageTier::Hot)?;
        let cold_config = resolve_tier_config(config, StorageTier::Cold)?;
        let hot_backend = make_backend(&hot_config);
        let cold_backend = make_backend(&cold_config);
        Ok(Self::new(
            TierStore::new(hot_config, hot_backend),
            TierStore::new(cold_config, cold_backend),
        ))
    }

    fn tier(&self, tier: StorageTier) -> &TierStore {
        match tier {
            StorageTier::Hot => &self.hot,
            StorageTier::Cold => &self.cold,
        }
    }

    pub fn tier_config(&self, tier: StorageTier) -> &TierConfig {
        &self.tier(tier).config
    }

    pub fn bucket(&self, tier: StorageTier) -> &str {
        &self.tier(tier).config.bucket
    }

    pub async fn upload(&self, tier: StorageTier, path: &str, data: Bytes) -> StrataResult<()> {
        let store = self.tier(tier);
        debug!(%tier, bucket = %store.config.bucket, path, size = data.len(), "put object");
        store.backend.put(&store.config.bucket, path, data).await
    }

    pub async fn download(&self, tier: StorageTier, path: &str) -> StrataResult<Bytes> {
        let store = self.tier(tier);
        store.backend.get(&store.config.bucket, path).await
    }

    pub async fn delete(&self, tier: StorageTier, path: &str) -> StrataResult<()> {
        let store = self.tier(tier);
        debug!(%tier, bucket = %store.config.bucket, path, "delete object");
        store.backend.delete(&store.config.bucket, path).await
    }

    /// Existence probe. Any backend fault reads as "absent".
    pub async fn exists(&self, tier: StorageTier, path: &str) -> bool {
        let store = self.tier(tier);
        match store.backend.head(&store.config.bucket, path).await {
            Ok(found) => found,
            Err(err) => {
                debug!(%tier, path, error = %err, "existence probe failed; treating as absent");
                false
            }
        }
    }

    /// Download from the source and upload to the destination.
    pub async fn copy(
        &self,
        source_tier: StorageTier,
        source_path: &str,
        dest_tier: StorageTier,
        dest_path: &str,
    ) -> StrataResult<()> {
        let data = self.download(source_tier, source_path).await?;
        self.upload(dest_tier, dest_path, data).await
    }

    /// Whether two `(tier, path)` pairs name the same object: same endpoint,
    /// same bucket, same key.
    pub fn same_location(
        &self,
        source_tier: StorageTier,
        source_path: &str,
        dest_tier: StorageTier,
        dest_path: &str,
    ) -> bool {
        let source = self.tier_config(source_tier);
        let dest = self.tier_config(dest_tier);
        source_path == dest_path
            && source.bucket == dest.bucket
            && source.endpoint_url() == dest.endpoint_url()
    }

    /// Copy, then delete the source. The source is only touched once the
    /// destination write succeeded; a failed delete leaves both copies.
    /// Moving an object onto itself does nothing.
    pub async fn move_object(
        &self,
        source_tier: StorageTier,
        source_path: &str,
        dest_tier: StorageTier,
        dest_path: &str,
    ) -> StrataResult<()> {
        if self.same_location(source_tier, source_path, dest_tier, dest_path) {
            debug!(
                from = %source_tier,
                to = %dest_tier,
                path = source_path,
                "source and destination coincide; nothing to move"
            );
            return Ok(());
        }
        self.copy(source_tier, source_path, dest_tier, dest_path)
            .await?;
        self.delete(source_tier, source_path).await
    }

    pub async fn get_presigned_url(
        &self,
        tier: StorageTier,
        path: &str,
        expires_in: Duration,
    ) -> StrataResult<String> {
        let store = self.tier(tier);
        store
            .backend
            .presign_get(&store.config.bucket, path, expires_in)
            .await
    }

    /// Direct URL: `scheme://endpoint[:port]/bucket/path`, each path segment
    /// percent-encoded. Default ports are left out.
    pub fn get_public_url(&self, tier: StorageTier, path: &str) -> StrataResult<String> {
        let config = self.tier_config(tier);
        let invalid_endpoint = || StrataError::Configuration {
            tier,
            missing: format!("a valid endpoint (got `{}`)", config.endpoint),
        };
        let mut url = Url::parse(&config.endpoint_url()).map_err(|_| invalid_endpoint())?;
        url.path_segments_mut()
            .map_err(|_| invalid_endpoint())?
            .pop_if_empty()
            .push(&config.bucket)
            .extend(path.split('/'));
        Ok(url.to_string())
    }

    pub async fn list_objects(
        &self,
        tier: StorageTier,
        prefix: Option<&str>,
    ) -> StrataResult<Vec<ObjectDescriptor>> {
        let store = self.tier(tier);
        store.backend.list(&store.config.bucket, prefix).await
    }
}
