//! In-memory object backend.
//!
//! Keeps every bucket in a `BTreeMap` so listings come back in key order, the
//! way S3 returns them. Clones share the same buckets, which lets one
//! instance serve both tiers and lets tests inspect what the engine wrote.
//!
//! Faults can be forced per operation (next call only) or per key (until
//! cleared) to exercise partial failures of moves and batches.

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::{
    collections::{BTreeMap, HashMap, HashSet},
    sync::Arc,
    time::Duration,
};
use tokio::sync::Mutex;

use crate::{
    errors::{StrataError, StrataResult},
    models::object::ObjectDescriptor,
    services::object_store::ObjectBackend,
};

const PRESIGN_HOST: &str = "http://memory.local";

/// Backend operation a fault can be attached to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BackendOp {
    Put,
    Get,
    Delete,
    Head,
    List,
    Presign,
}

impl BackendOp {
    fn name(self) -> &'static str {
        match self {
            BackendOp::Put => "put",
            BackendOp::Get => "get",
            BackendOp::Delete => "delete",
            BackendOp::Head => "head",
            BackendOp::List => "list",
            BackendOp::Presign => "presign",
        }
    }
}

#[derive(Clone, Debug)]
struct StoredObject {
    data: Bytes,
    etag: String,
    last_modified: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct Faults {
    next: HashSet<BackendOp>,
    keys: HashSet<(BackendOp, String)>,
}

#[derive(Debug, Default)]
struct State {
    buckets: HashMap<String, BTreeMap<String, StoredObject>>,
    faults: Faults,
}

#[derive(Clone, Debug, Default)]
pub struct MemoryBackend {
    state: Arc<Mutex<State>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next call of `op`, whatever its key.
    pub async fn fail_next(&self, op: BackendOp) {
        self.state.lock().await.faults.next.insert(op);
    }

    /// Fail every call of `op` on `key` until [`clear_faults`](Self::clear_faults).
    pub async fn fail_key(&self, op: BackendOp, key: impl Into<String>) {
        self.state
            .lock()
            .await
            .faults
            .keys
            .insert((op, key.into()));
    }

    pub async fn clear_faults(&self) {
        self.state.lock().await.faults = Faults::default();
    }

    /// Raw object content, bypassing fault injection.
    pub async fn object(&self, bucket: &str, key: &str) -> Option<Bytes> {
        let state = self.state.lock().await;
        state
            .buckets
            .get(bucket)
            .and_then(|objects| objects.get(key))
            .map(|obj| obj.data.clone())
    }

    /// Seed an object directly, bypassing fault injection.
    pub async fn insert_raw(&self, bucket: &str, key: &str, data: impl Into<Bytes>) {
        let data = data.into();
        let mut state = self.state.lock().await;
        state
            .buckets
            .entry(bucket.to_string())
            .or_default()
            .insert(key.to_string(), stored(data));
    }

    pub async fn object_count(&self, bucket: &str) -> usize {
        let state = self.state.lock().await;
        state.buckets.get(bucket).map_or(0, BTreeMap::len)
    }

    fn check_fault(state: &mut State, op: BackendOp, key: &str) -> StrataResult<()> {
        let forced = state.faults.next.remove(&op);
        if forced || state.faults.keys.contains(&(op, key.to_string())) {
            return Err(StrataError::transport(
                op.name(),
                format!("simulated failure for `{key}`"),
            ));
        }
        Ok(())
    }
}

fn stored(data: Bytes) -> StoredObject {
    StoredObject {
        etag: format!("\"{:x}\"", md5::compute(&data)),
        data,
        last_modified: Utc::now(),
    }
}

#[async_trait]
impl ObjectBackend for MemoryBackend {
    async fn put(&self, bucket: &str, key: &str, data: Bytes) -> StrataResult<()> {
        let mut state = self.state.lock().await;
        Self::check_fault(&mut state, BackendOp::Put, key)?;
        state
            .buckets
            .entry(bucket.to_string())
            .or_default()
            .insert(key.to_string(), stored(data));
        Ok(())
    }

    async fn get(&self, bucket: &str, key: &str) -> StrataResult<Bytes> {
        let mut state = self.state.lock().await;
        Self::check_fault(&mut state, BackendOp::Get, key)?;
        state
            .buckets
            .get(bucket)
            .and_then(|objects| objects.get(key))
            .map(|obj| obj.data.clone())
            .ok_or_else(|| StrataError::not_found(format!("object `{key}` in bucket `{bucket}`")))
    }

    async fn delete(&self, bucket: &str, key: &str) -> StrataResult<()> {
        let mut state = self.state.lock().await;
        Self::check_fault(&mut state, BackendOp::Delete, key)?;
        if let Some(objects) = state.buckets.get_mut(bucket) {
            objects.remove(key);
        }
        Ok(())
    }

    async fn head(&self, bucket: &str, key: &str) -> StrataResult<bool> {
        let mut state = self.state.lock().await;
        Self::check_fault(&mut state, BackendOp::Head, key)?;
        Ok(state
            .buckets
            .get(bucket)
            .is_some_and(|objects| objects.contains_key(key)))
    }

    async fn list(
        &self,
        bucket: &str,
        prefix: Option<&str>,
    ) -> StrataResult<Vec<ObjectDescriptor>> {
        let mut state = self.state.lock().await;
        Self::check_fault(&mut state, BackendOp::List, prefix.unwrap_or(""))?;
        let Some(objects) = state.buckets.get(bucket) else {
            return Ok(Vec::new());
        };
        let prefix = prefix.unwrap_or("");
        Ok(objects
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, obj)| ObjectDescriptor {
                key: key.clone(),
                size: Some(obj.data.len() as u64),
                last_modified: Some(obj.last_modified),
                etag: Some(obj.etag.clone()),
                storage_class: Some("STANDARD".to_string()),
            })
            .collect())
    }

    async fn presign_get(
        &self,
        bucket: &str,
        key: &str,
        expires_in: Duration,
    ) -> StrataResult<String> {
        let mut state = self.state.lock().await;
        Self::check_fault(&mut state, BackendOp::Presign, key)?;
        let expires = expires_in.as_secs();
        let digest = md5::compute(format!("{bucket}/{key}?{expires}"));
        let signature = general_purpose::URL_SAFE_NO_PAD.encode(digest.0);
        Ok(format!(
            "{PRESIGN_HOST}/{bucket}/{key}?X-Amz-Expires={expires}&X-Amz-Signature={signature}"
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn list_filters_by_prefix_in_key_order() {
        let backend = MemoryBackend::new();
        for key in ["public/b", "private/a", "public/a", "publicity/x"] {
            backend.put("bkt", key, Bytes::from_static(b"x")).await.unwrap();
        }

        let keys: Vec<String> = backend
            .list("bkt", Some("public/"))
            .await
            .unwrap()
            .into_iter()
            .map(|o| o.key)
            .collect();
        assert_eq!(keys, vec!["public/a", "public/b"]);

        assert_eq!(backend.list("bkt", None).await.unwrap().len(), 4);
        assert!(backend.list("missing", None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn one_shot_faults_clear_after_firing() {
        let backend = MemoryBackend::new();
        backend.fail_next(BackendOp::Put).await;
        assert!(backend.put("b", "k", Bytes::new()).await.is_err());
        assert!(backend.put("b", "k", Bytes::new()).await.is_ok());
    }

    #[tokio::test]
    async fn key_faults_persist_until_cleared() {
        let backend = MemoryBackend::new();
        backend.insert_raw("b", "k", "v").await;
        backend.fail_key(BackendOp::Delete, "k").await;

        assert!(backend.delete("b", "k").await.is_err());
        assert!(backend.delete("b", "k").await.is_err());
        assert!(backend.delete("b", "other").await.is_ok());

        backend.clear_faults().await;
        backend.delete("b", "k").await.unwrap();
        assert_eq!(backend.object_count("b").await, 0);
    }

    #[tokio::test]
    async fn presigned_urls_carry_expiry() {
        let backend = MemoryBackend::new();
        let url = backend
            .presign_get("b", "private/k", Duration::from_secs(60))
            .await
            .unwrap();
        assert!(url.starts_with("http://memory.local/b/private/k?X-Amz-Expires=60&"));
    }
}
