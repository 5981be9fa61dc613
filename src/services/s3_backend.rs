//! S3-compatible backend (AWS S3, MinIO, R2, ...) built on `aws-sdk-s3`.
//!
//! One client per tier, configured with the tier's endpoint, static
//! credentials and path-style addressing so bucket names never have to be
//! DNS-resolvable on self-hosted endpoints.

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_s3::{
    Client, config::Region, error::SdkError, presigning::PresigningConfig, primitives::ByteStream,
};
use bytes::Bytes;
use chrono::DateTime;
use std::time::Duration;

use crate::{
    errors::{StrataError, StrataResult},
    models::object::ObjectDescriptor,
    services::{object_store::ObjectBackend, tier_config::TierConfig},
};

/// Region sent with every request. S3-compatible stores generally ignore it
/// but SigV4 needs one.
pub const DEFAULT_REGION: &str = "us-east-1";

#[derive(Clone, Debug)]
pub struct S3Backend {
    client: Client,
}

impl S3Backend {
    /// Build a client for one tier's endpoint and credentials.
    pub fn new(config: &TierConfig) -> Self {
        let credentials = Credentials::new(
            &config.access_key,
            &config.secret_key,
            None,
            None,
            "s3strata-static",
        );
        let s3_config = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(DEFAULT_REGION))
            .endpoint_url(config.endpoint_url())
            .credentials_provider(credentials)
            .force_path_style(true)
            .build();

        Self {
            client: Client::from_conf(s3_config),
        }
    }
}

#[async_trait]
impl ObjectBackend for S3Backend {
    async fn put(&self, bucket: &str, key: &str, data: Bytes) -> StrataResult<()> {
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(|e| StrataError::transport("put", format!("{key}: {e}")))?;
        Ok(())
    }

    async fn get(&self, bucket: &str, key: &str) -> StrataResult<Bytes> {
        let response = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                let missing = matches!(&e, SdkError::ServiceError(service) if service.err().is_no_such_key());
                if missing {
                    StrataError::not_found(format!("object `{key}` in bucket `{bucket}`"))
                } else {
                    StrataError::transport("get", format!("{key}: {e}"))
                }
            })?;

        let bytes = response
            .body
            .collect()
            .await
            .map_err(|e| StrataError::transport("get", format!("reading body of {key}: {e}")))?
            .into_bytes();
        Ok(bytes)
    }

    async fn delete(&self, bucket: &str, key: &str) -> StrataResult<()> {
        // DeleteObject succeeds for absent keys.
        self.client
            .delete_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| StrataError::transport("delete", format!("{key}: {e}")))?;
        Ok(())
    }

    async fn head(&self, bucket: &str, key: &str) -> StrataResult<bool> {
        match self.client.head_object().bucket(bucket).key(key).send().await {
            Ok(_) => Ok(true),
            Err(SdkError::ServiceError(service)) if service.err().is_not_found() => Ok(false),
            Err(e) => Err(StrataError::transport("head", format!("{key}: {e}"))),
        }
    }

    async fn list(
        &self,
        bucket: &str,
        prefix: Option<&str>,
    ) -> StrataResult<Vec<ObjectDescriptor>> {
        let mut objects = Vec::new();
        let mut continuation_token: Option<String> = None;

        loop {
            let mut request = self.client.list_objects_v2().bucket(bucket);
            if let Some(prefix) = prefix.filter(|p| !p.is_empty()) {
                request = request.prefix(prefix);
            }
            if let Some(token) = continuation_token.take() {
                request = request.continuation_token(token);
            }

            let response = request
                .send()
                .await
                .map_err(|e| StrataError::transport("list", format!("bucket {bucket}: {e}")))?;

            for item in response.contents() {
                let Some(key) = item.key() else { continue };
                objects.push(ObjectDescriptor {
                    key: key.to_string(),
                    size: item.size().and_then(|s| u64::try_from(s).ok()),
                    last_modified: item
                        .last_modified()
                        .and_then(|t| DateTime::from_timestamp(t.secs(), t.subsec_nanos())),
                    etag: item.e_tag().map(str::to_string),
                    storage_class: item.storage_class().map(|c| c.as_str().to_string()),
                });
            }

            match (response.is_truncated(), response.next_continuation_token()) {
                (Some(true), Some(token)) => continuation_token = Some(token.to_string()),
                _ => break,
            }
        }

        Ok(objects)
    }

    async fn presign_get(
        &self,
        bucket: &str,
        key: &str,
        expires_in: Duration,
    ) -> StrataResult<String> {
        let presigning = PresigningConfig::expires_in(expires_in)
            .map_err(|e| StrataError::InvalidOperation(format!("presign expiry: {e}")))?;
        let request = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .presigned(presigning)
            .await
            .map_err(|e| StrataError::transport("presign", format!("{key}: {e}")))?;
        Ok(request.uri().to_string())
    }
}
