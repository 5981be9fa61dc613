//! Tier configuration and its resolution.
//!
//! A deployment either shares one endpoint/credential set between both tiers
//! (only the bucket names and prefixes differ) or gives each tier its own
//! fully independent block. [`resolve_tier_config`] turns either form into a
//! complete [`TierConfig`] for one tier.

use serde::{Deserialize, Serialize};

use crate::{
    errors::{StrataError, StrataResult},
    models::tier::{FileVisibility, StorageTier},
};

pub const DEFAULT_PORT: u16 = 443;
pub const DEFAULT_PUBLIC_PREFIX: &str = "public";
pub const DEFAULT_PRIVATE_PREFIX: &str = "private";
/// Four hours.
pub const DEFAULT_PRESIGNED_URL_EXPIRATION: u64 = 14_400;

/// Connection settings for one tier.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct TierConfig {
    pub endpoint: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_use_ssl")]
    pub use_ssl: bool,
    pub access_key: String,
    pub secret_key: String,
    pub bucket: String,
    #[serde(default = "default_public_prefix")]
    pub public_prefix: String,
    #[serde(default = "default_private_prefix")]
    pub private_prefix: String,
}

impl TierConfig {
    pub fn new(
        endpoint: impl Into<String>,
        access_key: impl Into<String>,
        secret_key: impl Into<String>,
        bucket: impl Into<String>,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            port: DEFAULT_PORT,
            use_ssl: true,
            access_key: access_key.into(),
            secret_key: secret_key.into(),
            bucket: bucket.into(),
            public_prefix: DEFAULT_PUBLIC_PREFIX.to_string(),
            private_prefix: DEFAULT_PRIVATE_PREFIX.to_string(),
        }
    }

    pub fn scheme(&self) -> &'static str {
        if self.use_ssl { "https" } else { "http" }
    }

    /// `scheme://endpoint[:port]`, leaving out the port when it is the
    /// scheme's default. Signed requests against non-AWS endpoints break if a
    /// default port is spelled out.
    pub fn endpoint_url(&self) -> String {
        let is_default_port = matches!((self.use_ssl, self.port), (true, 443) | (false, 80));
        if is_default_port {
            format!("{}://{}", self.scheme(), self.endpoint)
        } else {
            format!("{}://{}:{}", self.scheme(), self.endpoint, self.port)
        }
    }
}

/// Behavioral defaults that apply to both tiers.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct AdvancedOptions {
    /// Seconds a presigned URL stays valid when the caller does not say.
    #[serde(default = "default_presigned_url_expiration")]
    pub default_presigned_url_expiration: u64,
    /// Upload size limit in bytes; `None` means unbounded.
    #[serde(default)]
    pub max_file_size: Option<u64>,
    #[serde(default)]
    pub default_storage_tier: StorageTier,
    #[serde(default)]
    pub default_visibility: FileVisibility,
}

impl Default for AdvancedOptions {
    fn default() -> Self {
        Self {
            default_presigned_url_expiration: DEFAULT_PRESIGNED_URL_EXPIRATION,
            max_file_size: None,
            default_storage_tier: StorageTier::Hot,
            default_visibility: FileVisibility::Private,
        }
    }
}

/// Full configuration: shared-endpoint fields, optional per-tier blocks and
/// advanced options. Per-tier blocks take precedence over shared fields.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct StrataConfig {
    pub endpoint: Option<String>,
    pub port: Option<u16>,
    pub use_ssl: Option<bool>,
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
    pub hot_bucket: Option<String>,
    pub cold_bucket: Option<String>,
    pub public_hot_prefix: Option<String>,
    pub private_hot_prefix: Option<String>,
    pub public_cold_prefix: Option<String>,
    pub private_cold_prefix: Option<String>,

    pub hot: Option<TierConfig>,
    pub cold: Option<TierConfig>,

    #[serde(default)]
    pub advanced: AdvancedOptions,
}

impl StrataConfig {
    /// Shared-endpoint configuration with default port, TLS and prefixes.
    pub fn shared(
        endpoint: impl Into<String>,
        access_key: impl Into<String>,
        secret_key: impl Into<String>,
        hot_bucket: impl Into<String>,
        cold_bucket: impl Into<String>,
    ) -> Self {
        Self {
            endpoint: Some(endpoint.into()),
            access_key: Some(access_key.into()),
            secret_key: Some(secret_key.into()),
            hot_bucket: Some(hot_bucket.into()),
            cold_bucket: Some(cold_bucket.into()),
            ..Self::default()
        }
    }

    /// Independent-endpoint configuration.
    pub fn separate(hot: TierConfig, cold: TierConfig) -> Self {
        Self {
            hot: Some(hot),
            cold: Some(cold),
            ..Self::default()
        }
    }

    pub fn with_advanced(mut self, advanced: AdvancedOptions) -> Self {
        self.advanced = advanced;
        self
    }
}

/// Resolve the complete settings for `tier`.
///
/// A tier-specific block is used verbatim. Otherwise the shared fields
/// must provide endpoint, credentials and the tier's bucket; the error names
/// every missing field. Either way the public and private prefixes must
/// differ, or a visibility change would land on its own key.
pub fn resolve_tier_config(config: &StrataConfig, tier: StorageTier) -> StrataResult<TierConfig> {
    let resolved = match tier {
        StorageTier::Hot => config.hot.clone(),
        StorageTier::Cold => config.cold.clone(),
    };
    let resolved = match resolved {
        Some(tier_config) => tier_config,
        None => resolve_shared(config, tier)?,
    };

    if resolved.public_prefix == resolved.private_prefix {
        return Err(StrataError::Configuration {
            tier,
            missing: format!(
                "distinct public and private prefixes (both are `{}`)",
                resolved.public_prefix
            ),
        });
    }
    Ok(resolved)
}

fn resolve_shared(config: &StrataConfig, tier: StorageTier) -> StrataResult<TierConfig> {
    let (bucket, bucket_field, public_prefix, private_prefix) = match tier {
        StorageTier::Hot => (
            config.hot_bucket.as_deref(),
            "hot_bucket",
            config.public_hot_prefix.as_deref(),
            config.private_hot_prefix.as_deref(),
        ),
        StorageTier::Cold => (
            config.cold_bucket.as_deref(),
            "cold_bucket",
            config.public_cold_prefix.as_deref(),
            config.private_cold_prefix.as_deref(),
        ),
    };

    let mut missing = Vec::new();
    let endpoint = present(config.endpoint.as_deref(), "endpoint", &mut missing);
    let access_key = present(config.access_key.as_deref(), "access_key", &mut missing);
    let secret_key = present(config.secret_key.as_deref(), "secret_key", &mut missing);
    let bucket = present(bucket, bucket_field, &mut missing);

    match (endpoint, access_key, secret_key, bucket) {
        (Some(endpoint), Some(access_key), Some(secret_key), Some(bucket)) => Ok(TierConfig {
            endpoint: endpoint.to_string(),
            port: config.port.unwrap_or(DEFAULT_PORT),
            use_ssl: config.use_ssl.unwrap_or(true),
            access_key: access_key.to_string(),
            secret_key: secret_key.to_string(),
            bucket: bucket.to_string(),
            public_prefix: public_prefix.unwrap_or(DEFAULT_PUBLIC_PREFIX).to_string(),
            private_prefix: private_prefix.unwrap_or(DEFAULT_PRIVATE_PREFIX).to_string(),
        }),
        _ => Err(StrataError::Configuration {
            tier,
            missing: format!(
                "{} (provide shared settings or a `{}` block)",
                missing.join(", "),
                tier.as_str().to_lowercase()
            ),
        }),
    }
}

fn present<'a>(
    value: Option<&'a str>,
    field: &'static str,
    missing: &mut Vec<&'static str>,
) -> Option<&'a str> {
    match value {
        Some(v) if !v.is_empty() => Some(v),
        _ => {
            missing.push(field);
            None
        }
    }
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_use_ssl() -> bool {
    true
}

fn default_public_prefix() -> String {
    DEFAULT_PUBLIC_PREFIX.to_string()
}

fn default_private_prefix() -> String {
    DEFAULT_PRIVATE_PREFIX.to_string()
}

fn default_presigned_url_expiration() -> u64 {
    DEFAULT_PRESIGNED_URL_EXPIRATION
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shared() -> StrataConfig {
        StrataConfig::shared("s3.example.com", "key", "secret", "hot-b", "cold-b")
    }

    #[test]
    fn advanced_defaults() {
        let options = AdvancedOptions::default();
        assert_eq!(options.default_presigned_url_expiration, 14_400);
        assert_eq!(options.max_file_size, None);
        assert_eq!(options.default_storage_tier, StorageTier::Hot);
        assert_eq!(options.default_visibility, FileVisibility::Private);
    }

    #[test]
    fn shared_mode_fills_defaults() {
        let hot = resolve_tier_config(&shared(), StorageTier::Hot).unwrap();
        assert_eq!(hot.endpoint, "s3.example.com");
        assert_eq!(hot.bucket, "hot-b");
        assert_eq!(hot.port, 443);
        assert!(hot.use_ssl);
        assert_eq!(hot.public_prefix, "public");
        assert_eq!(hot.private_prefix, "private");

        let cold = resolve_tier_config(&shared(), StorageTier::Cold).unwrap();
        assert_eq!(cold.bucket, "cold-b");
    }

    #[test]
    fn shared_mode_honors_prefix_overrides() {
        let mut config = shared();
        config.public_hot_prefix = Some("pub".into());
        config.private_cold_prefix = Some("vault".into());
        config.port = Some(9000);
        config.use_ssl = Some(false);

        let hot = resolve_tier_config(&config, StorageTier::Hot).unwrap();
        assert_eq!(hot.public_prefix, "pub");
        assert_eq!(hot.private_prefix, "private");
        assert_eq!(hot.port, 9000);
        assert!(!hot.use_ssl);

        let cold = resolve_tier_config(&config, StorageTier::Cold).unwrap();
        assert_eq!(cold.public_prefix, "public");
        assert_eq!(cold.private_prefix, "vault");
    }

    #[test]
    fn tier_specific_block_wins() {
        let mut config = shared();
        let mut hot = TierConfig::new("hot.example.com", "hk", "hs", "dedicated-hot");
        hot.port = 9000;
        config.hot = Some(hot.clone());

        assert_eq!(resolve_tier_config(&config, StorageTier::Hot).unwrap(), hot);
        assert_eq!(
            resolve_tier_config(&config, StorageTier::Cold)
                .unwrap()
                .endpoint,
            "s3.example.com"
        );
    }

    #[test]
    fn separate_mode_needs_no_shared_fields() {
        let config = StrataConfig::separate(
            TierConfig::new("hot.example.com", "a", "b", "h"),
            TierConfig::new("cold.example.com", "c", "d", "c"),
        );
        assert_eq!(
            resolve_tier_config(&config, StorageTier::Cold)
                .unwrap()
                .bucket,
            "c"
        );
    }

    #[test]
    fn missing_fields_fail_closed() {
        let err = resolve_tier_config(&StrataConfig::default(), StorageTier::Hot).unwrap_err();
        match err {
            StrataError::Configuration { tier, missing } => {
                assert_eq!(tier, StorageTier::Hot);
                assert!(missing.contains("endpoint"));
                assert!(missing.contains("access_key"));
                assert!(missing.contains("secret_key"));
                assert!(missing.contains("hot_bucket"));
            }
            other => panic!("unexpected error: {other}"),
        }

        let mut config = shared();
        config.cold_bucket = None;
        let err = resolve_tier_config(&config, StorageTier::Cold).unwrap_err();
        assert!(err.to_string().contains("cold_bucket"));
        assert!(!err.to_string().contains("endpoint,"));
    }

    #[test]
    fn endpoint_url_omits_default_ports() {
        let mut tier = TierConfig::new("minio.local", "k", "s", "b");
        assert_eq!(tier.endpoint_url(), "https://minio.local");

        tier.port = 9000;
        assert_eq!(tier.endpoint_url(), "https://minio.local:9000");

        tier.use_ssl = false;
        tier.port = 80;
        assert_eq!(tier.endpoint_url(), "http://minio.local");

        tier.port = 443;
        assert_eq!(tier.endpoint_url(), "http://minio.local:443");
    }

    #[test]
    fn equal_visibility_prefixes_are_rejected() {
        let mut config = shared();
        config.public_cold_prefix = Some("files".into());
        config.private_cold_prefix = Some("files".into());
        assert!(resolve_tier_config(&config, StorageTier::Hot).is_ok());
        match resolve_tier_config(&config, StorageTier::Cold).unwrap_err() {
            StrataError::Configuration { tier, missing } => {
                assert_eq!(tier, StorageTier::Cold);
                assert!(missing.contains("`files`"));
            }
            other => panic!("unexpected error: {other}"),
        }

        let mut hot = TierConfig::new("hot.example.com", "k", "s", "h");
        hot.private_prefix = "public".into();
        config.hot = Some(hot);
        assert!(resolve_tier_config(&config, StorageTier::Hot).is_err());
    }
}
