use anyhow::{Context, Result};
use clap::Parser;
use std::{env, str::FromStr, time::Duration};

use crate::{
    models::tier::{FileVisibility, StorageTier},
    services::tier_config::{AdvancedOptions, StrataConfig},
};

const ENV_PREFIX: &str = "S3STRATA_";

/// Placeholders used by `--in-memory` when no S3 settings are given.
const MEMORY_ENDPOINT: &str = "memory.local";
const MEMORY_HOT_BUCKET: &str = "hot";
const MEMORY_COLD_BUCKET: &str = "cold";

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// Serve objects from process memory instead of S3.
    pub in_memory: bool,
    /// Period of the background housekeeping sweep; `None` disables it.
    pub housekeeping_interval: Option<Duration>,
    pub strata: StrataConfig,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug, Default)]
#[command(author, version, about = "Two-tier object storage admin service")]
pub struct Args {
    /// Host to bind to (overrides S3STRATA_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides S3STRATA_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Metadata database URL (overrides S3STRATA_DATABASE_URL)
    #[arg(long)]
    pub database_url: Option<String>,

    /// Shared S3 endpoint host (overrides S3STRATA_ENDPOINT)
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Shared S3 endpoint port (overrides S3STRATA_S3_PORT)
    #[arg(long)]
    pub s3_port: Option<u16>,

    /// Use HTTPS for the S3 endpoint (overrides S3STRATA_USE_SSL)
    #[arg(long)]
    pub use_ssl: Option<bool>,

    /// Overrides S3STRATA_ACCESS_KEY
    #[arg(long)]
    pub access_key: Option<String>,

    /// Overrides S3STRATA_SECRET_KEY
    #[arg(long)]
    pub secret_key: Option<String>,

    /// Overrides S3STRATA_HOT_BUCKET
    #[arg(long)]
    pub hot_bucket: Option<String>,

    /// Overrides S3STRATA_COLD_BUCKET
    #[arg(long)]
    pub cold_bucket: Option<String>,

    #[arg(long)]
    pub public_hot_prefix: Option<String>,

    #[arg(long)]
    pub private_hot_prefix: Option<String>,

    #[arg(long)]
    pub public_cold_prefix: Option<String>,

    #[arg(long)]
    pub private_cold_prefix: Option<String>,

    /// Default presigned URL lifetime in seconds
    #[arg(long)]
    pub presigned_url_expiration: Option<u64>,

    /// Upload size limit in bytes
    #[arg(long)]
    pub max_file_size: Option<u64>,

    /// Tier for uploads that do not name one (HOT or COLD)
    #[arg(long)]
    pub default_tier: Option<StorageTier>,

    /// Visibility for uploads that do not name one (PUBLIC or PRIVATE)
    #[arg(long)]
    pub default_visibility: Option<FileVisibility>,

    /// Seconds between housekeeping sweeps; 0 disables the sweep
    #[arg(long)]
    pub housekeeping_interval: Option<u64>,

    /// Keep objects in memory instead of talking to S3
    #[arg(long)]
    pub in_memory: bool,

    /// Run migrations and exit
    #[arg(long)]
    pub migrate: bool,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig and migrate flag.
    pub fn from_env_and_args() -> Result<(Self, bool)> {
        let args = Args::parse();
        Self::merge(args, |name| env::var(name).ok())
    }

    /// Merge `args` over variables read through `lookup`. CLI values win.
    pub fn merge<F>(args: Args, lookup: F) -> Result<(Self, bool)>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = EnvSource { lookup };

        let in_memory = args.in_memory || env.parsed::<bool>("IN_MEMORY")?.unwrap_or(false);

        let mut strata = StrataConfig {
            endpoint: args.endpoint.or(env.string("ENDPOINT")),
            port: args.s3_port.or(env.parsed("S3_PORT")?),
            use_ssl: args.use_ssl.or(env.parsed("USE_SSL")?),
            access_key: args.access_key.or(env.string("ACCESS_KEY")),
            secret_key: args.secret_key.or(env.string("SECRET_KEY")),
            hot_bucket: args.hot_bucket.or(env.string("HOT_BUCKET")),
            cold_bucket: args.cold_bucket.or(env.string("COLD_BUCKET")),
            public_hot_prefix: args.public_hot_prefix.or(env.string("PUBLIC_HOT_PREFIX")),
            private_hot_prefix: args.private_hot_prefix.or(env.string("PRIVATE_HOT_PREFIX")),
            public_cold_prefix: args.public_cold_prefix.or(env.string("PUBLIC_COLD_PREFIX")),
            private_cold_prefix: args
                .private_cold_prefix
                .or(env.string("PRIVATE_COLD_PREFIX")),
            hot: None,
            cold: None,
            advanced: AdvancedOptions::default(),
        };

        let defaults = AdvancedOptions::default();
        strata.advanced = AdvancedOptions {
            default_presigned_url_expiration: args
                .presigned_url_expiration
                .or(env.parsed("PRESIGNED_URL_EXPIRATION")?)
                .unwrap_or(defaults.default_presigned_url_expiration),
            max_file_size: args.max_file_size.or(env.parsed("MAX_FILE_SIZE")?),
            default_storage_tier: args
                .default_tier
                .or(env.parsed("DEFAULT_TIER")?)
                .unwrap_or(defaults.default_storage_tier),
            default_visibility: args
                .default_visibility
                .or(env.parsed("DEFAULT_VISIBILITY")?)
                .unwrap_or(defaults.default_visibility),
        };

        if in_memory {
            strata.endpoint.get_or_insert_with(|| MEMORY_ENDPOINT.into());
            strata.access_key.get_or_insert_with(|| "memory".into());
            strata.secret_key.get_or_insert_with(|| "memory".into());
            strata.hot_bucket.get_or_insert_with(|| MEMORY_HOT_BUCKET.into());
            strata.cold_bucket.get_or_insert_with(|| MEMORY_COLD_BUCKET.into());
        }

        let housekeeping_interval = args
            .housekeeping_interval
            .or(env.parsed("HOUSEKEEPING_INTERVAL")?)
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs);

        let cfg = Self {
            host: args
                .host
                .or(env.string("HOST"))
                .unwrap_or_else(|| "0.0.0.0".into()),
            port: args.port.or(env.parsed("PORT")?).unwrap_or(3000),
            database_url: args
                .database_url
                .or(env.string("DATABASE_URL"))
                .unwrap_or_else(|| "sqlite://./data/s3strata.db".into()),
            in_memory,
            housekeeping_interval,
            strata,
        };

        Ok((cfg, args.migrate))
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

struct EnvSource<F> {
    lookup: F,
}

impl<F> EnvSource<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn string(&self, name: &str) -> Option<String> {
        (self.lookup)(&format!("{ENV_PREFIX}{name}")).filter(|v| !v.is_empty())
    }

    fn parsed<T>(&self, name: &str) -> Result<Option<T>>
    where
        T: FromStr,
        T::Err: std::error::Error + Send + Sync + 'static,
    {
        self.string(name)
            .map(|value| {
                value
                    .parse::<T>()
                    .with_context(|| format!("parsing {ENV_PREFIX}{name} value `{value}`"))
            })
            .transpose()
    }
}
