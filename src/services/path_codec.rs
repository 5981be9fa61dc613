//! Object key layout: `{visibility_prefix}/{suffix}`.
//!
//! The visibility prefix is the only record of a file's visibility, so every
//! path-sensitive operation goes through this codec.

use crate::{
    errors::{StrataError, StrataResult},
    models::tier::{FileVisibility, StorageTier},
    services::tier_config::TierConfig,
};

/// Builds and parses object keys using each tier's configured prefixes.
#[derive(Clone, Debug)]
pub struct PathCodec {
    hot: Prefixes,
    cold: Prefixes,
}

#[derive(Clone, Debug)]
struct Prefixes {
    public: String,
    private: String,
}

impl Prefixes {
    fn from_tier(config: &TierConfig) -> Self {
        Self {
            public: config.public_prefix.clone(),
            private: config.private_prefix.clone(),
        }
    }
}

impl PathCodec {
    pub fn new(hot: &TierConfig, cold: &TierConfig) -> Self {
        Self {
            hot: Prefixes::from_tier(hot),
            cold: Prefixes::from_tier(cold),
        }
    }

    fn prefixes(&self, tier: StorageTier) -> &Prefixes {
        match tier {
            StorageTier::Hot => &self.hot,
            StorageTier::Cold => &self.cold,
        }
    }

    pub fn prefix(&self, tier: StorageTier, visibility: FileVisibility) -> &str {
        let prefixes = self.prefixes(tier);
        match visibility {
            FileVisibility::Public => &prefixes.public,
            FileVisibility::Private => &prefixes.private,
        }
    }

    /// Join the prefix for `(tier, visibility)` with `suffix`.
    pub fn build_path(&self, tier: StorageTier, visibility: FileVisibility, suffix: &str) -> String {
        format!("{}/{}", self.prefix(tier, visibility), suffix)
    }

    /// Visibility encoded in the first segment of `path`.
    pub fn visibility_of(&self, tier: StorageTier, path: &str) -> StrataResult<FileVisibility> {
        self.split(tier, path).map(|(visibility, _)| visibility)
    }

    /// Split `path` into its visibility and the suffix after the prefix.
    pub fn split<'a>(
        &self,
        tier: StorageTier,
        path: &'a str,
    ) -> StrataResult<(FileVisibility, &'a str)> {
        let invalid = || StrataError::InvalidPath {
            path: path.to_string(),
        };
        let (head, suffix) = path.split_once('/').ok_or_else(invalid)?;
        let prefixes = self.prefixes(tier);
        if head == prefixes.public {
            Ok((FileVisibility::Public, suffix))
        } else if head == prefixes.private {
            Ok((FileVisibility::Private, suffix))
        } else {
            Err(invalid())
        }
    }

    /// Key `path` takes when its object moves from tier `from` to tier `to`.
    ///
    /// A key laid out by this codec keeps its visibility and suffix under the
    /// destination prefix. Any other key, such as an adopted one, is kept
    /// as is.
    pub fn rebase(&self, from: StorageTier, to: StorageTier, path: &str) -> String {
        match self.split(from, path) {
            Ok((visibility, suffix)) => self.build_path(to, visibility, suffix),
            Err(_) => path.to_string(),
        }
    }
}
