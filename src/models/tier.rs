//! Storage tier and visibility, the two axes an object key is derived from.

use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use crate::errors::StrataError;

/// Storage class a file lives in.
///
/// HOT is the low-latency bucket; COLD is the archival bucket. Each tier may
/// point at a different endpoint and credential set.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum StorageTier {
    #[default]
    Hot,
    Cold,
}

impl StorageTier {
    pub fn as_str(self) -> &'static str {
        match self {
            StorageTier::Hot => "HOT",
            StorageTier::Cold => "COLD",
        }
    }
}

impl fmt::Display for StorageTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StorageTier {
    type Err = StrataError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        if value.eq_ignore_ascii_case("HOT") {
            Ok(StorageTier::Hot)
        } else if value.eq_ignore_ascii_case("COLD") {
            Ok(StorageTier::Cold)
        } else {
            Err(StrataError::InvalidValue {
                kind: "storage tier",
                value: value.to_string(),
            })
        }
    }
}

/// Who may read a file: PUBLIC files get a direct URL, PRIVATE files a
/// time-limited signed one.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum FileVisibility {
    Public,
    #[default]
    Private,
}

impl FileVisibility {
    pub fn as_str(self) -> &'static str {
        match self {
            FileVisibility::Public => "PUBLIC",
            FileVisibility::Private => "PRIVATE",
        }
    }
}

impl fmt::Display for FileVisibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FileVisibility {
    type Err = StrataError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        if value.eq_ignore_ascii_case("PUBLIC") {
            Ok(FileVisibility::Public)
        } else if value.eq_ignore_ascii_case("PRIVATE") {
            Ok(FileVisibility::Private)
        } else {
            Err(StrataError::InvalidValue {
                kind: "visibility",
                value: value.to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_case_insensitively() {
        assert_eq!("hot".parse::<StorageTier>().unwrap(), StorageTier::Hot);
        assert_eq!("COLD".parse::<StorageTier>().unwrap(), StorageTier::Cold);
        assert_eq!(
            "Public".parse::<FileVisibility>().unwrap(),
            FileVisibility::Public
        );
        assert!("warm".parse::<StorageTier>().is_err());
        assert!("internal".parse::<FileVisibility>().is_err());
    }

    #[test]
    fn serializes_as_upper_case() {
        assert_eq!(
            serde_json::to_string(&StorageTier::Cold).unwrap(),
            "\"COLD\""
        );
        assert_eq!(
            serde_json::from_str::<FileVisibility>("\"PRIVATE\"").unwrap(),
            FileVisibility::Private
        );
    }
}
