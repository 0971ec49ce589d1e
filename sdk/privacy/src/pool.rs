//! Shielded pool schema versions

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown pool version {0:?}")]
pub struct UnknownPoolVersion(pub String);

/// Schema version of a shielded pool. Each version owns its own root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PoolVersion {
    /// Legacy pool
    V2,
    /// Current pool
    V3,
}

impl PoolVersion {
    pub const ALL: [PoolVersion; 2] = [PoolVersion::V2, PoolVersion::V3];

    pub fn as_u8(self) -> u8 {
        match self {
            Self::V2 => 2,
            Self::V3 => 3,
        }
    }

    pub fn from_u8(raw: u8) -> Option<Self> {
        match raw {
            2 => Some(Self::V2),
            3 => Some(Self::V3),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::V2 => "v2",
            Self::V3 => "v3",
        }
    }
}

impl Default for PoolVersion {
    fn default() -> Self {
        Self::V3
    }
}

impl fmt::Display for PoolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PoolVersion {
    type Err = UnknownPoolVersion;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "v2" | "2" | "shielded_pool_v2" | "legacy" => Ok(Self::V2),
            "v3" | "3" | "shielded_pool_v3" => Ok(Self::V3),
            _ => Err(UnknownPoolVersion(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_versions() {
        assert_eq!("V2".parse::<PoolVersion>().unwrap(), PoolVersion::V2);
        assert_eq!("legacy".parse::<PoolVersion>().unwrap(), PoolVersion::V2);
        assert_eq!("3".parse::<PoolVersion>().unwrap(), PoolVersion::V3);
        assert!("v4".parse::<PoolVersion>().is_err());
    }

    #[test]
    fn test_u8_roundtrip() {
        for v in PoolVersion::ALL {
            assert_eq!(PoolVersion::from_u8(v.as_u8()), Some(v));
        }
        assert_eq!(PoolVersion::from_u8(1), None);
    }
}
