//! Pool Version Registry
//!
//! At most one version accepts new deposits. Switching away from a
//! version supersedes it for good: from then on it is redeem-only, a
//! flag on the whole version rather than on individual notes.

use std::collections::BTreeSet;

use cloak_privacy::{ActionClass, PoolVersion};
use log::info;

use crate::error::{Result, RouterError};

#[derive(Debug, Clone)]
pub struct VersionRegistry {
    active: PoolVersion,
    superseded: BTreeSet<PoolVersion>,
}

impl VersionRegistry {
    pub fn new(active: PoolVersion) -> Self {
        Self {
            active,
            superseded: BTreeSet::new(),
        }
    }

    /// Rebuild from persisted state
    pub fn restore(active: PoolVersion, superseded: impl IntoIterator<Item = PoolVersion>) -> Self {
        let mut superseded: BTreeSet<PoolVersion> = superseded.into_iter().collect();
        superseded.remove(&active);
        Self { active, superseded }
    }

    pub fn active(&self) -> PoolVersion {
        self.active
    }

    pub fn is_redeem_only(&self, version: PoolVersion) -> bool {
        self.superseded.contains(&version)
    }

    pub fn superseded(&self) -> Vec<PoolVersion> {
        self.superseded.iter().copied().collect()
    }

    /// Make `version` the deposit target. Returns `false` when it already was.
    pub fn set_active_version(&mut self, version: PoolVersion) -> Result<bool> {
        if version == self.active {
            return Ok(false);
        }
        if self.is_redeem_only(version) {
            return Err(RouterError::PoolRedeemOnly(version));
        }

        info!("pool {} superseded by {}", self.active, version);
        self.superseded.insert(self.active);
        self.active = version;
        Ok(true)
    }

    /// Deposits into a redeem-only version are refused; spends and
    /// redemptions of existing notes always pass.
    pub fn admit(&self, version: PoolVersion, class: ActionClass) -> Result<()> {
        if class == ActionClass::Deposit && self.is_redeem_only(version) {
            return Err(RouterError::PoolRedeemOnly(version));
        }
        Ok(())
    }
}

impl Default for VersionRegistry {
    fn default() -> Self {
        Self::new(PoolVersion::default())
    }
}
