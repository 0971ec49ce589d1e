//! Nullifier Ledger
//!
//! Append-only set of consumed spend identifiers, global across action
//! domains and pool versions. Only the router writes to it.

use std::collections::HashSet;

use cloak_privacy::Nullifier;

use crate::error::{Result, RouterError};

#[derive(Debug, Default)]
pub struct NullifierLedger {
    used: HashSet<Nullifier>,
}

impl NullifierLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from persisted nullifiers
    pub fn from_used(used: impl IntoIterator<Item = Nullifier>) -> Self {
        Self {
            used: used.into_iter().collect(),
        }
    }

    pub fn is_used(&self, nullifier: &Nullifier) -> bool {
        self.used.contains(nullifier)
    }

    /// Mark a single nullifier as consumed
    pub fn reserve(&mut self, nullifier: Nullifier) -> Result<()> {
        if !self.used.insert(nullifier) {
            return Err(RouterError::NullifierAlreadyUsed(nullifier));
        }
        Ok(())
    }

    /// Check a batch without mutating anything.
    ///
    /// Fails on the first nullifier that is already consumed or that
    /// appears twice inside the batch.
    pub fn check_batch(&self, batch: &[Nullifier]) -> Result<()> {
        let mut seen = HashSet::with_capacity(batch.len());
        for nullifier in batch {
            if self.is_used(nullifier) || !seen.insert(nullifier) {
                return Err(RouterError::NullifierAlreadyUsed(*nullifier));
            }
        }
        Ok(())
    }

    /// Consume a whole batch, or nothing
    pub fn reserve_all(&mut self, batch: &[Nullifier]) -> Result<()> {
        self.check_batch(batch)?;
        self.used.extend(batch.iter().copied());
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.used.len()
    }

    pub fn is_empty(&self) -> bool {
        self.used.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Nullifier> {
        self.used.iter()
    }
}
