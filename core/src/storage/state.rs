//! Ledger persistence contract
//!
//! The router stages every accepted change as one `LedgerBatch` and hands
//! it to the store before touching its in-memory state. A store must
//! apply a batch completely or not at all.

use std::collections::BTreeMap;

use anyhow::Result;
use cloak_privacy::{ActionDomain, Commitment, Nullifier, PoolVersion, Root};
use serde::{Deserialize, Serialize};

use crate::router::PendingAction;

/// decoupling the router from the database
pub trait LedgerStore: Send + Sync {
    /// Everything needed to rebuild the router after a restart
    fn load(&self) -> Result<LedgerSnapshot>;

    /// Atomically persist one batch
    fn commit(&self, batch: &LedgerBatch) -> Result<()>;
}

/// Counters and registry flags
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerMeta {
    pub next_sequence: u64,
    pub next_intent_id: u64,
    pub next_commitment_position: u64,
    pub active_version: PoolVersion,
    pub superseded: Vec<PoolVersion>,
}

/// Origin of an indexed commitment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitmentRecord {
    pub commitment: Commitment,
    pub domain: ActionDomain,
    pub sequence: u64,
}

/// Writes produced by one router call
#[derive(Debug, Clone, Default)]
pub struct LedgerBatch {
    pub nullifiers: Vec<Nullifier>,
    pub roots: Vec<(PoolVersion, Root)>,
    pub commitments: Vec<(u64, CommitmentRecord)>,
    pub intents: Vec<(u64, PendingAction)>,
    pub meta: Option<LedgerMeta>,
}

impl LedgerBatch {
    pub fn is_empty(&self) -> bool {
        self.nullifiers.is_empty()
            && self.roots.is_empty()
            && self.commitments.is_empty()
            && self.intents.is_empty()
            && self.meta.is_none()
    }
}

/// Full persisted state
#[derive(Debug, Clone, Default)]
pub struct LedgerSnapshot {
    pub nullifiers: Vec<Nullifier>,
    pub roots: BTreeMap<PoolVersion, Root>,
    pub commitments: BTreeMap<u64, CommitmentRecord>,
    pub intents: BTreeMap<u64, PendingAction>,
    /// `None` for a fresh store
    pub meta: Option<LedgerMeta>,
}

impl LedgerSnapshot {
    /// Fold a batch into the snapshot (used by the in-memory store)
    pub fn apply(&mut self, batch: &LedgerBatch) {
        for nullifier in &batch.nullifiers {
            if !self.nullifiers.contains(nullifier) {
                self.nullifiers.push(*nullifier);
            }
        }
        for (version, root) in &batch.roots {
            self.roots.insert(*version, *root);
        }
        for (position, record) in &batch.commitments {
            self.commitments.insert(*position, record.clone());
        }
        for (id, record) in &batch.intents {
            self.intents.insert(*id, record.clone());
        }
        if let Some(meta) = &batch.meta {
            self.meta = Some(meta.clone());
        }
    }

    pub fn is_fresh(&self) -> bool {
        self.meta.is_none()
    }
}
