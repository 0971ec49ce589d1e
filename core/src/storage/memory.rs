use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Result;

use crate::storage::{LedgerBatch, LedgerSnapshot, LedgerStore};

/// Volatile store for tests and `in_memory = true` deployments.
pub struct MemoryStore {
    snapshot: Mutex<LedgerSnapshot>,
    fail_commits: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::from_snapshot(LedgerSnapshot::default())
    }

    pub fn from_snapshot(snapshot: LedgerSnapshot) -> Self {
        Self {
            snapshot: Mutex::new(snapshot),
            fail_commits: AtomicBool::new(false),
        }
    }

    /// Make every following commit fail, simulating a broken disk
    pub fn set_fail_commits(&self, fail: bool) {
        self.fail_commits.store(fail, Ordering::SeqCst);
    }

    /// Copy of everything committed so far
    pub fn snapshot(&self) -> LedgerSnapshot {
        self.snapshot
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl LedgerStore for MemoryStore {
    fn load(&self) -> Result<LedgerSnapshot> {
        Ok(self.snapshot())
    }

    fn commit(&self, batch: &LedgerBatch) -> Result<()> {
        if self.fail_commits.load(Ordering::SeqCst) {
            anyhow::bail!("memory store is refusing writes");
        }
        self.snapshot
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .apply(batch);
        Ok(())
    }
}
