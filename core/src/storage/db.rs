use anyhow::{Context, Result};
use rocksdb::{ColumnFamilyDescriptor, DB, IteratorMode, Options, WriteBatch};
use std::path::Path;
use std::sync::Arc;

use cloak_privacy::{FieldElement, Nullifier, PoolVersion, Root};

use crate::router::PendingAction;
use crate::storage::{CommitmentRecord, LedgerBatch, LedgerMeta, LedgerSnapshot, LedgerStore};

const CF_NULLIFIERS: &str = "nullifiers";
const CF_ROOTS: &str = "roots";
const CF_INTENTS: &str = "intents";
const CF_COMMITMENTS: &str = "commitments";
const CF_META: &str = "meta";

const META_KEY: &[u8] = b"ledger";

/// A thread-safe wrapper around RocksDB.
#[derive(Clone)]
pub struct RocksDbStore {
    db: Arc<DB>,
}

impl RocksDbStore {
    /// Opens the database at the specified path, creating it if missing.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let families = vec![
            ColumnFamilyDescriptor::new(CF_NULLIFIERS, Options::default()),
            ColumnFamilyDescriptor::new(CF_ROOTS, Options::default()),
            ColumnFamilyDescriptor::new(CF_INTENTS, Options::default()),
            ColumnFamilyDescriptor::new(CF_COMMITMENTS, Options::default()),
            ColumnFamilyDescriptor::new(CF_META, Options::default()),
        ];

        let db = DB::open_cf_descriptors(&opts, path, families)
            .map_err(|e| anyhow::anyhow!("Failed to open RocksDB: {}", e))?;

        Ok(Self { db: Arc::new(db) })
    }

    /// Check if a nullifier has been persisted
    pub fn nullifier_exists(&self, nullifier: &Nullifier) -> Result<bool> {
        let cf = self
            .db
            .cf_handle(CF_NULLIFIERS)
            .context("nullifiers CF missing")?;

        Ok(self.db.get_cf(cf, nullifier.as_bytes())?.is_some())
    }

    fn load_nullifiers(&self) -> Result<Vec<Nullifier>> {
        let cf = self
            .db
            .cf_handle(CF_NULLIFIERS)
            .context("nullifiers CF missing")?;

        let mut nullifiers = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (key, _) = item?;
            let bytes: [u8; 32] = key
                .as_ref()
                .try_into()
                .context("invalid nullifier length")?;
            nullifiers.push(Nullifier::from_bytes(bytes));
        }
        Ok(nullifiers)
    }

    fn load_roots(&self) -> Result<Vec<(PoolVersion, Root)>> {
        let cf = self.db.cf_handle(CF_ROOTS).context("roots CF missing")?;

        let mut roots = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (key, value) = item?;
            let version = key
                .first()
                .copied()
                .and_then(PoolVersion::from_u8)
                .context("invalid pool version key")?;
            let bytes: [u8; 32] = value.as_ref().try_into().context("invalid root length")?;
            roots.push((version, Root(FieldElement(bytes))));
        }
        Ok(roots)
    }

    fn load_commitments(&self) -> Result<Vec<(u64, CommitmentRecord)>> {
        let cf = self
            .db
            .cf_handle(CF_COMMITMENTS)
            .context("commitments CF missing")?;

        let mut commitments = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (key, value) = item?;
            let position = u64::from_be_bytes(
                key.as_ref()
                    .try_into()
                    .context("invalid position key length")?,
            );
            let record: CommitmentRecord =
                serde_json::from_slice(&value).context("invalid commitment record")?;
            commitments.push((position, record));
        }
        Ok(commitments)
    }

    fn load_intents(&self) -> Result<Vec<(u64, PendingAction)>> {
        let cf = self.db.cf_handle(CF_INTENTS).context("intents CF missing")?;

        let mut intents = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (key, value) = item?;
            let id = u64::from_be_bytes(
                key.as_ref()
                    .try_into()
                    .context("invalid intent id length")?,
            );
            let record: PendingAction =
                serde_json::from_slice(&value).context("invalid pending action record")?;
            intents.push((id, record));
        }
        Ok(intents)
    }

    fn load_meta(&self) -> Result<Option<LedgerMeta>> {
        let cf = self.db.cf_handle(CF_META).context("meta CF missing")?;

        match self.db.get_cf(cf, META_KEY)? {
            Some(bytes) => Ok(Some(
                serde_json::from_slice(&bytes).context("invalid ledger meta")?,
            )),
            None => Ok(None),
        }
    }
}

impl LedgerStore for RocksDbStore {
    fn load(&self) -> Result<LedgerSnapshot> {
        Ok(LedgerSnapshot {
            nullifiers: self.load_nullifiers()?,
            roots: self.load_roots()?.into_iter().collect(),
            commitments: self.load_commitments()?.into_iter().collect(),
            intents: self.load_intents()?.into_iter().collect(),
            meta: self.load_meta()?,
        })
    }

    /// Atomically apply a batch of operations
    fn commit(&self, batch: &LedgerBatch) -> Result<()> {
        let mut write = WriteBatch::default();

        let cf_nullifiers = self
            .db
            .cf_handle(CF_NULLIFIERS)
            .context("nullifiers CF missing")?;
        let cf_roots = self.db.cf_handle(CF_ROOTS).context("roots CF missing")?;
        let cf_intents = self.db.cf_handle(CF_INTENTS).context("intents CF missing")?;
        let cf_commitments = self
            .db
            .cf_handle(CF_COMMITMENTS)
            .context("commitments CF missing")?;
        let cf_meta = self.db.cf_handle(CF_META).context("meta CF missing")?;

        for nullifier in &batch.nullifiers {
            write.put_cf(cf_nullifiers, nullifier.as_bytes(), []);
        }

        for (version, root) in &batch.roots {
            write.put_cf(cf_roots, [version.as_u8()], root.as_field().as_bytes());
        }

        for (position, record) in &batch.commitments {
            let bytes = serde_json::to_vec(record)?;
            write.put_cf(cf_commitments, position.to_be_bytes(), bytes);
        }

        for (id, record) in &batch.intents {
            let bytes = serde_json::to_vec(record)?;
            write.put_cf(cf_intents, id.to_be_bytes(), bytes);
        }

        if let Some(meta) = &batch.meta {
            write.put_cf(cf_meta, META_KEY, serde_json::to_vec(meta)?);
        }

        self.db.write(write)?;
        Ok(())
    }
}
