//! Privacy Action Router
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                          submit_action                           │
//! ├──────────────────────────────────────────────────────────────────┤
//! │  1. verifier installed?           ── RouterNotConfigured         │
//! │  2. handler for domain?           ── UnknownActionDomain         │
//! │  3. version admits action class?  ── PoolRedeemOnly              │
//! │  4. identifiers canonical?        ── NonCanonicalElement         │
//! │  5. old_root is live?             ── RootMismatch                │
//! │  6. inputs bound to statement?    ── InvalidProof                │
//! │  7. proof verifies?               ── InvalidProof                │
//! │  8. nullifiers unused?            ── NullifierAlreadyUsed        │
//! │  9. handler accepts?              ── HandlerRejected             │
//! │ 10. persist batch, reserve nullifiers, advance root              │
//! │ 11. handler applies, emit ActionExecuted                         │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Steps 1-9 never mutate router or handler state, so any failure up to
//! and including the persist leaves the ledger, roots and downstream
//! modules exactly as they were. Nullifiers, commitments and roots are
//! compared by their bytes, so values at or above the field order are
//! refused before they can alias a smaller one. The router is the only
//! writer of the nullifier ledger and the root store.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use anyhow::Context;
use cloak_privacy::{
    ActionDomain, ActionStatement, Address, Commitment, FieldElement, Nullifier, PoolVersion, Root,
};
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};

use super::events::{AuditEvent, EventSink};
use super::handler::{ActionHandler, RoutedAction};
use super::intents::PendingAction;
use super::nullifiers::NullifierLedger;
use super::roots::RootStore;
use super::verifier::{ProofVerifier, VerificationMode, VerifierAdapter};
use super::versions::VersionRegistry;
use crate::error::{Result, RouterError};
use crate::storage::{
    CommitmentRecord, LedgerBatch, LedgerMeta, LedgerSnapshot, LedgerStore, MemoryStore,
};

// ============================================================================
// Settings & Payloads
// ============================================================================

/// Static router configuration
#[derive(Debug, Clone, Default)]
pub struct RouterSettings {
    /// May install verifiers, switch modes and activate pool versions
    pub admin: Address,
    /// Only caller allowed to finalize pending intents
    pub relayer: Address,
    /// Refuse a second `set_verifier`
    pub verifier_set_once: bool,
    /// Deposit target on a fresh ledger
    pub active_version: PoolVersion,
    /// Starting roots on a fresh ledger
    pub initial_roots: Vec<(PoolVersion, Root)>,
}

/// A state transition submitted under one action domain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionSubmission {
    pub domain: ActionDomain,
    /// Defaults to the active version
    #[serde(default)]
    pub version: Option<PoolVersion>,
    pub old_root: Root,
    pub new_root: Root,
    #[serde(default)]
    pub nullifiers: Vec<Nullifier>,
    #[serde(default)]
    pub commitments: Vec<Commitment>,
    pub public_inputs: Vec<FieldElement>,
    pub proof: Vec<FieldElement>,
}

impl ActionSubmission {
    /// The statement the proof's public inputs must commit to
    pub fn statement(&self, version: PoolVersion) -> ActionStatement<'_> {
        ActionStatement {
            domain: self.domain,
            version,
            old_root: &self.old_root,
            new_root: &self.new_root,
            nullifiers: &self.nullifiers,
            commitments: &self.commitments,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionReceipt {
    pub sequence: u64,
    pub domain: ActionDomain,
    pub version: PoolVersion,
    pub new_root: Root,
}

/// Point-in-time view for operators
#[derive(Debug, Clone, Serialize)]
pub struct RouterStatus {
    pub active_version: PoolVersion,
    pub roots: BTreeMap<PoolVersion, Root>,
    pub redeem_only: Vec<PoolVersion>,
    pub nullifiers_used: usize,
    pub pending_intents: usize,
    pub finalized_intents: usize,
    pub next_sequence: u64,
    pub verification_mode: Option<VerificationMode>,
    pub verifier_backend: Option<&'static str>,
    pub supported_modes: Vec<VerificationMode>,
    pub handled_domains: Vec<ActionDomain>,
}

// ============================================================================
// Router
// ============================================================================

pub struct ActionRouter {
    pub(super) settings: RouterSettings,
    pub(super) verifier: Option<VerifierAdapter>,
    pub(super) ledger: NullifierLedger,
    pub(super) roots: RootStore,
    pub(super) versions: VersionRegistry,
    pub(super) handlers: HashMap<ActionDomain, Arc<dyn ActionHandler>>,
    pub(super) intents: BTreeMap<u64, PendingAction>,
    pub(super) next_sequence: u64,
    pub(super) next_intent_id: u64,
    pub(super) next_commitment_position: u64,
    store: Arc<dyn LedgerStore>,
    sinks: Vec<Arc<dyn EventSink>>,
}

impl ActionRouter {
    /// Load persisted state from `store` and build the router on top of it
    pub fn open(settings: RouterSettings, store: Arc<dyn LedgerStore>) -> anyhow::Result<Self> {
        let snapshot = store.load().context("Failed to load ledger snapshot")?;
        Ok(Self::restore(settings, store, snapshot))
    }

    /// Router backed by a fresh in-memory store
    pub fn in_memory(settings: RouterSettings) -> Self {
        Self::restore(
            settings,
            Arc::new(MemoryStore::new()),
            LedgerSnapshot::default(),
        )
    }

    /// Rebuild from an already loaded snapshot
    pub fn restore(
        settings: RouterSettings,
        store: Arc<dyn LedgerStore>,
        snapshot: LedgerSnapshot,
    ) -> Self {
        let mut initial_roots = settings.initial_roots.clone();
        initial_roots.extend(snapshot.roots.iter().map(|(v, r)| (*v, *r)));
        let roots = RootStore::new(initial_roots);

        let (versions, next_sequence, next_intent_id, next_commitment_position) =
            match &snapshot.meta {
                Some(meta) => (
                    VersionRegistry::restore(meta.active_version, meta.superseded.iter().copied()),
                    meta.next_sequence,
                    meta.next_intent_id,
                    meta.next_commitment_position,
                ),
                None => (VersionRegistry::new(settings.active_version), 0, 0, 0),
            };

        let ledger = NullifierLedger::from_used(snapshot.nullifiers.iter().copied());

        if !snapshot.is_fresh() {
            info!(
                "Restored ledger: {} nullifiers, {} intents, next action #{}",
                ledger.len(),
                snapshot.intents.len(),
                next_sequence
            );
        }

        Self {
            settings,
            verifier: None,
            ledger,
            roots,
            versions,
            handlers: HashMap::new(),
            intents: snapshot.intents,
            next_sequence,
            next_intent_id,
            next_commitment_position,
            store,
            sinks: Vec::new(),
        }
    }

    pub fn add_event_sink(&mut self, sink: Arc<dyn EventSink>) {
        self.sinks.push(sink);
    }

    // ========================================================================
    // Administration
    // ========================================================================

    /// Install the verifier adapter
    pub fn set_verifier(&mut self, caller: &Address, adapter: VerifierAdapter) -> Result<()> {
        self.require_admin(caller)?;
        if self.settings.verifier_set_once && self.verifier.is_some() {
            return Err(RouterError::VerifierAlreadySet);
        }

        let mode = adapter.mode();
        info!(
            "Verifier installed: {} backend, mode {}",
            adapter.label(),
            mode
        );
        self.verifier = Some(adapter);
        self.emit(AuditEvent::VerifierInstalled { mode });
        Ok(())
    }

    /// Switch the live verification backend
    pub fn set_verification_mode(
        &mut self,
        caller: &Address,
        raw_mode: u8,
    ) -> Result<VerificationMode> {
        let adapter = self
            .verifier
            .as_mut()
            .ok_or(RouterError::RouterNotConfigured)?;
        let mode = adapter.set_verification_mode(caller, raw_mode)?;
        self.emit(AuditEvent::VerificationModeChanged { mode });
        Ok(mode)
    }

    /// Route `domain` to `handler`, replacing any earlier registration
    pub fn register_handler(&mut self, domain: ActionDomain, handler: Arc<dyn ActionHandler>) {
        debug!("handler registered for {}", domain);
        self.handlers.insert(domain, handler);
    }

    /// Make `version` the deposit target; the previous one becomes redeem-only
    pub fn set_active_version(&mut self, caller: &Address, version: PoolVersion) -> Result<()> {
        self.require_admin(caller)?;

        let mut versions = self.versions.clone();
        if !versions.set_active_version(version)? {
            return Ok(());
        }

        let mut meta = self.meta();
        meta.active_version = versions.active();
        meta.superseded = versions.superseded();
        self.persist(&LedgerBatch {
            meta: Some(meta),
            ..Default::default()
        })?;

        self.versions = versions;
        self.emit(AuditEvent::PoolVersionActivated { version });
        Ok(())
    }

    // ========================================================================
    // Submission
    // ========================================================================

    pub fn submit_action(
        &mut self,
        participant: &Address,
        submission: &ActionSubmission,
    ) -> Result<ActionReceipt> {
        let domain = submission.domain;
        let verifier = self.require_verifier()?;
        let handler = self.handler_for(domain)?;

        let version = submission.version.unwrap_or_else(|| self.versions.active());
        self.versions.admit(version, domain.class())?;
        require_canonical(
            "root",
            [&submission.old_root.0, &submission.new_root.0],
        )?;
        require_canonical("nullifier", submission.nullifiers.iter().map(|n| &n.0))?;
        require_canonical("commitment", submission.commitments.iter().map(|c| &c.0))?;
        self.roots.check_transition(version, &submission.old_root)?;

        let statement = submission.statement(version);
        if !statement.is_bound_by(&submission.public_inputs) {
            warn!("{} action rejected: public inputs not bound to statement", domain);
            return Err(RouterError::InvalidProof(
                "public inputs do not match the action statement",
            ));
        }
        if !verifier.verify(&submission.proof, &submission.public_inputs) {
            warn!("{} action rejected by {} verifier", domain, verifier.label());
            return Err(RouterError::InvalidProof("verifier rejected proof"));
        }

        self.ledger.check_batch(&submission.nullifiers)?;

        let sequence = self.next_sequence;
        let routed = RoutedAction {
            sequence,
            domain,
            version,
            participant,
            commitments: &submission.commitments,
            public_inputs: &submission.public_inputs,
        };
        handler
            .check(&routed)
            .map_err(|e| RouterError::HandlerRejected {
                domain,
                reason: format!("{e:#}"),
            })?;

        let first_position = self.next_commitment_position;
        let commitments: Vec<(u64, CommitmentRecord)> = submission
            .commitments
            .iter()
            .enumerate()
            .map(|(i, c)| {
                (
                    first_position + i as u64,
                    CommitmentRecord {
                        commitment: *c,
                        domain,
                        sequence,
                    },
                )
            })
            .collect();

        let mut meta = self.meta();
        meta.next_sequence = sequence + 1;
        meta.next_commitment_position = first_position + commitments.len() as u64;

        self.persist(&LedgerBatch {
            nullifiers: submission.nullifiers.clone(),
            roots: vec![(version, submission.new_root)],
            commitments,
            intents: Vec::new(),
            meta: Some(meta.clone()),
        })?;

        // nullifiers before the root: a spent note can never pair with two roots
        self.ledger.reserve_all(&submission.nullifiers)?;
        self.roots
            .advance(version, &submission.old_root, submission.new_root)?;
        self.next_sequence = meta.next_sequence;
        self.next_commitment_position = meta.next_commitment_position;
        handler.apply(&routed);

        info!(
            "Action #{} accepted: {} on {}, root -> {}",
            sequence, domain, version, submission.new_root
        );
        self.emit(AuditEvent::ActionExecuted {
            sequence,
            domain,
            version,
            participant: *participant,
            nullifier_count: submission.nullifiers.len(),
            commitment_count: submission.commitments.len(),
        });

        Ok(ActionReceipt {
            sequence,
            domain,
            version,
            new_root: submission.new_root,
        })
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn is_nullifier_used(&self, nullifier: &Nullifier) -> bool {
        self.ledger.is_used(nullifier)
    }

    pub fn current_root(&self, version: PoolVersion) -> Root {
        self.roots.current(version)
    }

    /// Recently replaced roots of `version`, oldest first
    pub fn root_history(&self, version: PoolVersion) -> Vec<Root> {
        self.roots.history(version)
    }

    pub fn active_version(&self) -> PoolVersion {
        self.versions.active()
    }

    pub fn is_redeem_only(&self, version: PoolVersion) -> bool {
        self.versions.is_redeem_only(version)
    }

    pub fn verification_mode(&self) -> Option<VerificationMode> {
        self.verifier.as_ref().map(|v| v.mode())
    }

    pub fn status(&self) -> RouterStatus {
        let finalized_intents = self.intents.values().filter(|r| r.finalized).count();
        let mut handled_domains: Vec<ActionDomain> = self.handlers.keys().copied().collect();
        handled_domains.sort_by_key(|d| d.tag());

        RouterStatus {
            active_version: self.versions.active(),
            roots: self.roots.live_roots(),
            redeem_only: self.versions.superseded(),
            nullifiers_used: self.ledger.len(),
            pending_intents: self.intents.len() - finalized_intents,
            finalized_intents,
            next_sequence: self.next_sequence,
            verification_mode: self.verification_mode(),
            verifier_backend: self.verifier.as_ref().map(|v| v.label()),
            supported_modes: self
                .verifier
                .as_ref()
                .map(|v| v.supported_modes())
                .unwrap_or_default(),
            handled_domains,
        }
    }

    // ========================================================================
    // Internals
    // ========================================================================

    pub(super) fn require_admin(&self, caller: &Address) -> Result<()> {
        if caller.is_placeholder() || caller != &self.settings.admin {
            warn!("admin operation refused for {}", caller);
            return Err(RouterError::Unauthorized(caller.to_string()));
        }
        Ok(())
    }

    pub(super) fn require_verifier(&self) -> Result<&VerifierAdapter> {
        self.verifier.as_ref().ok_or(RouterError::RouterNotConfigured)
    }

    pub(super) fn handler_for(&self, domain: ActionDomain) -> Result<Arc<dyn ActionHandler>> {
        self.handlers
            .get(&domain)
            .cloned()
            .ok_or(RouterError::UnknownActionDomain(domain))
    }

    /// Counters and registry flags as they stand now
    pub(super) fn meta(&self) -> LedgerMeta {
        LedgerMeta {
            next_sequence: self.next_sequence,
            next_intent_id: self.next_intent_id,
            next_commitment_position: self.next_commitment_position,
            active_version: self.versions.active(),
            superseded: self.versions.superseded(),
        }
    }

    pub(super) fn persist(&self, batch: &LedgerBatch) -> Result<()> {
        self.store.commit(batch).map_err(|e| {
            error!("Failed to persist ledger batch: {:#}", e);
            RouterError::Storage(e)
        })
    }

    pub(super) fn emit(&self, event: AuditEvent) {
        for sink in &self.sinks {
            sink.emit(&event);
        }
    }
}

/// Refuse the first value that is not reduced below the field order
pub(super) fn require_canonical<'a>(
    what: &'static str,
    values: impl IntoIterator<Item = &'a FieldElement>,
) -> Result<()> {
    match values.into_iter().find(|v| !v.is_canonical()) {
        Some(value) => {
            warn!("non-canonical {} {} refused", what, value);
            Err(RouterError::NonCanonicalElement {
                what,
                value: *value,
            })
        }
        None => Ok(()),
    }
}
