//! Two-Phase Submit/Execute
//!
//! ```text
//!   participant                      router                       relayer
//!       │ submit_intent(payload, proof)  │                              │
//!       │───────────────────────────────►│ record {finalized: false}    │
//!       │◄──────────────── id ───────────│                              │
//!       │                                │  finalize_intent(id, ...)    │
//!       │                                │◄─────────────────────────────│
//!       │                                │ nullifier + payout checks    │
//!       │                                │ record {finalized: true}     │
//! ```
//!
//! Submission stores a binding commitment; the relayer later finalizes
//! with concrete payout parameters whose digest the finalize proof must
//! carry. A record moves `Submitted -> Finalized` exactly once and is
//! never deleted. There is no cancel or expiry transition.

use cloak_privacy::{
    ActionDomain, Address, Commitment, FieldElement, Nullifier, intent_finalize_digest,
    intent_submission_prefix,
};
use log::{info, warn};
use serde::{Deserialize, Serialize};

use super::action_router::{ActionRouter, require_canonical};
use super::events::AuditEvent;
use super::handler::RoutedAction;
use super::verifier::ProofVerifier;
use crate::error::{Result, RouterError};
use crate::storage::{CommitmentRecord, LedgerBatch};

/// What a participant commits to at submission time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentPayload {
    pub domain: ActionDomain,
    /// Encrypted order; opaque to the router
    pub ciphertext: Vec<FieldElement>,
    pub commitment: Commitment,
}

/// Stored record of a submitted intent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingAction {
    pub domain: ActionDomain,
    pub ciphertext: Vec<FieldElement>,
    pub commitment: Commitment,
    pub finalized: bool,
    pub submitted_by: Address,
    /// Set once finalized
    #[serde(default)]
    pub recipient: Option<Address>,
    #[serde(default)]
    pub nullifier: Option<Nullifier>,
    /// Router sequence assigned at finalization
    #[serde(default)]
    pub sequence: Option<u64>,
}

impl ActionRouter {
    /// Store a new pending intent and return its id
    pub fn submit_intent(
        &mut self,
        participant: &Address,
        payload: IntentPayload,
        proof: &[FieldElement],
        public_inputs: &[FieldElement],
    ) -> Result<u64> {
        let verifier = self.require_verifier()?;
        self.handler_for(payload.domain)?;
        require_canonical("commitment", [&payload.commitment.0])?;

        let prefix =
            intent_submission_prefix(payload.domain, &payload.ciphertext, &payload.commitment);
        if !public_inputs.starts_with(&prefix) {
            warn!("{} intent rejected: public inputs not bound to payload", payload.domain);
            return Err(RouterError::InvalidSubmissionProof(
                "public inputs do not match the submitted payload",
            ));
        }
        if !verifier.verify(proof, public_inputs) {
            warn!("{} intent rejected by {} verifier", payload.domain, verifier.label());
            return Err(RouterError::InvalidSubmissionProof("verifier rejected proof"));
        }

        let id = self.next_intent_id;
        let record = PendingAction {
            domain: payload.domain,
            ciphertext: payload.ciphertext,
            commitment: payload.commitment,
            finalized: false,
            submitted_by: *participant,
            recipient: None,
            nullifier: None,
            sequence: None,
        };

        let mut meta = self.meta();
        meta.next_intent_id = id + 1;
        self.persist(&LedgerBatch {
            intents: vec![(id, record.clone())],
            meta: Some(meta),
            ..Default::default()
        })?;

        let domain = record.domain;
        self.intents.insert(id, record);
        self.next_intent_id = id + 1;

        info!("Intent {} submitted ({})", id, domain);
        self.emit(AuditEvent::IntentSubmitted {
            id,
            domain,
            participant: *participant,
        });
        Ok(id)
    }

    /// Relayer-only execution of a pending intent; returns the action sequence
    pub fn finalize_intent(
        &mut self,
        caller: &Address,
        id: u64,
        recipient: Address,
        nullifier: Nullifier,
        public_inputs: &[FieldElement],
        proof: &[FieldElement],
    ) -> Result<u64> {
        if caller.is_placeholder() || caller != &self.settings.relayer {
            warn!("finalize of intent {} refused for {}", id, caller);
            return Err(RouterError::Unauthorized(caller.to_string()));
        }

        let record = self
            .intents
            .get(&id)
            .cloned()
            .ok_or(RouterError::UnknownAction(id))?;
        if record.finalized {
            return Err(RouterError::AlreadyFinalized(id));
        }
        require_canonical("nullifier", [&nullifier.0])?;
        require_canonical("recipient", [&recipient.0])?;
        if self.ledger.is_used(&nullifier) {
            return Err(RouterError::NullifierAlreadyUsed(nullifier));
        }

        let verifier = self.require_verifier()?;
        let payout = intent_finalize_digest(id, &record.commitment, &nullifier, &recipient);
        if public_inputs.first() != Some(&payout) {
            warn!("finalize of intent {} rejected: payout not bound", id);
            return Err(RouterError::InvalidProof(
                "public inputs do not match the payout parameters",
            ));
        }
        if !verifier.verify(proof, public_inputs) {
            warn!("finalize of intent {} rejected by {} verifier", id, verifier.label());
            return Err(RouterError::InvalidProof("verifier rejected proof"));
        }

        let handler = self.handler_for(record.domain)?;
        let sequence = self.next_sequence;
        let version = self.versions.active();
        let commitments = [record.commitment];
        let routed = RoutedAction {
            sequence,
            domain: record.domain,
            version,
            participant: &recipient,
            commitments: &commitments,
            public_inputs,
        };
        handler
            .check(&routed)
            .map_err(|e| RouterError::HandlerRejected {
                domain: record.domain,
                reason: format!("{e:#}"),
            })?;

        let finalized = PendingAction {
            finalized: true,
            recipient: Some(recipient),
            nullifier: Some(nullifier),
            sequence: Some(sequence),
            ..record
        };

        let position = self.next_commitment_position;
        let mut meta = self.meta();
        meta.next_sequence = sequence + 1;
        meta.next_commitment_position = position + 1;

        self.persist(&LedgerBatch {
            nullifiers: vec![nullifier],
            commitments: vec![(
                position,
                CommitmentRecord {
                    commitment: finalized.commitment,
                    domain: finalized.domain,
                    sequence,
                },
            )],
            intents: vec![(id, finalized.clone())],
            meta: Some(meta),
            ..Default::default()
        })?;

        self.ledger.reserve(nullifier)?;
        self.intents.insert(id, finalized);
        self.next_sequence = sequence + 1;
        self.next_commitment_position = position + 1;
        handler.apply(&routed);

        info!("Intent {} finalized as action #{}", id, sequence);
        self.emit(AuditEvent::IntentFinalized {
            id,
            sequence,
            relayer: *caller,
            recipient,
        });
        Ok(sequence)
    }

    /// `false` for unknown ids
    pub fn is_finalized(&self, id: u64) -> bool {
        self.intents.get(&id).is_some_and(|r| r.finalized)
    }

    pub fn pending_action(&self, id: u64) -> Option<&PendingAction> {
        self.intents.get(&id)
    }

    /// Number of intents ever submitted
    pub fn intent_count(&self) -> u64 {
        self.next_intent_id
    }
}
