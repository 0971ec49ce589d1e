//! Router scenario tests
//!
//! Shared fixtures: a router with a counting mock verifier, the
//! commitment index installed for every domain, and an in-memory event
//! sink and store that tests can inspect.

mod actions;
mod groth16;

use std::sync::Arc;

use ark_bn254::Fr;
use ark_ff::{BigInt, BigInteger, PrimeField};
use cloak_privacy::{
    ActionDomain, Address, Commitment, FieldElement, Nullifier, PoolVersion, Root,
    intent_finalize_digest, intent_submission_prefix,
};

use crate::error::Result;
use crate::router::{
    ActionReceipt, ActionRouter, ActionSubmission, CommitmentIndex, IntentPayload,
    MemoryEventSink, MockVerifier, RouterSettings, VerificationMode, VerifierAdapter,
};
use crate::storage::MemoryStore;

const ADMIN: u64 = 1;
const RELAYER: u64 = 2;
const ALICE: u64 = 10;

/// Live V3 root on a fresh ledger
const R0: u64 = 100;
/// Live V2 root on a fresh ledger
const LEGACY_R0: u64 = 200;

fn felt(v: u64) -> FieldElement {
    FieldElement::from_u64(v)
}

fn addr(v: u64) -> Address {
    Address(felt(v))
}

fn root(v: u64) -> Root {
    Root(felt(v))
}

fn nul(v: u64) -> Nullifier {
    Nullifier(felt(v))
}

fn com(v: u64) -> Commitment {
    Commitment(felt(v))
}

/// `v + r`: the same field value as `v` under different bytes
fn alias(v: u64) -> FieldElement {
    let mut value = Fr::MODULUS;
    let carry = value.add_with_carry(&BigInt::from(v));
    assert!(!carry);
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&value.to_bytes_be());
    FieldElement::from_bytes(bytes)
}

fn settings(active_version: PoolVersion) -> RouterSettings {
    RouterSettings {
        admin: addr(ADMIN),
        relayer: addr(RELAYER),
        verifier_set_once: true,
        active_version,
        initial_roots: vec![
            (PoolVersion::V3, root(R0)),
            (PoolVersion::V2, root(LEGACY_R0)),
        ],
    }
}

struct Harness {
    router: ActionRouter,
    verifier: Arc<MockVerifier>,
    events: Arc<MemoryEventSink>,
    store: Arc<MemoryStore>,
    index: Arc<CommitmentIndex>,
}

impl Harness {
    fn new(accept: bool) -> Self {
        Self::with_version(accept, PoolVersion::V3)
    }

    fn with_version(accept: bool, active_version: PoolVersion) -> Self {
        let store = Arc::new(MemoryStore::new());
        let mut router = ActionRouter::open(settings(active_version), store.clone()).unwrap();

        let verifier = Arc::new(MockVerifier::new(accept));
        router
            .set_verifier(
                &addr(ADMIN),
                VerifierAdapter::new(addr(ADMIN), VerificationMode::Mock, verifier.clone()),
            )
            .unwrap();

        let index = Arc::new(CommitmentIndex::new());
        for domain in ActionDomain::ALL {
            router.register_handler(domain, index.clone());
        }

        let events = Arc::new(MemoryEventSink::default());
        router.add_event_sink(events.clone());

        Self {
            router,
            verifier,
            events,
            store,
            index,
        }
    }

    fn submit(&mut self, submission: &ActionSubmission) -> Result<ActionReceipt> {
        self.router.submit_action(&addr(ALICE), submission)
    }

    fn submit_intent(&mut self, commitment: u64) -> u64 {
        let payload = intent(ActionDomain::DarkPool, commitment);
        let inputs = intent_inputs(&payload);
        self.router
            .submit_intent(&addr(ALICE), payload, &[felt(1), felt(2)], &inputs)
            .unwrap()
    }
}

/// Submission whose public inputs carry the statement binding
fn bound_action(
    domain: ActionDomain,
    version: PoolVersion,
    old_root: u64,
    new_root: u64,
    nullifiers: &[u64],
    commitments: &[u64],
) -> ActionSubmission {
    let mut submission = ActionSubmission {
        domain,
        version: Some(version),
        old_root: root(old_root),
        new_root: root(new_root),
        nullifiers: nullifiers.iter().copied().map(nul).collect(),
        commitments: commitments.iter().copied().map(com).collect(),
        public_inputs: Vec::new(),
        proof: vec![felt(0xaa), felt(0xbb)],
    };
    rebind(&mut submission);
    submission
}

/// Recompute the statement prefix after editing a submission
fn rebind(submission: &mut ActionSubmission) {
    let version = submission.version.unwrap_or_default();
    let mut inputs = submission.statement(version).public_inputs_prefix().to_vec();
    // application-specific tail, e.g. an amount commitment
    inputs.push(felt(0x77));
    submission.public_inputs = inputs;
}

fn intent(domain: ActionDomain, commitment: u64) -> IntentPayload {
    IntentPayload {
        domain,
        ciphertext: vec![felt(0xc1), felt(0xc2), felt(0xc3)],
        commitment: com(commitment),
    }
}

fn intent_inputs(payload: &IntentPayload) -> Vec<FieldElement> {
    intent_submission_prefix(payload.domain, &payload.ciphertext, &payload.commitment).to_vec()
}

fn payout_inputs(
    router: &ActionRouter,
    id: u64,
    nullifier: Nullifier,
    recipient: Address,
) -> Vec<FieldElement> {
    let commitment = router
        .pending_action(id)
        .map(|r| r.commitment)
        .unwrap_or(Commitment(FieldElement::ZERO));
    vec![intent_finalize_digest(id, &commitment, &nullifier, &recipient)]
}
