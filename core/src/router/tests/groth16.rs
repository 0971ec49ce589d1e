//! End-to-end routing with real Groth16 proofs over BN254.

use std::sync::Arc;

use ark_bn254::{Bn254, Fr};
use ark_groth16::{Groth16, ProvingKey};
use ark_relations::lc;
use ark_relations::r1cs::{ConstraintSynthesizer, ConstraintSystemRef, SynthesisError};
use ark_snark::{CircuitSpecificSetupSNARK, SNARK};
use ark_std::rand::{SeedableRng, rngs::StdRng};

use cloak_privacy::{ActionDomain, FieldElement, PoolVersion};

use super::*;
use crate::error::RouterError;
use crate::router::{Groth16Verifier, ProofVerifier};

/// Public inputs `[tag, digest]`; the prover knows `w` with `w * tag = digest`.
#[derive(Clone)]
struct StatementCircuit {
    tag: Option<Fr>,
    digest: Option<Fr>,
    witness: Option<Fr>,
}

impl ConstraintSynthesizer<Fr> for StatementCircuit {
    fn generate_constraints(
        self,
        cs: ConstraintSystemRef<Fr>,
    ) -> std::result::Result<(), SynthesisError> {
        let tag = cs.new_input_variable(|| self.tag.ok_or(SynthesisError::AssignmentMissing))?;
        let digest =
            cs.new_input_variable(|| self.digest.ok_or(SynthesisError::AssignmentMissing))?;
        let w = cs.new_witness_variable(|| self.witness.ok_or(SynthesisError::AssignmentMissing))?;
        cs.enforce_constraint(lc!() + w, lc!() + tag, lc!() + digest)?;
        Ok(())
    }
}

struct Prover {
    pk: ProvingKey<Bn254>,
    verifier: Groth16Verifier,
}

impl Prover {
    fn setup() -> Self {
        let mut rng = StdRng::seed_from_u64(0);
        let (pk, vk) = Groth16::<Bn254>::circuit_specific_setup(
            StatementCircuit {
                tag: None,
                digest: None,
                witness: None,
            },
            &mut rng,
        )
        .unwrap();
        Self {
            pk,
            verifier: Groth16Verifier::new(vk).unwrap(),
        }
    }

    /// Prove a submission's statement and fill in its proof and inputs
    fn prove(&self, submission: &mut ActionSubmission) {
        let version = submission.version.unwrap_or_default();
        let [tag, digest] = submission.statement(version).public_inputs_prefix();

        let (tag, digest) = (tag.to_fr(), digest.to_fr());
        let witness = digest / tag;
        let proof = Groth16::<Bn254>::prove(
            &self.pk,
            StatementCircuit {
                tag: Some(tag),
                digest: Some(digest),
                witness: Some(witness),
            },
            &mut StdRng::seed_from_u64(1),
        )
        .unwrap();

        submission.public_inputs = vec![FieldElement::from_fr(tag), FieldElement::from_fr(digest)];
        submission.proof = Groth16Verifier::encode_proof(&proof);
    }
}

fn groth16_router(backend: Groth16Verifier) -> ActionRouter {
    let mut router = ActionRouter::in_memory(settings(PoolVersion::V3));
    let mut adapter = VerifierAdapter::new(addr(ADMIN), VerificationMode::Garaga, Arc::new(backend));
    adapter.register(VerificationMode::Mock, Arc::new(MockVerifier::accept_all()));
    router.set_verifier(&addr(ADMIN), adapter).unwrap();

    let index = Arc::new(CommitmentIndex::new());
    for domain in [ActionDomain::Swap, ActionDomain::Stake, ActionDomain::Governance] {
        router.register_handler(domain, index.clone());
    }
    router
}

/// Backend loaded from the serialized key, as the node does at boot
fn fresh_verifier(prover: &Prover) -> Groth16Verifier {
    let mut bytes = Vec::new();
    ark_serialize::CanonicalSerialize::serialize_compressed(&prover.pk.vk, &mut bytes).unwrap();
    Groth16Verifier::from_bytes(&bytes).unwrap()
}

#[test]
fn real_proof_routes_end_to_end() {
    let prover = Prover::setup();
    let mut router = groth16_router(fresh_verifier(&prover));

    let mut swap = bound_action(ActionDomain::Swap, PoolVersion::V3, R0, 101, &[1, 2], &[3]);
    prover.prove(&mut swap);
    assert!(prover.verifier.verify(&swap.proof, &swap.public_inputs));

    let receipt = router.submit_action(&addr(ALICE), &swap).unwrap();
    assert_eq!(receipt.new_root, root(101));
    assert!(router.is_nullifier_used(&nul(1)));
    assert!(router.is_nullifier_used(&nul(2)));
}

#[test]
fn real_proof_cannot_be_replayed_in_another_domain() {
    let prover = Prover::setup();
    let mut router = groth16_router(fresh_verifier(&prover));

    let mut swap = bound_action(ActionDomain::Swap, PoolVersion::V3, R0, 101, &[1], &[]);
    prover.prove(&mut swap);

    let mut stake = swap.clone();
    stake.domain = ActionDomain::Stake;
    assert!(matches!(
        router.submit_action(&addr(ALICE), &stake),
        Err(RouterError::InvalidProof(_))
    ));

    // the relabelled statement's prefix, but the swap proof
    let mut forged = stake.clone();
    forged.public_inputs = forged
        .statement(PoolVersion::V3)
        .public_inputs_prefix()
        .to_vec();
    assert!(matches!(
        router.submit_action(&addr(ALICE), &forged),
        Err(RouterError::InvalidProof(_))
    ));

    assert!(!router.is_nullifier_used(&nul(1)));
    router.submit_action(&addr(ALICE), &swap).unwrap();
}

#[test]
fn proof_for_other_statement_is_rejected() {
    let prover = Prover::setup();
    let mut router = groth16_router(fresh_verifier(&prover));

    let mut honest = bound_action(ActionDomain::Governance, PoolVersion::V3, R0, 101, &[1], &[]);
    prover.prove(&mut honest);

    // correctly bound inputs for a different new root, carrying the old proof
    let mut redirected = bound_action(ActionDomain::Governance, PoolVersion::V3, R0, 666, &[1], &[]);
    redirected.public_inputs.truncate(2);
    redirected.proof = honest.proof.clone();

    assert!(matches!(
        router.submit_action(&addr(ALICE), &redirected),
        Err(RouterError::InvalidProof(_))
    ));
    assert_eq!(router.current_root(PoolVersion::V3), root(R0));
}

#[test]
fn dummy_payload_rejected_outside_mock_mode() {
    let prover = Prover::setup();
    let router = groth16_router(fresh_verifier(&prover));
    let adapter = router.require_verifier().unwrap();

    let one = [FieldElement::from_u64(1)];
    assert!(!adapter.verify(&one, &one));
}

#[test]
fn switching_to_mock_bypasses_groth16() {
    let prover = Prover::setup();
    let mut router = groth16_router(fresh_verifier(&prover));

    let unproven = bound_action(ActionDomain::Swap, PoolVersion::V3, R0, 101, &[1], &[]);
    assert!(matches!(
        router.submit_action(&addr(ALICE), &unproven),
        Err(RouterError::InvalidProof(_))
    ));

    router.set_verification_mode(&addr(ADMIN), 3).unwrap();
    router.submit_action(&addr(ALICE), &unproven).unwrap();
}
