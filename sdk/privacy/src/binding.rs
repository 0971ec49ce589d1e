//! Statement Binding
//!
//! The verifier only answers "is this proof valid for these public inputs".
//! Binding is what ties those public inputs to the concrete state change
//! the router is about to apply. Every proof carries a Poseidon digest of
//! its statement; the router recomputes the digest from the submission and
//! refuses any mismatch before the verifier is even consulted.
//!
//! ```text
//! action  : public_inputs = [domain_tag, H_act(domain, version, old_root, new_root, N[], C[]), ..]
//! submit  : public_inputs = [domain_tag, H_sub(domain, ciphertext[], commitment), ..]
//! finalize: public_inputs = [H_fin(id, commitment, nullifier, recipient), ..]
//! ```
//!
//! Anything after the bound prefix is application data and is forwarded
//! untouched to the downstream handler.

use crate::address::Address;
use crate::commitment::{Commitment, Root};
use crate::domain::ActionDomain;
use crate::field::FieldElement;
use crate::nullifier::Nullifier;
use crate::pool::PoolVersion;
use crate::poseidon::PoseidonHasher;

const ACTION_DOMAIN_SEP: u64 = 0x434c_4b41; // "CLKA"
const INTENT_SUBMIT_SEP: u64 = 0x434c_4b53; // "CLKS"
const INTENT_FINALIZE_SEP: u64 = 0x434c_4b46; // "CLKF"

/// Number of leading public inputs fixed by an action statement
pub const ACTION_PREFIX_LEN: usize = 2;
/// Number of leading public inputs fixed by an intent submission
pub const SUBMIT_PREFIX_LEN: usize = 2;
/// Number of leading public inputs fixed by an intent finalization
pub const FINALIZE_PREFIX_LEN: usize = 1;

/// Root transition claimed by a single-phase action
#[derive(Debug, Clone, Copy)]
pub struct ActionStatement<'a> {
    pub domain: ActionDomain,
    pub version: PoolVersion,
    pub old_root: &'a Root,
    pub new_root: &'a Root,
    pub nullifiers: &'a [Nullifier],
    pub commitments: &'a [Commitment],
}

impl ActionStatement<'_> {
    pub fn digest(&self) -> FieldElement {
        let mut hasher = PoseidonHasher::new(ACTION_DOMAIN_SEP);
        hasher
            .absorb_u64(self.domain.tag())
            .absorb_u64(u64::from(self.version.as_u8()))
            .absorb(self.old_root.as_field())
            .absorb(self.new_root.as_field());

        hasher.absorb_u64(self.nullifiers.len() as u64);
        for nullifier in self.nullifiers {
            hasher.absorb(nullifier.as_field());
        }
        hasher.absorb_u64(self.commitments.len() as u64);
        for commitment in self.commitments {
            hasher.absorb(commitment.as_field());
        }

        hasher.finish()
    }

    /// Public inputs a prover must place first
    pub fn public_inputs_prefix(&self) -> [FieldElement; ACTION_PREFIX_LEN] {
        [self.domain.tag_field(), self.digest()]
    }

    /// True when `public_inputs` starts with this statement's prefix
    pub fn is_bound_by(&self, public_inputs: &[FieldElement]) -> bool {
        public_inputs.len() >= ACTION_PREFIX_LEN
            && public_inputs[..ACTION_PREFIX_LEN] == self.public_inputs_prefix()
    }
}

/// Digest a user proves over when submitting a two-phase intent
pub fn intent_submission_digest(
    domain: ActionDomain,
    ciphertext: &[FieldElement],
    commitment: &Commitment,
) -> FieldElement {
    let mut hasher = PoseidonHasher::new(INTENT_SUBMIT_SEP);
    hasher
        .absorb_u64(domain.tag())
        .absorb_all(ciphertext)
        .absorb(commitment.as_field());
    hasher.finish()
}

/// Public-input prefix for an intent submission
pub fn intent_submission_prefix(
    domain: ActionDomain,
    ciphertext: &[FieldElement],
    commitment: &Commitment,
) -> [FieldElement; SUBMIT_PREFIX_LEN] {
    [
        domain.tag_field(),
        intent_submission_digest(domain, ciphertext, commitment),
    ]
}

/// Digest binding the relayer's payout parameters to a stored intent
pub fn intent_finalize_digest(
    id: u64,
    commitment: &Commitment,
    nullifier: &Nullifier,
    recipient: &Address,
) -> FieldElement {
    let mut hasher = PoseidonHasher::new(INTENT_FINALIZE_SEP);
    hasher
        .absorb_u64(id)
        .absorb(commitment.as_field())
        .absorb(nullifier.as_field())
        .absorb(recipient.as_field());
    hasher.finish()
}
