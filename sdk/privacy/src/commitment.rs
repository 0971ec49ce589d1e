//! Note Commitments and Roots
//!
//! ```text
//! Commitment = Poseidon("CMT", value, randomness, owner)
//! Root       = Merkle root over all commitments of one pool version
//! ```
//!
//! The router never opens a commitment; it records it and forwards it to
//! downstream handlers. Roots are opaque too: the prover computes the new
//! root off-chain and the router only enforces that transitions chain.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::field::FieldElement;
use crate::poseidon::PoseidonHasher;

const COMMITMENT_DOMAIN: u64 = 0x434d_54; // "CMT"

/// A note commitment
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Commitment(pub FieldElement);

impl Commitment {
    pub fn as_field(&self) -> &FieldElement {
        &self.0
    }

    /// Get raw bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        self.0.as_bytes()
    }
}

impl From<FieldElement> for Commitment {
    fn from(value: FieldElement) -> Self {
        Self(value)
    }
}

impl fmt::Debug for Commitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Commitment({})", self.0)
    }
}

impl fmt::Display for Commitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Merkle root summarizing a commitment set
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Root(pub FieldElement);

impl Root {
    /// Root of an empty pool
    pub const EMPTY: Root = Root(FieldElement::ZERO);

    pub fn as_field(&self) -> &FieldElement {
        &self.0
    }
}

impl From<FieldElement> for Root {
    fn from(value: FieldElement) -> Self {
        Self(value)
    }
}

impl fmt::Debug for Root {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Root({})", self.0)
    }
}

impl fmt::Display for Root {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Client-side commitment construction
pub struct CommitmentScheme;

impl CommitmentScheme {
    /// C = Poseidon("CMT", value, randomness, owner)
    pub fn commit(value: u64, randomness: &FieldElement, owner: &FieldElement) -> Commitment {
        let mut hasher = PoseidonHasher::new(COMMITMENT_DOMAIN);
        hasher.absorb_u64(value).absorb(randomness).absorb(owner);
        Commitment(hasher.finish())
    }
}
