//! Nullifiers
//!
//! A nullifier is the one-time tag revealed when a note is spent.
//!
//! ```text
//! Nullifier = Poseidon("NULL", nk, commitment, position)
//! ```
//!
//! The router only ever sees the resulting field element; derivation lives
//! here so wallets and tests produce the same values the circuit does.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::commitment::Commitment;
use crate::field::FieldElement;
use crate::poseidon::PoseidonHasher;

const NULLIFIER_DOMAIN: u64 = 0x4e55_4c4c; // "NULL"
const NK_DOMAIN: u64 = 0x434c_4b4e_4b; // "CLKNK"

/// A nullifier - unique tag for a spent note
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Nullifier(pub FieldElement);

impl Nullifier {
    pub fn new(value: FieldElement) -> Self {
        Self(value)
    }

    pub fn as_field(&self) -> &FieldElement {
        &self.0
    }

    /// Get raw bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        self.0.as_bytes()
    }

    /// Create from raw bytes
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(FieldElement(bytes))
    }
}

impl From<FieldElement> for Nullifier {
    fn from(value: FieldElement) -> Self {
        Self(value)
    }
}

impl AsRef<[u8]> for Nullifier {
    fn as_ref(&self) -> &[u8] {
        self.0.as_ref()
    }
}

impl fmt::Debug for Nullifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Nullifier({})", self.0)
    }
}

impl fmt::Display for Nullifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Nullifier derivation key (spending key)
///
/// Knowledge of this key is required to derive valid nullifiers.
#[derive(Clone)]
pub struct NullifierKey {
    key: FieldElement,
}

impl NullifierKey {
    /// Create from raw bytes
    pub fn from_bytes(key: [u8; 32]) -> Self {
        Self {
            key: FieldElement(key),
        }
    }

    /// Derive the nullifier for a note
    ///
    /// The tree position is absorbed so two notes with equal commitments
    /// still produce different nullifiers.
    pub fn derive_nullifier(&self, commitment: &Commitment, position: u64) -> Nullifier {
        let mut hasher = PoseidonHasher::new(NULLIFIER_DOMAIN);
        hasher
            .absorb(&self.derive_nk())
            .absorb(commitment.as_field())
            .absorb_u64(position);
        Nullifier(hasher.finish())
    }

    /// nk = Poseidon("CLKNK", ask)
    pub fn derive_nk(&self) -> FieldElement {
        let mut hasher = PoseidonHasher::new(NK_DOMAIN);
        hasher.absorb(&self.key);
        hasher.finish()
    }
}

impl fmt::Debug for NullifierKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("NullifierKey(..)")
    }
}
