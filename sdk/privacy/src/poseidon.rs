//! Poseidon Sponge
//!
//! One parameter set (BN254 scalar field, rate 2, capacity 1, 8 full and
//! 57 partial rounds, alpha 5) shared by every digest in this crate.
//! Round constants are derived once and cached for the process lifetime.

use std::sync::OnceLock;

use ark_bn254::Fr;
use ark_crypto_primitives::sponge::{
    CryptographicSponge,
    poseidon::{PoseidonConfig, PoseidonSponge, find_poseidon_ark_and_mds},
};

use crate::field::FieldElement;

const PRIME_BITS: u64 = 254;
const RATE: usize = 2;
const CAPACITY: usize = 1;
const FULL_ROUNDS: u64 = 8;
const PARTIAL_ROUNDS: u64 = 57;
const ALPHA: u64 = 5;

fn config() -> &'static PoseidonConfig<Fr> {
    static CONFIG: OnceLock<PoseidonConfig<Fr>> = OnceLock::new();
    CONFIG.get_or_init(|| {
        let (ark, mds) =
            find_poseidon_ark_and_mds::<Fr>(PRIME_BITS, RATE, FULL_ROUNDS, PARTIAL_ROUNDS, 0);
        PoseidonConfig::new(
            FULL_ROUNDS as usize,
            PARTIAL_ROUNDS as usize,
            ALPHA,
            mds,
            ark,
            RATE,
            CAPACITY,
        )
    })
}

/// Incremental Poseidon hasher with a mandatory domain separator
pub struct PoseidonHasher {
    sponge: PoseidonSponge<Fr>,
}

impl PoseidonHasher {
    /// Start a digest; `domain` keeps unrelated digests from colliding
    pub fn new(domain: u64) -> Self {
        let mut sponge = PoseidonSponge::new(config());
        sponge.absorb(&Fr::from(domain));
        Self { sponge }
    }

    pub fn absorb(&mut self, value: &FieldElement) -> &mut Self {
        self.sponge.absorb(&value.to_fr());
        self
    }

    pub fn absorb_u64(&mut self, value: u64) -> &mut Self {
        self.sponge.absorb(&Fr::from(value));
        self
    }

    /// Absorb a length-prefixed sequence
    pub fn absorb_all(&mut self, values: &[FieldElement]) -> &mut Self {
        self.absorb_u64(values.len() as u64);
        for value in values {
            self.absorb(value);
        }
        self
    }

    pub fn finish(mut self) -> FieldElement {
        let out = self.sponge.squeeze_field_elements::<Fr>(1)[0];
        FieldElement::from_fr(out)
    }
}
