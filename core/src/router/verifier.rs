//! Verifier Adapter
//!
//! Uniform `verify(proof, public_inputs) -> bool` over interchangeable
//! proof backends, with an authority-gated mode switch.
//!
//! ```text
//!                 ┌─────────────────────────┐
//!   verify(..) ──►│     VerifierAdapter     │
//!                 │   mode: Garaga (0)      │
//!                 └───────────┬─────────────┘
//!                             │ dispatch on current mode
//!       ┌──────────────┬──────┴───────┬───────────────┐
//!       ▼              ▼              ▼               ▼
//!   Garaga (0)     Tongo (1)    Semaphore (2)     Mock (3)
//!   Groth16        operator     Groth16           fixed bool
//!   BN254          supplied     (membership vk)
//! ```
//!
//! Proofs travel as field elements. A Groth16 proof is eight big-endian
//! base-field coordinates:
//!
//! ```text
//! [A.x, A.y, B.x.c0, B.x.c1, B.y.c0, B.y.c1, C.x, C.y]
//! ```
//!
//! (0, 0) encodes the point at infinity.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::{Context, Result as AnyResult};
use ark_bn254::{Bn254, Fq, Fq2, Fr, G1Affine, G2Affine};
use ark_ff::{BigInteger, PrimeField};
use ark_groth16::{Groth16, PreparedVerifyingKey, Proof, VerifyingKey};
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use ark_snark::SNARK;
use cloak_privacy::{Address, FieldElement};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::error::{Result, RouterError};

/// Number of field elements in an encoded Groth16 proof
pub const GROTH16_PROOF_LEN: usize = 8;

/// Capability every proof backend implements
pub trait ProofVerifier: Send + Sync {
    /// Accept or reject; malformed input is a rejection, never a panic
    fn verify(&self, proof: &[FieldElement], public_inputs: &[FieldElement]) -> bool;

    /// Short backend name for logs and status
    fn label(&self) -> &'static str;
}

// ============================================================================
// Verification Modes
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerificationMode {
    /// Production zk-SNARK verifier (Groth16 over BN254)
    Garaga,
    /// Alternative proof system
    Tongo,
    /// Group-membership proofs
    Semaphore,
    /// Deterministic test backend
    Mock,
}

impl VerificationMode {
    pub const ALL: [VerificationMode; 4] = [
        VerificationMode::Garaga,
        VerificationMode::Tongo,
        VerificationMode::Semaphore,
        VerificationMode::Mock,
    ];

    pub fn as_u8(self) -> u8 {
        match self {
            Self::Garaga => 0,
            Self::Tongo => 1,
            Self::Semaphore => 2,
            Self::Mock => 3,
        }
    }

    pub fn from_u8(raw: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.as_u8() == raw)
    }

    /// Parse an operator label; an empty label means the default verifier
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "" | "garaga" | "groth16" => Some(Self::Garaga),
            "tongo" => Some(Self::Tongo),
            "semaphore" | "sema" => Some(Self::Semaphore),
            "mock" => Some(Self::Mock),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Garaga => "garaga",
            Self::Tongo => "tongo",
            Self::Semaphore => "semaphore",
            Self::Mock => "mock",
        }
    }
}

impl Default for VerificationMode {
    fn default() -> Self {
        Self::Garaga
    }
}

impl fmt::Display for VerificationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VerificationMode {
    type Err = RouterError;

    /// Accepts either the numeric discriminant or a label
    fn from_str(s: &str) -> Result<Self> {
        let parsed = match s.trim().parse::<u8>() {
            Ok(raw) => Self::from_u8(raw),
            Err(_) => Self::from_label(s),
        };
        parsed.ok_or_else(|| RouterError::UnsupportedMode(s.to_string()))
    }
}

// ============================================================================
// Mock Backend
// ============================================================================

/// Returns a fixed answer; counts how often it was asked
pub struct MockVerifier {
    result: bool,
    calls: AtomicU64,
}

impl MockVerifier {
    pub fn new(result: bool) -> Self {
        Self {
            result,
            calls: AtomicU64::new(0),
        }
    }

    pub fn accept_all() -> Self {
        Self::new(true)
    }

    pub fn reject_all() -> Self {
        Self::new(false)
    }

    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }
}

impl ProofVerifier for MockVerifier {
    fn verify(&self, _proof: &[FieldElement], _public_inputs: &[FieldElement]) -> bool {
        self.calls.fetch_add(1, Ordering::Relaxed);
        self.result
    }

    fn label(&self) -> &'static str {
        "mock"
    }
}

// ============================================================================
// Groth16 Backend
// ============================================================================

/// Groth16 verifier over BN254
pub struct Groth16Verifier {
    pvk: PreparedVerifyingKey<Bn254>,
    num_public_inputs: usize,
    vk_hash: [u8; 32],
    label: &'static str,
}

impl Groth16Verifier {
    pub fn new(vk: VerifyingKey<Bn254>) -> AnyResult<Self> {
        let mut vk_bytes = Vec::new();
        vk.serialize_compressed(&mut vk_bytes)
            .context("Failed to serialize verifying key")?;
        let vk_hash = *blake3::hash(&vk_bytes).as_bytes();

        let num_public_inputs = vk.gamma_abc_g1.len().saturating_sub(1);
        let pvk = Groth16::<Bn254>::process_vk(&vk)
            .map_err(|e| anyhow::anyhow!("Failed to prepare verifying key: {:?}", e))?;

        Ok(Self {
            pvk,
            num_public_inputs,
            vk_hash,
            label: "groth16",
        })
    }

    /// Load from compressed arkworks bytes
    pub fn from_bytes(bytes: &[u8]) -> AnyResult<Self> {
        let vk = VerifyingKey::<Bn254>::deserialize_compressed(bytes)
            .context("Failed to deserialize verifying key")?;
        Self::new(vk)
    }

    /// Load from a file of compressed arkworks bytes
    pub fn from_file<P: AsRef<Path>>(path: P) -> AnyResult<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read verifying key: {}", path.display()))?;
        let verifier = Self::from_bytes(&bytes)?;
        info!(
            "Loaded Groth16 verifying key from {} (hash {})",
            path.display(),
            hex::encode(&verifier.vk_hash[..8])
        );
        Ok(verifier)
    }

    /// Relabel the backend, e.g. when a membership circuit shares this verifier
    pub fn with_label(mut self, label: &'static str) -> Self {
        self.label = label;
        self
    }

    pub fn vk_hash(&self) -> [u8; 32] {
        self.vk_hash
    }

    pub fn num_public_inputs(&self) -> usize {
        self.num_public_inputs
    }

    /// Client-side encoding of an arkworks proof
    pub fn encode_proof(proof: &Proof<Bn254>) -> Vec<FieldElement> {
        let (ax, ay) = g1_coords(&proof.a);
        let (bx, by) = g2_coords(&proof.b);
        let (cx, cy) = g1_coords(&proof.c);

        vec![
            fq_to_felt(ax),
            fq_to_felt(ay),
            fq_to_felt(bx.c0),
            fq_to_felt(bx.c1),
            fq_to_felt(by.c0),
            fq_to_felt(by.c1),
            fq_to_felt(cx),
            fq_to_felt(cy),
        ]
    }

    /// Decode and validate a proof; `None` on any malformed coordinate
    pub fn decode_proof(encoded: &[FieldElement]) -> Option<Proof<Bn254>> {
        if encoded.len() != GROTH16_PROOF_LEN {
            return None;
        }

        let a = g1_from_felts(&encoded[0], &encoded[1])?;
        let b = g2_from_felts(&encoded[2], &encoded[3], &encoded[4], &encoded[5])?;
        let c = g1_from_felts(&encoded[6], &encoded[7])?;

        Some(Proof { a, b, c })
    }
}

impl ProofVerifier for Groth16Verifier {
    fn verify(&self, proof: &[FieldElement], public_inputs: &[FieldElement]) -> bool {
        if public_inputs.len() != self.num_public_inputs {
            debug!(
                "groth16: expected {} public inputs, got {}",
                self.num_public_inputs,
                public_inputs.len()
            );
            return false;
        }

        let Some(proof) = Self::decode_proof(proof) else {
            debug!("groth16: malformed proof encoding");
            return false;
        };

        let Some(inputs) = public_inputs
            .iter()
            .map(fr_from_felt)
            .collect::<Option<Vec<Fr>>>()
        else {
            debug!("groth16: public input outside the scalar field");
            return false;
        };

        Groth16::<Bn254>::verify_with_processed_vk(&self.pvk, &inputs, &proof).unwrap_or(false)
    }

    fn label(&self) -> &'static str {
        self.label
    }
}

// Coordinates must be canonical: reject encodings >= the field modulus.

fn fq_from_felt(value: &FieldElement) -> Option<Fq> {
    let fq = Fq::from_be_bytes_mod_order(value.as_bytes());
    (fq_to_felt(fq) == *value).then_some(fq)
}

fn fr_from_felt(value: &FieldElement) -> Option<Fr> {
    let fr = value.to_fr();
    (FieldElement::from_fr(fr) == *value).then_some(fr)
}

fn fq_to_felt(value: Fq) -> FieldElement {
    let bytes = value.into_bigint().to_bytes_be();
    let mut arr = [0u8; 32];
    arr[32 - bytes.len()..].copy_from_slice(&bytes);
    FieldElement(arr)
}

fn g1_coords(point: &G1Affine) -> (Fq, Fq) {
    if point.infinity {
        (Fq::from(0u64), Fq::from(0u64))
    } else {
        (point.x, point.y)
    }
}

fn g2_coords(point: &G2Affine) -> (Fq2, Fq2) {
    if point.infinity {
        (Fq2::from(0u64), Fq2::from(0u64))
    } else {
        (point.x, point.y)
    }
}

fn g1_from_felts(x: &FieldElement, y: &FieldElement) -> Option<G1Affine> {
    if x.is_zero() && y.is_zero() {
        return Some(G1Affine::identity());
    }
    let point = G1Affine::new_unchecked(fq_from_felt(x)?, fq_from_felt(y)?);
    (point.is_on_curve() && point.is_in_correct_subgroup_assuming_on_curve()).then_some(point)
}

fn g2_from_felts(
    x0: &FieldElement,
    x1: &FieldElement,
    y0: &FieldElement,
    y1: &FieldElement,
) -> Option<G2Affine> {
    if [x0, x1, y0, y1].iter().all(|v| v.is_zero()) {
        return Some(G2Affine::identity());
    }
    let x = Fq2::new(fq_from_felt(x0)?, fq_from_felt(x1)?);
    let y = Fq2::new(fq_from_felt(y0)?, fq_from_felt(y1)?);
    let point = G2Affine::new_unchecked(x, y);
    (point.is_on_curve() && point.is_in_correct_subgroup_assuming_on_curve()).then_some(point)
}

// ============================================================================
// Adapter
// ============================================================================

/// One backend per mode, one mode live at a time
pub struct VerifierAdapter {
    authority: Address,
    mode: VerificationMode,
    backends: BTreeMap<VerificationMode, Arc<dyn ProofVerifier>>,
}

impl VerifierAdapter {
    /// Create an adapter whose initial mode is served by `backend`
    pub fn new(
        authority: Address,
        mode: VerificationMode,
        backend: Arc<dyn ProofVerifier>,
    ) -> Self {
        let mut backends: BTreeMap<VerificationMode, Arc<dyn ProofVerifier>> = BTreeMap::new();
        backends.insert(mode, backend);
        Self {
            authority,
            mode,
            backends,
        }
    }

    /// Adapter that serves only the mock backend
    pub fn mock(authority: Address, accept: bool) -> Self {
        Self::new(
            authority,
            VerificationMode::Mock,
            Arc::new(MockVerifier::new(accept)),
        )
    }

    /// Install (or replace) the backend for a mode
    pub fn register(&mut self, mode: VerificationMode, backend: Arc<dyn ProofVerifier>) {
        debug!("verifier backend {} registered for {}", backend.label(), mode);
        self.backends.insert(mode, backend);
    }

    pub fn mode(&self) -> VerificationMode {
        self.mode
    }

    pub fn authority(&self) -> &Address {
        &self.authority
    }

    pub fn supported_modes(&self) -> Vec<VerificationMode> {
        self.backends.keys().copied().collect()
    }

    /// Hot-swap the live backend
    pub fn set_verification_mode(
        &mut self,
        caller: &Address,
        raw_mode: u8,
    ) -> Result<VerificationMode> {
        if caller.is_placeholder() || caller != &self.authority {
            warn!("verification mode change refused for {}", caller);
            return Err(RouterError::Unauthorized(caller.to_string()));
        }

        let mode = VerificationMode::from_u8(raw_mode)
            .ok_or_else(|| RouterError::UnsupportedMode(raw_mode.to_string()))?;
        if !self.backends.contains_key(&mode) {
            return Err(RouterError::UnsupportedMode(format!(
                "{mode} has no registered backend"
            )));
        }

        info!("verification mode {} -> {}", self.mode, mode);
        self.mode = mode;
        Ok(mode)
    }
}

impl ProofVerifier for VerifierAdapter {
    fn verify(&self, proof: &[FieldElement], public_inputs: &[FieldElement]) -> bool {
        if self.mode != VerificationMode::Mock && is_dummy_payload(proof, public_inputs) {
            warn!("dummy proof payload rejected in {} mode", self.mode);
            return false;
        }

        match self.backends.get(&self.mode) {
            Some(backend) => backend.verify(proof, public_inputs),
            None => false,
        }
    }

    fn label(&self) -> &'static str {
        self.backends
            .get(&self.mode)
            .map(|b| b.label())
            .unwrap_or("unconfigured")
    }
}

/// The `[0x1]` / `[0x1]` placeholder dev clients send before proving works
fn is_dummy_payload(proof: &[FieldElement], public_inputs: &[FieldElement]) -> bool {
    let one = FieldElement::from_u64(1);
    proof == [one] && public_inputs == [one]
}
