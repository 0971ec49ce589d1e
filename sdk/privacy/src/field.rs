//! Field Elements
//!
//! Every value that crosses the router boundary (roots, nullifiers,
//! commitments, proof limbs, public inputs) is a 32-byte field element.
//!
//! ```text
//! FieldElement = 32 bytes, big-endian
//! wire form    = "0x" + hex (leading zeros optional on input)
//! ```
//!
//! Conversion into the BN254 scalar field reduces modulo the field order,
//! so two byte strings that differ only by a multiple of `r` hash the same.
//! Anything compared by its bytes (nullifiers, commitments, roots) must be
//! checked with [`FieldElement::is_canonical`] before it is trusted.

use std::fmt;
use std::str::FromStr;

use ark_bn254::Fr;
use ark_ff::{BigInteger, PrimeField};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Errors produced while parsing field elements
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldError {
    #[error("field element must be 0x-prefixed hex, got {0:?}")]
    MissingPrefix(String),
    #[error("field element is not valid hex: {0:?}")]
    InvalidHex(String),
    #[error("field element has {0} hex digits (max 64)")]
    TooLong(usize),
}

/// A 32-byte field element (big-endian)
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldElement(pub [u8; 32]);

impl FieldElement {
    pub const ZERO: FieldElement = FieldElement([0u8; 32]);

    /// Create from raw bytes
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get raw bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Encode a small integer (tags, ids, counters)
    pub fn from_u64(value: u64) -> Self {
        let mut bytes = [0u8; 32];
        bytes[24..].copy_from_slice(&value.to_be_bytes());
        Self(bytes)
    }

    /// Read back a small integer; `None` if the value does not fit in 64 bits
    pub fn to_u64(&self) -> Option<u64> {
        if self.0[..24].iter().any(|b| *b != 0) {
            return None;
        }
        let mut tail = [0u8; 8];
        tail.copy_from_slice(&self.0[24..]);
        Some(u64::from_be_bytes(tail))
    }

    /// Parse a `0x`-prefixed hex string of up to 64 digits
    pub fn from_hex(raw: &str) -> Result<Self, FieldError> {
        let trimmed = raw.trim();
        let digits = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .ok_or_else(|| FieldError::MissingPrefix(raw.to_string()))?;

        if digits.is_empty() {
            return Err(FieldError::InvalidHex(raw.to_string()));
        }
        if digits.len() > 64 {
            return Err(FieldError::TooLong(digits.len()));
        }

        // left-pad to an even number of digits before decoding
        let padded = if digits.len() % 2 == 1 {
            format!("0{digits}")
        } else {
            digits.to_string()
        };
        let decoded =
            hex::decode(&padded).map_err(|_| FieldError::InvalidHex(raw.to_string()))?;

        let mut bytes = [0u8; 32];
        bytes[32 - decoded.len()..].copy_from_slice(&decoded);
        Ok(Self(bytes))
    }

    /// Full-width `0x` hex encoding
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// Reduce into the BN254 scalar field
    pub fn to_fr(&self) -> Fr {
        Fr::from_be_bytes_mod_order(&self.0)
    }

    /// Canonical encoding of a BN254 scalar
    pub fn from_fr(value: Fr) -> Self {
        let bytes = value.into_bigint().to_bytes_be();
        let mut arr = [0u8; 32];
        arr[32 - bytes.len()..].copy_from_slice(&bytes);
        Self(arr)
    }

    /// `true` when the bytes encode a value below the BN254 scalar order
    pub fn is_canonical(&self) -> bool {
        Self::from_fr(self.to_fr()) == *self
    }

    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|b| *b == 0)
    }
}

impl From<u64> for FieldElement {
    fn from(value: u64) -> Self {
        Self::from_u64(value)
    }
}

impl From<[u8; 32]> for FieldElement {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for FieldElement {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl FromStr for FieldElement {
    type Err = FieldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl fmt::Display for FieldElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for FieldElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FieldElement({})", self.to_hex())
    }
}

impl Serialize for FieldElement {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for FieldElement {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::from_hex(&raw).map_err(serde::de::Error::custom)
    }
}
