//! Cloak Privacy SDK
//!
//! Shared primitives for the privacy action router and its clients.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                       Private Action                            │
//! │  ┌──────────────┐  ┌──────────────┐  ┌───────────────────────┐ │
//! │  │  Nullifiers  │  │ Commitments  │  │   Root transition     │ │
//! │  │  (spent)     │  │  (new notes) │  │   old_root → new_root │ │
//! │  └──────────────┘  └──────────────┘  └───────────────────────┘ │
//! │         │                 │                     │               │
//! │         ▼                 ▼                     ▼               │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │        Public inputs  [domain_tag, statement_digest, ..]│   │
//! │  │        checked by the router, then by the verifier      │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod address;
pub mod binding;
pub mod commitment;
pub mod domain;
pub mod field;
pub mod nullifier;
pub mod pool;
mod poseidon;

pub use address::Address;
pub use binding::{
    ACTION_PREFIX_LEN, ActionStatement, FINALIZE_PREFIX_LEN, SUBMIT_PREFIX_LEN,
    intent_finalize_digest, intent_submission_digest, intent_submission_prefix,
};
pub use commitment::{Commitment, CommitmentScheme, Root};
pub use domain::{ActionClass, ActionDomain, UnknownDomain};
pub use field::{FieldElement, FieldError};
pub use nullifier::{Nullifier, NullifierKey};
pub use pool::{PoolVersion, UnknownPoolVersion};
pub use poseidon::PoseidonHasher;
