//! Router Errors
//!
//! Every failure aborts the whole call; nothing is partially applied.
//!
//! | kind          | variants                                              | retry          |
//! |---------------|-------------------------------------------------------|----------------|
//! | Configuration | RouterNotConfigured, UnsupportedMode, VerifierAlreadySet, Unauthorized | admin fix |
//! | Validation    | RootMismatch, NonCanonicalElement, InvalidProof, InvalidSubmissionProof, UnknownActionDomain, UnknownAction, PoolRedeemOnly, HandlerRejected | caller resubmits |
//! | Integrity     | NullifierAlreadyUsed, AlreadyFinalized                | never          |
//! | Internal      | Storage                                               | operator       |

use cloak_privacy::{FieldElement, Nullifier, PoolVersion, Root};
use thiserror::Error;

use cloak_privacy::ActionDomain;

pub type Result<T> = std::result::Result<T, RouterError>;

/// Failure classes used for reporting and HTTP mapping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Validation,
    Integrity,
    Internal,
}

#[derive(Debug, Error)]
pub enum RouterError {
    #[error("no verifier registered for this router")]
    RouterNotConfigured,

    #[error("unsupported verification mode: {0}")]
    UnsupportedMode(String),

    #[error("verifier already set")]
    VerifierAlreadySet,

    #[error("caller {0} is not authorized for this operation")]
    Unauthorized(String),

    #[error("root mismatch for pool {version}: expected {expected}, got {got}")]
    RootMismatch {
        version: PoolVersion,
        expected: Root,
        got: Root,
    },

    #[error("{what} {value} is not a canonical field element")]
    NonCanonicalElement {
        what: &'static str,
        value: FieldElement,
    },

    #[error("invalid proof: {0}")]
    InvalidProof(&'static str),

    #[error("invalid submission proof: {0}")]
    InvalidSubmissionProof(&'static str),

    #[error("no handler registered for action domain {0}")]
    UnknownActionDomain(ActionDomain),

    #[error("unknown pending action {0}")]
    UnknownAction(u64),

    #[error("pool {0} is redeem-only")]
    PoolRedeemOnly(PoolVersion),

    #[error("handler for {domain} rejected action: {reason}")]
    HandlerRejected {
        domain: ActionDomain,
        reason: String,
    },

    #[error("nullifier already used: {0}")]
    NullifierAlreadyUsed(Nullifier),

    #[error("pending action {0} already finalized")]
    AlreadyFinalized(u64),

    #[error("storage error: {0:#}")]
    Storage(#[from] anyhow::Error),
}

impl RouterError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::RouterNotConfigured
            | Self::UnsupportedMode(_)
            | Self::VerifierAlreadySet
            | Self::Unauthorized(_) => ErrorKind::Configuration,
            Self::RootMismatch { .. }
            | Self::NonCanonicalElement { .. }
            | Self::InvalidProof(_)
            | Self::InvalidSubmissionProof(_)
            | Self::UnknownActionDomain(_)
            | Self::UnknownAction(_)
            | Self::PoolRedeemOnly(_)
            | Self::HandlerRejected { .. } => ErrorKind::Validation,
            Self::NullifierAlreadyUsed(_) | Self::AlreadyFinalized(_) => ErrorKind::Integrity,
            Self::Storage(_) => ErrorKind::Internal,
        }
    }

    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            Self::RouterNotConfigured => "ROUTER_NOT_CONFIGURED",
            Self::UnsupportedMode(_) => "UNSUPPORTED_MODE",
            Self::VerifierAlreadySet => "VERIFIER_ALREADY_SET",
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::RootMismatch { .. } => "ROOT_MISMATCH",
            Self::NonCanonicalElement { .. } => "NON_CANONICAL_ELEMENT",
            Self::InvalidProof(_) => "INVALID_PROOF",
            Self::InvalidSubmissionProof(_) => "INVALID_SUBMISSION_PROOF",
            Self::UnknownActionDomain(_) => "UNKNOWN_ACTION_DOMAIN",
            Self::UnknownAction(_) => "UNKNOWN_ACTION",
            Self::PoolRedeemOnly(_) => "POOL_REDEEM_ONLY",
            Self::HandlerRejected { .. } => "HANDLER_REJECTED",
            Self::NullifierAlreadyUsed(_) => "NULLIFIER_ALREADY_USED",
            Self::AlreadyFinalized(_) => "ALREADY_FINALIZED",
            Self::Storage(_) => "STORAGE_ERROR",
        }
    }
}
