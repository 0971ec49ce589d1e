//! Privacy Action Router
//!
//! Orchestrates verified state transitions over a shared note set.
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                         ActionRouter                          │
//! │                                                               │
//! │  submit_action / submit_intent / finalize_intent              │
//! │        │                                                      │
//! │        ├── VersionRegistry   (deposit target, redeem-only)    │
//! │        ├── RootStore         (one live root per version)      │
//! │        ├── VerifierAdapter   (pluggable proof backends)       │
//! │        ├── NullifierLedger   (global, append-only)            │
//! │        ├── ActionHandler     (per-domain downstream module)   │
//! │        ├── LedgerStore       (atomic batch persistence)       │
//! │        └── EventSink         (audit trail)                    │
//! └───────────────────────────────────────────────────────────────┘
//! ```

pub mod action_router;
pub mod events;
pub mod handler;
pub mod intents;
pub mod nullifiers;
pub mod roots;
pub mod verifier;
pub mod versions;

pub use action_router::{ActionReceipt, ActionRouter, ActionSubmission, RouterSettings, RouterStatus};
pub use events::{AuditEvent, EventRecord, EventSink, LogEventSink, MemoryEventSink};
pub use handler::{ActionHandler, CommitmentIndex, RoutedAction};
pub use intents::{IntentPayload, PendingAction};
pub use nullifiers::NullifierLedger;
pub use roots::RootStore;
pub use verifier::{
    Groth16Verifier, MockVerifier, ProofVerifier, VerificationMode, VerifierAdapter,
};
pub use versions::VersionRegistry;

#[cfg(test)]
mod tests;
