//! Audit Events
//!
//! Structured records of every accepted state change and admin action.
//! Events name actions, participants and recipients; they never carry
//! amounts, ciphertexts or proof data.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Mutex;

use cloak_privacy::{ActionDomain, Address, PoolVersion};
use serde::{Deserialize, Serialize};

use super::verifier::VerificationMode;

/// Events kept by the in-memory sink by default
pub const DEFAULT_EVENT_CAPACITY: usize = 1024;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuditEvent {
    ActionExecuted {
        sequence: u64,
        domain: ActionDomain,
        version: PoolVersion,
        participant: Address,
        nullifier_count: usize,
        commitment_count: usize,
    },
    IntentSubmitted {
        id: u64,
        domain: ActionDomain,
        participant: Address,
    },
    IntentFinalized {
        id: u64,
        sequence: u64,
        relayer: Address,
        recipient: Address,
    },
    VerificationModeChanged {
        mode: VerificationMode,
    },
    VerifierInstalled {
        mode: VerificationMode,
    },
    PoolVersionActivated {
        version: PoolVersion,
    },
}

impl fmt::Display for AuditEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ActionExecuted {
                sequence,
                domain,
                version,
                participant,
                nullifier_count,
                commitment_count,
            } => write!(
                f,
                "action #{sequence} {domain} on {version} by {participant} ({nullifier_count} nullifiers, {commitment_count} commitments)"
            ),
            Self::IntentSubmitted {
                id,
                domain,
                participant,
            } => write!(f, "intent {id} ({domain}) submitted by {participant}"),
            Self::IntentFinalized {
                id,
                sequence,
                relayer,
                recipient,
            } => write!(
                f,
                "intent {id} finalized as action #{sequence} by {relayer}, recipient {recipient}"
            ),
            Self::VerificationModeChanged { mode } => write!(f, "verification mode set to {mode}"),
            Self::VerifierInstalled { mode } => write!(f, "verifier installed in {mode} mode"),
            Self::PoolVersionActivated { version } => write!(f, "pool {version} activated"),
        }
    }
}

/// An event with the wall-clock time it was emitted
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRecord {
    pub timestamp_ms: i64,
    #[serde(flatten)]
    pub event: AuditEvent,
}

pub trait EventSink: Send + Sync {
    fn emit(&self, event: &AuditEvent);
}

/// Writes events to the `cloak::audit` log target
#[derive(Debug, Default, Clone, Copy)]
pub struct LogEventSink;

impl EventSink for LogEventSink {
    fn emit(&self, event: &AuditEvent) {
        log::info!(target: "cloak::audit", "{}", event);
    }
}

/// Bounded ring of recent events
pub struct MemoryEventSink {
    capacity: usize,
    records: Mutex<VecDeque<EventRecord>>,
}

impl MemoryEventSink {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            records: Mutex::new(VecDeque::new()),
        }
    }

    /// Most recent events, newest last
    pub fn recent(&self, limit: usize) -> Vec<EventRecord> {
        let records = self.records.lock().unwrap_or_else(|e| e.into_inner());
        let skip = records.len().saturating_sub(limit);
        records.iter().skip(skip).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryEventSink {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}

impl EventSink for MemoryEventSink {
    fn emit(&self, event: &AuditEvent) {
        let mut records = self.records.lock().unwrap_or_else(|e| e.into_inner());
        if records.len() == self.capacity {
            records.pop_front();
        }
        records.push_back(EventRecord {
            timestamp_ms: chrono::Utc::now().timestamp_millis(),
            event: event.clone(),
        });
    }
}
