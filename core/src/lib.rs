//! Cloak Core
//!
//! Privacy action router: proof verification, nullifier ledger, root store,
//! pool-version registry and the two-phase intent flow, with RocksDB
//! persistence and an HTTP surface.

pub mod api;
pub mod config;
pub mod error;
pub mod router;
pub mod storage;

pub use config::CloakConfig;
pub use error::{ErrorKind, Result, RouterError};
pub use router::{ActionRouter, ActionSubmission, RouterSettings};
