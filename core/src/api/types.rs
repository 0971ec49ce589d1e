//! API Types
//!
//! Request/response types for the HTTP API. Field elements travel as
//! `0x`-prefixed hex strings.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use cloak_privacy::{ActionDomain, Address, Commitment, FieldElement, Nullifier, PoolVersion};
use serde::{Deserialize, Serialize};

use crate::error::{ErrorKind, RouterError};
use crate::router::{PendingAction, RouterStatus, VerificationMode};
use crate::storage::CommitmentRecord;

// ============================================================================
// Intents
// ============================================================================

/// Request to submit a pending intent
#[derive(Debug, Deserialize)]
pub struct SubmitIntentRequest {
    pub domain: ActionDomain,
    pub ciphertext: Vec<FieldElement>,
    pub commitment: Commitment,
    pub public_inputs: Vec<FieldElement>,
    pub proof: Vec<FieldElement>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitIntentResponse {
    pub id: u64,
}

/// Relayer request to finalize a pending intent
#[derive(Debug, Deserialize)]
pub struct FinalizeIntentRequest {
    pub recipient: Address,
    pub nullifier: Nullifier,
    pub public_inputs: Vec<FieldElement>,
    pub proof: Vec<FieldElement>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FinalizeIntentResponse {
    pub id: u64,
    pub sequence: u64,
}

/// Pending intent as exposed over HTTP (ciphertext length only)
#[derive(Debug, Serialize, Deserialize)]
pub struct IntentResponse {
    pub id: u64,
    pub domain: ActionDomain,
    pub commitment: Commitment,
    pub ciphertext_len: usize,
    pub finalized: bool,
    pub submitted_by: Address,
    pub recipient: Option<Address>,
    pub sequence: Option<u64>,
}

impl IntentResponse {
    pub fn new(id: u64, record: &PendingAction) -> Self {
        Self {
            id,
            domain: record.domain,
            commitment: record.commitment,
            ciphertext_len: record.ciphertext.len(),
            finalized: record.finalized,
            submitted_by: record.submitted_by,
            recipient: record.recipient,
            sequence: record.sequence,
        }
    }
}

// ============================================================================
// Queries
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct NullifierResponse {
    pub nullifier: Nullifier,
    pub used: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CommitmentResponse {
    pub commitment: Commitment,
    pub record: Option<CommitmentRecord>,
}

/// Query for recent audit events
#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    pub limit: Option<usize>,
}

/// Router status plus node-level counters
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    #[serde(flatten)]
    pub router: RouterStatus,
    pub indexed_commitments: usize,
    pub commitments_by_domain: Vec<(ActionDomain, u64)>,
}

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub healthy: bool,
    pub version: String,
    pub uptime_secs: u64,
}

// ============================================================================
// Administration
// ============================================================================

/// Numeric mode as the on-wire discriminant (0 garaga .. 3 mock)
#[derive(Debug, Deserialize)]
pub struct SetVerificationModeRequest {
    pub mode: u8,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VerificationModeResponse {
    pub mode: VerificationMode,
}

#[derive(Debug, Deserialize)]
pub struct SetActiveVersionRequest {
    pub version: PoolVersion,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ActiveVersionResponse {
    pub active_version: PoolVersion,
    pub redeem_only: Vec<PoolVersion>,
}

// ============================================================================
// Error Response
// ============================================================================

/// Standard error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: code.into(),
        }
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(msg, "BAD_REQUEST")
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(msg, "NOT_FOUND")
    }
}

/// Handler failure: status code plus the JSON body
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: ErrorResponse,
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            body: ErrorResponse::bad_request(msg),
        }
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            body: ErrorResponse::not_found(msg),
        }
    }
}

impl From<RouterError> for ApiError {
    fn from(err: RouterError) -> Self {
        let status = match (&err, err.kind()) {
            (RouterError::Unauthorized(_), _) => StatusCode::FORBIDDEN,
            (RouterError::UnknownAction(_), _) => StatusCode::NOT_FOUND,
            (RouterError::RouterNotConfigured, _) => StatusCode::SERVICE_UNAVAILABLE,
            (_, ErrorKind::Configuration) => StatusCode::BAD_REQUEST,
            (_, ErrorKind::Validation) => StatusCode::UNPROCESSABLE_ENTITY,
            (_, ErrorKind::Integrity) => StatusCode::CONFLICT,
            (_, ErrorKind::Internal) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        // storage details stay in the node log
        let message = match err.kind() {
            ErrorKind::Internal => "internal storage failure".to_string(),
            _ => err.to_string(),
        };

        Self {
            status,
            body: ErrorResponse::new(message, err.code()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}
