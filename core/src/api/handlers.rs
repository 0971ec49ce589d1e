//! API Handlers
//!
//! Request handlers for the HTTP API. Every mutating call takes the router
//! lock for its whole duration, so requests are applied one at a time.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{FromRequestParts, Json, Path, Query, State},
    http::request::Parts,
    response::IntoResponse,
};
use cloak_privacy::{Address, Commitment, FieldElement, Nullifier};
use log::{debug, info};
use tokio::sync::Mutex;

use super::types::*;
use crate::router::{
    ActionReceipt, ActionRouter, ActionSubmission, CommitmentIndex, EventRecord, IntentPayload,
    MemoryEventSink,
};

/// Header carrying the calling account's address
pub const CALLER_HEADER: &str = "x-cloak-caller";

/// Events returned by `/events` when no limit is given
const DEFAULT_EVENT_LIMIT: usize = 100;

// ============================================================================
// Shared State
// ============================================================================

/// Shared application state for API handlers
#[derive(Clone)]
pub struct ApiState {
    pub router: Arc<Mutex<ActionRouter>>,
    pub events: Arc<MemoryEventSink>,
    pub index: Arc<CommitmentIndex>,
    pub start_time: Instant,
}

/// Caller identity taken from [`CALLER_HEADER`]
pub struct Caller(pub Address);

impl<S: Send + Sync> FromRequestParts<S> for Caller {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(CALLER_HEADER)
            .ok_or_else(|| ApiError::bad_request(format!("missing {CALLER_HEADER} header")))?
            .to_str()
            .map_err(|_| ApiError::bad_request(format!("{CALLER_HEADER} is not ASCII")))?;

        Address::from_hex(raw)
            .map(Caller)
            .map_err(|e| ApiError::bad_request(format!("invalid {CALLER_HEADER}: {e}")))
    }
}

fn parse_felt(raw: &str) -> Result<FieldElement, ApiError> {
    FieldElement::from_hex(raw).map_err(|e| ApiError::bad_request(e.to_string()))
}

// ============================================================================
// Health & Status
// ============================================================================

/// Health check endpoint
pub async fn health(State(state): State<ApiState>) -> impl IntoResponse {
    Json(HealthResponse {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}

/// Roots, counters and verifier mode
pub async fn status(State(state): State<ApiState>) -> impl IntoResponse {
    let router = state.router.lock().await.status();
    Json(StatusResponse {
        router,
        indexed_commitments: state.index.len(),
        commitments_by_domain: state.index.domain_counts(),
    })
}

// ============================================================================
// Actions
// ============================================================================

/// Route a single-phase private action
pub async fn submit_action(
    State(state): State<ApiState>,
    Caller(caller): Caller,
    Json(submission): Json<ActionSubmission>,
) -> Result<Json<ActionReceipt>, ApiError> {
    debug!(
        "POST /actions: {} from {} ({} nullifiers)",
        submission.domain,
        caller,
        submission.nullifiers.len()
    );
    let mut router = state.router.lock().await;
    let receipt = router.submit_action(&caller, &submission)?;
    Ok(Json(receipt))
}

// ============================================================================
// Intents
// ============================================================================

/// Phase one: store an encrypted intent
pub async fn submit_intent(
    State(state): State<ApiState>,
    Caller(caller): Caller,
    Json(req): Json<SubmitIntentRequest>,
) -> Result<Json<SubmitIntentResponse>, ApiError> {
    let payload = IntentPayload {
        domain: req.domain,
        ciphertext: req.ciphertext,
        commitment: req.commitment,
    };

    let mut router = state.router.lock().await;
    let id = router.submit_intent(&caller, payload, &req.proof, &req.public_inputs)?;
    Ok(Json(SubmitIntentResponse { id }))
}

/// Phase two: relayer finalizes with concrete payout parameters
pub async fn finalize_intent(
    State(state): State<ApiState>,
    Caller(caller): Caller,
    Path(id): Path<u64>,
    Json(req): Json<FinalizeIntentRequest>,
) -> Result<Json<FinalizeIntentResponse>, ApiError> {
    let mut router = state.router.lock().await;
    let sequence = router.finalize_intent(
        &caller,
        id,
        req.recipient,
        req.nullifier,
        &req.public_inputs,
        &req.proof,
    )?;
    Ok(Json(FinalizeIntentResponse { id, sequence }))
}

pub async fn get_intent(
    State(state): State<ApiState>,
    Path(id): Path<u64>,
) -> Result<Json<IntentResponse>, ApiError> {
    let router = state.router.lock().await;
    router
        .pending_action(id)
        .map(|record| Json(IntentResponse::new(id, record)))
        .ok_or_else(|| ApiError::not_found(format!("intent {id} not found")))
}

// ============================================================================
// Queries
// ============================================================================

pub async fn get_nullifier(
    State(state): State<ApiState>,
    Path(raw): Path<String>,
) -> Result<Json<NullifierResponse>, ApiError> {
    let nullifier = Nullifier(parse_felt(&raw)?);
    let used = state.router.lock().await.is_nullifier_used(&nullifier);
    Ok(Json(NullifierResponse { nullifier, used }))
}

/// Where a commitment was inserted, if anywhere
pub async fn get_commitment(
    State(state): State<ApiState>,
    Path(raw): Path<String>,
) -> Result<Json<CommitmentResponse>, ApiError> {
    let commitment = Commitment(parse_felt(&raw)?);
    Ok(Json(CommitmentResponse {
        commitment,
        record: state.index.locate(&commitment),
    }))
}

/// Recent audit events, oldest first
pub async fn list_events(
    State(state): State<ApiState>,
    Query(query): Query<EventsQuery>,
) -> Json<Vec<EventRecord>> {
    Json(state.events.recent(query.limit.unwrap_or(DEFAULT_EVENT_LIMIT)))
}

// ============================================================================
// Administration
// ============================================================================

pub async fn set_verification_mode(
    State(state): State<ApiState>,
    Caller(caller): Caller,
    Json(req): Json<SetVerificationModeRequest>,
) -> Result<Json<VerificationModeResponse>, ApiError> {
    let mut router = state.router.lock().await;
    let mode = router.set_verification_mode(&caller, req.mode)?;
    info!("Verification mode switched to {} via API", mode);
    Ok(Json(VerificationModeResponse { mode }))
}

pub async fn set_active_version(
    State(state): State<ApiState>,
    Caller(caller): Caller,
    Json(req): Json<SetActiveVersionRequest>,
) -> Result<Json<ActiveVersionResponse>, ApiError> {
    let mut router = state.router.lock().await;
    router.set_active_version(&caller, req.version)?;
    let status = router.status();
    Ok(Json(ActiveVersionResponse {
        active_version: status.active_version,
        redeem_only: status.redeem_only,
    }))
}
