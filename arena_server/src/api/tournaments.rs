//! Player-facing tournament handlers.
//!
//! Listing and lookup are public and never include room credentials.
//! Joining and revealing credentials require a bearer token.
//!
//! # Examples
//!
//! List open tournaments:
//! ```bash
//! curl "http://localhost:8080/api/v1/tournaments?status=open"
//! ```
//!
//! Join a tournament:
//! ```bash
//! curl -X POST http://localhost:8080/api/v1/tournaments/1/join \
//!   -H "Authorization: Bearer TOKEN" \
//!   -H "Content-Type: application/json" \
//!   -d '{"inGameName": "Sn1per", "uid": "512345678"}'
//! ```

use arena_core::auth::AuthUser;
use arena_core::tournament::{
    JoinDetails, RevealedCredentials, TournamentId, TournamentStatus, TournamentSummary,
};
use axum::{
    Json,
    extract::{Extension, Path, Query, State},
};
use serde::{Deserialize, Serialize};

use super::AppState;
use super::error::{ApiError, ApiResult, kind_label};
use crate::metrics;

#[derive(Debug, Default, Deserialize)]
pub struct StatusQuery {
    pub status: Option<String>,
}

impl StatusQuery {
    /// Parsed `?status=` filter, empty meaning no filter
    pub fn status(&self) -> ApiResult<Option<TournamentStatus>> {
        match self.status.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(raw) => raw.parse().map(Some).map_err(ApiError::bad_request),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SummaryListResponse {
    pub success: bool,
    pub tournaments: Vec<TournamentSummary>,
}

#[derive(Debug, Serialize)]
pub struct SummaryResponse {
    pub success: bool,
    pub tournament: TournamentSummary,
}

#[derive(Debug, Serialize)]
pub struct CredentialsResponse {
    pub success: bool,
    pub credentials: RevealedCredentials,
}

/// List visible tournaments
///
/// # Errors
///
/// - `400 Bad Request`: Unknown status filter
pub async fn list_tournaments(
    State(state): State<AppState>,
    Query(query): Query<StatusQuery>,
) -> ApiResult<Json<SummaryListResponse>> {
    let tournaments = state.manager.list_public(query.status()?).await?;
    Ok(Json(SummaryListResponse {
        success: true,
        tournaments,
    }))
}

/// One visible tournament
///
/// # Errors
///
/// - `404 Not Found`: Unknown or hidden tournament
pub async fn get_tournament(
    State(state): State<AppState>,
    Path(id): Path<TournamentId>,
) -> ApiResult<Json<SummaryResponse>> {
    let tournament = state.manager.get_public_tournament(id).await?;
    Ok(Json(SummaryResponse {
        success: true,
        tournament,
    }))
}

/// Join a tournament, paying its entry fee
///
/// # Errors
///
/// - `400 Bad Request`: Missing in-game name or UID with no profile fallback
/// - `402 Payment Required`: Wallet cannot cover the entry fee
/// - `404 Not Found`: Unknown or hidden tournament, or no wallet for a paid entry
/// - `409 Conflict`: Not open, full, or already joined
pub async fn join_tournament(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<TournamentId>,
    Json(details): Json<JoinDetails>,
) -> ApiResult<Json<SummaryResponse>> {
    // Hidden tournaments cannot be joined by players
    state.manager.get_public_tournament(id).await?;

    match state.manager.join_tournament(id, user.user_id, details).await {
        Ok(tournament) => {
            metrics::tournament_joins_total("ok");
            Ok(Json(SummaryResponse {
                success: true,
                tournament: TournamentSummary::from(&tournament),
            }))
        }
        Err(e) => {
            metrics::tournament_joins_total(kind_label(e.kind()));
            Err(e.into())
        }
    }
}

/// Room credentials for a participant
///
/// # Errors
///
/// - `403 Forbidden`: Not a participant, or the room is not available yet
/// - `404 Not Found`: Unknown or hidden tournament
pub async fn get_credentials(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<TournamentId>,
) -> ApiResult<Json<CredentialsResponse>> {
    state.manager.get_public_tournament(id).await?;
    let credentials = state.manager.reveal_credentials(id, user.user_id).await?;
    Ok(Json(CredentialsResponse {
        success: true,
        credentials,
    }))
}
