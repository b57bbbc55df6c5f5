//! Admin tournament handlers.
//!
//! Handlers check the caller's permission and request shape; every business
//! rule is enforced by the tournament engine.
//!
//! | Permission | Operations |
//! |---|---|
//! | `ViewTournaments` | list, inspect, participant search, audit log |
//! | `ManageTournaments` | create, credentials, visibility |
//! | `SettleTournaments` | finalize, cancel |
//! | `OverrideStatus` | forced status writes |

use arena_core::auth::{AuthUser, Permission};
use arena_core::tournament::{
    AuditRecord, CredentialUpdate, ListFilter, NewTournament, ParticipantView, Payout, Refund,
    Tournament, TournamentId, TournamentStatus, WinnerSelection,
};
use axum::{
    Json,
    extract::{Extension, Path, Query, State},
    http::StatusCode,
};
use serde::{Deserialize, Deserializer, Serialize};

use super::AppState;
use super::error::{ApiError, ApiResult};
use super::middleware::require_permission;
use super::tournaments::StatusQuery;
use crate::{logging, metrics};

#[derive(Debug, Serialize)]
pub struct TournamentResponse {
    pub success: bool,
    pub tournament: Tournament,
}

impl TournamentResponse {
    fn ok(tournament: Tournament) -> Json<Self> {
        Json(Self {
            success: true,
            tournament,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct TournamentListResponse {
    pub success: bool,
    pub tournaments: Vec<Tournament>,
}

#[derive(Debug, Serialize)]
pub struct SettlementResponse {
    pub success: bool,
    pub tournament: Tournament,
    pub payouts: Vec<Payout>,
}

#[derive(Debug, Serialize)]
pub struct CancellationResponse {
    pub success: bool,
    pub tournament: Tournament,
    pub refunds: Vec<Refund>,
}

#[derive(Debug, Serialize)]
pub struct ParticipantsResponse {
    pub success: bool,
    pub participants: Vec<ParticipantView>,
}

#[derive(Debug, Serialize)]
pub struct AuditResponse {
    pub success: bool,
    pub records: Vec<AuditRecord>,
}

/// Partial update; at least one field must be present
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TournamentPatch {
    #[serde(default, deserialize_with = "status_any_case")]
    pub status: Option<TournamentStatus>,
    pub is_visible: Option<bool>,
}

/// Same spelling rules as the `?status=` filter
fn status_any_case<'de, D>(deserializer: D) -> Result<Option<TournamentStatus>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer)?
        .map(|raw| raw.trim().parse().map_err(serde::de::Error::custom))
        .transpose()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalizeRequest {
    pub rank1: Option<i64>,
    pub rank2: Option<i64>,
    pub rank3: Option<i64>,
    #[serde(default)]
    pub force_advance: bool,
}

impl FinalizeRequest {
    fn selection(&self) -> WinnerSelection {
        WinnerSelection {
            rank1: self.rank1,
            rank2: self.rank2,
            rank3: self.rank3,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

/// Every tournament including hidden ones, `?status=` optional
pub async fn list_tournaments(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<StatusQuery>,
) -> ApiResult<Json<TournamentListResponse>> {
    require_permission(&user, Permission::ViewTournaments, None)?;
    let filter = ListFilter {
        include_hidden: true,
        status: query.status()?,
    };
    let tournaments = state.manager.list_tournaments(filter).await?;
    Ok(Json(TournamentListResponse {
        success: true,
        tournaments,
    }))
}

/// Create a tournament
///
/// # Errors
///
/// - `400 Bad Request`: Title, slots, fee, prizes or start time invalid
pub async fn create_tournament(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<NewTournament>,
) -> ApiResult<(StatusCode, Json<TournamentResponse>)> {
    require_permission(&user, Permission::ManageTournaments, None)?;
    let tournament = state.manager.create_tournament(request).await?;
    metrics::tournaments_created_total();
    Ok((StatusCode::CREATED, TournamentResponse::ok(tournament)))
}

/// Full record including participants and credentials
pub async fn get_tournament(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<TournamentId>,
) -> ApiResult<Json<TournamentResponse>> {
    require_permission(&user, Permission::ViewTournaments, Some(id))?;
    let tournament = state.manager.get_tournament(id).await?;
    Ok(TournamentResponse::ok(tournament))
}

/// Toggle visibility and/or force a status
///
/// Visibility is applied before the status override.
///
/// # Errors
///
/// - `400 Bad Request`: Empty patch
/// - `403 Forbidden`: Missing permission for one of the fields
pub async fn update_tournament(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<TournamentId>,
    Json(patch): Json<TournamentPatch>,
) -> ApiResult<Json<TournamentResponse>> {
    if patch.status.is_none() && patch.is_visible.is_none() {
        return Err(ApiError::bad_request(
            "Nothing to update: provide status or isVisible",
        ));
    }
    if patch.is_visible.is_some() {
        require_permission(&user, Permission::ManageTournaments, Some(id))?;
    }
    if patch.status.is_some() {
        require_permission(&user, Permission::OverrideStatus, Some(id))?;
    }

    let mut tournament = match patch.is_visible {
        Some(visible) => Some(state.manager.set_visibility(id, visible).await?),
        None => None,
    };

    if let Some(status) = patch.status {
        let change = state.manager.force_status(id, status, user.user_id).await?;
        logging::log_security_event(
            "force_status",
            Some(user.user_id),
            Some(id),
            &format!("status forced from {} to {}", change.from, change.to),
        );
        metrics::status_overrides_total(&change.to.to_string());
        tournament = Some(change.tournament);
    }

    match tournament {
        Some(tournament) => Ok(TournamentResponse::ok(tournament)),
        None => Err(ApiError::bad_request("Nothing to update")),
    }
}

/// Set, schedule or reset room credentials
///
/// # Errors
///
/// - `400 Bad Request`: Blank fields, or auto release without a release time
/// - `409 Conflict`: Tournament is Completed or Cancelled
pub async fn set_credentials(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<TournamentId>,
    Json(update): Json<CredentialUpdate>,
) -> ApiResult<Json<TournamentResponse>> {
    require_permission(&user, Permission::ManageTournaments, Some(id))?;
    let tournament = state.manager.set_credentials(id, update).await?;
    Ok(TournamentResponse::ok(tournament))
}

/// Record winners and pay prizes
///
/// # Errors
///
/// - `400 Bad Request`: No first place, duplicate or non-participant winners
/// - `409 Conflict`: Already finalized, cancelled, or Open without `forceAdvance`
pub async fn finalize_tournament(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<TournamentId>,
    Json(request): Json<FinalizeRequest>,
) -> ApiResult<Json<SettlementResponse>> {
    require_permission(&user, Permission::SettleTournaments, Some(id))?;
    let settlement = state
        .manager
        .finalize_tournament(id, request.selection(), request.force_advance)
        .await?;

    metrics::settlements_total();
    metrics::coins_paid_out_total(settlement.total_paid());
    Ok(Json(SettlementResponse {
        success: true,
        tournament: settlement.tournament,
        payouts: settlement.payouts,
    }))
}

/// Cancel and refund every entry fee
///
/// # Errors
///
/// - `409 Conflict`: Already cancelled or completed
pub async fn cancel_tournament(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<TournamentId>,
) -> ApiResult<Json<CancellationResponse>> {
    require_permission(&user, Permission::SettleTournaments, Some(id))?;
    let cancellation = state.manager.cancel_tournament(id).await?;

    metrics::refunds_total(cancellation.refunds.len());
    Ok(Json(CancellationResponse {
        success: true,
        tournament: cancellation.tournament,
        refunds: cancellation.refunds,
    }))
}

/// Participant search by name, email, in-game name or user ID
pub async fn search_participants(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<TournamentId>,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Json<ParticipantsResponse>> {
    require_permission(&user, Permission::ViewTournaments, Some(id))?;
    let participants = state.manager.search_participants(id, &query.q).await?;
    Ok(Json(ParticipantsResponse {
        success: true,
        participants,
    }))
}

/// Forced status writes recorded for a tournament
pub async fn audit_log(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<TournamentId>,
) -> ApiResult<Json<AuditResponse>> {
    require_permission(&user, Permission::ViewTournaments, Some(id))?;
    // Unknown IDs are a 404 rather than an empty log
    state.manager.get_tournament(id).await?;
    let records = state.manager.audit_log(id).await?;
    Ok(Json(AuditResponse {
        success: true,
        records,
    }))
}
