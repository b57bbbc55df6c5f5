//! Wallet handler: the caller's balance and recent ledger entries.

use arena_core::auth::AuthUser;
use arena_core::wallet::{Wallet, WalletEntry};
use axum::{
    Json,
    extract::{Extension, Query, State},
};
use serde::{Deserialize, Serialize};

use super::AppState;
use super::error::ApiResult;

const DEFAULT_ENTRY_LIMIT: i64 = 20;
const MAX_ENTRY_LIMIT: i64 = 100;

#[derive(Debug, Deserialize)]
pub struct EntriesQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct WalletResponse {
    pub success: bool,
    pub wallet: Wallet,
    pub entries: Vec<WalletEntry>,
}

/// Balance and newest-first entries, `?limit=` capped at 100
///
/// # Errors
///
/// - `404 Not Found`: The caller has no wallet yet
pub async fn get_wallet(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<EntriesQuery>,
) -> ApiResult<Json<WalletResponse>> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_ENTRY_LIMIT)
        .clamp(1, MAX_ENTRY_LIMIT);

    let wallet = state.wallets.get_wallet(user.user_id).await?;
    let entries = state.wallets.get_entries(user.user_id, limit).await?;

    Ok(Json(WalletResponse {
        success: true,
        wallet,
        entries,
    }))
}
