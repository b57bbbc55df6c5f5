//! HTTP API for the tournament server.
//!
//! # Modules
//!
//! - [`tournaments`]: Player listing, join and credential reveal
//! - [`admin`]: Tournament administration gated by role permissions
//! - [`wallet`]: The caller's balance and ledger entries
//! - [`middleware`]: Bearer token authentication
//! - [`request_id`]: Request IDs, request metrics and access logs
//! - [`error`]: Error taxonomy to HTTP status mapping
//!
//! # Endpoints Overview
//!
//! ```text
//! GET   /health                                        - Health check (public)
//! GET   /api/v1/tournaments?status=                    - Visible tournaments (public)
//! GET   /api/v1/tournaments/{id}                       - One visible tournament (public)
//! POST  /api/v1/tournaments/{id}/join                  - Join (auth)
//! GET   /api/v1/tournaments/{id}/credentials           - Room details (auth, participants)
//! GET   /api/v1/wallet?limit=                          - Balance and entries (auth)
//! GET   /api/v1/admin/tournaments?status=              - All tournaments (view)
//! POST  /api/v1/admin/tournaments                      - Create (manage)
//! GET   /api/v1/admin/tournaments/{id}                 - Full record (view)
//! PATCH /api/v1/admin/tournaments/{id}                 - Visibility (manage), status (override)
//! PATCH /api/v1/admin/tournaments/{id}/credentials     - Room details (manage)
//! POST  /api/v1/admin/tournaments/{id}/finalize        - Pay winners (settle)
//! POST  /api/v1/admin/tournaments/{id}/cancel          - Refund entries (settle)
//! GET   /api/v1/admin/tournaments/{id}/participants?q= - Participant search (view)
//! GET   /api/v1/admin/tournaments/{id}/audit           - Override history (view)
//! ```
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use arena_core::auth::AuthManager;
//! use arena_core::memory::MemoryBackend;
//! use arena_core::tournament::TournamentManager;
//! use arena_server::api::{AppState, create_router};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let backend = Arc::new(MemoryBackend::new());
//! let state = AppState {
//!     manager: Arc::new(TournamentManager::with_backend(backend.clone())),
//!     wallets: backend,
//!     auth: Arc::new(AuthManager::new("a_long_enough_secret_for_signing_tokens".into())),
//! };
//!
//! let app = create_router(state);
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```

pub mod admin;
pub mod error;
pub mod middleware;
pub mod request_id;
pub mod tournaments;
pub mod wallet;

use arena_core::auth::AuthManager;
use arena_core::db::WalletRepository;
use arena_core::tournament::TournamentManager;
use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, patch, post},
};
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

/// Application state shared across all HTTP handlers.
///
/// - `manager`: Tournament lifecycle engine
/// - `wallets`: Wallet reads for the caller's balance
/// - `auth`: Access token verification
#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<TournamentManager>,
    pub wallets: Arc<dyn WalletRepository>,
    pub auth: Arc<AuthManager>,
}

/// Create the complete API router with all endpoints and middleware.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", create_v1_router(state.clone()))
        .layer(axum::middleware::from_fn(request_id::request_id_middleware))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn create_v1_router(state: AppState) -> Router<AppState> {
    let public_routes = Router::new()
        .route("/tournaments", get(tournaments::list_tournaments))
        .route("/tournaments/{id}", get(tournaments::get_tournament));

    let player_routes = Router::new()
        .route("/tournaments/{id}/join", post(tournaments::join_tournament))
        .route(
            "/tournaments/{id}/credentials",
            get(tournaments::get_credentials),
        )
        .route("/wallet", get(wallet::get_wallet));

    let admin_routes = Router::new()
        .route(
            "/tournaments",
            get(admin::list_tournaments).post(admin::create_tournament),
        )
        .route(
            "/tournaments/{id}",
            get(admin::get_tournament).patch(admin::update_tournament),
        )
        .route("/tournaments/{id}/credentials", patch(admin::set_credentials))
        .route("/tournaments/{id}/finalize", post(admin::finalize_tournament))
        .route("/tournaments/{id}/cancel", post(admin::cancel_tournament))
        .route(
            "/tournaments/{id}/participants",
            get(admin::search_participants),
        )
        .route("/tournaments/{id}/audit", get(admin::audit_log));

    let protected_routes = Router::new()
        .merge(player_routes)
        .nest("/admin", admin_routes)
        .layer(axum::middleware::from_fn_with_state(
            state,
            middleware::auth_middleware,
        ));

    Router::new().merge(public_routes).merge(protected_routes)
}

/// Health check endpoint for monitoring and load balancers.
///
/// Returns `200 OK` when the tournament store answers, `503 Service
/// Unavailable` otherwise.
///
/// ```bash
/// curl http://localhost:8080/health
/// # {"status":"healthy","version":"1.2.0","store":true,"timestamp":"2026-06-01T15:00:00Z"}
/// ```
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let store_healthy = match state.manager.health_check().await {
        Ok(()) => true,
        Err(e) => {
            tracing::error!("Health check failed: {}", e);
            false
        }
    };

    let status_code = if store_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let response = json!({
        "status": if store_healthy { "healthy" } else { "unhealthy" },
        "version": env!("CARGO_PKG_VERSION"),
        "store": store_healthy,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    (status_code, Json(response))
}
