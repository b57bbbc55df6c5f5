//! Integration tests driving the HTTP router against the in-memory backend.
//!
//! Covers authentication, role permissions, the player join/reveal flow,
//! settlement and refunds, visibility and forced status overrides.

use arena_core::auth::{AuthManager, Role, UserProfile};
use arena_core::memory::MemoryBackend;
use arena_core::tournament::TournamentManager;
use arena_server::api::{self, AppState};
use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use chrono::{Duration, Utc};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt; // For `oneshot` method

const SECRET: &str = "test_secret_key_for_testing_only_0123";
const ADMIN: i64 = 1;
const MODERATOR: i64 = 2;
const ALICE: i64 = 10;
const BOB: i64 = 11;

struct TestServer {
    app: Router,
    backend: Arc<MemoryBackend>,
    auth: Arc<AuthManager>,
}

impl TestServer {
    fn new() -> Self {
        let backend = Arc::new(MemoryBackend::new());
        let auth = Arc::new(AuthManager::new(SECRET.to_string()));
        let state = AppState {
            manager: Arc::new(TournamentManager::with_backend(backend.clone())),
            wallets: backend.clone(),
            auth: auth.clone(),
        };
        Self {
            app: api::create_router(state),
            backend,
            auth,
        }
    }

    fn token(&self, user_id: i64, role: Role) -> String {
        self.auth
            .issue_access_token(user_id, &format!("user{user_id}"), role)
            .unwrap()
    }

    fn admin(&self) -> String {
        self.token(ADMIN, Role::Admin)
    }

    fn player(&self, user_id: i64) -> String {
        self.token(user_id, Role::User)
    }

    async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }

    /// Create a tournament as admin and return its ID
    async fn create(&self, entry_fee: i64, max_slots: i64) -> i64 {
        let (status, body) = self
            .send(
                Method::POST,
                "/api/v1/admin/tournaments",
                Some(&self.admin()),
                Some(create_body("Night Cup", entry_fee, max_slots)),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["tournament"]["id"].as_i64().unwrap()
    }

    async fn join(&self, id: i64, user_id: i64) -> (StatusCode, Value) {
        self.send(
            Method::POST,
            &format!("/api/v1/tournaments/{id}/join"),
            Some(&self.player(user_id)),
            Some(json!({"inGameName": format!("ign{user_id}"), "uid": format!("{user_id}00")})),
        )
        .await
    }

    async fn publish(&self, id: i64) {
        let (status, body) = self
            .send(
                Method::PATCH,
                &format!("/api/v1/admin/tournaments/{id}/credentials"),
                Some(&self.admin()),
                Some(json!({"roomID": "5531", "roomPassword": "arena"})),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
    }
}

fn create_body(title: &str, entry_fee: i64, max_slots: i64) -> Value {
    json!({
        "title": title,
        "format": "Solo",
        "gameType": "BR",
        "map": "Bermuda",
        "entryFee": entry_fee,
        "maxSlots": max_slots,
        "startTime": (Utc::now() + Duration::hours(2)).to_rfc3339(),
        "prizeDistribution": {"first": 100, "second": 40, "third": 0}
    })
}

// ============================================================================
// Health and Authentication
// ============================================================================

#[tokio::test]
async fn test_health_check_endpoint() {
    let server = TestServer::new();
    let (status, body) = server.send(Method::GET, "/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["store"], true);
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let server = TestServer::new();
    let request = Request::builder()
        .uri("/health")
        .header("x-request-id", "trace-42")
        .body(Body::empty())
        .unwrap();

    let response = server.app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.headers()["x-request-id"], "trace-42");
}

#[tokio::test]
async fn test_protected_routes_require_token() {
    let server = TestServer::new();

    let (status, body) = server
        .send(Method::GET, "/api/v1/admin/tournaments", None, None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);

    let (status, _) = server
        .send(Method::GET, "/api/v1/wallet", Some("not-a-jwt"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let forged = AuthManager::new("another_secret_that_is_long_enough_xx".to_string())
        .issue_access_token(ADMIN, "admin", Role::Admin)
        .unwrap();
    let (status, _) = server
        .send(Method::GET, "/api/v1/admin/tournaments", Some(&forged), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_public_listing_needs_no_token() {
    let server = TestServer::new();
    server.create(0, 4).await;

    let (status, body) = server
        .send(Method::GET, "/api/v1/tournaments", None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["tournaments"].as_array().unwrap().len(), 1);
}

// ============================================================================
// Permissions
// ============================================================================

#[tokio::test]
async fn test_moderator_views_but_cannot_settle() {
    let server = TestServer::new();
    let id = server.create(0, 4).await;
    let moderator = server.token(MODERATOR, Role::Moderator);

    let (status, _) = server
        .send(
            Method::GET,
            &format!("/api/v1/admin/tournaments/{id}"),
            Some(&moderator),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = server
        .send(
            Method::POST,
            &format!("/api/v1/admin/tournaments/{id}/cancel"),
            Some(&moderator),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["success"], false);

    let (status, _) = server
        .send(
            Method::POST,
            "/api/v1/admin/tournaments",
            Some(&moderator),
            Some(create_body("Mod Cup", 0, 2)),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_player_cannot_use_admin_routes() {
    let server = TestServer::new();
    let (status, _) = server
        .send(
            Method::GET,
            "/api/v1/admin/tournaments",
            Some(&server.player(ALICE)),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

// ============================================================================
// Create Validation
// ============================================================================

#[tokio::test]
async fn test_create_rejects_long_title() {
    let server = TestServer::new();
    let (status, body) = server
        .send(
            Method::POST,
            "/api/v1/admin/tournaments",
            Some(&server.admin()),
            Some(create_body("A title far too long", 0, 4)),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_unknown_status_filter_is_bad_request() {
    let server = TestServer::new();
    let (status, _) = server
        .send(Method::GET, "/api/v1/tournaments?status=paused", None, None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ============================================================================
// Player Flow
// ============================================================================

#[tokio::test]
async fn test_join_reveal_and_finalize_flow() {
    let server = TestServer::new();
    let id = server.create(25, 4).await;
    server.backend.deposit(ALICE, 100).await.unwrap();
    server.backend.deposit(BOB, 25).await.unwrap();

    let (status, body) = server.join(id, ALICE).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["tournament"]["joinedCount"], 1);
    assert!(body["tournament"].get("roomID").is_none());
    assert_eq!(server.join(id, BOB).await.0, StatusCode::OK);

    let credentials_uri = format!("/api/v1/tournaments/{id}/credentials");
    let (status, body) = server
        .send(Method::GET, &credentials_uri, Some(&server.player(ALICE)), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Room details are not yet available");

    server.publish(id).await;

    let (status, body) = server
        .send(Method::GET, &credentials_uri, Some(&server.player(ALICE)), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["credentials"]["roomID"], "5531");
    assert_eq!(body["credentials"]["roomPassword"], "arena");

    let (status, _) = server
        .send(Method::GET, &credentials_uri, Some(&server.player(99)), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = server
        .send(
            Method::POST,
            &format!("/api/v1/admin/tournaments/{id}/finalize"),
            Some(&server.admin()),
            Some(json!({"rank1": BOB, "rank2": ALICE})),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["tournament"]["status"], "Completed");
    assert_eq!(body["payouts"].as_array().unwrap().len(), 2);

    let (status, body) = server
        .send(Method::GET, "/api/v1/wallet", Some(&server.player(BOB)), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["wallet"]["balance"], 100);

    let (status, _) = server
        .send(
            Method::POST,
            &format!("/api/v1/admin/tournaments/{id}/finalize"),
            Some(&server.admin()),
            Some(json!({"rank1": BOB})),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_join_with_insufficient_balance_is_402() {
    let server = TestServer::new();
    let id = server.create(50, 4).await;
    server.backend.deposit(ALICE, 10).await.unwrap();

    let (status, body) = server.join(id, ALICE).await;
    assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
    assert_eq!(body["success"], false);
    assert_eq!(server.backend.balance(ALICE).await, Some(10));
}

#[tokio::test]
async fn test_duplicate_join_is_conflict() {
    let server = TestServer::new();
    let id = server.create(0, 4).await;

    assert_eq!(server.join(id, ALICE).await.0, StatusCode::OK);
    assert_eq!(server.join(id, ALICE).await.0, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_join_falls_back_to_profile() {
    let server = TestServer::new();
    let id = server.create(0, 4).await;
    server
        .backend
        .add_profile(UserProfile {
            id: ALICE,
            name: "Alice".to_string(),
            email: Some("alice@arena.gg".to_string()),
            in_game_name: Some("AliceFF".to_string()),
            free_fire_uid: Some("77123".to_string()),
            avatar_id: None,
            role: Role::User,
            created_at: Utc::now(),
        })
        .await;

    let (status, _) = server
        .send(
            Method::POST,
            &format!("/api/v1/tournaments/{id}/join"),
            Some(&server.player(ALICE)),
            Some(json!({})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = server
        .send(
            Method::POST,
            &format!("/api/v1/tournaments/{id}/join"),
            Some(&server.player(BOB)),
            Some(json!({})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = server
        .send(
            Method::GET,
            &format!("/api/v1/admin/tournaments/{id}/participants?q=alice%40arena"),
            Some(&server.admin()),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let participants = body["participants"].as_array().unwrap();
    assert_eq!(participants.len(), 1);
    assert_eq!(participants[0]["inGameName"], "AliceFF");
}

// ============================================================================
// Cancellation, Visibility and Overrides
// ============================================================================

#[tokio::test]
async fn test_cancel_refunds_and_second_cancel_conflicts() {
    let server = TestServer::new();
    let id = server.create(30, 4).await;
    server.backend.deposit(ALICE, 30).await.unwrap();
    server.join(id, ALICE).await;
    assert_eq!(server.backend.balance(ALICE).await, Some(0));

    let cancel_uri = format!("/api/v1/admin/tournaments/{id}/cancel");
    let (status, body) = server
        .send(Method::POST, &cancel_uri, Some(&server.admin()), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["refunds"][0]["amount"], 30);
    assert_eq!(server.backend.balance(ALICE).await, Some(30));

    let (status, _) = server
        .send(Method::POST, &cancel_uri, Some(&server.admin()), None)
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(server.backend.balance(ALICE).await, Some(30));
}

#[tokio::test]
async fn test_hidden_tournament_is_admin_only() {
    let server = TestServer::new();
    let id = server.create(0, 4).await;

    let (status, body) = server
        .send(
            Method::PATCH,
            &format!("/api/v1/admin/tournaments/{id}"),
            Some(&server.admin()),
            Some(json!({"isVisible": false})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["tournament"]["isVisible"], false);

    let (status, _) = server
        .send(Method::GET, &format!("/api/v1/tournaments/{id}"), None, None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(server.join(id, ALICE).await.0, StatusCode::NOT_FOUND);

    let (status, body) = server
        .send(
            Method::GET,
            "/api/v1/admin/tournaments",
            Some(&server.admin()),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["tournaments"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_forced_status_is_audited_without_refunds() {
    let server = TestServer::new();
    let id = server.create(10, 4).await;
    server.backend.deposit(ALICE, 10).await.unwrap();
    server.join(id, ALICE).await;

    let (status, body) = server
        .send(
            Method::PATCH,
            &format!("/api/v1/admin/tournaments/{id}"),
            Some(&server.admin()),
            Some(json!({"status": "cancelled"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["tournament"]["status"], "Cancelled");
    assert_eq!(server.backend.balance(ALICE).await, Some(0));

    let (status, body) = server
        .send(
            Method::GET,
            &format!("/api/v1/admin/tournaments/{id}/audit"),
            Some(&server.token(MODERATOR, Role::Moderator)),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let records = body["records"].as_array().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["actorId"], ADMIN);
    assert_eq!(records[0]["fromStatus"], "Open");
}

#[tokio::test]
async fn test_empty_patch_is_bad_request() {
    let server = TestServer::new();
    let id = server.create(0, 4).await;

    let (status, _) = server
        .send(
            Method::PATCH,
            &format!("/api/v1/admin/tournaments/{id}"),
            Some(&server.admin()),
            Some(json!({})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_wallet_without_entries_is_not_found() {
    let server = TestServer::new();
    let (status, body) = server
        .send(Method::GET, "/api/v1/wallet", Some(&server.player(BOB)), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Wallet not found");
}
