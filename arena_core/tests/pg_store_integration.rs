//! PostgreSQL store tests.
//!
//! These need a live database (`DATABASE_URL`, defaulting to the local
//! development database) and run with `cargo test -- --ignored`.

use arena_core::db::{Database, DatabaseConfig, PgProfileRepository};
use arena_core::tournament::{
    GameMap, GameType, JoinDetails, MatchFormat, NewTournament, PgTournamentStore,
    PrizeDistribution, TournamentError, TournamentManager, TournamentStatus,
};
use arena_core::wallet::{EntryDetails, WalletManager};
use chrono::{Duration, Utc};
use serial_test::serial;
use sqlx::PgPool;
use std::sync::Arc;

struct PgHarness {
    pool: Arc<PgPool>,
    manager: TournamentManager,
    wallets: WalletManager,
}

async fn setup() -> PgHarness {
    let db = Database::new(&DatabaseConfig::from_env().unwrap())
        .await
        .expect("database reachable");
    db.migrate().await.expect("migrations apply");
    let pool = Arc::new(db.pool().clone());

    sqlx::query(
        "TRUNCATE tournament_audit_log, wallet_entries, tournament_participants,
                  tournaments, wallets, users RESTART IDENTITY CASCADE",
    )
    .execute(pool.as_ref())
    .await
    .unwrap();

    let manager = TournamentManager::new(
        Arc::new(PgTournamentStore::new(pool.clone())),
        Arc::new(PgProfileRepository::new(pool.clone())),
    );
    let wallets = WalletManager::new(pool.clone());
    PgHarness {
        pool,
        manager,
        wallets,
    }
}

async fn seed_user(h: &PgHarness, name: &str, balance: i64) -> i64 {
    let id: i64 = sqlx::query_scalar(
        "INSERT INTO users (name, email, in_game_name, free_fire_uid)
         VALUES ($1, $2, $3, $4) RETURNING id",
    )
    .bind(name)
    .bind(format!("{name}@example.com"))
    .bind(format!("{name}_ign"))
    .bind(format!("{}", name.len() * 1_000))
    .fetch_one(h.pool.as_ref())
    .await
    .unwrap();

    if balance > 0 {
        h.wallets
            .credit(
                id,
                balance,
                EntryDetails::Adjustment {
                    reason: "seed".to_string(),
                },
                format!("seed:{id}"),
            )
            .await
            .unwrap();
    }
    id
}

fn request(entry_fee: i64) -> NewTournament {
    NewTournament {
        title: "PG Cup".to_string(),
        format: MatchFormat::Solo,
        game_type: GameType::BattleRoyale,
        map: GameMap::Bermuda,
        entry_fee,
        max_slots: 4,
        start_time: Utc::now() + Duration::hours(1),
        prize_distribution: PrizeDistribution::new(100, 50, 0),
        prize_pool: None,
    }
}

#[tokio::test]
#[serial]
#[ignore = "requires a running PostgreSQL instance"]
async fn test_join_debits_and_records_participant() {
    let h = setup().await;
    let user = seed_user(&h, "alice", 30).await;
    let t = h.manager.create_tournament(request(20)).await.unwrap();

    let joined = h
        .manager
        .join_tournament(t.id, user, JoinDetails::default())
        .await
        .unwrap();
    assert_eq!(joined.joined_count, 1);
    assert_eq!(joined.participants[0].in_game_name, "alice_ign");

    let wallet = h.wallets.get_wallet(user).await.unwrap();
    assert_eq!(wallet.balance, 10);
}

#[tokio::test]
#[serial]
#[ignore = "requires a running PostgreSQL instance"]
async fn test_insufficient_balance_rolls_back() {
    let h = setup().await;
    let user = seed_user(&h, "bob", 5).await;
    let t = h.manager.create_tournament(request(20)).await.unwrap();

    let err = h
        .manager
        .join_tournament(t.id, user, JoinDetails::default())
        .await
        .unwrap_err();
    assert!(matches!(err, TournamentError::InsufficientBalance { .. }));

    let t = h.manager.get_tournament(t.id).await.unwrap();
    assert_eq!(t.joined_count, 0);
    assert!(t.participants.is_empty());
    assert_eq!(h.wallets.get_wallet(user).await.unwrap().balance, 5);
}

#[tokio::test]
#[serial]
#[ignore = "requires a running PostgreSQL instance"]
async fn test_cancel_refunds_once() {
    let h = setup().await;
    let a = seed_user(&h, "cara", 20).await;
    let b = seed_user(&h, "dan", 20).await;
    let t = h.manager.create_tournament(request(20)).await.unwrap();
    for user in [a, b] {
        h.manager
            .join_tournament(t.id, user, JoinDetails::default())
            .await
            .unwrap();
    }

    let cancellation = h.manager.cancel_tournament(t.id).await.unwrap();
    assert_eq!(cancellation.total_refunded(), 40);
    assert!(matches!(
        h.manager.cancel_tournament(t.id).await,
        Err(TournamentError::AlreadyCancelled)
    ));

    for user in [a, b] {
        assert_eq!(h.wallets.get_wallet(user).await.unwrap().balance, 20);
    }
    let refunds: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM wallet_entries WHERE tournament_id = $1 AND entry_type = 'refund'",
    )
    .bind(t.id)
    .fetch_one(h.pool.as_ref())
    .await
    .unwrap();
    assert_eq!(refunds, 2);
}

#[tokio::test]
#[serial]
#[ignore = "requires a running PostgreSQL instance"]
async fn test_force_status_is_audited() {
    let h = setup().await;
    let admin = seed_user(&h, "root", 0).await;
    let t = h.manager.create_tournament(request(0)).await.unwrap();

    let change = h
        .manager
        .force_status(t.id, TournamentStatus::Live, admin)
        .await
        .unwrap();
    assert_eq!(change.from, TournamentStatus::Open);
    assert_eq!(change.tournament.status, TournamentStatus::Live);

    let log = h.manager.audit_log(t.id).await.unwrap();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].actor_id, admin);
    assert_eq!(log[0].to_status, TournamentStatus::Live);
}
