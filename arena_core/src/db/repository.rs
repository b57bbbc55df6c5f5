//! Repository trait definitions for testability and dependency injection.
//!
//! The tournament engine talks to storage only through these traits. Each
//! mutating `TournamentRepository` method is one atomic unit: it locks the
//! tournament, re-runs the lifecycle checks on the locked snapshot, applies
//! wallet deltas and commits, or changes nothing at all.

use async_trait::async_trait;
use sqlx::{PgPool, Row};
use std::sync::Arc;

use crate::auth::{AuthResult, Role, UserId, UserProfile};
use crate::tournament::lifecycle::CredentialPlan;
use crate::tournament::models::{
    AuditRecord, Cancellation, CredentialUpdate, ListFilter, Participant, ScheduledRelease,
    Settlement, StatusOverride, Tournament, TournamentDraft, TournamentId, TournamentStatus, Winners,
};
use crate::tournament::TournamentResult;
use crate::wallet::{EntryDetails, Wallet, WalletEntry, WalletResult};
use chrono::{DateTime, Utc};

/// Trait for tournament storage operations
#[async_trait]
pub trait TournamentRepository: Send + Sync {
    /// Persist a validated draft as a new Open tournament
    async fn insert_tournament(
        &self,
        draft: TournamentDraft,
        now: DateTime<Utc>,
    ) -> TournamentResult<Tournament>;

    /// Load a tournament with its participants
    async fn find_tournament(&self, id: TournamentId) -> TournamentResult<Option<Tournament>>;

    /// List tournaments by start time
    async fn list_tournaments(&self, filter: ListFilter) -> TournamentResult<Vec<Tournament>>;

    /// Debit the entry fee and append the participant
    async fn join(
        &self,
        id: TournamentId,
        participant: Participant,
        now: DateTime<Utc>,
    ) -> TournamentResult<Tournament>;

    /// Store room credentials and apply the resulting status change
    async fn set_credentials(
        &self,
        id: TournamentId,
        update: &CredentialUpdate,
        now: DateTime<Utc>,
    ) -> TournamentResult<(Tournament, CredentialPlan)>;

    /// Credit prizes, store winners, mark Completed
    async fn finalize(
        &self,
        id: TournamentId,
        winners: Winners,
        force_advance: bool,
        now: DateTime<Utc>,
    ) -> TournamentResult<Settlement>;

    /// Refund entry fees, mark Cancelled
    async fn cancel(&self, id: TournamentId, now: DateTime<Utc>) -> TournamentResult<Cancellation>;

    /// Overwrite status and write an audit record
    async fn override_status(
        &self,
        id: TournamentId,
        status: TournamentStatus,
        actor_id: UserId,
        now: DateTime<Utc>,
    ) -> TournamentResult<StatusOverride>;

    /// Toggle listing visibility
    async fn set_visibility(
        &self,
        id: TournamentId,
        visible: bool,
        now: DateTime<Utc>,
    ) -> TournamentResult<Tournament>;

    /// Promote Open tournaments whose scheduled release is due
    ///
    /// Restricted to one tournament when `only` is set. Each promoted
    /// tournament comes back with its roster, in join order.
    async fn promote_released(
        &self,
        now: DateTime<Utc>,
        only: Option<TournamentId>,
    ) -> TournamentResult<Vec<ScheduledRelease>>;

    /// Status overrides recorded for a tournament, oldest first
    async fn audit_log(&self, id: TournamentId) -> TournamentResult<Vec<AuditRecord>>;

    /// Check the store is reachable
    async fn ping(&self) -> TournamentResult<()>;
}

/// Trait for wallet repository operations
#[async_trait]
pub trait WalletRepository: Send + Sync {
    /// Get wallet for user
    async fn get_wallet(&self, user_id: i64) -> WalletResult<Wallet>;

    /// Get wallet entries (transaction history), newest first
    async fn get_entries(&self, user_id: i64, limit: i64) -> WalletResult<Vec<WalletEntry>>;

    /// Credit a wallet, creating it when missing
    async fn credit(
        &self,
        user_id: i64,
        amount: i64,
        details: EntryDetails,
        idempotency_key: String,
    ) -> WalletResult<i64>;

    /// Debit a wallet without ever going negative
    async fn debit(
        &self,
        user_id: i64,
        amount: i64,
        details: EntryDetails,
        idempotency_key: String,
    ) -> WalletResult<i64>;
}

/// Trait for the read-only user profile directory
#[async_trait]
pub trait ProfileRepository: Send + Sync {
    /// Find profile by user ID
    async fn find_profile(&self, user_id: UserId) -> AuthResult<Option<UserProfile>>;

    /// Find several profiles at once; unknown IDs are skipped
    async fn find_profiles(&self, user_ids: &[UserId]) -> AuthResult<Vec<UserProfile>>;
}

/// Default PostgreSQL implementation of `ProfileRepository`
#[derive(Clone)]
pub struct PgProfileRepository {
    pool: Arc<PgPool>,
}

impl PgProfileRepository {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    fn profile_from_row(row: &sqlx::postgres::PgRow) -> UserProfile {
        let role: String = row.get("role");
        UserProfile {
            id: row.get("id"),
            name: row.get("name"),
            email: row.get("email"),
            in_game_name: row.get("in_game_name"),
            free_fire_uid: row.get("free_fire_uid"),
            avatar_id: row.get("avatar_id"),
            role: role.parse().unwrap_or(Role::User),
            created_at: row.get::<chrono::NaiveDateTime, _>("created_at").and_utc(),
        }
    }
}

#[async_trait]
impl ProfileRepository for PgProfileRepository {
    async fn find_profile(&self, user_id: UserId) -> AuthResult<Option<UserProfile>> {
        let row = sqlx::query(
            "SELECT id, name, email, in_game_name, free_fire_uid, avatar_id, role, created_at
             FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(row.as_ref().map(Self::profile_from_row))
    }

    async fn find_profiles(&self, user_ids: &[UserId]) -> AuthResult<Vec<UserProfile>> {
        if user_ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query(
            "SELECT id, name, email, in_game_name, free_fire_uid, avatar_id, role, created_at
             FROM users WHERE id = ANY($1)",
        )
        .bind(user_ids)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(rows.iter().map(Self::profile_from_row).collect())
    }
}
