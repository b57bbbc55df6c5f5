//! PostgreSQL tournament store.
#![allow(clippy::needless_raw_string_hashes)]

use super::errors::{TournamentError, TournamentResult};
use super::lifecycle::{self, CredentialPlan};
use super::models::{
    AuditRecord, Cancellation, CredentialUpdate, ListFilter, Participant, PrizeDistribution,
    ScheduledRelease, Settlement, StatusOverride, Tournament, TournamentDraft, TournamentId,
    TournamentStatus, Winners,
};
use crate::auth::UserId;
use crate::db::TournamentRepository;
use crate::db::timeouts::{
    DEFAULT_QUERY_TIMEOUT, DEFAULT_TRANSACTION_TIMEOUT, TimeoutError, with_default_timeout,
    with_timeout,
};
use crate::wallet::{EntryDetails, WalletManager};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row, Transaction};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

const TOURNAMENT_COLUMNS: &str = r#"
    id, title, format, game_type, map, entry_fee, prize_first, prize_second, prize_third,
    prize_pool, max_slots, joined_count, start_time, auto_release_time, status, room_id,
    room_password, winner_rank1, winner_rank2, winner_rank3, is_visible, created_at,
    updated_at, finalized_at, cancelled_at
"#;

/// Tournament repository backed by PostgreSQL
///
/// Every mutation runs in one transaction that starts with
/// `SELECT ... FOR UPDATE` on the tournament row.
#[derive(Clone)]
pub struct PgTournamentStore {
    pool: Arc<PgPool>,
}

fn parse_column<T>(value: &str, column: &str) -> TournamentResult<T>
where
    T: FromStr<Err = String>,
{
    value.parse().map_err(|e: String| {
        TournamentError::Database(sqlx::Error::ColumnDecode {
            index: column.to_string(),
            source: e.into(),
        })
    })
}

/// Narrow a counter to the INTEGER columns of the schema
fn to_db_int(field: &'static str, value: u32) -> TournamentResult<i32> {
    i32::try_from(value)
        .map_err(|_| TournamentError::validation(field, format!("exceeds {}", i32::MAX)))
}

fn utc(value: NaiveDateTime) -> DateTime<Utc> {
    value.and_utc()
}

fn timeout_error(err: TimeoutError) -> TournamentError {
    TournamentError::Database(err.into_sqlx())
}

impl PgTournamentStore {
    /// Create a new tournament store
    ///
    /// # Arguments
    ///
    /// * `pool` - Database connection pool
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    async fn begin(&self) -> TournamentResult<Transaction<'static, Postgres>> {
        with_timeout(DEFAULT_TRANSACTION_TIMEOUT, self.pool.begin())
            .await
            .map_err(timeout_error)
    }

    fn tournament_from_row(
        row: &PgRow,
        participants: Vec<Participant>,
    ) -> TournamentResult<Tournament> {
        let format: String = row.get("format");
        let game_type: String = row.get("game_type");
        let map: String = row.get("map");
        let status: String = row.get("status");
        let max_slots: i32 = row.get("max_slots");
        let joined_count: i32 = row.get("joined_count");

        let winners = row
            .get::<Option<i64>, _>("winner_rank1")
            .map(|rank1| Winners {
                rank1,
                rank2: row.get("winner_rank2"),
                rank3: row.get("winner_rank3"),
            });

        Ok(Tournament {
            id: row.get("id"),
            title: row.get("title"),
            format: parse_column(&format, "format")?,
            game_type: parse_column(&game_type, "game_type")?,
            map: parse_column(&map, "map")?,
            entry_fee: row.get("entry_fee"),
            prize_pool: row.get("prize_pool"),
            prize_distribution: PrizeDistribution::new(
                row.get("prize_first"),
                row.get("prize_second"),
                row.get("prize_third"),
            ),
            max_slots: u32::try_from(max_slots).unwrap_or(0),
            joined_count: u32::try_from(joined_count).unwrap_or(0),
            start_time: utc(row.get("start_time")),
            auto_release_time: row
                .get::<Option<NaiveDateTime>, _>("auto_release_time")
                .map(utc),
            status: parse_column(&status, "status")?,
            room_id: row.get("room_id"),
            room_password: row.get("room_password"),
            participants,
            winners,
            is_visible: row.get("is_visible"),
            created_at: utc(row.get("created_at")),
            updated_at: utc(row.get("updated_at")),
            finalized_at: row.get::<Option<NaiveDateTime>, _>("finalized_at").map(utc),
            cancelled_at: row.get::<Option<NaiveDateTime>, _>("cancelled_at").map(utc),
        })
    }

    fn participant_from_row(row: &PgRow) -> Participant {
        Participant {
            user_id: row.get("user_id"),
            in_game_name: row.get("in_game_name"),
            uid: row.get("uid"),
            joined_at: utc(row.get("joined_at")),
        }
    }

    /// Lock the tournament row and load it with its roster
    async fn lock(
        tx: &mut Transaction<'_, Postgres>,
        id: TournamentId,
    ) -> TournamentResult<Tournament> {
        let query = format!("SELECT {TOURNAMENT_COLUMNS} FROM tournaments WHERE id = $1 FOR UPDATE");
        let row = with_timeout(
            DEFAULT_QUERY_TIMEOUT,
            sqlx::query(&query).bind(id).fetch_optional(&mut **tx),
        )
        .await
        .map_err(timeout_error)?
        .ok_or(TournamentError::NotFound(id))?;

        let participants: Vec<Participant> = sqlx::query(
            r#"
            SELECT user_id, in_game_name, uid, joined_at
            FROM tournament_participants
            WHERE tournament_id = $1
            ORDER BY position
            "#,
        )
        .bind(id)
        .fetch_all(&mut **tx)
        .await?
        .iter()
        .map(Self::participant_from_row)
        .collect();

        Self::tournament_from_row(&row, participants)
    }

    /// Persist the mutable columns of a locked snapshot
    async fn write_state(tx: &mut Transaction<'_, Postgres>, t: &Tournament) -> TournamentResult<()> {
        sqlx::query(
            r#"
            UPDATE tournaments
            SET status = $2, room_id = $3, room_password = $4, auto_release_time = $5,
                winner_rank1 = $6, winner_rank2 = $7, winner_rank3 = $8, is_visible = $9,
                updated_at = $10, finalized_at = $11, cancelled_at = $12
            WHERE id = $1
            "#,
        )
        .bind(t.id)
        .bind(t.status.to_string())
        .bind(&t.room_id)
        .bind(&t.room_password)
        .bind(t.auto_release_time.map(|at| at.naive_utc()))
        .bind(t.winners.map(|w| w.rank1))
        .bind(t.winners.and_then(|w| w.rank2))
        .bind(t.winners.and_then(|w| w.rank3))
        .bind(t.is_visible)
        .bind(t.updated_at.naive_utc())
        .bind(t.finalized_at.map(|at| at.naive_utc()))
        .bind(t.cancelled_at.map(|at| at.naive_utc()))
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    async fn load_participants(
        &self,
        ids: &[TournamentId],
    ) -> TournamentResult<HashMap<TournamentId, Vec<Participant>>> {
        let rows = sqlx::query(
            r#"
            SELECT tournament_id, user_id, in_game_name, uid, joined_at
            FROM tournament_participants
            WHERE tournament_id = ANY($1)
            ORDER BY tournament_id, position
            "#,
        )
        .bind(ids)
        .fetch_all(self.pool.as_ref())
        .await?;

        let mut grouped: HashMap<TournamentId, Vec<Participant>> = HashMap::new();
        for row in &rows {
            grouped
                .entry(row.get("tournament_id"))
                .or_default()
                .push(Self::participant_from_row(row));
        }
        Ok(grouped)
    }
}

#[async_trait]
impl TournamentRepository for PgTournamentStore {
    async fn insert_tournament(
        &self,
        draft: TournamentDraft,
        now: DateTime<Utc>,
    ) -> TournamentResult<Tournament> {
        let row = sqlx::query(
            r#"
            INSERT INTO tournaments (title, format, game_type, map, entry_fee, prize_first, prize_second, prize_third, prize_pool, max_slots, start_time, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $13)
            RETURNING id
            "#,
        )
        .bind(&draft.title)
        .bind(draft.format.to_string())
        .bind(draft.game_type.to_string())
        .bind(draft.map.to_string())
        .bind(draft.entry_fee)
        .bind(draft.prize_distribution.first)
        .bind(draft.prize_distribution.second)
        .bind(draft.prize_distribution.third)
        .bind(draft.prize_pool)
        .bind(to_db_int("maxSlots", draft.max_slots)?)
        .bind(draft.start_time.naive_utc())
        .bind(TournamentStatus::Open.to_string())
        .bind(now.naive_utc())
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(draft.into_tournament(row.get("id"), now))
    }

    async fn find_tournament(&self, id: TournamentId) -> TournamentResult<Option<Tournament>> {
        let query = format!("SELECT {TOURNAMENT_COLUMNS} FROM tournaments WHERE id = $1");
        let Some(row) = sqlx::query(&query)
            .bind(id)
            .fetch_optional(self.pool.as_ref())
            .await?
        else {
            return Ok(None);
        };

        let participants = self.load_participants(&[id]).await?.remove(&id).unwrap_or_default();
        Self::tournament_from_row(&row, participants).map(Some)
    }

    async fn list_tournaments(&self, filter: ListFilter) -> TournamentResult<Vec<Tournament>> {
        let query = format!(
            r#"
            SELECT {TOURNAMENT_COLUMNS}
            FROM tournaments
            WHERE ($1 OR is_visible) AND ($2::TEXT IS NULL OR status = $2)
            ORDER BY start_time, id
            "#
        );
        let rows = sqlx::query(&query)
            .bind(filter.include_hidden)
            .bind(filter.status.map(|s| s.to_string()))
            .fetch_all(self.pool.as_ref())
            .await?;

        let ids: Vec<TournamentId> = rows.iter().map(|row| row.get("id")).collect();
        let mut participants = self.load_participants(&ids).await?;

        rows.iter()
            .map(|row| {
                let id: TournamentId = row.get("id");
                Self::tournament_from_row(row, participants.remove(&id).unwrap_or_default())
            })
            .collect()
    }

    async fn join(
        &self,
        id: TournamentId,
        participant: Participant,
        now: DateTime<Utc>,
    ) -> TournamentResult<Tournament> {
        let mut tx = self.begin().await?;
        let mut t = Self::lock(&mut tx, id).await?;

        let user_id = participant.user_id;
        lifecycle::check_join(&t, user_id, now)?;

        if t.entry_fee > 0 {
            WalletManager::debit_in_tx(
                &mut tx,
                user_id,
                t.entry_fee,
                &EntryDetails::TournamentEntry { tournament_id: id },
                lifecycle::entry_fee_key(id, user_id),
            )
            .await?;
        }

        let claimed = sqlx::query(
            "UPDATE tournaments
             SET joined_count = joined_count + 1, updated_at = $2
             WHERE id = $1 AND joined_count < max_slots",
        )
        .bind(id)
        .bind(now.naive_utc())
        .execute(&mut *tx)
        .await?;
        if claimed.rows_affected() == 0 {
            return Err(TournamentError::TournamentFull);
        }

        sqlx::query(
            r#"
            INSERT INTO tournament_participants (tournament_id, user_id, position, in_game_name, uid, joined_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(id)
        .bind(user_id)
        .bind(to_db_int("position", t.joined_count.saturating_add(1))?)
        .bind(&participant.in_game_name)
        .bind(&participant.uid)
        .bind(participant.joined_at.naive_utc())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        lifecycle::apply_join(&mut t, participant, now);
        Ok(t)
    }

    async fn set_credentials(
        &self,
        id: TournamentId,
        update: &CredentialUpdate,
        now: DateTime<Utc>,
    ) -> TournamentResult<(Tournament, CredentialPlan)> {
        let mut tx = self.begin().await?;
        let mut t = Self::lock(&mut tx, id).await?;

        let plan = lifecycle::plan_credentials(&t, update, now)?;
        lifecycle::apply_credentials(&mut t, update, &plan, now);
        Self::write_state(&mut tx, &t).await?;

        tx.commit().await?;
        Ok((t, plan))
    }

    async fn finalize(
        &self,
        id: TournamentId,
        winners: Winners,
        force_advance: bool,
        now: DateTime<Utc>,
    ) -> TournamentResult<Settlement> {
        let mut tx = self.begin().await?;
        let mut t = Self::lock(&mut tx, id).await?;

        let payouts = lifecycle::plan_settlement(&t, &winners, force_advance, now)?;
        for payout in &payouts {
            WalletManager::credit_in_tx(
                &mut tx,
                payout.user_id,
                payout.amount,
                &EntryDetails::TournamentPrize {
                    tournament_id: id,
                    rank: payout.rank.position(),
                },
                lifecycle::prize_key(id, payout.rank),
            )
            .await?;
        }

        lifecycle::apply_settlement(&mut t, winners, now);
        Self::write_state(&mut tx, &t).await?;

        tx.commit().await?;
        Ok(Settlement {
            tournament: t,
            payouts,
        })
    }

    async fn cancel(&self, id: TournamentId, now: DateTime<Utc>) -> TournamentResult<Cancellation> {
        let mut tx = self.begin().await?;
        let mut t = Self::lock(&mut tx, id).await?;

        let refunds = lifecycle::plan_cancel(&t)?;
        for refund in &refunds {
            WalletManager::credit_in_tx(
                &mut tx,
                refund.user_id,
                refund.amount,
                &EntryDetails::TournamentRefund { tournament_id: id },
                lifecycle::refund_key(id, refund.user_id),
            )
            .await?;
        }

        lifecycle::apply_cancel(&mut t, now);
        Self::write_state(&mut tx, &t).await?;

        tx.commit().await?;
        Ok(Cancellation {
            tournament: t,
            refunds,
        })
    }

    async fn override_status(
        &self,
        id: TournamentId,
        status: TournamentStatus,
        actor_id: UserId,
        now: DateTime<Utc>,
    ) -> TournamentResult<StatusOverride> {
        let mut tx = self.begin().await?;
        let mut t = Self::lock(&mut tx, id).await?;

        let from = t.status;
        lifecycle::apply_override(&mut t, status, now);
        Self::write_state(&mut tx, &t).await?;

        sqlx::query(
            r#"
            INSERT INTO tournament_audit_log (tournament_id, actor_id, action, from_status, to_status, created_at)
            VALUES ($1, $2, 'force_status', $3, $4, $5)
            "#,
        )
        .bind(id)
        .bind(actor_id)
        .bind(from.to_string())
        .bind(status.to_string())
        .bind(now.naive_utc())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(StatusOverride {
            tournament: t,
            from,
            to: status,
            actor_id,
        })
    }

    async fn set_visibility(
        &self,
        id: TournamentId,
        visible: bool,
        now: DateTime<Utc>,
    ) -> TournamentResult<Tournament> {
        let mut tx = self.begin().await?;
        let mut t = Self::lock(&mut tx, id).await?;

        t.is_visible = visible;
        t.updated_at = now;
        Self::write_state(&mut tx, &t).await?;

        tx.commit().await?;
        Ok(t)
    }

    async fn promote_released(
        &self,
        now: DateTime<Utc>,
        only: Option<TournamentId>,
    ) -> TournamentResult<Vec<ScheduledRelease>> {
        let rows = sqlx::query(
            r#"
            UPDATE tournaments
            SET status = 'live', updated_at = $1
            WHERE status = 'open'
              AND room_id IS NOT NULL
              AND room_password IS NOT NULL
              AND auto_release_time <= $1
              AND ($2::BIGINT IS NULL OR id = $2)
            RETURNING id
            "#,
        )
        .bind(now.naive_utc())
        .bind(only)
        .fetch_all(self.pool.as_ref())
        .await?;

        let ids: Vec<TournamentId> = rows.iter().map(|row| row.get("id")).collect();
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut rosters = self.load_participants(&ids).await?;
        Ok(ids
            .into_iter()
            .map(|tournament_id| ScheduledRelease {
                tournament_id,
                participants: rosters
                    .remove(&tournament_id)
                    .unwrap_or_default()
                    .iter()
                    .map(|p| p.user_id)
                    .collect(),
            })
            .collect())
    }

    async fn audit_log(&self, id: TournamentId) -> TournamentResult<Vec<AuditRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT id, tournament_id, actor_id, action, from_status, to_status, created_at
            FROM tournament_audit_log
            WHERE tournament_id = $1
            ORDER BY created_at, id
            "#,
        )
        .bind(id)
        .fetch_all(self.pool.as_ref())
        .await?;

        rows.iter()
            .map(|row| {
                let from_status: String = row.get("from_status");
                let to_status: String = row.get("to_status");
                Ok(AuditRecord {
                    id: row.get("id"),
                    tournament_id: row.get("tournament_id"),
                    actor_id: row.get("actor_id"),
                    action: row.get("action"),
                    from_status: parse_column(&from_status, "from_status")?,
                    to_status: parse_column(&to_status, "to_status")?,
                    created_at: utc(row.get("created_at")),
                })
            })
            .collect()
    }

    async fn ping(&self) -> TournamentResult<()> {
        with_default_timeout(sqlx::query("SELECT 1").execute(self.pool.as_ref()))
            .await
            .map_err(timeout_error)?;
        Ok(())
    }
}
