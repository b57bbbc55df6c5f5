//! Wallet manager implementation backed by PostgreSQL.
#![allow(clippy::needless_raw_string_hashes)]

use super::{
    errors::{WalletError, WalletResult},
    models::{EntryDetails, EntryDirection, Wallet, WalletEntry},
};
use crate::db::WalletRepository;
use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Row, Transaction};
use std::sync::Arc;

/// Wallet manager
#[derive(Clone)]
pub struct WalletManager {
    pool: Arc<PgPool>,
}

impl WalletManager {
    /// Create a new wallet manager
    ///
    /// # Arguments
    ///
    /// * `pool` - Database connection pool
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    /// Get wallet balance for a user
    ///
    /// # Errors
    ///
    /// * `WalletError::WalletNotFound` - User has no wallet
    pub async fn get_wallet(&self, user_id: i64) -> WalletResult<Wallet> {
        let row = sqlx::query(
            r#"
            SELECT user_id, balance, currency, created_at, updated_at
            FROM wallets
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(self.pool.as_ref())
        .await?
        .ok_or(WalletError::WalletNotFound(user_id))?;

        Ok(Wallet {
            user_id: row.get("user_id"),
            balance: row.get("balance"),
            currency: row.get("currency"),
            created_at: row.get::<chrono::NaiveDateTime, _>("created_at").and_utc(),
            updated_at: row.get::<chrono::NaiveDateTime, _>("updated_at").and_utc(),
        })
    }

    /// Credit a user's wallet in its own transaction
    ///
    /// # Returns
    ///
    /// * `WalletResult<i64>` - New wallet balance
    pub async fn credit(
        &self,
        user_id: i64,
        amount: i64,
        details: EntryDetails,
        idempotency_key: String,
    ) -> WalletResult<i64> {
        let mut tx = self.pool.begin().await?;
        let balance = Self::credit_in_tx(&mut tx, user_id, amount, &details, idempotency_key).await?;
        tx.commit().await?;
        Ok(balance)
    }

    /// Debit a user's wallet in its own transaction
    ///
    /// # Errors
    ///
    /// * `WalletError::InsufficientBalance` - Not enough coins
    /// * `WalletError::DuplicateTransaction` - Idempotency key already used
    pub async fn debit(
        &self,
        user_id: i64,
        amount: i64,
        details: EntryDetails,
        idempotency_key: String,
    ) -> WalletResult<i64> {
        let mut tx = self.pool.begin().await?;
        let balance = Self::debit_in_tx(&mut tx, user_id, amount, &details, idempotency_key).await?;
        tx.commit().await?;
        Ok(balance)
    }

    /// Debit a wallet inside a caller-owned transaction
    ///
    /// The balance check and the decrement happen in one conditional
    /// `UPDATE`, so concurrent debits can never drive a balance negative.
    /// Nothing is persisted unless the caller commits.
    pub async fn debit_in_tx(
        tx: &mut Transaction<'_, Postgres>,
        user_id: i64,
        amount: i64,
        details: &EntryDetails,
        idempotency_key: String,
    ) -> WalletResult<i64> {
        if amount <= 0 {
            return Err(WalletError::InvalidAmount(amount));
        }

        Self::ensure_unused_key(tx, &idempotency_key).await?;

        let wallet_result = sqlx::query(
            "UPDATE wallets
             SET balance = balance - $1, updated_at = NOW()
             WHERE user_id = $2 AND balance >= $1
             RETURNING balance",
        )
        .bind(amount)
        .bind(user_id)
        .fetch_optional(&mut **tx)
        .await?;

        let new_balance: i64 = match wallet_result {
            Some(row) => row.get("balance"),
            None => {
                // Either wallet doesn't exist or insufficient balance
                let check_wallet = sqlx::query("SELECT balance FROM wallets WHERE user_id = $1")
                    .bind(user_id)
                    .fetch_optional(&mut **tx)
                    .await?;

                return match check_wallet {
                    Some(row) => Err(WalletError::InsufficientBalance {
                        available: row.get("balance"),
                        required: amount,
                    }),
                    None => Err(WalletError::WalletNotFound(user_id)),
                };
            }
        };

        Self::create_entry(
            tx,
            user_id,
            -amount,
            new_balance,
            EntryDirection::Debit,
            details,
            idempotency_key,
        )
        .await?;

        Ok(new_balance)
    }

    /// Credit a wallet inside a caller-owned transaction
    ///
    /// Creates the wallet with a zero balance if the user has none yet.
    pub async fn credit_in_tx(
        tx: &mut Transaction<'_, Postgres>,
        user_id: i64,
        amount: i64,
        details: &EntryDetails,
        idempotency_key: String,
    ) -> WalletResult<i64> {
        if amount <= 0 {
            return Err(WalletError::InvalidAmount(amount));
        }

        Self::ensure_unused_key(tx, &idempotency_key).await?;

        sqlx::query(
            "INSERT INTO wallets (user_id, balance) VALUES ($1, 0)
             ON CONFLICT (user_id) DO NOTHING",
        )
        .bind(user_id)
        .execute(&mut **tx)
        .await?;

        let current_wallet =
            sqlx::query("SELECT balance FROM wallets WHERE user_id = $1 FOR UPDATE")
                .bind(user_id)
                .fetch_one(&mut **tx)
                .await?;
        let current_balance: i64 = current_wallet.get("balance");

        let new_balance = current_balance
            .checked_add(amount)
            .ok_or(WalletError::BalanceOverflow)?;

        sqlx::query(
            "UPDATE wallets
             SET balance = balance + $1, updated_at = NOW()
             WHERE user_id = $2",
        )
        .bind(amount)
        .bind(user_id)
        .execute(&mut **tx)
        .await?;

        Self::create_entry(
            tx,
            user_id,
            amount,
            new_balance,
            EntryDirection::Credit,
            details,
            idempotency_key,
        )
        .await?;

        Ok(new_balance)
    }

    async fn ensure_unused_key(
        tx: &mut Transaction<'_, Postgres>,
        idempotency_key: &str,
    ) -> WalletResult<()> {
        let existing = sqlx::query("SELECT id FROM wallet_entries WHERE idempotency_key = $1")
            .bind(idempotency_key)
            .fetch_optional(&mut **tx)
            .await?;

        if existing.is_some() {
            return Err(WalletError::DuplicateTransaction(idempotency_key.to_string()));
        }
        Ok(())
    }

    /// Append a journal entry
    async fn create_entry(
        tx: &mut Transaction<'_, Postgres>,
        user_id: i64,
        amount: i64,
        balance_after: i64,
        direction: EntryDirection,
        details: &EntryDetails,
        idempotency_key: String,
    ) -> WalletResult<i64> {
        let row = sqlx::query(
            r#"
            INSERT INTO wallet_entries (user_id, tournament_id, amount, balance_after, direction, entry_type, details, idempotency_key, description)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id
            "#,
        )
        .bind(user_id)
        .bind(details.tournament_id())
        .bind(amount)
        .bind(balance_after)
        .bind(direction.to_string())
        .bind(details.entry_type().to_string())
        .bind(serde_json::to_value(details)?)
        .bind(idempotency_key)
        .bind(details.describe())
        .fetch_one(&mut **tx)
        .await?;

        Ok(row.get("id"))
    }

    /// Get wallet entries for a user, newest first
    pub async fn get_entries(&self, user_id: i64, limit: i64) -> WalletResult<Vec<WalletEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, tournament_id, amount, balance_after, direction, entry_type, details, idempotency_key, description, created_at
            FROM wallet_entries
            WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(self.pool.as_ref())
        .await?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in rows {
            let direction: String = row.get("direction");
            let entry_type: String = row.get("entry_type");
            entries.push(WalletEntry {
                id: row.get("id"),
                user_id: row.get("user_id"),
                tournament_id: row.get("tournament_id"),
                amount: row.get("amount"),
                balance_after: row.get("balance_after"),
                direction: direction.parse().unwrap_or(EntryDirection::Credit),
                entry_type: entry_type
                    .parse()
                    .unwrap_or(super::models::EntryType::AdminAdjust),
                details: serde_json::from_value(row.get("details"))?,
                idempotency_key: row.get("idempotency_key"),
                description: row.get("description"),
                created_at: row.get::<chrono::NaiveDateTime, _>("created_at").and_utc(),
            });
        }

        Ok(entries)
    }
}

#[async_trait]
impl WalletRepository for WalletManager {
    async fn get_wallet(&self, user_id: i64) -> WalletResult<Wallet> {
        WalletManager::get_wallet(self, user_id).await
    }

    async fn get_entries(&self, user_id: i64, limit: i64) -> WalletResult<Vec<WalletEntry>> {
        WalletManager::get_entries(self, user_id, limit).await
    }

    async fn credit(
        &self,
        user_id: i64,
        amount: i64,
        details: EntryDetails,
        idempotency_key: String,
    ) -> WalletResult<i64> {
        WalletManager::credit(self, user_id, amount, details, idempotency_key).await
    }

    async fn debit(
        &self,
        user_id: i64,
        amount: i64,
        details: EntryDetails,
        idempotency_key: String,
    ) -> WalletResult<i64> {
        WalletManager::debit(self, user_id, amount, details, idempotency_key).await
    }
}
