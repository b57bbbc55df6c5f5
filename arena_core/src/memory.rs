//! In-process backend implementing every repository trait.
//!
//! All state lives behind one `tokio::sync::Mutex`, so each operation sees
//! and mutates a consistent snapshot. Ledger postings for an operation are
//! validated as a batch before any balance changes, which gives the same
//! all-or-nothing behavior as the PostgreSQL store.

use crate::auth::{AuthResult, UserId, UserProfile};
use crate::db::{ProfileRepository, TournamentRepository, WalletRepository};
use crate::tournament::lifecycle::{self, CredentialPlan};
use crate::tournament::models::{
    AuditRecord, Cancellation, CredentialUpdate, ListFilter, Participant, ScheduledRelease,
    Settlement, StatusOverride, Tournament, TournamentDraft, TournamentId, TournamentStatus,
    Winners,
};
use crate::tournament::{TournamentError, TournamentResult};
use crate::wallet::{
    DepositDetails, EntryDetails, EntryDirection, Wallet, WalletEntry, WalletError, WalletResult,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap, HashSet};
use tokio::sync::Mutex;

const DEFAULT_CURRENCY: &str = "COIN";

/// One balance change inside a batch
#[derive(Debug, Clone)]
struct Posting {
    user_id: UserId,
    amount: i64,
    direction: EntryDirection,
    details: EntryDetails,
    idempotency_key: String,
}

impl Posting {
    fn credit(user_id: UserId, amount: i64, details: EntryDetails, key: String) -> Self {
        Self {
            user_id,
            amount,
            direction: EntryDirection::Credit,
            details,
            idempotency_key: key,
        }
    }

    fn debit(user_id: UserId, amount: i64, details: EntryDetails, key: String) -> Self {
        Self {
            user_id,
            amount,
            direction: EntryDirection::Debit,
            details,
            idempotency_key: key,
        }
    }
}

#[derive(Debug, Default)]
struct Ledger {
    wallets: HashMap<UserId, Wallet>,
    entries: Vec<WalletEntry>,
    used_keys: HashSet<String>,
}

impl Ledger {
    /// Validate every posting, then apply them all
    ///
    /// Returns the balance after each posting, in order.
    fn post(&mut self, postings: Vec<Posting>, now: DateTime<Utc>) -> WalletResult<Vec<i64>> {
        let mut projected: HashMap<UserId, i64> = HashMap::new();
        let mut batch_keys: HashSet<&str> = HashSet::new();

        for posting in &postings {
            if posting.amount <= 0 {
                return Err(WalletError::InvalidAmount(posting.amount));
            }
            if self.used_keys.contains(&posting.idempotency_key)
                || !batch_keys.insert(posting.idempotency_key.as_str())
            {
                return Err(WalletError::DuplicateTransaction(
                    posting.idempotency_key.clone(),
                ));
            }

            let existing = self.wallets.get(&posting.user_id).map(|w| w.balance);
            let current = projected.get(&posting.user_id).copied().or(existing);

            let next = match posting.direction {
                EntryDirection::Debit => {
                    let available =
                        current.ok_or(WalletError::WalletNotFound(posting.user_id))?;
                    if available < posting.amount {
                        return Err(WalletError::InsufficientBalance {
                            available,
                            required: posting.amount,
                        });
                    }
                    available - posting.amount
                }
                EntryDirection::Credit => current
                    .unwrap_or(0)
                    .checked_add(posting.amount)
                    .ok_or(WalletError::BalanceOverflow)?,
            };
            projected.insert(posting.user_id, next);
        }

        let mut balances = Vec::with_capacity(postings.len());
        for posting in postings {
            let wallet = self
                .wallets
                .entry(posting.user_id)
                .or_insert_with(|| Wallet {
                    user_id: posting.user_id,
                    balance: 0,
                    currency: DEFAULT_CURRENCY.to_string(),
                    created_at: now,
                    updated_at: now,
                });

            let signed = match posting.direction {
                EntryDirection::Debit => -posting.amount,
                EntryDirection::Credit => posting.amount,
            };
            wallet.balance += signed;
            wallet.updated_at = now;
            balances.push(wallet.balance);

            self.used_keys.insert(posting.idempotency_key.clone());
            self.entries.push(WalletEntry {
                id: self.entries.len() as i64 + 1,
                user_id: posting.user_id,
                tournament_id: posting.details.tournament_id(),
                amount: signed,
                balance_after: wallet.balance,
                direction: posting.direction,
                entry_type: posting.details.entry_type(),
                description: Some(posting.details.describe()),
                details: posting.details,
                idempotency_key: posting.idempotency_key,
                created_at: now,
            });
        }

        Ok(balances)
    }
}

#[derive(Debug, Default)]
struct State {
    last_tournament_id: TournamentId,
    tournaments: BTreeMap<TournamentId, Tournament>,
    ledger: Ledger,
    audit: Vec<AuditRecord>,
    profiles: HashMap<UserId, UserProfile>,
}

impl State {
    fn tournament_mut(&mut self, id: TournamentId) -> TournamentResult<&mut Tournament> {
        self.tournaments
            .get_mut(&id)
            .ok_or(TournamentError::NotFound(id))
    }
}

/// Memory-backed tournaments, wallets and profiles
#[derive(Debug, Default)]
pub struct MemoryBackend {
    state: Mutex<State>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace a user profile
    pub async fn add_profile(&self, profile: UserProfile) {
        self.state.lock().await.profiles.insert(profile.id, profile);
    }

    /// Credit coins as a deposit with a fresh idempotency key
    pub async fn deposit(&self, user_id: UserId, amount: i64) -> WalletResult<i64> {
        let details = EntryDetails::Deposit(DepositDetails {
            sender_name: format!("user {user_id}"),
            sender_number: String::new(),
        });
        let key = format!("deposit:{}", uuid::Uuid::new_v4());
        self.credit(user_id, amount, details, key).await
    }

    /// Current balance, `None` when the user has no wallet
    pub async fn balance(&self, user_id: UserId) -> Option<i64> {
        self.state
            .lock()
            .await
            .ledger
            .wallets
            .get(&user_id)
            .map(|w| w.balance)
    }

    /// Every ledger entry that references a tournament, oldest first
    pub async fn tournament_entries(&self, tournament_id: TournamentId) -> Vec<WalletEntry> {
        self.state
            .lock()
            .await
            .ledger
            .entries
            .iter()
            .filter(|e| e.tournament_id == Some(tournament_id))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl TournamentRepository for MemoryBackend {
    async fn insert_tournament(
        &self,
        draft: TournamentDraft,
        now: DateTime<Utc>,
    ) -> TournamentResult<Tournament> {
        let mut state = self.state.lock().await;
        state.last_tournament_id += 1;
        let id = state.last_tournament_id;

        let tournament = draft.into_tournament(id, now);
        state.tournaments.insert(id, tournament.clone());
        Ok(tournament)
    }

    async fn find_tournament(&self, id: TournamentId) -> TournamentResult<Option<Tournament>> {
        Ok(self.state.lock().await.tournaments.get(&id).cloned())
    }

    async fn list_tournaments(&self, filter: ListFilter) -> TournamentResult<Vec<Tournament>> {
        let state = self.state.lock().await;
        let mut tournaments: Vec<Tournament> = state
            .tournaments
            .values()
            .filter(|t| filter.include_hidden || t.is_visible)
            .filter(|t| filter.status.is_none_or(|status| t.status == status))
            .cloned()
            .collect();
        tournaments.sort_by_key(|t| (t.start_time, t.id));
        Ok(tournaments)
    }

    async fn join(
        &self,
        id: TournamentId,
        participant: Participant,
        now: DateTime<Utc>,
    ) -> TournamentResult<Tournament> {
        let mut guard = self.state.lock().await;
        let state = &mut *guard;
        let t = state
            .tournaments
            .get_mut(&id)
            .ok_or(TournamentError::NotFound(id))?;

        let user_id = participant.user_id;
        lifecycle::check_join(t, user_id, now)?;

        if t.entry_fee > 0 {
            state.ledger.post(
                vec![Posting::debit(
                    user_id,
                    t.entry_fee,
                    EntryDetails::TournamentEntry { tournament_id: id },
                    lifecycle::entry_fee_key(id, user_id),
                )],
                now,
            )?;
        }

        lifecycle::apply_join(t, participant, now);
        Ok(t.clone())
    }

    async fn set_credentials(
        &self,
        id: TournamentId,
        update: &CredentialUpdate,
        now: DateTime<Utc>,
    ) -> TournamentResult<(Tournament, CredentialPlan)> {
        let mut state = self.state.lock().await;
        let t = state.tournament_mut(id)?;

        let plan = lifecycle::plan_credentials(t, update, now)?;
        lifecycle::apply_credentials(t, update, &plan, now);
        Ok((t.clone(), plan))
    }

    async fn finalize(
        &self,
        id: TournamentId,
        winners: Winners,
        force_advance: bool,
        now: DateTime<Utc>,
    ) -> TournamentResult<Settlement> {
        let mut guard = self.state.lock().await;
        let state = &mut *guard;
        let t = state
            .tournaments
            .get_mut(&id)
            .ok_or(TournamentError::NotFound(id))?;

        let payouts = lifecycle::plan_settlement(t, &winners, force_advance, now)?;
        let postings = payouts
            .iter()
            .map(|payout| {
                Posting::credit(
                    payout.user_id,
                    payout.amount,
                    EntryDetails::TournamentPrize {
                        tournament_id: id,
                        rank: payout.rank.position(),
                    },
                    lifecycle::prize_key(id, payout.rank),
                )
            })
            .collect();
        state.ledger.post(postings, now)?;

        lifecycle::apply_settlement(t, winners, now);
        Ok(Settlement {
            tournament: t.clone(),
            payouts,
        })
    }

    async fn cancel(&self, id: TournamentId, now: DateTime<Utc>) -> TournamentResult<Cancellation> {
        let mut guard = self.state.lock().await;
        let state = &mut *guard;
        let t = state
            .tournaments
            .get_mut(&id)
            .ok_or(TournamentError::NotFound(id))?;

        let refunds = lifecycle::plan_cancel(t)?;
        let postings = refunds
            .iter()
            .map(|refund| {
                Posting::credit(
                    refund.user_id,
                    refund.amount,
                    EntryDetails::TournamentRefund { tournament_id: id },
                    lifecycle::refund_key(id, refund.user_id),
                )
            })
            .collect();
        state.ledger.post(postings, now)?;

        lifecycle::apply_cancel(t, now);
        Ok(Cancellation {
            tournament: t.clone(),
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
        let mut guard = self.state.lock().await;
        let state = &mut *guard;
        let t = state
            .tournaments
            .get_mut(&id)
            .ok_or(TournamentError::NotFound(id))?;

        let from = t.status;
        lifecycle::apply_override(t, status, now);
        let tournament = t.clone();

        let record_id = state.audit.len() as i64 + 1;
        state.audit.push(AuditRecord {
            id: record_id,
            tournament_id: id,
            actor_id,
            action: "force_status".to_string(),
            from_status: from,
            to_status: status,
            created_at: now,
        });

        Ok(StatusOverride {
            tournament,
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
        let mut state = self.state.lock().await;
        let t = state.tournament_mut(id)?;
        t.is_visible = visible;
        t.updated_at = now;
        Ok(t.clone())
    }

    async fn promote_released(
        &self,
        now: DateTime<Utc>,
        only: Option<TournamentId>,
    ) -> TournamentResult<Vec<ScheduledRelease>> {
        let mut state = self.state.lock().await;
        let mut promoted = Vec::new();
        for t in state.tournaments.values_mut() {
            if only.is_some_and(|id| id != t.id) || !lifecycle::release_due(t, now) {
                continue;
            }
            lifecycle::apply_release(t, now);
            promoted.push(ScheduledRelease {
                tournament_id: t.id,
                participants: t.participants.iter().map(|p| p.user_id).collect(),
            });
        }
        Ok(promoted)
    }

    async fn audit_log(&self, id: TournamentId) -> TournamentResult<Vec<AuditRecord>> {
        let state = self.state.lock().await;
        Ok(state
            .audit
            .iter()
            .filter(|record| record.tournament_id == id)
            .cloned()
            .collect())
    }

    async fn ping(&self) -> TournamentResult<()> {
        Ok(())
    }
}

#[async_trait]
impl WalletRepository for MemoryBackend {
    async fn get_wallet(&self, user_id: i64) -> WalletResult<Wallet> {
        self.state
            .lock()
            .await
            .ledger
            .wallets
            .get(&user_id)
            .cloned()
            .ok_or(WalletError::WalletNotFound(user_id))
    }

    async fn get_entries(&self, user_id: i64, limit: i64) -> WalletResult<Vec<WalletEntry>> {
        let state = self.state.lock().await;
        Ok(state
            .ledger
            .entries
            .iter()
            .rev()
            .filter(|e| e.user_id == user_id)
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn credit(
        &self,
        user_id: i64,
        amount: i64,
        details: EntryDetails,
        idempotency_key: String,
    ) -> WalletResult<i64> {
        let mut state = self.state.lock().await;
        let balances = state.ledger.post(
            vec![Posting::credit(user_id, amount, details, idempotency_key)],
            Utc::now(),
        )?;
        Ok(balances[0])
    }

    async fn debit(
        &self,
        user_id: i64,
        amount: i64,
        details: EntryDetails,
        idempotency_key: String,
    ) -> WalletResult<i64> {
        let mut state = self.state.lock().await;
        let balances = state.ledger.post(
            vec![Posting::debit(user_id, amount, details, idempotency_key)],
            Utc::now(),
        )?;
        Ok(balances[0])
    }
}

#[async_trait]
impl ProfileRepository for MemoryBackend {
    async fn find_profile(&self, user_id: UserId) -> AuthResult<Option<UserProfile>> {
        Ok(self.state.lock().await.profiles.get(&user_id).cloned())
    }

    async fn find_profiles(&self, user_ids: &[UserId]) -> AuthResult<Vec<UserProfile>> {
        let state = self.state.lock().await;
        Ok(user_ids
            .iter()
            .filter_map(|id| state.profiles.get(id).cloned())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn adjustment() -> EntryDetails {
        EntryDetails::Adjustment {
            reason: "test".to_string(),
        }
    }

    #[tokio::test]
    async fn test_debit_never_overdraws() {
        let backend = MemoryBackend::new();
        backend.deposit(1, 15).await.unwrap();

        let err = backend
            .debit(1, 20, adjustment(), "d1".to_string())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            WalletError::InsufficientBalance {
                available: 15,
                required: 20
            }
        ));
        assert_eq!(backend.balance(1).await, Some(15));
    }

    #[tokio::test]
    async fn test_debit_missing_wallet() {
        let backend = MemoryBackend::new();
        let err = backend
            .debit(5, 1, adjustment(), "d".to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, WalletError::WalletNotFound(5)));
    }

    #[tokio::test]
    async fn test_idempotency_key_is_single_use() {
        let backend = MemoryBackend::new();
        backend
            .credit(1, 10, adjustment(), "k".to_string())
            .await
            .unwrap();
        let err = backend
            .credit(1, 10, adjustment(), "k".to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, WalletError::DuplicateTransaction(_)));
        assert_eq!(backend.balance(1).await, Some(10));
    }

    #[tokio::test]
    async fn test_non_positive_amounts_rejected() {
        let backend = MemoryBackend::new();
        assert!(matches!(
            backend.credit(1, 0, adjustment(), "z".to_string()).await,
            Err(WalletError::InvalidAmount(0))
        ));
    }

    #[tokio::test]
    async fn test_batch_is_all_or_nothing() {
        let mut ledger = Ledger::default();
        let now = Utc::now();
        ledger
            .post(vec![Posting::credit(1, 5, adjustment(), "a".to_string())], now)
            .unwrap();

        let result = ledger.post(
            vec![
                Posting::credit(2, 100, adjustment(), "b".to_string()),
                Posting::debit(1, 50, adjustment(), "c".to_string()),
            ],
            now,
        );
        assert!(result.is_err());
        assert!(!ledger.wallets.contains_key(&2));
        assert_eq!(ledger.entries.len(), 1);
        assert!(!ledger.used_keys.contains("b"));
    }

    #[tokio::test]
    async fn test_entries_newest_first() {
        let backend = MemoryBackend::new();
        backend.deposit(1, 10).await.unwrap();
        backend
            .debit(1, 4, adjustment(), "spend".to_string())
            .await
            .unwrap();

        let entries = backend.get_entries(1, 10).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].amount, -4);
        assert_eq!(entries[0].balance_after, 6);
        assert_eq!(entries[1].direction, EntryDirection::Credit);
    }
}
