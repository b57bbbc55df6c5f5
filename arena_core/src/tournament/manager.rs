//! Tournament manager: the entry point for every lifecycle operation.

use super::errors::{TournamentError, TournamentResult};
use super::events::{LogNotifier, Notifier, TournamentEvent};
use super::gate;
use super::lifecycle;
use super::models::{
    AuditRecord, Cancellation, CredentialEvent, CredentialUpdate, JoinDetails, ListFilter,
    NewTournament, RevealedCredentials, Settlement, StatusOverride, Tournament, TournamentId,
    TournamentStatus, TournamentSummary,
};
use super::selection::{self, ParticipantView, WinnerSelection};
use crate::auth::UserId;
use crate::clock::{Clock, SystemClock};
use crate::db::{ProfileRepository, TournamentRepository};
use crate::memory::MemoryBackend;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;

/// Tournament manager
///
/// Validates requests, stamps them with the clock, delegates the atomic
/// work to a [`TournamentRepository`] and reports what happened to the
/// [`Notifier`].
#[derive(Clone)]
pub struct TournamentManager {
    repository: Arc<dyn TournamentRepository>,
    profiles: Arc<dyn ProfileRepository>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
}

impl TournamentManager {
    /// Create a new tournament manager
    ///
    /// # Arguments
    ///
    /// * `repository` - Tournament storage
    /// * `profiles` - User profile directory used for join defaults and search
    pub fn new(
        repository: Arc<dyn TournamentRepository>,
        profiles: Arc<dyn ProfileRepository>,
    ) -> Self {
        Self {
            repository,
            profiles,
            notifier: Arc::new(LogNotifier),
            clock: Arc::new(SystemClock),
        }
    }

    /// Manager backed entirely by one in-memory backend
    pub fn with_backend(backend: Arc<MemoryBackend>) -> Self {
        Self::new(backend.clone(), backend)
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Create a new Open tournament
    ///
    /// # Errors
    ///
    /// * `TournamentError::Validation` - Request fails field validation
    pub async fn create_tournament(&self, req: NewTournament) -> TournamentResult<Tournament> {
        let now = self.clock.now();
        let draft = lifecycle::prepare_create(req, now)?;
        let tournament = self.repository.insert_tournament(draft, now).await?;

        log::info!(
            "Created tournament {} '{}' ({} slots, fee {}, prize pool {})",
            tournament.id,
            tournament.title,
            tournament.max_slots,
            tournament.entry_fee,
            tournament.prize_pool
        );
        self.notifier.notify(TournamentEvent::Created {
            tournament_id: tournament.id,
            title: tournament.title.clone(),
        });

        Ok(tournament)
    }

    /// Full tournament record, promoting it first if its release is due
    pub async fn get_tournament(&self, id: TournamentId) -> TournamentResult<Tournament> {
        let now = self.clock.now();
        let mut tournament = self
            .repository
            .find_tournament(id)
            .await?
            .ok_or(TournamentError::NotFound(id))?;

        if lifecycle::release_due(&tournament, now) && !self.release(now, Some(id)).await?.is_empty()
        {
            lifecycle::apply_release(&mut tournament, now);
        }

        Ok(tournament)
    }

    /// Player view of a visible tournament
    ///
    /// Hidden tournaments are reported as not found.
    pub async fn get_public_tournament(
        &self,
        id: TournamentId,
    ) -> TournamentResult<TournamentSummary> {
        let tournament = self.get_tournament(id).await?;
        if !tournament.is_visible {
            return Err(TournamentError::NotFound(id));
        }
        Ok(TournamentSummary::from(&tournament))
    }

    /// Admin listing, hidden tournaments included when the filter says so
    pub async fn list_tournaments(&self, filter: ListFilter) -> TournamentResult<Vec<Tournament>> {
        self.promote_released().await?;
        self.repository.list_tournaments(filter).await
    }

    /// Player listing: visible tournaments only, without credentials
    pub async fn list_public(
        &self,
        status: Option<TournamentStatus>,
    ) -> TournamentResult<Vec<TournamentSummary>> {
        let tournaments = self
            .list_tournaments(ListFilter {
                include_hidden: false,
                status,
            })
            .await?;
        Ok(tournaments.iter().map(TournamentSummary::from).collect())
    }

    /// Pay the entry fee and take a slot
    ///
    /// Missing in-game details fall back to the user's profile.
    ///
    /// # Errors
    ///
    /// * `TournamentError::TournamentNotOpen` - Status is not Open
    /// * `TournamentError::AlreadyJoined` - User already holds a slot
    /// * `TournamentError::TournamentFull` - No slots left
    /// * `TournamentError::InsufficientBalance` - Wallet cannot cover the fee
    pub async fn join_tournament(
        &self,
        id: TournamentId,
        user_id: UserId,
        details: JoinDetails,
    ) -> TournamentResult<Tournament> {
        let now = self.clock.now();
        let profile = self.profiles.find_profile(user_id).await?;
        let participant = lifecycle::resolve_participant(user_id, details, profile.as_ref(), now)?;

        let tournament = match self.repository.join(id, participant, now).await {
            Ok(tournament) => tournament,
            Err(e) => {
                log::debug!("User {} could not join tournament {}: {}", user_id, id, e);
                if matches!(e, TournamentError::TournamentNotOpen(TournamentStatus::Live)) {
                    // Joins close once a scheduled room opens
                    self.release(now, Some(id)).await?;
                }
                return Err(e);
            }
        };

        log::info!(
            "User {} joined tournament {} ({}/{})",
            user_id,
            id,
            tournament.joined_count,
            tournament.max_slots
        );
        self.notifier.notify(TournamentEvent::PlayerJoined {
            tournament_id: id,
            user_id,
            joined_count: tournament.joined_count,
            max_slots: tournament.max_slots,
        });

        Ok(tournament)
    }

    /// Set or reset room credentials
    ///
    /// # Errors
    ///
    /// * `TournamentError::Validation` - Blank fields or auto release without a time
    /// * `TournamentError::InvalidTransition` - Tournament is Completed or Cancelled
    pub async fn set_credentials(
        &self,
        id: TournamentId,
        update: CredentialUpdate,
    ) -> TournamentResult<Tournament> {
        let now = self.clock.now();
        let (tournament, plan) = self.repository.set_credentials(id, &update, now).await?;
        let participants = || -> Vec<UserId> {
            tournament.participants.iter().map(|p| p.user_id).collect()
        };

        let event = match plan.event {
            CredentialEvent::Published => {
                log::info!("Tournament {} is live, room published", id);
                TournamentEvent::CredentialsPublished {
                    tournament_id: id,
                    participants: participants(),
                }
            }
            CredentialEvent::Scheduled { release_at } => {
                log::info!("Tournament {} room scheduled for {}", id, release_at);
                TournamentEvent::CredentialsScheduled {
                    tournament_id: id,
                    release_at,
                }
            }
            CredentialEvent::RoomReset => {
                log::info!("Tournament {} room reset", id);
                TournamentEvent::RoomReset {
                    tournament_id: id,
                    participants: participants(),
                }
            }
        };
        self.notifier.notify(event);

        Ok(tournament)
    }

    /// Settle the tournament and pay the winners
    ///
    /// # Arguments
    ///
    /// * `selection` - Ranks picked by the admin; first place is required
    /// * `force_advance` - Allow finalizing a tournament that never went Live
    ///
    /// # Errors
    ///
    /// * `TournamentError::AlreadyFinalized` - Tournament was settled before
    /// * `TournamentError::InvalidTransition` - Cancelled, or Open without `force_advance`
    /// * `TournamentError::ParticipantNotFound` - A winner is not a participant
    pub async fn finalize_tournament(
        &self,
        id: TournamentId,
        selection: WinnerSelection,
        force_advance: bool,
    ) -> TournamentResult<Settlement> {
        let now = self.clock.now();
        let tournament = self.get_tournament(id).await?;

        let result = match selection.into_winners(&tournament.participants) {
            Ok(winners) => self.repository.finalize(id, winners, force_advance, now).await,
            Err(e) => Err(e),
        };
        let settlement = match result {
            Ok(settlement) => settlement,
            Err(e) => {
                log::warn!("Rejected settlement of tournament {}: {}", id, e);
                return Err(e);
            }
        };

        log::info!(
            "Finalized tournament {}: {} payouts totalling {}",
            id,
            settlement.payouts.len(),
            settlement.total_paid()
        );
        self.notifier.notify(TournamentEvent::Finalized {
            tournament_id: id,
            payouts: settlement.payouts.clone(),
        });

        Ok(settlement)
    }

    /// Cancel the tournament and refund every entry fee
    ///
    /// # Errors
    ///
    /// * `TournamentError::AlreadyCancelled` - Cancelled before; nothing is refunded twice
    /// * `TournamentError::InvalidTransition` - Tournament is Completed
    pub async fn cancel_tournament(&self, id: TournamentId) -> TournamentResult<Cancellation> {
        let now = self.clock.now();
        let cancellation = self.repository.cancel(id, now).await?;

        log::info!(
            "Cancelled tournament {}: refunded {} coins to {} participants",
            id,
            cancellation.total_refunded(),
            cancellation.refunds.len()
        );
        self.notifier.notify(TournamentEvent::Cancelled {
            tournament_id: id,
            refunds: cancellation.refunds.clone(),
        });

        Ok(cancellation)
    }

    /// Overwrite the status outside the state machine
    ///
    /// Writes an audit record. Does not settle or refund.
    pub async fn force_status(
        &self,
        id: TournamentId,
        status: TournamentStatus,
        actor_id: UserId,
    ) -> TournamentResult<StatusOverride> {
        let now = self.clock.now();
        let result = self
            .repository
            .override_status(id, status, actor_id, now)
            .await?;

        log::warn!(
            "Status of tournament {} forced from {} to {} by user {}",
            id,
            result.from,
            result.to,
            actor_id
        );
        self.notifier.notify(TournamentEvent::StatusOverridden {
            tournament_id: id,
            actor_id,
            from: result.from,
            to: result.to,
        });

        Ok(result)
    }

    pub async fn set_visibility(
        &self,
        id: TournamentId,
        visible: bool,
    ) -> TournamentResult<Tournament> {
        let tournament = self
            .repository
            .set_visibility(id, visible, self.clock.now())
            .await?;
        log::info!("Tournament {} visibility set to {}", id, visible);
        Ok(tournament)
    }

    /// Room credentials for a participant once the gate opens
    ///
    /// # Errors
    ///
    /// * `TournamentError::NotJoined` - Caller is not a participant
    /// * `TournamentError::NotYetAvailable` - Too early or no room set
    pub async fn reveal_credentials(
        &self,
        id: TournamentId,
        user_id: UserId,
    ) -> TournamentResult<RevealedCredentials> {
        let tournament = self.get_tournament(id).await?;
        gate::reveal(&tournament, user_id, self.clock.now())
    }

    /// Admin participant search over profile and in-game identity
    pub async fn search_participants(
        &self,
        id: TournamentId,
        query: &str,
    ) -> TournamentResult<Vec<ParticipantView>> {
        let tournament = self.get_tournament(id).await?;
        let user_ids: Vec<UserId> = tournament.participants.iter().map(|p| p.user_id).collect();

        let profiles: HashMap<_, _> = self
            .profiles
            .find_profiles(&user_ids)
            .await?
            .into_iter()
            .map(|profile| (profile.id, profile))
            .collect();

        Ok(selection::search(&tournament.participants, &profiles, query))
    }

    /// Promote every tournament whose scheduled release is due
    pub async fn promote_released(&self) -> TournamentResult<Vec<TournamentId>> {
        self.release(self.clock.now(), None).await
    }

    /// Promote due releases and announce the opened rooms to their rosters
    async fn release(
        &self,
        now: DateTime<Utc>,
        only: Option<TournamentId>,
    ) -> TournamentResult<Vec<TournamentId>> {
        let released = self.repository.promote_released(now, only).await?;
        let mut ids = Vec::with_capacity(released.len());
        for release in released {
            log::info!(
                "Tournament {} released on schedule to {} participant(s)",
                release.tournament_id,
                release.participants.len()
            );
            ids.push(release.tournament_id);
            self.notifier.notify(TournamentEvent::CredentialsPublished {
                tournament_id: release.tournament_id,
                participants: release.participants,
            });
        }
        Ok(ids)
    }

    pub async fn audit_log(&self, id: TournamentId) -> TournamentResult<Vec<AuditRecord>> {
        self.repository.audit_log(id).await
    }

    /// Check the tournament store is reachable
    pub async fn health_check(&self) -> TournamentResult<()> {
        self.repository.ping().await
    }
}
