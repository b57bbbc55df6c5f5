//! Tournament state machine.
//!
//! Every function here is pure: it inspects a tournament snapshot and either
//! returns a plan or an error. Storage backends lock the tournament, run the
//! check, apply wallet deltas and then call the matching `apply_*` so both
//! backends mutate state identically.

use super::errors::{LifecycleAction, TournamentError, TournamentResult};
use super::models::{
    CredentialEvent, CredentialUpdate, JoinDetails, MAX_TITLE_CHARS, NewTournament, Participant,
    Payout, Rank, Refund, Tournament, TournamentDraft, TournamentId, TournamentStatus, Winners,
};
use crate::auth::{UserId, UserProfile};
use chrono::{DateTime, Utc};

/// Outcome of a credential update, computed before anything is written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CredentialPlan {
    pub status: TournamentStatus,
    pub auto_release_time: Option<DateTime<Utc>>,
    pub event: CredentialEvent,
}

/// Validate an admin creation request
///
/// # Errors
///
/// * `TournamentError::Validation` - Any field out of range, prize overflow,
///   prize pool mismatch or a start time that is not in the future
pub fn prepare_create(req: NewTournament, now: DateTime<Utc>) -> TournamentResult<TournamentDraft> {
    let title = req.title.trim().to_string();
    let title_len = title.chars().count();
    if title_len == 0 {
        return Err(TournamentError::validation("title", "title is required"));
    }
    if title_len > MAX_TITLE_CHARS {
        return Err(TournamentError::validation(
            "title",
            format!("at most {MAX_TITLE_CHARS} characters"),
        ));
    }

    if req.entry_fee < 0 {
        return Err(TournamentError::validation("entryFee", "must not be negative"));
    }

    // Stored as a Postgres INTEGER
    let max_slots = i32::try_from(req.max_slots)
        .ok()
        .filter(|slots| *slots > 0)
        .and_then(|slots| u32::try_from(slots).ok())
        .ok_or_else(|| {
            TournamentError::validation(
                "maxSlots",
                format!("must be between 1 and {}", i32::MAX),
            )
        })?;

    let prizes = req.prize_distribution;
    if prizes.first < 0 || prizes.second < 0 || prizes.third < 0 {
        return Err(TournamentError::validation(
            "prizeDistribution",
            "prizes must not be negative",
        ));
    }
    let prize_pool = prizes
        .total()
        .ok_or_else(|| TournamentError::validation("prizeDistribution", "prize total overflows"))?;

    if let Some(requested) = req.prize_pool.filter(|requested| *requested != prize_pool) {
        return Err(TournamentError::validation(
            "prizePool",
            format!("must equal the distribution total {prize_pool}, got {requested}"),
        ));
    }

    if req.start_time <= now {
        return Err(TournamentError::validation(
            "startTime",
            "must be in the future",
        ));
    }

    Ok(TournamentDraft {
        title,
        format: req.format,
        game_type: req.game_type,
        map: req.map,
        entry_fee: req.entry_fee,
        max_slots,
        start_time: req.start_time,
        prize_distribution: prizes,
        prize_pool,
    })
}

/// Open tournament whose scheduled credentials have reached their release time
pub fn release_due(t: &Tournament, now: DateTime<Utc>) -> bool {
    t.status == TournamentStatus::Open
        && t.credentials().is_some()
        && t.auto_release_time.is_some_and(|at| at <= now)
}

/// Status as observed at `now`, counting a due release as Live
pub fn effective_status(t: &Tournament, now: DateTime<Utc>) -> TournamentStatus {
    if release_due(t, now) {
        TournamentStatus::Live
    } else {
        t.status
    }
}

/// Join preconditions in order: status, duplicate, capacity
///
/// The balance check belongs to the ledger debit that follows.
pub fn check_join(t: &Tournament, user_id: UserId, now: DateTime<Utc>) -> TournamentResult<()> {
    let status = effective_status(t, now);
    if status != TournamentStatus::Open {
        return Err(TournamentError::TournamentNotOpen(status));
    }
    if t.is_participant(user_id) {
        return Err(TournamentError::AlreadyJoined);
    }
    if t.joined_count >= t.max_slots {
        return Err(TournamentError::TournamentFull);
    }
    Ok(())
}

/// Build the participant snapshot, falling back to the profile
pub fn resolve_participant(
    user_id: UserId,
    details: JoinDetails,
    profile: Option<&UserProfile>,
    now: DateTime<Utc>,
) -> TournamentResult<Participant> {
    let pick = |given: Option<String>, stored: Option<&String>| {
        given
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .or_else(|| {
                stored
                    .map(|v| v.trim().to_string())
                    .filter(|v| !v.is_empty())
            })
    };

    let in_game_name = pick(
        details.in_game_name,
        profile.and_then(|p| p.in_game_name.as_ref()),
    )
    .ok_or_else(|| TournamentError::validation("inGameName", "in-game name is required"))?;

    let uid = pick(details.uid, profile.and_then(|p| p.free_fire_uid.as_ref()))
        .ok_or_else(|| TournamentError::validation("uid", "game UID is required"))?;

    Ok(Participant {
        user_id,
        in_game_name,
        uid,
        joined_at: now,
    })
}

pub fn apply_join(t: &mut Tournament, participant: Participant, now: DateTime<Utc>) {
    t.participants.push(participant);
    t.joined_count = t.participants.len() as u32;
    t.updated_at = now;
}

/// Decide what a credential update does
///
/// # Errors
///
/// * `TournamentError::Validation` - Blank room fields, or auto release
///   without a release time
/// * `TournamentError::InvalidTransition` - Tournament is Completed or Cancelled
pub fn plan_credentials(
    t: &Tournament,
    update: &CredentialUpdate,
    now: DateTime<Utc>,
) -> TournamentResult<CredentialPlan> {
    let status = effective_status(t, now);
    if status.is_terminal() {
        return Err(TournamentError::InvalidTransition {
            from: status,
            action: LifecycleAction::SetCredentials,
        });
    }
    if update.room_id.trim().is_empty() {
        return Err(TournamentError::validation("roomID", "room ID is required"));
    }
    if update.room_password.trim().is_empty() {
        return Err(TournamentError::validation(
            "roomPassword",
            "room password is required",
        ));
    }

    let scheduled = if update.auto_release {
        let release_at = update.release_time.ok_or_else(|| {
            TournamentError::validation("releaseTime", "required when autoRelease is set")
        })?;
        (release_at > now).then_some(release_at)
    } else {
        None
    };

    let plan = match (status, scheduled) {
        (TournamentStatus::Open, Some(release_at)) => CredentialPlan {
            status: TournamentStatus::Open,
            auto_release_time: Some(release_at),
            event: CredentialEvent::Scheduled { release_at },
        },
        (TournamentStatus::Open, None) => CredentialPlan {
            status: TournamentStatus::Live,
            auto_release_time: None,
            event: CredentialEvent::Published,
        },
        _ => CredentialPlan {
            status: TournamentStatus::Live,
            auto_release_time: t.auto_release_time,
            event: CredentialEvent::RoomReset,
        },
    };
    Ok(plan)
}

pub fn apply_credentials(
    t: &mut Tournament,
    update: &CredentialUpdate,
    plan: &CredentialPlan,
    now: DateTime<Utc>,
) {
    t.room_id = Some(update.room_id.trim().to_string());
    t.room_password = Some(update.room_password.trim().to_string());
    t.status = plan.status;
    t.auto_release_time = plan.auto_release_time;
    t.updated_at = now;
}

pub fn apply_release(t: &mut Tournament, now: DateTime<Utc>) {
    t.status = TournamentStatus::Live;
    t.updated_at = now;
}

/// Check winners reference distinct participants
pub fn validate_winners(t: &Tournament, winners: &Winners) -> TournamentResult<()> {
    let ranked = winners.ranked();
    for (_, user_id) in &ranked {
        if !t.is_participant(*user_id) {
            return Err(TournamentError::ParticipantNotFound(*user_id));
        }
    }
    for (i, (_, a)) in ranked.iter().enumerate() {
        if ranked[i + 1..].iter().any(|(_, b)| a == b) {
            return Err(TournamentError::validation(
                "winners",
                format!("user {a} holds more than one rank"),
            ));
        }
    }
    Ok(())
}

/// Compute prize payouts for a finalize
///
/// Zero-amount prizes produce no payout.
///
/// # Errors
///
/// * `TournamentError::AlreadyFinalized` - Tournament is Completed
/// * `TournamentError::InvalidTransition` - Cancelled, or Open without `force_advance`
/// * `TournamentError::ParticipantNotFound` / `Validation` - Bad winners
pub fn plan_settlement(
    t: &Tournament,
    winners: &Winners,
    force_advance: bool,
    now: DateTime<Utc>,
) -> TournamentResult<Vec<Payout>> {
    match effective_status(t, now) {
        TournamentStatus::Live => {}
        TournamentStatus::Open if force_advance => {}
        TournamentStatus::Completed => return Err(TournamentError::AlreadyFinalized),
        status => {
            return Err(TournamentError::InvalidTransition {
                from: status,
                action: LifecycleAction::Finalize,
            });
        }
    }

    validate_winners(t, winners)?;

    Ok(winners
        .ranked()
        .into_iter()
        .map(|(rank, user_id)| Payout {
            user_id,
            rank,
            amount: t.prize_distribution.amount_for(rank),
        })
        .filter(|payout| payout.amount > 0)
        .collect())
}

pub fn apply_settlement(t: &mut Tournament, winners: Winners, now: DateTime<Utc>) {
    t.winners = Some(winners);
    t.status = TournamentStatus::Completed;
    t.finalized_at = Some(now);
    t.updated_at = now;
}

/// Compute entry fee refunds for a cancel
///
/// # Errors
///
/// * `TournamentError::AlreadyCancelled` - Tournament is Cancelled
/// * `TournamentError::InvalidTransition` - Tournament is Completed
pub fn plan_cancel(t: &Tournament) -> TournamentResult<Vec<Refund>> {
    match t.status {
        TournamentStatus::Open | TournamentStatus::Live => {}
        TournamentStatus::Cancelled => return Err(TournamentError::AlreadyCancelled),
        TournamentStatus::Completed => {
            return Err(TournamentError::InvalidTransition {
                from: TournamentStatus::Completed,
                action: LifecycleAction::Cancel,
            });
        }
    }

    if t.entry_fee == 0 {
        return Ok(Vec::new());
    }
    Ok(t.participants
        .iter()
        .map(|p| Refund {
            user_id: p.user_id,
            amount: t.entry_fee,
        })
        .collect())
}

pub fn apply_cancel(t: &mut Tournament, now: DateTime<Utc>) {
    t.status = TournamentStatus::Cancelled;
    t.cancelled_at = Some(now);
    t.updated_at = now;
}

pub fn apply_override(t: &mut Tournament, status: TournamentStatus, now: DateTime<Utc>) {
    t.status = status;
    t.updated_at = now;
}

/// Ledger key for an entry fee debit
pub fn entry_fee_key(tournament_id: TournamentId, user_id: UserId) -> String {
    format!("tournament:{tournament_id}:entry:{user_id}")
}

/// Ledger key for a prize credit
pub fn prize_key(tournament_id: TournamentId, rank: Rank) -> String {
    format!("tournament:{tournament_id}:prize:{}", rank.position())
}

/// Ledger key for an entry fee refund
pub fn refund_key(tournament_id: TournamentId, user_id: UserId) -> String {
    format!("tournament:{tournament_id}:refund:{user_id}")
}
