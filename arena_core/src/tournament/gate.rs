//! Credential visibility gate.
//!
//! Room details are handed out only to participants, and only once the
//! tournament is Live or its release time (the scheduled auto release, else
//! the start time) has passed. Completed and Cancelled tournaments no
//! longer hand out their room.

use super::errors::{TournamentError, TournamentResult};
use super::models::{RevealedCredentials, Tournament, TournamentStatus};
use crate::auth::UserId;
use chrono::{DateTime, Utc};

/// Moment credentials become visible without the tournament going Live
pub fn release_time(t: &Tournament) -> DateTime<Utc> {
    t.auto_release_time.unwrap_or(t.start_time)
}

pub fn can_reveal(t: &Tournament, now: DateTime<Utc>) -> bool {
    t.status == TournamentStatus::Live || now >= release_time(t)
}

/// Credentials for `user_id`, re-checking membership and timing
///
/// # Errors
///
/// * `TournamentError::NotJoined` - Caller is not a participant
/// * `TournamentError::NotYetAvailable` - Too early, no room set yet, or the
///   tournament is over
pub fn reveal(
    t: &Tournament,
    user_id: UserId,
    now: DateTime<Utc>,
) -> TournamentResult<RevealedCredentials> {
    if !t.is_participant(user_id) {
        return Err(TournamentError::NotJoined);
    }
    if t.status.is_terminal() || !can_reveal(t, now) {
        return Err(TournamentError::NotYetAvailable);
    }
    let credentials = t.credentials().ok_or(TournamentError::NotYetAvailable)?;

    Ok(RevealedCredentials {
        credentials,
        released_at: release_time(t).min(now),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tournament::models::{
        GameMap, GameType, MatchFormat, Participant, PrizeDistribution, TournamentDraft,
    };
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 10, 18, 0, 0).unwrap()
    }

    fn tournament_with_room() -> Tournament {
        let mut t = TournamentDraft {
            title: "Night Ops".to_string(),
            format: MatchFormat::Duo,
            game_type: GameType::ClashSquad,
            map: GameMap::Kalahari,
            entry_fee: 0,
            max_slots: 8,
            start_time: now() + Duration::hours(1),
            prize_distribution: PrizeDistribution::default(),
            prize_pool: 0,
        }
        .into_tournament(3, now());
        t.participants.push(Participant {
            user_id: 10,
            in_game_name: "Ten".to_string(),
            uid: "1010".to_string(),
            joined_at: now(),
        });
        t.joined_count = 1;
        t.room_id = Some("445566".to_string());
        t.room_password = Some("pw".to_string());
        t
    }

    #[test]
    fn test_hidden_before_start() {
        let t = tournament_with_room();
        assert!(!can_reveal(&t, now()));
        assert!(matches!(reveal(&t, 10, now()), Err(TournamentError::NotYetAvailable)));
    }

    #[test]
    fn test_visible_at_start_time() {
        let t = tournament_with_room();
        let at = t.start_time;
        let revealed = reveal(&t, 10, at).unwrap();
        assert_eq!(revealed.credentials.room_id, "445566");
        assert_eq!(revealed.released_at, at);
    }

    #[test]
    fn test_auto_release_time_reveals_early() {
        let mut t = tournament_with_room();
        t.auto_release_time = Some(now() + Duration::minutes(5));
        assert!(!can_reveal(&t, now()));
        assert!(can_reveal(&t, now() + Duration::minutes(5)));
    }

    #[test]
    fn test_live_reveals_immediately() {
        let mut t = tournament_with_room();
        t.status = TournamentStatus::Live;
        let revealed = reveal(&t, 10, now()).unwrap();
        assert_eq!(revealed.released_at, now());
    }

    #[test]
    fn test_non_participant_never_sees_room() {
        let mut t = tournament_with_room();
        t.status = TournamentStatus::Live;
        assert!(matches!(reveal(&t, 11, now()), Err(TournamentError::NotJoined)));
    }

    #[test]
    fn test_finished_tournament_withholds_room() {
        for status in [TournamentStatus::Completed, TournamentStatus::Cancelled] {
            let mut t = tournament_with_room();
            t.status = status;
            let after_start = t.start_time + Duration::hours(1);
            assert!(matches!(
                reveal(&t, 10, after_start),
                Err(TournamentError::NotYetAvailable)
            ));
        }
    }

    #[test]
    fn test_no_room_set_is_not_available() {
        let mut t = tournament_with_room();
        t.room_id = None;
        assert!(matches!(
            reveal(&t, 10, t.start_time),
            Err(TournamentError::NotYetAvailable)
        ));
    }
}
