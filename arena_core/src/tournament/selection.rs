//! Participant search and winner selection.

use super::errors::{TournamentError, TournamentResult};
use super::models::{Participant, Rank, Winners};
use crate::auth::{UserId, UserProfile};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Participant joined with its profile for admin screens
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantView {
    pub user_id: UserId,
    pub in_game_name: String,
    pub uid: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub avatar_id: Option<String>,
    pub joined_at: DateTime<Utc>,
}

impl ParticipantView {
    pub fn new(participant: &Participant, profile: Option<&UserProfile>) -> Self {
        Self {
            user_id: participant.user_id,
            in_game_name: participant.in_game_name.clone(),
            uid: participant.uid.clone(),
            name: profile.map(|p| p.name.clone()),
            email: profile.and_then(|p| p.email.clone()),
            avatar_id: profile.and_then(|p| p.avatar_id.clone()),
            joined_at: participant.joined_at,
        }
    }

    fn matches(&self, needle: &str) -> bool {
        let contains = |haystack: &str| haystack.to_lowercase().contains(needle);
        self.name.as_deref().is_some_and(contains)
            || self.email.as_deref().is_some_and(contains)
            || contains(&self.in_game_name)
            || contains(&self.user_id.to_string())
    }
}

/// Case-insensitive substring search over name, email, in-game name and user ID
///
/// An empty query returns every participant in join order.
pub fn search(
    participants: &[Participant],
    profiles: &HashMap<UserId, UserProfile>,
    query: &str,
) -> Vec<ParticipantView> {
    let needle = query.trim().to_lowercase();
    participants
        .iter()
        .map(|p| ParticipantView::new(p, profiles.get(&p.user_id)))
        .filter(|view| needle.is_empty() || view.matches(&needle))
        .collect()
}

/// Rank assignment being built by an admin
///
/// Holds at most one user per rank and at most one rank per user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WinnerSelection {
    pub rank1: Option<UserId>,
    pub rank2: Option<UserId>,
    pub rank3: Option<UserId>,
}

impl WinnerSelection {
    pub fn holder(&self, rank: Rank) -> Option<UserId> {
        match rank {
            Rank::First => self.rank1,
            Rank::Second => self.rank2,
            Rank::Third => self.rank3,
        }
    }

    fn slot(&mut self, rank: Rank) -> &mut Option<UserId> {
        match rank {
            Rank::First => &mut self.rank1,
            Rank::Second => &mut self.rank2,
            Rank::Third => &mut self.rank3,
        }
    }

    pub fn rank_of(&self, user_id: UserId) -> Option<Rank> {
        Rank::ALL
            .into_iter()
            .find(|rank| self.holder(*rank) == Some(user_id))
    }

    /// Select or deselect `user_id` for `rank`
    ///
    /// Selecting the current holder clears the rank. Otherwise the user is
    /// removed from any other rank and replaces the previous holder.
    pub fn toggle(&mut self, rank: Rank, user_id: UserId) {
        if self.holder(rank) == Some(user_id) {
            *self.slot(rank) = None;
            return;
        }
        for other in Rank::ALL {
            if self.holder(other) == Some(user_id) {
                *self.slot(other) = None;
            }
        }
        *self.slot(rank) = Some(user_id);
    }

    /// Validate against the roster and produce settleable winners
    ///
    /// # Errors
    ///
    /// * `TournamentError::Validation` - No first place selected
    /// * `TournamentError::ParticipantNotFound` - A rank names a non-participant
    pub fn into_winners(self, participants: &[Participant]) -> TournamentResult<Winners> {
        let rank1 = self
            .rank1
            .ok_or_else(|| TournamentError::validation("winners", "first place is required"))?;

        for user_id in [Some(rank1), self.rank2, self.rank3].into_iter().flatten() {
            if !participants.iter().any(|p| p.user_id == user_id) {
                return Err(TournamentError::ParticipantNotFound(user_id));
            }
        }

        Ok(Winners {
            rank1,
            rank2: self.rank2,
            rank3: self.rank3,
        })
    }
}

impl From<Winners> for WinnerSelection {
    fn from(winners: Winners) -> Self {
        Self {
            rank1: Some(winners.rank1),
            rank2: winners.rank2,
            rank3: winners.rank3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use chrono::TimeZone;

    fn joined() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 20, 9, 30, 0).unwrap()
    }

    fn participant(user_id: UserId, ign: &str) -> Participant {
        Participant {
            user_id,
            in_game_name: ign.to_string(),
            uid: format!("{user_id}000"),
            joined_at: joined(),
        }
    }

    fn profile(id: UserId, name: &str, email: &str) -> UserProfile {
        UserProfile {
            id,
            name: name.to_string(),
            email: Some(email.to_string()),
            in_game_name: None,
            free_fire_uid: None,
            avatar_id: None,
            role: Role::User,
            created_at: joined(),
        }
    }

    fn roster() -> (Vec<Participant>, HashMap<UserId, UserProfile>) {
        let participants = vec![
            participant(1, "xDragon"),
            participant(2, "NightOwl"),
            participant(33, "Viper"),
        ];
        let profiles = HashMap::from([
            (1, profile(1, "Ayesha Khan", "ayesha@example.com")),
            (2, profile(2, "Bilal", "bilal@mail.pk")),
        ]);
        (participants, profiles)
    }

    #[test]
    fn test_empty_query_returns_all_in_order() {
        let (participants, profiles) = roster();
        let ids: Vec<_> = search(&participants, &profiles, "  ")
            .iter()
            .map(|v| v.user_id)
            .collect();
        assert_eq!(ids, vec![1, 2, 33]);
    }

    #[test]
    fn test_search_matches_each_field() {
        let (participants, profiles) = roster();
        let ids = |q: &str| -> Vec<UserId> {
            search(&participants, &profiles, q)
                .iter()
                .map(|v| v.user_id)
                .collect()
        };
        assert_eq!(ids("ayesha"), vec![1]);
        assert_eq!(ids("MAIL.PK"), vec![2]);
        assert_eq!(ids("viper"), vec![33]);
        assert_eq!(ids("33"), vec![33]);
        assert!(ids("nobody").is_empty());
    }

    #[test]
    fn test_participant_without_profile_still_matches_ign() {
        let (participants, profiles) = roster();
        let result = search(&participants, &profiles, "vip");
        assert_eq!(result.len(), 1);
        assert!(result[0].name.is_none());
    }

    #[test]
    fn test_toggle_moves_user_between_ranks() {
        let mut selection = WinnerSelection::default();
        selection.toggle(Rank::First, 1);
        selection.toggle(Rank::Second, 1);
        assert_eq!(selection.rank1, None);
        assert_eq!(selection.rank2, Some(1));
    }

    #[test]
    fn test_toggle_replaces_holder() {
        let mut selection = WinnerSelection::default();
        selection.toggle(Rank::First, 1);
        selection.toggle(Rank::First, 2);
        assert_eq!(selection.rank1, Some(2));
        assert_eq!(selection.rank_of(1), None);
    }

    #[test]
    fn test_toggle_same_holder_clears() {
        let mut selection = WinnerSelection::default();
        selection.toggle(Rank::Third, 5);
        selection.toggle(Rank::Third, 5);
        assert_eq!(selection, WinnerSelection::default());
    }

    #[test]
    fn test_into_winners_requires_first_place() {
        let (participants, _) = roster();
        let mut selection = WinnerSelection::default();
        selection.toggle(Rank::Second, 2);
        assert!(matches!(
            selection.into_winners(&participants),
            Err(TournamentError::Validation { .. })
        ));
    }

    #[test]
    fn test_into_winners_rejects_outsider() {
        let (participants, _) = roster();
        let mut selection = WinnerSelection::default();
        selection.toggle(Rank::First, 1);
        selection.toggle(Rank::Third, 99);
        assert!(matches!(
            selection.into_winners(&participants),
            Err(TournamentError::ParticipantNotFound(99))
        ));
    }

    #[test]
    fn test_into_winners_success() {
        let (participants, _) = roster();
        let mut selection = WinnerSelection::default();
        selection.toggle(Rank::First, 33);
        selection.toggle(Rank::Second, 1);
        let winners = selection.into_winners(&participants).unwrap();
        assert_eq!(
            winners,
            Winners {
                rank1: 33,
                rank2: Some(1),
                rank3: None
            }
        );
    }
}
