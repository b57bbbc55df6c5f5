//! Tournament data models.

use crate::auth::UserId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Tournament ID type
pub type TournamentId = i64;

/// Maximum title length in characters
pub const MAX_TITLE_CHARS: usize = 15;

/// Tournament status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TournamentStatus {
    /// Accepting players
    Open,
    /// Room published, match in progress
    Live,
    /// Winners settled
    Completed,
    /// Entry fees refunded
    Cancelled,
}

impl TournamentStatus {
    /// Completed and Cancelled cannot be left through normal operations
    pub fn is_terminal(self) -> bool {
        matches!(self, TournamentStatus::Completed | TournamentStatus::Cancelled)
    }
}

impl std::fmt::Display for TournamentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TournamentStatus::Open => write!(f, "open"),
            TournamentStatus::Live => write!(f, "live"),
            TournamentStatus::Completed => write!(f, "completed"),
            TournamentStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl std::str::FromStr for TournamentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "open" => Ok(TournamentStatus::Open),
            "live" => Ok(TournamentStatus::Live),
            "completed" => Ok(TournamentStatus::Completed),
            "cancelled" => Ok(TournamentStatus::Cancelled),
            other => Err(format!("unknown tournament status: {other}")),
        }
    }
}

/// Team size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchFormat {
    Solo,
    Duo,
    Squad,
}

impl std::fmt::Display for MatchFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchFormat::Solo => write!(f, "solo"),
            MatchFormat::Duo => write!(f, "duo"),
            MatchFormat::Squad => write!(f, "squad"),
        }
    }
}

impl std::str::FromStr for MatchFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "solo" => Ok(MatchFormat::Solo),
            "duo" => Ok(MatchFormat::Duo),
            "squad" => Ok(MatchFormat::Squad),
            other => Err(format!("unknown format: {other}")),
        }
    }
}

/// Game mode: battle royale or clash squad
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameType {
    #[serde(rename = "BR")]
    BattleRoyale,
    #[serde(rename = "CS")]
    ClashSquad,
}

impl std::fmt::Display for GameType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GameType::BattleRoyale => write!(f, "BR"),
            GameType::ClashSquad => write!(f, "CS"),
        }
    }
}

impl std::str::FromStr for GameType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "BR" => Ok(GameType::BattleRoyale),
            "CS" => Ok(GameType::ClashSquad),
            other => Err(format!("unknown game type: {other}")),
        }
    }
}

/// Playable maps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameMap {
    Bermuda,
    Purgatory,
    Kalahari,
    Alpine,
    NeXTerra,
}

impl std::fmt::Display for GameMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            GameMap::Bermuda => "Bermuda",
            GameMap::Purgatory => "Purgatory",
            GameMap::Kalahari => "Kalahari",
            GameMap::Alpine => "Alpine",
            GameMap::NeXTerra => "NeXTerra",
        };
        f.write_str(name)
    }
}

impl std::str::FromStr for GameMap {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "bermuda" => Ok(GameMap::Bermuda),
            "purgatory" => Ok(GameMap::Purgatory),
            "kalahari" => Ok(GameMap::Kalahari),
            "alpine" => Ok(GameMap::Alpine),
            "nexterra" => Ok(GameMap::NeXTerra),
            other => Err(format!("unknown map: {other}")),
        }
    }
}

/// Finishing rank that carries a prize
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Rank {
    First,
    Second,
    Third,
}

impl Rank {
    pub const ALL: [Rank; 3] = [Rank::First, Rank::Second, Rank::Third];

    /// 1-indexed position
    pub fn position(self) -> u8 {
        match self {
            Rank::First => 1,
            Rank::Second => 2,
            Rank::Third => 3,
        }
    }

    pub fn from_position(position: u8) -> Option<Rank> {
        match position {
            1 => Some(Rank::First),
            2 => Some(Rank::Second),
            3 => Some(Rank::Third),
            _ => None,
        }
    }
}

/// Prize split across the top three
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PrizeDistribution {
    pub first: i64,
    pub second: i64,
    pub third: i64,
}

impl PrizeDistribution {
    pub fn new(first: i64, second: i64, third: i64) -> Self {
        Self {
            first,
            second,
            third,
        }
    }

    /// Sum of all allocations, `None` on overflow
    pub fn total(&self) -> Option<i64> {
        self.first.checked_add(self.second)?.checked_add(self.third)
    }

    /// Allocation for a rank
    pub fn amount_for(&self, rank: Rank) -> i64 {
        match rank {
            Rank::First => self.first,
            Rank::Second => self.second,
            Rank::Third => self.third,
        }
    }
}

/// A user entered in a tournament
///
/// In-game identity is a snapshot taken at join time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub user_id: UserId,
    pub in_game_name: String,
    pub uid: String,
    pub joined_at: DateTime<Utc>,
}

/// Settled finishing order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Winners {
    pub rank1: UserId,
    pub rank2: Option<UserId>,
    pub rank3: Option<UserId>,
}

impl Winners {
    /// Assigned ranks in order, skipping empty ones
    pub fn ranked(&self) -> Vec<(Rank, UserId)> {
        let mut ranked = vec![(Rank::First, self.rank1)];
        if let Some(user_id) = self.rank2 {
            ranked.push((Rank::Second, user_id));
        }
        if let Some(user_id) = self.rank3 {
            ranked.push((Rank::Third, user_id));
        }
        ranked
    }
}

/// Room ID and password for the in-game lobby
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomCredentials {
    #[serde(rename = "roomID")]
    pub room_id: String,
    #[serde(rename = "roomPassword")]
    pub room_password: String,
}

/// Tournament record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tournament {
    pub id: TournamentId,
    pub title: String,
    pub format: MatchFormat,
    pub game_type: GameType,
    pub map: GameMap,
    pub entry_fee: i64,
    pub prize_pool: i64,
    pub prize_distribution: PrizeDistribution,
    pub max_slots: u32,
    pub joined_count: u32,
    pub start_time: DateTime<Utc>,
    pub auto_release_time: Option<DateTime<Utc>>,
    pub status: TournamentStatus,
    #[serde(rename = "roomID")]
    pub room_id: Option<String>,
    #[serde(rename = "roomPassword")]
    pub room_password: Option<String>,
    pub participants: Vec<Participant>,
    pub winners: Option<Winners>,
    pub is_visible: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub finalized_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
}

impl Tournament {
    pub fn is_participant(&self, user_id: UserId) -> bool {
        self.participants.iter().any(|p| p.user_id == user_id)
    }

    pub fn participant(&self, user_id: UserId) -> Option<&Participant> {
        self.participants.iter().find(|p| p.user_id == user_id)
    }

    pub fn remaining_slots(&self) -> u32 {
        self.max_slots.saturating_sub(self.joined_count)
    }

    /// Stored credentials, if both halves are present
    pub fn credentials(&self) -> Option<RoomCredentials> {
        match (&self.room_id, &self.room_password) {
            (Some(room_id), Some(room_password)) => Some(RoomCredentials {
                room_id: room_id.clone(),
                room_password: room_password.clone(),
            }),
            _ => None,
        }
    }
}

/// Player-facing projection: no credentials, no participant identities
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TournamentSummary {
    pub id: TournamentId,
    pub title: String,
    pub format: MatchFormat,
    pub game_type: GameType,
    pub map: GameMap,
    pub entry_fee: i64,
    pub prize_pool: i64,
    pub prize_distribution: PrizeDistribution,
    pub max_slots: u32,
    pub joined_count: u32,
    pub start_time: DateTime<Utc>,
    pub auto_release_time: Option<DateTime<Utc>>,
    pub status: TournamentStatus,
    pub has_room: bool,
}

impl From<&Tournament> for TournamentSummary {
    fn from(t: &Tournament) -> Self {
        Self {
            id: t.id,
            title: t.title.clone(),
            format: t.format,
            game_type: t.game_type,
            map: t.map,
            entry_fee: t.entry_fee,
            prize_pool: t.prize_pool,
            prize_distribution: t.prize_distribution,
            max_slots: t.max_slots,
            joined_count: t.joined_count,
            start_time: t.start_time,
            auto_release_time: t.auto_release_time,
            status: t.status,
            has_room: t.credentials().is_some(),
        }
    }
}

/// Admin request to create a tournament
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTournament {
    pub title: String,
    pub format: MatchFormat,
    pub game_type: GameType,
    pub map: GameMap,
    pub entry_fee: i64,
    pub max_slots: i64,
    pub start_time: DateTime<Utc>,
    pub prize_distribution: PrizeDistribution,
    /// Optional client-computed total, must equal the distribution sum
    #[serde(default)]
    pub prize_pool: Option<i64>,
}

/// Validated creation input ready to persist
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TournamentDraft {
    pub title: String,
    pub format: MatchFormat,
    pub game_type: GameType,
    pub map: GameMap,
    pub entry_fee: i64,
    pub max_slots: u32,
    pub start_time: DateTime<Utc>,
    pub prize_distribution: PrizeDistribution,
    pub prize_pool: i64,
}

impl TournamentDraft {
    /// Materialize an Open tournament with no participants
    pub fn into_tournament(self, id: TournamentId, now: DateTime<Utc>) -> Tournament {
        Tournament {
            id,
            title: self.title,
            format: self.format,
            game_type: self.game_type,
            map: self.map,
            entry_fee: self.entry_fee,
            prize_pool: self.prize_pool,
            prize_distribution: self.prize_distribution,
            max_slots: self.max_slots,
            joined_count: 0,
            start_time: self.start_time,
            auto_release_time: None,
            status: TournamentStatus::Open,
            room_id: None,
            room_password: None,
            participants: Vec::new(),
            winners: None,
            is_visible: true,
            created_at: now,
            updated_at: now,
            finalized_at: None,
            cancelled_at: None,
        }
    }
}

/// In-game identity supplied when joining
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinDetails {
    pub in_game_name: Option<String>,
    pub uid: Option<String>,
}

/// Admin request to set or reset room credentials
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialUpdate {
    #[serde(rename = "roomID")]
    pub room_id: String,
    #[serde(rename = "roomPassword")]
    pub room_password: String,
    #[serde(default)]
    pub auto_release: bool,
    #[serde(default)]
    pub release_time: Option<DateTime<Utc>>,
}

/// What a credential update did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum CredentialEvent {
    /// Open tournament went Live with the new room
    Published,
    /// Credentials stored, release deferred; tournament stays Open
    Scheduled {
        #[serde(rename = "releaseAt")]
        release_at: DateTime<Utc>,
    },
    /// Room replaced on an already Live tournament
    RoomReset,
}

/// Prize credited to a winner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payout {
    pub user_id: UserId,
    pub rank: Rank,
    pub amount: i64,
}

/// Tournament promoted to Live once its scheduled release came due
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledRelease {
    pub tournament_id: TournamentId,
    pub participants: Vec<UserId>,
}

/// Entry fee returned to a participant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Refund {
    pub user_id: UserId,
    pub amount: i64,
}

/// Result of a finalize
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settlement {
    pub tournament: Tournament,
    pub payouts: Vec<Payout>,
}

impl Settlement {
    pub fn total_paid(&self) -> i64 {
        self.payouts.iter().map(|p| p.amount).sum()
    }
}

/// Result of a cancel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cancellation {
    pub tournament: Tournament,
    pub refunds: Vec<Refund>,
}

impl Cancellation {
    pub fn total_refunded(&self) -> i64 {
        self.refunds.iter().map(|r| r.amount).sum()
    }
}

/// Result of a forced status write
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusOverride {
    pub tournament: Tournament,
    pub from: TournamentStatus,
    pub to: TournamentStatus,
    pub actor_id: UserId,
}

/// Audit trail row for administrative overrides
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditRecord {
    pub id: i64,
    pub tournament_id: TournamentId,
    pub actor_id: UserId,
    pub action: String,
    pub from_status: TournamentStatus,
    pub to_status: TournamentStatus,
    pub created_at: DateTime<Utc>,
}

/// Credentials handed to a participant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevealedCredentials {
    #[serde(flatten)]
    pub credentials: RoomCredentials,
    pub released_at: DateTime<Utc>,
}

/// Listing filter
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListFilter {
    pub include_hidden: bool,
    pub status: Option<TournamentStatus>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prize_total() {
        let prizes = PrizeDistribution::new(100, 50, 20);
        assert_eq!(prizes.total(), Some(170));
    }

    #[test]
    fn test_prize_total_overflow() {
        let prizes = PrizeDistribution::new(i64::MAX, 1, 0);
        assert_eq!(prizes.total(), None);
    }

    #[test]
    fn test_amount_for_rank() {
        let prizes = PrizeDistribution::new(100, 50, 20);
        assert_eq!(prizes.amount_for(Rank::First), 100);
        assert_eq!(prizes.amount_for(Rank::Second), 50);
        assert_eq!(prizes.amount_for(Rank::Third), 20);
    }

    #[test]
    fn test_rank_positions() {
        for rank in Rank::ALL {
            assert_eq!(Rank::from_position(rank.position()), Some(rank));
        }
        assert_eq!(Rank::from_position(0), None);
        assert_eq!(Rank::from_position(4), None);
    }

    #[test]
    fn test_winners_ranked_skips_empty() {
        let winners = Winners {
            rank1: 1,
            rank2: None,
            rank3: Some(3),
        };
        assert_eq!(winners.ranked(), vec![(Rank::First, 1), (Rank::Third, 3)]);
    }

    #[test]
    fn test_status_parse_and_display() {
        for status in [
            TournamentStatus::Open,
            TournamentStatus::Live,
            TournamentStatus::Completed,
            TournamentStatus::Cancelled,
        ] {
            assert_eq!(status.to_string().parse::<TournamentStatus>(), Ok(status));
        }
        assert!(TournamentStatus::Completed.is_terminal());
        assert!(!TournamentStatus::Live.is_terminal());
    }

    #[test]
    fn test_game_type_wire_names() {
        assert_eq!(
            serde_json::to_value(GameType::BattleRoyale).unwrap(),
            serde_json::json!("BR")
        );
        assert_eq!("cs".parse::<GameType>(), Ok(GameType::ClashSquad));
    }

    #[test]
    fn test_map_parse_is_case_insensitive() {
        assert_eq!("NEXTERRA".parse::<GameMap>(), Ok(GameMap::NeXTerra));
        assert!("Erangel".parse::<GameMap>().is_err());
    }

    #[test]
    fn test_credential_update_wire_names() {
        let update: CredentialUpdate = serde_json::from_value(serde_json::json!({
            "roomID": "123456",
            "roomPassword": "pw"
        }))
        .unwrap();
        assert_eq!(update.room_id, "123456");
        assert!(!update.auto_release);
        assert!(update.release_time.is_none());
    }
}
