//! Wallet data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Tournament ID as referenced from ledger entries
pub type LedgerTournamentId = i64;

/// Wallet model
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Wallet {
    pub user_id: i64,
    pub balance: i64,
    pub currency: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Wallet entry model (ledger journal)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletEntry {
    pub id: i64,
    pub user_id: i64,
    pub tournament_id: Option<LedgerTournamentId>,
    /// Signed delta: negative for debits
    pub amount: i64,
    pub balance_after: i64,
    pub direction: EntryDirection,
    pub entry_type: EntryType,
    pub details: EntryDetails,
    pub idempotency_key: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Entry direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryDirection {
    Debit,
    Credit,
}

impl std::fmt::Display for EntryDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntryDirection::Debit => write!(f, "debit"),
            EntryDirection::Credit => write!(f, "credit"),
        }
    }
}

impl std::str::FromStr for EntryDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "debit" => Ok(EntryDirection::Debit),
            "credit" => Ok(EntryDirection::Credit),
            other => Err(format!("unknown entry direction: {other}")),
        }
    }
}

/// Entry type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryType {
    EntryFee,
    Prize,
    Refund,
    Deposit,
    Withdrawal,
    AdminAdjust,
}

impl std::fmt::Display for EntryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntryType::EntryFee => write!(f, "entry_fee"),
            EntryType::Prize => write!(f, "prize"),
            EntryType::Refund => write!(f, "refund"),
            EntryType::Deposit => write!(f, "deposit"),
            EntryType::Withdrawal => write!(f, "withdrawal"),
            EntryType::AdminAdjust => write!(f, "admin_adjust"),
        }
    }
}

impl std::str::FromStr for EntryType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "entry_fee" => Ok(EntryType::EntryFee),
            "prize" => Ok(EntryType::Prize),
            "refund" => Ok(EntryType::Refund),
            "deposit" => Ok(EntryType::Deposit),
            "withdrawal" => Ok(EntryType::Withdrawal),
            "admin_adjust" => Ok(EntryType::AdminAdjust),
            other => Err(format!("unknown entry type: {other}")),
        }
    }
}

/// Typed payload describing why a ledger entry exists
///
/// Stored as JSON next to each entry; never passed around untyped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EntryDetails {
    TournamentEntry {
        #[serde(rename = "tournamentId")]
        tournament_id: LedgerTournamentId,
    },
    TournamentPrize {
        #[serde(rename = "tournamentId")]
        tournament_id: LedgerTournamentId,
        rank: u8,
    },
    TournamentRefund {
        #[serde(rename = "tournamentId")]
        tournament_id: LedgerTournamentId,
    },
    Deposit(DepositDetails),
    Withdrawal(WithdrawalDetails),
    Adjustment { reason: String },
}

impl EntryDetails {
    /// Ledger entry type implied by these details
    pub fn entry_type(&self) -> EntryType {
        match self {
            EntryDetails::TournamentEntry { .. } => EntryType::EntryFee,
            EntryDetails::TournamentPrize { .. } => EntryType::Prize,
            EntryDetails::TournamentRefund { .. } => EntryType::Refund,
            EntryDetails::Deposit(_) => EntryType::Deposit,
            EntryDetails::Withdrawal(_) => EntryType::Withdrawal,
            EntryDetails::Adjustment { .. } => EntryType::AdminAdjust,
        }
    }

    /// Tournament the entry belongs to, if any
    pub fn tournament_id(&self) -> Option<LedgerTournamentId> {
        match self {
            EntryDetails::TournamentEntry { tournament_id }
            | EntryDetails::TournamentPrize { tournament_id, .. }
            | EntryDetails::TournamentRefund { tournament_id } => Some(*tournament_id),
            _ => None,
        }
    }

    /// Human readable description stored with the entry
    pub fn describe(&self) -> String {
        match self {
            EntryDetails::TournamentEntry { tournament_id } => {
                format!("Entry fee for tournament {tournament_id}")
            }
            EntryDetails::TournamentPrize {
                tournament_id,
                rank,
            } => format!("Rank {rank} prize for tournament {tournament_id}"),
            EntryDetails::TournamentRefund { tournament_id } => {
                format!("Refund for cancelled tournament {tournament_id}")
            }
            EntryDetails::Deposit(d) => format!("Deposit from {}", d.sender_name),
            EntryDetails::Withdrawal(w) => format!("Withdrawal to {}", w.account_title),
            EntryDetails::Adjustment { reason } => format!("Adjustment: {reason}"),
        }
    }
}

/// Sender information attached to a deposit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepositDetails {
    pub sender_name: String,
    pub sender_number: String,
}

/// Payout account attached to a withdrawal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawalDetails {
    pub account_title: String,
    pub account_number: String,
}
