//! Tournament events and the notification sink.

use super::models::{Payout, Refund, TournamentId, TournamentStatus};
use crate::auth::UserId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

/// Something players or operators may want to hear about
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum TournamentEvent {
    #[serde(rename_all = "camelCase")]
    Created {
        tournament_id: TournamentId,
        title: String,
    },
    #[serde(rename_all = "camelCase")]
    PlayerJoined {
        tournament_id: TournamentId,
        user_id: UserId,
        joined_count: u32,
        max_slots: u32,
    },
    #[serde(rename_all = "camelCase")]
    CredentialsPublished {
        tournament_id: TournamentId,
        participants: Vec<UserId>,
    },
    #[serde(rename_all = "camelCase")]
    CredentialsScheduled {
        tournament_id: TournamentId,
        release_at: DateTime<Utc>,
    },
    #[serde(rename_all = "camelCase")]
    RoomReset {
        tournament_id: TournamentId,
        participants: Vec<UserId>,
    },
    #[serde(rename_all = "camelCase")]
    Finalized {
        tournament_id: TournamentId,
        payouts: Vec<Payout>,
    },
    #[serde(rename_all = "camelCase")]
    Cancelled {
        tournament_id: TournamentId,
        refunds: Vec<Refund>,
    },
    #[serde(rename_all = "camelCase")]
    StatusOverridden {
        tournament_id: TournamentId,
        actor_id: UserId,
        from: TournamentStatus,
        to: TournamentStatus,
    },
}

impl TournamentEvent {
    pub fn tournament_id(&self) -> TournamentId {
        match self {
            TournamentEvent::Created { tournament_id, .. }
            | TournamentEvent::PlayerJoined { tournament_id, .. }
            | TournamentEvent::CredentialsPublished { tournament_id, .. }
            | TournamentEvent::CredentialsScheduled { tournament_id, .. }
            | TournamentEvent::RoomReset { tournament_id, .. }
            | TournamentEvent::Finalized { tournament_id, .. }
            | TournamentEvent::Cancelled { tournament_id, .. }
            | TournamentEvent::StatusOverridden { tournament_id, .. } => *tournament_id,
        }
    }
}

/// Event sink
///
/// Delivery (push, email, websocket fan-out) is the implementor's concern;
/// `notify` must not block.
pub trait Notifier: Send + Sync {
    fn notify(&self, event: TournamentEvent);
}

/// Writes events to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, event: TournamentEvent) {
        match serde_json::to_string(&event) {
            Ok(json) => log::info!("tournament event: {}", json),
            Err(e) => log::warn!("failed to encode tournament event: {}", e),
        }
    }
}

/// Keeps events in memory
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    events: Mutex<Vec<TournamentEvent>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything received so far
    pub fn events(&self) -> Vec<TournamentEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, event: TournamentEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}
