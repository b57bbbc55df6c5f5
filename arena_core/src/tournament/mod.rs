//! Tournament module: lifecycle engine, credential gate and settlement.
//!
//! This module provides:
//! - Tournament creation and validation
//! - Paid joins debited atomically with the slot claim
//! - Room credential publishing, scheduled release and reset
//! - Prize settlement and entry fee refunds through the wallet ledger
//! - Participant search and winner selection for admins
//!
//! ## Example
//!
//! ```no_run
//! use arena_core::db::{Database, PgProfileRepository};
//! use arena_core::tournament::{PgTournamentStore, TournamentManager};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::new(&Default::default()).await?;
//!     let pool = Arc::new(db.pool().clone());
//!     let manager = TournamentManager::new(
//!         Arc::new(PgTournamentStore::new(pool.clone())),
//!         Arc::new(PgProfileRepository::new(pool)),
//!     );
//!
//!     for id in manager.promote_released().await? {
//!         println!("Released tournament {}", id);
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod errors;
pub mod events;
pub mod gate;
pub mod lifecycle;
pub mod manager;
pub mod models;
pub mod selection;
pub mod store;

pub use errors::{ErrorKind, LifecycleAction, TournamentError, TournamentResult};
pub use events::{LogNotifier, Notifier, RecordingNotifier, TournamentEvent};
pub use manager::TournamentManager;
pub use models::{
    AuditRecord, Cancellation, CredentialEvent, CredentialUpdate, GameMap, GameType, JoinDetails,
    ListFilter, MatchFormat, NewTournament, Participant, Payout, PrizeDistribution, Rank, Refund,
    RevealedCredentials, RoomCredentials, ScheduledRelease, Settlement, StatusOverride, Tournament, TournamentId,
    TournamentStatus, TournamentSummary, Winners,
};
pub use selection::{ParticipantView, WinnerSelection};
pub use store::PgTournamentStore;
