//! # Arena Core
//!
//! Tournament lifecycle and prize settlement engine for an esports arena.
//!
//! Admins create tournaments, publish room credentials, finalize winners and
//! cancel events. Players join by paying an entry fee from their coin wallet
//! and retrieve the room credentials once the release gate opens.
//!
//! ## Architecture
//!
//! A tournament moves through an explicit state machine:
//!
//! - **Open**: accepting players, credentials may be scheduled
//! - **Live**: credentials published, match in progress
//! - **Completed**: winners settled (terminal)
//! - **Cancelled**: entry fees refunded (terminal)
//!
//! Every mutating operation is checked by the pure functions in
//! [`tournament::lifecycle`] against a locked snapshot and applied atomically
//! together with its wallet deltas by a [`db::TournamentRepository`].
//!
//! ## Core Modules
//!
//! - [`tournament`]: models, lifecycle engine, credential gate, participant search
//! - [`wallet`]: coin ledger with idempotent entries
//! - [`db`]: connection pool, repository traits, timeouts
//! - [`auth`]: bearer token verification and permission gating
//! - [`memory`]: in-process backend implementing every repository trait
//!
//! ## Example
//!
//! ```
//! use arena_core::memory::MemoryBackend;
//! use arena_core::tournament::TournamentManager;
//! use std::sync::Arc;
//!
//! let backend = Arc::new(MemoryBackend::new());
//! let manager = TournamentManager::with_backend(backend);
//! # let _ = manager;
//! ```

pub mod auth;
pub mod clock;
pub mod db;
pub mod memory;
pub mod tournament;
pub mod wallet;

pub use clock::{Clock, ManualClock, SystemClock};
pub use tournament::{TournamentError, TournamentManager, TournamentResult};
