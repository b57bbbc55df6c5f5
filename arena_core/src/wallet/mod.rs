//! Wallet module providing coin balances with an idempotent ledger.
//!
//! This module implements:
//! - A journal entry for every balance change
//! - Idempotency keys to prevent duplicate transactions
//! - Conditional debits that never overdraw a wallet
//! - Transaction-scoped helpers so tournament operations can debit and
//!   credit atomically with their own writes
//!
//! ## Example
//!
//! ```no_run
//! use arena_core::wallet::{EntryDetails, WalletManager};
//! use arena_core::db::Database;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::new(&Default::default()).await?;
//!     let wallet = WalletManager::new(Arc::new(db.pool().clone()));
//!
//!     let balance = wallet
//!         .credit(
//!             1,
//!             500,
//!             EntryDetails::Adjustment { reason: "welcome bonus".to_string() },
//!             "welcome_1".to_string(),
//!         )
//!         .await?;
//!     println!("New balance: {}", balance);
//!
//!     Ok(())
//! }
//! ```

pub mod errors;
pub mod manager;
pub mod models;

pub use errors::{WalletError, WalletResult};
pub use manager::WalletManager;
pub use models::{
    DepositDetails, EntryDetails, EntryDirection, EntryType, Wallet, WalletEntry,
    WithdrawalDetails,
};
