//! Background task promoting tournaments whose scheduled release is due.
//!
//! Reads already promote lazily; the sweeper makes listings and joins see
//! the Live status without waiting for someone to look.

use arena_core::tournament::TournamentManager;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};

/// Spawn the release sweeper
///
/// The task exits once `shutdown` flips to `true` or its sender is dropped.
pub fn spawn(
    manager: Arc<TournamentManager>,
    every: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        log::info!("Release sweeper running every {:?}", every);
        let mut ticker = interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    sweep_once(&manager).await;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        log::info!("Release sweeper stopped");
    })
}

/// Run one promotion pass, returning how many tournaments went Live
pub async fn sweep_once(manager: &TournamentManager) -> usize {
    match manager.promote_released().await {
        Ok(promoted) => {
            if !promoted.is_empty() {
                log::info!("Sweeper released {} tournament(s)", promoted.len());
            }
            promoted.len()
        }
        Err(e) => {
            log::error!("Release sweep failed: {}", e);
            0
        }
    }
}
