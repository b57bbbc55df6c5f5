//! HTTP surface of the esports arena: player and admin tournament APIs
//! over the `arena_core` engine.

pub mod api;
pub mod config;
pub mod logging;
pub mod metrics;
pub mod sweeper;
