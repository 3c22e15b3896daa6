//! Streakbot Channels — chat platform integrations.
//!
//! This crate provides:
//! - **base**: The `Channel` trait that all channel implementations must satisfy
//! - **manager**: `ChannelManager` — lifecycle orchestration and reply routing
//! - **formatting**: report rendering and message splitting helpers
//!
//! Platform channels are feature-gated: `discord` and `telegram`.

pub mod base;
pub mod formatting;
pub mod manager;

#[cfg(feature = "telegram")]
pub mod telegram;

#[cfg(feature = "discord")]
pub mod discord;

pub use base::Channel;
pub use manager::ChannelManager;
