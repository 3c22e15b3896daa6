//! Streakbot Core — shared types, message bus, configuration, and helpers.
//!
//! This crate contains:
//! - **bus**: Inbound/outbound message types and the async `MessageBus`
//! - **config**: Typed config schema, JSON loader, env var overrides
//! - **types**: Log entries and the log report handed to channels
//! - **utils**: Data directory and path helpers

pub mod bus;
pub mod config;
pub mod types;
pub mod utils;

pub use bus::{InboundMessage, MessageBus, OutboundMessage};
pub use types::{LogEntry, LogReport, ReportEntry};
