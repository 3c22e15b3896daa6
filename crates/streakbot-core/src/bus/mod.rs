//! Message bus — channels publish inbound chat messages, the journal loop
//! publishes outbound replies.

pub mod queue;
pub mod types;

pub use queue::MessageBus;
pub use types::{InboundMessage, OutboundMessage};
