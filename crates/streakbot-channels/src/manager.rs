//! Channel Manager — orchestrates channel lifecycle and reply routing.
//!
//! Responsibilities:
//! - Register configured channels
//! - Start/stop all channels concurrently via `tokio::spawn`
//! - Dispatch outbound replies from the bus to the channel they belong to

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use streakbot_core::bus::queue::MessageBus;
use streakbot_core::bus::types::OutboundMessage;

use crate::base::Channel;

// ─────────────────────────────────────────────
// ChannelManager
// ─────────────────────────────────────────────

/// Manages the lifecycle and reply routing for all chat channels.
///
/// Channels are registered with `register()`, started concurrently with
/// `start_all()`, and stopped with `stop_all()`. An outbound dispatcher
/// task reads replies from the message bus and hands each one to the
/// channel named in `OutboundMessage.channel`.
pub struct ChannelManager {
    /// Registered channels, keyed by name.
    channels: HashMap<String, Arc<dyn Channel>>,
    /// Message bus for outbound message consumption.
    bus: Arc<MessageBus>,
    /// Shutdown flag. A watch keeps the value, so a shutdown requested
    /// before `start_all()` starts waiting is not lost.
    shutdown: watch::Sender<bool>,
}

impl ChannelManager {
    /// Create a new channel manager.
    pub fn new(bus: Arc<MessageBus>) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            channels: HashMap::new(),
            bus,
            shutdown,
        }
    }

    /// Register a channel. Overwrites any previous channel with the same name.
    pub fn register(&mut self, channel: Arc<dyn Channel>) {
        let name = channel.name().to_string();
        info!(channel = %name, "registered channel");
        self.channels.insert(name, channel);
    }

    /// Names of all registered channels, sorted.
    pub fn channel_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.channels.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Start all channels + the outbound dispatcher, then wait for shutdown.
    ///
    /// Each channel's `start()` runs in its own task; a channel that fails
    /// is logged and does not take the others down.
    pub async fn start_all(&self) -> Result<()> {
        if self.channels.is_empty() {
            warn!("no channels registered, nothing to start");
            return Ok(());
        }

        info!(
            channels = ?self.channel_names(),
            "starting {} channel(s)",
            self.channels.len()
        );

        let mut handles: Vec<JoinHandle<()>> = Vec::new();

        for (name, channel) in &self.channels {
            let ch = channel.clone();
            let ch_name = name.clone();

            handles.push(tokio::spawn(async move {
                info!(channel = %ch_name, "channel starting");
                if let Err(e) = ch.start().await {
                    error!(channel = %ch_name, error = %e, "channel start failed");
                }
                info!(channel = %ch_name, "channel stopped");
            }));
        }

        handles.push(tokio::spawn(Self::dispatch_outbound(
            self.bus.clone(),
            self.channels.clone(),
            self.shutdown.subscribe(),
        )));

        wait_for_shutdown(self.shutdown.subscribe()).await;

        info!("channel manager shutting down");
        for handle in handles {
            handle.abort();
        }
        Ok(())
    }

    /// Stop all channels and the outbound dispatcher.
    pub async fn stop_all(&self) {
        info!("stopping all channels");
        self.shutdown.send_replace(true);

        for (name, channel) in &self.channels {
            debug!(channel = %name, "stopping channel");
            if let Err(e) = channel.stop().await {
                error!(channel = %name, error = %e, "channel stop failed");
            }
        }

        info!("all channels stopped");
    }

    /// Outbound message dispatcher — routes journal replies to the correct channel.
    async fn dispatch_outbound(
        bus: Arc<MessageBus>,
        channels: HashMap<String, Arc<dyn Channel>>,
        shutdown: watch::Receiver<bool>,
    ) {
        info!("outbound dispatcher started");

        loop {
            tokio::select! {
                msg = bus.consume_outbound() => {
                    match msg {
                        Some(outbound) => Self::deliver(&channels, &outbound).await,
                        None => {
                            info!("outbound bus closed, dispatcher exiting");
                            break;
                        }
                    }
                }
                _ = wait_for_shutdown(shutdown.clone()) => {
                    info!("dispatcher received shutdown signal");
                    break;
                }
            }
        }
    }

    async fn deliver(channels: &HashMap<String, Arc<dyn Channel>>, outbound: &OutboundMessage) {
        debug!(
            channel = %outbound.channel,
            chat_id = %outbound.chat_id,
            content_len = outbound.content.len(),
            has_report = outbound.report.is_some(),
            "dispatching outbound message"
        );

        match channels.get(&outbound.channel) {
            Some(channel) => {
                if let Err(e) = channel.send(outbound).await {
                    error!(
                        channel = %outbound.channel,
                        chat_id = %outbound.chat_id,
                        error = %e,
                        "failed to send outbound message"
                    );
                }
            }
            None => warn!(
                channel = %outbound.channel,
                "no channel registered for outbound message"
            ),
        }
    }
}

/// Resolve once the shutdown flag is set, or its sender is gone.
///
/// The borrow guard from `wait_for` is dropped before returning, so futures
/// awaiting this stay `Send`.
async fn wait_for_shutdown(mut shutdown: watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|stop| *stop).await;
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    /// Mock channel recording what it was asked to send.
    struct MockChannel {
        channel_name: String,
        started: Arc<AtomicBool>,
        stopped: Arc<AtomicBool>,
        sent: Arc<tokio::sync::Mutex<Vec<OutboundMessage>>>,
    }

    impl MockChannel {
        fn new(name: &str) -> Self {
            Self {
                channel_name: name.into(),
                started: Arc::new(AtomicBool::new(false)),
                stopped: Arc::new(AtomicBool::new(false)),
                sent: Arc::new(tokio::sync::Mutex::new(Vec::new())),
            }
        }
    }

    #[async_trait::async_trait]
    impl Channel for MockChannel {
        fn name(&self) -> &str {
            &self.channel_name
        }

        async fn start(&self) -> anyhow::Result<()> {
            self.started.store(true, Ordering::SeqCst);
            // Simulate a long-running listener
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(())
        }

        async fn stop(&self) -> anyhow::Result<()> {
            self.stopped.store(true, Ordering::SeqCst);
            Ok(())
        }

        async fn send(&self, msg: &OutboundMessage) -> anyhow::Result<()> {
            self.sent.lock().await.push(msg.clone());
            Ok(())
        }
    }

    #[test]
    fn test_new_manager_empty() {
        let mgr = ChannelManager::new(Arc::new(MessageBus::new(32)));
        assert!(mgr.is_empty());
        assert_eq!(mgr.len(), 0);
    }

    #[test]
    fn test_register_channels_sorted() {
        let mut mgr = ChannelManager::new(Arc::new(MessageBus::new(32)));

        mgr.register(Arc::new(MockChannel::new("telegram")));
        mgr.register(Arc::new(MockChannel::new("discord")));
        mgr.register(Arc::new(MockChannel::new("cli")));

        assert_eq!(mgr.len(), 3);
        assert_eq!(mgr.channel_names(), vec!["cli", "discord", "telegram"]);
    }

    #[test]
    fn test_register_overwrites() {
        let mut mgr = ChannelManager::new(Arc::new(MessageBus::new(32)));

        mgr.register(Arc::new(MockChannel::new("telegram")));
        mgr.register(Arc::new(MockChannel::new("telegram")));

        assert_eq!(mgr.len(), 1);
    }

    fn assert_send<T: Send>(_: &T) {}

    #[test]
    fn test_manager_futures_are_send() {
        let bus = Arc::new(MessageBus::new(32));
        let mgr = ChannelManager::new(bus.clone());
        assert_send(&mgr.start_all());

        let (_shutdown, rx) = watch::channel(false);
        assert_send(&ChannelManager::dispatch_outbound(bus, HashMap::new(), rx));
    }

    #[tokio::test]
    async fn test_start_all_empty() {
        let mgr = ChannelManager::new(Arc::new(MessageBus::new(32)));
        assert!(mgr.start_all().await.is_ok());
    }

    #[tokio::test]
    async fn test_start_all_returns_after_shutdown() {
        let mut mgr = ChannelManager::new(Arc::new(MessageBus::new(32)));
        let ch = Arc::new(MockChannel::new("discord"));
        let started = ch.started.clone();
        mgr.register(ch);
        let mgr = Arc::new(mgr);

        let runner = {
            let mgr = mgr.clone();
            tokio::spawn(async move { mgr.start_all().await })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(started.load(Ordering::SeqCst));

        mgr.stop_all().await;
        let result = tokio::time::timeout(Duration::from_secs(2), runner).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_shutdown_before_start_is_not_lost() {
        let mut mgr = ChannelManager::new(Arc::new(MessageBus::new(32)));
        mgr.register(Arc::new(MockChannel::new("discord")));

        mgr.stop_all().await;
        let result = tokio::time::timeout(Duration::from_secs(2), mgr.start_all()).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_stop_all() {
        let mut mgr = ChannelManager::new(Arc::new(MessageBus::new(32)));

        let ch = Arc::new(MockChannel::new("telegram"));
        let stopped = ch.stopped.clone();
        mgr.register(ch);

        mgr.stop_all().await;
        assert!(stopped.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_dispatch_outbound_routes_correctly() {
        let bus = Arc::new(MessageBus::new(32));

        let tg = Arc::new(MockChannel::new("telegram"));
        let dc = Arc::new(MockChannel::new("discord"));
        let tg_sent = tg.sent.clone();
        let dc_sent = dc.sent.clone();

        let mut channels: HashMap<String, Arc<dyn Channel>> = HashMap::new();
        channels.insert("telegram".into(), tg);
        channels.insert("discord".into(), dc);

        let (shutdown, rx) = watch::channel(false);
        let handle = tokio::spawn(ChannelManager::dispatch_outbound(bus.clone(), channels, rx));

        for (channel, chat, text) in [
            ("telegram", "chat_1", "What do you want to log for today?"),
            ("discord", "guild_1", "Success! Your log for 3/7/2024 has been saved!"),
            ("telegram", "chat_2", "Please input a number"),
        ] {
            bus.publish_outbound(OutboundMessage::new(channel, chat, text))
                .await
                .unwrap();
        }

        // Give dispatcher time to process
        tokio::time::sleep(Duration::from_millis(100)).await;
        shutdown.send_replace(true);
        let _ = handle.await;

        let tg_sent = tg_sent.lock().await;
        assert_eq!(tg_sent.len(), 2);
        assert_eq!(tg_sent[1].chat_id, "chat_2");
        assert_eq!(dc_sent.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn test_dispatch_outbound_unknown_channel() {
        let bus = Arc::new(MessageBus::new(32));
        let (shutdown, rx) = watch::channel(false);
        let handle = tokio::spawn(ChannelManager::dispatch_outbound(bus.clone(), HashMap::new(), rx));

        bus.publish_outbound(OutboundMessage::new("unknown", "chat", "msg"))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;
        shutdown.send_replace(true);

        // Should complete without panic
        assert!(handle.await.is_ok());
    }
}
