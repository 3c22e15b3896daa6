//! Reply collector — hands one follow-up message to whoever is waiting for it.
//!
//! After `$logday` the loop registers a waiter for the same
//! `(channel, chat_id, sender_id)`; the next non-command message from that
//! sender in that chat resolves it. Each waiter resolves exactly once: with
//! the reply, on timeout, or when a newer `$logday` replaces it.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{oneshot, Mutex};
use tracing::debug;

use streakbot_core::bus::types::InboundMessage;

/// Identifies whose reply a waiter expects.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ReplyKey {
    pub channel: String,
    pub chat_id: String,
    pub sender_id: String,
}

impl ReplyKey {
    /// The key a message from this sender in this chat would resolve.
    pub fn of(msg: &InboundMessage) -> Self {
        Self {
            channel: msg.channel.clone(),
            chat_id: msg.chat_id.clone(),
            sender_id: msg.sender_id.clone(),
        }
    }
}

/// How a pending reply ended.
#[derive(Debug)]
pub enum CollectOutcome {
    Reply(InboundMessage),
    TimedOut,
    /// A newer registration for the same key took over.
    Superseded,
}

struct Waiter {
    id: u64,
    tx: oneshot::Sender<CollectOutcome>,
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    waiters: HashMap<ReplyKey, Waiter>,
}

/// Shared table of pending replies.
#[derive(Clone, Default)]
pub struct ReplyCollector {
    inner: Arc<Mutex<Registry>>,
}

impl ReplyCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start waiting for the next message matching `key`.
    ///
    /// An existing waiter for the same key resolves as `Superseded`.
    pub async fn register(&self, key: ReplyKey, timeout: Duration) -> PendingReply {
        let (tx, rx) = oneshot::channel();
        let mut registry = self.inner.lock().await;
        registry.next_id += 1;
        let id = registry.next_id;

        if let Some(old) = registry.waiters.insert(key.clone(), Waiter { id, tx }) {
            debug!(sender_id = %key.sender_id, "pending reply superseded");
            let _ = old.tx.send(CollectOutcome::Superseded);
        }

        PendingReply {
            collector: self.clone(),
            key,
            id,
            timeout,
            rx,
        }
    }

    /// Offer a message to a matching waiter.
    ///
    /// Returns the message back when nobody is waiting for it.
    pub async fn offer(&self, msg: InboundMessage) -> Option<InboundMessage> {
        let key = ReplyKey::of(&msg);
        let waiter = self.inner.lock().await.waiters.remove(&key);

        match waiter {
            Some(waiter) => match waiter.tx.send(CollectOutcome::Reply(msg)) {
                Ok(()) => None,
                Err(CollectOutcome::Reply(msg)) => Some(msg),
                Err(_) => None,
            },
            None => Some(msg),
        }
    }

    /// Number of waiters still pending.
    pub async fn pending(&self) -> usize {
        self.inner.lock().await.waiters.len()
    }

    /// Drop the waiter for `key` if it is still the one registered as `id`.
    async fn withdraw(&self, key: &ReplyKey, id: u64) {
        let mut registry = self.inner.lock().await;
        if registry.waiters.get(key).is_some_and(|w| w.id == id) {
            registry.waiters.remove(key);
        }
    }
}

/// A registered wait for one reply.
pub struct PendingReply {
    collector: ReplyCollector,
    key: ReplyKey,
    id: u64,
    timeout: Duration,
    rx: oneshot::Receiver<CollectOutcome>,
}

impl PendingReply {
    pub fn key(&self) -> &ReplyKey {
        &self.key
    }

    /// Wait until the reply arrives, the timeout passes, or a newer
    /// registration replaces this one.
    pub async fn wait(mut self) -> CollectOutcome {
        let waited = tokio::time::timeout(self.timeout, &mut self.rx).await;
        match waited {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(_)) => CollectOutcome::Superseded,
            Err(_) => {
                self.collector.withdraw(&self.key, self.id).await;
                // A reply may have landed between the deadline and the withdrawal.
                match self.rx.try_recv() {
                    Ok(outcome) => outcome,
                    Err(_) => CollectOutcome::TimedOut,
                }
            }
        }
    }
}
