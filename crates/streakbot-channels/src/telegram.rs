//! Telegram channel — bot integration via `teloxide`.
//!
//! Features:
//! - Long polling (no webhook/public IP needed)
//! - Text messages and photo captions
//! - Slash commands (`/logday`, `/getlogs 5`) registered in the bot menu
//! - Log reports rendered as Telegram HTML
//! - Allow-list by user ID or username
//! - Message splitting for >4096 char replies

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use teloxide::prelude::*;
use teloxide::types::{BotCommand, MediaKind, MessageId, MessageKind, ParseMode, ReplyParameters, UpdateKind};
use tokio::sync::Notify;
use tracing::{debug, error, info, warn};

use streakbot_core::bus::queue::MessageBus;
use streakbot_core::bus::types::{InboundMessage, OutboundMessage};

use crate::base::Channel;
use crate::formatting::{html_to_plain, report_to_telegram_html, split_message, text_to_telegram_html};

/// Telegram message length limit.
const TELEGRAM_MAX_LEN: usize = 4096;

/// Long-polling timeout, in seconds.
const POLL_TIMEOUT_SECS: u32 = 30;

// ─────────────────────────────────────────────
// TelegramChannel
// ─────────────────────────────────────────────

/// Telegram bot channel using long polling via `teloxide`.
pub struct TelegramChannel {
    bot: Bot,
    /// Message bus for inbound messages.
    bus: Arc<MessageBus>,
    /// Allow-list of user IDs / usernames. Empty = allow everyone.
    allowed_users: Vec<String>,
    /// Shutdown signal.
    shutdown: Arc<Notify>,
}

impl TelegramChannel {
    /// Create a new Telegram channel.
    pub fn new(token: String, bus: Arc<MessageBus>, allowed_users: Vec<String>) -> Self {
        Self {
            bot: Bot::new(token),
            bus,
            allowed_users,
            shutdown: Arc::new(Notify::new()),
        }
    }

    /// Check if a sender is allowed, by numeric ID or username.
    fn is_allowed(&self, user_id: &str, username: &str) -> bool {
        if self.allowed_users.is_empty() {
            return true;
        }
        self.allowed_users.iter().any(|u| {
            u == user_id || (!username.is_empty() && u.trim_start_matches('@') == username)
        })
    }

    /// Handle an incoming Telegram update.
    async fn handle_update(&self, update: &Update) {
        let message = match &update.kind {
            UpdateKind::Message(msg) => msg,
            _ => return,
        };

        let Some(user) = message.from.as_ref() else {
            return;
        };
        if user.is_bot {
            return;
        }

        let user_id = user.id.0.to_string();
        let username = user.username.as_deref().unwrap_or("");
        let chat_id = message.chat.id.0.to_string();

        if !self.is_allowed(&user_id, username) {
            warn!(
                sender = %user_id,
                chat = %chat_id,
                "telegram message from unauthorized user, ignoring"
            );
            return;
        }

        let text = match &message.kind {
            MessageKind::Common(common) => match &common.media_kind {
                MediaKind::Text(text_msg) => text_msg.text.clone(),
                MediaKind::Photo(photo) => photo.caption.clone().unwrap_or_default(),
                _ => {
                    debug!("unsupported telegram media type, ignoring");
                    return;
                }
            },
            _ => return,
        };

        let display_name = if username.is_empty() {
            user.first_name.as_str()
        } else {
            username
        };

        let inbound = build_inbound(InboundParts {
            user_id: &user_id,
            display_name,
            chat_id: &chat_id,
            message_id: message.id.0,
            text: &text,
            date: message.date,
        });

        debug!(
            sender = %user_id,
            chat = %chat_id,
            content_len = inbound.content.len(),
            "telegram inbound message"
        );

        if let Err(e) = self.bus.publish_inbound(inbound).await {
            error!(error = %e, "failed to publish telegram message to bus");
        }
    }
}

/// Fields of a Telegram message the journal cares about.
struct InboundParts<'a> {
    user_id: &'a str,
    display_name: &'a str,
    chat_id: &'a str,
    message_id: i32,
    text: &'a str,
    date: DateTime<Utc>,
}

/// Build the bus message. The numeric user id is the journal user id so a
/// username change keeps the history.
fn build_inbound(parts: InboundParts<'_>) -> InboundMessage {
    let mut inbound = InboundMessage::new("telegram", parts.user_id, parts.chat_id, parts.text)
        .with_timestamp(parts.date);
    inbound
        .metadata
        .insert("username".into(), parts.display_name.to_string());
    inbound
        .metadata
        .insert("message_id".into(), parts.message_id.to_string());
    inbound
}

#[async_trait]
impl Channel for TelegramChannel {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn start(&self) -> anyhow::Result<()> {
        info!("starting telegram channel (long polling)");

        let commands = vec![
            BotCommand::new("logday", "Log what you did today"),
            BotCommand::new("getlogs", "Show your logs and current streak"),
            BotCommand::new("help", "Show available commands"),
        ];
        if let Err(e) = self.bot.set_my_commands(commands).await {
            warn!(error = %e, "failed to set bot commands menu");
        }

        info!("telegram bot connected, polling for updates");

        // Manual polling loop so updates go straight onto the bus
        let mut offset: i32 = 0;

        loop {
            tokio::select! {
                updates = self.bot.get_updates().offset(offset).timeout(POLL_TIMEOUT_SECS).send() => {
                    match updates {
                        Ok(updates) => {
                            for update in &updates {
                                offset = (update.id.0 as i32).wrapping_add(1);
                                self.handle_update(update).await;
                            }
                        }
                        Err(e) => {
                            error!(error = %e, "telegram polling error");
                            tokio::time::sleep(tokio::time::Duration::from_secs(5)).await;
                        }
                    }
                }
                _ = self.shutdown.notified() => {
                    info!("telegram channel shutting down");
                    break;
                }
            }
        }

        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        info!("stopping telegram channel");
        self.shutdown.notify_waiters();
        Ok(())
    }

    async fn send(&self, msg: &OutboundMessage) -> anyhow::Result<()> {
        let chat_id: i64 = msg
            .chat_id
            .parse()
            .map_err(|_| anyhow::anyhow!("invalid telegram chat_id: {}", msg.chat_id))?;
        let chat_id = ChatId(chat_id);
        let reply_to = msg
            .reply_to
            .as_deref()
            .and_then(|id| id.parse::<i32>().ok())
            .map(MessageId);

        let html = match &msg.report {
            Some(report) => report_to_telegram_html(report),
            None => text_to_telegram_html(&msg.content),
        };

        let chunks = split_message(&html, TELEGRAM_MAX_LEN);
        for (i, chunk) in chunks.iter().enumerate() {
            let mut request = self.bot.send_message(chat_id, chunk).parse_mode(ParseMode::Html);
            // Only the first chunk is a reply
            if let (0, Some(id)) = (i, reply_to) {
                request = request.reply_parameters(ReplyParameters::new(id).allow_sending_without_reply());
            }

            if let Err(e) = request.await {
                debug!(error = %e, chunk = i, "HTML send failed, retrying as plain text");
                for plain in split_message(&plain_fallback(&msg.content, &chunks, i), TELEGRAM_MAX_LEN) {
                    self.bot.send_message(chat_id, plain).await?;
                }
                return Ok(());
            }
        }

        debug!(chat_id = %msg.chat_id, chunks = chunks.len(), "telegram message sent");
        Ok(())
    }
}

/// Plain text to send after HTML chunk `failed_at` was rejected.
///
/// Nothing has been delivered when the first chunk fails, so the whole plain
/// content goes out. Otherwise only the undelivered chunks are resent.
fn plain_fallback(content: &str, html_chunks: &[String], failed_at: usize) -> String {
    if failed_at == 0 {
        return content.to_string();
    }
    html_to_plain(&html_chunks[failed_at..].join("\n"))
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
