//! Discord channel — raw Gateway WebSocket + REST API.
//!
//! Uses the Discord Gateway (WebSocket) for receiving messages and the REST
//! API for sending. No Discord library required.
//!
//! Features:
//! - Gateway v10 WebSocket with heartbeat, zombie detection and resume
//! - Allow-list by Discord user ID or username
//! - Log reports rendered as embeds
//! - Message chunking for >2000 char replies
//! - Rate-limit retry (HTTP 429)

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::sync::{mpsc, Mutex, Notify};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::{debug, error, info, warn};

use streakbot_core::bus::queue::MessageBus;
use streakbot_core::bus::types::{InboundMessage, OutboundMessage};
use streakbot_core::types::LogReport;
use streakbot_core::utils::truncate_string;

use crate::base::Channel;
use crate::formatting::split_message;

// ─────────────────────────────────────────────
// Constants
// ─────────────────────────────────────────────

/// Discord REST API base URL.
const DISCORD_API_BASE: &str = "https://discord.com/api/v10";

/// Discord CDN, for avatar URLs.
const DISCORD_CDN_BASE: &str = "https://cdn.discordapp.com";

/// Default Gateway WebSocket URL.
const DEFAULT_GATEWAY_URL: &str = "wss://gateway.discord.gg/?v=10&encoding=json";

/// Discord message length limit.
const DISCORD_MAX_LEN: usize = 2000;

/// Discord allows 25 embed fields; two are taken by the totals.
const MAX_ENTRY_FIELDS: usize = 23;

/// Embed field value length limit.
const MAX_FIELD_VALUE_LEN: usize = 1024;

/// Discord limit on the combined text of one embed.
const MAX_EMBED_CHARS: usize = 6000;

/// Report embed color.
const EMBED_COLOR: u32 = 0x0099ff;

/// Default intents: GUILDS(1) + GUILD_MESSAGES(512) + DMs(4096) + MESSAGE_CONTENT(32768).
const DEFAULT_INTENTS: u64 = 1 + 512 + 4096 + 32768;

/// Attempts per REST call before giving up (429s are not counted).
const MAX_SEND_ATTEMPTS: u32 = 3;

// Gateway opcodes
const OP_DISPATCH: u64 = 0;
const OP_HEARTBEAT: u64 = 1;
const OP_IDENTIFY: u64 = 2;
const OP_RESUME: u64 = 6;
const OP_RECONNECT: u64 = 7;
const OP_INVALID_SESSION: u64 = 9;
const OP_HELLO: u64 = 10;
const OP_HEARTBEAT_ACK: u64 = 11;

// ─────────────────────────────────────────────
// DiscordChannel
// ─────────────────────────────────────────────

/// Discord channel using raw Gateway WebSocket + REST API.
pub struct DiscordChannel {
    /// Bot token from the Discord Developer Portal.
    token: String,
    /// Message bus for inbound messages.
    bus: Arc<MessageBus>,
    /// Allow-list of Discord user IDs or usernames. Empty = allow everyone.
    allowed_users: Vec<String>,
    /// Gateway WebSocket URL.
    gateway_url: String,
    /// REST API base URL.
    api_base: String,
    /// Gateway intents bitmask.
    intents: u64,
    /// Shutdown signal.
    shutdown: Arc<Notify>,
    /// Set once `stop()` has been called.
    stopped: AtomicBool,
    /// HTTP client for REST API calls.
    http: reqwest::Client,
    /// Gateway sequence number for heartbeats and resume.
    seq: Arc<Mutex<Option<u64>>>,
    /// Whether the last heartbeat was ACKed (zombie detection).
    heartbeat_acked: Arc<AtomicBool>,
    /// Session ID for resume.
    session_id: Mutex<Option<String>>,
    /// Resume gateway URL.
    resume_url: Mutex<Option<String>>,
}

impl DiscordChannel {
    /// Create a new Discord channel.
    pub fn new(token: String, bus: Arc<MessageBus>, allowed_users: Vec<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            token,
            bus,
            allowed_users,
            gateway_url: DEFAULT_GATEWAY_URL.into(),
            api_base: DISCORD_API_BASE.into(),
            intents: DEFAULT_INTENTS,
            shutdown: Arc::new(Notify::new()),
            stopped: AtomicBool::new(false),
            http,
            seq: Arc::new(Mutex::new(None)),
            heartbeat_acked: Arc::new(AtomicBool::new(true)),
            session_id: Mutex::new(None),
            resume_url: Mutex::new(None),
        }
    }

    /// Point the REST client at a different API base (e.g. a local mock).
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    /// Check if a sender is allowed, by user ID or username.
    fn is_allowed(&self, sender_id: &str, username: &str) -> bool {
        if self.allowed_users.is_empty() {
            return true;
        }
        self.allowed_users
            .iter()
            .any(|u| u == sender_id || (!username.is_empty() && u == username))
    }

    // ─────────────────────────────────────────
    // Gateway
    // ─────────────────────────────────────────

    /// Run the Gateway WebSocket connection with auto-reconnect.
    async fn run_gateway(&self) -> anyhow::Result<()> {
        while !self.stopped.load(Ordering::SeqCst) {
            match self.gateway_session().await {
                Ok(()) => {
                    info!("discord gateway session ended");
                    break;
                }
                Err(e) => {
                    warn!(error = %e, "discord gateway error, reconnecting in 5s");
                    tokio::select! {
                        _ = tokio::time::sleep(Duration::from_secs(5)) => {}
                        _ = self.shutdown.notified() => {
                            info!("discord shutdown during reconnect wait");
                            break;
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Single Gateway WebSocket session.
    ///
    /// Returns `Ok` only on shutdown; every other end of the session is an
    /// error so the caller reconnects.
    async fn gateway_session(&self) -> anyhow::Result<()> {
        let url = self
            .resume_url
            .lock()
            .await
            .clone()
            .map(|u| format!("{u}/?v=10&encoding=json"))
            .unwrap_or_else(|| self.gateway_url.clone());

        debug!(url = %url, "connecting to discord gateway");
        let (ws_stream, _) = tokio_tungstenite::connect_async(&url).await?;
        let (mut write, mut read) = ws_stream.split();

        // Every outgoing frame (identify, heartbeats, close) goes through one writer task.
        let (ws_tx, mut ws_rx) = mpsc::channel::<WsMessage>(16);
        let writer = tokio::spawn(async move {
            while let Some(frame) = ws_rx.recv().await {
                if let Err(e) = write.send(frame).await {
                    warn!(error = %e, "discord ws write error");
                    break;
                }
            }
        });

        let zombie = Arc::new(Notify::new());
        let mut heartbeat: Option<JoinHandle<()>> = None;

        let result = loop {
            tokio::select! {
                frame = read.next() => {
                    let text = match frame {
                        Some(Ok(WsMessage::Text(t))) => t.to_string(),
                        Some(Ok(WsMessage::Close(_))) | None => {
                            break Err(anyhow::anyhow!("gateway connection closed"));
                        }
                        Some(Ok(_)) => continue,
                        Some(Err(e)) => break Err(e.into()),
                    };

                    let payload: Value = match serde_json::from_str(&text) {
                        Ok(v) => v,
                        Err(e) => {
                            warn!(error = %e, "discord ws invalid json");
                            continue;
                        }
                    };

                    if let Some(reason) = self
                        .handle_payload(&payload, &ws_tx, &zombie, &mut heartbeat)
                        .await
                    {
                        break Err(anyhow::anyhow!(reason));
                    }
                }
                _ = zombie.notified() => {
                    break Err(anyhow::anyhow!("heartbeat not acknowledged"));
                }
                _ = self.shutdown.notified() => {
                    info!("discord shutdown signal received");
                    let _ = ws_tx.send(WsMessage::Close(None)).await;
                    break Ok(());
                }
            }
        };

        if let Some(handle) = heartbeat.take() {
            handle.abort();
        }
        drop(ws_tx);
        let _ = tokio::time::timeout(Duration::from_secs(2), writer).await;

        result
    }

    /// Process one gateway payload. Returns a reason when the session must
    /// be torn down and reconnected.
    async fn handle_payload(
        &self,
        payload: &Value,
        ws_tx: &mpsc::Sender<WsMessage>,
        zombie: &Arc<Notify>,
        heartbeat: &mut Option<JoinHandle<()>>,
    ) -> Option<&'static str> {
        if let Some(s) = payload["s"].as_u64() {
            *self.seq.lock().await = Some(s);
        }

        match payload["op"].as_u64().unwrap_or(u64::MAX) {
            OP_HELLO => {
                let interval = payload["d"]["heartbeat_interval"].as_u64().unwrap_or(41250);
                debug!(interval_ms = interval, "discord HELLO received");

                if let Some(old) = heartbeat.take() {
                    old.abort();
                }
                self.heartbeat_acked.store(true, Ordering::SeqCst);
                *heartbeat = Some(self.spawn_heartbeat(interval, ws_tx.clone(), zombie.clone()));

                let hello_reply = self.identify_or_resume().await;
                if ws_tx.send(WsMessage::text(hello_reply)).await.is_err() {
                    return Some("gateway writer closed");
                }
                None
            }
            OP_DISPATCH => {
                let event = payload["t"].as_str().unwrap_or("");
                match event {
                    "READY" => {
                        let d = &payload["d"];
                        if let Some(sid) = d["session_id"].as_str() {
                            *self.session_id.lock().await = Some(sid.to_string());
                        }
                        if let Some(url) = d["resume_gateway_url"].as_str() {
                            *self.resume_url.lock().await = Some(url.trim_end_matches('/').to_string());
                        }
                        let user = d["user"]["username"].as_str().unwrap_or("unknown");
                        info!(user = user, "discord bot READY");
                    }
                    "RESUMED" => info!("discord session resumed"),
                    "MESSAGE_CREATE" => self.handle_message_create(&payload["d"]).await,
                    _ => debug!(event = event, "discord event (unhandled)"),
                }
                None
            }
            OP_HEARTBEAT_ACK => {
                self.heartbeat_acked.store(true, Ordering::SeqCst);
                None
            }
            OP_HEARTBEAT => {
                // Server requesting an immediate heartbeat
                let frame = json!({"op": OP_HEARTBEAT, "d": *self.seq.lock().await}).to_string();
                let _ = ws_tx.send(WsMessage::text(frame)).await;
                None
            }
            OP_RECONNECT => {
                info!("discord server requested reconnect");
                Some("reconnect requested")
            }
            OP_INVALID_SESSION => {
                let resumable = payload["d"].as_bool().unwrap_or(false);
                warn!(resumable = resumable, "discord invalid session");
                if !resumable {
                    *self.session_id.lock().await = None;
                    *self.resume_url.lock().await = None;
                    *self.seq.lock().await = None;
                }
                Some("invalid session")
            }
            _ => None,
        }
    }

    /// IDENTIFY for a fresh session, RESUME when a session id is known.
    async fn identify_or_resume(&self) -> String {
        match self.session_id.lock().await.clone() {
            Some(sid) => json!({
                "op": OP_RESUME,
                "d": {
                    "token": self.token,
                    "session_id": sid,
                    "seq": *self.seq.lock().await
                }
            })
            .to_string(),
            None => json!({
                "op": OP_IDENTIFY,
                "d": {
                    "token": self.token,
                    "intents": self.intents,
                    "properties": {
                        "os": std::env::consts::OS,
                        "browser": "streakbot",
                        "device": "streakbot"
                    }
                }
            })
            .to_string(),
        }
    }

    /// Heartbeat task. Signals `zombie` when a heartbeat goes unacknowledged.
    fn spawn_heartbeat(
        &self,
        interval_ms: u64,
        ws_tx: mpsc::Sender<WsMessage>,
        zombie: Arc<Notify>,
    ) -> JoinHandle<()> {
        let seq = self.seq.clone();
        let acked = self.heartbeat_acked.clone();

        tokio::spawn(async move {
            let jitter = (interval_ms as f64 * rand_jitter()) as u64;
            tokio::time::sleep(Duration::from_millis(jitter)).await;

            loop {
                if !acked.swap(false, Ordering::SeqCst) {
                    warn!("discord heartbeat not ACKed, requesting reconnect");
                    zombie.notify_one();
                    break;
                }

                let frame = json!({"op": OP_HEARTBEAT, "d": *seq.lock().await}).to_string();
                if ws_tx.send(WsMessage::text(frame)).await.is_err() {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(interval_ms)).await;
            }
        })
    }

    /// Handle a MESSAGE_CREATE event from the Gateway.
    async fn handle_message_create(&self, data: &Value) {
        // Ignore bot messages, ours included
        if data["author"]["bot"].as_bool().unwrap_or(false) {
            return;
        }

        let (Some(sender_id), Some(channel_id)) =
            (data["author"]["id"].as_str(), data["channel_id"].as_str())
        else {
            return;
        };

        let username = data["author"]["username"].as_str().unwrap_or("");

        if !self.is_allowed(sender_id, username) {
            warn!(
                sender = %sender_id,
                channel = %channel_id,
                "discord message from unauthorized user, ignoring"
            );
            return;
        }

        let content = data["content"].as_str().unwrap_or("");
        debug!(
            sender = %sender_id,
            channel = %channel_id,
            content_len = content.len(),
            "discord inbound message"
        );

        let mut inbound = InboundMessage::new("discord", sender_id, channel_id, content);
        if let Some(ts) = data["timestamp"]
            .as_str()
            .and_then(|t| DateTime::parse_from_rfc3339(t).ok())
        {
            inbound = inbound.with_timestamp(ts.with_timezone(&Utc));
        }

        inbound.metadata.insert("username".into(), username.to_string());
        if let Some(msg_id) = data["id"].as_str() {
            inbound.metadata.insert("message_id".into(), msg_id.to_string());
        }
        if let Some(guild_id) = data["guild_id"].as_str() {
            inbound.metadata.insert("guild_id".into(), guild_id.to_string());
        }
        if let Some(hash) = data["author"]["avatar"].as_str() {
            inbound.metadata.insert(
                "avatar_url".into(),
                format!("{DISCORD_CDN_BASE}/avatars/{sender_id}/{hash}.png"),
            );
        }

        if let Err(e) = self.bus.publish_inbound(inbound).await {
            error!(error = %e, "failed to publish discord message to bus");
        }
    }

    // ─────────────────────────────────────────
    // REST
    // ─────────────────────────────────────────

    /// Post a message body via the REST API with retry on rate-limit.
    async fn send_rest(&self, channel_id: &str, body: &Value) -> anyhow::Result<()> {
        let url = format!("{}/channels/{channel_id}/messages", self.api_base);

        let mut attempts = 0u32;
        loop {
            let resp = self
                .http
                .post(&url)
                .header("Authorization", format!("Bot {}", self.token))
                .json(body)
                .send()
                .await?;

            let status = resp.status();
            if status.is_success() {
                return Ok(());
            }

            if status.as_u16() == 429 {
                let retry_after = resp
                    .json::<Value>()
                    .await
                    .ok()
                    .and_then(|v| v["retry_after"].as_f64())
                    .unwrap_or(1.0);
                warn!(retry_after_s = retry_after, "discord rate limited");
                tokio::time::sleep(Duration::from_secs_f64(retry_after.max(0.0))).await;
                continue;
            }

            attempts += 1;
            if attempts >= MAX_SEND_ATTEMPTS {
                let err_text = resp.text().await.unwrap_or_default();
                return Err(anyhow::anyhow!(
                    "discord send failed after {MAX_SEND_ATTEMPTS} attempts (HTTP {status}): {err_text}"
                ));
            }

            warn!(status = %status, attempt = attempts, "discord send error, retrying in 1s");
            tokio::time::sleep(Duration::from_secs(1)).await;
        }
    }
}

/// Message body, optionally as a reply that does not ping the author.
fn message_body(mut body: Value, reply_to: Option<&str>) -> Value {
    if let Some(ref_id) = reply_to {
        body["message_reference"] = json!({ "message_id": ref_id, "fail_if_not_exists": false });
        body["allowed_mentions"] = json!({ "replied_user": false });
    }
    body
}

/// Render a log report as a Discord embed.
///
/// Entries are kept newest first while they fit both the field limit and the
/// embed's total text limit; the description counts what is actually shown.
pub fn report_embed(report: &LogReport) -> Value {
    let title = report.title();
    let footer = report.footer();
    let total = report.total.to_string();
    let streak = report.streak.to_string();

    // The summary is sized for the widest count it could print.
    let widest_summary = report.summary_showing(report.entries.len());
    let fixed_len: usize = [
        title.as_str(),
        footer.as_str(),
        widest_summary.as_str(),
        "Days completed",
        total.as_str(),
        "Current Streak",
        streak.as_str(),
    ]
    .iter()
    .map(|s| s.chars().count())
    .sum();
    let mut budget = MAX_EMBED_CHARS.saturating_sub(fixed_len);

    let mut fields: Vec<Value> = Vec::new();
    for entry in report.entries.iter().rev().take(MAX_ENTRY_FIELDS) {
        let name = entry.heading();
        let value = truncate_string(&entry.message, MAX_FIELD_VALUE_LEN);
        let cost = name.chars().count() + value.chars().count();
        if cost > budget {
            break;
        }
        budget -= cost;
        fields.push(json!({ "name": name, "value": value, "inline": false }));
    }
    fields.reverse();
    let shown = fields.len();

    fields.push(json!({ "name": "Days completed", "value": total, "inline": true }));
    fields.push(json!({ "name": "Current Streak", "value": streak, "inline": true }));

    let mut embed = json!({
        "color": EMBED_COLOR,
        "title": title,
        "description": report.summary_showing(shown),
        "fields": fields,
        "timestamp": Utc::now().to_rfc3339(),
        "footer": { "text": footer }
    });
    if let Some(url) = &report.avatar_url {
        embed["thumbnail"] = json!({ "url": url });
    }
    embed
}

/// Simple jitter: a fraction between 0.0 and 1.0 for the first heartbeat.
fn rand_jitter() -> f64 {
    use std::time::SystemTime;
    let nanos = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .subsec_nanos();
    (nanos as f64) / 1_000_000_000.0
}

#[async_trait]
impl Channel for DiscordChannel {
    fn name(&self) -> &str {
        "discord"
    }

    async fn start(&self) -> anyhow::Result<()> {
        if self.token.is_empty() {
            return Err(anyhow::anyhow!("discord token is empty"));
        }

        info!("starting discord channel (gateway v10)");
        self.run_gateway().await
    }

    async fn stop(&self) -> anyhow::Result<()> {
        info!("stopping discord channel");
        self.stopped.store(true, Ordering::SeqCst);
        self.shutdown.notify_waiters();
        Ok(())
    }

    async fn send(&self, msg: &OutboundMessage) -> anyhow::Result<()> {
        let reply_to = msg.reply_to.as_deref();

        if let Some(report) = &msg.report {
            let body = message_body(json!({ "embeds": [report_embed(report)] }), reply_to);
            self.send_rest(&msg.chat_id, &body).await?;
            debug!(chat_id = %msg.chat_id, "discord report sent");
            return Ok(());
        }

        let chunks = split_message(&msg.content, DISCORD_MAX_LEN);
        for (i, chunk) in chunks.iter().enumerate() {
            // Only the first chunk is a reply
            let ref_id = if i == 0 { reply_to } else { None };
            let body = message_body(json!({ "content": chunk }), ref_id);
            self.send_rest(&msg.chat_id, &body).await?;
        }

        debug!(chat_id = %msg.chat_id, chunks = chunks.len(), "discord message sent");
        Ok(())
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
