//! Journal loop — turns inbound chat messages into journal operations.
//!
//! Receives inbound messages from the bus, feeds pending `$logday` replies to
//! their waiters, runs commands, and publishes replies to the outbound queue.
//! Waiters run as spawned tasks so the loop keeps consuming while a user is
//! still typing.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use streakbot_core::bus::queue::MessageBus;
use streakbot_core::bus::types::{InboundMessage, OutboundMessage};
use streakbot_core::config::JournalConfig;
use streakbot_core::types::display_date;

use crate::collector::{CollectOutcome, PendingReply, ReplyCollector, ReplyKey};
use crate::command::{ArgError, Command, CommandParser};
use crate::day::DayBoundary;
use crate::error::JournalError;
use crate::recorder::LogRecorder;
use crate::report::{build_report, ReportSubject};
use crate::store::LogStore;

pub const PROMPT: &str = "What do you want to log for today?";
pub const ALREADY_LOGGED: &str =
    "You already logged your progress today. You can't log more than once per day!";
pub const WRITE_FAILED: &str = "Something went wrong, please try again!";
pub const READ_FAILED: &str = "Something went wrong, sorry about that!";
pub const NOT_A_NUMBER: &str = "Please input a number";
pub const TOO_MANY_ARGS: &str = "I received more arguments that I can handle!";
pub const NEGATIVE_COUNT: &str =
    "Please, enter either a positive number or 0 if you want to look at all your logs!";

// ─────────────────────────────────────────────
// Settings
// ─────────────────────────────────────────────

/// Runtime settings of the journal loop.
#[derive(Clone, Debug)]
pub struct JournalSettings {
    pub command_prefix: String,
    pub reply_timeout: Duration,
    pub default_log_count: usize,
    pub days: DayBoundary,
}

impl JournalSettings {
    /// Build settings from config. An out-of-range UTC offset falls back to UTC.
    pub fn from_config(config: &JournalConfig) -> Self {
        let days = DayBoundary::from_offset_minutes(config.utc_offset_minutes).unwrap_or_else(|| {
            warn!(
                utc_offset_minutes = config.utc_offset_minutes,
                "UTC offset out of range, cutting days at UTC midnight"
            );
            DayBoundary::utc()
        });

        Self {
            command_prefix: config.command_prefix.clone(),
            reply_timeout: Duration::from_secs(config.reply_timeout_secs),
            default_log_count: config.default_log_count,
            days,
        }
    }
}

impl Default for JournalSettings {
    fn default() -> Self {
        Self::from_config(&JournalConfig::default())
    }
}

// ─────────────────────────────────────────────
// JournalLoop
// ─────────────────────────────────────────────

/// The dispatch loop: polls the bus, runs commands, collects `$logday` replies.
pub struct JournalLoop {
    bus: Arc<MessageBus>,
    recorder: LogRecorder,
    parser: CommandParser,
    collector: ReplyCollector,
    settings: JournalSettings,
}

impl JournalLoop {
    pub fn new(bus: Arc<MessageBus>, store: Arc<dyn LogStore>, settings: JournalSettings) -> Self {
        let parser = CommandParser::new(settings.command_prefix.clone())
            .with_default_limit(settings.default_log_count);

        info!(
            store = %store.describe(),
            prefix = %settings.command_prefix,
            reply_timeout_secs = settings.reply_timeout.as_secs(),
            "journal loop initialized"
        );

        Self {
            bus,
            recorder: LogRecorder::new(store),
            parser,
            collector: ReplyCollector::new(),
            settings,
        }
    }

    /// Run the event loop until the inbound channel is closed.
    pub async fn run(&self) {
        info!("journal loop started, waiting for messages");
        while let Some(msg) = self.bus.consume_inbound().await {
            self.handle_message(msg).await;
        }
        info!("inbound channel closed, journal loop exiting");
    }

    /// Handle one inbound message.
    ///
    /// Commands are never taken as a pending `$logday` reply.
    pub async fn handle_message(&self, msg: InboundMessage) {
        match self.parser.parse(&msg.content) {
            Some(Command::LogDay) => self.start_log_day(msg).await,
            Some(Command::GetLogs(limit)) => {
                let reply = self.get_logs(&msg, limit).await;
                self.publish(reply).await;
            }
            Some(Command::Help) => {
                let reply = OutboundMessage::reply(&msg, self.help_text());
                self.publish(reply).await;
            }
            None => {
                if let Some(unclaimed) = self.collector.offer(msg).await {
                    debug!(
                        conversation = %unclaimed.conversation_key(),
                        "ignoring message that is neither a command nor an awaited reply"
                    );
                }
            }
        }
    }

    /// `$logday`: prompt, then record whatever the same sender says next.
    async fn start_log_day(&self, msg: InboundMessage) {
        let pending = self
            .collector
            .register(ReplyKey::of(&msg), self.settings.reply_timeout)
            .await;
        debug!(sender_id = %msg.sender_id, conversation = %msg.conversation_key(), "awaiting log");

        self.publish(OutboundMessage::reply(&msg, PROMPT)).await;

        let waiter = LogWaiter {
            recorder: self.recorder.clone(),
            days: self.settings.days,
            outbound: self.bus.outbound_sender(),
            timeout_notice: self.timeout_notice(),
            empty_notice: format!(
                "Your log can't be empty. Type `{}` to try again.",
                self.parser.spelled("logday")
            ),
        };
        tokio::spawn(waiter.run(msg, pending));
    }

    /// `$getlogs [n]`: build the report, or explain why not.
    async fn get_logs(&self, msg: &InboundMessage, limit: Result<usize, ArgError>) -> OutboundMessage {
        let limit = match limit {
            Ok(limit) => limit,
            Err(e) => {
                debug!(sender_id = %msg.sender_id, error = %e, "rejected getlogs argument");
                let text = match e {
                    ArgError::NotANumber => NOT_A_NUMBER,
                    ArgError::Negative => NEGATIVE_COUNT,
                    ArgError::TooMany => TOO_MANY_ARGS,
                };
                return OutboundMessage::reply(msg, text);
            }
        };

        let history = match self.recorder.store().query_by_user(&msg.sender_id).await {
            Ok(history) => history,
            Err(e) => {
                error!(error = %e, sender_id = %msg.sender_id, "history query failed");
                return OutboundMessage::reply(msg, READ_FAILED);
            }
        };

        if history.is_empty() {
            return OutboundMessage::reply(
                msg,
                format!(
                    "You don't have any logged message! Start today by typing `{}`!",
                    self.parser.spelled("logday")
                ),
            );
        }

        let subject = ReportSubject {
            display_name: msg.display_name().to_string(),
            avatar_url: msg.metadata.get("avatar_url").cloned(),
        };
        let reference_day = self.settings.days.day_of(msg.timestamp);
        let report = build_report(
            subject,
            &history,
            limit,
            reference_day,
            &self.parser.spelled("logday"),
        );
        debug!(
            sender_id = %msg.sender_id,
            total = report.total,
            shown = report.entries.len(),
            streak = report.streak,
            "log report built"
        );

        OutboundMessage::reply(msg, report.render_text()).with_report(report)
    }

    fn help_text(&self) -> String {
        format!(
            "Streakbot keeps one log per day and counts your streak.\n\
             {}: log what you did today\n\
             {} [n]: show your last n logs (default {}, 0 for all) and your current streak\n\
             {}: show this message",
            self.parser.spelled("logday"),
            self.parser.spelled("getlogs"),
            self.settings.default_log_count,
            self.parser.spelled("help"),
        )
    }

    fn timeout_notice(&self) -> String {
        format!(
            "No log received within {} seconds. Type `{}` to try again.",
            self.settings.reply_timeout.as_secs(),
            self.parser.spelled("logday")
        )
    }

    async fn publish(&self, msg: OutboundMessage) {
        if let Err(e) = self.bus.publish_outbound(msg).await {
            error!(error = %e, "failed to publish outbound message");
        }
    }

    /// Number of `$logday` prompts still waiting for a reply.
    pub async fn pending_replies(&self) -> usize {
        self.collector.pending().await
    }
}

// ─────────────────────────────────────────────
// LogWaiter
// ─────────────────────────────────────────────

/// Everything a spawned `$logday` waiter needs once the loop has moved on.
struct LogWaiter {
    recorder: LogRecorder,
    days: DayBoundary,
    outbound: mpsc::Sender<OutboundMessage>,
    timeout_notice: String,
    empty_notice: String,
}

impl LogWaiter {
    async fn run(self, trigger: InboundMessage, pending: PendingReply) {
        let text = match pending.wait().await {
            CollectOutcome::Reply(reply) => self.record(&reply).await,
            CollectOutcome::TimedOut => {
                debug!(sender_id = %trigger.sender_id, "no log received before timeout");
                self.timeout_notice.clone()
            }
            CollectOutcome::Superseded => return,
        };

        if let Err(e) = self.outbound.send(OutboundMessage::reply(&trigger, text)).await {
            error!(error = %e, "failed to publish outbound message");
        }
    }

    async fn record(&self, reply: &InboundMessage) -> String {
        let today = self.days.day_of(reply.timestamp);
        match self.recorder.record(&reply.sender_id, &reply.content, today).await {
            Ok(saved) => format!(
                "Success! Your log for {} has been saved!",
                display_date(saved.log_date)
            ),
            Err(JournalError::AlreadyLogged { .. }) => ALREADY_LOGGED.to_string(),
            Err(JournalError::InvalidArgument(reason)) => {
                debug!(sender_id = %reply.sender_id, reason = %reason, "log rejected");
                self.empty_notice.clone()
            }
            Err(JournalError::Store(e)) => {
                error!(error = %e, sender_id = %reply.sender_id, "failed to record log");
                WRITE_FAILED.to_string()
            }
        }
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
