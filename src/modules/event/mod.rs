// Copyright © 2025 mailpool.dev
// Licensed under MailPool License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use crate::modules::imap::FetchedMessage;
use tokio::sync::mpsc;

/// Notifications the engine emits toward the UI layer. Consumers receive
/// them over an mpsc channel registered per user; a dropped receiver only
/// mutes notifications, it never stops the engine.
#[derive(Clone, Debug)]
pub enum Event {
    /// First successful connection of an account's read stream.
    StreamStarted { account_id: u64, email: String },
    /// First failure since the account last succeeded; repeats are
    /// recorded in runtime state but not re-notified.
    StreamError {
        account_id: u64,
        email: String,
        error: String,
    },
    MessageReceived(FetchedMessage),
    /// Result of the send-proxy check performed at campaign start.
    SendProxyReport { unhealthy: Vec<String> },
    SendSucceeded {
        recipient: String,
        subject: String,
        body_for_log: String,
    },
    SendFailed { recipient: String },
    CampaignFinished {
        sent: u32,
        failed: u32,
        total: u32,
        was_cancelled: bool,
    },
}

pub type EventSender = mpsc::Sender<Event>;
