// Copyright © 2025 mailpool.dev
// Licensed under MailPool License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use serde::{Deserialize, Serialize};

pub mod body;
pub mod client;
pub mod fetch;
pub mod host;
pub mod session;
#[cfg(test)]
mod tests;

/// One parsed unread message pulled from a mailbox. Immutable once
/// produced; the UID is unique within its account and backs dedup.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
pub struct FetchedMessage {
    pub account_id: u64,
    pub account_email: String,
    /// Mailbox-assigned UID of the message.
    pub uid: String,
    pub from_name: String,
    pub from_address: String,
    pub subject: String,
    /// Plain text, markup stripped, capped at [`body::BODY_MAX_CHARS`].
    pub body: String,
    /// When the engine pulled the message (epoch millis).
    pub received_at: i64,
}
