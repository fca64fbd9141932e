// Copyright © 2025 mailpool.dev
// Licensed under MailPool License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use serde::{Deserialize, Serialize};

/// A mailbox account operated by the pool. Persistence is owned by the
/// repository; the engine only reads these fields and toggles `enabled`.
#[derive(Clone, Debug, Default, Eq, PartialEq, Deserialize, Serialize)]
pub struct Account {
    /// Unique account identifier
    pub id: u64,
    /// Owning user
    pub user_id: u64,
    /// Email address associated with this account
    pub email: String,
    /// Mailbox password, also used for mail submission
    pub password: String,
    /// Display name used in the From header (optional)
    pub display_name: Option<String>,
    /// Whether the poll loop considers this account at all
    pub enabled: bool,
}

impl Account {
    /// Name shown to recipients; falls back to the address itself.
    pub fn sender_name(&self) -> &str {
        self.display_name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(&self.email)
    }
}
