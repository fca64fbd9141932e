// Copyright © 2025 mailpool.dev
// Licensed under MailPool License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use crate::modules::account::Account;
use crate::modules::error::MailPoolResult;
use crate::modules::imap::FetchedMessage;
use crate::modules::proxy::{Proxy, ProxyKind};
use std::future::Future;

pub mod memory;

/// Everything the engine consumes from the outside world: accounts,
/// proxies, per-user configuration, subject/template pools, and the
/// incoming-message log. Persistence lives behind this seam; the engine
/// only reads, records messages, and toggles the account enabled flag.
pub trait Repository: Send + Sync + 'static {
    fn list_accounts(
        &self,
        user_id: u64,
    ) -> impl Future<Output = MailPoolResult<Vec<Account>>> + Send;

    fn list_enabled_accounts(
        &self,
        user_id: u64,
    ) -> impl Future<Output = MailPoolResult<Vec<Account>>> + Send;

    fn set_account_enabled(
        &self,
        user_id: u64,
        account_id: u64,
        enabled: bool,
    ) -> impl Future<Output = MailPoolResult<()>> + Send;

    fn list_proxies(
        &self,
        user_id: u64,
        kind: ProxyKind,
    ) -> impl Future<Output = MailPoolResult<Vec<Proxy>>> + Send;

    /// Inclusive bounds of the randomized pause between campaign sends.
    fn send_delay_range(
        &self,
        user_id: u64,
    ) -> impl Future<Output = MailPoolResult<(u64, u64)>> + Send;

    /// When true, proxy exhaustion fails the fetch instead of falling
    /// back to a direct connection.
    fn strict_verify_mode(&self, user_id: u64)
        -> impl Future<Output = MailPoolResult<bool>> + Send;

    fn list_subjects(
        &self,
        user_id: u64,
    ) -> impl Future<Output = MailPoolResult<Vec<String>>> + Send;

    fn list_templates(
        &self,
        user_id: u64,
    ) -> impl Future<Output = MailPoolResult<Vec<String>>> + Send;

    /// Whether any message was ever recorded for this account. Gates the
    /// one-shot backlog suppression.
    fn has_recorded_messages(
        &self,
        account_id: u64,
    ) -> impl Future<Output = MailPoolResult<bool>> + Send;

    fn record_incoming(
        &self,
        message: &FetchedMessage,
    ) -> impl Future<Output = MailPoolResult<()>> + Send;
}
