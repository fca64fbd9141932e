// Copyright © 2025 mailpool.dev
// Licensed under MailPool License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use crate::modules::account::Account;
use crate::modules::error::{code::ErrorCode, MailPoolResult};
use crate::modules::imap::FetchedMessage;
use crate::modules::proxy::{Proxy, ProxyKind};
use crate::modules::repository::Repository;
use crate::modules::settings::cli::SETTINGS;
use crate::raise_error;
use dashmap::DashMap;

#[derive(Clone, Debug, Default)]
struct UserConfig {
    send_delay_range: Option<(u64, u64)>,
    strict_verify: Option<bool>,
}

/// In-memory repository backing the standalone binary and the tests.
/// Per-user configuration falls back to the process-wide Settings.
#[derive(Debug, Default)]
pub struct MemoryRepository {
    accounts: DashMap<u64, Account>,
    proxies: DashMap<u64, Proxy>,
    config: DashMap<u64, UserConfig>,
    subjects: DashMap<u64, Vec<String>>,
    templates: DashMap<u64, Vec<String>>,
    messages: DashMap<u64, Vec<FetchedMessage>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_account(&self, account: Account) {
        self.accounts.insert(account.id, account);
    }

    pub fn add_proxy(&self, proxy: Proxy) {
        self.proxies.insert(proxy.id, proxy);
    }

    pub fn set_send_delay_range(&self, user_id: u64, min: u64, max: u64) {
        self.config.entry(user_id).or_default().send_delay_range = Some((min, max));
    }

    pub fn set_strict_verify(&self, user_id: u64, strict: bool) {
        self.config.entry(user_id).or_default().strict_verify = Some(strict);
    }

    pub fn set_subjects(&self, user_id: u64, subjects: Vec<String>) {
        self.subjects.insert(user_id, subjects);
    }

    pub fn set_templates(&self, user_id: u64, templates: Vec<String>) {
        self.templates.insert(user_id, templates);
    }

    pub fn recorded_messages(&self, account_id: u64) -> Vec<FetchedMessage> {
        self.messages
            .get(&account_id)
            .map(|m| m.clone())
            .unwrap_or_default()
    }
}

impl Repository for MemoryRepository {
    async fn list_accounts(&self, user_id: u64) -> MailPoolResult<Vec<Account>> {
        let mut accounts: Vec<Account> = self
            .accounts
            .iter()
            .filter(|a| a.user_id == user_id)
            .map(|a| a.clone())
            .collect();
        accounts.sort_by_key(|a| a.id);
        Ok(accounts)
    }

    async fn list_enabled_accounts(&self, user_id: u64) -> MailPoolResult<Vec<Account>> {
        let mut accounts = self.list_accounts(user_id).await?;
        accounts.retain(|a| a.enabled);
        Ok(accounts)
    }

    async fn set_account_enabled(
        &self,
        user_id: u64,
        account_id: u64,
        enabled: bool,
    ) -> MailPoolResult<()> {
        let mut account = self
            .accounts
            .get_mut(&account_id)
            .filter(|a| a.user_id == user_id)
            .ok_or_else(|| {
                raise_error!(
                    format!("Account with id={} not found", account_id),
                    ErrorCode::ResourceNotFound
                )
            })?;
        account.enabled = enabled;
        Ok(())
    }

    async fn list_proxies(&self, user_id: u64, kind: ProxyKind) -> MailPoolResult<Vec<Proxy>> {
        let mut proxies: Vec<Proxy> = self
            .proxies
            .iter()
            .filter(|p| p.user_id == user_id && p.kind == kind)
            .map(|p| p.clone())
            .collect();
        proxies.sort_by_key(|p| p.id);
        Ok(proxies)
    }

    async fn send_delay_range(&self, user_id: u64) -> MailPoolResult<(u64, u64)> {
        Ok(self
            .config
            .get(&user_id)
            .and_then(|c| c.send_delay_range)
            .unwrap_or((
                SETTINGS.mailpool_send_delay_min,
                SETTINGS.mailpool_send_delay_max,
            )))
    }

    async fn strict_verify_mode(&self, user_id: u64) -> MailPoolResult<bool> {
        Ok(self
            .config
            .get(&user_id)
            .and_then(|c| c.strict_verify)
            .unwrap_or(SETTINGS.mailpool_strict_verify))
    }

    async fn list_subjects(&self, user_id: u64) -> MailPoolResult<Vec<String>> {
        Ok(self.subjects.get(&user_id).map(|s| s.clone()).unwrap_or_default())
    }

    async fn list_templates(&self, user_id: u64) -> MailPoolResult<Vec<String>> {
        Ok(self.templates.get(&user_id).map(|t| t.clone()).unwrap_or_default())
    }

    async fn has_recorded_messages(&self, account_id: u64) -> MailPoolResult<bool> {
        Ok(self
            .messages
            .get(&account_id)
            .map(|m| !m.is_empty())
            .unwrap_or(false))
    }

    async fn record_incoming(&self, message: &FetchedMessage) -> MailPoolResult<()> {
        self.messages
            .entry(message.account_id)
            .or_default()
            .push(message.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(id: u64, user_id: u64, enabled: bool) -> Account {
        Account {
            id,
            user_id,
            email: format!("acc{id}@example.org"),
            password: "secret".into(),
            display_name: None,
            enabled,
        }
    }

    #[tokio::test]
    async fn enabled_filter_and_user_scoping() {
        let repo = MemoryRepository::new();
        repo.add_account(account(1, 7, true));
        repo.add_account(account(2, 7, false));
        repo.add_account(account(3, 8, true));

        let all = repo.list_accounts(7).await.unwrap();
        assert_eq!(all.len(), 2);
        let enabled = repo.list_enabled_accounts(7).await.unwrap();
        assert_eq!(enabled.len(), 1);
        assert_eq!(enabled[0].id, 1);
    }

    #[tokio::test]
    async fn toggling_requires_matching_user() {
        let repo = MemoryRepository::new();
        repo.add_account(account(1, 7, true));

        assert!(repo.set_account_enabled(8, 1, false).await.is_err());
        repo.set_account_enabled(7, 1, false).await.unwrap();
        assert!(repo.list_enabled_accounts(7).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn message_log_backs_the_backlog_gate() {
        let repo = MemoryRepository::new();
        assert!(!repo.has_recorded_messages(1).await.unwrap());

        let message = FetchedMessage {
            account_id: 1,
            account_email: "acc1@example.org".into(),
            uid: "42".into(),
            from_name: "Alice".into(),
            from_address: "alice@example.org".into(),
            subject: "hi".into(),
            body: "hello".into(),
            received_at: 0,
        };
        repo.record_incoming(&message).await.unwrap();

        assert!(repo.has_recorded_messages(1).await.unwrap());
        assert_eq!(repo.recorded_messages(1), vec![message]);
    }

    #[tokio::test]
    async fn config_falls_back_to_settings() {
        let repo = MemoryRepository::new();
        assert_eq!(repo.send_delay_range(7).await.unwrap(), (3, 6));
        assert!(!repo.strict_verify_mode(7).await.unwrap());

        repo.set_send_delay_range(7, 10, 20);
        repo.set_strict_verify(7, true);
        assert_eq!(repo.send_delay_range(7).await.unwrap(), (10, 20));
        assert!(repo.strict_verify_mode(7).await.unwrap());
    }
}
