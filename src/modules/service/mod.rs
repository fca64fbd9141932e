// Copyright © 2025 mailpool.dev
// Licensed under MailPool License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use crate::modules::error::MailPoolResult;
use crate::modules::event::EventSender;
use crate::modules::imap::fetch::ImapFetcher;
use crate::modules::poll::scheduler::{run_poll_loop, PollDeps};
use crate::modules::poll::{PollHandle, PollRegistry};
use crate::modules::proxy::pool::ProxyPool;
use crate::modules::proxy::probe::{probe_all, ProbeOutcome};
use crate::modules::proxy::{Proxy, ProxyKind};
use crate::modules::repository::Repository;
use crate::modules::send::status::CampaignSnapshot;
use crate::modules::send::{CampaignDeps, CampaignRegistry, Recipient};
use crate::modules::settings::cli::SETTINGS;
use crate::modules::smtp::SmtpMailer;
use crate::modules::status::{AccountRuntime, StatusStore};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;

/// The engine's control surface: per-user poll loops, campaigns, status
/// queries, and proxy probing, all backed by one repository.
pub struct MailService<R> {
    repo: Arc<R>,
    status: Arc<StatusStore>,
    proxies: DashMap<u64, Arc<ProxyPool>>,
    poll_loops: PollRegistry,
    campaigns: CampaignRegistry,
    events: Arc<DashMap<u64, EventSender>>,
}

impl<R: Repository> MailService<R> {
    pub fn new(repo: Arc<R>) -> Self {
        Self {
            repo,
            status: Arc::new(StatusStore::new()),
            proxies: DashMap::new(),
            poll_loops: PollRegistry::new(),
            campaigns: CampaignRegistry::new(),
            events: Arc::new(DashMap::new()),
        }
    }

    fn proxy_pool(&self, user_id: u64) -> Arc<ProxyPool> {
        self.proxies
            .entry(user_id)
            .or_insert_with(|| Arc::new(ProxyPool::new()))
            .clone()
    }

    /// Launch the user's poll loop, or — when one is already running —
    /// only refresh the notification target. Returns true when a new
    /// loop was started.
    pub fn start_polling(&self, user_id: u64, events: EventSender) -> bool {
        self.events.insert(user_id, events);
        if self.poll_loops.is_running(user_id) {
            return false;
        }

        let proxies = self.proxy_pool(user_id);
        let deps = PollDeps {
            user_id,
            repo: self.repo.clone(),
            status: self.status.clone(),
            proxies: proxies.clone(),
            fetcher: Arc::new(ImapFetcher::new(
                user_id,
                self.repo.clone(),
                proxies,
                self.status.clone(),
            )),
            events: self.events.clone(),
            interval: Duration::from_secs(SETTINGS.mailpool_poll_interval_secs),
            concurrency: SETTINGS.mailpool_fetch_concurrency,
        };
        let (cancel_tx, cancel_rx) = oneshot::channel();
        let join = tokio::spawn(run_poll_loop(deps, cancel_rx));
        self.poll_loops.insert(user_id, PollHandle::new(cancel_tx, join));
        true
    }

    /// Cancel the user's poll loop and wait for it to exit; every tracked
    /// account ends up disconnected. Returns false when nothing ran.
    pub async fn stop_polling(&self, user_id: u64) -> bool {
        self.poll_loops.stop(user_id).await
    }

    pub fn poll_status(&self, user_id: u64) -> Vec<(u64, AccountRuntime)> {
        self.status.snapshot(user_id)
    }

    /// Flag a freshly registered account so its first poll swallows the
    /// pre-existing unread backlog instead of reporting it as new.
    pub fn mark_freshly_added(&self, user_id: u64, account_id: u64) {
        self.status.mark_first_pass(user_id, account_id);
    }

    /// Enable the account and make sure a poll loop is running for its
    /// user.
    pub async fn enable_account(
        &self,
        user_id: u64,
        account_id: u64,
        events: EventSender,
    ) -> MailPoolResult<()> {
        self.repo
            .set_account_enabled(user_id, account_id, true)
            .await?;
        self.start_polling(user_id, events);
        Ok(())
    }

    /// Disable the account and drop its runtime state. The poll loop
    /// keeps running for the user's other accounts.
    pub async fn disable_account(&self, user_id: u64, account_id: u64) -> MailPoolResult<()> {
        self.repo
            .set_account_enabled(user_id, account_id, false)
            .await?;
        self.status.clear(user_id, account_id);
        Ok(())
    }

    /// Start a campaign over the given recipients, in order. Fails when a
    /// campaign is already running for the user.
    pub async fn start_campaign(
        &self,
        user_id: u64,
        recipients: Vec<Recipient>,
        events: EventSender,
    ) -> MailPoolResult<()> {
        let deps = CampaignDeps {
            user_id,
            repo: self.repo.clone(),
            mailer: Arc::new(SmtpMailer::new()),
            proxies: self.proxy_pool(user_id),
            events,
        };
        self.campaigns.start(deps, recipients)?;
        Ok(())
    }

    /// Advisory cancel; the campaign stops after its current recipient.
    pub fn cancel_campaign(&self, user_id: u64) -> bool {
        self.campaigns.cancel(user_id)
    }

    pub fn campaign_status(&self, user_id: u64) -> Option<CampaignSnapshot> {
        self.campaigns.status(user_id)
    }

    /// Wait for the user's campaign task to finish, if one was started.
    pub async fn await_campaign(&self, user_id: u64) {
        self.campaigns.await_termination(user_id).await
    }

    /// Reload one proxy list from the repository and probe every entry.
    /// Health flags are updated in memory; persisting is the caller's
    /// decision.
    pub async fn probe_proxies(
        &self,
        user_id: u64,
        kind: ProxyKind,
    ) -> MailPoolResult<Vec<(Proxy, ProbeOutcome)>> {
        let pool = self.proxy_pool(user_id);
        pool.replace(kind, self.repo.list_proxies(user_id, kind).await?);
        let timeout = Duration::from_secs(SETTINGS.mailpool_probe_timeout_secs);
        Ok(probe_all(&pool, kind, timeout).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::event::Event;
    use crate::modules::repository::memory::MemoryRepository;
    use tokio::sync::mpsc;

    const USER: u64 = 1;

    #[tokio::test]
    async fn polling_start_is_idempotent() {
        let service = MailService::new(Arc::new(MemoryRepository::new()));
        let (tx, _rx) = mpsc::channel(8);

        assert!(service.start_polling(USER, tx.clone()));
        // Second start only refreshes the notification target.
        assert!(!service.start_polling(USER, tx));

        assert!(service.stop_polling(USER).await);
        assert!(!service.stop_polling(USER).await);
    }

    #[tokio::test]
    async fn empty_campaign_finishes_immediately() {
        let service = MailService::new(Arc::new(MemoryRepository::new()));
        let (tx, mut rx) = mpsc::channel(8);

        assert!(service.campaign_status(USER).is_none());
        service.start_campaign(USER, Vec::new(), tx).await.unwrap();
        service.await_campaign(USER).await;

        let snapshot = service.campaign_status(USER).unwrap();
        assert!(!snapshot.running);
        assert_eq!(snapshot.total, 0);

        let mut finished = false;
        while let Ok(event) = rx.try_recv() {
            if matches!(
                event,
                Event::CampaignFinished {
                    sent: 0,
                    failed: 0,
                    total: 0,
                    was_cancelled: false
                }
            ) {
                finished = true;
            }
        }
        assert!(finished);
    }

    #[tokio::test]
    async fn cancelling_without_a_campaign_is_a_no_op() {
        let service = MailService::new(Arc::new(MemoryRepository::new()));
        assert!(!service.cancel_campaign(USER));
    }
}
