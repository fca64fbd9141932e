// Copyright © 2025 mailpool.dev
// Licensed under MailPool License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use crate::modules::account::Account;
use crate::modules::common::parallel::run_with_limit;
use crate::modules::common::signal::SIGNAL_MANAGER;
use crate::modules::error::MailPoolResult;
use crate::modules::event::{Event, EventSender};
use crate::modules::imap::fetch::Fetch;
use crate::modules::proxy::pool::ProxyPool;
use crate::modules::proxy::ProxyKind;
use crate::modules::repository::Repository;
use crate::modules::status::StatusStore;
use crate::utc_now;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

pub(crate) struct PollDeps<R, F> {
    pub user_id: u64,
    pub repo: Arc<R>,
    pub status: Arc<StatusStore>,
    pub proxies: Arc<ProxyPool>,
    pub fetcher: Arc<F>,
    /// Current notification target per user; refreshed by idempotent
    /// start calls, so it is read again on every emit.
    pub events: Arc<DashMap<u64, EventSender>>,
    pub interval: Duration,
    pub concurrency: usize,
}

impl<R, F> Clone for PollDeps<R, F> {
    fn clone(&self) -> Self {
        Self {
            user_id: self.user_id,
            repo: self.repo.clone(),
            status: self.status.clone(),
            proxies: self.proxies.clone(),
            fetcher: self.fetcher.clone(),
            events: self.events.clone(),
            interval: self.interval,
            concurrency: self.concurrency,
        }
    }
}

/// The long-running per-user loop. Exits on cancellation or process
/// shutdown, leaving every tracked account marked disconnected.
pub(crate) async fn run_poll_loop<R: Repository, F: Fetch>(
    deps: PollDeps<R, F>,
    mut cancel: oneshot::Receiver<()>,
) {
    info!("Poll loop for user {} started", deps.user_id);
    let mut interval = tokio::time::interval(deps.interval);
    let mut shutdown = SIGNAL_MANAGER.subscribe();

    loop {
        tokio::select! {
            _ = interval.tick() => {
                if let Err(e) = poll_tick(&deps).await {
                    warn!("Poll tick for user {} failed: {e:?}", deps.user_id);
                }
            }
            _ = &mut cancel => {
                info!("Poll loop for user {} received cancellation signal", deps.user_id);
                break;
            }
            _ = shutdown.recv() => {
                info!("Poll loop for user {} shutting down", deps.user_id);
                break;
            }
        }
    }

    deps.status.mark_all_disconnected(deps.user_id);
    info!("Poll loop for user {} stopped", deps.user_id);
}

/// One tick: refresh accounts and proxies, fan eligible accounts out to
/// the fetcher under the concurrency gate, book-keep the outcomes.
pub(crate) async fn poll_tick<R: Repository, F: Fetch>(
    deps: &PollDeps<R, F>,
) -> MailPoolResult<()> {
    let user_id = deps.user_id;
    let accounts = deps.repo.list_enabled_accounts(user_id).await?;
    deps.proxies.replace(
        ProxyKind::Verify,
        deps.repo.list_proxies(user_id, ProxyKind::Verify).await?,
    );

    let now = utc_now!();
    let eligible: Vec<Account> = accounts
        .into_iter()
        .filter(|account| deps.status.is_eligible(user_id, account.id, now))
        .collect();
    if eligible.is_empty() {
        return Ok(());
    }

    let tick_deps = deps.clone();
    let results = run_with_limit(deps.concurrency, eligible, move |account| {
        let deps = tick_deps.clone();
        async move { Ok(poll_account(&deps, &account).await) }
    })
    .await?;

    let total_new: usize = results.into_iter().sum();
    if total_new > 0 {
        debug!("user {user_id}: +{total_new} new message(s)");
    }
    Ok(())
}

/// Fetch one account and record the outcome. Failures are contained
/// here; they never abort the tick for other accounts.
async fn poll_account<R: Repository, F: Fetch>(
    deps: &PollDeps<R, F>,
    account: &Account,
) -> usize {
    match deps.fetcher.fetch(account).await {
        Ok(outcome) => {
            debug!("fetched {} ({})", account.email, outcome.via);
            if deps.status.record_success(deps.user_id, account.id) {
                emit(
                    deps,
                    Event::StreamStarted {
                        account_id: account.id,
                        email: account.email.clone(),
                    },
                )
                .await;
            }
            let mut new_count = 0;
            for message in outcome.messages {
                if let Err(e) = deps.repo.record_incoming(&message).await {
                    warn!("recording message {} for {} failed: {e}", message.uid, account.email);
                }
                emit(deps, Event::MessageReceived(message)).await;
                new_count += 1;
            }
            new_count
        }
        Err(e) => {
            let error = e.to_string();
            if deps.status.record_failure(deps.user_id, account.id, &error) {
                emit(
                    deps,
                    Event::StreamError {
                        account_id: account.id,
                        email: account.email.clone(),
                        error,
                    },
                )
                .await;
            }
            0
        }
    }
}

async fn emit<R, F>(deps: &PollDeps<R, F>, event: Event) {
    // Clone the sender out so no map guard is held across the await.
    let sender = deps.events.get(&deps.user_id).map(|s| s.clone());
    if let Some(sender) = sender {
        if sender.send(event).await.is_err() {
            debug!("event receiver for user {} is gone", deps.user_id);
        }
    }
}
