// Copyright © 2025 mailpool.dev
// Licensed under MailPool License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use crate::modules::error::code::ErrorCode;
use crate::modules::error::MailPoolResult;
use crate::modules::event::{Event, EventSender};
use crate::modules::proxy::pool::ProxyPool;
use crate::modules::proxy::probe::probe_all;
use crate::modules::proxy::ProxyKind;
use crate::modules::repository::Repository;
use crate::modules::send::render::{render_message, RenderedMessage};
use crate::modules::send::status::{CampaignSnapshot, CampaignState};
use crate::modules::settings::cli::SETTINGS;
use crate::modules::smtp::Mailer;
use crate::raise_error;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use email_address::EmailAddress;
use rand::seq::IndexedRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{info, warn};

pub mod render;
pub mod status;
#[cfg(test)]
mod tests;

/// Pools used when a user has none configured, mirroring the classic
/// marketplace inquiry.
const DEFAULT_SUBJECTS: &[&str] = &["Ist OFFER noch verfügbar?"];
const DEFAULT_TEMPLATES: &[&str] = &["Hi SELLER, ist OFFER noch verfügbar?"];

/// One verified campaign target, in verification order.
#[derive(Clone, Debug, Default, Eq, PartialEq, Deserialize, Serialize)]
pub struct Recipient {
    pub email: String,
    pub seller_name: String,
    pub item_title: String,
}

pub(crate) struct CampaignDeps<R, M> {
    pub user_id: u64,
    pub repo: Arc<R>,
    pub mailer: Arc<M>,
    pub proxies: Arc<ProxyPool>,
    pub events: EventSender,
}

/// At most one live campaign per user. Finished statuses stay readable
/// until the next campaign replaces them.
#[derive(Default)]
pub(crate) struct CampaignRegistry {
    statuses: DashMap<u64, Arc<CampaignState>>,
    tasks: DashMap<u64, JoinHandle<()>>,
}

impl CampaignRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn start<R: Repository, M: Mailer>(
        &self,
        deps: CampaignDeps<R, M>,
        recipients: Vec<Recipient>,
    ) -> MailPoolResult<Arc<CampaignState>> {
        for recipient in &recipients {
            if !EmailAddress::is_valid(&recipient.email) {
                return Err(raise_error!(
                    format!("invalid recipient address '{}'", recipient.email),
                    ErrorCode::InvalidParameter
                ));
            }
        }

        let user_id = deps.user_id;
        let state = Arc::new(CampaignState::new(recipients.len() as u32));
        match self.statuses.entry(user_id) {
            Entry::Occupied(mut entry) => {
                if entry.get().is_running() {
                    return Err(raise_error!(
                        format!("a campaign is already running for user {user_id}"),
                        ErrorCode::AlreadyExists
                    ));
                }
                entry.insert(state.clone());
            }
            Entry::Vacant(entry) => {
                entry.insert(state.clone());
            }
        }

        let handle = tokio::spawn(run_campaign(deps, state.clone(), recipients));
        self.tasks.insert(user_id, handle);
        Ok(state)
    }

    /// Ask the running campaign to stop after the current recipient.
    /// Returns false when nothing is running.
    pub(crate) fn cancel(&self, user_id: u64) -> bool {
        match self.statuses.get(&user_id) {
            Some(state) if state.is_running() => {
                state.request_cancel();
                true
            }
            _ => false,
        }
    }

    pub(crate) fn status(&self, user_id: u64) -> Option<CampaignSnapshot> {
        self.statuses.get(&user_id).map(|s| s.snapshot())
    }

    pub(crate) async fn await_termination(&self, user_id: u64) {
        if let Some((_, handle)) = self.tasks.remove(&user_id) {
            let _ = handle.await;
        }
    }
}

fn pick(pool: &[String], fallback: &'static [&'static str]) -> String {
    let mut rng = rand::rng();
    if pool.is_empty() {
        fallback.choose(&mut rng).copied().unwrap_or_default().to_string()
    } else {
        pool.choose(&mut rng).cloned().unwrap_or_default()
    }
}

async fn run_campaign<R: Repository, M: Mailer>(
    deps: CampaignDeps<R, M>,
    state: Arc<CampaignState>,
    recipients: Vec<Recipient>,
) {
    let user_id = deps.user_id;
    info!("Campaign for user {user_id} started: {} recipient(s)", recipients.len());

    match deps.repo.list_proxies(user_id, ProxyKind::Send).await {
        Ok(list) => deps.proxies.replace(ProxyKind::Send, list),
        Err(e) => warn!("loading send proxies for user {user_id} failed: {e}"),
    }

    // Quick connectivity check of the send pool before the first mail.
    let probe_timeout = Duration::from_secs(SETTINGS.mailpool_probe_timeout_secs);
    let unhealthy: Vec<String> = probe_all(&deps.proxies, ProxyKind::Send, probe_timeout)
        .await
        .into_iter()
        .filter(|(_, outcome)| !outcome.ok)
        .map(|(proxy, _)| proxy.label())
        .collect();
    let _ = deps.events.send(Event::SendProxyReport { unhealthy }).await;

    let (delay_min, delay_max) = deps.repo.send_delay_range(user_id).await.unwrap_or((
        SETTINGS.mailpool_send_delay_min,
        SETTINGS.mailpool_send_delay_max,
    ));
    // An inverted range from configuration degrades to a fixed delay.
    let delay_max = delay_max.max(delay_min);
    let subjects = deps.repo.list_subjects(user_id).await.unwrap_or_default();
    let templates = deps.repo.list_templates(user_id).await.unwrap_or_default();

    for recipient in recipients {
        if state.is_cancelled() {
            break;
        }

        let subject_template = pick(&subjects, DEFAULT_SUBJECTS);
        let body_template = pick(&templates, DEFAULT_TEMPLATES);
        let rendered = render_message(
            &subject_template,
            &body_template,
            &recipient.seller_name,
            &recipient.item_title,
        );

        match send_one(&deps, &recipient, &rendered).await {
            Ok(()) => {
                state.add_sent();
                let _ = deps
                    .events
                    .send(Event::SendSucceeded {
                        recipient: recipient.email.clone(),
                        subject: rendered.subject,
                        body_for_log: rendered.body_for_log,
                    })
                    .await;
            }
            Err(e) => {
                warn!("sending to {} failed: {e}", recipient.email);
                state.add_failed();
                let _ = deps
                    .events
                    .send(Event::SendFailed {
                        recipient: recipient.email.clone(),
                    })
                    .await;
            }
        }

        // Pacing is the anti-abuse mechanism: it applies after every
        // recipient regardless of outcome.
        let delay = {
            let mut rng = rand::rng();
            rng.random_range(delay_min as f64..=delay_max as f64)
        };
        tokio::time::sleep(Duration::from_secs_f64(delay)).await;
    }

    let was_cancelled = state.is_cancelled();
    if state.finish() {
        let snapshot = state.snapshot();
        info!(
            "Campaign for user {user_id} {}: sent={} failed={} total={}",
            if was_cancelled { "stopped" } else { "completed" },
            snapshot.sent,
            snapshot.failed,
            snapshot.total
        );
        let _ = deps
            .events
            .send(Event::CampaignFinished {
                sent: snapshot.sent,
                failed: snapshot.failed,
                total: snapshot.total,
                was_cancelled,
            })
            .await;
    }
}

/// One transmission attempt. Missing resources and transport failures
/// both count as a failed recipient; neither is retried.
async fn send_one<R: Repository, M: Mailer>(
    deps: &CampaignDeps<R, M>,
    recipient: &Recipient,
    rendered: &RenderedMessage,
) -> MailPoolResult<()> {
    let accounts = deps.repo.list_enabled_accounts(deps.user_id).await?;
    let account = {
        let mut rng = rand::rng();
        accounts.choose(&mut rng).cloned()
    };
    let Some(account) = account else {
        return Err(raise_error!(
            "no enabled account available".into(),
            ErrorCode::ResourceUnavailable
        ));
    };
    let Some(proxy) = deps.proxies.next(ProxyKind::Send) else {
        return Err(raise_error!(
            "no send proxy available".into(),
            ErrorCode::ResourceUnavailable
        ));
    };

    deps.mailer
        .send(
            &account,
            &proxy,
            &recipient.email,
            &rendered.subject,
            &rendered.body,
        )
        .await
}
