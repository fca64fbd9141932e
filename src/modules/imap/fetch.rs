// Copyright © 2025 mailpool.dev
// Licensed under MailPool License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use crate::modules::account::Account;
use crate::modules::error::code::ErrorCode;
use crate::modules::error::MailPoolResult;
use crate::modules::imap::body::extract_plain_body;
use crate::modules::imap::client::Client;
use crate::modules::imap::host::{resolve_imap_host, IMAP_PORT_SSL};
use crate::modules::imap::session::SessionStream;
use crate::modules::imap::FetchedMessage;
use crate::modules::proxy::pool::ProxyPool;
use crate::modules::proxy::ProxyKind;
use crate::modules::repository::Repository;
use crate::modules::settings::cli::SETTINGS;
use crate::modules::status::StatusStore;
use crate::{raise_error, utc_now};
use async_imap::Session as ImapSession;
use futures::TryStreamExt;
use mail_parser::{Message, MessageParser};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Result of one account's inbox pass.
#[derive(Debug)]
pub struct FetchOutcome {
    pub messages: Vec<FetchedMessage>,
    pub connected: bool,
    /// Human-readable route description ("via verify host:port" / "direct").
    pub via: String,
}

/// Seam between the poll scheduler and the real IMAP fetcher.
pub(crate) trait Fetch: Send + Sync + 'static {
    fn fetch(&self, account: &Account) -> impl Future<Output = MailPoolResult<FetchOutcome>> + Send;
}

/// How a mailbox connection was obtained. Direct fallback is a first-class
/// branch here, not a caught exception.
pub(crate) enum ConnectOutcome {
    Proxied { client: Client, via: String },
    Direct { client: Client },
}

impl ConnectOutcome {
    fn via(&self) -> String {
        match self {
            ConnectOutcome::Proxied { via, .. } => via.clone(),
            ConnectOutcome::Direct { .. } => "direct".to_string(),
        }
    }

    fn into_client(self) -> Client {
        match self {
            ConnectOutcome::Proxied { client, .. } => client,
            ConnectOutcome::Direct { client } => client,
        }
    }
}

/// Try up to `attempts` rotated verify proxies, falling back to a direct
/// connection unless strict mode forbids it.
pub(crate) async fn connect_with_rotation(
    pool: &ProxyPool,
    host: &str,
    port: u16,
    attempts: usize,
    strict: bool,
    timeout: Duration,
) -> MailPoolResult<ConnectOutcome> {
    let mut last_err = None;
    for attempt in 0..attempts.max(1) {
        let Some(proxy) = pool.next(ProxyKind::Verify) else {
            break;
        };
        match Client::connect(host, port, Some(&proxy), timeout).await {
            Ok(client) => {
                return Ok(ConnectOutcome::Proxied {
                    client,
                    via: format!("via verify {} (try {})", proxy.label(), attempt + 1),
                })
            }
            Err(e) => {
                debug!("verify proxy {} failed for {host}: {e}", proxy.label());
                last_err = Some(e);
                // Give a rotating proxy time to move to a fresh egress IP.
                tokio::time::sleep(Duration::from_millis(250 + 250 * attempt as u64)).await;
            }
        }
    }

    if strict {
        let detail = last_err
            .map(|e| e.to_string())
            .unwrap_or_else(|| "no verify proxy configured".to_string());
        return Err(raise_error!(
            format!("verify proxy required but unavailable: {detail}"),
            ErrorCode::ProxyExhausted
        ));
    }

    let client = Client::connect(host, port, None, timeout).await?;
    Ok(ConnectOutcome::Direct { client })
}

async fn login_and_select(
    client: Client,
    account: &Account,
) -> MailPoolResult<ImapSession<Box<dyn SessionStream>>> {
    let mut session = client.login(&account.email, &account.password).await?;
    session.select("INBOX").await.map_err(|e| match e {
        async_imap::error::Error::Io(e) => raise_error!(e.to_string(), ErrorCode::NetworkError),
        e => raise_error!(format!("{:#?}", e), ErrorCode::ImapCommandFailed),
    })?;
    Ok(session)
}

async fn mark_seen(
    session: &mut ImapSession<Box<dyn SessionStream>>,
    uid_set: &str,
) -> MailPoolResult<()> {
    let updates = session
        .uid_store(uid_set, "+FLAGS (\\Seen)")
        .await
        .map_err(|e| raise_error!(format!("{:#?}", e), ErrorCode::ImapCommandFailed))?;
    updates
        .try_collect::<Vec<_>>()
        .await
        .map_err(|e| raise_error!(format!("{:#?}", e), ErrorCode::ImapCommandFailed))?;
    Ok(())
}

async fn fetch_raw_message(
    session: &mut ImapSession<Box<dyn SessionStream>>,
    uid: u32,
) -> MailPoolResult<Option<Vec<u8>>> {
    let stream = session
        .uid_fetch(uid.to_string(), "(RFC822)")
        .await
        .map_err(|e| raise_error!(format!("{:#?}", e), ErrorCode::ImapCommandFailed))?;
    let fetches = stream
        .try_collect::<Vec<_>>()
        .await
        .map_err(|e| raise_error!(format!("{:#?}", e), ErrorCode::ImapCommandFailed))?;
    Ok(fetches.into_iter().find_map(|f| f.body().map(|b| b.to_vec())))
}

/// Whether this pass must silently swallow the mailbox backlog: only on
/// an account's consumed first-pass flag, only while nothing was ever
/// recorded for it, and only when there is a backlog to swallow.
pub(crate) fn should_suppress_backlog(
    first_pass: bool,
    has_recorded: bool,
    unseen_count: usize,
) -> bool {
    first_pass && !has_recorded && unseen_count > 0
}

fn sender_of(message: &Message<'_>) -> (String, String) {
    match message.from().and_then(|a| a.first()) {
        Some(addr) => (
            addr.name.as_ref().map(|s| s.to_string()).unwrap_or_default(),
            addr.address
                .as_ref()
                .map(|s| s.to_string())
                .unwrap_or_default(),
        ),
        None => (String::new(), String::new()),
    }
}

/// The real fetcher: proxied connect with rotation, login/select with one
/// transport-failure retry cycle, UNSEEN listing with one-shot backlog
/// suppression, full fetch + parse + mark-seen per message.
pub(crate) struct ImapFetcher<R> {
    user_id: u64,
    repo: Arc<R>,
    proxies: Arc<ProxyPool>,
    status: Arc<StatusStore>,
}

impl<R: Repository> ImapFetcher<R> {
    pub(crate) fn new(
        user_id: u64,
        repo: Arc<R>,
        proxies: Arc<ProxyPool>,
        status: Arc<StatusStore>,
    ) -> Self {
        Self {
            user_id,
            repo,
            proxies,
            status,
        }
    }

    async fn read_unseen(
        &self,
        session: &mut ImapSession<Box<dyn SessionStream>>,
        account: &Account,
    ) -> MailPoolResult<Vec<FetchedMessage>> {
        let unseen = session
            .uid_search("UNSEEN")
            .await
            .map_err(|e| raise_error!(format!("{:#?}", e), ErrorCode::ImapCommandFailed))?;
        let mut unseen: Vec<u32> = unseen.into_iter().collect();
        unseen.sort_unstable();

        if self.status.consume_first_pass(self.user_id, account.id) {
            let has_any = self.repo.has_recorded_messages(account.id).await?;
            if should_suppress_backlog(true, has_any, unseen.len()) {
                let set = unseen
                    .iter()
                    .map(|u| u.to_string())
                    .collect::<Vec<_>>()
                    .join(",");
                mark_seen(session, &set).await?;
                debug!(
                    "Swallowed {} backlog message(s) on first pass of {}",
                    unseen.len(),
                    account.email
                );
                return Ok(Vec::new());
            }
        }

        let mut messages = Vec::with_capacity(unseen.len());
        for uid in unseen {
            let raw = match fetch_raw_message(session, uid).await {
                Ok(Some(raw)) => raw,
                Ok(None) => continue,
                Err(e) => {
                    debug!("UID FETCH {uid} failed for {}: {e}", account.email);
                    continue;
                }
            };
            // Flag before parsing so the message never comes back as
            // unseen, even if it turns out to be unparsable.
            if let Err(e) = mark_seen(session, &uid.to_string()).await {
                debug!("UID STORE {uid} failed for {}: {e}", account.email);
            }
            let Some(parsed) = MessageParser::new().parse(raw.as_slice()) else {
                continue;
            };
            let (from_name, from_address) = sender_of(&parsed);
            messages.push(FetchedMessage {
                account_id: account.id,
                account_email: account.email.clone(),
                uid: uid.to_string(),
                from_name,
                from_address,
                subject: parsed.subject().unwrap_or_default().to_string(),
                body: extract_plain_body(&parsed),
                received_at: utc_now!(),
            });
        }
        Ok(messages)
    }
}

impl<R: Repository> Fetch for ImapFetcher<R> {
    async fn fetch(&self, account: &Account) -> MailPoolResult<FetchOutcome> {
        let host = resolve_imap_host(&account.email);
        let timeout = Duration::from_secs(SETTINGS.mailpool_imap_timeout_secs);
        let attempts = SETTINGS.mailpool_connect_attempts;
        let strict = self.repo.strict_verify_mode(self.user_id).await?;

        let outcome =
            connect_with_rotation(&self.proxies, &host, IMAP_PORT_SSL, attempts, strict, timeout)
                .await?;
        let mut via = outcome.via();
        let mut session = match login_and_select(outcome.into_client(), account).await {
            Ok(session) => session,
            Err(e) if e.is_transport() => {
                // The tunnel died during the handshake; one more rotation
                // cycle may land on a healthier egress.
                debug!("login/select on {} failed ({e}), rotating once more", account.email);
                let outcome =
                    connect_with_rotation(&self.proxies, &host, IMAP_PORT_SSL, 2, strict, timeout)
                        .await?;
                via = outcome.via();
                login_and_select(outcome.into_client(), account).await?
            }
            Err(e) => return Err(e),
        };

        let result = self.read_unseen(&mut session, account).await;
        // Close the connection cleanly regardless of outcome.
        let _ = session.logout().await;
        result.map(|messages| FetchOutcome {
            messages,
            connected: true,
            via,
        })
    }
}
