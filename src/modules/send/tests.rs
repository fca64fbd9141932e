use super::*;
use crate::modules::account::Account;
use crate::modules::error::MailPoolResult;
use crate::modules::proxy::Proxy;
use crate::modules::repository::memory::MemoryRepository;
use crate::modules::send::render::render_message;
use std::sync::Mutex;
use tokio::sync::mpsc;
use tokio::time::Instant;

// ---- rendering ----

#[test]
fn placeholders_are_substituted() {
    let rendered = render_message(
        "Ist {OFFER} noch verfügbar?",
        "Hi SELLER,\ninteressiere mich für {ITEM}.",
        "Anna",
        "Sofa",
    );
    assert_eq!(rendered.subject, "Ist Sofa noch verfügbar?");
    assert_eq!(rendered.body, "Hi Anna,\ninteressiere mich für Sofa.");
}

#[test]
fn missing_seller_becomes_empty() {
    let rendered = render_message("Frage", "Hi SELLER, alles klar?", "", "");
    assert_eq!(rendered.body, "Hi , alles klar?");
}

#[test]
fn offer_opening_line_is_stripped_from_log_copy_only() {
    let rendered = render_message(
        "Anfrage",
        "\nIst OFFER noch da?\nViele Grüße",
        "Anna",
        "Sofa",
    );
    assert_eq!(rendered.body, "\nIst Sofa noch da?\nViele Grüße");
    assert_eq!(rendered.body_for_log, "Viele Grüße");
}

#[test]
fn non_offer_opening_line_is_kept() {
    let rendered = render_message("Anfrage", "Hallo SELLER\nIst OFFER noch da?", "Anna", "Sofa");
    assert_eq!(rendered.body_for_log, rendered.body);
}

#[test]
fn subject_is_trimmed() {
    let rendered = render_message("  Hallo {SELLER}  ", "x", "Anna", "");
    assert_eq!(rendered.subject, "Hallo Anna");
}

// ---- campaign loop ----

struct StubMailer {
    sends: Mutex<Vec<(String, Instant)>>,
    fail_for: Vec<String>,
}

impl StubMailer {
    fn new() -> Self {
        Self {
            sends: Mutex::new(Vec::new()),
            fail_for: Vec::new(),
        }
    }

    fn failing_for(addresses: &[&str]) -> Self {
        Self {
            sends: Mutex::new(Vec::new()),
            fail_for: addresses.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn sent(&self) -> Vec<(String, Instant)> {
        self.sends.lock().unwrap().clone()
    }
}

impl Mailer for StubMailer {
    async fn send(
        &self,
        _account: &Account,
        _proxy: &Proxy,
        recipient: &str,
        _subject: &str,
        _body: &str,
    ) -> MailPoolResult<()> {
        self.sends
            .lock()
            .unwrap()
            .push((recipient.to_string(), Instant::now()));
        if self.fail_for.iter().any(|f| f == recipient) {
            return Err(raise_error!(
                "stub transmission failure".into(),
                ErrorCode::SmtpCommandFailed
            ));
        }
        Ok(())
    }
}

const USER: u64 = 1;

fn repo_with_account_and_proxy() -> MemoryRepository {
    let repo = MemoryRepository::new();
    repo.add_account(Account {
        id: 1,
        user_id: USER,
        email: "pool@example.org".into(),
        password: "secret".into(),
        display_name: Some("Pool".into()),
        enabled: true,
    });
    repo.add_proxy(Proxy {
        id: 1,
        user_id: USER,
        host: "127.0.0.1".into(),
        port: 9,
        username: None,
        password: None,
        kind: ProxyKind::Send,
        healthy: true,
    });
    repo
}

fn recipient(email: &str) -> Recipient {
    Recipient {
        email: email.into(),
        seller_name: "Anna".into(),
        item_title: "Sofa".into(),
    }
}

struct Harness {
    registry: CampaignRegistry,
    mailer: Arc<StubMailer>,
    events: mpsc::Receiver<Event>,
}

fn launch(
    repo: MemoryRepository,
    mailer: StubMailer,
    recipients: Vec<Recipient>,
) -> MailPoolResult<Harness> {
    let (tx, rx) = mpsc::channel(256);
    let mailer = Arc::new(mailer);
    let registry = CampaignRegistry::new();
    let deps = CampaignDeps {
        user_id: USER,
        repo: Arc::new(repo),
        mailer: mailer.clone(),
        proxies: Arc::new(ProxyPool::new()),
        events: tx,
    };
    registry.start(deps, recipients)?;
    Ok(Harness {
        registry,
        mailer,
        events: rx,
    })
}

fn drain(events: &mut mpsc::Receiver<Event>) -> Vec<Event> {
    let mut out = Vec::new();
    while let Ok(event) = events.try_recv() {
        out.push(event);
    }
    out
}

#[tokio::test(start_paused = true)]
async fn recipients_are_processed_in_order() {
    let repo = repo_with_account_and_proxy();
    repo.set_send_delay_range(USER, 0, 0);

    let mut harness = launch(
        repo,
        StubMailer::new(),
        vec![recipient("a@example.org"), recipient("b@example.org"), recipient("c@example.org")],
    )
    .unwrap();
    harness.registry.await_termination(USER).await;

    let order: Vec<String> = harness.mailer.sent().into_iter().map(|(to, _)| to).collect();
    assert_eq!(order, vec!["a@example.org", "b@example.org", "c@example.org"]);

    let events = drain(&mut harness.events);
    let succeeded = events
        .iter()
        .filter(|e| matches!(e, Event::SendSucceeded { .. }))
        .count();
    assert_eq!(succeeded, 3);
    assert!(matches!(
        events.last(),
        Some(Event::CampaignFinished {
            sent: 3,
            failed: 0,
            total: 3,
            was_cancelled: false
        })
    ));

    let snapshot = harness.registry.status(USER).unwrap();
    assert!(!snapshot.running);
    assert_eq!(snapshot.sent, 3);
}

#[tokio::test(start_paused = true)]
async fn cancellation_stops_after_current_recipient() {
    let repo = repo_with_account_and_proxy();
    repo.set_send_delay_range(USER, 1, 1);

    let mut harness = launch(
        repo,
        StubMailer::new(),
        vec![recipient("a@example.org"), recipient("b@example.org"), recipient("c@example.org")],
    )
    .unwrap();

    // Wait for the first transmission, then pull the plug.
    loop {
        match harness.events.recv().await.expect("campaign died silently") {
            Event::SendSucceeded { .. } => break,
            _ => continue,
        }
    }
    assert!(harness.registry.cancel(USER));
    harness.registry.await_termination(USER).await;

    assert_eq!(harness.mailer.sent().len(), 1);
    let events = drain(&mut harness.events);
    assert!(matches!(
        events.last(),
        Some(Event::CampaignFinished {
            sent: 1,
            failed: 0,
            total: 3,
            was_cancelled: true
        })
    ));
}

#[tokio::test(start_paused = true)]
async fn pacing_respects_the_configured_minimum() {
    let repo = repo_with_account_and_proxy();
    repo.set_send_delay_range(USER, 3, 6);

    let mut harness = launch(
        repo,
        StubMailer::new(),
        vec![recipient("a@example.org"), recipient("b@example.org"), recipient("c@example.org")],
    )
    .unwrap();
    harness.registry.await_termination(USER).await;
    drain(&mut harness.events);

    let sends = harness.mailer.sent();
    assert_eq!(sends.len(), 3);
    for pair in sends.windows(2) {
        let gap = pair[1].1 - pair[0].1;
        assert!(
            gap >= Duration::from_secs(3),
            "sends only {}ms apart",
            gap.as_millis()
        );
    }
}

#[tokio::test(start_paused = true)]
async fn transmission_failures_count_without_retries() {
    let repo = repo_with_account_and_proxy();
    repo.set_send_delay_range(USER, 0, 0);

    let mut harness = launch(
        repo,
        StubMailer::failing_for(&["b@example.org"]),
        vec![recipient("a@example.org"), recipient("b@example.org"), recipient("c@example.org")],
    )
    .unwrap();
    harness.registry.await_termination(USER).await;

    // The failed recipient was attempted exactly once.
    let attempts: Vec<String> = harness.mailer.sent().into_iter().map(|(to, _)| to).collect();
    assert_eq!(attempts, vec!["a@example.org", "b@example.org", "c@example.org"]);

    let events = drain(&mut harness.events);
    assert!(events
        .iter()
        .any(|e| matches!(e, Event::SendFailed { recipient } if recipient == "b@example.org")));
    assert!(matches!(
        events.last(),
        Some(Event::CampaignFinished {
            sent: 2,
            failed: 1,
            total: 3,
            was_cancelled: false
        })
    ));
}

#[tokio::test(start_paused = true)]
async fn missing_resources_fail_the_recipient() {
    // No enabled accounts and no send proxies at all.
    let repo = MemoryRepository::new();
    repo.set_send_delay_range(USER, 0, 0);

    let mut harness = launch(repo, StubMailer::new(), vec![recipient("a@example.org")]).unwrap();
    harness.registry.await_termination(USER).await;

    assert!(harness.mailer.sent().is_empty());
    let events = drain(&mut harness.events);
    assert!(matches!(
        events.last(),
        Some(Event::CampaignFinished {
            sent: 0,
            failed: 1,
            total: 1,
            was_cancelled: false
        })
    ));
}

#[tokio::test(start_paused = true)]
async fn second_start_is_rejected_while_running() {
    let repo = repo_with_account_and_proxy();
    repo.set_send_delay_range(USER, 1, 1);
    let repo = Arc::new(repo);

    let (tx, _rx) = mpsc::channel(256);
    let registry = CampaignRegistry::new();
    let mailer = Arc::new(StubMailer::new());
    let proxies = Arc::new(ProxyPool::new());

    registry
        .start(
            CampaignDeps {
                user_id: USER,
                repo: repo.clone(),
                mailer: mailer.clone(),
                proxies: proxies.clone(),
                events: tx.clone(),
            },
            vec![recipient("a@example.org"), recipient("b@example.org")],
        )
        .unwrap();

    let err = registry
        .start(
            CampaignDeps {
                user_id: USER,
                repo: repo.clone(),
                mailer: mailer.clone(),
                proxies: proxies.clone(),
                events: tx.clone(),
            },
            vec![recipient("c@example.org")],
        )
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::AlreadyExists);

    registry.await_termination(USER).await;

    // Once finished, a new campaign may start.
    registry
        .start(
            CampaignDeps {
                user_id: USER,
                repo,
                mailer,
                proxies,
                events: tx,
            },
            vec![recipient("c@example.org")],
        )
        .unwrap();
    registry.await_termination(USER).await;
}

#[tokio::test(start_paused = true)]
async fn malformed_recipient_is_rejected_up_front() {
    let repo = repo_with_account_and_proxy();
    let err = match launch(repo, StubMailer::new(), vec![recipient("not-an-address")]) {
        Err(e) => e,
        Ok(_) => panic!("expected the campaign start to be rejected"),
    };
    assert_eq!(err.code(), ErrorCode::InvalidParameter);
}
