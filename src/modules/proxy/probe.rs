// Copyright © 2025 mailpool.dev
// Licensed under MailPool License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use crate::modules::proxy::pool::ProxyPool;
use crate::modules::proxy::{Proxy, ProxyKind};
use crate::modules::utils::net::connect_with_optional_proxy;
use std::time::Duration;

/// Fixed well-known endpoint a health probe connects to for each kind.
pub fn probe_target(kind: ProxyKind) -> (&'static str, u16) {
    match kind {
        ProxyKind::Verify => ("imap.gmail.com", 993),
        ProxyKind::Send => ("smtp.gmail.com", 587),
    }
}

#[derive(Clone, Debug)]
pub struct ProbeOutcome {
    pub ok: bool,
    pub detail: String,
}

/// Bare TCP connect through the proxy to the kind's probe target. The
/// connection is dropped immediately; no protocol traffic is exchanged.
pub async fn probe(proxy: &Proxy, kind: ProxyKind, timeout: Duration) -> ProbeOutcome {
    let (target_host, target_port) = probe_target(kind);
    match connect_with_optional_proxy(Some(proxy), target_host, target_port, timeout).await {
        Ok(_) => ProbeOutcome {
            ok: true,
            detail: "OK".into(),
        },
        Err(e) => ProbeOutcome {
            ok: false,
            detail: e.to_string(),
        },
    }
}

/// Probe every loaded proxy of a kind, updating the pool's in-memory
/// health flags. Callers decide whether probe results get persisted.
pub async fn probe_all(
    pool: &ProxyPool,
    kind: ProxyKind,
    timeout: Duration,
) -> Vec<(Proxy, ProbeOutcome)> {
    let mut results = Vec::new();
    for proxy in pool.snapshot(kind) {
        let outcome = probe(&proxy, kind, timeout).await;
        pool.set_health(kind, proxy.id, outcome.ok);
        results.push((proxy, outcome));
    }
    results
}
