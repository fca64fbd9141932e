// Copyright © 2025 mailpool.dev
// Licensed under MailPool License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use crate::modules::proxy::{Proxy, ProxyKind};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;

/// Two typed proxy lists with a shared round-robin cursor per kind.
///
/// The cursor survives list replacement; selection indexes modulo the
/// current list length, so rotation keeps advancing across reloads.
#[derive(Debug, Default)]
pub struct ProxyPool {
    verify: RwLock<Vec<Proxy>>,
    send: RwLock<Vec<Proxy>>,
    verify_cursor: AtomicUsize,
    send_cursor: AtomicUsize,
}

impl ProxyPool {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, kind: ProxyKind) -> (&RwLock<Vec<Proxy>>, &AtomicUsize) {
        match kind {
            ProxyKind::Verify => (&self.verify, &self.verify_cursor),
            ProxyKind::Send => (&self.send, &self.send_cursor),
        }
    }

    /// Swap in a freshly loaded list for one kind.
    pub fn replace(&self, kind: ProxyKind, proxies: Vec<Proxy>) {
        let (list, _) = self.slot(kind);
        *list.write().expect("proxy list lock poisoned") = proxies;
    }

    /// Round-robin selection; `None` when no proxy of this kind is loaded.
    pub fn next(&self, kind: ProxyKind) -> Option<Proxy> {
        let (list, cursor) = self.slot(kind);
        let list = list.read().expect("proxy list lock poisoned");
        if list.is_empty() {
            return None;
        }
        let idx = cursor.fetch_add(1, Ordering::Relaxed) % list.len();
        Some(list[idx].clone())
    }

    pub fn len(&self, kind: ProxyKind) -> usize {
        let (list, _) = self.slot(kind);
        list.read().expect("proxy list lock poisoned").len()
    }

    pub fn is_empty(&self, kind: ProxyKind) -> bool {
        self.len(kind) == 0
    }

    pub fn snapshot(&self, kind: ProxyKind) -> Vec<Proxy> {
        let (list, _) = self.slot(kind);
        list.read().expect("proxy list lock poisoned").clone()
    }

    /// Record a probe result on the in-memory entry. No-op for unknown ids.
    pub fn set_health(&self, kind: ProxyKind, proxy_id: u64, healthy: bool) {
        let (list, _) = self.slot(kind);
        let mut list = list.write().expect("proxy list lock poisoned");
        if let Some(proxy) = list.iter_mut().find(|p| p.id == proxy_id) {
            proxy.healthy = healthy;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn proxy(id: u64, kind: ProxyKind) -> Proxy {
        Proxy {
            id,
            user_id: 1,
            host: format!("10.0.0.{id}"),
            port: 1080,
            username: None,
            password: None,
            kind,
            healthy: true,
        }
    }

    #[test]
    fn rotation_wraps_in_order() {
        let pool = ProxyPool::new();
        pool.replace(
            ProxyKind::Verify,
            vec![
                proxy(1, ProxyKind::Verify),
                proxy(2, ProxyKind::Verify),
                proxy(3, ProxyKind::Verify),
            ],
        );

        let picked: Vec<u64> = (0..6).map(|_| pool.next(ProxyKind::Verify).unwrap().id).collect();
        assert_eq!(picked, vec![1, 2, 3, 1, 2, 3]);
    }

    #[test]
    fn empty_pool_yields_none() {
        let pool = ProxyPool::new();
        assert!(pool.next(ProxyKind::Send).is_none());
        assert!(pool.is_empty(ProxyKind::Send));
    }

    #[test]
    fn kinds_rotate_independently() {
        let pool = ProxyPool::new();
        pool.replace(ProxyKind::Verify, vec![proxy(1, ProxyKind::Verify)]);
        pool.replace(
            ProxyKind::Send,
            vec![proxy(10, ProxyKind::Send), proxy(11, ProxyKind::Send)],
        );

        assert_eq!(pool.next(ProxyKind::Verify).unwrap().id, 1);
        assert_eq!(pool.next(ProxyKind::Send).unwrap().id, 10);
        assert_eq!(pool.next(ProxyKind::Send).unwrap().id, 11);
        assert_eq!(pool.next(ProxyKind::Verify).unwrap().id, 1);
        assert_eq!(pool.next(ProxyKind::Send).unwrap().id, 10);
    }

    #[test]
    fn cursor_survives_replace() {
        let pool = ProxyPool::new();
        pool.replace(
            ProxyKind::Verify,
            vec![proxy(1, ProxyKind::Verify), proxy(2, ProxyKind::Verify)],
        );
        assert_eq!(pool.next(ProxyKind::Verify).unwrap().id, 1);

        pool.replace(
            ProxyKind::Verify,
            vec![proxy(1, ProxyKind::Verify), proxy(2, ProxyKind::Verify)],
        );
        // Cursor keeps advancing; the next pick is not a restart from 1.
        assert_eq!(pool.next(ProxyKind::Verify).unwrap().id, 2);
    }

    #[test]
    fn health_flag_updates() {
        let pool = ProxyPool::new();
        pool.replace(ProxyKind::Send, vec![proxy(7, ProxyKind::Send)]);
        pool.set_health(ProxyKind::Send, 7, false);
        assert!(!pool.snapshot(ProxyKind::Send)[0].healthy);
    }
}
