// Copyright © 2025 mailpool.dev
// Licensed under MailPool License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use dashmap::DashMap;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::info;

pub mod scheduler;

pub(crate) struct PollHandle {
    cancel: oneshot::Sender<()>,
    join: JoinHandle<()>,
}

impl PollHandle {
    pub(crate) fn new(cancel: oneshot::Sender<()>, join: JoinHandle<()>) -> Self {
        Self { cancel, join }
    }
}

/// At most one poll loop per user. Start/stop pass through here so a
/// crashed or cancelled loop can always be replaced.
#[derive(Default)]
pub(crate) struct PollRegistry {
    loops: DashMap<u64, PollHandle>,
}

impl PollRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn is_running(&self, user_id: u64) -> bool {
        self.loops
            .get(&user_id)
            .map(|handle| !handle.join.is_finished())
            .unwrap_or(false)
    }

    pub(crate) fn insert(&self, user_id: u64, handle: PollHandle) {
        self.loops.insert(user_id, handle);
    }

    /// Cancel the user's loop and wait for it to exit. Returns false when
    /// no loop was registered.
    pub(crate) async fn stop(&self, user_id: u64) -> bool {
        let Some((_, handle)) = self.loops.remove(&user_id) else {
            return false;
        };
        let _ = handle.cancel.send(());
        let _ = handle.join.await;
        info!("Poll loop for user {user_id} terminated");
        true
    }
}
