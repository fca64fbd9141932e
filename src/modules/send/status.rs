// Copyright © 2025 mailpool.dev
// Licensed under MailPool License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

/// Shared status of one campaign run. Mutated only by the campaign loop
/// (counters) and the cancel caller (flag); readers take snapshots.
#[derive(Debug)]
pub struct CampaignState {
    total: u32,
    running: AtomicBool,
    cancel: AtomicBool,
    sent: AtomicU32,
    failed: AtomicU32,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub struct CampaignSnapshot {
    pub running: bool,
    pub sent: u32,
    pub failed: u32,
    pub total: u32,
    pub cancelled: bool,
}

impl CampaignState {
    pub fn new(total: u32) -> Self {
        Self {
            total,
            running: AtomicBool::new(true),
            cancel: AtomicBool::new(false),
            sent: AtomicU32::new(0),
            failed: AtomicU32::new(0),
        }
    }

    pub fn request_cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::Relaxed)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    pub fn add_sent(&self) {
        self.sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Flip running to false; true only for the caller that did the flip.
    pub fn finish(&self) -> bool {
        self.running.swap(false, Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> CampaignSnapshot {
        CampaignSnapshot {
            running: self.is_running(),
            sent: self.sent.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            total: self.total,
            cancelled: self.is_cancelled(),
        }
    }
}
