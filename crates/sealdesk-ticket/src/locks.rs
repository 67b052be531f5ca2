// SPDX-FileCopyrightText: 2026 Sealdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-ticket advisory locks.
//!
//! Two simultaneous close clicks on the same ticket must not both run the
//! sealing pipeline. The database commit is already race-safe (a conditional
//! update), but without a lock the loser would still paginate history, fetch
//! attachments, and write an orphan archive before losing. The lock makes
//! the second attempt wait and then fail fast on the already-closed check.

use std::sync::Arc;

use dashmap::DashMap;
use sealdesk_core::TicketId;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// In-process advisory lock table keyed by ticket id.
///
/// Entries are created on first acquisition and kept for the life of the
/// process; each is a few dozen bytes and a ticket is only ever closed once.
#[derive(Clone, Default)]
pub struct TicketLocks {
    inner: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl TicketLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the lock for one ticket, waiting if another task holds it.
    pub async fn acquire(&self, id: &TicketId) -> OwnedMutexGuard<()> {
        let lock = self
            .inner
            .entry(id.as_str().to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        lock.lock_owned().await
    }
}
