// SPDX-FileCopyrightText: 2026 Sealdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared application context handed to every interaction handler.

use std::sync::Arc;
use std::time::Duration;

use sealdesk_config::SealdeskConfig;
use sealdesk_core::{ChatGateway, SealdeskError, TicketStore};

use crate::locks::TicketLocks;

/// Everything a handler needs, injected once at startup.
///
/// Cheap to clone; all fields are shared handles. Handlers never construct
/// their own clients or stores, so tests can substitute in-memory doubles
/// for every external surface.
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<SealdeskConfig>,
    pub store: Arc<dyn TicketStore>,
    pub gateway: Arc<dyn ChatGateway>,
    /// HTTP client used for attachment downloads. Carries the fetch timeout
    /// so one stalled CDN cannot hang a close indefinitely.
    pub http: reqwest::Client,
    /// Per-ticket advisory locks serializing concurrent close attempts.
    pub close_locks: TicketLocks,
}

impl AppContext {
    pub fn new(
        config: Arc<SealdeskConfig>,
        store: Arc<dyn TicketStore>,
        gateway: Arc<dyn ChatGateway>,
    ) -> Result<Self, SealdeskError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| SealdeskError::Internal(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            config,
            store,
            gateway,
            http,
            close_locks: TicketLocks::new(),
        })
    }
}
