// SPDX-FileCopyrightText: 2026 Sealdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Interaction handler registry.
//!
//! Component interactions carry a custom id of the form `<key>:<argument>`
//! (for example `close:<ticket id>` or `open:<topic id>`). The registry maps
//! the key prefix to a typed handler, replacing string-matched dispatch with
//! a table populated once at startup.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use sealdesk_core::{InteractionEvent, SealdeskError};
use tracing::warn;

use crate::context::AppContext;

/// One interaction handler, registered under a fixed custom-id key.
#[async_trait]
pub trait InteractionHandler: Send + Sync {
    /// The custom-id prefix this handler owns.
    fn key(&self) -> &'static str;

    /// Handle one interaction. `argument` is the part of the custom id
    /// after the key separator, empty when absent.
    async fn handle(
        &self,
        ctx: &AppContext,
        event: &InteractionEvent,
        argument: &str,
    ) -> Result<(), SealdeskError>;
}

/// Registry of interaction handlers, indexed by custom-id key.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: BTreeMap<&'static str, Arc<dyn InteractionHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler under its key. A later registration with the same
    /// key replaces the earlier one.
    pub fn register(&mut self, handler: Arc<dyn InteractionHandler>) {
        self.handlers.insert(handler.key(), handler);
    }

    pub fn get(&self, key: &str) -> Option<Arc<dyn InteractionHandler>> {
        self.handlers.get(key).cloned()
    }

    /// Registered keys, in sorted order.
    pub fn keys(&self) -> Vec<&'static str> {
        self.handlers.keys().copied().collect()
    }

    /// Route one interaction event to its handler.
    ///
    /// Unknown keys are logged and ignored: the platform may deliver
    /// interactions for components this process never registered (stale
    /// messages, other bots' components forwarded in error).
    pub async fn dispatch(
        &self,
        ctx: &AppContext,
        event: &InteractionEvent,
    ) -> Result<(), SealdeskError> {
        let (key, argument) = match event.custom_id.split_once(':') {
            Some((key, argument)) => (key, argument),
            None => (event.custom_id.as_str(), ""),
        };
        match self.get(key) {
            Some(handler) => handler.handle(ctx, event, argument).await,
            None => {
                warn!(custom_id = %event.custom_id, "no handler for interaction");
                Ok(())
            }
        }
    }
}
