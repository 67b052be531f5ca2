// SPDX-FileCopyrightText: 2026 Sealdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory test doubles for the gateway and store.
//!
//! Used by this crate's unit and integration tests. The [`MockGateway`]
//! records every outbound call so tests can assert on ordering and payloads;
//! failure flags let tests force errors at specific pipeline stages.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use sealdesk_config::SealdeskConfig;
use sealdesk_core::{
    ChannelId, ChatGateway, GatewayMessage, InteractionEvent, InteractionToken, MessageId,
    NewTicket, OutboundMessage, SealdeskError, Ticket, TicketId, TicketStore, UserId,
};
use sealdesk_store::SqliteTicketStore;

use crate::context::AppContext;

/// Recording gateway double.
///
/// History is held newest-first, matching the platform's native ordering for
/// `messages_before` pages.
#[derive(Default)]
pub struct MockGateway {
    history: Mutex<Vec<GatewayMessage>>,
    pub history_calls: AtomicUsize,
    pub sent: Mutex<Vec<(ChannelId, OutboundMessage)>>,
    pub responses: Mutex<Vec<(InteractionToken, String)>>,
    pub edits: Mutex<Vec<(InteractionToken, String)>>,
    pub locked: Mutex<Vec<(ChannelId, ChannelId)>>,
    pub deleted: Mutex<Vec<ChannelId>>,
    pub created_threads: Mutex<Vec<(ChannelId, String)>>,
    next_thread: AtomicUsize,
    next_message: AtomicUsize,
    /// Fail every `send_message` call with a gateway error.
    pub fail_send: AtomicBool,
    /// Fail `create_dm` with a gateway error.
    pub fail_dm: AtomicBool,
    /// Fail `lock_thread` with a gateway error.
    pub fail_lock: AtomicBool,
    /// Fail `messages_before` with a gateway error.
    pub fail_history: AtomicBool,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the channel history. `messages` must be newest-first.
    pub fn set_history(&self, messages: Vec<GatewayMessage>) {
        *self.history.lock().unwrap() = messages;
    }

    /// All texts sent as interaction responses, in order.
    pub fn response_texts(&self) -> Vec<String> {
        self.responses
            .lock()
            .unwrap()
            .iter()
            .map(|(_, text)| text.clone())
            .collect()
    }

    /// All texts sent as interaction response edits, in order.
    pub fn edit_texts(&self) -> Vec<String> {
        self.edits
            .lock()
            .unwrap()
            .iter()
            .map(|(_, text)| text.clone())
            .collect()
    }

    /// Messages sent to one channel.
    pub fn sent_to(&self, channel: &ChannelId) -> Vec<OutboundMessage> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|(target, _)| target == channel)
            .map(|(_, message)| message.clone())
            .collect()
    }
}

fn gateway_err(message: &str) -> SealdeskError {
    SealdeskError::Gateway {
        message: message.to_string(),
        source: None,
    }
}

#[async_trait]
impl ChatGateway for MockGateway {
    async fn messages_before(
        &self,
        _channel: &ChannelId,
        limit: usize,
        before: Option<&MessageId>,
    ) -> Result<Vec<GatewayMessage>, SealdeskError> {
        self.history_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_history.load(Ordering::SeqCst) {
            return Err(gateway_err("history unavailable"));
        }
        let history = self.history.lock().unwrap();
        let start = match before {
            None => 0,
            Some(id) => match history.iter().position(|m| &m.id == id) {
                Some(pos) => pos + 1,
                None => history.len(),
            },
        };
        let end = (start + limit).min(history.len());
        Ok(history[start..end].to_vec())
    }

    async fn create_thread(
        &self,
        parent: &ChannelId,
        name: &str,
    ) -> Result<ChannelId, SealdeskError> {
        let n = self.next_thread.fetch_add(1, Ordering::SeqCst);
        let thread = ChannelId(format!("thread-{n}"));
        self.created_threads
            .lock()
            .unwrap()
            .push((parent.clone(), name.to_string()));
        Ok(thread)
    }

    async fn delete_channel(&self, channel: &ChannelId) -> Result<(), SealdeskError> {
        self.deleted.lock().unwrap().push(channel.clone());
        Ok(())
    }

    async fn lock_thread(
        &self,
        channel: &ChannelId,
        parent: &ChannelId,
    ) -> Result<(), SealdeskError> {
        if self.fail_lock.load(Ordering::SeqCst) {
            return Err(gateway_err("cannot lock thread"));
        }
        self.locked
            .lock()
            .unwrap()
            .push((channel.clone(), parent.clone()));
        Ok(())
    }

    async fn send_message(
        &self,
        target: &ChannelId,
        message: &OutboundMessage,
    ) -> Result<MessageId, SealdeskError> {
        if self.fail_send.load(Ordering::SeqCst) {
            return Err(gateway_err("send rejected"));
        }
        self.sent
            .lock()
            .unwrap()
            .push((target.clone(), message.clone()));
        let n = self.next_message.fetch_add(1, Ordering::SeqCst);
        Ok(MessageId(format!("sent-{n}")))
    }

    async fn create_dm(&self, user: &UserId) -> Result<ChannelId, SealdeskError> {
        if self.fail_dm.load(Ordering::SeqCst) {
            return Err(gateway_err("user has DMs disabled"));
        }
        Ok(ChannelId(format!("dm-{user}")))
    }

    async fn respond(
        &self,
        interaction: &InteractionToken,
        text: &str,
    ) -> Result<(), SealdeskError> {
        self.responses
            .lock()
            .unwrap()
            .push((interaction.clone(), text.to_string()));
        Ok(())
    }

    async fn edit_response(
        &self,
        interaction: &InteractionToken,
        text: &str,
    ) -> Result<(), SealdeskError> {
        self.edits
            .lock()
            .unwrap()
            .push((interaction.clone(), text.to_string()));
        Ok(())
    }
}

/// Store wrapper whose close commit always fails with a storage error.
/// Reads and inserts pass through to the wrapped store.
pub struct FailingCommitStore {
    pub inner: Arc<dyn TicketStore>,
}

#[async_trait]
impl TicketStore for FailingCommitStore {
    async fn insert(&self, ticket: &NewTicket) -> Result<(), SealdeskError> {
        self.inner.insert(ticket).await
    }

    async fn fetch(&self, id: &TicketId) -> Result<Option<Ticket>, SealdeskError> {
        self.inner.fetch(id).await
    }

    async fn mark_closed(
        &self,
        _id: &TicketId,
        _closed_by: &UserId,
        _archive_path: &str,
    ) -> Result<bool, SealdeskError> {
        Err(SealdeskError::Storage {
            source: Box::new(std::io::Error::other("database gone away")),
        })
    }

    async fn delete(&self, id: &TicketId) -> Result<(), SealdeskError> {
        self.inner.delete(id).await
    }
}

/// A config pointing at mock channel ids, with one `general` topic.
pub fn test_config(storage_root: &std::path::Path) -> SealdeskConfig {
    let mut config = SealdeskConfig::default();
    config.storage.storage_root = storage_root.display().to_string();
    config.storage.exposed_base_url = "https://transcripts.example.com".to_string();
    config.channels.log_channel = "log-channel".to_string();
    config.channels.thread_channel = "thread-parent".to_string();
    config.topics.insert(
        "general".to_string(),
        sealdesk_core::Topic {
            name: "General Support".to_string(),
            description: "Anything else".to_string(),
            emoji: String::new(),
            questions: vec![sealdesk_core::Question {
                question: "What happened?".to_string(),
                placeholder: String::new(),
            }],
            ping: vec!["staff-role".to_string()],
        },
    );
    config
}

/// A context over in-memory doubles, for tests that never touch disk.
pub async fn test_context() -> AppContext {
    let store = SqliteTicketStore::open_in_memory()
        .await
        .expect("in-memory store");
    context_with(
        test_config(std::path::Path::new("unused")),
        Arc::new(store),
        Arc::new(MockGateway::new()),
    )
}

/// Build a context from explicit parts.
pub fn context_with(
    config: SealdeskConfig,
    store: Arc<dyn TicketStore>,
    gateway: Arc<dyn ChatGateway>,
) -> AppContext {
    AppContext::new(Arc::new(config), store, gateway).expect("test context")
}

/// An interaction event as the platform would deliver it for a component
/// click inside `channel`.
pub fn test_event(custom_id: &str, channel: &ChannelId, user: &UserId) -> InteractionEvent {
    InteractionEvent {
        token: InteractionToken(format!("token-{custom_id}")),
        custom_id: custom_id.to_string(),
        channel_id: channel.clone(),
        user_id: user.clone(),
        fields: BTreeMap::new(),
    }
}
