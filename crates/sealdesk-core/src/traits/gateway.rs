// SPDX-FileCopyrightText: 2026 Sealdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Chat gateway trait: the platform client surface Sealdesk consumes.

use async_trait::async_trait;

use crate::error::SealdeskError;
use crate::types::{
    ChannelId, GatewayMessage, InteractionToken, MessageId, OutboundMessage, UserId,
};

/// Adapter for the chat platform client.
///
/// Implementations wrap a real platform SDK; tests use an in-memory mock.
/// The closing pipeline only ever talks to the platform through this trait.
#[async_trait]
pub trait ChatGateway: Send + Sync {
    /// Fetch one page of up to `limit` messages from a channel's history,
    /// strictly older than `before` when a cursor is given.
    ///
    /// Messages come back in the platform's native ordering; callers must
    /// not re-sort them. A page shorter than `limit` marks the end of
    /// history.
    async fn messages_before(
        &self,
        channel: &ChannelId,
        limit: usize,
        before: Option<&MessageId>,
    ) -> Result<Vec<GatewayMessage>, SealdeskError>;

    /// Create a private thread under a parent channel.
    async fn create_thread(
        &self,
        parent: &ChannelId,
        name: &str,
    ) -> Result<ChannelId, SealdeskError>;

    /// Delete a channel or thread. Used only by the creation flow's
    /// compensation path.
    async fn delete_channel(&self, channel: &ChannelId) -> Result<(), SealdeskError>;

    /// Lock and archive a thread, reparenting it under `parent`.
    async fn lock_thread(
        &self,
        channel: &ChannelId,
        parent: &ChannelId,
    ) -> Result<(), SealdeskError>;

    /// Send a message (text, embed, and/or file attachments) to a channel.
    async fn send_message(
        &self,
        target: &ChannelId,
        message: &OutboundMessage,
    ) -> Result<MessageId, SealdeskError>;

    /// Open (or reuse) a direct-message channel with a user. May fail for
    /// platform reasons outside the bot's control; callers decide whether
    /// that is fatal.
    async fn create_dm(&self, user: &UserId) -> Result<ChannelId, SealdeskError>;

    /// Send the initial response to an interaction.
    async fn respond(
        &self,
        interaction: &InteractionToken,
        text: &str,
    ) -> Result<(), SealdeskError>;

    /// Edit the initial response to an interaction.
    async fn edit_response(
        &self,
        interaction: &InteractionToken,
        text: &str,
    ) -> Result<(), SealdeskError>;
}
