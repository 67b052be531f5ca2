// SPDX-FileCopyrightText: 2026 Sealdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Serde mappings between Discord REST payloads and the core types.
//!
//! Only the fields Sealdesk consumes are modeled; everything else in a
//! payload is ignored on deserialization, and embeds pass through as raw
//! JSON values.

use serde::Deserialize;
use std::collections::BTreeMap;

use sealdesk_core::{
    AttachmentRef, ChannelId, GatewayMessage, InteractionEvent, InteractionToken, MessageId,
    UserId,
};

/// A message object from `GET /channels/{id}/messages`.
#[derive(Debug, Deserialize)]
pub struct ApiMessage {
    pub id: String,
    pub author: ApiAuthor,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub embeds: Vec<serde_json::Value>,
    #[serde(default)]
    pub attachments: Vec<ApiAttachment>,
}

#[derive(Debug, Deserialize)]
pub struct ApiAuthor {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub struct ApiAttachment {
    pub id: String,
    pub filename: String,
    #[serde(default)]
    pub size: u64,
    pub url: Option<String>,
    pub proxy_url: Option<String>,
}

/// A channel object, as returned by thread and DM creation.
#[derive(Debug, Deserialize)]
pub struct ApiChannel {
    pub id: String,
}

impl From<ApiMessage> for GatewayMessage {
    fn from(msg: ApiMessage) -> Self {
        GatewayMessage {
            id: MessageId(msg.id),
            author_id: UserId(msg.author.id),
            content: msg.content,
            embeds: msg.embeds,
            attachments: msg.attachments.into_iter().map(Into::into).collect(),
        }
    }
}

impl From<ApiAttachment> for AttachmentRef {
    fn from(att: ApiAttachment) -> Self {
        AttachmentRef {
            id: att.id,
            name: att.filename,
            url: att.url,
            proxy_url: att.proxy_url,
            size: att.size,
        }
    }
}

/// Interaction types Sealdesk reacts to.
pub const INTERACTION_PING: u8 = 1;
pub const INTERACTION_COMPONENT: u8 = 3;
pub const INTERACTION_MODAL_SUBMIT: u8 = 5;

/// The inbound interaction payload posted to the webhook endpoint.
#[derive(Debug, Deserialize)]
pub struct Interaction {
    #[serde(rename = "type")]
    pub kind: u8,
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub channel_id: Option<String>,
    #[serde(default)]
    pub member: Option<ApiMember>,
    #[serde(default)]
    pub user: Option<ApiAuthor>,
    #[serde(default)]
    pub data: Option<InteractionData>,
}

#[derive(Debug, Deserialize)]
pub struct ApiMember {
    pub user: ApiAuthor,
}

#[derive(Debug, Deserialize)]
pub struct InteractionData {
    #[serde(default)]
    pub custom_id: String,
    /// Modal action rows; each wraps one text input.
    #[serde(default)]
    pub components: Vec<ApiActionRow>,
}

#[derive(Debug, Deserialize)]
pub struct ApiActionRow {
    #[serde(default)]
    pub components: Vec<ApiTextInput>,
}

#[derive(Debug, Deserialize)]
pub struct ApiTextInput {
    pub custom_id: String,
    #[serde(default)]
    pub value: String,
}

impl Interaction {
    /// The user who triggered the interaction: `member.user` in guilds,
    /// `user` in DMs.
    fn user_id(&self) -> Option<&str> {
        self.member
            .as_ref()
            .map(|m| m.user.id.as_str())
            .or_else(|| self.user.as_ref().map(|u| u.id.as_str()))
    }

    /// Convert a component click or modal submission into an
    /// [`InteractionEvent`]. Pings and malformed payloads yield `None`.
    pub fn to_event(&self) -> Option<InteractionEvent> {
        if self.kind != INTERACTION_COMPONENT && self.kind != INTERACTION_MODAL_SUBMIT {
            return None;
        }
        let data = self.data.as_ref()?;
        let channel_id = self.channel_id.as_deref()?;
        let user_id = self.user_id()?;

        let mut fields = BTreeMap::new();
        for row in &data.components {
            for input in &row.components {
                fields.insert(input.custom_id.clone(), input.value.clone());
            }
        }

        Some(InteractionEvent {
            token: InteractionToken(self.token.clone()),
            custom_id: data.custom_id.clone(),
            channel_id: ChannelId(channel_id.to_string()),
            user_id: UserId(user_id.to_string()),
            fields,
        })
    }
}
