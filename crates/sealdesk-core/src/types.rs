// SPDX-FileCopyrightText: 2026 Sealdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types used across the Sealdesk workspace: identifiers, the ticket
//! record, transcript structures, and gateway message payloads.

use std::collections::BTreeMap;

use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Length of a ticket identifier token.
pub const TICKET_ID_LEN: usize = 64;

/// Opaque 64-character ticket identifier, generated client-side at ticket
/// creation. Collision probability over an alphanumeric alphabet of this
/// length is negligible.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TicketId(pub String);

impl TicketId {
    /// Generate a fresh random ticket id.
    pub fn generate() -> Self {
        let token: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(TICKET_ID_LEN)
            .map(char::from)
            .collect();
        Self(token)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TicketId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Platform user identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Platform channel or thread identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChannelId(pub String);

impl std::fmt::Display for ChannelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Platform message identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub String);

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One support ticket, tracked from creation to close.
///
/// Invariant: `close_user_id` and `archive_path` are set together, exactly
/// once, on the open-to-closed transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
    pub id: TicketId,
    /// Key into the static topic catalog.
    pub topic_id: String,
    /// The requester who opened the ticket.
    pub user_id: UserId,
    /// The private discussion thread for this ticket.
    pub channel_id: ChannelId,
    /// Issue summary entered by the requester.
    pub issue: String,
    /// Question text -> answer, from the creation questionnaire.
    pub ticket_context: BTreeMap<String, String>,
    pub open: bool,
    pub close_user_id: Option<UserId>,
    pub archive_path: Option<String>,
}

/// A new ticket row about to be inserted by the creation flow.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTicket {
    pub id: TicketId,
    pub topic_id: String,
    pub user_id: UserId,
    pub channel_id: ChannelId,
    pub issue: String,
    pub ticket_context: BTreeMap<String, String>,
}

/// A raw attachment reference as delivered by the chat gateway, before the
/// fetcher has decided whether to download it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttachmentRef {
    pub id: String,
    pub name: String,
    /// Origin URL on the platform CDN.
    pub url: Option<String>,
    /// Cached/proxy URL; preferred for downloads when present.
    pub proxy_url: Option<String>,
    /// Size in bytes as reported by the platform.
    pub size: u64,
}

/// An attachment descriptor embedded in the transcript. An empty error list
/// means the bytes were fetched cleanly and sealed into the archive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy_url: Option<String>,
    /// Non-fatal per-attachment errors (e.g. skipped as oversized).
    pub errors: Vec<String>,
}

/// A single historical chat message as returned by the gateway's history
/// pagination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayMessage {
    pub id: MessageId,
    pub author_id: UserId,
    pub content: String,
    /// Structured embed payloads, opaque to Sealdesk and passed through
    /// unmodified into the transcript.
    pub embeds: Vec<serde_json::Value>,
    pub attachments: Vec<AttachmentRef>,
}

/// One transcript entry: a historical message plus resolved attachment
/// descriptors. Never persisted standalone, only inside the archive's
/// `data` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptMessage {
    pub id: MessageId,
    pub author_id: UserId,
    pub content: String,
    pub embeds: Vec<serde_json::Value>,
    pub attachments: Vec<Attachment>,
}

/// One entry in the static topic catalog.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Topic {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub emoji: String,
    #[serde(default)]
    pub questions: Vec<Question>,
    /// Extra role/user mentions to ping when a ticket under this topic opens.
    #[serde(default)]
    pub ping: Vec<String>,
}

/// A questionnaire entry shown when opening a ticket under a topic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub question: String,
    #[serde(default)]
    pub placeholder: String,
}

/// The `transcriptMeta` archive section: everything about the ticket that
/// is not the message history itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptMeta {
    pub ticket_id: TicketId,
    pub issue: String,
    pub topic_id: String,
    /// Full topic definition at close time, so the archive stays readable
    /// even after the topic catalog changes.
    pub topic: Topic,
    pub ticket_context: BTreeMap<String, String>,
    pub user_id: UserId,
    pub close_user_id: UserId,
    pub channel_id: ChannelId,
}

/// A component interaction delivered by the chat gateway (button click,
/// menu selection, modal submission).
#[derive(Debug, Clone)]
pub struct InteractionEvent {
    /// Token used to respond to this specific interaction.
    pub token: InteractionToken,
    /// Component custom id, `<handler key>:<argument>` by convention.
    pub custom_id: String,
    /// Channel the interaction originated from.
    pub channel_id: ChannelId,
    /// User who triggered the interaction.
    pub user_id: UserId,
    /// Submitted modal field values, question text -> answer.
    pub fields: BTreeMap<String, String>,
}

/// Opaque token identifying one interaction for response/edit calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InteractionToken(pub String);

/// An embed payload for outbound gateway messages.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Embed {
    pub title: String,
    pub fields: Vec<EmbedField>,
}

/// One name/value field inside an [`Embed`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
}

/// A file attached to an outbound gateway message.
#[derive(Debug, Clone, PartialEq)]
pub struct FileUpload {
    pub name: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

/// An outbound message: free text, an embed, file attachments, or any
/// combination.
#[derive(Debug, Clone, Default)]
pub struct OutboundMessage {
    pub content: Option<String>,
    pub embed: Option<Embed>,
    pub files: Vec<FileUpload>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ticket_id_has_expected_length_and_alphabet() {
        let id = TicketId::generate();
        assert_eq!(id.as_str().len(), TICKET_ID_LEN);
        assert!(id.as_str().chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn ticket_ids_are_unique() {
        let a = TicketId::generate();
        let b = TicketId::generate();
        assert_ne!(a, b);
    }

    #[test]
    fn attachment_descriptor_serializes_without_empty_urls() {
        let att = Attachment {
            id: "1".into(),
            name: "a.png".into(),
            url: None,
            proxy_url: None,
            errors: vec![],
        };
        let json = serde_json::to_string(&att).unwrap();
        assert!(!json.contains("proxy_url"));
        assert!(json.contains("errors"));
    }

    #[test]
    fn transcript_message_roundtrips_embeds_opaquely() {
        let msg = TranscriptMessage {
            id: MessageId("10".into()),
            author_id: UserId("20".into()),
            content: "hello".into(),
            embeds: vec![serde_json::json!({"title": "t", "weird_field": [1, 2]})],
            attachments: vec![],
        };
        let json = serde_json::to_string(&msg).unwrap();
        let back: TranscriptMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(back, msg);
    }
}
