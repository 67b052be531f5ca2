// SPDX-FileCopyrightText: 2026 Sealdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Sealdesk support-ticket bot.
//!
//! This crate provides the foundational trait definitions, error types, and
//! domain types used throughout the Sealdesk workspace. The chat platform
//! and the ticket database are adapters implementing traits defined here.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::{CloseRefusal, SealdeskError};
pub use types::{
    Attachment, AttachmentRef, ChannelId, Embed, EmbedField, FileUpload, GatewayMessage,
    InteractionEvent, InteractionToken, MessageId, NewTicket, OutboundMessage, Question, Ticket,
    TicketId, Topic, TranscriptMessage, TranscriptMeta, UserId,
};

// Re-export adapter traits at crate root.
pub use traits::{ChatGateway, TicketStore};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_variants_construct() {
        let _config = SealdeskError::Config("test".into());
        let _storage = SealdeskError::Storage {
            source: Box::new(std::io::Error::other("test")),
        };
        let _gateway = SealdeskError::Gateway {
            message: "test".into(),
            source: None,
        };
        let _fetch = SealdeskError::AttachmentFetch {
            message: "test".into(),
            source: None,
        };
        let _crypto = SealdeskError::Crypto("test".into());
        let _archive = SealdeskError::Archive {
            message: "test".into(),
            source: None,
        };
        let _refused = SealdeskError::CloseRefused(CloseRefusal::NotFound);
        let _internal = SealdeskError::Internal("test".into());
    }

    #[test]
    fn adapter_traits_are_object_safe() {
        // The orchestrator holds both collaborators as trait objects; if
        // either trait loses object safety this stops compiling.
        fn _assert_gateway(_g: &dyn ChatGateway) {}
        fn _assert_store(_s: &dyn TicketStore) {}
    }
}
