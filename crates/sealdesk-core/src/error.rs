// SPDX-FileCopyrightText: 2026 Sealdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Sealdesk ticket bot.

use thiserror::Error;

/// The primary error type used across all Sealdesk adapter traits and core operations.
#[derive(Debug, Error)]
pub enum SealdeskError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Ticket store errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Chat gateway errors (API call failure, rate limiting, malformed payload).
    #[error("gateway error: {message}")]
    Gateway {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Attachment download failed in transit. Always aborts the close; a
    /// transcript missing bytes the platform still serves would be silently
    /// incomplete.
    #[error("attachment fetch error: {message}")]
    AttachmentFetch {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Key generation or section sealing failed.
    #[error("crypto error: {0}")]
    Crypto(String),

    /// Archive container serialization or I/O failure.
    #[error("archive error: {message}")]
    Archive {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A close precondition failed. Carries the user-facing refusal reason;
    /// no side effects have occurred when this is returned.
    #[error("close refused: {0}")]
    CloseRefused(CloseRefusal),

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

/// The ordered, short-circuiting close precondition checks. The first
/// failing check determines the reported reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseRefusal {
    /// No ticket row exists for the requested id.
    NotFound,
    /// The ticket's open flag is already false.
    AlreadyClosed,
    /// The close request came from a channel other than the ticket's thread.
    WrongChannel,
}

impl CloseRefusal {
    /// The message shown to the requester for this refusal.
    pub fn user_message(&self) -> &'static str {
        match self {
            CloseRefusal::NotFound => {
                "An error occurred while finding this ticket. Please contact our support team about this!"
            }
            CloseRefusal::AlreadyClosed => "This ticket is already closed?!",
            CloseRefusal::WrongChannel => "You can't close a ticket that isn't in this channel!",
        }
    }
}

impl std::fmt::Display for CloseRefusal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CloseRefusal::NotFound => write!(f, "ticket not found"),
            CloseRefusal::AlreadyClosed => write!(f, "ticket already closed"),
            CloseRefusal::WrongChannel => write!(f, "wrong channel"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refusal_messages_are_distinct() {
        let refusals = [
            CloseRefusal::NotFound,
            CloseRefusal::AlreadyClosed,
            CloseRefusal::WrongChannel,
        ];
        for a in &refusals {
            for b in &refusals {
                if a != b {
                    assert_ne!(a.user_message(), b.user_message());
                }
            }
        }
    }

    #[test]
    fn errors_render_their_cause() {
        let err = SealdeskError::AttachmentFetch {
            message: "GET https://cdn.example/a.png returned 502".into(),
            source: None,
        };
        assert!(err.to_string().contains("502"));

        let err = SealdeskError::CloseRefused(CloseRefusal::AlreadyClosed);
        assert!(err.to_string().contains("already closed"));
    }
}
