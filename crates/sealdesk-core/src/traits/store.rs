// SPDX-FileCopyrightText: 2026 Sealdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ticket store trait: the relational table behind the bot.

use async_trait::async_trait;

use crate::error::SealdeskError;
use crate::types::{NewTicket, Ticket, TicketId, UserId};

/// Adapter for the ticket table.
///
/// One row per ticket, keyed by the opaque 64-character ticket id. Point
/// queries and point updates only; the close commit is a single conditional
/// update so a ticket can never be marked closed twice.
#[async_trait]
pub trait TicketStore: Send + Sync {
    /// Insert a freshly created ticket row (open, no closer, no archive).
    async fn insert(&self, ticket: &NewTicket) -> Result<(), SealdeskError>;

    /// Point lookup by ticket id.
    async fn fetch(&self, id: &TicketId) -> Result<Option<Ticket>, SealdeskError>;

    /// Commit a close: set the closed flag, closing user, and archive
    /// reference together, guarded on the row still being open.
    ///
    /// Returns `true` if this call performed the transition, `false` if the
    /// ticket was not open (or not present) at commit time. On `false` the
    /// store is unchanged.
    async fn mark_closed(
        &self,
        id: &TicketId,
        closed_by: &UserId,
        archive_path: &str,
    ) -> Result<bool, SealdeskError>;

    /// Delete a ticket row. Used only by the creation flow's compensation
    /// path when a downstream creation step fails after the insert.
    async fn delete(&self, id: &TicketId) -> Result<(), SealdeskError>;
}
