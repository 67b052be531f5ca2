// SPDX-FileCopyrightText: 2026 Sealdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the [`TicketStore`] trait.

use std::collections::BTreeMap;
use std::path::Path;

use async_trait::async_trait;
use rusqlite::OptionalExtension;
use sealdesk_core::{
    ChannelId, NewTicket, SealdeskError, Ticket, TicketId, TicketStore, UserId,
};
use tokio_rusqlite::Connection;
use tracing::debug;

use crate::database::{open_database, storage_err};

/// Persistent ticket store backed by SQLite.
///
/// All access goes through the single tokio-rusqlite background connection;
/// the close commit is a conditional update guarded on `open = 1`, so the
/// open-to-closed transition happens at most once per ticket.
pub struct SqliteTicketStore {
    conn: Connection,
}

impl SqliteTicketStore {
    /// Wrap an existing connection (migrations already applied).
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    /// Open (or create) a ticket database at `path` and run migrations.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, SealdeskError> {
        let conn = open_database(path).await?;
        Ok(Self::new(conn))
    }

    /// Open a fresh in-memory database with migrations applied. Used by
    /// tests and diagnostics; nothing survives the connection.
    pub async fn open_in_memory() -> Result<Self, SealdeskError> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(|e| storage_err(tokio_rusqlite::Error::from(e)))?;
        conn.call(|conn| {
            crate::migrations::run_migrations(conn).map_err(|e| std::io::Error::other(e.to_string()))
        })
        .await
        .map_err(|e| SealdeskError::Storage {
            source: Box::new(e),
        })?;
        Ok(Self::new(conn))
    }
}

/// Decode the ticket_context JSON column.
fn parse_context(raw: &str) -> Result<BTreeMap<String, String>, rusqlite::Error> {
    serde_json::from_str(raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(5, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn row_to_ticket(row: &rusqlite::Row<'_>) -> Result<Ticket, rusqlite::Error> {
    let context_raw: String = row.get(5)?;
    Ok(Ticket {
        id: TicketId(row.get(0)?),
        topic_id: row.get(1)?,
        user_id: UserId(row.get(2)?),
        channel_id: ChannelId(row.get(3)?),
        issue: row.get(4)?,
        ticket_context: parse_context(&context_raw)?,
        open: row.get::<_, i64>(6)? != 0,
        close_user_id: row.get::<_, Option<String>>(7)?.map(UserId),
        archive_path: row.get(8)?,
    })
}

const TICKET_COLUMNS: &str =
    "id, topic_id, user_id, channel_id, issue, ticket_context, open, close_user_id, archive_path";

#[async_trait]
impl TicketStore for SqliteTicketStore {
    async fn insert(&self, ticket: &NewTicket) -> Result<(), SealdeskError> {
        let id = ticket.id.0.clone();
        let topic_id = ticket.topic_id.clone();
        let user_id = ticket.user_id.0.clone();
        let channel_id = ticket.channel_id.0.clone();
        let issue = ticket.issue.clone();
        let context = serde_json::to_string(&ticket.ticket_context)
            .map_err(|e| SealdeskError::Internal(format!("ticket context encoding: {e}")))?;

        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO tickets (id, topic_id, user_id, channel_id, issue, ticket_context, open) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, 1)",
                    rusqlite::params![id, topic_id, user_id, channel_id, issue, context],
                )?;
                Ok(())
            })
            .await
            .map_err(storage_err)
    }

    async fn fetch(&self, id: &TicketId) -> Result<Option<Ticket>, SealdeskError> {
        let id = id.0.clone();
        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {TICKET_COLUMNS} FROM tickets WHERE id = ?1"
                ))?;
                let ticket = stmt
                    .query_row(rusqlite::params![id], row_to_ticket)
                    .optional()?;
                Ok(ticket)
            })
            .await
            .map_err(storage_err)
    }

    async fn mark_closed(
        &self,
        id: &TicketId,
        closed_by: &UserId,
        archive_path: &str,
    ) -> Result<bool, SealdeskError> {
        let id = id.0.clone();
        let closed_by = closed_by.0.clone();
        let archive_path = archive_path.to_string();

        let updated = self
            .conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                let n = tx.execute(
                    "UPDATE tickets SET open = 0, close_user_id = ?2, archive_path = ?3 \
                     WHERE id = ?1 AND open = 1",
                    rusqlite::params![id, closed_by, archive_path],
                )?;
                tx.commit()?;
                Ok(n)
            })
            .await
            .map_err(storage_err)?;

        debug!(rows = updated, "close commit executed");
        Ok(updated == 1)
    }

    async fn delete(&self, id: &TicketId) -> Result<(), SealdeskError> {
        let id = id.0.clone();
        self.conn
            .call(move |conn| {
                conn.execute("DELETE FROM tickets WHERE id = ?1", rusqlite::params![id])?;
                Ok(())
            })
            .await
            .map_err(storage_err)
    }
}
