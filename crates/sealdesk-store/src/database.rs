// SPDX-FileCopyrightText: 2026 Sealdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and migrations.
//!
//! All writes are serialized through tokio-rusqlite's single background
//! thread. Do NOT create additional Connection instances for writes.

use std::path::Path;

use sealdesk_core::SealdeskError;
use tokio_rusqlite::Connection;
use tracing::debug;

use crate::migrations::run_migrations;

/// Map a tokio_rusqlite error into the workspace storage error.
pub(crate) fn storage_err(e: tokio_rusqlite::Error) -> SealdeskError {
    SealdeskError::Storage {
        source: Box::new(e),
    }
}

/// Open (or create) the ticket database at `path`, apply PRAGMAs, and run
/// all pending migrations.
pub async fn open_database(path: impl AsRef<Path>) -> Result<Connection, SealdeskError> {
    let path = path.as_ref().to_path_buf();
    let conn = Connection::open(&path)
        .await
        .map_err(|e| storage_err(tokio_rusqlite::Error::from(e)))?;

    conn.call(|conn| {
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.pragma_update(None, "busy_timeout", 5000)?;
        Ok(())
    })
    .await
    .map_err(storage_err)?;

    conn.call(|conn| run_migrations(conn).map_err(|e| std::io::Error::other(e.to_string())))
        .await
        .map_err(|e| SealdeskError::Storage {
            source: Box::new(e),
        })?;

    debug!(path = %path.display(), "ticket database opened");
    Ok(conn)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn open_creates_database_file_and_schema() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tickets.db");
        let conn = open_database(&path).await.unwrap();

        let count: i64 = conn
            .call(|conn| {
                Ok::<_, rusqlite::Error>(conn.query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE name = 'tickets'",
                    [],
                    |row| row.get(0),
                )?)
            })
            .await
            .unwrap();
        assert_eq!(count, 1);
        assert!(path.exists());
    }

    #[tokio::test]
    async fn reopening_existing_database_is_fine() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tickets.db");
        drop(open_database(&path).await.unwrap());
        open_database(&path).await.unwrap();
    }
}
