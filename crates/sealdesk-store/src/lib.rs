// SPDX-FileCopyrightText: 2026 Sealdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence layer for the Sealdesk ticket bot.
//!
//! One table, one adapter: [`SqliteTicketStore`] implements the
//! [`sealdesk_core::TicketStore`] trait over a tokio-rusqlite connection
//! with refinery-managed schema migrations.

pub mod database;
pub mod migrations;
pub mod tickets;

pub use database::open_database;
pub use tickets::SqliteTicketStore;
