// SPDX-FileCopyrightText: 2026 Sealdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter trait definitions for Sealdesk's external collaborators.
//!
//! The chat platform and the ticket database sit behind these traits so the
//! closing pipeline can be driven against mocks in tests and against real
//! clients in production. All traits use `#[async_trait]` for dynamic
//! dispatch compatibility.

pub mod gateway;
pub mod store;

pub use gateway::ChatGateway;
pub use store::TicketStore;
