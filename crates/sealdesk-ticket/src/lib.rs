// SPDX-FileCopyrightText: 2026 Sealdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ticket lifecycle orchestration.
//!
//! This crate wires the adapter traits from `sealdesk-core` into the two
//! lifecycle operations: creating a ticket thread and closing a ticket into
//! a sealed transcript archive. Interaction events are routed through a
//! [`HandlerRegistry`] keyed by custom-id prefix, and every handler receives
//! the shared [`AppContext`].

pub mod close;
pub mod context;
pub mod create;
pub mod locks;
pub mod registry;
pub mod testing;

pub use close::{close_ticket, CloseTicket, PAGE_SIZE};
pub use context::AppContext;
pub use create::{create_ticket, CreateTicketRequest, OpenTicket};
pub use locks::TicketLocks;
pub use registry::{HandlerRegistry, InteractionHandler};
