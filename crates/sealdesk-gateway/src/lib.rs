// SPDX-FileCopyrightText: 2026 Sealdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Discord gateway adapter for Sealdesk.
//!
//! Outbound traffic goes through [`DiscordGateway`], a REST client
//! implementing the [`ChatGateway`](sealdesk_core::ChatGateway) trait.
//! Inbound interactions arrive over the signed webhook served by
//! [`interactions_router`].

pub mod rest;
pub mod webhook;
pub mod wire;

pub use rest::DiscordGateway;
pub use webhook::{interactions_router, InteractionVerifier, WebhookState};
