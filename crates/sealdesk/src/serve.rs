// SPDX-FileCopyrightText: 2026 Sealdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `sealdesk serve` command implementation.
//!
//! Wires the SQLite store, the Discord REST client, and the interaction
//! webhook together, then serves interactions until the process is stopped.
//! Credentials come from the environment, never from config files:
//! `SEALDESK_BOT_TOKEN`, `SEALDESK_APPLICATION_ID`, `SEALDESK_PUBLIC_KEY`.

use std::sync::Arc;

use sealdesk_config::SealdeskConfig;
use sealdesk_core::SealdeskError;
use sealdesk_gateway::{interactions_router, DiscordGateway, InteractionVerifier, WebhookState};
use sealdesk_store::SqliteTicketStore;
use sealdesk_ticket::{AppContext, CloseTicket, HandlerRegistry, OpenTicket};
use tracing::{error, info};

fn required_env(name: &str) -> Result<String, SealdeskError> {
    std::env::var(name)
        .map_err(|_| SealdeskError::Config(format!("{name} environment variable is required")))
}

/// Runs the `sealdesk serve` command.
pub async fn run_serve(config: SealdeskConfig) -> Result<(), SealdeskError> {
    info!("starting sealdesk serve");

    let bot_token = required_env("SEALDESK_BOT_TOKEN")?;
    let application_id = required_env("SEALDESK_APPLICATION_ID")?;
    let public_key = required_env("SEALDESK_PUBLIC_KEY")?;

    // The archive directory must exist before the first close.
    std::fs::create_dir_all(&config.storage.storage_root).map_err(|e| {
        SealdeskError::Archive {
            message: format!(
                "failed to create storage root {}: {e}",
                config.storage.storage_root
            ),
            source: Some(Box::new(e)),
        }
    })?;

    let store = SqliteTicketStore::open(&config.storage.database_path).await?;
    info!(path = %config.storage.database_path, "ticket database opened");

    let gateway = DiscordGateway::new(&bot_token, &application_id)?;
    let verifier = InteractionVerifier::new(&public_key)?;

    let ctx = AppContext::new(Arc::new(config.clone()), Arc::new(store), Arc::new(gateway))?;

    let mut registry = HandlerRegistry::new();
    registry.register(Arc::new(OpenTicket));
    registry.register(Arc::new(CloseTicket));
    let registry = Arc::new(registry);
    info!(handlers = ?registry.keys(), "interaction handlers registered");

    // Every verified interaction is handed to a task so the webhook can
    // answer inside the platform's response deadline.
    let dispatch_ctx = ctx.clone();
    let dispatch_registry = registry.clone();
    let state = WebhookState {
        verifier: Arc::new(verifier),
        dispatch: Arc::new(move |event| {
            let ctx = dispatch_ctx.clone();
            let registry = dispatch_registry.clone();
            tokio::spawn(async move {
                if let Err(err) = registry.dispatch(&ctx, &event).await {
                    error!(
                        error = %err,
                        custom_id = %event.custom_id,
                        "interaction handler failed"
                    );
                }
            });
        }),
    };

    let app = interactions_router(state);
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener =
        tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| SealdeskError::Gateway {
                message: format!("failed to bind webhook listener to {addr}: {e}"),
                source: Some(Box::new(e)),
            })?;

    info!("interaction webhook listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| SealdeskError::Gateway {
            message: format!("webhook server error: {e}"),
            source: Some(Box::new(e)),
        })?;

    info!("sealdesk serve stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "failed to listen for shutdown signal");
    }
}
