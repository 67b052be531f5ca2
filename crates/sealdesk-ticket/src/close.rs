// SPDX-FileCopyrightText: 2026 Sealdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The close pipeline: validate, paginate history, fetch attachments, seal,
//! write the archive, notify, commit, lock the thread.
//!
//! State only changes at the commit step; every failure before it leaves the
//! ticket open and retryable. A failure after the commit (the thread lock)
//! is reported to the requester but the ticket stays closed.

use std::collections::BTreeMap;
use std::path::Path;

use async_trait::async_trait;
use chrono::Utc;
use sealdesk_core::{
    ChannelId, CloseRefusal, Embed, EmbedField, FileUpload, InteractionEvent, MessageId,
    OutboundMessage, SealdeskError, Ticket, TicketId, TranscriptMessage, TranscriptMeta, UserId,
};
use sealdesk_transcript::{
    archive_filename, attachment_section_name, encode_private_key, seal_section, Archive,
    AttachmentFetcher, TranscriptKeypair, SECTION_DATA, SECTION_META,
};
use tracing::{error, info, warn};
use zeroize::Zeroizing;

use crate::context::AppContext;
use crate::registry::InteractionHandler;

/// History page size. The final page of a channel's history is the first
/// one shorter than this.
pub const PAGE_SIZE: usize = 100;

/// Handler for the `close:<ticket id>` button on a ticket's intro message.
pub struct CloseTicket;

#[async_trait]
impl InteractionHandler for CloseTicket {
    fn key(&self) -> &'static str {
        "close"
    }

    async fn handle(
        &self,
        ctx: &AppContext,
        event: &InteractionEvent,
        argument: &str,
    ) -> Result<(), SealdeskError> {
        let ticket_id = TicketId(argument.to_string());
        close_ticket(ctx, &ticket_id, event).await
    }
}

/// A pipeline failure paired with the reason fragment shown to the
/// requester.
struct CloseFailure {
    reason: &'static str,
    error: SealdeskError,
}

/// Tag a fallible pipeline step with its user-facing failure reason.
fn stage<T>(result: Result<T, SealdeskError>, reason: &'static str) -> Result<T, CloseFailure> {
    result.map_err(|error| CloseFailure { reason, error })
}

/// Close one ticket into a sealed transcript archive.
///
/// Precondition checks run in a fixed order and short-circuit: unknown
/// ticket, already closed, wrong channel. Each refusal is reported to the
/// requester and returned as [`SealdeskError::CloseRefused`] with no side
/// effects.
pub async fn close_ticket(
    ctx: &AppContext,
    ticket_id: &TicketId,
    event: &InteractionEvent,
) -> Result<(), SealdeskError> {
    // Serialize concurrent close attempts on the same ticket. The commit is
    // race-safe on its own; the lock stops the loser from redundantly
    // paginating, fetching, and writing an orphan archive first.
    let _guard = ctx.close_locks.acquire(ticket_id).await;

    let ticket = match ctx.store.fetch(ticket_id).await? {
        None => return refuse(ctx, event, CloseRefusal::NotFound).await,
        Some(ticket) if !ticket.open => {
            return refuse(ctx, event, CloseRefusal::AlreadyClosed).await;
        }
        Some(ticket) if ticket.channel_id != event.channel_id => {
            return refuse(ctx, event, CloseRefusal::WrongChannel).await;
        }
        Some(ticket) => ticket,
    };

    ctx.gateway
        .respond(
            &event.token,
            &format!("Closing ticket {ticket_id}... Please wait..."),
        )
        .await?;

    match seal_and_notify(ctx, &ticket, event).await {
        Ok(ticket_url) => {
            info!(ticket_id = %ticket_id, "ticket closed");
            ctx.gateway
                .edit_response(
                    &event.token,
                    &format!("Your ticket has been closed and can be viewed at: {ticket_url}"),
                )
                .await?;
            Ok(())
        }
        Err(failure) => {
            error!(
                ticket_id = %ticket_id,
                error = %failure.error,
                "close pipeline failed"
            );
            let text = if failure.reason.is_empty() {
                "Your ticket couldn't be closed properly! Please try again later.".to_string()
            } else {
                format!(
                    "Your ticket couldn't be closed properly ({})! Please try again later.",
                    failure.reason
                )
            };
            if let Err(edit_err) = ctx.gateway.edit_response(&event.token, &text).await {
                warn!(error = %edit_err, "failed to report close failure to requester");
            }
            Err(failure.error)
        }
    }
}

async fn refuse(
    ctx: &AppContext,
    event: &InteractionEvent,
    refusal: CloseRefusal,
) -> Result<(), SealdeskError> {
    ctx.gateway.respond(&event.token, refusal.user_message()).await?;
    Err(SealdeskError::CloseRefused(refusal))
}

/// The fallible body of the close: everything between the progress response
/// and the final success edit.
async fn seal_and_notify(
    ctx: &AppContext,
    ticket: &Ticket,
    event: &InteractionEvent,
) -> Result<String, CloseFailure> {
    let topic = ctx
        .config
        .topics
        .get(&ticket.topic_id)
        .cloned()
        .ok_or_else(|| CloseFailure {
            reason: "",
            error: SealdeskError::Internal(format!("invalid topic id: {}", ticket.topic_id)),
        })?;

    // Paginate the full channel history. Pages arrive in the platform's
    // native order and are kept that way; a short page ends the walk.
    let fetcher = AttachmentFetcher::with_client(ctx.http.clone());
    let mut messages: Vec<TranscriptMessage> = Vec::new();
    let mut buffers: BTreeMap<String, Vec<u8>> = BTreeMap::new();
    let mut cursor: Option<MessageId> = None;
    loop {
        let page = stage(
            ctx.gateway
                .messages_before(&ticket.channel_id, PAGE_SIZE, cursor.as_ref())
                .await,
            "couldn't find messages",
        )?;
        let page_len = page.len();
        cursor = page.last().map(|message| message.id.clone());
        for message in page {
            let (attachments, fetched) = stage(
                fetcher.fetch_all(&message.attachments).await,
                "couldn't fetch attachments",
            )?;
            buffers.extend(fetched);
            messages.push(TranscriptMessage {
                id: message.id,
                author_id: message.author_id,
                content: message.content,
                embeds: message.embeds,
                attachments,
            });
        }
        if page_len < PAGE_SIZE {
            break;
        }
    }
    info!(
        ticket_id = %ticket.id,
        messages = messages.len(),
        attachments = buffers.len(),
        "collected channel history"
    );

    // Seal every section to a one-time keypair. The private half exists
    // only in this function and leaves the process once, in the key file
    // sent to the staff log channel.
    let keypair = TranscriptKeypair::generate();
    let recipient = keypair.public_bytes();
    let mut archive = Archive::new(Utc::now());

    let data = stage(
        serde_json::to_vec(&messages)
            .map_err(|e| SealdeskError::Internal(format!("transcript serialization: {e}"))),
        "couldn't create transcript",
    )?;
    archive.add_section(
        SECTION_DATA,
        stage(
            seal_section(&recipient, SECTION_DATA, &data),
            "couldn't create transcript",
        )?,
    );

    let meta = TranscriptMeta {
        ticket_id: ticket.id.clone(),
        issue: ticket.issue.clone(),
        topic_id: ticket.topic_id.clone(),
        topic,
        ticket_context: ticket.ticket_context.clone(),
        user_id: ticket.user_id.clone(),
        close_user_id: event.user_id.clone(),
        channel_id: ticket.channel_id.clone(),
    };
    let meta_json = stage(
        serde_json::to_vec(&meta)
            .map_err(|e| SealdeskError::Internal(format!("metadata serialization: {e}"))),
        "couldn't create transcript",
    )?;
    archive.add_section(
        SECTION_META,
        stage(
            seal_section(&recipient, SECTION_META, &meta_json),
            "couldn't create transcript",
        )?,
    );

    for (attachment_id, bytes) in &buffers {
        let name = attachment_section_name(attachment_id);
        archive.add_section(
            &name,
            stage(
                seal_section(&recipient, &name, bytes),
                "couldn't create transcript",
            )?,
        );
    }

    let filename = archive_filename(&ticket.id);
    let archive_path = Path::new(&ctx.config.storage.storage_root).join(&filename);
    stage(archive.persist(&archive_path), "couldn't write file")?;
    let ticket_url = format!("{}/{}", ctx.config.storage.exposed_base_url, filename);

    // Notify staff with the close summary and the one-time key, then the
    // requester over DM on a best-effort basis.
    let embed = closed_embed(ticket, &event.user_id, &ticket_url);
    let key_pem = Zeroizing::new(encode_private_key(&keypair.private_bytes()));
    let log_message = OutboundMessage {
        content: None,
        embed: Some(embed.clone()),
        files: vec![FileUpload {
            name: format!("{}.key.pem", ticket.id),
            content_type: "application/x-pem-file".to_string(),
            data: key_pem.as_bytes().to_vec(),
        }],
    };
    let log_channel = ChannelId(ctx.config.channels.log_channel.clone());
    stage(
        ctx.gateway.send_message(&log_channel, &log_message).await,
        "couldn't send transcript",
    )?;

    match ctx.gateway.create_dm(&ticket.user_id).await {
        Ok(dm) => {
            let dm_message = OutboundMessage {
                embed: Some(embed),
                ..Default::default()
            };
            if let Err(err) = ctx.gateway.send_message(&dm, &dm_message).await {
                warn!(error = %err, user_id = %ticket.user_id, "failed to DM close notice");
            }
        }
        Err(err) => {
            warn!(error = %err, user_id = %ticket.user_id, "failed to open DM channel");
        }
    }

    // Commit. Conditional on the row still being open, so a concurrent
    // close from another process cannot transition the ticket twice.
    let committed = stage(
        ctx.store
            .mark_closed(&ticket.id, &event.user_id, &archive_path.display().to_string())
            .await,
        "couldn't update database",
    )?;
    if !committed {
        return Err(CloseFailure {
            reason: "couldn't update database",
            error: SealdeskError::CloseRefused(CloseRefusal::AlreadyClosed),
        });
    }

    // Past the commit the ticket is closed no matter what; a lock failure
    // is reported to the requester but never rolled back.
    let parent = ChannelId(ctx.config.channels.thread_channel.clone());
    stage(
        ctx.gateway.lock_thread(&ticket.channel_id, &parent).await,
        "",
    )?;

    Ok(ticket_url)
}

fn closed_embed(ticket: &Ticket, closed_by: &UserId, ticket_url: &str) -> Embed {
    Embed {
        title: "Ticket Closed".to_string(),
        fields: vec![
            EmbedField {
                name: "Ticket ID".to_string(),
                value: ticket.id.to_string(),
            },
            EmbedField {
                name: "User".to_string(),
                value: format!("<@{}>", ticket.user_id),
            },
            EmbedField {
                name: "Closed By".to_string(),
                value: format!("<@{closed_by}>"),
            },
            EmbedField {
                name: "Ticket URL".to_string(),
                value: ticket_url.to_string(),
            },
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use sealdesk_core::NewTicket;
    use sealdesk_store::SqliteTicketStore;

    use crate::testing::{context_with, test_config, test_event, MockGateway};

    async fn context() -> (AppContext, Arc<MockGateway>) {
        let gateway = Arc::new(MockGateway::new());
        let store = SqliteTicketStore::open_in_memory().await.unwrap();
        let ctx = context_with(
            test_config(std::path::Path::new("unused")),
            Arc::new(store),
            gateway.clone(),
        );
        (ctx, gateway)
    }

    fn new_ticket(channel: &str) -> NewTicket {
        NewTicket {
            id: TicketId::generate(),
            topic_id: "general".to_string(),
            user_id: UserId("requester".to_string()),
            channel_id: ChannelId(channel.to_string()),
            issue: "it broke".to_string(),
            ticket_context: BTreeMap::new(),
        }
    }

    #[tokio::test]
    async fn unknown_ticket_is_refused() {
        let (ctx, gateway) = context().await;
        let id = TicketId::generate();
        let event = test_event("close", &ChannelId("c".into()), &UserId("u".into()));

        let err = close_ticket(&ctx, &id, &event).await.unwrap_err();
        assert!(matches!(
            err,
            SealdeskError::CloseRefused(CloseRefusal::NotFound)
        ));
        assert_eq!(
            gateway.response_texts(),
            vec![CloseRefusal::NotFound.user_message().to_string()]
        );
        assert_eq!(gateway.edit_texts().len(), 0);
    }

    #[tokio::test]
    async fn wrong_channel_is_refused() {
        let (ctx, gateway) = context().await;
        let ticket = new_ticket("thread-1");
        ctx.store.insert(&ticket).await.unwrap();
        let event = test_event("close", &ChannelId("elsewhere".into()), &UserId("u".into()));

        let err = close_ticket(&ctx, &ticket.id, &event).await.unwrap_err();
        assert!(matches!(
            err,
            SealdeskError::CloseRefused(CloseRefusal::WrongChannel)
        ));
        assert_eq!(
            gateway.response_texts(),
            vec![CloseRefusal::WrongChannel.user_message().to_string()]
        );
    }

    #[tokio::test]
    async fn already_closed_takes_precedence_over_wrong_channel() {
        let (ctx, gateway) = context().await;
        let ticket = new_ticket("thread-1");
        ctx.store.insert(&ticket).await.unwrap();
        ctx.store
            .mark_closed(&ticket.id, &UserId("staff".into()), "somewhere")
            .await
            .unwrap();

        // Closed ticket, and the event comes from the wrong channel too.
        let event = test_event("close", &ChannelId("elsewhere".into()), &UserId("u".into()));
        let err = close_ticket(&ctx, &ticket.id, &event).await.unwrap_err();
        assert!(matches!(
            err,
            SealdeskError::CloseRefused(CloseRefusal::AlreadyClosed)
        ));
        assert_eq!(
            gateway.response_texts(),
            vec![CloseRefusal::AlreadyClosed.user_message().to_string()]
        );
        // The refusal happened before any history pagination.
        assert_eq!(
            gateway
                .history_calls
                .load(std::sync::atomic::Ordering::SeqCst),
            0
        );
    }
}
