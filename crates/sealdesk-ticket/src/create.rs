// SPDX-FileCopyrightText: 2026 Sealdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ticket creation: spin up a private thread, record the row, post the
//! intro message. If a step after the thread exists fails, both the thread
//! and the row are torn down again so no half-created ticket lingers.

use std::collections::BTreeMap;

use async_trait::async_trait;
use sealdesk_core::{
    ChannelId, Embed, EmbedField, InteractionEvent, NewTicket, OutboundMessage, SealdeskError,
    TicketId, UserId,
};
use tracing::{error, info, warn};

use crate::context::AppContext;
use crate::registry::InteractionHandler;

/// Everything needed to open a ticket, extracted from the submitted
/// questionnaire.
#[derive(Debug, Clone)]
pub struct CreateTicketRequest {
    pub topic_id: String,
    /// Free-text issue summary; also becomes the thread name.
    pub issue: String,
    /// Question text -> answer for the topic's questionnaire.
    pub answers: BTreeMap<String, String>,
    pub requester: UserId,
}

/// Handler for the `open:<topic id>` modal submission.
pub struct OpenTicket;

#[async_trait]
impl InteractionHandler for OpenTicket {
    fn key(&self) -> &'static str {
        "open"
    }

    async fn handle(
        &self,
        ctx: &AppContext,
        event: &InteractionEvent,
        argument: &str,
    ) -> Result<(), SealdeskError> {
        ctx.gateway
            .respond(&event.token, "Creating ticket.\n\nPlease wait...")
            .await?;

        let mut answers = event.fields.clone();
        let issue = answers.remove("issue").unwrap_or_default();
        let request = CreateTicketRequest {
            topic_id: argument.to_string(),
            issue,
            answers,
            requester: event.user_id.clone(),
        };

        match create_ticket(ctx, &request).await {
            Ok((_, thread)) => {
                ctx.gateway
                    .edit_response(
                        &event.token,
                        &format!("Your ticket has been created! You can view it here: <#{thread}>"),
                    )
                    .await
            }
            Err(err) => {
                error!(error = %err, topic_id = %request.topic_id, "ticket creation failed");
                if let Err(edit_err) = ctx
                    .gateway
                    .edit_response(
                        &event.token,
                        "Your ticket couldn't be created! Please try again later.",
                    )
                    .await
                {
                    warn!(error = %edit_err, "failed to report creation failure");
                }
                Err(err)
            }
        }
    }
}

/// Create a ticket: thread first, then the row, then the intro message.
///
/// Returns the new ticket id and its thread. If the intro message cannot be
/// sent, the row and the thread are deleted again before the error
/// propagates.
pub async fn create_ticket(
    ctx: &AppContext,
    request: &CreateTicketRequest,
) -> Result<(TicketId, ChannelId), SealdeskError> {
    let topic = ctx
        .config
        .topics
        .get(&request.topic_id)
        .ok_or_else(|| SealdeskError::Internal(format!("invalid topic id: {}", request.topic_id)))?;

    let parent = ChannelId(ctx.config.channels.thread_channel.clone());
    let thread = ctx.gateway.create_thread(&parent, &request.issue).await?;

    let ticket_id = TicketId::generate();
    let row = NewTicket {
        id: ticket_id.clone(),
        topic_id: request.topic_id.clone(),
        user_id: request.requester.clone(),
        channel_id: thread.clone(),
        issue: request.issue.clone(),
        ticket_context: request.answers.clone(),
    };
    if let Err(err) = ctx.store.insert(&row).await {
        // Row never landed, only the thread needs tearing down.
        if let Err(del_err) = ctx.gateway.delete_channel(&thread).await {
            error!(error = %del_err, thread = %thread, "failed to delete thread after insert failure");
        }
        return Err(err);
    }

    let mut content = format!("<@{}>", request.requester);
    for role in &topic.ping {
        content.push_str(&format!(" <@&{role}>"));
    }
    let mut description = String::new();
    for (question, answer) in &request.answers {
        description.push_str(&format!("**{question}**\n{answer}\n\n"));
    }
    let intro = OutboundMessage {
        content: Some(content),
        embed: Some(Embed {
            title: "New Ticket".to_string(),
            fields: vec![
                EmbedField {
                    name: "Issue".to_string(),
                    value: request.issue.clone(),
                },
                EmbedField {
                    name: "Ticket ID".to_string(),
                    value: ticket_id.to_string(),
                },
                EmbedField {
                    name: "Topic ID".to_string(),
                    value: request.topic_id.clone(),
                },
                EmbedField {
                    name: "Context".to_string(),
                    value: description,
                },
            ],
        }),
        files: Vec::new(),
    };
    if let Err(err) = ctx.gateway.send_message(&thread, &intro).await {
        abort_create(ctx, &ticket_id, &thread).await;
        return Err(err);
    }

    info!(ticket_id = %ticket_id, thread = %thread, topic_id = %request.topic_id, "ticket created");
    Ok((ticket_id, thread))
}

/// Tear down a partially created ticket: the row, then the thread. Both
/// deletions are attempted even if one fails.
async fn abort_create(ctx: &AppContext, ticket_id: &TicketId, thread: &ChannelId) {
    if let Err(err) = ctx.store.delete(ticket_id).await {
        error!(error = %err, ticket_id = %ticket_id, "failed to delete row during creation abort");
    }
    if let Err(err) = ctx.gateway.delete_channel(thread).await {
        error!(error = %err, thread = %thread, "failed to delete thread during creation abort");
    }
}
