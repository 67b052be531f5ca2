// SPDX-FileCopyrightText: 2026 Sealdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Discord REST client implementing [`ChatGateway`].
//!
//! Interaction responses ride the webhook follow-up endpoint: the HTTP
//! interaction layer always acknowledges with a deferred response, so both
//! `respond` and `edit_response` patch the original response message.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::multipart::{Form, Part};
use sealdesk_core::{
    ChannelId, ChatGateway, GatewayMessage, InteractionToken, MessageId, OutboundMessage,
    SealdeskError, UserId,
};
use serde_json::json;
use tracing::debug;

use crate::wire::{ApiChannel, ApiMessage};

/// Base URL for the Discord REST API.
const API_BASE_URL: &str = "https://discord.com/api/v10";

/// Discord private thread channel type.
const CHANNEL_TYPE_PRIVATE_THREAD: u8 = 12;

/// REST client for the Discord API.
///
/// Holds a connection pool with the bot authorization header applied to
/// every request.
#[derive(Debug, Clone)]
pub struct DiscordGateway {
    client: reqwest::Client,
    base_url: String,
    application_id: String,
}

impl DiscordGateway {
    pub fn new(bot_token: &str, application_id: &str) -> Result<Self, SealdeskError> {
        if bot_token.is_empty() {
            return Err(SealdeskError::Config(
                "bot token cannot be empty".to_string(),
            ));
        }
        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("Bot {bot_token}"))
            .map_err(|e| SealdeskError::Config(format!("invalid bot token: {e}")))?;
        auth.set_sensitive(true);
        headers.insert("authorization", auth);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| SealdeskError::Gateway {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            base_url: API_BASE_URL.to_string(),
            application_id: application_id.to_string(),
        })
    }

    /// Overrides the base URL (for testing with wiremock).
    #[cfg(test)]
    pub fn with_base_url(mut self, url: String) -> Self {
        self.base_url = url;
        self
    }

    /// Fail on non-success statuses, carrying status and body in the error.
    async fn check(response: reqwest::Response) -> Result<reqwest::Response, SealdeskError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let url = response.url().clone();
        let body = response.text().await.unwrap_or_default();
        Err(SealdeskError::Gateway {
            message: format!("{url} returned {status}: {body}"),
            source: None,
        })
    }

    async fn patch_original(
        &self,
        interaction: &InteractionToken,
        text: &str,
    ) -> Result<(), SealdeskError> {
        let url = format!(
            "{}/webhooks/{}/{}/messages/@original",
            self.base_url, self.application_id, interaction.0
        );
        let response = self
            .client
            .patch(&url)
            .json(&json!({ "content": text, "allowed_mentions": { "parse": [] } }))
            .send()
            .await
            .map_err(request_err)?;
        Self::check(response).await?;
        Ok(())
    }
}

fn request_err(e: reqwest::Error) -> SealdeskError {
    SealdeskError::Gateway {
        message: format!("HTTP request failed: {e}"),
        source: Some(Box::new(e)),
    }
}

#[async_trait]
impl ChatGateway for DiscordGateway {
    async fn messages_before(
        &self,
        channel: &ChannelId,
        limit: usize,
        before: Option<&MessageId>,
    ) -> Result<Vec<GatewayMessage>, SealdeskError> {
        let url = format!("{}/channels/{}/messages", self.base_url, channel);
        let mut query = vec![("limit".to_string(), limit.to_string())];
        if let Some(before) = before {
            query.push(("before".to_string(), before.to_string()));
        }
        let response = self
            .client
            .get(&url)
            .query(&query)
            .send()
            .await
            .map_err(request_err)?;
        let page: Vec<ApiMessage> = Self::check(response)
            .await?
            .json()
            .await
            .map_err(request_err)?;
        debug!(channel = %channel, count = page.len(), "fetched history page");
        Ok(page.into_iter().map(Into::into).collect())
    }

    async fn create_thread(
        &self,
        parent: &ChannelId,
        name: &str,
    ) -> Result<ChannelId, SealdeskError> {
        let url = format!("{}/channels/{}/threads", self.base_url, parent);
        let response = self
            .client
            .post(&url)
            .json(&json!({ "name": name, "type": CHANNEL_TYPE_PRIVATE_THREAD }))
            .send()
            .await
            .map_err(request_err)?;
        let thread: ApiChannel = Self::check(response)
            .await?
            .json()
            .await
            .map_err(request_err)?;
        Ok(ChannelId(thread.id))
    }

    async fn delete_channel(&self, channel: &ChannelId) -> Result<(), SealdeskError> {
        let url = format!("{}/channels/{}", self.base_url, channel);
        let response = self.client.delete(&url).send().await.map_err(request_err)?;
        Self::check(response).await?;
        Ok(())
    }

    async fn lock_thread(
        &self,
        channel: &ChannelId,
        parent: &ChannelId,
    ) -> Result<(), SealdeskError> {
        let url = format!("{}/channels/{}", self.base_url, channel);
        let response = self
            .client
            .patch(&url)
            .json(&json!({
                "parent_id": parent.to_string(),
                "locked": true,
                "archived": true
            }))
            .send()
            .await
            .map_err(request_err)?;
        Self::check(response).await?;
        Ok(())
    }

    async fn send_message(
        &self,
        target: &ChannelId,
        message: &OutboundMessage,
    ) -> Result<MessageId, SealdeskError> {
        let url = format!("{}/channels/{}/messages", self.base_url, target);

        let mut payload = serde_json::Map::new();
        if let Some(content) = &message.content {
            payload.insert("content".to_string(), json!(content));
        }
        if let Some(embed) = &message.embed {
            let embed_value = serde_json::to_value(embed).map_err(|e| SealdeskError::Gateway {
                message: format!("embed serialization: {e}"),
                source: Some(Box::new(e)),
            })?;
            payload.insert("embeds".to_string(), json!([embed_value]));
        }
        let payload = serde_json::Value::Object(payload);

        let request = self.client.post(&url);
        let response = if message.files.is_empty() {
            request.json(&payload).send().await.map_err(request_err)?
        } else {
            let mut form = Form::new().text("payload_json", payload.to_string());
            for (index, file) in message.files.iter().enumerate() {
                let part = Part::bytes(file.data.clone())
                    .file_name(file.name.clone())
                    .mime_str(&file.content_type)
                    .map_err(request_err)?;
                form = form.part(format!("files[{index}]"), part);
            }
            request.multipart(form).send().await.map_err(request_err)?
        };

        let sent: ApiMessage = Self::check(response)
            .await?
            .json()
            .await
            .map_err(request_err)?;
        Ok(MessageId(sent.id))
    }

    async fn create_dm(&self, user: &UserId) -> Result<ChannelId, SealdeskError> {
        let url = format!("{}/users/@me/channels", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&json!({ "recipient_id": user.to_string() }))
            .send()
            .await
            .map_err(request_err)?;
        let dm: ApiChannel = Self::check(response)
            .await?
            .json()
            .await
            .map_err(request_err)?;
        Ok(ChannelId(dm.id))
    }

    async fn respond(
        &self,
        interaction: &InteractionToken,
        text: &str,
    ) -> Result<(), SealdeskError> {
        self.patch_original(interaction, text).await
    }

    async fn edit_response(
        &self,
        interaction: &InteractionToken,
        text: &str,
    ) -> Result<(), SealdeskError> {
        self.patch_original(interaction, text).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn gateway(server: &MockServer) -> DiscordGateway {
        DiscordGateway::new("test-token", "app-1")
            .unwrap()
            .with_base_url(server.uri())
    }

    #[tokio::test]
    async fn messages_before_sends_cursor_and_maps_payload() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/channels/chan-1/messages"))
            .and(query_param("limit", "100"))
            .and(query_param("before", "m50"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {
                    "id": "m49",
                    "author": {"id": "u1"},
                    "content": "hi",
                    "attachments": [],
                    "embeds": []
                }
            ])))
            .mount(&server)
            .await;

        let page = gateway(&server)
            .await
            .messages_before(
                &ChannelId("chan-1".into()),
                100,
                Some(&MessageId("m50".into())),
            )
            .await
            .unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].id, MessageId("m49".into()));
    }

    #[tokio::test]
    async fn create_thread_posts_private_thread_type() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/channels/parent-1/threads"))
            .and(body_partial_json(serde_json::json!({
                "name": "My issue",
                "type": 12
            })))
            .respond_with(
                ResponseTemplate::new(201).set_body_json(serde_json::json!({"id": "thread-9"})),
            )
            .mount(&server)
            .await;

        let thread = gateway(&server)
            .await
            .create_thread(&ChannelId("parent-1".into()), "My issue")
            .await
            .unwrap();
        assert_eq!(thread, ChannelId("thread-9".into()));
    }

    #[tokio::test]
    async fn lock_thread_patches_channel() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/channels/thread-9"))
            .and(body_partial_json(serde_json::json!({
                "parent_id": "parent-1",
                "locked": true,
                "archived": true
            })))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        gateway(&server)
            .await
            .lock_thread(&ChannelId("thread-9".into()), &ChannelId("parent-1".into()))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn respond_patches_the_original_interaction_response() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/webhooks/app-1/tok-1/messages/@original"))
            .and(body_partial_json(serde_json::json!({"content": "done"})))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        gateway(&server)
            .await
            .respond(&InteractionToken("tok-1".into()), "done")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn non_success_status_is_a_gateway_error() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/channels/gone"))
            .respond_with(ResponseTemplate::new(404).set_body_string("Unknown Channel"))
            .mount(&server)
            .await;

        let err = gateway(&server)
            .await
            .delete_channel(&ChannelId("gone".into()))
            .await
            .unwrap_err();
        match err {
            SealdeskError::Gateway { message, .. } => {
                assert!(message.contains("404"));
                assert!(message.contains("Unknown Channel"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn send_message_uploads_files_as_multipart() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/channels/log-1/messages"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(
                    serde_json::json!({"id": "sent-1", "author": {"id": "bot"}}),
                ),
            )
            .mount(&server)
            .await;

        let message = OutboundMessage {
            content: None,
            embed: Some(sealdesk_core::Embed {
                title: "Ticket Closed".into(),
                fields: vec![],
            }),
            files: vec![sealdesk_core::FileUpload {
                name: "key.pem".into(),
                content_type: "application/x-pem-file".into(),
                data: b"-----BEGIN".to_vec(),
            }],
        };
        let id = gateway(&server)
            .await
            .send_message(&ChannelId("log-1".into()), &message)
            .await
            .unwrap();
        assert_eq!(id, MessageId("sent-1".into()));
    }
}
