// SPDX-FileCopyrightText: 2026 Sealdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Attachment fetching for transcript sealing.
//!
//! The size ceiling is policy: an oversized attachment is an expected,
//! recorded omission (soft failure). A transport fault on an attempted
//! download is NOT: it would leave the transcript silently incomplete, so
//! it aborts the entire close operation (hard failure).

use std::collections::HashMap;
use std::time::Duration;

use sealdesk_core::{Attachment, AttachmentRef, SealdeskError};
use tracing::{debug, warn};

/// Attachments larger than this are never downloaded.
pub const MAX_ATTACHMENT_BYTES: u64 = 16_000_000;

/// Error recorded on descriptors of attachments skipped as oversized.
pub const OVERSIZE_ERROR: &str = "Attachment is too large to be uploaded to the transcript.";

/// Timeout for each attachment download.
const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Downloads message attachments for the transcript.
#[derive(Debug, Clone)]
pub struct AttachmentFetcher {
    client: reqwest::Client,
}

impl AttachmentFetcher {
    /// Create a fetcher with its own HTTP client and per-request timeout.
    pub fn new() -> Result<Self, SealdeskError> {
        let client = reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .build()
            .map_err(|e| SealdeskError::AttachmentFetch {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;
        Ok(Self { client })
    }

    /// Wrap an existing HTTP client (shared from the app context).
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Resolve one message's attachments.
    ///
    /// Returns the descriptor list for embedding in the transcript, plus a
    /// map from attachment id to raw bytes for everything actually
    /// downloaded. Oversized attachments get a descriptor with a populated
    /// error list and no map entry; any transport failure propagates as a
    /// hard error.
    pub async fn fetch_all(
        &self,
        refs: &[AttachmentRef],
    ) -> Result<(Vec<Attachment>, HashMap<String, Vec<u8>>), SealdeskError> {
        let mut descriptors = Vec::with_capacity(refs.len());
        let mut buffers = HashMap::new();

        for attachment in refs {
            if attachment.size > MAX_ATTACHMENT_BYTES {
                warn!(
                    attachment_id = %attachment.id,
                    size = attachment.size,
                    "skipping oversized attachment"
                );
                descriptors.push(Attachment {
                    id: attachment.id.clone(),
                    name: attachment.name.clone(),
                    url: attachment.url.clone(),
                    proxy_url: attachment.proxy_url.clone(),
                    errors: vec![OVERSIZE_ERROR.to_string()],
                });
                continue;
            }

            let bytes = self.download(attachment).await?;
            debug!(
                attachment_id = %attachment.id,
                bytes = bytes.len(),
                "attachment fetched"
            );
            buffers.insert(attachment.id.clone(), bytes);

            // Clean fetch: the bytes live in the archive, so the descriptor
            // does not need to carry the platform URLs.
            descriptors.push(Attachment {
                id: attachment.id.clone(),
                name: attachment.name.clone(),
                url: None,
                proxy_url: None,
                errors: vec![],
            });
        }

        Ok((descriptors, buffers))
    }

    /// Download one attachment's bytes, preferring the cached proxy URL.
    async fn download(&self, attachment: &AttachmentRef) -> Result<Vec<u8>, SealdeskError> {
        let url = attachment
            .proxy_url
            .as_deref()
            .or(attachment.url.as_deref())
            .ok_or_else(|| SealdeskError::AttachmentFetch {
                message: format!("attachment {} has no downloadable URL", attachment.id),
                source: None,
            })?;

        let response = self.client.get(url).send().await.map_err(|e| {
            SealdeskError::AttachmentFetch {
                message: format!("error downloading attachment from {url}: {e}"),
                source: Some(Box::new(e)),
            }
        })?;

        let response = response
            .error_for_status()
            .map_err(|e| SealdeskError::AttachmentFetch {
                message: format!("attachment download from {url} returned {e}"),
                source: Some(Box::new(e)),
            })?;

        let bytes = response
            .bytes()
            .await
            .map_err(|e| SealdeskError::AttachmentFetch {
                message: format!("error reading attachment body from {url}: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(bytes.to_vec())
    }
}
