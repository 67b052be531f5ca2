// SPDX-FileCopyrightText: 2026 Sealdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Signed interaction webhook endpoint.
//!
//! Discord posts every interaction to this endpoint and requires two things
//! of it: verify the Ed25519 signature over `timestamp || body` (rejecting
//! forgeries with 401, which Discord probes for at setup time), and answer
//! pings with a pong. Real interactions are acknowledged with a deferred
//! response and handed to the dispatch callback; the handler then edits the
//! deferred response through the REST client.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use ed25519_dalek::{Signature, VerifyingKey, PUBLIC_KEY_LENGTH};
use sealdesk_core::{InteractionEvent, SealdeskError};
use serde_json::json;
use tracing::{debug, warn};

use crate::wire::{Interaction, INTERACTION_PING};

/// Verifies interaction signatures against the application public key.
pub struct InteractionVerifier {
    key: VerifyingKey,
}

impl InteractionVerifier {
    /// Build a verifier from the hex public key shown in the application's
    /// developer portal settings.
    pub fn new(public_key_hex: &str) -> Result<Self, SealdeskError> {
        let bytes = hex::decode(public_key_hex)
            .map_err(|e| SealdeskError::Config(format!("invalid interaction public key: {e}")))?;
        let bytes: [u8; PUBLIC_KEY_LENGTH] = bytes.try_into().map_err(|_| {
            SealdeskError::Config(format!(
                "interaction public key must be {PUBLIC_KEY_LENGTH} bytes"
            ))
        })?;
        let key = VerifyingKey::from_bytes(&bytes)
            .map_err(|e| SealdeskError::Config(format!("invalid interaction public key: {e}")))?;
        Ok(Self { key })
    }

    /// Check a signature over `timestamp || body`.
    pub fn verify(&self, timestamp: &str, body: &[u8], signature_hex: &str) -> bool {
        let Ok(sig_bytes) = hex::decode(signature_hex) else {
            return false;
        };
        let Ok(signature) = Signature::from_slice(&sig_bytes) else {
            return false;
        };
        let mut message = Vec::with_capacity(timestamp.len() + body.len());
        message.extend_from_slice(timestamp.as_bytes());
        message.extend_from_slice(body);
        self.key.verify_strict(&message, &signature).is_ok()
    }
}

/// Shared state for the interactions route.
#[derive(Clone)]
pub struct WebhookState {
    pub verifier: Arc<InteractionVerifier>,
    /// Receives each parsed interaction event; expected to hand it off to a
    /// task and return immediately so the HTTP response stays inside the
    /// platform's deadline.
    pub dispatch: Arc<dyn Fn(InteractionEvent) + Send + Sync>,
}

/// Build the router serving `POST /interactions`.
pub fn interactions_router(state: WebhookState) -> Router {
    Router::new()
        .route("/interactions", post(post_interactions))
        .with_state(state)
}

async fn post_interactions(
    State(state): State<WebhookState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let signature = header_str(&headers, "x-signature-ed25519");
    let timestamp = header_str(&headers, "x-signature-timestamp");
    let (Some(signature), Some(timestamp)) = (signature, timestamp) else {
        return StatusCode::UNAUTHORIZED.into_response();
    };
    if !state.verifier.verify(timestamp, &body, signature) {
        warn!("rejected interaction with bad signature");
        return StatusCode::UNAUTHORIZED.into_response();
    }

    let interaction: Interaction = match serde_json::from_slice(&body) {
        Ok(interaction) => interaction,
        Err(err) => {
            warn!(error = %err, "unparseable interaction payload");
            return StatusCode::BAD_REQUEST.into_response();
        }
    };

    if interaction.kind == INTERACTION_PING {
        debug!("answering interaction ping");
        return Json(json!({ "type": 1 })).into_response();
    }

    match interaction.to_event() {
        Some(event) => {
            (state.dispatch)(event);
            // Deferred ephemeral response; the handler edits it when done.
            Json(json!({ "type": 5, "data": { "flags": 64 } })).into_response()
        }
        None => StatusCode::BAD_REQUEST.into_response(),
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use axum::body::Body;
    use axum::http::Request;
    use ed25519_dalek::{Signer, SigningKey};
    use rand::rngs::OsRng;
    use tower::ServiceExt;

    struct Harness {
        router: Router,
        signing: SigningKey,
        received: Arc<Mutex<Vec<InteractionEvent>>>,
    }

    fn harness() -> Harness {
        let signing = SigningKey::generate(&mut OsRng);
        let verifier =
            InteractionVerifier::new(&hex::encode(signing.verifying_key().to_bytes())).unwrap();
        let received: Arc<Mutex<Vec<InteractionEvent>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = received.clone();
        let router = interactions_router(WebhookState {
            verifier: Arc::new(verifier),
            dispatch: Arc::new(move |event| sink.lock().unwrap().push(event)),
        });
        Harness {
            router,
            signing,
            received,
        }
    }

    fn signed_request(harness: &Harness, body: &str, valid: bool) -> Request<Body> {
        let timestamp = "1700000000";
        let mut message = timestamp.as_bytes().to_vec();
        message.extend_from_slice(body.as_bytes());
        let signature = if valid {
            hex::encode(harness.signing.sign(&message).to_bytes())
        } else {
            hex::encode([0u8; 64])
        };
        Request::builder()
            .method("POST")
            .uri("/interactions")
            .header("x-signature-ed25519", signature)
            .header("x-signature-timestamp", timestamp)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn ping_is_answered_with_pong() {
        let h = harness();
        let response = h
            .router
            .clone()
            .oneshot(signed_request(&h, r#"{"type": 1}"#, true))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["type"], 1);
    }

    #[tokio::test]
    async fn bad_signature_is_unauthorized() {
        let h = harness();
        let response = h
            .router
            .clone()
            .oneshot(signed_request(&h, r#"{"type": 1}"#, false))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(h.received.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn component_interaction_is_dispatched_and_deferred() {
        let h = harness();
        let body = r#"{
            "type": 3,
            "token": "tok",
            "channel_id": "chan",
            "member": {"user": {"id": "user"}},
            "data": {"custom_id": "close:abc"}
        }"#;
        let response = h
            .router
            .clone()
            .oneshot(signed_request(&h, body, true))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["type"], 5);

        let received = h.received.lock().unwrap();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].custom_id, "close:abc");
    }

    #[test]
    fn verifier_rejects_malformed_keys() {
        assert!(InteractionVerifier::new("not-hex").is_err());
        assert!(InteractionVerifier::new("abcd").is_err());
    }
}
