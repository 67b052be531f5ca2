// SPDX-FileCopyrightText: 2026 Sealdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end exercises of the close pipeline against in-memory doubles,
//! a real SQLite store, and a wiremock attachment CDN.

use std::collections::BTreeMap;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use sealdesk_core::{
    AttachmentRef, ChannelId, CloseRefusal, GatewayMessage, MessageId, NewTicket, SealdeskError,
    TicketId, TicketStore, TranscriptMessage, TranscriptMeta, UserId,
};
use sealdesk_store::SqliteTicketStore;
use sealdesk_ticket::testing::{
    context_with, test_config, test_event, FailingCommitStore, MockGateway,
};
use sealdesk_ticket::{close_ticket, AppContext, PAGE_SIZE};
use sealdesk_transcript::{
    archive_filename, attachment_section_name, decode_private_key, Archive, TranscriptKeypair,
    OVERSIZE_ERROR, SECTION_DATA, SECTION_META,
};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn message(id: &str, attachments: Vec<AttachmentRef>) -> GatewayMessage {
    GatewayMessage {
        id: MessageId(id.to_string()),
        author_id: UserId("author-1".to_string()),
        content: format!("content of {id}"),
        embeds: Vec::new(),
        attachments,
    }
}

fn ticket_in(channel: &str) -> NewTicket {
    let mut context = BTreeMap::new();
    context.insert("What happened?".to_string(), "It crashed".to_string());
    NewTicket {
        id: TicketId::generate(),
        topic_id: "general".to_string(),
        user_id: UserId("requester".to_string()),
        channel_id: ChannelId(channel.to_string()),
        issue: "Crash on startup".to_string(),
        ticket_context: context,
    }
}

async fn setup(storage_root: &std::path::Path) -> (AppContext, Arc<MockGateway>) {
    let gateway = Arc::new(MockGateway::new());
    let store = SqliteTicketStore::open_in_memory().await.unwrap();
    let ctx = context_with(test_config(storage_root), Arc::new(store), gateway.clone());
    (ctx, gateway)
}

#[tokio::test]
async fn close_seals_notifies_and_commits() {
    let dir = tempfile::tempdir().unwrap();
    let (ctx, gateway) = setup(dir.path()).await;

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/files/small.png"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"attachment-bytes".to_vec()))
        .mount(&server)
        .await;

    let ticket = ticket_in("thread-1");
    ctx.store.insert(&ticket).await.unwrap();

    // Newest first, as the platform pages history.
    gateway.set_history(vec![
        message("m3", vec![]),
        message(
            "m2",
            vec![AttachmentRef {
                id: "a2".to_string(),
                name: "small.png".to_string(),
                url: None,
                proxy_url: Some(format!("{}/files/small.png", server.uri())),
                size: 16,
            }],
        ),
        message(
            "m1",
            vec![AttachmentRef {
                id: "a1".to_string(),
                name: "huge.bin".to_string(),
                url: Some(format!("{}/files/huge.bin", server.uri())),
                proxy_url: Some(format!("{}/files/huge.bin", server.uri())),
                size: 20_000_000,
            }],
        ),
    ]);

    let event = test_event("close", &ChannelId("thread-1".into()), &UserId("staff-1".into()));
    close_ticket(&ctx, &ticket.id, &event).await.unwrap();

    // Progress and completion messages.
    assert_eq!(
        gateway.response_texts(),
        vec![format!("Closing ticket {}... Please wait...", ticket.id)]
    );
    let expected_url = format!(
        "https://transcripts.example.com/{}",
        archive_filename(&ticket.id)
    );
    assert_eq!(
        gateway.edit_texts(),
        vec![format!(
            "Your ticket has been closed and can be viewed at: {expected_url}"
        )]
    );

    // The archive exists and only the downloaded attachment got a section.
    // The 20 MB attachment sits over the fetch ceiling, so it can never
    // produce a blob section; it surfaces as an error in its descriptor
    // inside `data` instead.
    let archive = Archive::load(&dir.path().join(archive_filename(&ticket.id))).unwrap();
    let a2_section = attachment_section_name("a2");
    let names: Vec<&str> = archive.section_names().collect();
    assert_eq!(names, vec![SECTION_DATA, SECTION_META, a2_section.as_str()]);

    // Staff got the one-time key; use it to open the sections.
    let log_messages = gateway.sent_to(&ChannelId("log-channel".into()));
    assert_eq!(log_messages.len(), 1);
    let embed = log_messages[0].embed.as_ref().unwrap();
    assert_eq!(embed.title, "Ticket Closed");
    assert!(embed
        .fields
        .iter()
        .any(|f| f.name == "Ticket URL" && f.value == expected_url));
    let key_file = &log_messages[0].files[0];
    assert_eq!(key_file.name, format!("{}.key.pem", ticket.id));
    let pem = String::from_utf8(key_file.data.clone()).unwrap();
    let private = decode_private_key(&pem).unwrap();
    let keypair = TranscriptKeypair::from_bytes(*private);

    let data = archive.open_section(&keypair, SECTION_DATA).unwrap();
    let messages: Vec<TranscriptMessage> = serde_json::from_slice(&data).unwrap();
    assert_eq!(messages.len(), 3);
    assert_eq!(messages[0].id, MessageId("m3".into()));
    assert_eq!(messages[2].id, MessageId("m1".into()));
    // Downloaded attachment drops its URLs; the oversized one keeps them
    // and records why it was skipped.
    assert!(messages[1].attachments[0].errors.is_empty());
    assert!(messages[1].attachments[0].proxy_url.is_none());
    assert_eq!(
        messages[2].attachments[0].errors,
        vec![OVERSIZE_ERROR.to_string()]
    );
    assert!(messages[2].attachments[0].url.is_some());

    let meta_bytes = archive.open_section(&keypair, SECTION_META).unwrap();
    let meta: TranscriptMeta = serde_json::from_slice(&meta_bytes).unwrap();
    assert_eq!(meta.ticket_id, ticket.id);
    assert_eq!(meta.close_user_id, UserId("staff-1".into()));
    assert_eq!(meta.topic.name, "General Support");

    let attachment = archive
        .open_section(&keypair, &attachment_section_name("a2"))
        .unwrap();
    assert_eq!(attachment, b"attachment-bytes");

    // Requester got a best-effort DM with the summary.
    assert_eq!(gateway.sent_to(&ChannelId("dm-requester".into())).len(), 1);

    // Row committed and the thread locked under the configured parent.
    let closed = ctx.store.fetch(&ticket.id).await.unwrap().unwrap();
    assert!(!closed.open);
    assert_eq!(closed.close_user_id, Some(UserId("staff-1".into())));
    assert!(closed.archive_path.unwrap().ends_with(&archive_filename(&ticket.id)));
    assert_eq!(
        gateway.locked.lock().unwrap().as_slice(),
        &[(
            ChannelId("thread-1".into()),
            ChannelId("thread-parent".into())
        )]
    );
}

#[tokio::test]
async fn pagination_walks_the_entire_history() {
    let dir = tempfile::tempdir().unwrap();
    let (ctx, gateway) = setup(dir.path()).await;

    let ticket = ticket_in("thread-1");
    ctx.store.insert(&ticket).await.unwrap();

    // 250 messages: two full pages and one short page of 50.
    let history: Vec<GatewayMessage> = (0..250)
        .map(|n| message(&format!("m{n:03}"), vec![]))
        .collect();
    gateway.set_history(history.clone());

    let event = test_event("close", &ChannelId("thread-1".into()), &UserId("staff-1".into()));
    close_ticket(&ctx, &ticket.id, &event).await.unwrap();

    assert_eq!(gateway.history_calls.load(Ordering::SeqCst), 3);

    let log_messages = gateway.sent_to(&ChannelId("log-channel".into()));
    let pem = String::from_utf8(log_messages[0].files[0].data.clone()).unwrap();
    let keypair = TranscriptKeypair::from_bytes(*decode_private_key(&pem).unwrap());

    let archive = Archive::load(&dir.path().join(archive_filename(&ticket.id))).unwrap();
    let data = archive.open_section(&keypair, SECTION_DATA).unwrap();
    let messages: Vec<TranscriptMessage> = serde_json::from_slice(&data).unwrap();

    // Every message exactly once, in the order the platform returned them.
    assert!(history.len() > 2 * PAGE_SIZE && history.len() < 3 * PAGE_SIZE);
    assert_eq!(messages.len(), history.len());
    for (got, want) in messages.iter().zip(history.iter()) {
        assert_eq!(got.id, want.id);
    }
}

#[tokio::test]
async fn second_close_is_refused_without_side_effects() {
    let dir = tempfile::tempdir().unwrap();
    let (ctx, gateway) = setup(dir.path()).await;

    let ticket = ticket_in("thread-1");
    ctx.store.insert(&ticket).await.unwrap();
    ctx.store
        .mark_closed(&ticket.id, &UserId("staff-1".into()), "already-archived")
        .await
        .unwrap();

    let event = test_event("close", &ChannelId("thread-1".into()), &UserId("staff-2".into()));
    let err = close_ticket(&ctx, &ticket.id, &event).await.unwrap_err();

    assert!(matches!(
        err,
        SealdeskError::CloseRefused(CloseRefusal::AlreadyClosed)
    ));
    assert_eq!(
        gateway.response_texts(),
        vec![CloseRefusal::AlreadyClosed.user_message().to_string()]
    );
    // Refused before pagination, sealing, or any write.
    assert_eq!(gateway.history_calls.load(Ordering::SeqCst), 0);
    assert!(std::fs::read_dir(dir.path()).unwrap().next().is_none());
    let row = ctx.store.fetch(&ticket.id).await.unwrap().unwrap();
    assert_eq!(row.close_user_id, Some(UserId("staff-1".into())));
}

#[tokio::test]
async fn commit_failure_leaves_the_ticket_open() {
    let dir = tempfile::tempdir().unwrap();
    let gateway = Arc::new(MockGateway::new());
    let real_store = Arc::new(SqliteTicketStore::open_in_memory().await.unwrap());
    let failing = Arc::new(FailingCommitStore {
        inner: real_store.clone(),
    });
    let ctx = context_with(test_config(dir.path()), failing, gateway.clone());

    let ticket = ticket_in("thread-1");
    real_store.insert(&ticket).await.unwrap();
    gateway.set_history(vec![message("m1", vec![])]);

    let event = test_event("close", &ChannelId("thread-1".into()), &UserId("staff-1".into()));
    let err = close_ticket(&ctx, &ticket.id, &event).await.unwrap_err();

    assert!(matches!(err, SealdeskError::Storage { .. }));
    assert_eq!(
        gateway.edit_texts(),
        vec![
            "Your ticket couldn't be closed properly (couldn't update database)! \
             Please try again later."
                .to_string()
        ]
    );
    // The row never transitioned.
    let row = real_store.fetch(&ticket.id).await.unwrap().unwrap();
    assert!(row.open);
    assert!(row.close_user_id.is_none());
    // The thread was never locked.
    assert!(gateway.locked.lock().unwrap().is_empty());
}

#[tokio::test]
async fn attachment_transport_failure_aborts_the_close() {
    let dir = tempfile::tempdir().unwrap();
    let (ctx, gateway) = setup(dir.path()).await;

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/files/broken.png"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let ticket = ticket_in("thread-1");
    ctx.store.insert(&ticket).await.unwrap();
    gateway.set_history(vec![message(
        "m1",
        vec![AttachmentRef {
            id: "a1".to_string(),
            name: "broken.png".to_string(),
            url: Some(format!("{}/files/broken.png", server.uri())),
            proxy_url: None,
            size: 16,
        }],
    )]);

    let event = test_event("close", &ChannelId("thread-1".into()), &UserId("staff-1".into()));
    let err = close_ticket(&ctx, &ticket.id, &event).await.unwrap_err();

    assert!(matches!(err, SealdeskError::AttachmentFetch { .. }));
    assert_eq!(
        gateway.edit_texts(),
        vec![
            "Your ticket couldn't be closed properly (couldn't fetch attachments)! \
             Please try again later."
                .to_string()
        ]
    );
    // No archive was written and the ticket is still open.
    assert!(!dir.path().join(archive_filename(&ticket.id)).exists());
    assert!(ctx.store.fetch(&ticket.id).await.unwrap().unwrap().open);
}

#[tokio::test]
async fn dm_failure_does_not_abort_the_close() {
    let dir = tempfile::tempdir().unwrap();
    let (ctx, gateway) = setup(dir.path()).await;
    gateway.fail_dm.store(true, Ordering::SeqCst);

    let ticket = ticket_in("thread-1");
    ctx.store.insert(&ticket).await.unwrap();
    gateway.set_history(vec![message("m1", vec![])]);

    let event = test_event("close", &ChannelId("thread-1".into()), &UserId("staff-1".into()));
    close_ticket(&ctx, &ticket.id, &event).await.unwrap();

    assert!(!ctx.store.fetch(&ticket.id).await.unwrap().unwrap().open);
}

#[tokio::test]
async fn lock_failure_after_commit_is_reported_but_the_close_stands() {
    let dir = tempfile::tempdir().unwrap();
    let (ctx, gateway) = setup(dir.path()).await;
    gateway.fail_lock.store(true, Ordering::SeqCst);

    let ticket = ticket_in("thread-1");
    ctx.store.insert(&ticket).await.unwrap();
    gateway.set_history(vec![message("m1", vec![])]);

    let event = test_event("close", &ChannelId("thread-1".into()), &UserId("staff-1".into()));
    let err = close_ticket(&ctx, &ticket.id, &event).await.unwrap_err();

    assert!(matches!(err, SealdeskError::Gateway { .. }));
    assert_eq!(
        gateway.edit_texts(),
        vec!["Your ticket couldn't be closed properly! Please try again later.".to_string()]
    );
    // The commit already happened; the ticket stays closed.
    assert!(!ctx.store.fetch(&ticket.id).await.unwrap().unwrap().open);
}
