// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Failed syncs leave the cache and the connection state untouched.

use std::time::Duration;

use davsync_core::{Config, DavSync, Error, FailureReason, SyncOptions};
use wiremock::matchers::method;
use wiremock::{Mock, ResponseTemplate};

use crate::common::{MockCollection, calendar_connection, event_ics};

async fn synced_once() -> (DavSync, MockCollection, i64) {
    let remote = MockCollection::calendar().await;
    let sync = DavSync::in_memory(Config::in_memory()).await.unwrap();
    let id = sync
        .add_connection(calendar_connection(remote.uri()))
        .await
        .unwrap()
        .id;
    let e1 = event_ics("e1", "20240110T090000Z", "20240110T100000Z");
    remote.serve("1", &[("e1.ics", "e1", &e1)]).await;
    sync.sync_connection(id, SyncOptions::default()).await.unwrap();
    (sync, remote, id)
}

#[tokio::test]
async fn rollback_on_failed_multiget() {
    // Arrange
    let (sync, remote, id) = synced_once().await;
    let before_entries = sync.get_calendar_entries(id, None, None).await.unwrap();
    let before_conn = sync.get_connection(id).await.unwrap();

    let e2 = event_ics("e2", "20240111T090000Z", "20240111T100000Z");
    remote
        .serve_with_failing_multiget("2", &[("e2.ics", "e2", &e2)])
        .await;

    // Act
    let err = sync
        .sync_connection(id, SyncOptions::forced())
        .await
        .unwrap_err();

    // Assert
    assert!(matches!(err, Error::Transport(_)), "unexpected error: {err}");
    assert_eq!(
        sync.get_calendar_entries(id, None, None).await.unwrap(),
        before_entries
    );
    let after_conn = sync.get_connection(id).await.unwrap();
    assert_eq!(after_conn.ctag, before_conn.ctag);
    assert_eq!(after_conn.lastsynced, before_conn.lastsynced);

    let failure = sync.last_failure().unwrap();
    assert_eq!(failure.connection_id, id);
    assert!(matches!(failure.reason, FailureReason::Error(_)));
}

#[tokio::test]
async fn rollback_on_unparsable_object() {
    let (sync, remote, id) = synced_once().await;
    let before_entries = sync.get_calendar_entries(id, None, None).await.unwrap();

    let e1 = event_ics("e1", "20240110T090000Z", "20240110T100000Z");
    let broken = "BEGIN:VCALENDAR\r\nVERSION:2.0\r\nEND:VCALENDAR\r\n";
    remote
        .serve("2", &[("e1.ics", "e1-v2", &e1), ("bad.ics", "bad", broken)])
        .await;

    let err = sync.sync_connection(id, SyncOptions::default()).await.unwrap_err();

    assert!(matches!(err, Error::Parse(_)), "unexpected error: {err}");
    assert_eq!(
        sync.get_calendar_entries(id, None, None).await.unwrap(),
        before_entries
    );
    assert_eq!(
        sync.get_connection(id).await.unwrap().ctag.as_deref(),
        Some("1")
    );
}

#[tokio::test]
async fn status_with_several_responses_is_a_protocol_error() {
    let (sync, remote, id) = synced_once().await;

    remote.server.reset().await;
    Mock::given(method("PROPFIND"))
        .respond_with(ResponseTemplate::new(207).set_body_raw(
            "<d:multistatus xmlns:d=\"DAV:\">\
             <d:response><d:href>/a/</d:href><d:status>HTTP/1.1 200 OK</d:status></d:response>\
             <d:response><d:href>/b/</d:href><d:status>HTTP/1.1 200 OK</d:status></d:response>\
             </d:multistatus>",
            "application/xml",
        ))
        .mount(&remote.server)
        .await;

    let err = sync
        .sync_connection(id, SyncOptions::forced())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Protocol(_)), "unexpected error: {err}");
}

#[tokio::test]
async fn unknown_connection_is_not_found() {
    let sync = DavSync::in_memory(Config::in_memory()).await.unwrap();
    let err = sync
        .sync_connection(42, SyncOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}

#[tokio::test]
async fn request_timeout_is_a_transport_error() {
    let remote = MockCollection::calendar().await;
    let config = Config {
        request_timeout_secs: 1,
        ..Config::in_memory()
    };
    let sync = DavSync::in_memory(config).await.unwrap();
    let id = sync
        .add_connection(calendar_connection(remote.uri()))
        .await
        .unwrap()
        .id;
    Mock::given(method("PROPFIND"))
        .respond_with(ResponseTemplate::new(207).set_delay(Duration::from_secs(3)))
        .mount(&remote.server)
        .await;

    let err = sync
        .sync_connection(id, SyncOptions::forced())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Transport(_)), "unexpected error: {err}");
    assert_eq!(sync.get_connection(id).await.unwrap().lastsynced, 0);
}
