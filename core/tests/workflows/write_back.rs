// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Write-back of local edits followed by a resync.

use davsync_core::{Config, DavSync, Error, SyncOptions};
use wiremock::matchers::{header, method, path, path_regex};
use wiremock::{Mock, ResponseTemplate};

use crate::common::{MockCollection, calendar_connection, contacts_connection, event_ics, vcard};

#[tokio::test]
async fn write_back_add_puts_new_resource_and_resyncs() {
    // Arrange
    let remote = MockCollection::calendar().await;
    let sync = DavSync::in_memory(Config::in_memory()).await.unwrap();
    let id = sync
        .add_connection(calendar_connection(remote.uri()))
        .await
        .unwrap()
        .id;
    let e1 = event_ics("e1", "20240110T090000Z", "20240110T100000Z");
    remote.serve("2", &[("stored.ics", "s1", &e1)]).await;
    Mock::given(method("PUT"))
        .and(path_regex(r"^/dav/calendars/user/work/[0-9a-f-]+\.ics$"))
        .and(header("Content-Type", "text/calendar; charset=utf-8"))
        .respond_with(ResponseTemplate::new(201).insert_header("ETag", "\"s1\""))
        .expect(1)
        .mount(&remote.server)
        .await;

    // Act
    let uri = sync.add_calendar_entry(id, &e1).await.unwrap();

    // Assert
    assert!(uri.ends_with(".ics"));
    let entries = sync.get_calendar_entries(id, None, None).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].etag, "s1");
}

#[tokio::test]
async fn write_back_edit_sends_if_match() {
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

    let edited = event_ics("e1", "20240110T130000Z", "20240110T140000Z");
    remote.serve("2", &[("e1.ics", "e1-v2", &edited)]).await;
    Mock::given(method("PUT"))
        .and(path(remote.resource_path("e1.ics")))
        .and(header("If-Match", "\"e1\""))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&remote.server)
        .await;

    sync.edit_calendar_entry(id, "e1.ics", &edited).await.unwrap();

    let entries = sync.get_calendar_entries(id, None, None).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].etag, "e1-v2");
}

#[tokio::test]
async fn write_back_conflict_keeps_cache() {
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

    Mock::given(method("DELETE"))
        .and(path(remote.resource_path("e1.ics")))
        .respond_with(ResponseTemplate::new(412))
        .mount(&remote.server)
        .await;

    let err = sync.delete_calendar_entry(id, "e1.ics").await.unwrap_err();

    assert!(matches!(err, Error::Conflict(_)), "unexpected error: {err}");
    assert_eq!(sync.get_calendar_entries(id, None, None).await.unwrap().len(), 1);
}

#[tokio::test]
async fn write_back_delete_contact() {
    let remote = MockCollection::addressbook().await;
    let sync = DavSync::in_memory(Config::in_memory()).await.unwrap();
    let id = sync
        .add_connection(contacts_connection(remote.uri()))
        .await
        .unwrap()
        .id;
    let card = vcard("c1", "Doe", "Jane");
    remote.serve("1", &[("c1.vcf", "v1", &card)]).await;
    sync.sync_connection(id, SyncOptions::default()).await.unwrap();

    remote.serve("2", &[]).await;
    Mock::given(method("DELETE"))
        .and(path(remote.resource_path("c1.vcf")))
        .and(header("If-Match", "\"v1\""))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&remote.server)
        .await;

    sync.delete_addressbook_entry(id, "c1.vcf").await.unwrap();

    assert!(sync.get_addressbook_entries(id).await.unwrap().is_empty());
}

#[tokio::test]
async fn write_back_requires_writable_connection() {
    let remote = MockCollection::calendar().await;
    let sync = DavSync::in_memory(Config::in_memory()).await.unwrap();
    let mut draft = calendar_connection(remote.uri());
    draft.write = false;
    let id = sync.add_connection(draft).await.unwrap().id;

    let e1 = event_ics("e1", "20240110T090000Z", "20240110T100000Z");
    let err = sync.add_calendar_entry(id, &e1).await.unwrap_err();
    assert!(matches!(err, Error::Config(_)));
}

#[tokio::test]
async fn write_back_rejects_invalid_payload() {
    let remote = MockCollection::addressbook().await;
    let sync = DavSync::in_memory(Config::in_memory()).await.unwrap();
    let id = sync
        .add_connection(contacts_connection(remote.uri()))
        .await
        .unwrap()
        .id;

    let err = sync
        .add_addressbook_entry(id, "FN:Nobody\r\n")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Parse(_)));
}
