// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Connection management and multi-connection sync.

use davsync_core::{
    Config, ConnectionDraft, ConnectionPatch, ConnectionType, DavSync, Error, SyncOptions,
};

use crate::common::{MockCollection, calendar_connection, contacts_connection, event_ics, vcard};

#[tokio::test]
async fn connections_add_modify_delete() {
    let sync = DavSync::in_memory(Config::in_memory()).await.unwrap();

    let conn = sync
        .add_connection(ConnectionDraft::new(
            "https://dav.example.com/cal",
            ConnectionType::Calendar,
        ))
        .await
        .unwrap();
    assert_eq!(conn.uri, "https://dav.example.com/cal/");
    assert_eq!(conn.syncinterval, 3600);
    assert!(conn.active);
    assert!(!conn.write);

    let patch = ConnectionPatch {
        displayname: Some("Work".to_string()),
        active: Some(false),
        ..ConnectionPatch::default()
    };
    let modified = sync.modify_connection(conn.id, patch).await.unwrap();
    assert_eq!(modified.displayname, "Work");
    assert!(!modified.active);
    assert_eq!(sync.get_connection(conn.id).await.unwrap(), modified);
    assert_eq!(sync.get_connections().await.unwrap(), vec![modified]);

    sync.delete_connection(conn.id).await.unwrap();
    assert!(matches!(
        sync.get_connection(conn.id).await,
        Err(Error::NotFound(_))
    ));
    assert!(matches!(
        sync.delete_connection(conn.id).await,
        Err(Error::NotFound(_))
    ));
}

#[tokio::test]
async fn connections_reject_invalid_url() {
    let sync = DavSync::in_memory(Config::in_memory()).await.unwrap();
    let err = sync
        .add_connection(ConnectionDraft::new("dav.example.com", ConnectionType::Contacts))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Config(_)));
}

#[tokio::test]
async fn connections_entries_require_matching_type() {
    let sync = DavSync::in_memory(Config::in_memory()).await.unwrap();
    let id = sync
        .add_connection(contacts_connection("https://dav.example.com/ab/"))
        .await
        .unwrap()
        .id;
    assert!(sync.get_addressbook_entries(id).await.unwrap().is_empty());
    assert!(matches!(
        sync.get_calendar_entries(id, None, None).await,
        Err(Error::Config(_))
    ));
}

#[tokio::test]
async fn connections_delete_all_entries_forces_full_refetch() {
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

    assert_eq!(sync.delete_all_entries(id).await.unwrap(), 1);
    assert!(sync.get_calendar_entries(id, None, None).await.unwrap().is_empty());
    assert_eq!(sync.get_connection(id).await.unwrap().ctag, None);

    // same ctag as before, but the cleared tag forces a listing
    let outcome = sync.sync_connection(id, SyncOptions::default()).await.unwrap();
    assert!(outcome.is_synced());
    assert_eq!(sync.get_calendar_entries(id, None, None).await.unwrap().len(), 1);
}

#[tokio::test]
async fn connections_sync_all_continues_past_failures() {
    let calendar = MockCollection::calendar().await;
    let contacts = MockCollection::addressbook().await;
    let sync = DavSync::in_memory(Config::in_memory()).await.unwrap();

    let broken = sync
        .add_connection(calendar_connection(format!("{}/missing/", calendar.server.uri())))
        .await
        .unwrap()
        .id;
    let feed = sync
        .add_connection(ConnectionDraft::new(
            "https://example.com/feed.ics",
            ConnectionType::IcsFeed,
        ))
        .await
        .unwrap()
        .id;
    let ab = sync
        .add_connection(contacts_connection(contacts.uri()))
        .await
        .unwrap()
        .id;
    let card = vcard("c1", "Doe", "Jane");
    contacts.serve("1", &[("c1.vcf", "v1", &card)]).await;

    let results = sync.sync_all_connections().await.unwrap();

    assert_eq!(results.len(), 3);
    assert_eq!(results[0].0, broken);
    assert!(matches!(results[0].1, Err(Error::Transport(_))));
    assert_eq!(results[1].0, feed);
    assert!(matches!(&results[1].1, Ok(o) if !o.is_synced()));
    assert_eq!(results[2].0, ab);
    assert!(matches!(&results[2].1, Ok(o) if o.is_synced()));
    assert_eq!(sync.get_addressbook_entries(ab).await.unwrap().len(), 1);
}

#[tokio::test]
async fn connections_indexer_sync_stops_after_first_sync() {
    let first = MockCollection::calendar().await;
    let second = MockCollection::calendar().await;
    let sync = DavSync::in_memory(Config::in_memory()).await.unwrap();
    let a = sync
        .add_connection(calendar_connection(first.uri()))
        .await
        .unwrap()
        .id;
    let b = sync
        .add_connection(calendar_connection(second.uri()))
        .await
        .unwrap()
        .id;
    let e1 = event_ics("e1", "20240110T090000Z", "20240110T100000Z");
    first.serve("1", &[("e1.ics", "e1", &e1)]).await;
    second.serve("1", &[("e1.ics", "e1", &e1)]).await;

    assert!(sync.indexer_sync_all_connections().await.unwrap());
    assert_eq!(sync.get_calendar_entries(a, None, None).await.unwrap().len(), 1);
    assert!(sync.get_calendar_entries(b, None, None).await.unwrap().is_empty());

    // a is unchanged now, so b is next
    assert!(sync.indexer_sync_all_connections().await.unwrap());
    assert_eq!(sync.get_calendar_entries(b, None, None).await.unwrap().len(), 1);

    // both unchanged
    assert!(!sync.indexer_sync_all_connections().await.unwrap());
}
