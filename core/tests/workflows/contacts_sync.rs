// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Address book sync workflow tests.

use davsync_core::{Config, DavSync, SyncOptions, SyncOutcome, SyncReport};

use crate::common::{MockCollection, contacts_connection, vcard};

#[tokio::test]
async fn contacts_sync_indexes_names() {
    // Arrange
    let remote = MockCollection::addressbook().await;
    let sync = DavSync::in_memory(Config::in_memory()).await.unwrap();
    let id = sync
        .add_connection(contacts_connection(remote.uri()))
        .await
        .unwrap()
        .id;
    let zoe = vcard("c1", "Zimmer", "Zoe");
    let adam = vcard("c2", "Abel", "Adam");
    remote
        .serve("7", &[("c1.vcf", "v1", &zoe), ("c2.vcf", "v2", &adam)])
        .await;

    // Act
    let outcome = sync.sync_connection(id, SyncOptions::default()).await.unwrap();

    // Assert
    assert_eq!(
        outcome,
        SyncOutcome::Synced(SyncReport {
            fetched: 2,
            deleted: 0
        })
    );
    let entries = sync.get_addressbook_entries(id).await.unwrap();
    let names: Vec<_> = entries.iter().map(|e| e.formatted_name.as_str()).collect();
    assert_eq!(names, vec!["Adam Abel", "Zoe Zimmer"]);
    assert_eq!(entries[0].structured_name, "Abel;Adam;;;");
    assert_eq!(entries[0].uid.as_deref(), Some("c2"));
    assert_eq!(entries[0].contact_data, adam);
    assert_eq!(entries[0].size, adam.len() as i64);
}

#[tokio::test]
async fn contacts_sync_removes_deleted_cards() {
    let remote = MockCollection::addressbook().await;
    let sync = DavSync::in_memory(Config::in_memory()).await.unwrap();
    let id = sync
        .add_connection(contacts_connection(remote.uri()))
        .await
        .unwrap()
        .id;
    let zoe = vcard("c1", "Zimmer", "Zoe");
    let adam = vcard("c2", "Abel", "Adam");
    remote
        .serve("7", &[("c1.vcf", "v1", &zoe), ("c2.vcf", "v2", &adam)])
        .await;
    sync.sync_connection(id, SyncOptions::default()).await.unwrap();

    remote.serve("8", &[("c2.vcf", "v2", &adam)]).await;
    let outcome = sync.sync_connection(id, SyncOptions::default()).await.unwrap();

    assert_eq!(
        outcome,
        SyncOutcome::Synced(SyncReport {
            fetched: 0,
            deleted: 1
        })
    );
    assert_eq!(remote.multiget_count().await, 1);
    let entries = sync.get_addressbook_entries(id).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].uri, "c2.vcf");
}
