// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Calendar sync workflow tests.

use chrono::{DateTime, Utc};
use davsync_core::{
    Config, DavSync, FailureReason, SkipReason, SyncOptions, SyncOutcome, SyncReport,
};

use crate::common::{MockCollection, calendar_connection, event_ics, setup_temp_dirs};

fn ts(s: &str) -> i64 {
    DateTime::parse_from_rfc3339(s).unwrap().timestamp()
}

async fn setup() -> (DavSync, MockCollection, i64) {
    let remote = MockCollection::calendar().await;
    let sync = DavSync::in_memory(Config::in_memory()).await.unwrap();
    let conn = sync
        .add_connection(calendar_connection(remote.uri()))
        .await
        .unwrap();
    (sync, remote, conn.id)
}

#[tokio::test]
async fn calendar_sync_fills_empty_cache() {
    // Arrange
    let (sync, remote, id) = setup().await;
    let e1 = event_ics("e1", "20240110T090000Z", "20240110T100000Z");
    remote.serve("1", &[("e1.ics", "e1", &e1)]).await;
    assert_eq!(sync.get_connection(id).await.unwrap().ctag, None);

    // Act
    let before = Utc::now().timestamp();
    let outcome = sync.sync_connection(id, SyncOptions::default()).await.unwrap();
    let after = Utc::now().timestamp();

    // Assert
    assert_eq!(
        outcome,
        SyncOutcome::Synced(SyncReport {
            fetched: 1,
            deleted: 0
        })
    );

    let entries = sync.get_calendar_entries(id, None, None).await.unwrap();
    assert_eq!(entries.len(), 1);
    let entry = &entries[0];
    assert_eq!(entry.uri, "e1.ics");
    assert_eq!(entry.etag, "e1");
    assert_eq!(entry.uid, "e1");
    assert_eq!(entry.component_type, "VEVENT");
    assert_eq!(entry.first_occurrence, Some(ts("2024-01-10T09:00:00Z")));
    assert_eq!(entry.last_occurrence, Some(ts("2024-01-10T10:00:00Z")));
    assert_eq!(entry.lastmodified, ts("2024-01-10T09:00:00Z"));

    let conn = sync.get_connection(id).await.unwrap();
    assert_eq!(conn.ctag.as_deref(), Some("1"));
    assert_eq!(conn.synctoken.as_deref(), Some("http://example.com/sync/1"));
    assert!(conn.lastsynced >= before && conn.lastsynced <= after);
}

#[tokio::test]
async fn calendar_sync_twice_without_changes_is_unchanged() {
    let (sync, remote, id) = setup().await;
    let e1 = event_ics("e1", "20240110T090000Z", "20240110T100000Z");
    remote.serve("1", &[("e1.ics", "e1", &e1)]).await;

    sync.sync_connection(id, SyncOptions::default()).await.unwrap();
    let first = sync.get_calendar_entries(id, None, None).await.unwrap();

    let outcome = sync.sync_connection(id, SyncOptions::default()).await.unwrap();
    assert_eq!(outcome, SyncOutcome::Unchanged);
    assert_eq!(sync.get_calendar_entries(id, None, None).await.unwrap(), first);
    assert_eq!(remote.multiget_count().await, 1);
}

#[tokio::test]
async fn calendar_forced_sync_without_changes_fetches_nothing() {
    let (sync, remote, id) = setup().await;
    let e1 = event_ics("e1", "20240110T090000Z", "20240110T100000Z");
    remote.serve("1", &[("e1.ics", "e1", &e1)]).await;

    sync.sync_connection(id, SyncOptions::default()).await.unwrap();
    let outcome = sync.sync_connection(id, SyncOptions::forced()).await.unwrap();

    assert_eq!(outcome, SyncOutcome::Synced(SyncReport::default()));
    assert_eq!(remote.multiget_count().await, 1);
}

#[tokio::test]
async fn calendar_sync_applies_remote_changes() {
    // Arrange
    let (sync, remote, id) = setup().await;
    let e1 = event_ics("e1", "20240110T090000Z", "20240110T100000Z");
    let e2 = event_ics("e2", "20240111T090000Z", "20240111T100000Z");
    let e3 = event_ics("e3", "20240112T090000Z", "20240112T100000Z");
    remote
        .serve("1", &[("e1.ics", "e1", &e1), ("e2.ics", "e2", &e2)])
        .await;
    sync.sync_connection(id, SyncOptions::default()).await.unwrap();

    // Act: e1 removed, e2 edited, e3 added
    let e2_edited = event_ics("e2", "20240111T140000Z", "20240111T150000Z");
    remote
        .serve(
            "2",
            &[("e2.ics", "e2-v2", &e2_edited), ("e3.ics", "e3", &e3)],
        )
        .await;
    let outcome = sync.sync_connection(id, SyncOptions::default()).await.unwrap();

    // Assert
    assert_eq!(
        outcome,
        SyncOutcome::Synced(SyncReport {
            fetched: 2,
            deleted: 2
        })
    );
    let entries = sync.get_calendar_entries(id, None, None).await.unwrap();
    let etags: Vec<_> = entries.iter().map(|e| e.etag.as_str()).collect();
    assert_eq!(etags, vec!["e2-v2", "e3"]);
    assert_eq!(entries[0].first_occurrence, Some(ts("2024-01-11T14:00:00Z")));
    assert_eq!(
        sync.get_connection(id).await.unwrap().ctag.as_deref(),
        Some("2")
    );
}

#[tokio::test]
async fn calendar_reset_refetches_everything() {
    let (sync, remote, id) = setup().await;
    let e1 = event_ics("e1", "20240110T090000Z", "20240110T100000Z");
    remote.serve("1", &[("e1.ics", "e1", &e1)]).await;
    sync.sync_connection(id, SyncOptions::default()).await.unwrap();

    let outcome = sync.sync_connection(id, SyncOptions::reset()).await.unwrap();

    assert_eq!(
        outcome,
        SyncOutcome::Synced(SyncReport {
            fetched: 1,
            deleted: 1
        })
    );
    assert_eq!(sync.get_calendar_entries(id, None, None).await.unwrap().len(), 1);
    assert_eq!(remote.multiget_count().await, 2);
}

#[tokio::test]
async fn calendar_entries_filter_by_occurrence_window() {
    let (sync, remote, id) = setup().await;
    let e1 = event_ics("e1", "20240110T090000Z", "20240110T100000Z");
    let e2 = event_ics("e2", "20240210T090000Z", "20240210T100000Z");
    remote
        .serve("1", &[("e1.ics", "e1", &e1), ("e2.ics", "e2", &e2)])
        .await;
    sync.sync_connection(id, SyncOptions::default()).await.unwrap();

    let january = sync
        .get_calendar_entries(
            id,
            Some(ts("2024-01-01T00:00:00Z")),
            Some(ts("2024-02-01T00:00:00Z")),
        )
        .await
        .unwrap();
    assert_eq!(january.len(), 1);
    assert_eq!(january[0].uid, "e1");

    let by_uid = sync.get_calendar_entry_by_uid(id, "e2").await.unwrap();
    assert_eq!(by_uid.map(|e| e.uri), Some("e2.ics".to_string()));
}

#[tokio::test]
async fn calendar_sync_writes_marker() {
    let temp_dirs = setup_temp_dirs().await.unwrap();
    let remote = MockCollection::calendar().await;
    let config = Config {
        state_dir: Some(temp_dirs.state_dir.clone()),
        ..Config::default()
    };
    let sync = DavSync::in_memory(config).await.unwrap();
    let id = sync
        .add_connection(calendar_connection(remote.uri()))
        .await
        .unwrap()
        .id;
    let e1 = event_ics("e1", "20240110T090000Z", "20240110T100000Z");
    remote.serve("1", &[("e1.ics", "e1", &e1)]).await;

    sync.sync_connection(id, SyncOptions::default()).await.unwrap();

    let marker = temp_dirs.state_dir.join("sync").join(format!("{id}.stamp"));
    let stamp = tokio::fs::read_to_string(&marker).await.unwrap();
    let lastsynced = sync.get_connection(id).await.unwrap().lastsynced;
    assert_eq!(stamp.parse::<i64>().unwrap(), lastsynced);

    sync.delete_connection(id).await.unwrap();
    assert!(!marker.exists());
}

#[tokio::test]
async fn calendar_sync_not_due_is_skipped() {
    let remote = MockCollection::calendar().await;
    let sync = DavSync::in_memory(Config::in_memory()).await.unwrap();
    let mut draft = calendar_connection(remote.uri());
    draft.syncinterval = Some(3600);
    let id = sync.add_connection(draft).await.unwrap().id;
    let e1 = event_ics("e1", "20240110T090000Z", "20240110T100000Z");
    remote.serve("1", &[("e1.ics", "e1", &e1)]).await;

    let first = sync.sync_connection(id, SyncOptions::default()).await.unwrap();
    assert!(first.is_synced());

    let second = sync.sync_connection(id, SyncOptions::default()).await.unwrap();
    assert_eq!(second, SyncOutcome::Skipped(SkipReason::NotDue));
    let failure = sync.last_failure().unwrap();
    assert_eq!(failure.connection_id, id);
    assert_eq!(failure.reason, FailureReason::Skipped(SkipReason::NotDue));
}

#[tokio::test]
async fn calendar_sync_inactive_is_skipped_unless_overridden() {
    let remote = MockCollection::calendar().await;
    let sync = DavSync::in_memory(Config::in_memory()).await.unwrap();
    let mut draft = calendar_connection(remote.uri());
    draft.active = false;
    let id = sync.add_connection(draft).await.unwrap().id;
    let e1 = event_ics("e1", "20240110T090000Z", "20240110T100000Z");
    remote.serve("1", &[("e1.ics", "e1", &e1)]).await;

    let skipped = sync.sync_connection(id, SyncOptions::default()).await.unwrap();
    assert_eq!(skipped, SyncOutcome::Skipped(SkipReason::Inactive));

    let opts = SyncOptions {
        override_active: true,
        ..SyncOptions::default()
    };
    let outcome = sync.sync_connection(id, opts).await.unwrap();
    assert!(outcome.is_synced());
}

#[tokio::test]
async fn calendar_sync_with_incomplete_multiget_lists_again() {
    // Arrange
    let (sync, remote, id) = setup().await;
    let e1 = event_ics("e1", "20240110T090000Z", "20240110T100000Z");
    let e2 = event_ics("e2", "20240111T090000Z", "20240111T100000Z");
    let listed = [("e1.ics", "e1", e1.as_str()), ("e2.ics", "e2", e2.as_str())];
    remote
        .serve_with_partial_multiget("1", &listed, &listed[..1])
        .await;

    // Act
    let first = sync.sync_connection(id, SyncOptions::default()).await.unwrap();

    // Assert: e2 is missing and the collection tag is not recorded
    assert_eq!(
        first,
        SyncOutcome::Synced(SyncReport {
            fetched: 1,
            deleted: 0
        })
    );
    assert_eq!(sync.get_calendar_entries(id, None, None).await.unwrap().len(), 1);
    assert_eq!(sync.get_connection(id).await.unwrap().ctag, None);

    // Act: same collection tag, now the server answers for both
    remote.serve("1", &listed).await;
    let second = sync.sync_connection(id, SyncOptions::default()).await.unwrap();

    // Assert
    assert_eq!(
        second,
        SyncOutcome::Synced(SyncReport {
            fetched: 1,
            deleted: 0
        })
    );
    let uids: Vec<_> = sync
        .get_calendar_entries(id, None, None)
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.uid)
        .collect();
    assert_eq!(uids, vec!["e1", "e2"]);
    assert_eq!(
        sync.get_connection(id).await.unwrap().ctag.as_deref(),
        Some("1")
    );
}

#[tokio::test]
async fn calendar_concurrent_syncs_of_one_connection_run_one_after_another() {
    let (sync, remote, id) = setup().await;
    let e1 = event_ics("e1", "20240110T090000Z", "20240110T100000Z");
    remote.serve("1", &[("e1.ics", "e1", &e1)]).await;

    let (a, b) = tokio::join!(
        sync.sync_connection(id, SyncOptions::forced()),
        sync.sync_connection(id, SyncOptions::forced()),
    );

    // the second pass sees the first one's rows and fetches nothing
    let mut fetched = [a.unwrap(), b.unwrap()].map(|outcome| match outcome {
        SyncOutcome::Synced(report) => report.fetched,
        other => panic!("unexpected outcome: {other}"),
    });
    fetched.sort_unstable();
    assert_eq!(fetched, [0, 1]);
    assert_eq!(remote.multiget_count().await, 1);
    assert_eq!(sync.get_calendar_entries(id, None, None).await.unwrap().len(), 1);
}
