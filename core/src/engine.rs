// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::Utc;
use davsync_dav::{AuthMethod, DavClient, DiscoverResult, Discovery, ETag};
use tokio::fs;
use uuid::Uuid;

use crate::config::Config;
use crate::connection::{Connection, ConnectionDraft, ConnectionPatch, ConnectionType};
use crate::error::{Error, Result};
use crate::localdb::{AddressbookObjects, CalendarObjects, Connections, LocalDb};
use crate::normalize::{normalize_calendar_object, normalize_contact_object};
use crate::object::{AddressbookObject, CalendarObject};
use crate::sync::{self, SkipReason, SyncOptions, SyncOutcome};

const CALENDAR_CONTENT_TYPE: &str = "text/calendar; charset=utf-8";
const VCARD_CONTENT_TYPE: &str = "text/vcard; charset=utf-8";
const DB_FILENAME: &str = "davsync.db";

/// The last sync that did not complete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    /// Connection the sync was requested for.
    pub connection_id: i64,

    /// What stopped it.
    pub reason: FailureReason,
}

/// Cause of a [`Failure`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// The sync was skipped by a gate.
    Skipped(SkipReason),

    /// The sync failed and was rolled back.
    Error(String),
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.reason {
            FailureReason::Skipped(r) => write!(f, "connection {}: skipped, {r}", self.connection_id),
            FailureReason::Error(e) => write!(f, "connection {}: {e}", self.connection_id),
        }
    }
}

/// One mutex per connection id; two syncs of one connection never interleave.
#[derive(Debug, Clone, Default)]
struct SyncLocks(Arc<Mutex<HashMap<i64, Arc<tokio::sync::Mutex<()>>>>>);

impl SyncLocks {
    fn get(&self, connection_id: i64) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        locks.entry(connection_id).or_default().clone()
    }

    fn forget(&self, connection_id: i64) {
        let mut locks = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        locks.remove(&connection_id);
    }
}

/// CalDAV/CardDAV discovery and sync service.
///
/// Cloning is cheap; clones share the cache, the locks and the failure slot.
#[derive(Debug, Clone)]
pub struct DavSync {
    config: Config,
    db: LocalDb,
    locks: SyncLocks,
    last_failure: Arc<Mutex<Option<Failure>>>,
}

impl DavSync {
    /// Opens the service with the cache under the configured state directory.
    pub async fn new(mut config: Config) -> Result<Self> {
        config.normalize()?;

        let db_path = match &config.state_dir {
            Some(dir) => {
                fs::create_dir_all(dir).await?;
                Some(dir.join(DB_FILENAME))
            }
            None => None,
        };
        let db = LocalDb::open(db_path.as_deref()).await?;
        Ok(Self::with_db(config, db))
    }

    /// Opens the service on an in-memory cache.
    ///
    /// `config.state_dir` is used as given, only for sync markers.
    pub async fn in_memory(config: Config) -> Result<Self> {
        let db = LocalDb::open(None).await?;
        Ok(Self::with_db(config, db))
    }

    fn with_db(config: Config, db: LocalDb) -> Self {
        Self {
            config,
            db,
            locks: SyncLocks::default(),
            last_failure: Arc::new(Mutex::new(None)),
        }
    }

    /// The effective configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Finds the calendars and address books reachable from a host or URL.
    pub async fn discover(
        &self,
        host_or_uri: &str,
        username: &str,
        password: &str,
    ) -> Result<DiscoverResult> {
        let dav = self
            .config
            .dav_config(host_or_uri, AuthMethod::basic(username, password));
        let result = Discovery::new(&dav)?.discover(host_or_uri).await?;
        Ok(result)
    }

    /// Registers a collection.
    pub async fn add_connection(&self, mut draft: ConnectionDraft) -> Result<Connection> {
        let uri = draft.uri.trim();
        if !(uri.starts_with("https://") || uri.starts_with("http://")) {
            return Err(Error::Config(format!("Invalid collection URL: {uri}")));
        }
        draft.uri = if uri.ends_with('/') {
            uri.to_string()
        } else {
            format!("{uri}/")
        };

        let interval = draft
            .syncinterval
            .unwrap_or(self.config.default_sync_interval_secs);
        let id = self.db.connections.insert(&draft, interval).await?;
        tracing::info!(id, uri = %draft.uri, kind = %draft.kind, "connection added");
        self.get_connection(id).await
    }

    pub async fn modify_connection(&self, id: i64, patch: ConnectionPatch) -> Result<Connection> {
        let mut conn = self.get_connection(id).await?;
        if patch.is_empty() {
            return Ok(conn);
        }
        patch.apply_to(&mut conn);
        self.db.connections.update(&conn).await?;
        Ok(conn)
    }

    /// Removes a connection together with its cached objects and marker.
    pub async fn delete_connection(&self, id: i64) -> Result<()> {
        if !self.db.connections.delete(id).await? {
            return Err(not_found(id));
        }
        self.locks.forget(id);
        if let Some(path) = self.marker_path(id) {
            match fs::remove_file(&path).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => tracing::warn!(path = %path.display(), err = %e, "failed to remove sync marker"),
            }
        }
        tracing::info!(id, "connection deleted");
        Ok(())
    }

    pub async fn get_connections(&self) -> Result<Vec<Connection>> {
        Ok(self.db.connections.list().await?)
    }

    pub async fn get_connection(&self, id: i64) -> Result<Connection> {
        self.db
            .connections
            .get(id)
            .await?
            .ok_or_else(|| not_found(id))
    }

    /// Synchronizes one connection.
    ///
    /// Skips and unchanged collections are outcomes. Errors leave the cache and the connection's
    /// sync state as they were.
    #[tracing::instrument(skip(self))]
    pub async fn sync_connection(&self, id: i64, opts: SyncOptions) -> Result<SyncOutcome> {
        let lock = self.locks.get(id);
        let _guard = lock.lock().await;

        let result = self.sync_locked(id, &opts).await;
        match &result {
            Ok(SyncOutcome::Skipped(reason)) => {
                tracing::debug!(%reason, "sync skipped");
                self.set_failure(id, FailureReason::Skipped(*reason));
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(err = %e, "sync failed");
                self.set_failure(id, FailureReason::Error(e.to_string()));
            }
        }
        result
    }

    async fn sync_locked(&self, id: i64, opts: &SyncOptions) -> Result<SyncOutcome> {
        let conn = self.get_connection(id).await?;
        let now = Utc::now().timestamp();
        if let Some(reason) = sync::gate(&conn, opts, now) {
            return Ok(SyncOutcome::Skipped(reason));
        }

        let client = self.client_for(&conn)?;
        let outcome = sync::run(&self.db, &client, &conn, opts, now).await?;
        if outcome.is_synced() {
            self.write_marker(id, now).await;
        }
        Ok(outcome)
    }

    /// Synchronizes every connection, continuing past failures.
    pub async fn sync_all_connections(&self) -> Result<Vec<(i64, Result<SyncOutcome>)>> {
        let connections = self.get_connections().await?;
        let mut results = Vec::with_capacity(connections.len());
        for conn in connections {
            let result = self.sync_connection(conn.id, SyncOptions::default()).await;
            results.push((conn.id, result));
        }
        Ok(results)
    }

    /// Synchronizes connections in order until one actually syncs.
    ///
    /// Returns whether any did. Failures are recorded and skipped over.
    pub async fn indexer_sync_all_connections(&self) -> Result<bool> {
        for conn in self.get_connections().await? {
            match self.sync_connection(conn.id, SyncOptions::default()).await {
                Ok(outcome) if outcome.is_synced() => return Ok(true),
                Ok(_) => {}
                Err(e) => tracing::debug!(id = conn.id, err = %e, "indexer sync failed, continuing"),
            }
        }
        Ok(false)
    }

    /// Cached calendar objects whose occurrences intersect `(start, end)`, as unix times.
    pub async fn get_calendar_entries(
        &self,
        id: i64,
        start: Option<i64>,
        end: Option<i64>,
    ) -> Result<Vec<CalendarObject>> {
        self.connection_of(id, ConnectionType::Calendar).await?;
        Ok(self.db.calendar_objects.list(id, start, end).await?)
    }

    pub async fn get_calendar_entry_by_uid(
        &self,
        id: i64,
        uid: &str,
    ) -> Result<Option<CalendarObject>> {
        self.connection_of(id, ConnectionType::Calendar).await?;
        Ok(self.db.calendar_objects.get_by_uid(id, uid).await?)
    }

    pub async fn get_addressbook_entries(&self, id: i64) -> Result<Vec<AddressbookObject>> {
        self.connection_of(id, ConnectionType::Contacts).await?;
        Ok(self.db.addressbook_objects.list(id).await?)
    }

    /// Uploads a new calendar object and resyncs. Returns its uri.
    pub async fn add_calendar_entry(&self, id: i64, ics: &str) -> Result<String> {
        normalize_calendar_object(ics)?;
        self.add_entry(id, ConnectionType::Calendar, ics, "ics", CALENDAR_CONTENT_TYPE)
            .await
    }

    /// Replaces a cached calendar object on the server and resyncs.
    pub async fn edit_calendar_entry(&self, id: i64, uri: &str, ics: &str) -> Result<()> {
        normalize_calendar_object(ics)?;
        let conn = self.writable(id, ConnectionType::Calendar).await?;
        let cached = self
            .db
            .calendar_objects
            .get_by_uri(id, uri)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Calendar object {uri} in connection {id}")))?;
        self.put_entry(&conn, uri, ics, CALENDAR_CONTENT_TYPE, Some(&cached.etag))
            .await
    }

    pub async fn delete_calendar_entry(&self, id: i64, uri: &str) -> Result<()> {
        let conn = self.writable(id, ConnectionType::Calendar).await?;
        let cached = self
            .db
            .calendar_objects
            .get_by_uri(id, uri)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Calendar object {uri} in connection {id}")))?;
        self.delete_entry(&conn, uri, &cached.etag).await
    }

    /// Uploads a new vCard and resyncs. Returns its uri.
    pub async fn add_addressbook_entry(&self, id: i64, vcf: &str) -> Result<String> {
        normalize_contact_object(vcf)?;
        self.add_entry(id, ConnectionType::Contacts, vcf, "vcf", VCARD_CONTENT_TYPE)
            .await
    }

    pub async fn edit_addressbook_entry(&self, id: i64, uri: &str, vcf: &str) -> Result<()> {
        normalize_contact_object(vcf)?;
        let conn = self.writable(id, ConnectionType::Contacts).await?;
        let cached = self
            .db
            .addressbook_objects
            .get_by_uri(id, uri)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Contact {uri} in connection {id}")))?;
        self.put_entry(&conn, uri, vcf, VCARD_CONTENT_TYPE, Some(&cached.etag))
            .await
    }

    pub async fn delete_addressbook_entry(&self, id: i64, uri: &str) -> Result<()> {
        let conn = self.writable(id, ConnectionType::Contacts).await?;
        let cached = self
            .db
            .addressbook_objects
            .get_by_uri(id, uri)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Contact {uri} in connection {id}")))?;
        self.delete_entry(&conn, uri, &cached.etag).await
    }

    /// Drops every cached object of a connection and clears its sync state.
    ///
    /// The next sync fetches the collection again.
    pub async fn delete_all_entries(&self, id: i64) -> Result<u64> {
        let lock = self.locks.get(id);
        let _guard = lock.lock().await;

        self.get_connection(id).await?;
        let mut tx = self.db.begin().await?;
        let removed = CalendarObjects::delete_all(&mut tx, id).await?
            + AddressbookObjects::delete_all(&mut tx, id).await?;
        Connections::mark_synced(&mut tx, id, 0, None, None).await?;
        tx.commit().await?;

        tracing::info!(id, removed, "cached entries deleted");
        Ok(removed)
    }

    /// The most recent skipped or failed sync.
    pub fn last_failure(&self) -> Option<Failure> {
        self.last_failure
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Closes the cache.
    pub async fn close(self) {
        self.db.close().await;
    }

    fn set_failure(&self, connection_id: i64, reason: FailureReason) {
        let mut slot = self
            .last_failure
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        *slot = Some(Failure {
            connection_id,
            reason,
        });
    }

    fn client_for(&self, conn: &Connection) -> Result<DavClient> {
        let dav = self.config.dav_config(&conn.uri, conn.auth());
        Ok(DavClient::new(&dav)?)
    }

    async fn connection_of(&self, id: i64, kind: ConnectionType) -> Result<Connection> {
        let conn = self.get_connection(id).await?;
        if conn.kind != kind {
            return Err(Error::Config(format!(
                "Connection {id} is a {} connection, not {kind}",
                conn.kind
            )));
        }
        Ok(conn)
    }

    async fn writable(&self, id: i64, kind: ConnectionType) -> Result<Connection> {
        let conn = self.connection_of(id, kind).await?;
        if !conn.write {
            return Err(Error::Config(format!("Connection {id} is read-only")));
        }
        Ok(conn)
    }

    async fn add_entry(
        &self,
        id: i64,
        kind: ConnectionType,
        data: &str,
        extension: &str,
        content_type: &str,
    ) -> Result<String> {
        let conn = self.writable(id, kind).await?;
        let uri = format!("{}.{extension}", Uuid::new_v4());
        self.put_entry(&conn, &uri, data, content_type, None).await?;
        Ok(uri)
    }

    async fn put_entry(
        &self,
        conn: &Connection,
        uri: &str,
        data: &str,
        content_type: &str,
        etag: Option<&str>,
    ) -> Result<()> {
        let client = self.client_for(conn)?;
        let url = client.resolve(uri)?;
        let if_match = etag.map(ETag::new);
        client
            .put(&url, data.to_string(), content_type, if_match.as_ref())
            .await?;
        tracing::info!(id = conn.id, %url, "entry uploaded");
        self.resync(conn.id).await
    }

    async fn delete_entry(&self, conn: &Connection, uri: &str, etag: &str) -> Result<()> {
        let client = self.client_for(conn)?;
        let url = client.resolve(uri)?;
        client.delete(&url, Some(&ETag::new(etag))).await?;
        tracing::info!(id = conn.id, %url, "entry deleted");
        self.resync(conn.id).await
    }

    /// The server may rewrite what it stores, so the cache is refreshed from it.
    async fn resync(&self, id: i64) -> Result<()> {
        let opts = SyncOptions {
            override_active: true,
            ..SyncOptions::forced()
        };
        self.sync_connection(id, opts).await?;
        Ok(())
    }

    fn marker_path(&self, id: i64) -> Option<PathBuf> {
        self.config
            .state_dir
            .as_ref()
            .map(|dir| dir.join("sync").join(format!("{id}.stamp")))
    }

    /// Records the time of the last successful sync for external pollers.
    async fn write_marker(&self, id: i64, now: i64) {
        let Some(path) = self.marker_path(id) else {
            return;
        };
        let result = async {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).await?;
            }
            fs::write(&path, now.to_string()).await
        }
        .await;
        if let Err(e) = result {
            tracing::warn!(path = %path.display(), err = %e, "failed to write sync marker");
        }
    }
}

fn not_found(id: i64) -> Error {
    Error::NotFound(format!("Connection {id}"))
}
