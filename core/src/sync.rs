// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! One delta-sync pass over a single collection.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use chrono::DateTime;
use davsync_dav::{
    DavClient, ETag, Filter, Href, MultiStatusResponse, Prop, PropFindRequest, ReportKind,
    ReportRequest,
};

use crate::connection::{Connection, ConnectionType};
use crate::diff::{EtagDiff, diff_etags};
use crate::error::{Error, Result};
use crate::localdb::{AddressbookObjects, CalendarObjects, Connections, LocalDb};
use crate::normalize::{content_hash, normalize_calendar_object, normalize_contact_object};
use crate::object::{AddressbookObject, CalendarObject};

/// Flags of a sync request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncOptions {
    /// Ignore the sync interval and the collection tag.
    pub force: bool,

    /// Sync even when the connection is inactive.
    pub override_active: bool,

    /// Drop every cached object of the connection and fetch all of them again.
    pub delete_before_sync: bool,
}

impl SyncOptions {
    /// A forced sync.
    pub fn forced() -> Self {
        Self {
            force: true,
            ..Self::default()
        }
    }

    /// A forced sync that rebuilds the cache from scratch.
    pub fn reset() -> Self {
        Self {
            force: true,
            delete_before_sync: true,
            ..Self::default()
        }
    }
}

/// Result of a sync request that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The diff was applied.
    Synced(SyncReport),

    /// The collection tag matched; only `lastsynced` was refreshed.
    Unchanged,

    /// The sync was not attempted.
    Skipped(SkipReason),
}

impl SyncOutcome {
    /// Whether a sync pass actually ran against the server's object set.
    pub fn is_synced(&self) -> bool {
        matches!(self, SyncOutcome::Synced(_))
    }
}

impl fmt::Display for SyncOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncOutcome::Synced(report) => {
                write!(f, "synced ({} fetched, {} deleted)", report.fetched, report.deleted)
            }
            SyncOutcome::Unchanged => write!(f, "unchanged"),
            SyncOutcome::Skipped(reason) => write!(f, "skipped: {reason}"),
        }
    }
}

/// Counts of an applied diff.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Objects inserted or replaced.
    pub fetched: usize,

    /// Cached objects removed.
    pub deleted: usize,
}

/// Why a sync was not attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The sync interval has not elapsed.
    NotDue,

    /// The connection is disabled.
    Inactive,

    /// The connection type is not synchronized by this engine.
    UnsupportedType,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NotDue => write!(f, "not due"),
            SkipReason::Inactive => write!(f, "inactive"),
            SkipReason::UnsupportedType => write!(f, "unsupported type"),
        }
    }
}

/// Checks whether a sync of `conn` may run at `now`.
pub(crate) fn gate(conn: &Connection, opts: &SyncOptions, now: i64) -> Option<SkipReason> {
    if !conn.active && !opts.override_active {
        return Some(SkipReason::Inactive);
    }
    if Collection::of(conn.kind).is_none() {
        return Some(SkipReason::UnsupportedType);
    }
    if !opts.force && now < conn.lastsynced.saturating_add(conn.syncinterval) {
        return Some(SkipReason::NotDue);
    }
    None
}

/// The synchronizable collection kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Collection {
    Calendar,
    Addressbook,
}

impl Collection {
    fn of(kind: ConnectionType) -> Option<Self> {
        match kind {
            ConnectionType::Calendar => Some(Collection::Calendar),
            ConnectionType::Contacts => Some(Collection::Addressbook),
            ConnectionType::IcsFeed => None,
        }
    }

    fn listing(self) -> ReportRequest {
        match self {
            Collection::Calendar => ReportRequest::new(ReportKind::CalendarQuery)
                .prop(Prop::GetETag)
                .filter(Filter::comp("VCALENDAR")),
            Collection::Addressbook => {
                ReportRequest::new(ReportKind::AddressbookQuery).prop(Prop::GetETag)
            }
        }
    }

    fn multiget(self) -> ReportRequest {
        let (kind, data) = match self {
            Collection::Calendar => (ReportKind::CalendarMultiget, Prop::CalendarData),
            Collection::Addressbook => (ReportKind::AddressbookMultiget, Prop::AddressData),
        };
        ReportRequest::new(kind)
            .prop(Prop::GetETag)
            .prop(Prop::GetLastModified)
            .prop(data)
    }

    fn data_prop(self) -> Prop {
        match self {
            Collection::Calendar => Prop::CalendarData,
            Collection::Addressbook => Prop::AddressData,
        }
    }
}

/// Collection state reported by the depth-0 probe.
#[derive(Debug, Default)]
struct CollectionStatus {
    ctag: Option<String>,
    synctoken: Option<String>,
}

/// Rows ready to be written, normalized before the transaction opens.
#[derive(Debug)]
enum Fetched {
    Calendar(Vec<CalendarObject>),
    Addressbook(Vec<AddressbookObject>),
}

impl Fetched {
    fn len(&self) -> usize {
        match self {
            Fetched::Calendar(rows) => rows.len(),
            Fetched::Addressbook(rows) => rows.len(),
        }
    }
}

/// Runs steps after the gates: probe, tag check, listing, diff, fetch and apply.
///
/// The caller holds the per-connection lock.
#[tracing::instrument(skip_all, fields(connection_id = conn.id))]
pub(crate) async fn run(
    db: &LocalDb,
    client: &DavClient,
    conn: &Connection,
    opts: &SyncOptions,
    now: i64,
) -> Result<SyncOutcome> {
    let Some(collection) = Collection::of(conn.kind) else {
        return Ok(SyncOutcome::Skipped(SkipReason::UnsupportedType));
    };

    let status = probe(client).await?;
    if !opts.force && status.ctag.is_some() && status.ctag == conn.ctag {
        tracing::debug!(ctag = ?status.ctag, "collection tag unchanged");
        db.connections.touch(conn.id, now).await?;
        return Ok(SyncOutcome::Unchanged);
    }

    let remote = list_remote(client, collection).await?;
    let local = if opts.delete_before_sync {
        BTreeMap::new()
    } else {
        list_local(db, conn.id, collection).await?
    };

    let diff = diff_etags(&remote, &local);
    tracing::debug!(
        remote = remote.len(),
        local = local.len(),
        to_fetch = diff.to_fetch.len(),
        to_delete = diff.to_delete.len(),
        "computed etag diff"
    );

    let fetched = fetch(client, conn.id, collection, &diff, now).await?;
    let status = if fetched.len() < diff.to_fetch.len() {
        // leave the tags unset so the next pass lists the collection again
        tracing::warn!(
            requested = diff.to_fetch.len(),
            received = fetched.len(),
            "multiget returned fewer objects than requested"
        );
        CollectionStatus::default()
    } else {
        status
    };
    let report = apply(db, conn.id, opts, &diff, &fetched, &status, now).await?;
    tracing::info!(fetched = report.fetched, deleted = report.deleted, "sync applied");
    Ok(SyncOutcome::Synced(report))
}

async fn probe(client: &DavClient) -> Result<CollectionStatus> {
    let req = PropFindRequest::with_props(&[Prop::DisplayName, Prop::GetCTag, Prop::SyncToken]);
    let status = client.propfind(client.base_url(), &req, 0).await?;

    let [item] = status.responses.as_slice() else {
        return Err(Error::Protocol(format!(
            "collection probe returned {} responses, expected 1",
            status.responses.len()
        )));
    };

    Ok(CollectionStatus {
        ctag: item.props.non_empty_text("getctag").map(str::to_string),
        synctoken: item.props.non_empty_text("sync-token").map(str::to_string),
    })
}

/// Remote `etag -> href` map.
async fn list_remote(client: &DavClient, collection: Collection) -> Result<BTreeMap<String, String>> {
    let listing = client.report(&collection.listing(), 1).await?;

    let mut remote = BTreeMap::new();
    for item in listing.responses {
        // the collection itself
        if item.href.ends_with('/') {
            continue;
        }
        let Some(etag) = item.props.non_empty_text("getetag") else {
            tracing::debug!(href = %item.href, "skipping listed resource without etag");
            continue;
        };
        remote.insert(ETag::new(etag).as_str().to_string(), item.href.to_string());
    }
    Ok(remote)
}

/// Local `etag -> uri` map.
async fn list_local(
    db: &LocalDb,
    connection_id: i64,
    collection: Collection,
) -> Result<BTreeMap<String, String>> {
    let pairs = match collection {
        Collection::Calendar => db.calendar_objects.etags_for(connection_id).await?,
        Collection::Addressbook => db.addressbook_objects.etags_for(connection_id).await?,
    };
    Ok(pairs.into_iter().map(|(uri, etag)| (etag, uri)).collect())
}

/// Multigets and normalizes `diff.to_fetch`; touches nothing local.
async fn fetch(
    client: &DavClient,
    connection_id: i64,
    collection: Collection,
    diff: &EtagDiff,
    now: i64,
) -> Result<Fetched> {
    let mut fetched = match collection {
        Collection::Calendar => Fetched::Calendar(Vec::new()),
        Collection::Addressbook => Fetched::Addressbook(Vec::new()),
    };
    if diff.to_fetch.is_empty() {
        return Ok(fetched);
    }

    // requested url -> listed etag
    let mut requested = HashMap::with_capacity(diff.to_fetch.len());
    let mut req = collection.multiget();
    for (etag, href) in &diff.to_fetch {
        requested.insert(client.resolve(href)?, etag.as_str());
        req.add_href(Href::from(href.as_str()));
    }

    let response: MultiStatusResponse = client.report(&req, 1).await?;
    let data_prop = collection.data_prop().name();
    for item in response.responses {
        let url = client.resolve(&item.href)?;
        let Some(listed_etag) = requested.get(&url) else {
            tracing::debug!(href = %item.href, "ignoring unrequested multiget response");
            continue;
        };
        let Some(data) = item.props.non_empty_text(data_prop) else {
            tracing::warn!(href = %item.href, status = ?item.status, "multiget response without data");
            continue;
        };

        let etag = match item.props.non_empty_text("getetag") {
            Some(etag) => ETag::new(etag).as_str().to_string(),
            None if !listed_etag.is_empty() => (*listed_etag).to_string(),
            None => content_hash(data),
        };
        let lastmodified = item
            .props
            .non_empty_text("getlastmodified")
            .and_then(|s| DateTime::parse_from_rfc2822(s).ok())
            .map_or(now, |t| t.timestamp());
        let uri = item.href.basename().to_string();

        match &mut fetched {
            Fetched::Calendar(rows) => {
                let info = normalize_calendar_object(data)
                    .map_err(|e| Error::Parse(format!("{}: {e}", item.href)))?;
                rows.push(CalendarObject {
                    id: 0,
                    connection_id,
                    uri,
                    calendar_data: data.to_string(),
                    etag,
                    size: info.size,
                    lastmodified,
                    component_type: info.component_type,
                    uid: info.uid,
                    first_occurrence: info.first_occurrence,
                    last_occurrence: info.last_occurrence,
                });
            }
            Fetched::Addressbook(rows) => {
                let info = normalize_contact_object(data)
                    .map_err(|e| Error::Parse(format!("{}: {e}", item.href)))?;
                rows.push(AddressbookObject {
                    id: 0,
                    connection_id,
                    uri,
                    contact_data: data.to_string(),
                    etag,
                    size: info.size,
                    lastmodified,
                    uid: info.uid,
                    formatted_name: info.formatted_name,
                    structured_name: info.structured_name,
                });
            }
        }
    }

    Ok(fetched)
}

/// Writes the diff and the new collection state in one transaction.
async fn apply(
    db: &LocalDb,
    connection_id: i64,
    opts: &SyncOptions,
    diff: &EtagDiff,
    fetched: &Fetched,
    status: &CollectionStatus,
    now: i64,
) -> Result<SyncReport> {
    let mut tx = db.begin().await?;
    let mut deleted = 0;

    if opts.delete_before_sync {
        deleted += match fetched {
            Fetched::Calendar(_) => CalendarObjects::delete_all(&mut tx, connection_id).await?,
            Fetched::Addressbook(_) => {
                AddressbookObjects::delete_all(&mut tx, connection_id).await?
            }
        };
    }

    for etag in diff.to_delete.keys() {
        deleted += match fetched {
            Fetched::Calendar(_) => {
                CalendarObjects::delete_by_etag(&mut tx, connection_id, etag).await?
            }
            Fetched::Addressbook(_) => {
                AddressbookObjects::delete_by_etag(&mut tx, connection_id, etag).await?
            }
        };
    }

    match fetched {
        Fetched::Calendar(rows) => {
            for row in rows {
                CalendarObjects::upsert(&mut tx, row).await?;
            }
        }
        Fetched::Addressbook(rows) => {
            for row in rows {
                AddressbookObjects::upsert(&mut tx, row).await?;
            }
        }
    }

    Connections::mark_synced(
        &mut tx,
        connection_id,
        now,
        status.ctag.as_deref(),
        status.synctoken.as_deref(),
    )
    .await?;
    tx.commit().await?;

    Ok(SyncReport {
        fetched: fetched.len(),
        deleted: usize::try_from(deleted).unwrap_or(usize::MAX),
    })
}
