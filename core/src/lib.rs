// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Discovery and delta synchronization of `CalDAV` calendars and `CardDAV` address books into a
//! local `SQLite` cache, with write-back of local edits.

mod config;
mod connection;
mod diff;
mod engine;
mod error;
mod localdb;
mod normalize;
mod object;
mod sync;

pub use crate::config::{APP_NAME, Config, expand_path, get_config_dir, parse_duration};
pub use crate::connection::{Connection, ConnectionDraft, ConnectionPatch, ConnectionType};
pub use crate::diff::{EtagDiff, diff_etags};
pub use crate::engine::{DavSync, Failure, FailureReason};
pub use crate::error::{Error, Result};
pub use crate::normalize::{
    CalendarObjectInfo, ContactObjectInfo, RECURRENCE_HORIZON, content_hash,
    normalize_calendar_object, normalize_contact_object,
};
pub use crate::object::{AddressbookObject, CalendarObject};
pub use crate::sync::{SkipReason, SyncOptions, SyncOutcome, SyncReport};

pub use davsync_dav::DiscoverResult;
