// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

use std::fmt;
use std::str::FromStr;

use davsync_dav::AuthMethod;

/// Kind of remote collection a connection points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, serde::Serialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum ConnectionType {
    /// `CalDAV` calendar collection.
    Calendar,

    /// `CardDAV` address book collection.
    Contacts,

    /// Read-only iCalendar feed; stored but never synced.
    #[cfg_attr(feature = "clap", value(name = "icsfeed"))]
    IcsFeed,
}

impl ConnectionType {
    /// The stored name of the type.
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionType::Calendar => "calendar",
            ConnectionType::Contacts => "contacts",
            ConnectionType::IcsFeed => "icsfeed",
        }
    }
}

impl fmt::Display for ConnectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConnectionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "calendar" => Ok(ConnectionType::Calendar),
            "contacts" => Ok(ConnectionType::Contacts),
            "icsfeed" => Ok(ConnectionType::IcsFeed),
            _ => Err(format!("Invalid connection type: {s}")),
        }
    }
}

/// A configured remote collection.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow, serde::Serialize)]
pub struct Connection {
    /// Local identifier.
    pub id: i64,

    /// Absolute collection URL.
    pub uri: String,

    /// Display name.
    pub displayname: String,

    /// Description.
    pub description: String,

    /// Username for basic authentication, empty for none.
    pub username: String,

    /// Password for basic authentication.
    #[serde(skip_serializing)]
    pub password: String,

    /// Collection kind.
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub kind: ConnectionType,

    /// Minimum seconds between two unforced syncs.
    pub syncinterval: i64,

    /// Unix time of the last successful sync or unchanged check.
    pub lastsynced: i64,

    /// Collection tag observed at the last sync.
    pub ctag: Option<String>,

    /// Sync token observed at the last sync.
    pub synctoken: Option<String>,

    /// Whether the connection takes part in scheduled syncs.
    pub active: bool,

    /// Whether local writes are pushed back.
    pub write: bool,
}

impl Connection {
    /// Basic credentials for this connection.
    pub fn auth(&self) -> AuthMethod {
        AuthMethod::basic(&self.username, &self.password)
    }
}

/// Fields of a new connection.
#[derive(Debug, Clone)]
pub struct ConnectionDraft {
    /// Absolute collection URL.
    pub uri: String,

    /// Display name.
    pub displayname: String,

    /// Description.
    pub description: String,

    /// Username for basic authentication.
    pub username: String,

    /// Password for basic authentication.
    pub password: String,

    /// Collection kind.
    pub kind: ConnectionType,

    /// Sync interval in seconds, or the configured default.
    pub syncinterval: Option<i64>,

    /// Whether local writes are pushed back.
    pub write: bool,

    /// Whether the connection takes part in scheduled syncs.
    pub active: bool,
}

impl ConnectionDraft {
    /// A draft with empty credentials and descriptive fields.
    pub fn new(uri: impl Into<String>, kind: ConnectionType) -> Self {
        Self {
            uri: uri.into(),
            displayname: String::new(),
            description: String::new(),
            username: String::new(),
            password: String::new(),
            kind,
            syncinterval: None,
            write: false,
            active: true,
        }
    }
}

/// Changes to an existing connection. `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub struct ConnectionPatch {
    /// Display name.
    pub displayname: Option<String>,

    /// Description.
    pub description: Option<String>,

    /// Username for basic authentication.
    pub username: Option<String>,

    /// Password for basic authentication.
    pub password: Option<String>,

    /// Sync interval in seconds.
    pub syncinterval: Option<i64>,

    /// Whether local writes are pushed back.
    pub write: Option<bool>,

    /// Whether the connection takes part in scheduled syncs.
    pub active: Option<bool>,
}

impl ConnectionPatch {
    /// Is this patch empty, meaning no fields are set
    pub fn is_empty(&self) -> bool {
        self.displayname.is_none()
            && self.description.is_none()
            && self.username.is_none()
            && self.password.is_none()
            && self.syncinterval.is_none()
            && self.write.is_none()
            && self.active.is_none()
    }

    pub(crate) fn apply_to(&self, conn: &mut Connection) {
        if let Some(v) = &self.displayname {
            conn.displayname.clone_from(v);
        }
        if let Some(v) = &self.description {
            conn.description.clone_from(v);
        }
        if let Some(v) = &self.username {
            conn.username.clone_from(v);
        }
        if let Some(v) = &self.password {
            conn.password.clone_from(v);
        }
        if let Some(v) = self.syncinterval {
            conn.syncinterval = v;
        }
        if let Some(v) = self.write {
            conn.write = v;
        }
        if let Some(v) = self.active {
            conn.active = v;
        }
    }
}
