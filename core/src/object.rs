// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

/// A cached calendar resource.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow, serde::Serialize)]
pub struct CalendarObject {
    /// Row identifier.
    pub id: i64,

    /// Owning connection.
    pub connection_id: i64,

    /// Resource name within the collection, unique per connection.
    pub uri: String,

    /// Raw iCalendar payload.
    pub calendar_data: String,

    /// Unquoted entity tag.
    pub etag: String,

    /// Payload size in bytes.
    pub size: i64,

    /// Unix time of the last modification reported by the server.
    pub lastmodified: i64,

    /// Name of the first non-timezone component, e.g. `VEVENT`.
    pub component_type: String,

    /// UID of that component.
    pub uid: String,

    /// Unix time the object starts, if dated.
    pub first_occurrence: Option<i64>,

    /// Unix time the object (or its last recurrence) ends, if dated.
    pub last_occurrence: Option<i64>,
}

/// A cached address book resource.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow, serde::Serialize)]
pub struct AddressbookObject {
    /// Row identifier.
    pub id: i64,

    /// Owning connection.
    pub connection_id: i64,

    /// Resource name within the collection, unique per connection.
    pub uri: String,

    /// Raw vCard payload.
    pub contact_data: String,

    /// Unquoted entity tag.
    pub etag: String,

    /// Payload size in bytes.
    pub size: i64,

    /// Unix time of the last modification reported by the server.
    pub lastmodified: i64,

    /// Contact UID.
    pub uid: Option<String>,

    /// `FN` property.
    pub formatted_name: String,

    /// `N` components joined with `;`.
    pub structured_name: String,
}
