// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Test data factories.

use davsync_core::{ConnectionDraft, ConnectionType};

/// A single-event calendar object. `start` is a UTC basic date-time like `20240110T090000Z`.
pub fn event_ics(uid: &str, start: &str, end: &str) -> String {
    format!(
        "BEGIN:VCALENDAR\r\n\
         VERSION:2.0\r\n\
         PRODID:-//davsync//Test//EN\r\n\
         BEGIN:VEVENT\r\n\
         UID:{uid}\r\n\
         DTSTAMP:20240101T000000Z\r\n\
         DTSTART:{start}\r\n\
         DTEND:{end}\r\n\
         SUMMARY:Event {uid}\r\n\
         END:VEVENT\r\n\
         END:VCALENDAR\r\n"
    )
}

/// A minimal vCard 3.0.
pub fn vcard(uid: &str, family: &str, given: &str) -> String {
    format!(
        "BEGIN:VCARD\r\n\
         VERSION:3.0\r\n\
         UID:{uid}\r\n\
         FN:{given} {family}\r\n\
         N:{family};{given};;;\r\n\
         END:VCARD\r\n"
    )
}

/// A writable calendar connection synced on every request.
pub fn calendar_connection(uri: impl Into<String>) -> ConnectionDraft {
    let mut draft = ConnectionDraft::new(uri, ConnectionType::Calendar);
    draft.displayname = "Test calendar".to_string();
    draft.username = "user".to_string();
    draft.password = "secret".to_string();
    draft.syncinterval = Some(0);
    draft.write = true;
    draft
}

/// A writable address book connection synced on every request.
pub fn contacts_connection(uri: impl Into<String>) -> ConnectionDraft {
    let mut draft = ConnectionDraft::new(uri, ConnectionType::Contacts);
    draft.displayname = "Test contacts".to_string();
    draft.syncinterval = Some(0);
    draft.write = true;
    draft
}
