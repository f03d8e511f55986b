// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Common test utilities for integration tests.
//!
//! This module provides shared test infrastructure including:
//! - Calendar and contact payload fixtures
//! - A mock `CalDAV`/`CardDAV` collection served by wiremock
//! - Temporary state directories with auto-cleanup

mod fixtures;
mod server;
mod temp_dir;

#[allow(unused_imports)]
pub use fixtures::{calendar_connection, contacts_connection, event_ics, vcard};
#[allow(unused_imports)]
pub use server::MockCollection;
#[allow(unused_imports)]
pub use temp_dir::setup_temp_dirs;
