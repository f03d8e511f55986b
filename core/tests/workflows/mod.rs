// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! End-to-end workflow tests for the davsync-core crate.
//!
//! These tests drive `DavSync` against a mock collection and check the cache
//! and connection state it leaves behind.

mod calendar_sync;
mod connections;
mod contacts_sync;
mod rollback;
mod write_back;
