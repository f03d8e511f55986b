// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Command-line front end of davsync.

mod cli;
mod cmd_connection;
mod cmd_discover;
mod cmd_entry;
mod cmd_generate_completion;
mod cmd_sync;
mod config;
mod table;
mod util;

pub use crate::cli::{Cli, Commands, run};
